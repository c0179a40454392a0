//! A-XDR encoder

use crate::axdr::types::LengthEncoding;
use dlms_core::datatypes::*;
use dlms_core::{DlmsError, DlmsResult};

/// Appends A-XDR encoded values to an owned buffer
#[derive(Debug, Default)]
pub struct AxdrEncoder {
    buffer: Vec<u8>,
}

impl AxdrEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode a value with its leading type tag
    pub fn encode_data_object(&mut self, obj: &DataObject) -> DlmsResult<()> {
        self.encode_tag(obj.get_type());
        self.encode_payload(obj)
    }

    /// Encode a value without its leading type tag
    ///
    /// Nested array and structure elements keep their own tags; only the
    /// outermost tag is omitted. `Null` has an empty payload.
    pub fn encode_payload(&mut self, obj: &DataObject) -> DlmsResult<()> {
        match obj {
            DataObject::Null => {}
            DataObject::Boolean(b) => self.encode_bool(*b),
            DataObject::Integer8(i) => self.encode_u8(*i as u8),
            DataObject::Integer16(i) => self.encode_bytes(&i.to_be_bytes()),
            DataObject::Integer32(i) => self.encode_bytes(&i.to_be_bytes()),
            DataObject::Integer64(i) => self.encode_bytes(&i.to_be_bytes()),
            DataObject::Unsigned8(u) | DataObject::Enumerate(u) | DataObject::Bcd(u) => {
                self.encode_u8(*u)
            }
            DataObject::Unsigned16(u) => self.encode_bytes(&u.to_be_bytes()),
            DataObject::Unsigned32(u) => self.encode_bytes(&u.to_be_bytes()),
            DataObject::Unsigned64(u) => self.encode_bytes(&u.to_be_bytes()),
            DataObject::Float32(f) => self.encode_bytes(&f.to_bits().to_be_bytes()),
            DataObject::Float64(f) => self.encode_bytes(&f.to_bits().to_be_bytes()),
            DataObject::OctetString(s)
            | DataObject::VisibleString(s)
            | DataObject::Utf8String(s) => self.encode_octet_string(s),
            DataObject::BitString(bs) => self.encode_bit_string(bs),
            DataObject::Array(items) | DataObject::Structure(items) => {
                self.encode_length(items.len());
                for item in items {
                    self.encode_data_object(item)?;
                }
            }
            DataObject::CompactArray(ca) => self.encode_compact_array(ca)?,
            DataObject::Date(d) => self.encode_bytes(&d.encode()),
            DataObject::Time(t) => self.encode_bytes(&t.encode()),
            DataObject::DateTime(dt) => self.encode_bytes(&dt.encode()),
        }
        Ok(())
    }

    /// Encode a type description
    ///
    /// A simple type is its tag byte. An array is `0x01`, a big-endian u16
    /// element count and the element description. A structure is `0x02`,
    /// the member count as an A-XDR length and each member description.
    pub fn encode_type_description(&mut self, desc: &TypeDesc) -> DlmsResult<()> {
        self.encode_tag(desc.data_type());
        match desc {
            TypeDesc::Simple(_) => {}
            TypeDesc::Array { count, element } => {
                self.encode_bytes(&count.to_be_bytes());
                self.encode_type_description(element)?;
            }
            TypeDesc::Structure(members) => {
                self.encode_length(members.len());
                for member in members {
                    self.encode_type_description(member)?;
                }
            }
        }
        Ok(())
    }

    fn encode_compact_array(&mut self, compact_array: &CompactArray) -> DlmsResult<()> {
        if matches!(compact_array.type_description(), TypeDesc::Simple(DataObjectType::CompactArray)) {
            return Err(DlmsError::Asn1Encoding(
                "Compact array elements cannot be compact arrays".to_string(),
            ));
        }
        self.encode_type_description(compact_array.type_description())?;
        self.encode_octet_string(compact_array.array_contents());
        Ok(())
    }

    pub fn encode_tag(&mut self, tag: DataObjectType) {
        self.buffer.push(tag.tag());
    }

    pub fn encode_bool(&mut self, value: bool) {
        self.buffer.push(if value { 0xFF } else { 0x00 });
    }

    pub fn encode_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn encode_length(&mut self, len: usize) {
        self.buffer.extend_from_slice(&LengthEncoding::for_len(len).encode());
    }

    /// Length-prefixed bytes
    pub fn encode_octet_string(&mut self, value: &[u8]) {
        self.encode_length(value.len());
        self.buffer.extend_from_slice(value);
    }

    /// Bit count followed by the packed bits
    pub fn encode_bit_string(&mut self, bit_string: &BitString) {
        self.encode_length(bit_string.num_bits());
        self.buffer.extend_from_slice(bit_string.as_bytes());
    }

    /// Raw bytes, no prefix
    pub fn encode_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}

/// Encode one value with its tag
pub fn encode(obj: &DataObject) -> DlmsResult<Vec<u8>> {
    let mut encoder = AxdrEncoder::new();
    encoder.encode_data_object(obj)?;
    Ok(encoder.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode(&DataObject::Null).unwrap(), vec![0x00]);
        assert_eq!(encode(&DataObject::Boolean(true)).unwrap(), vec![0x03, 0xFF]);
        assert_eq!(
            encode(&DataObject::Integer32(0x12345678)).unwrap(),
            vec![0x05, 0x12, 0x34, 0x56, 0x78]
        );
        assert_eq!(
            encode(&DataObject::Unsigned32(1000)).unwrap(),
            vec![0x06, 0x00, 0x00, 0x03, 0xE8]
        );
    }

    #[test]
    fn test_encode_payload_omits_tag() {
        let mut encoder = AxdrEncoder::new();
        encoder
            .encode_payload(&DataObject::OctetString(vec![1, 2, 3]))
            .unwrap();
        assert_eq!(encoder.as_bytes(), &[0x03, 1, 2, 3]);
    }

    #[test]
    fn test_encode_structure() {
        let value = DataObject::Structure(vec![
            DataObject::Unsigned8(7),
            DataObject::Array(vec![DataObject::Boolean(false)]),
        ]);
        assert_eq!(
            encode(&value).unwrap(),
            vec![0x02, 0x02, 0x11, 0x07, 0x01, 0x01, 0x03, 0x00]
        );
    }

    #[test]
    fn test_encode_type_description() {
        let desc = TypeDesc::Structure(vec![
            TypeDesc::Simple(DataObjectType::LongUnsigned),
            TypeDesc::array(3, TypeDesc::Simple(DataObjectType::Boolean)),
        ]);
        let mut encoder = AxdrEncoder::new();
        encoder.encode_type_description(&desc).unwrap();
        assert_eq!(
            encoder.as_bytes(),
            &[0x02, 0x02, 0x12, 0x01, 0x00, 0x03, 0x03]
        );
    }

    #[test]
    fn test_encode_bit_string() {
        let bits = BitString::from_bits(&[true, true, false, false, true]);
        assert_eq!(
            encode(&DataObject::BitString(bits)).unwrap(),
            vec![0x04, 0x05, 0b1100_1000]
        );
    }
}
