//! A-XDR decoder

use crate::axdr::types::{LengthEncoding, MAX_TYPE_DEPTH};
use dlms_core::datatypes::*;
use dlms_core::{DlmsError, DlmsResult};

/// Cursor over A-XDR encoded bytes
#[derive(Debug)]
pub struct AxdrDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> AxdrDecoder<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Decode a tagged value
    pub fn decode_data_object(&mut self) -> DlmsResult<DataObject> {
        let tag = self.decode_tag()?;
        self.decode_value(tag)
    }

    /// Decode the payload of a value whose tag is already known
    ///
    /// This is the inverse of [`AxdrEncoder::encode_payload`](crate::AxdrEncoder::encode_payload).
    pub fn decode_value(&mut self, tag: DataObjectType) -> DlmsResult<DataObject> {
        Ok(match tag {
            DataObjectType::NullData | DataObjectType::DontCare => DataObject::Null,
            DataObjectType::Boolean => DataObject::Boolean(self.read_byte()? != 0x00),
            DataObjectType::Integer => DataObject::Integer8(self.read_byte()? as i8),
            DataObjectType::LongInteger => DataObject::Integer16(i16::from_be_bytes(self.read_array()?)),
            DataObjectType::DoubleLong => DataObject::Integer32(i32::from_be_bytes(self.read_array()?)),
            DataObjectType::Long64 => DataObject::Integer64(i64::from_be_bytes(self.read_array()?)),
            DataObjectType::Unsigned => DataObject::Unsigned8(self.read_byte()?),
            DataObjectType::LongUnsigned => DataObject::Unsigned16(u16::from_be_bytes(self.read_array()?)),
            DataObjectType::DoubleLongUnsigned => {
                DataObject::Unsigned32(u32::from_be_bytes(self.read_array()?))
            }
            DataObjectType::Long64Unsigned => {
                DataObject::Unsigned64(u64::from_be_bytes(self.read_array()?))
            }
            DataObjectType::Float32 => {
                DataObject::Float32(f32::from_bits(u32::from_be_bytes(self.read_array()?)))
            }
            DataObjectType::Float64 => {
                DataObject::Float64(f64::from_bits(u64::from_be_bytes(self.read_array()?)))
            }
            DataObjectType::Enumerate => DataObject::Enumerate(self.read_byte()?),
            DataObjectType::Bcd => DataObject::Bcd(self.read_byte()?),
            DataObjectType::OctetString => DataObject::OctetString(self.decode_octet_string()?),
            DataObjectType::VisibleString => DataObject::VisibleString(self.decode_octet_string()?),
            DataObjectType::Utf8String => DataObject::Utf8String(self.decode_octet_string()?),
            DataObjectType::BitString => DataObject::BitString(self.decode_bit_string()?),
            DataObjectType::Array => DataObject::Array(self.decode_sequence()?),
            DataObjectType::Structure => DataObject::Structure(self.decode_sequence()?),
            DataObjectType::CompactArray => {
                let type_description = self.decode_type_description()?;
                let contents = self.decode_octet_string()?;
                DataObject::CompactArray(CompactArray::new(type_description, contents))
            }
            DataObjectType::Date => {
                DataObject::Date(CosemDate::decode(self.decode_fixed_bytes(CosemDate::LENGTH)?)?)
            }
            DataObjectType::Time => {
                DataObject::Time(CosemTime::decode(self.decode_fixed_bytes(CosemTime::LENGTH)?)?)
            }
            DataObjectType::DateTime => DataObject::DateTime(CosemDateTime::decode(
                self.decode_fixed_bytes(CosemDateTime::LENGTH)?,
            )?),
        })
    }

    /// Decode a type description written by
    /// [`AxdrEncoder::encode_type_description`](crate::AxdrEncoder::encode_type_description)
    pub fn decode_type_description(&mut self) -> DlmsResult<TypeDesc> {
        self.decode_type_description_at(0)
    }

    fn decode_type_description_at(&mut self, depth: usize) -> DlmsResult<TypeDesc> {
        if depth > MAX_TYPE_DEPTH {
            return Err(DlmsError::Asn1Decoding(format!(
                "Type description nested deeper than {}",
                MAX_TYPE_DEPTH
            )));
        }
        match self.decode_tag()? {
            DataObjectType::Array => {
                let count = u16::from_be_bytes(self.read_array()?);
                let element = self.decode_type_description_at(depth + 1)?;
                if count > 0 && element.is_leafless() {
                    return Err(DlmsError::Asn1Decoding(format!(
                        "Array of {} elements without leaves: {}",
                        count, element
                    )));
                }
                Ok(TypeDesc::array(count, element))
            }
            DataObjectType::Structure => {
                let len = self.decode_length()?;
                let members = (0..len)
                    .map(|_| self.decode_type_description_at(depth + 1))
                    .collect::<DlmsResult<Vec<_>>>()?;
                Ok(TypeDesc::Structure(members))
            }
            DataObjectType::CompactArray => Err(DlmsError::Asn1Decoding(
                "Compact array is not allowed inside a type description".to_string(),
            )),
            simple => Ok(TypeDesc::Simple(simple)),
        }
    }

    pub fn decode_tag(&mut self) -> DlmsResult<DataObjectType> {
        let byte = self.read_byte()?;
        DataObjectType::from_tag(byte).map_err(|e| DlmsError::Asn1Decoding(e.to_string()))
    }

    /// Parse an A-XDR length prefix
    pub fn decode_length(&mut self) -> DlmsResult<usize> {
        let (len, consumed) = LengthEncoding::decode(&self.buffer[self.position..])?;
        self.position += consumed;
        Ok(len.len())
    }

    pub fn decode_octet_string(&mut self) -> DlmsResult<Vec<u8>> {
        let len = self.decode_length()?;
        Ok(self.decode_fixed_bytes(len)?.to_vec())
    }

    pub fn decode_bit_string(&mut self) -> DlmsResult<BitString> {
        let num_bits = self.decode_length()?;
        let bytes = self.decode_fixed_bytes(BitString::byte_len(num_bits))?;
        BitString::new(bytes.to_vec(), num_bits)
    }

    fn decode_sequence(&mut self) -> DlmsResult<Vec<DataObject>> {
        let len = self.decode_length()?;
        // Every element takes at least its tag byte
        if len > self.remaining() {
            return Err(self.short_read(len));
        }
        (0..len).map(|_| self.decode_data_object()).collect()
    }

    /// Take the next `len` bytes
    pub fn decode_fixed_bytes(&mut self, len: usize) -> DlmsResult<&'a [u8]> {
        let buffer = self.buffer;
        let bytes = buffer
            .get(self.position..self.position.saturating_add(len))
            .ok_or_else(|| self.short_read(len))?;
        self.position += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> DlmsResult<[u8; N]> {
        let bytes = self.decode_fixed_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn read_byte(&mut self) -> DlmsResult<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    fn short_read(&self, needed: usize) -> DlmsError {
        DlmsError::Asn1Decoding(format!(
            "Not enough bytes: need {}, have {}",
            needed,
            self.remaining()
        ))
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }
}

/// Decode one tagged value that must span all of `bytes`
pub fn decode(bytes: &[u8]) -> DlmsResult<DataObject> {
    let mut decoder = AxdrDecoder::new(bytes);
    let value = decoder.decode_data_object()?;
    if decoder.remaining() != 0 {
        return Err(DlmsError::Asn1Decoding(format!(
            "{} trailing bytes after value",
            decoder.remaining()
        )));
    }
    Ok(value)
}
