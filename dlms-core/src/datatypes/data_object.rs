//! The tagged value union carried by COSEM attributes

use crate::datatypes::bit_string::BitString;
use crate::datatypes::compact_array::CompactArray;
use crate::datatypes::cosem_date::CosemDate;
use crate::datatypes::cosem_date_time::CosemDateTime;
use crate::datatypes::cosem_time::CosemTime;
use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value read from or written to a COSEM attribute
///
/// Produced by the A-XDR decoder and by compact buffer reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataObject {
    Null,
    Boolean(bool),
    Integer8(i8),
    Integer16(i16),
    Integer32(i32),
    Integer64(i64),
    Unsigned8(u8),
    Unsigned16(u16),
    Unsigned32(u32),
    Unsigned64(u64),
    Float32(f32),
    Float64(f64),
    Enumerate(u8),
    Bcd(u8),
    OctetString(Vec<u8>),
    VisibleString(Vec<u8>),
    Utf8String(Vec<u8>),
    BitString(BitString),
    /// Elements of one shape
    Array(Vec<DataObject>),
    /// Ordered, heterogeneous members
    Structure(Vec<DataObject>),
    CompactArray(CompactArray),
    Date(CosemDate),
    Time(CosemTime),
    DateTime(CosemDateTime),
}

/// A-XDR type tags
///
/// The discriminant is the tag byte that precedes a value on the wire and
/// the byte used for a simple type inside a type description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataObjectType {
    NullData = 0x00,
    Array = 0x01,
    Structure = 0x02,
    Boolean = 0x03,
    BitString = 0x04,
    DoubleLong = 0x05,
    DoubleLongUnsigned = 0x06,
    OctetString = 0x09,
    VisibleString = 0x0A,
    Utf8String = 0x0C,
    Bcd = 0x0D,
    Integer = 0x0F,
    LongInteger = 0x10,
    Unsigned = 0x11,
    LongUnsigned = 0x12,
    CompactArray = 0x13,
    Long64 = 0x14,
    Long64Unsigned = 0x15,
    Enumerate = 0x16,
    Float32 = 0x17,
    Float64 = 0x18,
    DateTime = 0x19,
    Date = 0x1A,
    Time = 0x1B,
    DontCare = 0xFF,
}

impl DataObjectType {
    /// Tag byte
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a tag byte
    pub fn from_tag(tag: u8) -> DlmsResult<Self> {
        use DataObjectType::*;
        Ok(match tag {
            0x00 => NullData,
            0x01 => Array,
            0x02 => Structure,
            0x03 => Boolean,
            0x04 => BitString,
            0x05 => DoubleLong,
            0x06 => DoubleLongUnsigned,
            0x09 => OctetString,
            0x0A => VisibleString,
            0x0C => Utf8String,
            0x0D => Bcd,
            0x0F => Integer,
            0x10 => LongInteger,
            0x11 => Unsigned,
            0x12 => LongUnsigned,
            0x13 => CompactArray,
            0x14 => Long64,
            0x15 => Long64Unsigned,
            0x16 => Enumerate,
            0x17 => Float32,
            0x18 => Float64,
            0x19 => DateTime,
            0x1A => Date,
            0x1B => Time,
            0xFF => DontCare,
            _ => {
                return Err(DlmsError::InvalidData(format!(
                    "Unknown A-XDR tag 0x{:02X}",
                    tag
                )));
            }
        })
    }

    /// Whether values of this type carry no nested values
    pub fn is_leaf(self) -> bool {
        !matches!(
            self,
            DataObjectType::Array | DataObjectType::Structure | DataObjectType::CompactArray
        )
    }

    /// Payload size in bytes for fixed-width types, `None` when length-prefixed
    pub fn fixed_size(self) -> Option<usize> {
        use DataObjectType::*;
        match self {
            NullData => Some(0),
            Boolean | Integer | Unsigned | Enumerate | Bcd => Some(1),
            LongInteger | LongUnsigned => Some(2),
            DoubleLong | DoubleLongUnsigned | Float32 => Some(4),
            Long64 | Long64Unsigned | Float64 => Some(8),
            Date => Some(CosemDate::LENGTH),
            Time => Some(CosemTime::LENGTH),
            DateTime => Some(CosemDateTime::LENGTH),
            _ => None,
        }
    }

    /// Whether this is a numeric type
    pub fn is_number(self) -> bool {
        use DataObjectType::*;
        matches!(
            self,
            DoubleLong
                | DoubleLongUnsigned
                | Integer
                | LongInteger
                | Unsigned
                | LongUnsigned
                | Long64
                | Long64Unsigned
                | Enumerate
                | Bcd
                | Float32
                | Float64
        )
    }
}

impl DataObject {
    /// Type tag of this value
    pub fn get_type(&self) -> DataObjectType {
        match self {
            DataObject::Null => DataObjectType::NullData,
            DataObject::Boolean(_) => DataObjectType::Boolean,
            DataObject::Integer8(_) => DataObjectType::Integer,
            DataObject::Integer16(_) => DataObjectType::LongInteger,
            DataObject::Integer32(_) => DataObjectType::DoubleLong,
            DataObject::Integer64(_) => DataObjectType::Long64,
            DataObject::Unsigned8(_) => DataObjectType::Unsigned,
            DataObject::Unsigned16(_) => DataObjectType::LongUnsigned,
            DataObject::Unsigned32(_) => DataObjectType::DoubleLongUnsigned,
            DataObject::Unsigned64(_) => DataObjectType::Long64Unsigned,
            DataObject::Float32(_) => DataObjectType::Float32,
            DataObject::Float64(_) => DataObjectType::Float64,
            DataObject::Enumerate(_) => DataObjectType::Enumerate,
            DataObject::Bcd(_) => DataObjectType::Bcd,
            DataObject::OctetString(_) => DataObjectType::OctetString,
            DataObject::VisibleString(_) => DataObjectType::VisibleString,
            DataObject::Utf8String(_) => DataObjectType::Utf8String,
            DataObject::BitString(_) => DataObjectType::BitString,
            DataObject::Array(_) => DataObjectType::Array,
            DataObject::Structure(_) => DataObjectType::Structure,
            DataObject::CompactArray(_) => DataObjectType::CompactArray,
            DataObject::Date(_) => DataObjectType::Date,
            DataObject::Time(_) => DataObjectType::Time,
            DataObject::DateTime(_) => DataObjectType::DateTime,
        }
    }

    /// Whether this value has no nested values
    pub fn is_leaf(&self) -> bool {
        self.get_type().is_leaf()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataObject::Null)
    }

    /// Children of an array or structure, `None` for anything else
    pub fn children(&self) -> Option<&[DataObject]> {
        match self {
            DataObject::Array(items) | DataObject::Structure(items) => Some(items),
            _ => None,
        }
    }

    /// Number of leaves, visiting arrays and structures depth-first
    pub fn leaf_count(&self) -> usize {
        match self.children() {
            Some(children) => children.iter().map(DataObject::leaf_count).sum(),
            None => 1,
        }
    }

    /// Leaves in depth-first order
    pub fn leaves(&self) -> Vec<&DataObject> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a DataObject>) {
        match self.children() {
            Some(children) => children.iter().for_each(|child| child.collect_leaves(out)),
            None => out.push(self),
        }
    }

    /// The leaf at depth-first position `index`
    pub fn leaf_at(&self, index: usize) -> Option<&DataObject> {
        match self.children() {
            None => (index == 0).then_some(self),
            Some(children) => {
                let mut remaining = index;
                for child in children {
                    let count = child.leaf_count();
                    if remaining < count {
                        return child.leaf_at(remaining);
                    }
                    remaining -= count;
                }
                None
            }
        }
    }

    /// Depth of nested arrays and structures, 0 for a leaf
    pub fn depth(&self) -> usize {
        match self.children() {
            Some(children) => 1 + children.iter().map(DataObject::depth).max().unwrap_or(0),
            None => 0,
        }
    }

    pub fn as_bool(&self) -> DlmsResult<bool> {
        match self {
            DataObject::Boolean(b) => Ok(*b),
            _ => Err(self.type_error("Boolean")),
        }
    }

    pub fn as_u8(&self) -> DlmsResult<u8> {
        match self {
            DataObject::Unsigned8(v) | DataObject::Enumerate(v) => Ok(*v),
            _ => Err(self.type_error("Unsigned8")),
        }
    }

    pub fn as_u16(&self) -> DlmsResult<u16> {
        match self {
            DataObject::Unsigned16(v) => Ok(*v),
            _ => Err(self.type_error("Unsigned16")),
        }
    }

    /// Signed integer of any width
    pub fn as_i64(&self) -> DlmsResult<i64> {
        match self {
            DataObject::Integer8(v) => Ok(*v as i64),
            DataObject::Integer16(v) => Ok(*v as i64),
            DataObject::Integer32(v) => Ok(*v as i64),
            DataObject::Integer64(v) => Ok(*v),
            _ => Err(self.type_error("signed integer")),
        }
    }

    pub fn as_octet_string(&self) -> DlmsResult<&[u8]> {
        match self {
            DataObject::OctetString(s) => Ok(s),
            _ => Err(self.type_error("OctetString")),
        }
    }

    pub fn as_array(&self) -> DlmsResult<&[DataObject]> {
        match self {
            DataObject::Array(a) => Ok(a),
            _ => Err(self.type_error("Array")),
        }
    }

    pub fn as_structure(&self) -> DlmsResult<&[DataObject]> {
        match self {
            DataObject::Structure(s) => Ok(s),
            _ => Err(self.type_error("Structure")),
        }
    }

    fn type_error(&self, expected: &str) -> DlmsError {
        DlmsError::InvalidData(format!("Expected {}, got {:?}", expected, self.get_type()))
    }
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataObject::Null => write!(f, "NULL_DATA"),
            DataObject::Boolean(b) => write!(f, "BOOLEAN: {}", b),
            DataObject::Integer8(i) => write!(f, "INTEGER: {}", i),
            DataObject::Integer16(i) => write!(f, "LONG_INTEGER: {}", i),
            DataObject::Integer32(i) => write!(f, "DOUBLE_LONG: {}", i),
            DataObject::Integer64(i) => write!(f, "LONG64: {}", i),
            DataObject::Unsigned8(u) => write!(f, "UNSIGNED: {}", u),
            DataObject::Unsigned16(u) => write!(f, "LONG_UNSIGNED: {}", u),
            DataObject::Unsigned32(u) => write!(f, "DOUBLE_LONG_UNSIGNED: {}", u),
            DataObject::Unsigned64(u) => write!(f, "LONG64_UNSIGNED: {}", u),
            DataObject::Float32(fl) => write!(f, "FLOAT32: {}", fl),
            DataObject::Float64(fl) => write!(f, "FLOAT64: {}", fl),
            DataObject::Enumerate(e) => write!(f, "ENUMERATE: {}", e),
            DataObject::Bcd(b) => write!(f, "BCD: {}", b),
            DataObject::OctetString(s) => {
                write!(f, "OCTET_STRING:")?;
                for byte in s {
                    write!(f, " {:02X}", byte)?;
                }
                Ok(())
            }
            DataObject::VisibleString(s) => {
                write!(f, "VISIBLE_STRING: {}", String::from_utf8_lossy(s))
            }
            DataObject::Utf8String(s) => write!(f, "UTF8_STRING: {}", String::from_utf8_lossy(s)),
            DataObject::BitString(bs) => write!(f, "BIT_STRING: {}", bs),
            DataObject::Array(items) | DataObject::Structure(items) => {
                let name = if matches!(self, DataObject::Array(_)) {
                    "ARRAY"
                } else {
                    "STRUCTURE"
                };
                write!(f, "{}: {} element(s)", name, items.len())?;
                for (i, elem) in items.iter().enumerate() {
                    write!(f, "\n  [{}]: {}", i, elem)?;
                }
                Ok(())
            }
            DataObject::CompactArray(ca) => write!(f, "{}", ca),
            DataObject::Date(d) => write!(f, "DATE: {}", d),
            DataObject::Time(t) => write!(f, "TIME: {}", t),
            DataObject::DateTime(dt) => write!(f, "DATE_TIME: {}", dt),
        }
    }
}
