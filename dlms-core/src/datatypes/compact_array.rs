//! Type descriptions and the compact array type

use crate::datatypes::data_object::{DataObject, DataObjectType};
use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a value with its payload removed
///
/// A type description is what travels in place of the per-value tags of a
/// compact encoding: arrays carry an element count and one element
/// description, structures carry one description per member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDesc {
    /// A leaf type
    Simple(DataObjectType),
    /// `count` elements, all shaped like `element`
    Array { count: u16, element: Box<TypeDesc> },
    /// Members in order
    Structure(Vec<TypeDesc>),
}

impl TypeDesc {
    /// Describe a leaf type
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` for container tags, which need their children.
    pub fn simple(data_type: DataObjectType) -> DlmsResult<Self> {
        if data_type.is_leaf() {
            Ok(TypeDesc::Simple(data_type))
        } else {
            Err(DlmsError::InvalidData(format!(
                "{:?} cannot be described without its children",
                data_type
            )))
        }
    }

    pub fn array(count: u16, element: TypeDesc) -> Self {
        TypeDesc::Array {
            count,
            element: Box::new(element),
        }
    }

    /// Outermost tag
    pub fn data_type(&self) -> DataObjectType {
        match self {
            TypeDesc::Simple(data_type) => *data_type,
            TypeDesc::Array { .. } => DataObjectType::Array,
            TypeDesc::Structure(_) => DataObjectType::Structure,
        }
    }

    /// Number of leaf payloads a value of this shape carries
    ///
    /// Saturates at `usize::MAX`; see [`checked_leaf_count`](Self::checked_leaf_count).
    pub fn leaf_count(&self) -> usize {
        self.checked_leaf_count().unwrap_or(usize::MAX)
    }

    /// Number of leaf payloads, `None` if it does not fit in a `usize`
    pub fn checked_leaf_count(&self) -> Option<usize> {
        match self {
            TypeDesc::Simple(_) => Some(1),
            TypeDesc::Array { count, element } => (*count as usize).checked_mul(element.checked_leaf_count()?),
            TypeDesc::Structure(members) => members
                .iter()
                .try_fold(0usize, |total, member| total.checked_add(member.checked_leaf_count()?)),
        }
    }

    /// Whether a value of this shape carries no leaf at all
    pub fn is_leafless(&self) -> bool {
        match self {
            TypeDesc::Simple(_) => false,
            TypeDesc::Array { count, element } => *count == 0 || element.is_leafless(),
            TypeDesc::Structure(members) => members.iter().all(TypeDesc::is_leafless),
        }
    }

    /// Fail if an array repeats an element that carries no leaves
    ///
    /// Such arrays consume no payload bytes, so their size is not bounded
    /// by the data that accompanies them.
    pub fn ensure_bounded(&self) -> DlmsResult<()> {
        match self {
            TypeDesc::Simple(_) => Ok(()),
            TypeDesc::Array { count, element } => {
                if *count > 0 && element.is_leafless() {
                    return Err(DlmsError::InvalidData(format!(
                        "Array of {} elements without leaves: {}",
                        count, element
                    )));
                }
                element.ensure_bounded()
            }
            TypeDesc::Structure(members) => members.iter().try_for_each(TypeDesc::ensure_bounded),
        }
    }

    /// Nesting depth, 0 for a leaf
    pub fn depth(&self) -> usize {
        match self {
            TypeDesc::Simple(_) => 0,
            TypeDesc::Array { element, .. } => 1 + element.depth(),
            TypeDesc::Structure(members) => {
                1 + members.iter().map(TypeDesc::depth).max().unwrap_or(0)
            }
        }
    }

    /// Whether `value` has exactly this shape
    pub fn matches(&self, value: &DataObject) -> bool {
        match (self, value) {
            (TypeDesc::Simple(data_type), value) => value.get_type() == *data_type,
            (TypeDesc::Array { count, element }, DataObject::Array(items)) => {
                items.len() == *count as usize && items.iter().all(|item| element.matches(item))
            }
            (TypeDesc::Structure(members), DataObject::Structure(items)) => {
                members.len() == items.len()
                    && members.iter().zip(items).all(|(desc, item)| desc.matches(item))
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Simple(data_type) => write!(f, "{:?}", data_type),
            TypeDesc::Array { count, element } => write!(f, "Array[{}]<{}>", count, element),
            TypeDesc::Structure(members) => {
                write!(f, "Structure{{")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", member)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A COSEM compact array: one element description and the tag-free
/// payloads of every element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactArray {
    type_description: TypeDesc,
    array_contents: Vec<u8>,
}

impl CompactArray {
    pub fn new(type_description: TypeDesc, array_contents: Vec<u8>) -> Self {
        Self {
            type_description,
            array_contents,
        }
    }

    /// Element description
    pub fn type_description(&self) -> &TypeDesc {
        &self.type_description
    }

    /// Concatenated element payloads
    pub fn array_contents(&self) -> &[u8] {
        &self.array_contents
    }
}

impl fmt::Display for CompactArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "COMPACT_ARRAY(type={}, size={})",
            self.type_description,
            self.array_contents.len()
        )
    }
}
