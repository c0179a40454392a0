//! Attribute and method access descriptors
//!
//! Every object instance keeps one [`AttributeDescriptor`] per attribute it
//! has an opinion about. Attributes without an entry fall back to the
//! defaults of [`ObjectDescriptor`](crate::ObjectDescriptor): read-write,
//! dynamic, never read.

use dlms_core::{DataObjectType, DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Attribute access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessMode {
    NoAccess = 0,
    Read = 1,
    Write = 2,
    #[default]
    ReadWrite = 3,
}

impl AccessMode {
    /// Create from the Blue Book mode value
    pub fn from_value(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(AccessMode::NoAccess),
            1 => Ok(AccessMode::Read),
            2 => Ok(AccessMode::Write),
            3 => Ok(AccessMode::ReadWrite),
            _ => Err(DlmsError::InvalidData(format!("Invalid access mode: {}", value))),
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }

    pub fn allows_read(&self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    pub fn allows_write(&self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

/// Method access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MethodAccessMode {
    NoAccess = 0,
    #[default]
    Access = 1,
}

impl MethodAccessMode {
    pub fn from_value(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(MethodAccessMode::NoAccess),
            1 => Ok(MethodAccessMode::Access),
            _ => Err(DlmsError::InvalidData(format!(
                "Invalid method access mode: {}",
                value
            ))),
        }
    }

    pub fn value(&self) -> u8 {
        *self as u8
    }
}

/// Per-attribute access state of one object instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// Attribute index (1-based)
    pub index: u8,
    /// Overrides the kind's declared type when set
    pub data_type: Option<DataObjectType>,
    pub access_mode: AccessMode,
    /// Static attributes are read once and then served from the cache
    pub is_static: bool,
    /// When the attribute was last read, `None` if never
    pub last_read_at: Option<SystemTime>,
}

impl AttributeDescriptor {
    /// Default descriptor for `index`
    pub fn new(index: u8) -> Self {
        Self {
            index,
            data_type: None,
            access_mode: AccessMode::default(),
            is_static: false,
            last_read_at: None,
        }
    }

    pub fn with_access_mode(mut self, access_mode: AccessMode) -> Self {
        self.access_mode = access_mode;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn with_data_type(mut self, data_type: DataObjectType) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

/// Per-method access state of one object instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Method index (1-based)
    pub index: u8,
    pub access_mode: MethodAccessMode,
}

impl MethodDescriptor {
    pub fn new(index: u8, access_mode: MethodAccessMode) -> Self {
        Self { index, access_mode }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_values() {
        for value in 0..=3 {
            assert_eq!(AccessMode::from_value(value).unwrap().value(), value);
        }
        assert!(AccessMode::from_value(4).is_err());
        assert_eq!(AccessMode::default(), AccessMode::ReadWrite);
    }

    #[test]
    fn test_access_mode_permissions() {
        assert!(AccessMode::Read.allows_read());
        assert!(!AccessMode::Read.allows_write());
        assert!(!AccessMode::Write.allows_read());
        assert!(AccessMode::ReadWrite.allows_write());
        assert!(!AccessMode::NoAccess.allows_read());
    }

    #[test]
    fn test_method_access_mode() {
        assert_eq!(MethodAccessMode::default(), MethodAccessMode::Access);
        assert_eq!(MethodAccessMode::from_value(0).unwrap(), MethodAccessMode::NoAccess);
        assert!(MethodAccessMode::from_value(2).is_err());
    }

    #[test]
    fn test_attribute_descriptor_builder() {
        let descriptor = AttributeDescriptor::new(3)
            .with_access_mode(AccessMode::Read)
            .with_static(true)
            .with_data_type(DataObjectType::Structure);
        assert_eq!(descriptor.index, 3);
        assert!(descriptor.is_static);
        assert_eq!(descriptor.data_type, Some(DataObjectType::Structure));
        assert!(descriptor.last_read_at.is_none());
    }
}
