//! Data interface class (Class ID: 1)
//!
//! The simplest COSEM interface class: one value of any type.
//!
//! # Attributes
//!
//! - Attribute 1: logical_name (octet-string)
//! - Attribute 2: value (any type, dynamic)
//!
//! # Methods
//!
//! None
//!
//! # Usage
//!
//! ```rust,no_run
//! use dlms_interface::Data;
//! use dlms_core::{DataObject, ObisCode};
//!
//! # async fn example() {
//! let data = Data::new(ObisCode::new(0, 0, 96, 1, 0, 255), DataObject::Unsigned32(12345));
//! let current_value = data.value().await;
//! # }
//! ```

use crate::access::AccessMode;
use crate::descriptor::{ObjectDescriptor, ObjectType};
use crate::{no_such_attribute, no_such_method, CosemObject};
use async_trait::async_trait;
use dlms_core::{DataObject, DataObjectType, DlmsResult, ObisCode};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct Data {
    descriptor: Arc<ObjectDescriptor>,
    value: Arc<RwLock<DataObject>>,
}

impl Data {
    pub const CLASS_ID: u16 = 1;
    pub const VERSION: u8 = 0;

    pub const ATTR_LOGICAL_NAME: u8 = 1;
    pub const ATTR_VALUE: u8 = 2;

    pub fn new(logical_name: ObisCode, value: DataObject) -> Self {
        Self::with_descriptor(
            ObjectDescriptor::new(ObjectType::Data, Self::VERSION, 2, 0).with_logical_name(logical_name),
            value,
        )
    }

    /// Instance whose logical name is learned from the first read of attribute 1
    pub fn unnamed(value: DataObject) -> Self {
        Self::with_descriptor(ObjectDescriptor::new(ObjectType::Data, Self::VERSION, 2, 0), value)
    }

    fn with_descriptor(descriptor: ObjectDescriptor, value: DataObject) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            value: Arc::new(RwLock::new(value)),
        }
    }

    pub fn with_access_mode(self, index: u8, mode: AccessMode) -> Self {
        self.descriptor.set_access_mode(index, mode);
        self
    }

    pub async fn value(&self) -> DataObject {
        self.value.read().await.clone()
    }

    pub async fn set_value(&self, value: DataObject) {
        *self.value.write().await = value;
    }
}

#[async_trait]
impl CosemObject for Data {
    fn descriptor(&self) -> &ObjectDescriptor {
        &self.descriptor
    }

    fn attribute_count(&self, _version: u8) -> u8 {
        2
    }

    fn method_count(&self, _version: u8) -> u8 {
        0
    }

    async fn data_type(&self, attribute_id: u8) -> DlmsResult<DataObjectType> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => Ok(DataObjectType::OctetString),
            Self::ATTR_VALUE => Ok(self.value.read().await.get_type()),
            _ => Err(no_such_attribute(self, attribute_id)),
        }
    }

    async fn get_attribute(&self, attribute_id: u8) -> DlmsResult<DataObject> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => Ok(self.descriptor.logical_name_value()),
            Self::ATTR_VALUE => Ok(self.value().await),
            _ => Err(no_such_attribute(self, attribute_id)),
        }
    }

    async fn set_attribute(&self, attribute_id: u8, value: DataObject) -> DlmsResult<()> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => self.descriptor.write_logical_name(&value),
            Self::ATTR_VALUE => {
                self.set_value(value).await;
                Ok(())
            }
            _ => Err(no_such_attribute(self, attribute_id)),
        }
    }

    async fn invoke_method(
        &self,
        method_id: u8,
        _parameters: Option<DataObject>,
    ) -> DlmsResult<Option<DataObject>> {
        Err(no_such_method(self, method_id))
    }
}
