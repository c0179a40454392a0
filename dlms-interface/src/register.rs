//! Register interface class (Class ID: 3)
//!
//! A single process value with its scaler and unit.
//!
//! # Attributes
//!
//! - Attribute 1: logical_name (octet-string)
//! - Attribute 2: value (numeric or string, dynamic)
//! - Attribute 3: scaler_unit (structure, static)
//!
//! # Methods
//!
//! - Method 1: reset (sets the value to zero of its own type)
//!
//! # Usage
//!
//! ```rust,no_run
//! use dlms_interface::{Register, ScalerUnit};
//! use dlms_core::{DataObject, ObisCode};
//!
//! # async fn example() -> dlms_core::DlmsResult<()> {
//! let register = Register::new(
//!     ObisCode::new(1, 0, 1, 8, 0, 255),
//!     DataObject::Unsigned32(12345),
//!     ScalerUnit::new(0, 0x1E),
//! );
//! let kwh = register.scaled_value().await? / 1000.0;
//! # Ok(())
//! # }
//! ```

use crate::access::AccessMode;
use crate::descriptor::{ObjectDescriptor, ObjectType};
use crate::scaler_unit::ScalerUnit;
use crate::{no_such_attribute, no_such_method, CosemObject};
use async_trait::async_trait;
use dlms_core::{DataObject, DataObjectType, DlmsError, DlmsResult, ObisCode};
use log::debug;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct Register {
    descriptor: Arc<ObjectDescriptor>,
    value: Arc<RwLock<DataObject>>,
    scaler_unit: Arc<RwLock<ScalerUnit>>,
}

impl Register {
    pub const CLASS_ID: u16 = 3;
    pub const VERSION: u8 = 0;

    pub const ATTR_LOGICAL_NAME: u8 = 1;
    pub const ATTR_VALUE: u8 = 2;
    pub const ATTR_SCALER_UNIT: u8 = 3;

    pub const METHOD_RESET: u8 = 1;

    pub fn new(logical_name: ObisCode, value: DataObject, scaler_unit: ScalerUnit) -> Self {
        let descriptor = ObjectDescriptor::new(ObjectType::Register, Self::VERSION, 3, 1)
            .with_logical_name(logical_name)
            .with_static_attributes(&[Self::ATTR_SCALER_UNIT]);
        Self {
            descriptor: Arc::new(descriptor),
            value: Arc::new(RwLock::new(value)),
            scaler_unit: Arc::new(RwLock::new(scaler_unit)),
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

    pub async fn scaler_unit(&self) -> ScalerUnit {
        *self.scaler_unit.read().await
    }

    pub async fn set_scaler_unit(&self, scaler_unit: ScalerUnit) {
        *self.scaler_unit.write().await = scaler_unit;
    }

    /// The value with the scaler applied
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` when the value is not numeric.
    pub async fn scaled_value(&self) -> DlmsResult<f64> {
        let numeric_value = match self.value().await {
            DataObject::Integer8(v) => v as f64,
            DataObject::Integer16(v) => v as f64,
            DataObject::Integer32(v) => v as f64,
            DataObject::Integer64(v) => v as f64,
            DataObject::Unsigned8(v) => v as f64,
            DataObject::Unsigned16(v) => v as f64,
            DataObject::Unsigned32(v) => v as f64,
            DataObject::Unsigned64(v) => v as f64,
            DataObject::Float32(v) => v as f64,
            DataObject::Float64(v) => v,
            other => {
                return Err(DlmsError::InvalidData(format!(
                    "Register value must be numeric, got {:?}",
                    other.get_type()
                )));
            }
        };
        Ok(self.scaler_unit().await.scale_value(numeric_value))
    }

    /// Set the value to zero of the same type, `Null` for non-numeric values
    pub async fn reset(&self) {
        let mut value = self.value.write().await;
        *value = zero_of(&value);
        debug!("Register {:?} reset", self.descriptor.logical_name());
    }
}

fn zero_of(value: &DataObject) -> DataObject {
    match value {
        DataObject::Integer8(_) => DataObject::Integer8(0),
        DataObject::Integer16(_) => DataObject::Integer16(0),
        DataObject::Integer32(_) => DataObject::Integer32(0),
        DataObject::Integer64(_) => DataObject::Integer64(0),
        DataObject::Unsigned8(_) => DataObject::Unsigned8(0),
        DataObject::Unsigned16(_) => DataObject::Unsigned16(0),
        DataObject::Unsigned32(_) => DataObject::Unsigned32(0),
        DataObject::Unsigned64(_) => DataObject::Unsigned64(0),
        DataObject::Float32(_) => DataObject::Float32(0.0),
        DataObject::Float64(_) => DataObject::Float64(0.0),
        _ => DataObject::Null,
    }
}

#[async_trait]
impl CosemObject for Register {
    fn descriptor(&self) -> &ObjectDescriptor {
        &self.descriptor
    }

    fn attribute_count(&self, _version: u8) -> u8 {
        3
    }

    fn method_count(&self, _version: u8) -> u8 {
        1
    }

    async fn data_type(&self, attribute_id: u8) -> DlmsResult<DataObjectType> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => Ok(DataObjectType::OctetString),
            Self::ATTR_VALUE => Ok(self.value.read().await.get_type()),
            Self::ATTR_SCALER_UNIT => Ok(DataObjectType::Structure),
            _ => Err(no_such_attribute(self, attribute_id)),
        }
    }

    async fn get_attribute(&self, attribute_id: u8) -> DlmsResult<DataObject> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => Ok(self.descriptor.logical_name_value()),
            Self::ATTR_VALUE => Ok(self.value().await),
            Self::ATTR_SCALER_UNIT => Ok(self.scaler_unit().await.to_data_object()),
            _ => Err(no_such_attribute(self, attribute_id)),
        }
    }

    async fn set_attribute(&self, attribute_id: u8, value: DataObject) -> DlmsResult<()> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => self.descriptor.write_logical_name(&value),
            Self::ATTR_VALUE => {
                if !value.is_leaf() {
                    return Err(DlmsError::InvalidData(format!(
                        "Register value must be a simple type, got {:?}",
                        value.get_type()
                    )));
                }
                self.set_value(value).await;
                Ok(())
            }
            Self::ATTR_SCALER_UNIT => {
                let scaler_unit = ScalerUnit::from_data_object(&value)?;
                self.set_scaler_unit(scaler_unit).await;
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
        match method_id {
            Self::METHOD_RESET => {
                self.reset().await;
                Ok(None)
            }
            _ => Err(no_such_method(self, method_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energy() -> Register {
        Register::new(
            ObisCode::new(1, 1, 1, 8, 0, 255),
            DataObject::Unsigned32(12345),
            ScalerUnit::new(0, 0x1E),
        )
    }

    #[tokio::test]
    async fn test_register_get_attribute() {
        let register = energy();
        assert_eq!(register.class_id(), Register::CLASS_ID);
        assert_eq!(
            register.get_attribute(1).await.unwrap(),
            DataObject::OctetString(vec![1, 1, 1, 8, 0, 255])
        );
        assert_eq!(register.get_attribute(2).await.unwrap(), DataObject::Unsigned32(12345));
        assert_eq!(
            register.get_attribute(3).await.unwrap(),
            DataObject::Structure(vec![DataObject::Integer8(0), DataObject::Enumerate(0x1E)])
        );
        assert_eq!(register.data_type(2).await.unwrap(), DataObjectType::DoubleLongUnsigned);
        assert!(register.descriptor().is_static(3));
        assert!(!register.descriptor().is_static(2));
    }

    #[tokio::test]
    async fn test_register_set_attribute() {
        let register = energy();
        register.set_attribute(2, DataObject::Unsigned32(54321)).await.unwrap();
        assert_eq!(register.value().await, DataObject::Unsigned32(54321));

        register
            .set_attribute(3, ScalerUnit::new(3, 0x1B).to_data_object())
            .await
            .unwrap();
        assert_eq!(register.scaler_unit().await, ScalerUnit::new(3, 0x1B));

        assert!(register.set_attribute(2, DataObject::Array(vec![])).await.is_err());
    }

    #[tokio::test]
    async fn test_register_scaled_value() {
        let register = energy();
        register.set_scaler_unit(ScalerUnit::new(-1, 0x1E)).await;
        assert!((register.scaled_value().await.unwrap() - 1234.5).abs() < 0.001);

        register.set_value(DataObject::OctetString(vec![1])).await;
        assert!(register.scaled_value().await.is_err());
    }

    #[tokio::test]
    async fn test_register_reset() {
        let register = energy();
        assert_eq!(register.invoke_method(1, Some(DataObject::Integer8(0))).await.unwrap(), None);
        assert_eq!(register.value().await, DataObject::Unsigned32(0));

        register.set_value(DataObject::Integer16(-40)).await;
        register.reset().await;
        assert_eq!(register.value().await, DataObject::Integer16(0));

        register.set_value(DataObject::VisibleString(b"x".to_vec())).await;
        register.reset().await;
        assert_eq!(register.value().await, DataObject::Null);
    }

    #[tokio::test]
    async fn test_register_invalid_attribute() {
        let register = energy();
        assert!(matches!(register.get_attribute(4).await, Err(DlmsError::AccessDenied(_))));
        assert!(matches!(register.invoke_method(2, None).await, Err(DlmsError::AccessDenied(_))));
    }
}
