//! Scaler and unit of a register value
//!
//! The physical value of a register is `value * 10^scaler` in `unit`.
//! On the wire it is `structure { integer scaler, enum unit }`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dlms_interface::ScalerUnit;
//! use dlms_interface::scaler_unit::units;
//!
//! // kWh with three decimals
//! let scaler_unit = ScalerUnit::new(-3, units::WATT_HOUR);
//! assert_eq!(scaler_unit.scale_value(1500.0), 1.5);
//! ```

use dlms_asn1::{AxdrDecoder, AxdrEncoder};
use dlms_core::{DataObject, DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScalerUnit {
    /// Power of ten applied to the raw value
    pub scaler: i8,
    /// Unit code from the Blue Book unit table
    pub unit: u8,
}

impl ScalerUnit {
    pub fn new(scaler: i8, unit: u8) -> Self {
        Self { scaler, unit }
    }

    /// No scaling, no unit
    pub fn none() -> Self {
        Self::new(0, units::NO_UNIT)
    }

    pub fn scaler(&self) -> i8 {
        self.scaler
    }

    pub fn unit(&self) -> u8 {
        self.unit
    }

    pub fn scale_value(&self, value: f64) -> f64 {
        value * 10_f64.powi(self.scaler as i32)
    }

    pub fn unscale_value(&self, scaled_value: f64) -> f64 {
        scaled_value / 10_f64.powi(self.scaler as i32)
    }

    /// Tagged A-XDR form of the structure
    pub fn encode(&self) -> DlmsResult<Vec<u8>> {
        let mut encoder = AxdrEncoder::new();
        encoder.encode_data_object(&self.to_data_object())?;
        Ok(encoder.into_bytes())
    }

    pub fn decode(data: &[u8]) -> DlmsResult<Self> {
        let mut decoder = AxdrDecoder::new(data);
        Self::from_data_object(&decoder.decode_data_object()?)
    }

    pub fn to_data_object(&self) -> DataObject {
        DataObject::Structure(vec![
            DataObject::Integer8(self.scaler),
            DataObject::Enumerate(self.unit),
        ])
    }

    /// Accepts `enum` or `unsigned` for the unit, some meters send the latter
    pub fn from_data_object(obj: &DataObject) -> DlmsResult<Self> {
        match obj.as_structure()? {
            [DataObject::Integer8(scaler), unit] => Ok(Self::new(*scaler, unit.as_u8()?)),
            [scaler, _] => Err(DlmsError::InvalidData(format!(
                "Scaler must be an integer, got {:?}",
                scaler.get_type()
            ))),
            elements => Err(DlmsError::InvalidData(format!(
                "Scaler-unit structure must have 2 elements, got {}",
                elements.len()
            ))),
        }
    }
}

/// Common unit codes
pub mod units {
    pub const NO_UNIT: u8 = 0x00;
    pub const SECOND: u8 = 0x07;
    pub const WATT: u8 = 0x1B;
    pub const VAR: u8 = 0x1D;
    pub const WATT_HOUR: u8 = 0x1E;
    pub const VAR_HOUR: u8 = 0x20;
    pub const AMPERE: u8 = 0x21;
    pub const VOLT: u8 = 0x23;
    pub const HERTZ: u8 = 0x2C;
    pub const CUBIC_METRE: u8 = 0x0D;
    pub const CELSIUS: u8 = 0x09;
    /// Count or dimensionless quantity
    pub const COUNT: u8 = 0xFF;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_value() {
        let su = ScalerUnit::new(3, units::WATT);
        assert!((su.scale_value(12345.0) - 12_345_000.0).abs() < 0.001);
        assert!((su.unscale_value(12_345_000.0) - 12345.0).abs() < 0.001);
        assert_eq!(ScalerUnit::none(), ScalerUnit::default());
    }

    #[test]
    fn test_encode_decode() {
        let su = ScalerUnit::new(-2, units::VOLT);
        let encoded = su.encode().unwrap();
        assert_eq!(encoded, vec![0x02, 0x02, 0x0F, 0xFE, 0x16, 0x23]);
        assert_eq!(ScalerUnit::decode(&encoded).unwrap(), su);
    }

    #[test]
    fn test_from_data_object_accepts_unsigned_unit() {
        let obj = DataObject::Structure(vec![DataObject::Integer8(1), DataObject::Unsigned8(0x1E)]);
        assert_eq!(ScalerUnit::from_data_object(&obj).unwrap(), ScalerUnit::new(1, 0x1E));
    }

    #[test]
    fn test_from_data_object_rejects_bad_shape() {
        assert!(ScalerUnit::from_data_object(&DataObject::Unsigned8(1)).is_err());
        let obj = DataObject::Structure(vec![DataObject::Unsigned8(1), DataObject::Enumerate(0)]);
        assert!(ScalerUnit::from_data_object(&obj).is_err());
    }
}
