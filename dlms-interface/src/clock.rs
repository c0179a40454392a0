//! Clock interface class (Class ID: 8)
//!
//! The device clock. This model keeps a stored date-time rather than
//! following a system clock; the hosting application advances it with
//! [`Clock::set_time`].
//!
//! # Attributes
//!
//! - Attribute 1: logical_name (octet-string)
//! - Attribute 2: time (octet-string(12), dynamic)
//! - Attribute 3: time_zone (long, minutes from UTC)
//! - Attribute 4: status (unsigned, dynamic)
//! - Attribute 5: daylight_savings_begin (octet-string(12))
//! - Attribute 6: daylight_savings_end (octet-string(12))
//! - Attribute 7: daylight_savings_deviation (integer, minutes)
//! - Attribute 8: daylight_savings_enabled (boolean)
//! - Attribute 9: clock_base (enum)
//!
//! # Methods
//!
//! - Method 1: adjust_to_quarter
//! - Method 2: adjust_to_measuring_period
//! - Method 3: adjust_to_minute
//! - Method 4: adjust_to_preset_time
//! - Method 5: preset_adjusting_time(structure { preset, validity_start, validity_end })
//! - Method 6: shift_time(long seconds, -900..=900)
//!
//! # Usage
//!
//! ```rust,no_run
//! use dlms_interface::Clock;
//! use dlms_core::CosemDateTime;
//!
//! # async fn example() -> dlms_core::DlmsResult<()> {
//! let clock = Clock::with_default_obis();
//! clock.set_time(CosemDateTime::new(2024, 3, 1, 12, 7, 40)?).await;
//! clock.adjust_to_quarter().await?;
//! # Ok(())
//! # }
//! ```

use crate::access::AccessMode;
use crate::descriptor::{ObjectDescriptor, ObjectType};
use crate::{no_such_attribute, no_such_method, CosemObject};
use async_trait::async_trait;
use dlms_core::datatypes::{CosemDateFormat, CosemDateTime};
use dlms_core::{DataObject, DataObjectType, DlmsError, DlmsResult, ObisCode};
use log::debug;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Pending adjustment set by `preset_adjusting_time`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetTime {
    pub preset: CosemDateTime,
    pub validity_start: CosemDateTime,
    pub validity_end: CosemDateTime,
}

#[derive(Debug, Clone)]
pub struct Clock {
    descriptor: Arc<ObjectDescriptor>,
    time: Arc<RwLock<CosemDateTime>>,
    /// Minutes from UTC
    time_zone: Arc<RwLock<i16>>,
    status: Arc<RwLock<u8>>,
    daylight_savings_begin: Arc<RwLock<CosemDateTime>>,
    daylight_savings_end: Arc<RwLock<CosemDateTime>>,
    daylight_savings_deviation: Arc<RwLock<i8>>,
    daylight_savings_enabled: Arc<RwLock<bool>>,
    clock_base: Arc<RwLock<u8>>,
    /// Seconds, used by `adjust_to_measuring_period`
    measuring_period: u32,
    preset: Arc<RwLock<Option<PresetTime>>>,
}

impl Clock {
    pub const CLASS_ID: u16 = 8;
    pub const VERSION: u8 = 0;

    pub const ATTR_LOGICAL_NAME: u8 = 1;
    pub const ATTR_TIME: u8 = 2;
    pub const ATTR_TIME_ZONE: u8 = 3;
    pub const ATTR_STATUS: u8 = 4;
    pub const ATTR_DAYLIGHT_SAVINGS_BEGIN: u8 = 5;
    pub const ATTR_DAYLIGHT_SAVINGS_END: u8 = 6;
    pub const ATTR_DAYLIGHT_SAVINGS_DEVIATION: u8 = 7;
    pub const ATTR_DAYLIGHT_SAVINGS_ENABLED: u8 = 8;
    pub const ATTR_CLOCK_BASE: u8 = 9;

    pub const METHOD_ADJUST_TO_QUARTER: u8 = 1;
    pub const METHOD_ADJUST_TO_MEASURING_PERIOD: u8 = 2;
    pub const METHOD_ADJUST_TO_MINUTE: u8 = 3;
    pub const METHOD_ADJUST_TO_PRESET_TIME: u8 = 4;
    pub const METHOD_PRESET_ADJUSTING_TIME: u8 = 5;
    pub const METHOD_SHIFT_TIME: u8 = 6;

    /// Clock base: internal crystal
    pub const CLOCK_BASE_CRYSTAL: u8 = 1;

    const DEFAULT_MEASURING_PERIOD: u32 = 900;
    const MAX_SHIFT_SECONDS: i64 = 900;

    /// Default OBIS code for Clock (0-0:1.0.0.255)
    pub fn default_obis() -> ObisCode {
        ObisCode::new(0, 0, 1, 0, 0, 255)
    }

    /// # Arguments
    /// * `logical_name` - OBIS code identifying this object
    /// * `time` - Initial date-time
    /// * `time_zone` - Minutes from UTC
    pub fn new(logical_name: ObisCode, time: CosemDateTime, time_zone: i16) -> Self {
        let descriptor = ObjectDescriptor::new(ObjectType::Clock, Self::VERSION, 9, 6)
            .with_logical_name(logical_name)
            .with_static_attributes(&[
                Self::ATTR_TIME_ZONE,
                Self::ATTR_DAYLIGHT_SAVINGS_BEGIN,
                Self::ATTR_DAYLIGHT_SAVINGS_END,
                Self::ATTR_DAYLIGHT_SAVINGS_DEVIATION,
                Self::ATTR_DAYLIGHT_SAVINGS_ENABLED,
                Self::ATTR_CLOCK_BASE,
            ])
            .with_access_mode(Self::ATTR_STATUS, AccessMode::Read)
            .with_access_mode(Self::ATTR_CLOCK_BASE, AccessMode::Read);
        Self {
            descriptor: Arc::new(descriptor),
            time: Arc::new(RwLock::new(time)),
            time_zone: Arc::new(RwLock::new(time_zone)),
            status: Arc::new(RwLock::new(time.clock_status_byte())),
            daylight_savings_begin: Arc::new(RwLock::new(CosemDateTime::unspecified())),
            daylight_savings_end: Arc::new(RwLock::new(CosemDateTime::unspecified())),
            daylight_savings_deviation: Arc::new(RwLock::new(60)),
            daylight_savings_enabled: Arc::new(RwLock::new(false)),
            clock_base: Arc::new(RwLock::new(Self::CLOCK_BASE_CRYSTAL)),
            measuring_period: Self::DEFAULT_MEASURING_PERIOD,
            preset: Arc::new(RwLock::new(None)),
        }
    }

    /// Default OBIS code, time not yet set
    pub fn with_default_obis() -> Self {
        Self::new(Self::default_obis(), CosemDateTime::unspecified(), 0)
    }

    pub fn with_measuring_period(mut self, seconds: u32) -> Self {
        self.measuring_period = seconds.max(1);
        self
    }

    pub async fn time(&self) -> CosemDateTime {
        *self.time.read().await
    }

    /// Replace the stored time; the status attribute follows the time's status byte
    pub async fn set_time(&self, time: CosemDateTime) {
        *self.time.write().await = time;
        *self.status.write().await = time.clock_status_byte();
    }

    pub async fn time_zone(&self) -> i16 {
        *self.time_zone.read().await
    }

    pub async fn set_time_zone(&self, minutes: i16) {
        *self.time_zone.write().await = minutes;
    }

    pub async fn status(&self) -> u8 {
        *self.status.read().await
    }

    pub async fn daylight_savings_enabled(&self) -> bool {
        *self.daylight_savings_enabled.read().await
    }

    pub async fn preset(&self) -> Option<PresetTime> {
        *self.preset.read().await
    }

    /// Round the time to the nearest multiple of `period` seconds
    async fn round_to(&self, period: i64) -> DlmsResult<()> {
        let mut time = self.time.write().await;
        let seconds = time.to_epoch_seconds()?;
        let rounded = (seconds + period / 2).div_euclid(period) * period;
        *time = time.with_epoch_seconds(rounded)?;
        debug!("Clock adjusted by {} s to {}", rounded - seconds, *time);
        Ok(())
    }

    pub async fn adjust_to_quarter(&self) -> DlmsResult<()> {
        self.round_to(15 * 60).await
    }

    pub async fn adjust_to_measuring_period(&self) -> DlmsResult<()> {
        self.round_to(self.measuring_period as i64).await
    }

    pub async fn adjust_to_minute(&self) -> DlmsResult<()> {
        self.round_to(60).await
    }

    /// Store a pending adjustment for `adjust_to_preset_time`
    pub async fn preset_adjusting_time(&self, preset: PresetTime) -> DlmsResult<()> {
        if preset.validity_start.to_epoch_seconds()? > preset.validity_end.to_epoch_seconds()? {
            return Err(DlmsError::InvalidData(
                "Validity interval ends before it starts".to_string(),
            ));
        }
        *self.preset.write().await = Some(preset);
        Ok(())
    }

    /// Apply the pending adjustment if the time lies in its validity interval
    ///
    /// The adjustment is consumed either way. Returns whether it was applied.
    pub async fn adjust_to_preset_time(&self) -> DlmsResult<bool> {
        let Some(preset) = self.preset.write().await.take() else {
            return Ok(false);
        };
        let mut time = self.time.write().await;
        let now = time.to_epoch_seconds()?;
        let valid = preset.validity_start.to_epoch_seconds()? <= now
            && now <= preset.validity_end.to_epoch_seconds()?;
        if valid {
            *time = preset.preset;
            debug!("Clock set to preset time {}", *time);
        }
        Ok(valid)
    }

    /// Move the time by `seconds` in -900..=900
    pub async fn shift_time(&self, seconds: i16) -> DlmsResult<()> {
        let shift = seconds as i64;
        if shift.abs() > Self::MAX_SHIFT_SECONDS {
            return Err(DlmsError::InvalidData(format!(
                "Time shift must be within ±{} s, got {}",
                Self::MAX_SHIFT_SECONDS,
                seconds
            )));
        }
        let mut time = self.time.write().await;
        *time = time.with_epoch_seconds(time.to_epoch_seconds()? + shift)?;
        Ok(())
    }
}

fn date_time_value(time: &CosemDateTime) -> DataObject {
    DataObject::OctetString(time.encode())
}

/// Accepts the octet-string(12) form or a tagged date-time
fn parse_date_time(value: &DataObject) -> DlmsResult<CosemDateTime> {
    match value {
        DataObject::DateTime(time) => Ok(*time),
        other => CosemDateTime::decode(other.as_octet_string()?),
    }
}

fn parse_preset(parameters: Option<&DataObject>) -> DlmsResult<PresetTime> {
    let members = parameters
        .ok_or_else(|| DlmsError::InvalidData("preset_adjusting_time needs parameters".to_string()))?
        .as_structure()?;
    let [preset, validity_start, validity_end] = members else {
        return Err(DlmsError::InvalidData(format!(
            "preset_adjusting_time needs 3 members, got {}",
            members.len()
        )));
    };
    Ok(PresetTime {
        preset: parse_date_time(preset)?,
        validity_start: parse_date_time(validity_start)?,
        validity_end: parse_date_time(validity_end)?,
    })
}

#[async_trait]
impl CosemObject for Clock {
    fn descriptor(&self) -> &ObjectDescriptor {
        &self.descriptor
    }

    fn attribute_count(&self, _version: u8) -> u8 {
        9
    }

    fn method_count(&self, _version: u8) -> u8 {
        6
    }

    async fn data_type(&self, attribute_id: u8) -> DlmsResult<DataObjectType> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME
            | Self::ATTR_TIME
            | Self::ATTR_DAYLIGHT_SAVINGS_BEGIN
            | Self::ATTR_DAYLIGHT_SAVINGS_END => Ok(DataObjectType::OctetString),
            Self::ATTR_TIME_ZONE => Ok(DataObjectType::LongInteger),
            Self::ATTR_STATUS => Ok(DataObjectType::Unsigned),
            Self::ATTR_DAYLIGHT_SAVINGS_DEVIATION => Ok(DataObjectType::Integer),
            Self::ATTR_DAYLIGHT_SAVINGS_ENABLED => Ok(DataObjectType::Boolean),
            Self::ATTR_CLOCK_BASE => Ok(DataObjectType::Enumerate),
            _ => Err(no_such_attribute(self, attribute_id)),
        }
    }

    async fn get_attribute(&self, attribute_id: u8) -> DlmsResult<DataObject> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => Ok(self.descriptor.logical_name_value()),
            Self::ATTR_TIME => Ok(date_time_value(&self.time().await)),
            Self::ATTR_TIME_ZONE => Ok(DataObject::Integer16(self.time_zone().await)),
            Self::ATTR_STATUS => Ok(DataObject::Unsigned8(self.status().await)),
            Self::ATTR_DAYLIGHT_SAVINGS_BEGIN => {
                Ok(date_time_value(&*self.daylight_savings_begin.read().await))
            }
            Self::ATTR_DAYLIGHT_SAVINGS_END => {
                Ok(date_time_value(&*self.daylight_savings_end.read().await))
            }
            Self::ATTR_DAYLIGHT_SAVINGS_DEVIATION => Ok(DataObject::Integer8(
                *self.daylight_savings_deviation.read().await,
            )),
            Self::ATTR_DAYLIGHT_SAVINGS_ENABLED => {
                Ok(DataObject::Boolean(self.daylight_savings_enabled().await))
            }
            Self::ATTR_CLOCK_BASE => Ok(DataObject::Enumerate(*self.clock_base.read().await)),
            _ => Err(no_such_attribute(self, attribute_id)),
        }
    }

    async fn set_attribute(&self, attribute_id: u8, value: DataObject) -> DlmsResult<()> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => self.descriptor.write_logical_name(&value),
            Self::ATTR_TIME => {
                self.set_time(parse_date_time(&value)?).await;
                Ok(())
            }
            Self::ATTR_TIME_ZONE => match value {
                DataObject::Integer16(minutes) => {
                    self.set_time_zone(minutes).await;
                    Ok(())
                }
                other => Err(DlmsError::InvalidData(format!(
                    "time_zone must be long, got {:?}",
                    other.get_type()
                ))),
            },
            Self::ATTR_STATUS => {
                *self.status.write().await = value.as_u8()?;
                Ok(())
            }
            Self::ATTR_DAYLIGHT_SAVINGS_BEGIN => {
                *self.daylight_savings_begin.write().await = parse_date_time(&value)?;
                Ok(())
            }
            Self::ATTR_DAYLIGHT_SAVINGS_END => {
                *self.daylight_savings_end.write().await = parse_date_time(&value)?;
                Ok(())
            }
            Self::ATTR_DAYLIGHT_SAVINGS_DEVIATION => match value {
                DataObject::Integer8(minutes) => {
                    *self.daylight_savings_deviation.write().await = minutes;
                    Ok(())
                }
                other => Err(DlmsError::InvalidData(format!(
                    "daylight_savings_deviation must be integer, got {:?}",
                    other.get_type()
                ))),
            },
            Self::ATTR_DAYLIGHT_SAVINGS_ENABLED => {
                *self.daylight_savings_enabled.write().await = value.as_bool()?;
                Ok(())
            }
            Self::ATTR_CLOCK_BASE => {
                *self.clock_base.write().await = value.as_u8()?;
                Ok(())
            }
            _ => Err(no_such_attribute(self, attribute_id)),
        }
    }

    async fn invoke_method(
        &self,
        method_id: u8,
        parameters: Option<DataObject>,
    ) -> DlmsResult<Option<DataObject>> {
        match method_id {
            Self::METHOD_ADJUST_TO_QUARTER => self.adjust_to_quarter().await?,
            Self::METHOD_ADJUST_TO_MEASURING_PERIOD => self.adjust_to_measuring_period().await?,
            Self::METHOD_ADJUST_TO_MINUTE => self.adjust_to_minute().await?,
            Self::METHOD_ADJUST_TO_PRESET_TIME => {
                self.adjust_to_preset_time().await?;
            }
            Self::METHOD_PRESET_ADJUSTING_TIME => {
                self.preset_adjusting_time(parse_preset(parameters.as_ref())?)
                    .await?
            }
            Self::METHOD_SHIFT_TIME => match parameters {
                Some(DataObject::Integer16(seconds)) => self.shift_time(seconds).await?,
                _ => {
                    return Err(DlmsError::InvalidData(
                        "shift_time needs a long parameter".to_string(),
                    ));
                }
            },
            _ => return Err(no_such_method(self, method_id)),
        }
        Ok(None)
    }
}
