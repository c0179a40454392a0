//! COSEM DateTime type

use crate::datatypes::cosem_date::{CosemDate, CosemDateFormat, Field};
use crate::datatypes::cosem_time::CosemTime;
use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deviation value meaning "not specified" (0x8000 on the wire)
pub const DEVIATION_NOT_SPECIFIED: i16 = i16::MIN;

const SECONDS_PER_DAY: i64 = 86_400;

/// Clock status flags for COSEM DateTime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockStatus {
    InvalidValue = 0x01,
    DoubtfulValue = 0x02,
    DifferentClockBase = 0x04,
    InvalidClockStatus = 0x08,
    DaylightSavingActive = 0x80,
}

impl ClockStatus {
    const ALL: [ClockStatus; 5] = [
        ClockStatus::InvalidValue,
        ClockStatus::DoubtfulValue,
        ClockStatus::DifferentClockBase,
        ClockStatus::InvalidClockStatus,
        ClockStatus::DaylightSavingActive,
    ];

    /// Fold flags into the status byte
    pub fn to_byte(statuses: &[ClockStatus]) -> u8 {
        statuses.iter().fold(0, |byte, status| byte | *status as u8)
    }

    /// Split a status byte into its flags
    pub fn from_byte(byte: u8) -> Vec<ClockStatus> {
        Self::ALL
            .into_iter()
            .filter(|status| byte & *status as u8 != 0)
            .collect()
    }
}

/// COSEM date-time: date, time, deviation (minutes) and clock status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CosemDateTime {
    date: CosemDate,
    time: CosemTime,
    deviation: i16,
    clock_status: u8,
}

impl CosemDateTime {
    pub const LENGTH: usize = 12;

    /// Constructs a date-time with unspecified deviation and empty status
    pub fn new(
        year: u16,
        month: u8,
        day_of_month: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> DlmsResult<Self> {
        Ok(Self {
            date: CosemDate::new(year, month, day_of_month)?,
            time: CosemTime::new_with_hundredths(hour, minute, second, 0)?,
            deviation: DEVIATION_NOT_SPECIFIED,
            clock_status: 0,
        })
    }

    /// Constructs a date-time from its components
    ///
    /// # Arguments
    ///
    /// * `deviation` - Minutes from local time to UTC in [-720, 720], or
    ///   [`DEVIATION_NOT_SPECIFIED`]
    /// * `clock_status` - Clock status flags
    pub fn from_date_time(
        date: CosemDate,
        time: CosemTime,
        deviation: i16,
        clock_status: &[ClockStatus],
    ) -> DlmsResult<Self> {
        validate_deviation(deviation)?;
        Ok(Self {
            date,
            time,
            deviation,
            clock_status: ClockStatus::to_byte(clock_status),
        })
    }

    /// A date-time with every field unspecified and an empty status
    pub fn unspecified() -> Self {
        Self {
            date: CosemDate::unspecified(),
            time: CosemTime::unspecified(),
            deviation: DEVIATION_NOT_SPECIFIED,
            clock_status: 0,
        }
    }

    /// Replace the deviation
    pub fn with_deviation(mut self, deviation: i16) -> DlmsResult<Self> {
        validate_deviation(deviation)?;
        self.deviation = deviation;
        Ok(self)
    }

    /// Replace the clock status byte
    pub fn with_clock_status(mut self, clock_status: u8) -> Self {
        self.clock_status = clock_status;
        self
    }

    /// Decode from the 12-byte octet-string form
    pub fn decode(octet_string: &[u8]) -> DlmsResult<Self> {
        if octet_string.len() != Self::LENGTH {
            return Err(DlmsError::InvalidData(format!(
                "Array has an invalid length. Expected {}, got {}",
                Self::LENGTH,
                octet_string.len()
            )));
        }

        Ok(Self {
            date: CosemDate::decode(&octet_string[0..5])?,
            time: CosemTime::decode(&octet_string[5..9])?,
            deviation: i16::from_be_bytes([octet_string[9], octet_string[10]]),
            clock_status: octet_string[11],
        })
    }

    /// Wall-clock seconds since 1970-01-01 00:00:00, deviation not applied
    pub fn to_epoch_seconds(&self) -> DlmsResult<i64> {
        Ok(self.date.to_days()? * SECONDS_PER_DAY + self.time.to_seconds()? as i64)
    }

    /// Same deviation and status, wall clock moved to `seconds`
    pub fn with_epoch_seconds(&self, seconds: i64) -> DlmsResult<Self> {
        let days = seconds.div_euclid(SECONDS_PER_DAY);
        let second_of_day = seconds.rem_euclid(SECONDS_PER_DAY) as u32;
        Ok(Self {
            date: CosemDate::from_days(days)?,
            time: CosemTime::from_seconds(second_of_day)?,
            deviation: self.deviation,
            clock_status: self.clock_status,
        })
    }

    pub fn date(&self) -> &CosemDate {
        &self.date
    }

    pub fn time(&self) -> &CosemTime {
        &self.time
    }

    pub fn deviation(&self) -> i16 {
        self.deviation
    }

    /// Clock status as flags
    pub fn clock_status(&self) -> Vec<ClockStatus> {
        ClockStatus::from_byte(self.clock_status)
    }

    /// Clock status as the raw byte
    pub fn clock_status_byte(&self) -> u8 {
        self.clock_status
    }
}

fn validate_deviation(deviation: i16) -> DlmsResult<()> {
    if (-720..=720).contains(&deviation) || deviation == DEVIATION_NOT_SPECIFIED {
        Ok(())
    } else {
        Err(DlmsError::InvalidData(format!(
            "Deviation is out of range [-720, 720], got {}",
            deviation
        )))
    }
}

impl CosemDateFormat for CosemDateTime {
    fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(Self::LENGTH);
        result.extend_from_slice(&self.date.encode());
        result.extend_from_slice(&self.time.encode());
        result.extend_from_slice(&self.deviation.to_be_bytes());
        result.push(self.clock_status);
        result
    }

    fn length(&self) -> usize {
        Self::LENGTH
    }

    fn get(&self, field: Field) -> DlmsResult<u32> {
        match field {
            Field::Year | Field::Month | Field::DayOfMonth | Field::DayOfWeek => {
                self.date.get(field)
            }
            Field::Hour | Field::Minute | Field::Second | Field::Hundredths => self.time.get(field),
            Field::Deviation => Ok(self.deviation as u16 as u32),
            Field::ClockStatus => Ok(self.clock_status as u32),
        }
    }
}

impl fmt::Display for CosemDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}
