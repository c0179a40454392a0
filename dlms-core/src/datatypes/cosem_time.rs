//! COSEM Time type

use crate::datatypes::cosem_date::{CosemDateFormat, Field, NOT_SPECIFIED};
use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// COSEM time: hour, minute, second, hundredths (0xff = not specified)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CosemTime {
    octet_string: [u8; 4],
}

impl CosemTime {
    pub const LENGTH: usize = 4;

    /// Constructs a time with unspecified hundredths
    pub fn new(hour: u8, minute: u8, second: u8) -> DlmsResult<Self> {
        Self::new_with_hundredths(hour, minute, second, NOT_SPECIFIED)
    }

    /// Constructs a time
    ///
    /// # Arguments
    ///
    /// * `hour` - 0 to 23, or 0xff if not specified
    /// * `minute` - 0 to 59, or 0xff if not specified
    /// * `second` - 0 to 59, or 0xff if not specified
    /// * `hundredths` - 0 to 99, or 0xff if not specified
    pub fn new_with_hundredths(
        hour: u8,
        minute: u8,
        second: u8,
        hundredths: u8,
    ) -> DlmsResult<Self> {
        verify(hour, "Hour", 23)?;
        verify(minute, "Minute", 59)?;
        verify(second, "Second", 59)?;
        verify(hundredths, "Hundredths", 99)?;
        Ok(Self {
            octet_string: [hour, minute, second, hundredths],
        })
    }

    /// A time with every field unspecified
    pub fn unspecified() -> Self {
        Self {
            octet_string: [NOT_SPECIFIED; 4],
        }
    }

    /// Decode from the 4-byte octet-string form
    pub fn decode(octet_string: &[u8]) -> DlmsResult<Self> {
        let octet_string: [u8; 4] = octet_string.try_into().map_err(|_| {
            DlmsError::InvalidData(format!(
                "Wrong size. Expected {}, got {}",
                Self::LENGTH,
                octet_string.len()
            ))
        })?;
        Ok(Self { octet_string })
    }

    pub fn hour(&self) -> u8 {
        self.octet_string[0]
    }

    pub fn minute(&self) -> u8 {
        self.octet_string[1]
    }

    pub fn second(&self) -> u8 {
        self.octet_string[2]
    }

    pub fn hundredths(&self) -> u8 {
        self.octet_string[3]
    }

    /// Seconds since midnight, fails if hour, minute or second is unspecified
    pub fn to_seconds(&self) -> DlmsResult<u32> {
        if [self.hour(), self.minute(), self.second()].contains(&NOT_SPECIFIED) {
            return Err(DlmsError::InvalidData(format!(
                "Time {} is not a concrete time of day",
                self
            )));
        }
        Ok(self.hour() as u32 * 3600 + self.minute() as u32 * 60 + self.second() as u32)
    }

    /// Time of day from seconds since midnight, hundredths set to zero
    pub fn from_seconds(seconds: u32) -> DlmsResult<Self> {
        let seconds = seconds % 86_400;
        Self::new_with_hundredths(
            (seconds / 3600) as u8,
            ((seconds / 60) % 60) as u8,
            (seconds % 60) as u8,
            0,
        )
    }
}

fn verify(value: u8, name: &str, upper_bound: u8) -> DlmsResult<()> {
    if value > upper_bound && value != NOT_SPECIFIED {
        Err(DlmsError::InvalidData(format!(
            "{} is out of range [0, {}], got {}",
            name, upper_bound, value
        )))
    } else {
        Ok(())
    }
}

impl CosemDateFormat for CosemTime {
    fn encode(&self) -> Vec<u8> {
        self.octet_string.to_vec()
    }

    fn length(&self) -> usize {
        Self::LENGTH
    }

    fn get(&self, field: Field) -> DlmsResult<u32> {
        match field {
            Field::Hour => Ok(self.hour() as u32),
            Field::Minute => Ok(self.minute() as u32),
            Field::Second => Ok(self.second() as u32),
            Field::Hundredths => Ok(self.hundredths() as u32),
            _ => Err(DlmsError::InvalidData(format!(
                "Field {:?} not found in CosemTime",
                field
            ))),
        }
    }
}

impl fmt::Display for CosemTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}
