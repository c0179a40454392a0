//! COSEM date type and the calendar arithmetic shared by the date/time types

use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Field selector for COSEM date/time formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Year,
    Month,
    DayOfMonth,
    DayOfWeek,
    Hour,
    Minute,
    Second,
    Hundredths,
    Deviation,
    ClockStatus,
}

/// Fixed-length octet-string form shared by date, time and date-time
pub trait CosemDateFormat {
    /// Encode to the fixed-length octet-string form
    fn encode(&self) -> Vec<u8>;

    /// Length of the encoded form
    fn length(&self) -> usize;

    /// Read one field
    fn get(&self, field: Field) -> DlmsResult<u32>;
}

pub(crate) const NOT_SPECIFIED: u8 = 0xff;
const YEAR_NOT_SPECIFIED: u16 = 0xffff;
const DAYLIGHT_SAVINGS_END: u8 = 0xfd;
const DAYLIGHT_SAVINGS_BEGIN: u8 = 0xfe;
const LAST_DAY_OF_MONTH: u8 = 0xfe;
const SECOND_LAST_DAY_OF_MONTH: u8 = 0xfd;

/// COSEM date: year (u16 BE), month, day of month, day of week (1 = Monday)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CosemDate {
    octet_string: [u8; 5],
}

impl CosemDate {
    pub const LENGTH: usize = 5;

    /// Constructs a date with an unspecified day of week
    ///
    /// # Arguments
    ///
    /// * `year` - The year, or 0xffff if not specified
    /// * `month` - 1 to 12, 0xfd/0xfe for DST end/begin, or 0xff if not specified
    /// * `day_of_month` - 1 to 31, 0xfe/0xfd for last/second last day, or 0xff
    pub fn new(year: u16, month: u8, day_of_month: u8) -> DlmsResult<Self> {
        Self::new_with_day_of_week(year, month, day_of_month, NOT_SPECIFIED)
    }

    /// Constructs a date with an explicit day of week (1 to 7 or 0xff)
    pub fn new_with_day_of_week(
        year: u16,
        month: u8,
        day_of_month: u8,
        day_of_week: u8,
    ) -> DlmsResult<Self> {
        verify_month(month)?;
        verify_day_of_month(day_of_month)?;
        if !(1..=7).contains(&day_of_week) && day_of_week != NOT_SPECIFIED {
            return Err(DlmsError::InvalidData(format!(
                "Day of week is out of range [1, 7], got {}",
                day_of_week
            )));
        }

        let [year_hi, year_lo] = year.to_be_bytes();
        Ok(Self {
            octet_string: [year_hi, year_lo, month, day_of_month, day_of_week],
        })
    }

    /// A date with every field unspecified
    pub fn unspecified() -> Self {
        Self {
            octet_string: [0xff; 5],
        }
    }

    /// Decode from the 5-byte octet-string form
    pub fn decode(octet_string: &[u8]) -> DlmsResult<Self> {
        let octet_string: [u8; 5] = octet_string.try_into().map_err(|_| {
            DlmsError::InvalidData(format!(
                "Wrong size. Expected {}, got {}",
                Self::LENGTH,
                octet_string.len()
            ))
        })?;
        Ok(Self { octet_string })
    }

    pub fn year(&self) -> u16 {
        u16::from_be_bytes([self.octet_string[0], self.octet_string[1]])
    }

    pub fn month(&self) -> u8 {
        self.octet_string[2]
    }

    pub fn day_of_month(&self) -> u8 {
        self.octet_string[3]
    }

    pub fn day_of_week(&self) -> u8 {
        self.octet_string[4]
    }

    /// Days since 1970-01-01
    ///
    /// Fails unless year, month and day of month are concrete values.
    pub fn to_days(&self) -> DlmsResult<i64> {
        let (year, month, day) = (self.year(), self.month(), self.day_of_month());
        if year == YEAR_NOT_SPECIFIED || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(DlmsError::InvalidData(format!(
                "Date {} is not a concrete calendar day",
                self
            )));
        }
        Ok(days_from_civil(year as i64, month as u32, day as u32))
    }

    /// The calendar day `days` after 1970-01-01, day of week filled in
    pub fn from_days(days: i64) -> DlmsResult<Self> {
        let (year, month, day) = civil_from_days(days);
        let year = u16::try_from(year)
            .ok()
            .filter(|y| *y != YEAR_NOT_SPECIFIED)
            .ok_or_else(|| DlmsError::InvalidData(format!("Year {} is out of range", year)))?;
        // 1970-01-01 was a Thursday
        let day_of_week = ((days + 3).rem_euclid(7) + 1) as u8;
        Self::new_with_day_of_week(year, month as u8, day as u8, day_of_week)
    }
}

fn verify_month(month: u8) -> DlmsResult<()> {
    let special = matches!(month, DAYLIGHT_SAVINGS_END | DAYLIGHT_SAVINGS_BEGIN | NOT_SPECIFIED);
    if (1..=12).contains(&month) || special {
        Ok(())
    } else {
        Err(DlmsError::InvalidData(format!(
            "Parameter month is out of range, got {}",
            month
        )))
    }
}

fn verify_day_of_month(day_of_month: u8) -> DlmsResult<()> {
    let special = matches!(
        day_of_month,
        SECOND_LAST_DAY_OF_MONTH | LAST_DAY_OF_MONTH | NOT_SPECIFIED
    );
    if (1..=31).contains(&day_of_month) || special {
        Ok(())
    } else {
        Err(DlmsError::InvalidData(format!(
            "Parameter day of month is out of range, got {}",
            day_of_month
        )))
    }
}

/// Days from 1970-01-01 to the given proleptic Gregorian date
pub(crate) fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    let month = month as i64;
    let day_of_year = (153 * (if month > 2 { month - 3 } else { month + 9 }) + 2) / 5 + day as i64 - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Inverse of [`days_from_civil`]
pub(crate) fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let day_of_era = z - era * 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let mp = (5 * day_of_year + 2) / 153;
    let day = (day_of_year - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = year_of_era + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

impl CosemDateFormat for CosemDate {
    fn encode(&self) -> Vec<u8> {
        self.octet_string.to_vec()
    }

    fn length(&self) -> usize {
        Self::LENGTH
    }

    fn get(&self, field: Field) -> DlmsResult<u32> {
        match field {
            Field::Year => Ok(self.year() as u32),
            Field::Month => Ok(self.month() as u32),
            Field::DayOfMonth => Ok(self.day_of_month() as u32),
            Field::DayOfWeek => Ok(self.day_of_week() as u32),
            _ => Err(DlmsError::InvalidData(format!(
                "Field {:?} not found in CosemDate",
                field
            ))),
        }
    }
}

impl fmt::Display for CosemDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.year(),
            self.month(),
            self.day_of_month()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosem_date_new() {
        let date = CosemDate::new(2024, 1, 15).unwrap();
        assert_eq!(date.get(Field::Year).unwrap(), 2024);
        assert_eq!(date.get(Field::Month).unwrap(), 1);
        assert_eq!(date.get(Field::DayOfMonth).unwrap(), 15);
        assert_eq!(date.encode(), vec![0x07, 0xE8, 0x01, 0x0F, 0xFF]);
    }

    #[test]
    fn test_cosem_date_invalid() {
        assert!(CosemDate::new(2024, 13, 1).is_err());
        assert!(CosemDate::new(2024, 1, 32).is_err());
        assert!(CosemDate::new_with_day_of_week(2024, 1, 1, 8).is_err());
        assert!(CosemDate::decode(&[0x07, 0xE8]).is_err());
    }

    #[test]
    fn test_cosem_date_days() {
        let epoch = CosemDate::new(1970, 1, 1).unwrap();
        assert_eq!(epoch.to_days().unwrap(), 0);

        let leap_day = CosemDate::new(2024, 2, 29).unwrap();
        let days = leap_day.to_days().unwrap();
        assert_eq!(days, 19_782);

        let back = CosemDate::from_days(days).unwrap();
        assert_eq!(back.year(), 2024);
        assert_eq!(back.month(), 2);
        assert_eq!(back.day_of_month(), 29);
        // Thursday
        assert_eq!(back.day_of_week(), 4);
    }

    #[test]
    fn test_cosem_date_unspecified_has_no_days() {
        assert!(CosemDate::unspecified().to_days().is_err());
    }
}
