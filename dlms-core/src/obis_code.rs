use crate::error::{DlmsError, DlmsResult};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Reduced-ID form `A-B:C.D.E*F`, the `*F` group is optional
const REDUCED_ID_PATTERN: &str = r"^(\d{1,3})-(\d{1,3}):(\d{1,3})\.(\d{1,3})\.(\d{1,3})(?:\*(\d{1,3}))?$";

/// OBIS (Object Identification System) code for identifying COSEM objects
///
/// OBIS codes are 6-byte identifiers used in DLMS/COSEM to uniquely identify
/// objects in a logical device. Attribute 1 of every interface class carries
/// the object's OBIS code as a 6-byte octet-string. Serde uses the dotted
/// text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObisCode {
    bytes: [u8; 6],
}

impl ObisCode {
    /// Length of the octet-string form
    pub const LENGTH: usize = 6;

    /// Create a new OBIS code from individual bytes
    pub fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self {
            bytes: [a, b, c, d, e, f],
        }
    }

    /// Build an OBIS code from the octet-string form of attribute 1
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` unless `bytes` holds exactly six octets.
    pub fn from_bytes(bytes: &[u8]) -> DlmsResult<Self> {
        let bytes: [u8; 6] = bytes.try_into().map_err(|_| {
            DlmsError::InvalidData(format!(
                "Logical name must be {} bytes, got {}",
                Self::LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Parse an OBIS code from string format
    ///
    /// Supports formats like:
    /// - "1.1.1.8.0.255"
    /// - "1-0:1.8.0*255" (F defaults to 255 when the `*F` group is omitted)
    pub fn from_string(s: &str) -> DlmsResult<Self> {
        let s = s.trim();
        if s.contains(':') {
            Self::parse_reduced_id(s)
        } else {
            Self::parse_dot_format(s)
        }
    }

    fn parse_dot_format(s: &str) -> DlmsResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 6 {
            return Err(DlmsError::InvalidData(format!(
                "Invalid OBIS code format: {}",
                s
            )));
        }

        let mut bytes = [0u8; 6];
        for (slot, part) in bytes.iter_mut().zip(&parts) {
            *slot = parse_group(part)?;
        }
        Ok(Self { bytes })
    }

    fn parse_reduced_id(s: &str) -> DlmsResult<Self> {
        let pattern = Regex::new(REDUCED_ID_PATTERN)
            .map_err(|e| DlmsError::InvalidData(format!("OBIS pattern: {}", e)))?;
        let captures = pattern
            .captures(s)
            .ok_or_else(|| DlmsError::InvalidData(format!("Invalid OBIS code format: {}", s)))?;

        let mut bytes = [255u8; 6];
        for (i, slot) in bytes.iter_mut().enumerate() {
            if let Some(group) = captures.get(i + 1) {
                *slot = parse_group(group.as_str())?;
            }
        }
        Ok(Self { bytes })
    }

    /// Get the OBIS code as a byte array
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Get the OBIS code as a copied byte array
    pub fn to_bytes(&self) -> [u8; 6] {
        self.bytes
    }

    pub fn a(&self) -> u8 {
        self.bytes[0]
    }

    pub fn b(&self) -> u8 {
        self.bytes[1]
    }

    pub fn c(&self) -> u8 {
        self.bytes[2]
    }

    pub fn d(&self) -> u8 {
        self.bytes[3]
    }

    pub fn e(&self) -> u8 {
        self.bytes[4]
    }

    pub fn f(&self) -> u8 {
        self.bytes[5]
    }
}

fn parse_group(part: &str) -> DlmsResult<u8> {
    part.parse::<u8>()
        .map_err(|_| DlmsError::InvalidData(format!("Invalid OBIS group value: {}", part)))
}

impl FromStr for ObisCode {
    type Err = DlmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl Serialize for ObisCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObisCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_string(&text).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}.{}",
            self.bytes[0], self.bytes[1], self.bytes[2],
            self.bytes[3], self.bytes[4], self.bytes[5]
        )
    }
}
