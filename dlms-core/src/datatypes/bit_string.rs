//! Bit string type

use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A string of bits, most significant bit of the first byte first
///
/// On the wire the payload is the bit count (A-XDR length) followed by
/// `ceil(num_bits / 8)` bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitString {
    bytes: Vec<u8>,
    num_bits: usize,
}

impl BitString {
    /// Construct a bit string
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if `bytes` does not hold exactly the
    /// `ceil(num_bits / 8)` bytes needed for `num_bits`.
    pub fn new(bytes: Vec<u8>, num_bits: usize) -> DlmsResult<Self> {
        let needed = Self::byte_len(num_bits);
        if bytes.len() != needed {
            return Err(DlmsError::InvalidData(format!(
                "{} bits need {} bytes, got {}",
                num_bits,
                needed,
                bytes.len()
            )));
        }
        Ok(Self { bytes, num_bits })
    }

    /// Build from individual bits
    pub fn from_bits(bits: &[bool]) -> Self {
        let mut bytes = vec![0u8; Self::byte_len(bits.len())];
        for (index, bit) in bits.iter().enumerate() {
            if *bit {
                bytes[index / 8] |= 0x80 >> (index % 8);
            }
        }
        Self {
            bytes,
            num_bits: bits.len(),
        }
    }

    /// Bytes needed to carry `num_bits`
    pub fn byte_len(num_bits: usize) -> usize {
        num_bits.div_ceil(8)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Read one bit
    pub fn get_bit(&self, index: usize) -> DlmsResult<bool> {
        if index >= self.num_bits {
            return Err(DlmsError::InvalidData(format!(
                "Bit index {} out of bounds (num_bits: {})",
                index, self.num_bits
            )));
        }
        Ok(self.bytes[index / 8] & (0x80 >> (index % 8)) != 0)
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in 0..self.num_bits {
            let set = self.bytes[index / 8] & (0x80 >> (index % 8)) != 0;
            write!(f, "{}", u8::from(set))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_string_from_bits() {
        let bits = BitString::from_bits(&[true, false, true, true, false, false, false, false, true]);
        assert_eq!(bits.as_bytes(), &[0b1011_0000, 0b1000_0000]);
        assert_eq!(bits.num_bits(), 9);
        assert!(bits.get_bit(8).unwrap());
        assert!(bits.get_bit(9).is_err());
        assert_eq!(bits.to_string(), "101100001");
    }

    #[test]
    fn test_bit_string_length_mismatch() {
        assert!(BitString::new(vec![0xFF], 16).is_err());
        assert!(BitString::new(vec![0xFF, 0x00], 4).is_err());
        assert!(BitString::new(vec![0xF0], 4).is_ok());
    }
}
