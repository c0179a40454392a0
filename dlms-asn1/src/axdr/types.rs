//! A-XDR length encoding

use dlms_core::{DlmsError, DlmsResult};

/// Deepest type description the decoder accepts
pub const MAX_TYPE_DEPTH: usize = 32;

/// Length prefix for strings, arrays and structures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthEncoding {
    /// Length < 128, one byte
    Short(u8),
    /// Length >= 128, `0x80 | n` followed by `n` big-endian bytes
    Long(usize),
}

impl LengthEncoding {
    /// Pick the shortest form for `len`
    pub fn for_len(len: usize) -> Self {
        match u8::try_from(len) {
            Ok(short) if short < 0x80 => LengthEncoding::Short(short),
            _ => LengthEncoding::Long(len),
        }
    }

    /// The length value
    pub fn len(&self) -> usize {
        match self {
            LengthEncoding::Short(len) => *len as usize,
            LengthEncoding::Long(len) => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wire form
    pub fn encode(&self) -> Vec<u8> {
        match self {
            LengthEncoding::Short(len) => vec![*len],
            LengthEncoding::Long(len) => {
                let be = len.to_be_bytes();
                let skip = be.iter().take_while(|b| **b == 0).count().min(be.len() - 1);
                let mut result = Vec::with_capacity(1 + be.len() - skip);
                result.push(0x80 | (be.len() - skip) as u8);
                result.extend_from_slice(&be[skip..]);
                result
            }
        }
    }

    /// Parse a length prefix, returning it with the number of bytes consumed
    pub fn decode(bytes: &[u8]) -> DlmsResult<(Self, usize)> {
        let first = *bytes
            .first()
            .ok_or_else(|| DlmsError::Asn1Decoding("Not enough bytes for length".to_string()))?;
        if first & 0x80 == 0 {
            return Ok((LengthEncoding::Short(first), 1));
        }

        let length_of_length = (first & 0x7F) as usize;
        if length_of_length == 0 || length_of_length > 4 {
            return Err(DlmsError::Asn1Decoding(format!(
                "Invalid length-of-length: {}",
                length_of_length
            )));
        }
        let digits = bytes.get(1..=length_of_length).ok_or_else(|| {
            DlmsError::Asn1Decoding("Not enough bytes for long length".to_string())
        })?;
        let len = digits.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
        Ok((LengthEncoding::Long(len), 1 + length_of_length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_encoding_short() {
        let enc = LengthEncoding::for_len(10);
        assert_eq!(enc, LengthEncoding::Short(10));
        assert_eq!(enc.encode(), vec![10]);
    }

    #[test]
    fn test_length_encoding_long() {
        let enc = LengthEncoding::for_len(256);
        let bytes = enc.encode();
        assert_eq!(bytes, vec![0x82, 0x01, 0x00]);
        let (decoded, consumed) = LengthEncoding::decode(&bytes).unwrap();
        assert_eq!(decoded.len(), 256);
        assert_eq!(consumed, 3);

        assert_eq!(LengthEncoding::for_len(200).encode(), vec![0x81, 200]);
    }

    #[test]
    fn test_length_encoding_truncated() {
        assert!(LengthEncoding::decode(&[]).is_err());
        assert!(LengthEncoding::decode(&[0x82, 0x01]).is_err());
        assert!(LengthEncoding::decode(&[0x85, 0, 0, 0, 0, 1]).is_err());
    }
}
