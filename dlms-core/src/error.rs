use thiserror::Error;

/// Error type shared by the object model, the codec and the capture engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DlmsError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("A-XDR encoding error: {0}")]
    Asn1Encoding(String),

    #[error("A-XDR decoding error: {0}")]
    Asn1Decoding(String),

    /// Index out of range or refused by the access table
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The index exists in a later version of the interface class only
    #[error("Attribute or method {index} of class {class_id} is not defined in version {version}")]
    UnsupportedVersion { class_id: u16, version: u8, index: u8 },

    /// Template and capture buffer are out of step
    #[error("Malformed capture: {0}")]
    MalformedCapture(String),

    /// A capture object points at an attribute the engine cannot handle
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl DlmsError {
    /// Whether a bulk operation may continue after this error
    ///
    /// Per-attribute access failures are recoverable; a desynchronized
    /// template/buffer pair is not.
    pub fn is_access_error(&self) -> bool {
        matches!(
            self,
            DlmsError::AccessDenied(_) | DlmsError::UnsupportedVersion { .. }
        )
    }
}

/// Result type alias for DLMS/COSEM operations
pub type DlmsResult<T> = Result<T, DlmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_version_message() {
        let err = DlmsError::UnsupportedVersion {
            class_id: 8,
            version: 0,
            index: 10,
        };
        assert_eq!(
            err.to_string(),
            "Attribute or method 10 of class 8 is not defined in version 0"
        );
        assert!(err.is_access_error());
    }

    #[test]
    fn test_malformed_capture_is_not_access_error() {
        let err = DlmsError::MalformedCapture("short".to_string());
        assert!(!err.is_access_error());
    }
}
