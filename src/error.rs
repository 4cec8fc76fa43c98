//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use std::io;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the response store and configuration.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem failure while reading or writing a store file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A persisted entry could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A persisted entry was written with an unknown format version
    #[error("Unsupported entry format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    /// The store was closed or shut down
    #[error("Store is closed")]
    Closed,

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let err: CacheError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, CacheError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("not json");
        let err: CacheError = parse.unwrap_err().into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = CacheError::UnsupportedFormat {
            found: 7,
            expected: 1,
        };
        assert_eq!(
            err.to_string(),
            "Unsupported entry format version 7 (expected 1)"
        );
    }
}
