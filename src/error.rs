//! Error types for the EPCIS transcoder

use thiserror::Error;

/// Transcoder error type, one variant per failure kind the conversion
/// pipeline can surface.
#[derive(Error, Debug)]
pub enum EpcisError {
    /// The version-detector prefix scan never found a `schemaVersion` marker.
    #[error("schema version marker not found in document prefix")]
    SchemaVersionMissing,

    /// A `schemaVersion` marker was found but its value is not `1.2` or `2.0`.
    #[error("unsupported schema version: {0}")]
    UnsupportedVersion(String),

    /// The requested `(from, to)` media/version pair has no defined stage graph.
    #[error("unsupported conversion: {0}")]
    UnsupportedConversion(String),

    /// XML or JSON failed to parse as well-formed input.
    #[error("malformed input at {0}")]
    MalformedInput(String),

    /// The injected validator rejected an event or the envelope.
    #[error("validation failed: {0}")]
    ValidationFailure(String),

    /// The caller-supplied event mapper hook returned an error.
    #[error("event mapper failed: {0}")]
    MappingFailure(String),

    /// An upstream or downstream stream failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other errors not covered by a more specific variant.
    #[error("{0}")]
    Other(String),
}

/// Result type for transcoder operations
pub type EpcisResult<T> = Result<T, EpcisError>;

impl From<quick_xml::Error> for EpcisError {
    fn from(e: quick_xml::Error) -> Self {
        EpcisError::MalformedInput(e.to_string())
    }
}

impl From<serde_json::Error> for EpcisError {
    fn from(e: serde_json::Error) -> Self {
        EpcisError::MalformedInput(e.to_string())
    }
}

impl From<std::str::Utf8Error> for EpcisError {
    fn from(e: std::str::Utf8Error) -> Self {
        EpcisError::MalformedInput(e.to_string())
    }
}
