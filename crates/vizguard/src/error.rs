//! Error types for the vizguard library.

use thiserror::Error;

/// Main error type for vizguard operations.
///
/// Only structural failures surface here. Quality findings and grammar
/// violations are carried in report types (`QualityReport`,
/// `ValidationResult`) so that one bad column never hides the rest.
#[derive(Debug, Error)]
pub enum VizguardError {
    /// Malformed or unrecognized transform specification.
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    /// Structural data problem: unparseable dates, missing or empty fields.
    #[error("Bad data: {0}")]
    BadData(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for vizguard operations.
pub type Result<T> = std::result::Result<T, VizguardError>;
