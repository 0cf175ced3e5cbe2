//! Unified error handling for the activity-map library.
//!
//! The clustering core is infallible. Errors only arise in the surrounding
//! layer: configuration validation, marker ingestion, marker sources and
//! JSON exchange with the mobile side.

use thiserror::Error;

/// Unified error type for activity-map operations.
#[derive(Debug, Clone, Error)]
pub enum MapError {
    /// A clustering configuration value is out of range
    #[error("Configuration error: {message}")]
    InvalidConfig { message: String },

    /// A marker could not be accepted (bad coordinates, malformed record)
    #[error("Marker '{marker_id}' is invalid: {message}")]
    InvalidMarker { marker_id: String, message: String },

    /// The marker source could not deliver a snapshot
    #[error("Marker source unavailable: {message}")]
    SourceUnavailable { message: String },

    /// JSON encoding/decoding failed
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for activity-map operations.
pub type Result<T> = std::result::Result<T, MapError>;

/// Extension trait for converting Option to MapError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an invalid marker error.
    fn ok_or_invalid_marker(self, marker_id: &str, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_marker(self, marker_id: &str, message: &str) -> Result<T> {
        self.ok_or_else(|| MapError::InvalidMarker {
            marker_id: marker_id.to_string(),
            message: message.to_string(),
        })
    }
}
