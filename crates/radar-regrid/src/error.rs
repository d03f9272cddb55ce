//! Error types for radar regridding.

use std::fmt;

use projection::ProjectionError;
use thiserror::Error;

/// Pipeline stage at which a sample failed to transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStage {
    /// Polar-to-geographic conversion.
    Geographic,
    /// Geographic-to-rotated-pole conversion.
    RotatedPole,
}

impl fmt::Display for TransformStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geographic => write!(f, "polar-to-geographic"),
            Self::RotatedPole => write!(f, "rotated-pole"),
        }
    }
}

/// Errors that can occur during regridding.
///
/// Cache failures are not represented here: they are recovered inside the
/// index matrix builder and only logged (see [`crate::cache::CacheError`]).
#[derive(Error, Debug)]
pub enum RegridError {
    /// Invalid grid or pipeline configuration.
    #[error("configuration error in `{field}`: {message}")]
    Configuration { field: String, message: String },

    /// A sample could not be transformed; the whole run is aborted.
    #[error("transform failed for sample {index} (azimuth row {row}, range bin {col}) at {stage} stage: {source}")]
    Transform {
        index: usize,
        row: usize,
        col: usize,
        stage: TransformStage,
        #[source]
        source: ProjectionError,
    },

    /// The value array does not fit the index matrix or sample set.
    #[error("sample count mismatch: expected {expected} samples, got {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },

    /// The sample source could not produce a scan.
    #[error("sample source error: {0}")]
    Source(String),
}

impl RegridError {
    /// Create a Configuration error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a Source error.
    pub fn source_failed(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Whether this error stems from configuration (fatal, never retried).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

impl From<std::io::Error> for RegridError {
    fn from(err: std::io::Error) -> Self {
        Self::Source(err.to_string())
    }
}

impl From<serde_json::Error> for RegridError {
    fn from(err: serde_json::Error) -> Self {
        Self::Source(format!("JSON error: {}", err))
    }
}

/// Result type for regridding operations.
pub type Result<T> = std::result::Result<T, RegridError>;
