//! Error types for coordinate transforms.

use thiserror::Error;

/// Errors raised by the projection functions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    /// An input or output coordinate was NaN or infinite.
    #[error("non-finite {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    /// An input coordinate was finite but outside its valid domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ProjectionError {
    /// Create an InvalidInput error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Reject NaN/infinite values with a descriptive error.
#[inline]
pub(crate) fn ensure_finite(what: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProjectionError::NonFinite { what, value })
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
