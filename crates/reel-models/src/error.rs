//! Validation errors for model construction.

use thiserror::Error;

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when a model value fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Invalid project id: {0}")]
    InvalidProjectId(String),

    #[error("Unknown resolution: {0}")]
    UnknownResolution(String),

    #[error("Unknown project status: {0}")]
    UnknownStatus(String),

    #[error("Duration must be a positive number of seconds, got {0}")]
    InvalidDuration(u32),

    #[error("Logo opacity must be within [0, 1], got {0}")]
    InvalidOpacity(f32),
}
