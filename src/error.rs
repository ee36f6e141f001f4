/// Error kinds shared by the viewport, renderers and compositor.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    /// Caller passed a value the operation cannot accept (non-finite phase,
    /// length mismatch, phasing a real-only trace).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Operation called in a state it does not support (no rendering
    /// context, non-monotonic series).
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),
    /// Aggregate requested over nothing.
    #[error("Empty input: {0}")]
    EmptyInput(String),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ViewError>;

/// Reject NaN and infinities with a message naming the offending argument.
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ViewError::InvalidArgument(format!(
            "{} must be finite, got {}",
            name, value
        )))
    }
}
