//! Error types for gpupick.

use thiserror::Error;

/// The main error type for pick operations.
///
/// Only backend-level resource failures surface here. Per-item problems
/// (missing geometry, unsupported features) are absorbed by the adapter.
#[derive(Error, Debug)]
pub enum PickError {
    /// The graphics backend could not allocate the pick target, render, or
    /// read the pick pixel back.
    #[error("rendering unavailable: {0}")]
    RenderingUnavailable(String),

    /// Options could not be parsed.
    #[error("invalid picker options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}

impl PickError {
    /// Whether this error means the graphics context could not serve the pick.
    #[must_use]
    pub fn is_rendering_unavailable(&self) -> bool {
        matches!(self, Self::RenderingUnavailable(_))
    }
}

/// A specialized Result type for pick operations.
pub type Result<T> = std::result::Result<T, PickError>;
