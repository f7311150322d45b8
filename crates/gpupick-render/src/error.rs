//! Rendering error types.

use gpupick_core::PickError;
use thiserror::Error;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Buffer mapping for readback failed.
    #[error("buffer map failed: {0}")]
    BufferMapFailed(#[from] wgpu::BufferAsyncError),

    /// Waiting on the device failed.
    #[error("device poll failed: {0}")]
    PollFailed(#[from] wgpu::PollError),

    /// The readback callback never fired.
    #[error("timeout waiting for GPU")]
    Timeout,

    /// A pixel outside the target was requested.
    #[error("pixel ({x}, {y}) is outside the target")]
    PixelOutOfBounds { x: u32, y: u32 },

    /// A render target handle does not refer to a live target.
    #[error("unknown render target {0}")]
    UnknownTarget(usize),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for PickError {
    fn from(err: RenderError) -> Self {
        PickError::RenderingUnavailable(err.to_string())
    }
}
