//! Error types for stroke rendering.

use thiserror::Error;

use crate::state::PassState;

/// Errors produced while building stroke geometry or driving the renderer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrokeError {
    /// A segment count, radius, or other setting is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The begin/draw/end protocol was violated.
    #[error("cannot {operation} while the stroke pass is {state}")]
    InvalidState {
        /// The rejected operation, e.g. `"begin"`.
        operation: &'static str,
        /// The pass state at the time of the call.
        state: PassState,
    },

    /// A shader program, buffer, or framebuffer could not be allocated.
    #[error("GPU resource initialization failed: {0}")]
    ResourceInitialization(String),
}

/// Result type for stroke rendering operations.
pub type Result<T> = std::result::Result<T, StrokeError>;
