//! The begin/draw/end protocol shared by every stroke renderer.
//!
//! A renderer is [`Idle`](PassState::Idle) until [`begin`](PassState::begin)
//! opens the offscreen pass, stays [`Recording`](PassState::Recording) while
//! stamps are submitted, and returns to idle at [`end`](PassState::end).
//! Nested passes are rejected.

use std::fmt;

use crate::error::{Result, StrokeError};

/// Where a renderer is in its compositing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassState {
    /// No offscreen pass is open.
    #[default]
    Idle,
    /// The offscreen pass is open and accepting draws.
    Recording,
}

impl PassState {
    /// Transition `Idle -> Recording`.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] if a pass is already open.
    pub fn begin(&mut self) -> Result<()> {
        match self {
            Self::Idle => {
                *self = Self::Recording;
                Ok(())
            }
            Self::Recording => Err(self.reject("begin")),
        }
    }

    /// Check that `operation` may run, i.e. a pass is open.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] when idle.
    pub fn require_recording(self, operation: &'static str) -> Result<()> {
        match self {
            Self::Recording => Ok(()),
            Self::Idle => Err(self.reject(operation)),
        }
    }

    /// Check that `operation` may run, i.e. no pass is open.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] while recording.
    pub fn require_idle(self, operation: &'static str) -> Result<()> {
        match self {
            Self::Idle => Ok(()),
            Self::Recording => Err(self.reject(operation)),
        }
    }

    /// Transition `Recording -> Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] if no pass is open.
    pub fn end(&mut self) -> Result<()> {
        self.require_recording("end")?;
        *self = Self::Idle;
        Ok(())
    }

    /// Whether a pass is currently open.
    #[must_use]
    pub fn is_recording(self) -> bool {
        self == Self::Recording
    }

    fn reject(self, operation: &'static str) -> StrokeError {
        tracing::error!(operation, state = %self, "stroke pass protocol violated");
        StrokeError::InvalidState {
            operation,
            state: self,
        }
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Recording => f.write_str("recording"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn begin_then_end_returns_to_idle() {
        let mut state = PassState::Idle;
        assert!(state.begin().is_ok());
        assert!(state.is_recording());
        assert!(state.end().is_ok());
        assert_eq!(state, PassState::Idle);
    }

    #[test]
    fn double_begin_is_rejected() {
        let mut state = PassState::Idle;
        state.begin().unwrap();
        let err = state.begin().unwrap_err();
        assert_eq!(
            err,
            StrokeError::InvalidState {
                operation: "begin",
                state: PassState::Recording,
            }
        );
        // The open pass is left untouched.
        assert!(state.is_recording());
    }

    #[test]
    fn end_without_begin_is_rejected() {
        let mut state = PassState::Idle;
        assert!(matches!(
            state.end(),
            Err(StrokeError::InvalidState {
                operation: "end",
                state: PassState::Idle,
            })
        ));
    }

    #[test]
    fn draw_requires_recording() {
        assert!(PassState::Idle.require_recording("draw").is_err());
        assert!(PassState::Recording.require_recording("draw").is_ok());
    }

    #[test]
    fn resize_requires_idle() {
        assert!(PassState::Idle.require_idle("resize").is_ok());
        assert_eq!(
            PassState::Recording.require_idle("resize"),
            Err(StrokeError::InvalidState {
                operation: "resize",
                state: PassState::Recording,
            })
        );
    }

    #[test]
    fn error_message_names_operation_and_state() {
        let err = PassState::Idle.require_recording("draw").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot draw while the stroke pass is idle"
        );
    }
}
