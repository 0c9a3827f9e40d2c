//! Session errors

use super::media::RecorderError;
use super::state::SessionState;
use crate::capture::CaptureError;
use thiserror::Error;

/// Errors surfaced by the session controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Codec {codec} is not supported on this platform")]
    UnsupportedCodec { codec: String },

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Failed to create media recorder: {0}")]
    RecorderConstruction(#[from] RecorderError),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
