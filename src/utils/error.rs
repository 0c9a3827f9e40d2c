//! Error types and handling
//!
//! Application-level error type and the message shape surfaced to the user.

use crate::recorder::SessionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Error response shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        let code = match error {
            AppError::Session(SessionError::Capture(_)) => "CAPTURE_ERROR",
            AppError::Session(SessionError::UnsupportedCodec { .. }) => "UNSUPPORTED_CODEC",
            AppError::Session(SessionError::InvalidState { .. }) => "INVALID_STATE",
            AppError::Session(SessionError::RecorderConstruction(_)) => "RECORDER_CONSTRUCTION",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::UnknownCommand(_) => "UNKNOWN_COMMAND",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self::from(&error)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use crate::recorder::SessionState;

    #[test]
    fn test_capture_denial_code() {
        let error = AppError::from(SessionError::Capture(CaptureError::PermissionDenied(
            "user dismissed the picker".to_string(),
        )));
        let response = ErrorResponse::from(&error);
        assert_eq!(response.code, "CAPTURE_ERROR");
        assert!(response.message.contains("user dismissed the picker"));
    }

    #[test]
    fn test_invalid_state_message() {
        let error = AppError::from(SessionError::InvalidState {
            operation: "pause",
            state: SessionState::Idle,
        });
        let response: ErrorResponse = error.into();
        assert_eq!(response.code, "INVALID_STATE");
        assert_eq!(response.to_string(), "[INVALID_STATE] cannot pause while idle");
    }
}
