use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationFailed,
    NetworkFailed,
    ServiceUnavailable,
    NotFound,
    InvalidResponse,
    TransitionRejected,
}

impl ErrorCode {
    /// Network and upstream-service failures may succeed on a later attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::NetworkFailed | Self::ServiceUnavailable)
    }
}

/// Serializable summary of a failed operation, used for machine-readable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }
}
