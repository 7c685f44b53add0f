use std::fmt;

use shared::{
    error::{ApiError, ErrorCode},
    lifecycle::TransitionError,
};
use thiserror::Error;

pub type PortalResult<T> = Result<T, PortalError>;

/// Every problem found while checking a form, reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    problems: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, problem: impl Into<String>) {
        self.problems.push(problem.into());
    }

    pub fn missing(&mut self, field: &str) {
        self.push(format!("{field} is required"));
    }

    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn into_result(self) -> PortalResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(PortalError::ValidationFailed(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "please correct the form: {}", self.problems.join("; "))
    }
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("{0}")]
    ValidationFailed(ValidationErrors),
    #[error("{operation} failed{}: {message}", http_suffix(.status))]
    NetworkFailed {
        operation: String,
        status: Option<u16>,
        message: String,
    },
    #[error("{service} is unavailable: {message}")]
    ServiceUnavailable {
        service: &'static str,
        message: String,
    },
    #[error("{operation} returned an unexpected response: {message}")]
    Decode { operation: String, message: String },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("export failed: {0}")]
    Export(String),
}

fn http_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (HTTP {code})"))
        .unwrap_or_default()
}

impl PortalError {
    pub fn network(operation: impl Into<String>, err: reqwest::Error) -> Self {
        Self::NetworkFailed {
            operation: operation.into(),
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ValidationFailed(_) => ErrorCode::ValidationFailed,
            Self::NetworkFailed {
                status: Some(404), ..
            } => ErrorCode::NotFound,
            Self::NetworkFailed { .. } => ErrorCode::NetworkFailed,
            Self::ServiceUnavailable { .. } => ErrorCode::ServiceUnavailable,
            Self::Decode { .. } | Self::Config(_) | Self::Export(_) => ErrorCode::InvalidResponse,
            Self::Transition(_) => ErrorCode::TransitionRejected,
            Self::NotFound(_) => ErrorCode::NotFound,
        }
    }

    /// Whether repeating the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkFailed {
                status: Some(code), ..
            } => *code >= 500 || *code == 408 || *code == 429,
            other => other.code().is_retryable(),
        }
    }

    pub fn validation_problems(&self) -> Option<&[String]> {
        match self {
            Self::ValidationFailed(errors) => Some(errors.problems()),
            _ => None,
        }
    }
}

impl From<&PortalError> for ApiError {
    fn from(value: &PortalError) -> Self {
        let mut summary = ApiError::new(value.code(), value.to_string());
        summary.retryable = value.is_retryable();
        summary
    }
}
