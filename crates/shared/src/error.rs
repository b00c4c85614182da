use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    NotFound,
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::Validation,
            404 => Self::NotFound,
            502..=504 => Self::Unavailable,
            _ => Self::Internal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, status: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
        }
    }

    /// Builds an error from a failed response, preferring the server's own
    /// `message` over a generic status line.
    pub fn from_status(status: u16, body_message: Option<String>) -> Self {
        let message = body_message
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| format!("server responded with HTTP {status}"));
        Self::new(ErrorCode::from_status(status), status, message)
    }
}

#[derive(Debug, Error)]
#[error("{code:?} (HTTP {status}): {message}")]
pub struct ApiException {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
}

impl From<ApiError> for ApiException {
    fn from(value: ApiError) -> Self {
        Self {
            code: value.code,
            status: value.status,
            message: value.message,
        }
    }
}

impl From<ApiException> for ApiError {
    fn from(value: ApiException) -> Self {
        Self {
            code: value.code,
            status: value.status,
            message: value.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_server_message() {
        let err = ApiError::from_status(400, Some("Gecersiz istek".into()));
        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, "Gecersiz istek");
    }

    #[test]
    fn falls_back_to_status_line() {
        let err = ApiError::from_status(503, Some("  ".into()));
        assert_eq!(err.code, ErrorCode::Unavailable);
        assert_eq!(err.message, "server responded with HTTP 503");
        let exception = ApiException::from(err);
        assert!(exception.to_string().contains("HTTP 503"));
    }
}
