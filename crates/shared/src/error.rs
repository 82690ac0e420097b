use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    Conflict,
    Internal,
}

/// Error body every endpoint answers with on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub success: bool,
    pub code: ErrorCode,
    pub error: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            error: error.into(),
        }
    }
}

/// A request the backend answered, but refused: non-2xx status or
/// `success: false`. Carries the server's own message when it sent one.
#[derive(Debug, Clone, Error)]
#[error("backend rejected request (status {status}): {message}")]
pub struct BackendRejection {
    pub status: u16,
    pub message: String,
}

impl BackendRejection {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ApiError> for BackendRejection {
    fn from(value: ApiError) -> Self {
        let status = match value.code {
            ErrorCode::Unauthorized => 401,
            ErrorCode::NotFound => 404,
            ErrorCode::Validation => 400,
            ErrorCode::Conflict => 409,
            ErrorCode::Internal => 500,
        };
        Self {
            status,
            message: value.error,
        }
    }
}
