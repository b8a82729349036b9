//! Chat4BA Error Types
//!
//! 애플리케이션 전역 에러 타입 정의

use serde::Serialize;
use thiserror::Error;

/// 백엔드 호출 실패를 호출자에게 노출하는 정규화된 에러
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Server error ({status}): {}", .message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },

    #[error("Authentication expired")]
    AuthenticationExpired,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// 사용자에게 보여줄 메시지 (토스트, 채팅 에러 메시지용)
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => {
                "Unable to reach the server. Please check your connection and try again.".to_string()
            }
            ApiError::Rejected { detail, .. } => detail.clone(),
            ApiError::Server { message: Some(message), .. } => message.clone(),
            ApiError::Server { status, message: None } => {
                format!("Something went wrong on the server (status {}). Please try again.", status)
            }
            ApiError::AuthenticationExpired => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ApiError::MalformedResponse(_) => {
                "The server returned an unexpected response.".to_string()
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "NETWORK_ERROR",
            ApiError::Rejected { .. } => "REQUEST_REJECTED",
            ApiError::Server { .. } => "SERVER_ERROR",
            ApiError::AuthenticationExpired => "AUTH_EXPIRED",
            ApiError::MalformedResponse(_) => "MALFORMED_RESPONSE",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::MalformedResponse(error.to_string())
        } else {
            ApiError::Network(error.to_string())
        }
    }
}

/// Chat4BA 애플리케이션 에러
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// 명령 응답용 직렬화 가능한 에러
#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Store(_) => "STORE_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Api(api) => api.code(),
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Spreadsheet(_) => "SPREADSHEET_ERROR",
            AppError::Login(_) => "LOGIN_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidOperation(_) => "INVALID_OPERATION",
        };

        let (message, details) = match &error {
            AppError::Api(api) => (api.user_message(), Some(api.to_string())),
            _ => (error.to_string(), None),
        };

        CommandError {
            code: code.to_string(),
            message,
            details,
        }
    }
}

impl From<ApiError> for CommandError {
    fn from(error: ApiError) -> Self {
        CommandError::from(AppError::Api(error))
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// 명령 결과 타입
pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_without_message_uses_generic_text() {
        let err = ApiError::Server { status: 502, message: None };
        assert!(err.user_message().contains("status 502"));
    }

    #[test]
    fn test_command_error_keeps_api_code() {
        let err = CommandError::from(ApiError::AuthenticationExpired);
        assert_eq!(err.code, "AUTH_EXPIRED");
        assert_eq!(err.message, "Your session has expired. Please sign in again.");
    }
}
