use crate::sheets::SheetsError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Sheets(#[from] SheetsError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Machine-readable error codes shared by the auth and sheets layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingClientEmail,
    MissingPrivateKey,
    InvalidPrivateKey,
    JwtSigningFailed,
    TokenExchangeFailed,
    NotConfigured,
    InvalidRange,
    BadRequest,
    AuthError,
    PermissionDenied,
    NotFound,
    RateLimited,
    ServerError,
    NetworkError,
    RetryExhausted,
    HttpError,
    InvalidResponse,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingClientEmail => "MISSING_CLIENT_EMAIL",
            ErrorCode::MissingPrivateKey => "MISSING_PRIVATE_KEY",
            ErrorCode::InvalidPrivateKey => "INVALID_PRIVATE_KEY",
            ErrorCode::JwtSigningFailed => "JWT_SIGNING_FAILED",
            ErrorCode::TokenExchangeFailed => "TOKEN_EXCHANGE_FAILED",
            ErrorCode::NotConfigured => "NOT_CONFIGURED",
            ErrorCode::InvalidRange => "INVALID_RANGE",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::RetryExhausted => "RETRY_EXHAUSTED",
            ErrorCode::HttpError => "HTTP_ERROR",
            ErrorCode::InvalidResponse => "INVALID_RESPONSE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON error bodies are kept structured; anything else is kept as text.
pub(crate) fn parse_error_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
