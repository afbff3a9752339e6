use crate::auth::AuthError;
use crate::error::{ErrorCode, parse_error_body};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SheetsError {
    #[error("Sheets client is not configured: missing {0}")]
    NotConfigured(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Invalid range: {details}")]
    InvalidRange { status: Option<u16>, details: Value },

    #[error("Bad request: {details}")]
    BadRequest { details: Value },

    #[error("Unauthorized: {details}")]
    Unauthorized { details: Value },

    #[error("Permission denied: {details}")]
    PermissionDenied { details: Value },

    #[error("Not found: {details}")]
    NotFound { details: Value },

    #[error("Rate limited: {details}")]
    RateLimited {
        retry_after: Option<Duration>,
        details: Value,
    },

    #[error("Server error ({status}): {details}")]
    Server {
        status: u16,
        retry_after: Option<Duration>,
        details: Value,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        last: Box<SheetsError>,
    },

    #[error("Unexpected HTTP status {status}: {details}")]
    Http { status: u16, details: Value },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SheetsError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SheetsError::NotConfigured(_) => ErrorCode::NotConfigured,
            SheetsError::Auth(e) => e.code(),
            SheetsError::InvalidRange { .. } => ErrorCode::InvalidRange,
            SheetsError::BadRequest { .. } => ErrorCode::BadRequest,
            SheetsError::Unauthorized { .. } => ErrorCode::AuthError,
            SheetsError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            SheetsError::NotFound { .. } => ErrorCode::NotFound,
            SheetsError::RateLimited { .. } => ErrorCode::RateLimited,
            SheetsError::Server { .. } => ErrorCode::ServerError,
            SheetsError::Network(_) => ErrorCode::NetworkError,
            SheetsError::RetryExhausted { .. } => ErrorCode::RetryExhausted,
            SheetsError::Http { .. } => ErrorCode::HttpError,
            SheetsError::InvalidResponse(_) => ErrorCode::InvalidResponse,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            SheetsError::InvalidRange { status, .. } => *status,
            SheetsError::BadRequest { .. } => Some(400),
            SheetsError::Unauthorized { .. } => Some(401),
            SheetsError::PermissionDenied { .. } => Some(403),
            SheetsError::NotFound { .. } => Some(404),
            SheetsError::RateLimited { .. } => Some(429),
            SheetsError::Server { status, .. } | SheetsError::Http { status, .. } => Some(*status),
            SheetsError::Auth(AuthError::TokenExchangeFailed { status, .. }) => *status,
            SheetsError::RetryExhausted { last, .. } => last.http_status(),
            _ => None,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            SheetsError::InvalidRange { details, .. }
            | SheetsError::BadRequest { details }
            | SheetsError::Unauthorized { details }
            | SheetsError::PermissionDenied { details }
            | SheetsError::NotFound { details }
            | SheetsError::RateLimited { details, .. }
            | SheetsError::Server { details, .. }
            | SheetsError::Http { details, .. } => Some(details),
            SheetsError::Auth(AuthError::TokenExchangeFailed { details, .. }) => Some(details),
            SheetsError::RetryExhausted { last, .. } => last.details(),
            _ => None,
        }
    }

    /// Rate limiting, server errors and network failures may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SheetsError::RateLimited { .. } | SheetsError::Server { .. } | SheetsError::Network(_)
        )
    }

    /// Server-directed wait before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SheetsError::RateLimited { retry_after, .. }
            | SheetsError::Server { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub(crate) fn network(error: reqwest::Error) -> Self {
        SheetsError::Network(error.to_string())
    }
}

/// Map a failed Sheets API response to a typed error.
pub fn classify_response(status: u16, retry_after: Option<&str>, body: &str) -> SheetsError {
    let details = parse_error_body(body);
    let retry_after = retry_after.and_then(|value| parse_retry_after(value, Utc::now()));

    match status {
        400 if mentions_range(&details) => SheetsError::InvalidRange {
            status: Some(status),
            details,
        },
        400 => SheetsError::BadRequest { details },
        401 => SheetsError::Unauthorized { details },
        403 => SheetsError::PermissionDenied { details },
        404 => SheetsError::NotFound { details },
        429 => SheetsError::RateLimited {
            retry_after,
            details,
        },
        500..=599 => SheetsError::Server {
            status,
            retry_after,
            details,
        },
        _ => SheetsError::Http { status, details },
    }
}

// Google wraps errors as {"error": {"code", "message", "status"}}
fn mentions_range(details: &Value) -> bool {
    let message = details
        .pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| details.to_string());
    message.to_lowercase().contains("range")
}

/// Parse a `Retry-After` header given as delta-seconds or an HTTP-date.
///
/// Dates in the past yield a zero delay.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - now;
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}
