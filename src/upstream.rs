//! Caller-facing error envelope.
//!
//! Anything served to an external client goes through
//! [`create_upstream_safe_error`]: the real error is logged here and only a
//! generic message and correlation id leave the process.

use crate::error::AppError;
use crate::sheets::SheetsError;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::error;

pub const UPSTREAM_ERROR_STATUS: u16 = 502;
pub const UPSTREAM_ERROR_CODE: &str = "UPSTREAM_ERROR";
const UPSTREAM_ERROR_MESSAGE: &str = "The data service is temporarily unavailable. Please try again later.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamErrorResponse {
    pub ok: bool,
    pub status: u16,
    pub code: &'static str,
    pub message: &'static str,
    pub correlation_id: String,
    /// RFC 3339, UTC
    pub timestamp: String,
}

pub fn create_upstream_safe_error(
    error: &SheetsError,
    correlation_id: &str,
) -> UpstreamErrorResponse {
    error!(
        correlation_id,
        code = %error.code(),
        http_status = ?error.http_status(),
        details = ?error.details(),
        error = %error,
        "Upstream request failed"
    );

    UpstreamErrorResponse::new(correlation_id)
}

/// Same envelope for any application error; Sheets errors keep their
/// structured log record.
pub fn create_upstream_safe_app_error(
    error: &AppError,
    correlation_id: &str,
) -> UpstreamErrorResponse {
    match error {
        AppError::Sheets(e) => create_upstream_safe_error(e, correlation_id),
        other => {
            error!(correlation_id, error = %other, "Request failed");
            UpstreamErrorResponse::new(correlation_id)
        }
    }
}

impl UpstreamErrorResponse {
    fn new(correlation_id: &str) -> Self {
        UpstreamErrorResponse {
            ok: false,
            status: UPSTREAM_ERROR_STATUS,
            code: UPSTREAM_ERROR_CODE,
            message: UPSTREAM_ERROR_MESSAGE,
            correlation_id: correlation_id.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
