//! Error types for the REST API.

use crate::upstream::UpstreamError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

#[cfg(test)]
mod tests;

/// API error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
    /// Always `error`.
    pub status: String,
    /// Upstream body or parse details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Upstream request URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Symbol or instrument of the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// HTTP status returned by the upstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

/// Operator-facing context of an upstream failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamDiagnostics {
    /// Upstream body or parse details.
    pub details: Option<String>,
    /// Upstream request URL.
    pub url: Option<String>,
    /// Symbol or instrument of the request.
    pub symbol: Option<String>,
    /// HTTP status returned by the upstream.
    pub upstream_status: Option<u16>,
}

impl UpstreamDiagnostics {
    fn from_error(err: &UpstreamError, symbol: Option<&str>) -> Self {
        Self {
            details: err.details().map(str::to_string),
            url: err.url().map(str::to_string),
            symbol: symbol.map(str::to_string),
            upstream_status: err.upstream_status(),
        }
    }
}

/// API error types.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, retry in {retry_after_secs} s")]
    RateLimitExceeded {
        /// Seconds until the next call is admitted.
        retry_after_secs: u64,
    },

    /// An upstream data source failed.
    #[error("Upstream error: {message}")]
    Upstream {
        /// Summary of the failure.
        message: String,
        /// Present only when diagnostics are exposed.
        diagnostics: Option<Box<UpstreamDiagnostics>>,
    },

    /// No data source could serve the request.
    #[error("Service unavailable: {message}")]
    ServiceUnavailable {
        /// Summary of the failure.
        message: String,
        /// Present only when diagnostics are exposed.
        diagnostics: Option<Box<UpstreamDiagnostics>>,
    },

    /// Internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Maps an adapter error for an endpoint that reports upstream failures
    /// as 502.
    ///
    /// Rate limits become 429 and client setup failures 500.
    #[must_use]
    pub fn upstream(err: &UpstreamError, symbol: Option<&str>, expose: bool) -> Self {
        match err {
            UpstreamError::RateLimited { retry_after_ms, .. } => ApiError::RateLimitExceeded {
                retry_after_secs: retry_after_ms.div_ceil(1_000).max(1),
            },
            UpstreamError::Client(message) => ApiError::Internal(message.clone()),
            _ => ApiError::Upstream {
                message: err.to_string(),
                diagnostics: diagnostics(err, symbol, expose),
            },
        }
    }

    /// Maps an adapter error for an endpoint that reports upstream failures
    /// as 503.
    #[must_use]
    pub fn unavailable(err: &UpstreamError, symbol: Option<&str>, expose: bool) -> Self {
        ApiError::ServiceUnavailable {
            message: err.to_string(),
            diagnostics: diagnostics(err, symbol, expose),
        }
    }

    /// HTTP status and error code of this error.
    #[must_use]
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::RateLimitExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")
            }
            ApiError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

fn diagnostics(
    err: &UpstreamError,
    symbol: Option<&str>,
    expose: bool,
) -> Option<Box<UpstreamDiagnostics>> {
    expose.then(|| Box::new(UpstreamDiagnostics::from_error(err, symbol)))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let mut body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            status: "error".to_string(),
            details: None,
            url: None,
            symbol: None,
            upstream_status: None,
        };

        match self {
            ApiError::RateLimitExceeded { retry_after_secs } => (
                status,
                [("Retry-After", retry_after_secs.to_string())],
                Json(body),
            )
                .into_response(),
            ApiError::Upstream { diagnostics, .. }
            | ApiError::ServiceUnavailable { diagnostics, .. } => {
                if let Some(diagnostics) = diagnostics {
                    body.details = diagnostics.details;
                    body.url = diagnostics.url;
                    body.symbol = diagnostics.symbol;
                    body.upstream_status = diagnostics.upstream_status;
                }
                (status, Json(body)).into_response()
            }
            _ => (status, Json(body)).into_response(),
        }
    }
}
