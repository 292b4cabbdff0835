//! Error types for the gateway client.

use thiserror::Error;


/// Client error types.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Query string could not be encoded.
    #[error("Query encoding failed: {0}")]
    Query(#[from] serde_urlencoded::ser::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The gateway rejected the request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The gateway asked to slow down.
    #[error("Rate limited, retry after {retry_after:?} s: {message}")]
    RateLimited {
        /// Value of the `Retry-After` header.
        retry_after: Option<u64>,
        /// Error message from the gateway.
        message: String,
    },

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code from the body, when it was a gateway error.
        code: Option<String>,
        /// Error message from API.
        message: String,
    },
}

impl Error {
    /// HTTP status of an error response, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::InvalidRequest(_) => Some(400),
            Self::RateLimited { .. } => Some(429),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
