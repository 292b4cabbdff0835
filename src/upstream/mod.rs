//! Outbound data sources.
//!
//! Each adapter builds its request, calls the source through
//! [`UpstreamClient`] and maps the source's JSON into the gateway models.
//! The only retry anywhere is the single retry after an HTTP 429.

pub mod ltp_calculator;
pub mod upstox;
pub mod yahoo;

#[cfg(test)]
mod tests;

use crate::config::UpstreamConfig;
use dashmap::DashMap;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub use ltp_calculator::LtpCalculatorAdapter;
pub use upstox::UpstoxAdapter;
pub use yahoo::YahooAdapter;

/// Longest upstream body kept for diagnostics.
const MAX_BODY_CHARS: usize = 2_000;

/// Upstream error types.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The source answered with a non-2xx status.
    #[error("{source_name} returned HTTP {status}")]
    Status {
        /// Data source name.
        source_name: &'static str,
        /// Final HTTP status.
        status: u16,
        /// Response body, truncated.
        body: String,
        /// Request URL.
        url: String,
    },

    /// The request never produced a response.
    #[error("{source_name} request failed: {message}")]
    Transport {
        /// Data source name.
        source_name: &'static str,
        /// Transport error message.
        message: String,
        /// Request URL.
        url: String,
    },

    /// The response did not have the expected shape.
    #[error("{source_name} returned an invalid response: {details}")]
    InvalidShape {
        /// Data source name.
        source_name: &'static str,
        /// What was missing or malformed.
        details: String,
        /// Request URL.
        url: String,
    },

    /// A call arrived before the minimum gap since the previous one.
    #[error("{source_name} rate limit: retry in {retry_after_ms} ms")]
    RateLimited {
        /// Data source name.
        source_name: &'static str,
        /// Time until the next call is admitted.
        retry_after_ms: u64,
    },

    /// The source cannot be called with the current configuration.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// The HTTP client could not be built or the URL is invalid.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl UpstreamError {
    /// HTTP status reported by the source, if any.
    #[must_use]
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Request URL, if a request was made.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Status { url, .. }
            | Self::Transport { url, .. }
            | Self::InvalidShape { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Raw body or parse details for operators.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            Self::Transport { message, .. } => Some(message),
            Self::InvalidShape { details, .. } => Some(details),
            _ => None,
        }
    }
}

impl From<url::ParseError> for UpstreamError {
    fn from(err: url::ParseError) -> Self {
        UpstreamError::Client(format!("invalid URL: {}", err))
    }
}

/// Builds the shared HTTP client.
///
/// # Errors
/// Returns error if the TLS backend cannot be initialised.
pub fn build_http_client(config: &UpstreamConfig) -> Result<Client, UpstreamError> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| UpstreamError::Client(e.to_string()))
}

/// Builds `{base}/{path}?{params}`.
///
/// # Errors
/// Returns error if the base URL is invalid.
pub fn endpoint(base_url: &str, path: &str, params: &[(&str, &str)]) -> Result<Url, UpstreamError> {
    let raw = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = Url::parse(&raw)?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

/// HTTP access to one data source with the retry-after-429 policy.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    source_name: &'static str,
    retry_delay: Duration,
}

impl UpstreamClient {
    /// Creates a client for `source_name`.
    #[must_use]
    pub fn new(client: Client, source_name: &'static str, retry_delay: Duration) -> Self {
        Self {
            client,
            source_name,
            retry_delay,
        }
    }

    /// Data source name used in errors and logs.
    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source_name
    }

    /// GETs `url` and deserializes the JSON body.
    ///
    /// An HTTP 429 is retried once after the fixed delay.
    ///
    /// # Errors
    /// Returns [`UpstreamError::Status`] for a non-2xx final status,
    /// [`UpstreamError::InvalidShape`] when the body does not deserialize into
    /// `T` and [`UpstreamError::Transport`] when no response arrives.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> Result<T, UpstreamError> {
        debug!("{} GET {}", self.source_name, url);

        let mut response = self.send(url, headers.clone()).await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!(
                "{} returned 429 for {}, retrying once in {:?}",
                self.source_name, url, self.retry_delay
            );
            tokio::time::sleep(self.retry_delay).await;
            response = self.send(url, headers).await?;
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(url, &e))?;

        if !status.is_success() {
            warn!("{} returned HTTP {} for {}", self.source_name, status, url);
            return Err(UpstreamError::Status {
                source_name: self.source_name,
                status: status.as_u16(),
                body: truncate(&body),
                url: url.to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|e| self.invalid_shape(url, e.to_string()))
    }

    /// Builds an [`UpstreamError::InvalidShape`] for this source.
    #[must_use]
    pub fn invalid_shape(&self, url: &Url, details: impl Into<String>) -> UpstreamError {
        UpstreamError::InvalidShape {
            source_name: self.source_name,
            details: details.into(),
            url: url.to_string(),
        }
    }

    async fn send(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> Result<reqwest::Response, UpstreamError> {
        self.client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| self.transport_error(url, &e))
    }

    fn transport_error(&self, url: &Url, err: &reqwest::Error) -> UpstreamError {
        UpstreamError::Transport {
            source_name: self.source_name,
            message: err.to_string(),
            url: url.to_string(),
        }
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_BODY_CHARS {
        body.to_string()
    } else {
        body.chars().take(MAX_BODY_CHARS).collect()
    }
}

/// Enforces a minimum gap between consecutive calls to a source.
///
/// Calls arriving too early fail immediately; nothing is queued.
#[derive(Debug)]
pub struct RequestThrottle {
    source_name: &'static str,
    min_gap: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    /// Creates a throttle. A zero gap admits every call.
    #[must_use]
    pub fn new(source_name: &'static str, min_gap: Duration) -> Self {
        Self {
            source_name,
            min_gap,
            last_call: Mutex::new(None),
        }
    }

    /// Admits a call now or fails with [`UpstreamError::RateLimited`].
    ///
    /// # Errors
    /// Returns error when the previous admitted call is too recent.
    pub fn acquire(&self) -> Result<(), UpstreamError> {
        self.acquire_at(Instant::now())
    }

    /// Same as [`acquire`](Self::acquire) with an explicit clock.
    ///
    /// # Errors
    /// Returns error when the previous admitted call is too recent.
    pub fn acquire_at(&self, now: Instant) -> Result<(), UpstreamError> {
        let mut last_call = self.last_call.lock();
        if let Some(last) = *last_call {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_gap {
                let wait = self.min_gap - elapsed;
                return Err(UpstreamError::RateLimited {
                    source_name: self.source_name,
                    retry_after_ms: u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }
        *last_call = Some(now);
        Ok(())
    }
}

/// Cached expiry list for one symbol.
#[derive(Debug, Clone)]
struct CachedExpiries {
    expiries: Vec<String>,
    fetched_at: Instant,
}

/// Time-boxed expiry list cache keyed by symbol.
///
/// Entries only expire by TTL.
#[derive(Debug)]
pub struct ExpiryCache {
    entries: DashMap<String, CachedExpiries>,
    ttl: Duration,
}

impl ExpiryCache {
    /// Creates a cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Fresh expiries for `symbol`.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<Vec<String>> {
        self.get_at(symbol, Instant::now())
    }

    /// Fresh expiries for `symbol` as of `now`.
    #[must_use]
    pub fn get_at(&self, symbol: &str, now: Instant) -> Option<Vec<String>> {
        self.entries
            .get(symbol)
            .filter(|entry| now.saturating_duration_since(entry.fetched_at) < self.ttl)
            .map(|entry| entry.expiries.clone())
    }

    /// Stores expiries for `symbol`.
    pub fn insert(&self, symbol: &str, expiries: Vec<String>) {
        self.insert_at(symbol, expiries, Instant::now());
    }

    /// Stores expiries for `symbol` fetched at `now`.
    pub fn insert_at(&self, symbol: &str, expiries: Vec<String>, now: Instant) {
        self.entries.insert(
            symbol.to_string(),
            CachedExpiries {
                expiries,
                fetched_at: now,
            },
        );
    }
}

impl Default for ExpiryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(3_600))
    }
}
