//! LTP calculator (option analytics vendor) adapter.

use super::{ExpiryCache, RequestThrottle, UpstreamClient, UpstreamError, endpoint};
use crate::config::LtpCalculatorConfig;
use crate::expiry::ExpiryDate;
use crate::models::LtpCalculatorResponse;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Source name used in errors and logs.
pub const SOURCE_NAME: &str = "ltp-calculator";

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct RawExpiryList {
    data: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawLtpResponse {
    data: Option<RawLtpData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLtpData {
    fetch_time: Option<String>,
    direction: Option<String>,
    scenario: Option<String>,
    resistance: Option<RawLevels>,
    support: Option<RawLevels>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLevels {
    risky: Option<f64>,
    moderate: Option<f64>,
    max_gain: Option<f64>,
    max_pain: Option<f64>,
}

/// Resistance or support levels after validation.
struct Levels {
    risky: f64,
    moderate: f64,
    max_gain: f64,
    max_pain: f64,
}

/// Calls the LTP calculator vendor.
///
/// Quote requests are throttled to a minimum gap and never cached; expiry
/// lists are cached per symbol.
#[derive(Debug)]
pub struct LtpCalculatorAdapter {
    http: UpstreamClient,
    base_url: String,
    api_key: Option<String>,
    throttle: RequestThrottle,
    expiries: ExpiryCache,
}

impl LtpCalculatorAdapter {
    /// Creates the adapter.
    #[must_use]
    pub fn new(http: UpstreamClient, config: &LtpCalculatorConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            throttle: RequestThrottle::new(SOURCE_NAME, config.min_request_gap()),
            expiries: ExpiryCache::new(config.expiry_cache_ttl()),
        }
    }

    fn headers(&self) -> Result<HeaderMap, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| UpstreamError::Client("api key is not a valid header".to_string()))?;
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }
        Ok(headers)
    }

    /// Lists available expiries for `symbol`.
    ///
    /// Returns the list and whether it was served from the cache.
    ///
    /// # Errors
    /// Returns any error of [`UpstreamClient::get_json`], or
    /// [`UpstreamError::InvalidShape`] when `data` is missing.
    pub async fn list_expiries(&self, symbol: &str) -> Result<(Vec<String>, bool), UpstreamError> {
        if let Some(expiries) = self.expiries.get(symbol) {
            debug!("Expiry cache hit for {}", symbol);
            return Ok((expiries, true));
        }

        let url = endpoint(&self.base_url, "expiries", &[("symbol", symbol)])?;
        let raw: RawExpiryList = self.http.get_json(&url, self.headers()?).await?;
        let expiries = raw
            .data
            .ok_or_else(|| self.http.invalid_shape(&url, "missing data"))?;

        if !expiries.is_empty() {
            self.expiries.insert(symbol, expiries.clone());
        }
        Ok((expiries, false))
    }

    /// Fetches the support/resistance analysis of `symbol` for `expiry`.
    ///
    /// # Errors
    /// Returns [`UpstreamError::RateLimited`] when called within the minimum
    /// gap, any error of [`UpstreamClient::get_json`], or
    /// [`UpstreamError::InvalidShape`] when a field is missing.
    pub async fn fetch(
        &self,
        symbol: &str,
        expiry: ExpiryDate,
        lot_size: u32,
    ) -> Result<LtpCalculatorResponse, UpstreamError> {
        let expiry = expiry.vendor_format();
        let lot_size = lot_size.to_string();
        let url = endpoint(
            &self.base_url,
            "ltp-calculator",
            &[
                ("symbol", symbol),
                ("expiry", expiry.as_str()),
                ("lotSize", lot_size.as_str()),
            ],
        )?;
        let headers = self.headers()?;

        // Only requests that reach the vendor consume the gap.
        self.throttle.acquire()?;
        let raw: RawLtpResponse = self.http.get_json(&url, headers).await?;
        self.normalize(raw, symbol, &expiry, &url)
    }

    fn normalize(
        &self,
        raw: RawLtpResponse,
        symbol: &str,
        expiry: &str,
        url: &Url,
    ) -> Result<LtpCalculatorResponse, UpstreamError> {
        let data = raw
            .data
            .ok_or_else(|| self.http.invalid_shape(url, "missing data"))?;

        let direction = data
            .direction
            .ok_or_else(|| self.http.invalid_shape(url, "missing data.direction"))?;
        let scenario = data
            .scenario
            .ok_or_else(|| self.http.invalid_shape(url, "missing data.scenario"))?;
        let resistance = self.levels(data.resistance, "resistance", url)?;
        let support = self.levels(data.support, "support", url)?;

        Ok(LtpCalculatorResponse {
            fetch_time: data
                .fetch_time
                .unwrap_or_else(|| chrono::Local::now().to_rfc3339()),
            direction,
            risky_resistance: resistance.risky,
            risky_support: support.risky,
            moderate_resistance: resistance.moderate,
            moderate_support: support.moderate,
            r_max_gain: resistance.max_gain,
            s_max_gain: support.max_gain,
            r_max_pain: resistance.max_pain,
            s_max_pain: support.max_pain,
            scenario,
            symbol: symbol.to_string(),
            expiry: expiry.to_string(),
        })
    }

    fn levels(
        &self,
        raw: Option<RawLevels>,
        name: &str,
        url: &Url,
    ) -> Result<Levels, UpstreamError> {
        let raw = raw
            .ok_or_else(|| self.http.invalid_shape(url, format!("missing data.{}", name)))?;
        let field = |value: Option<f64>, key: &str| {
            value.ok_or_else(|| {
                self.http
                    .invalid_shape(url, format!("missing data.{}.{}", name, key))
            })
        };

        Ok(Levels {
            risky: field(raw.risky, "risky")?,
            moderate: field(raw.moderate, "moderate")?,
            max_gain: field(raw.max_gain, "maxGain")?,
            max_pain: field(raw.max_pain, "maxPain")?,
        })
    }
}
