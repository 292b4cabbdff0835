//! Upstox option chain adapter.

use super::{UpstreamClient, UpstreamError, endpoint};
use crate::config::UpstoxConfig;
use crate::expiry::ExpiryDate;
use crate::models::{MarketData, OptionChainData, OptionGreeks, OptionLeg};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

/// Source name used in errors and logs.
pub const SOURCE_NAME: &str = "upstox";

#[derive(Debug, Deserialize)]
struct RawChainResponse {
    status: Option<String>,
    data: Option<Vec<RawChainRow>>,
}

#[derive(Debug, Deserialize)]
struct RawChainRow {
    expiry: Option<String>,
    pcr: Option<f64>,
    strike_price: Option<f64>,
    underlying_key: Option<String>,
    underlying_spot_price: Option<f64>,
    call_options: Option<RawLeg>,
    put_options: Option<RawLeg>,
}

#[derive(Debug, Deserialize)]
struct RawLeg {
    instrument_key: Option<String>,
    market_data: Option<MarketData>,
    option_greeks: Option<OptionGreeks>,
}

/// Fetches put/call option chains from Upstox.
#[derive(Debug, Clone)]
pub struct UpstoxAdapter {
    http: UpstreamClient,
    base_url: String,
    access_token: Option<String>,
}

impl UpstoxAdapter {
    /// Creates the adapter.
    #[must_use]
    pub fn new(http: UpstreamClient, config: &UpstoxConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        }
    }

    /// Fetches the option chain of `instrument_key` for `expiry`.
    ///
    /// Responses are never cached.
    ///
    /// # Errors
    /// Returns [`UpstreamError::NotConfigured`] without an access token, and
    /// any error of [`UpstreamClient::get_json`] or shape validation.
    pub async fn fetch_option_chain(
        &self,
        instrument_key: &str,
        expiry: ExpiryDate,
    ) -> Result<Vec<OptionChainData>, UpstreamError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(UpstreamError::NotConfigured(SOURCE_NAME))?;

        let expiry_iso = expiry.iso_format();
        let url = endpoint(
            &self.base_url,
            "option/chain",
            &[("instrument_key", instrument_key), ("expiry_date", expiry_iso.as_str())],
        )?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| UpstreamError::Client("access token is not a valid header".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);

        let raw: RawChainResponse = self.http.get_json(&url, headers).await?;
        self.normalize(raw, &expiry_iso, &url)
    }

    fn normalize(
        &self,
        raw: RawChainResponse,
        expiry_iso: &str,
        url: &Url,
    ) -> Result<Vec<OptionChainData>, UpstreamError> {
        match raw.status.as_deref() {
            Some("success") => {}
            other => {
                return Err(self.http.invalid_shape(
                    url,
                    format!("unexpected status {:?}", other.unwrap_or("<missing>")),
                ));
            }
        }

        let rows = raw
            .data
            .ok_or_else(|| self.http.invalid_shape(url, "missing data"))?;

        let mut chain = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let strike_price = row.strike_price.ok_or_else(|| {
                self.http
                    .invalid_shape(url, format!("data[{}] missing strike_price", index))
            })?;
            let underlying_spot_price = row.underlying_spot_price.ok_or_else(|| {
                self.http.invalid_shape(
                    url,
                    format!("data[{}] missing underlying_spot_price", index),
                )
            })?;

            chain.push(OptionChainData {
                expiry: row.expiry.unwrap_or_else(|| expiry_iso.to_string()),
                pcr: row.pcr,
                strike_price,
                underlying_key: row.underlying_key,
                underlying_spot_price,
                call_options: self.leg(row.call_options, index, "call_options", url)?,
                put_options: self.leg(row.put_options, index, "put_options", url)?,
            });
        }

        chain.sort_by(|a, b| a.strike_price.total_cmp(&b.strike_price));
        Ok(chain)
    }

    fn leg(
        &self,
        raw: Option<RawLeg>,
        index: usize,
        side: &str,
        url: &Url,
    ) -> Result<Option<OptionLeg>, UpstreamError> {
        let Some(raw) = raw else {
            return Ok(None);
        };

        let market_data = raw.market_data.ok_or_else(|| {
            self.http
                .invalid_shape(url, format!("data[{}].{} missing market_data", index, side))
        })?;
        let option_greeks = raw.option_greeks.ok_or_else(|| {
            self.http
                .invalid_shape(url, format!("data[{}].{} missing option_greeks", index, side))
        })?;

        Ok(Some(OptionLeg {
            instrument_key: raw.instrument_key,
            market_data,
            option_greeks,
        }))
    }
}
