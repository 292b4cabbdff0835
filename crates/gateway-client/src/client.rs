//! HTTP client for the gateway API.

use crate::error::Error;
use crate::types::*;
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use serde::Serialize;
use std::time::Duration;
use url::Url;


/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API (e.g., "http://localhost:8080").
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct OptionChainParams<'a> {
    instrument_key: &'a str,
    expiry_date: &'a str,
}

#[derive(Serialize)]
struct SymbolParams<'a> {
    symbol: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiry: Option<ExpiryKind>,
}

#[derive(Serialize)]
struct DateParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<&'a str>,
}

/// HTTP client for the Option Chain Gateway API.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        Url::parse(&config.base_url)?;
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Creates a new client with default configuration.
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be
    /// built.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::new(ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Performs a health check.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn health_check(&self) -> Result<HealthResponse, Error> {
        self.get("/health", None::<&()>).await
    }

    // ========================================================================
    // Option Chain
    // ========================================================================

    /// Gets the option chain of an instrument.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_option_chain(
        &self,
        instrument_key: &str,
        expiry_date: &str,
    ) -> Result<OptionChainResponse, Error> {
        let params = OptionChainParams {
            instrument_key,
            expiry_date,
        };
        self.get("/api/v1/option-chain", Some(&params)).await
    }

    // ========================================================================
    // LTP Calculator
    // ========================================================================

    /// Gets the support/resistance analysis of a symbol.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_ltp_calculator(
        &self,
        query: &LtpCalculatorQuery,
    ) -> Result<LtpCalculatorResponse, Error> {
        self.get("/api/v1/ltp-calculator", Some(query)).await
    }

    // ========================================================================
    // Yahoo Finance
    // ========================================================================

    /// Gets intraday candles.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_intraday(&self, query: &IntradayQuery) -> Result<Vec<Candle>, Error> {
        self.get("/api/v1/yahoo-finance/intraday", Some(query)).await
    }

    /// Gets the latest price of a symbol.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_latest_price(&self, symbol: &str) -> Result<LatestPrice, Error> {
        let params = SymbolParams {
            symbol,
            expiry: None,
        };
        self.get("/api/v1/yahoo-finance/latest-price", Some(&params))
            .await
    }

    // ========================================================================
    // Expiries
    // ========================================================================

    /// Lists vendor expiries for a symbol.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn list_expiries(
        &self,
        symbol: &str,
        preference: Option<ExpiryKind>,
    ) -> Result<ExpiryListResponse, Error> {
        let params = SymbolParams {
            symbol,
            expiry: preference,
        };
        self.get("/api/v1/expiries", Some(&params)).await
    }

    /// Gets the NIFTY expiry for a date (`YYYY-MM-DD`), today when `None`.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_nifty_expiry(&self, date: Option<&str>) -> Result<NiftyExpiryResponse, Error> {
        self.get("/api/v1/expiries/nifty", Some(&DateParams { date }))
            .await
    }

    // ========================================================================
    // Pricing
    // ========================================================================

    /// Prices a call/put pair.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn get_pricing_quote(&self, query: &PricingQuery) -> Result<OptionQuote, Error> {
        self.get("/api/v1/pricing/quote", Some(query)).await
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn url<Q: Serialize + ?Sized>(&self, path: &str, query: Option<&Q>) -> Result<String, Error> {
        let mut url = format!("{}{}", self.base_url, path);
        if let Some(q) = query {
            let params = serde_urlencoded::to_string(q)?;
            if !params.is_empty() {
                url.push('?');
                url.push_str(&params);
            }
        }
        Ok(url)
    }

    async fn get<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path, query)?;
        let resp = self.client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let text = resp.text().await.unwrap_or_default();
        let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
        let message = body.as_ref().map_or(text, |b| b.error.clone());

        match status.as_u16() {
            400 => Err(Error::InvalidRequest(message)),
            429 => Err(Error::RateLimited {
                retry_after,
                message,
            }),
            code => Err(Error::Api {
                status: code,
                code: body.map(|b| b.code),
                message,
            }),
        }
    }
}
