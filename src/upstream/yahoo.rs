//! Yahoo Finance chart adapter.

use super::{UpstreamClient, UpstreamError};
use crate::config::YahooConfig;
use crate::models::{Candle, ChartInterval, ChartRange, LatestPrice};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

/// Source name used in errors and logs.
pub const SOURCE_NAME: &str = "yahoo-finance";

#[derive(Debug, Deserialize)]
struct RawChartResponse {
    chart: Option<RawChart>,
}

#[derive(Debug, Deserialize)]
struct RawChart {
    result: Option<Vec<RawChartResult>>,
    error: Option<RawChartError>,
}

#[derive(Debug, Deserialize)]
struct RawChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChartResult {
    meta: Option<RawMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Option<RawIndicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMeta {
    regular_market_price: Option<f64>,
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawIndicators {
    #[serde(default)]
    quote: Vec<RawQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct RawQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Reads candles and quotes from the Yahoo Finance chart API.
#[derive(Debug, Clone)]
pub struct YahooAdapter {
    http: UpstreamClient,
    base_url: String,
}

impl YahooAdapter {
    /// Creates the adapter.
    #[must_use]
    pub fn new(http: UpstreamClient, config: &YahooConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
        }
    }

    fn chart_url(
        &self,
        symbol: &str,
        interval: ChartInterval,
        range: ChartRange,
    ) -> Result<Url, UpstreamError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|()| UpstreamError::Client(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        url.query_pairs_mut()
            .append_pair("interval", interval.as_str())
            .append_pair("range", range.as_str());
        Ok(url)
    }

    async fn chart(
        &self,
        symbol: &str,
        interval: ChartInterval,
        range: ChartRange,
    ) -> Result<(RawChartResult, Url), UpstreamError> {
        let url = self.chart_url(symbol, interval, range)?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let raw: RawChartResponse = self.http.get_json(&url, headers).await?;
        let chart = raw
            .chart
            .ok_or_else(|| self.http.invalid_shape(&url, "missing chart"))?;

        if let Some(error) = chart.error {
            let details = format!(
                "chart error {}: {}",
                error.code.as_deref().unwrap_or("unknown"),
                error.description.as_deref().unwrap_or("no description")
            );
            return Err(self.http.invalid_shape(&url, details));
        }

        let result = chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| self.http.invalid_shape(&url, "missing chart.result"))?;
        Ok((result, url))
    }

    /// Intraday candles of `symbol`, oldest first.
    ///
    /// Bars with a missing open, high, low or close are skipped.
    ///
    /// # Errors
    /// Returns any error of [`UpstreamClient::get_json`], or
    /// [`UpstreamError::InvalidShape`] when the chart reports an error or
    /// has no result.
    pub async fn intraday(
        &self,
        symbol: &str,
        interval: ChartInterval,
        range: ChartRange,
    ) -> Result<Vec<Candle>, UpstreamError> {
        let (result, url) = self.chart(symbol, interval, range).await?;
        if result.timestamp.is_empty() {
            return Ok(Vec::new());
        }

        let quote = result
            .indicators
            .and_then(|indicators| indicators.quote.into_iter().next())
            .ok_or_else(|| self.http.invalid_shape(&url, "missing indicators.quote"))?;

        Ok(zip_candles(&result.timestamp, &quote))
    }

    /// Latest regular market price of `symbol`.
    ///
    /// # Errors
    /// Returns any error of [`intraday`](Self::intraday), or
    /// [`UpstreamError::InvalidShape`] when the price is missing.
    pub async fn latest_price(&self, symbol: &str) -> Result<LatestPrice, UpstreamError> {
        let (result, url) = self
            .chart(symbol, ChartInterval::OneMinute, ChartRange::OneDay)
            .await?;
        let meta = result
            .meta
            .ok_or_else(|| self.http.invalid_shape(&url, "missing meta"))?;

        Ok(LatestPrice {
            time: meta
                .regular_market_time
                .ok_or_else(|| self.http.invalid_shape(&url, "missing meta.regularMarketTime"))?,
            price: meta
                .regular_market_price
                .ok_or_else(|| self.http.invalid_shape(&url, "missing meta.regularMarketPrice"))?,
        })
    }
}

fn zip_candles(timestamps: &[i64], quote: &RawQuote) -> Vec<Candle> {
    let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &time)| {
            Some(Candle {
                time,
                open: at(&quote.open, i)?,
                high: at(&quote.high, i)?,
                low: at(&quote.low, i)?,
                close: at(&quote.close, i)?,
            })
        })
        .collect()
}
