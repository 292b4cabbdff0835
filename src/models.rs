//! Request and response models for the REST API.

use crate::expiry::ExpiryKind;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

// ============================================================================
// Option Chain
// ============================================================================

/// Where an option chain response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChainSource {
    /// Fetched from the live data provider.
    Live,
    /// Priced locally because the provider was unavailable.
    Simulated,
}

/// Query parameters for the option chain endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OptionChainQuery {
    /// Instrument key of the underlying (e.g. `NSE_INDEX|Nifty 50`).
    pub instrument_key: Option<String>,
    /// Expiry date, `YYYY-MM-DD` or `DD-MM-YYYY`.
    pub expiry_date: Option<String>,
}

/// Market data for one option leg.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct MarketData {
    /// Last traded price.
    #[serde(default)]
    pub ltp: f64,
    /// Traded volume.
    #[serde(default)]
    pub volume: u64,
    /// Open interest.
    #[serde(default)]
    pub oi: f64,
    /// Previous close price.
    #[serde(default)]
    pub close_price: f64,
    /// Best bid price.
    #[serde(default)]
    pub bid_price: f64,
    /// Best bid quantity.
    #[serde(default)]
    pub bid_qty: u64,
    /// Best ask price.
    #[serde(default)]
    pub ask_price: f64,
    /// Best ask quantity.
    #[serde(default)]
    pub ask_qty: u64,
    /// Previous session open interest.
    #[serde(default)]
    pub prev_oi: f64,
}

/// Greeks for one option leg.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct OptionGreeks {
    /// Vega.
    #[serde(default)]
    pub vega: f64,
    /// Theta.
    #[serde(default)]
    pub theta: f64,
    /// Gamma.
    #[serde(default)]
    pub gamma: f64,
    /// Delta.
    #[serde(default)]
    pub delta: f64,
    /// Implied volatility in percent.
    #[serde(default)]
    pub iv: f64,
    /// Probability of profit in percent.
    #[serde(default)]
    pub pop: f64,
}

/// One side (call or put) of a strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OptionLeg {
    /// Provider instrument key of the option contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_key: Option<String>,
    /// Market data.
    pub market_data: MarketData,
    /// Greeks.
    pub option_greeks: OptionGreeks,
}

/// Normalized option chain row for one strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OptionChainData {
    /// Expiry date (`YYYY-MM-DD`).
    pub expiry: String,
    /// Put-call ratio at this strike.
    #[serde(default)]
    pub pcr: Option<f64>,
    /// Strike price.
    pub strike_price: f64,
    /// Underlying instrument key.
    #[serde(default)]
    pub underlying_key: Option<String>,
    /// Underlying spot price.
    pub underlying_spot_price: f64,
    /// Call leg.
    pub call_options: Option<OptionLeg>,
    /// Put leg.
    pub put_options: Option<OptionLeg>,
}

/// Option chain response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OptionChainResponse {
    /// Always `success`.
    pub status: String,
    /// Live or simulated data.
    pub source: ChainSource,
    /// Rows ordered by strike.
    pub data: Vec<OptionChainData>,
}

// ============================================================================
// LTP Calculator
// ============================================================================

/// Query parameters for the LTP calculator endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LtpCalculatorQuery {
    /// Underlying symbol (e.g. `NIFTY`).
    pub symbol: Option<String>,
    /// `weekly` or `monthly` (default).
    pub expiry: Option<String>,
    /// Explicit expiry date; skips resolution.
    pub expiry_date: Option<String>,
    /// Contract lot size.
    pub lot_size: Option<String>,
}

/// Support/resistance analysis from the LTP calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LtpCalculatorResponse {
    /// When the analysis was produced (RFC 3339).
    pub fetch_time: String,
    /// Market direction reading.
    pub direction: String,
    /// Risky resistance level.
    pub risky_resistance: f64,
    /// Risky support level.
    pub risky_support: f64,
    /// Moderate resistance level.
    pub moderate_resistance: f64,
    /// Moderate support level.
    pub moderate_support: f64,
    /// Maximum gain at resistance.
    pub r_max_gain: f64,
    /// Maximum gain at support.
    pub s_max_gain: f64,
    /// Maximum pain at resistance.
    pub r_max_pain: f64,
    /// Maximum pain at support.
    pub s_max_pain: f64,
    /// Scenario label.
    pub scenario: String,
    /// Symbol analysed.
    pub symbol: String,
    /// Expiry queried (`DD-MM-YYYY`).
    pub expiry: String,
}

// ============================================================================
// Yahoo Finance
// ============================================================================

/// Allowed chart intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum ChartInterval {
    /// 1 minute bars.
    #[serde(rename = "1m")]
    OneMinute,
    /// 2 minute bars.
    #[serde(rename = "2m")]
    TwoMinutes,
    /// 5 minute bars (default).
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    /// 15 minute bars.
    #[serde(rename = "15m")]
    FifteenMinutes,
    /// 30 minute bars.
    #[serde(rename = "30m")]
    ThirtyMinutes,
    /// 60 minute bars.
    #[serde(rename = "60m")]
    SixtyMinutes,
    /// 1 hour bars.
    #[serde(rename = "1h")]
    OneHour,
    /// 1 day bars.
    #[serde(rename = "1d")]
    OneDay,
}

impl ChartInterval {
    /// Value sent to the chart API.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::TwoMinutes => "2m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::SixtyMinutes => "60m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
        }
    }
}

impl std::fmt::Display for ChartInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChartInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::OneMinute),
            "2m" => Ok(Self::TwoMinutes),
            "5m" => Ok(Self::FiveMinutes),
            "15m" => Ok(Self::FifteenMinutes),
            "30m" => Ok(Self::ThirtyMinutes),
            "60m" => Ok(Self::SixtyMinutes),
            "1h" => Ok(Self::OneHour),
            "1d" => Ok(Self::OneDay),
            _ => Err(format!(
                "Invalid interval: {}. Use 1m, 2m, 5m, 15m, 30m, 60m, 1h, or 1d",
                s
            )),
        }
    }
}

/// Allowed chart ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum ChartRange {
    /// One day (default).
    #[default]
    #[serde(rename = "1d")]
    OneDay,
    /// Five days.
    #[serde(rename = "5d")]
    FiveDays,
    /// One month.
    #[serde(rename = "1mo")]
    OneMonth,
    /// Three months.
    #[serde(rename = "3mo")]
    ThreeMonths,
    /// Six months.
    #[serde(rename = "6mo")]
    SixMonths,
    /// One year.
    #[serde(rename = "1y")]
    OneYear,
    /// Two years.
    #[serde(rename = "2y")]
    TwoYears,
    /// Five years.
    #[serde(rename = "5y")]
    FiveYears,
    /// Full history.
    #[serde(rename = "max")]
    Max,
}

impl ChartRange {
    /// Value sent to the chart API.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::Max => "max",
        }
    }
}

impl std::fmt::Display for ChartRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChartRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Self::OneDay),
            "5d" => Ok(Self::FiveDays),
            "1mo" => Ok(Self::OneMonth),
            "3mo" => Ok(Self::ThreeMonths),
            "6mo" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "2y" => Ok(Self::TwoYears),
            "5y" => Ok(Self::FiveYears),
            "max" => Ok(Self::Max),
            _ => Err(format!(
                "Invalid range: {}. Use 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, or max",
                s
            )),
        }
    }
}

/// Query parameters for the intraday endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IntradayQuery {
    /// Ticker symbol (e.g. `^NSEI`).
    pub symbol: Option<String>,
    /// Bar interval (default 5m).
    pub interval: Option<String>,
    /// History range (default 1d).
    pub range: Option<String>,
}

/// Query parameters for the latest price endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LatestPriceQuery {
    /// Ticker symbol.
    pub symbol: Option<String>,
}

/// A single OHLC candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Candle {
    /// Bar start, seconds since epoch.
    pub time: i64,
    /// Opening price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
}

/// Latest traded price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LatestPrice {
    /// Quote time, seconds since epoch.
    pub time: i64,
    /// Price.
    pub price: f64,
}

// ============================================================================
// Expiries
// ============================================================================

/// Query parameters for the expiry list endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpiryListQuery {
    /// Underlying symbol.
    pub symbol: Option<String>,
    /// `weekly` or `monthly` (default).
    pub expiry: Option<String>,
}

/// Available expiries and the one resolution would pick.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpiryListResponse {
    /// Underlying symbol.
    pub symbol: String,
    /// Expiries as reported by the vendor.
    pub expiries: Vec<String>,
    /// Resolved expiry (`DD-MM-YYYY`).
    pub resolved: Option<String>,
    /// Preference used for resolution.
    pub preference: ExpiryKind,
    /// Whether the list came from the cache.
    pub cached: bool,
}

/// Query parameters for the NIFTY expiry endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NiftyExpiryQuery {
    /// Requested date, `YYYY-MM-DD`. Defaults to today.
    pub date: Option<String>,
}

/// Expiry applicable to a requested date.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NiftyExpiryResponse {
    /// Date as requested.
    pub requested: String,
    /// Applicable expiry (`DD-MM-YYYY`).
    pub expiry: String,
    /// Weekly or monthly contract.
    pub kind: ExpiryKind,
}

// ============================================================================
// Pricing
// ============================================================================

/// Query parameters for the pricing endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PricingQuery {
    /// Underlying price.
    #[param(value_type = Option<f64>)]
    pub spot: Option<String>,
    /// Strike price.
    #[param(value_type = Option<f64>)]
    pub strike: Option<String>,
    /// Calendar days to expiry.
    #[param(value_type = Option<f64>)]
    pub days_to_expiry: Option<String>,
}
