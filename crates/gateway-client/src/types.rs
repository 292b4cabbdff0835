//! Request and response types for the gateway API.

use serde::{Deserialize, Serialize};


/// Where an option chain response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainSource {
    /// Live data provider.
    Live,
    /// Locally priced fallback.
    Simulated,
}

/// Weekly or monthly contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryKind {
    /// Weekly contract.
    Weekly,
    /// Monthly contract.
    Monthly,
}

impl std::fmt::Display for ExpiryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Error body returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
    /// Always `error`.
    pub status: String,
    /// Upstream details, when exposed.
    #[serde(default)]
    pub details: Option<String>,
    /// Upstream URL, when exposed.
    #[serde(default)]
    pub url: Option<String>,
    /// Symbol, when exposed.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Upstream HTTP status, when exposed.
    #[serde(default)]
    pub upstream_status: Option<u16>,
}

// ============================================================================
// Option Chain
// ============================================================================

/// Market data for one option leg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    /// Last traded price.
    pub ltp: f64,
    /// Traded volume.
    pub volume: u64,
    /// Open interest.
    pub oi: f64,
    /// Previous close.
    pub close_price: f64,
    /// Best bid.
    pub bid_price: f64,
    /// Bid quantity.
    pub bid_qty: u64,
    /// Best ask.
    pub ask_price: f64,
    /// Ask quantity.
    pub ask_qty: u64,
    /// Previous open interest.
    pub prev_oi: f64,
}

/// Greeks for one option leg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionGreeks {
    /// Vega.
    pub vega: f64,
    /// Theta.
    pub theta: f64,
    /// Gamma.
    pub gamma: f64,
    /// Delta.
    pub delta: f64,
    /// Implied volatility in percent.
    pub iv: f64,
    /// Probability of profit in percent.
    pub pop: f64,
}

/// One side of a strike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    /// Contract instrument key.
    #[serde(default)]
    pub instrument_key: Option<String>,
    /// Market data.
    pub market_data: MarketData,
    /// Greeks.
    pub option_greeks: OptionGreeks,
}

/// One strike of an option chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChainData {
    /// Expiry (`YYYY-MM-DD`).
    pub expiry: String,
    /// Put-call ratio.
    #[serde(default)]
    pub pcr: Option<f64>,
    /// Strike price.
    pub strike_price: f64,
    /// Underlying instrument key.
    #[serde(default)]
    pub underlying_key: Option<String>,
    /// Underlying spot.
    pub underlying_spot_price: f64,
    /// Call leg.
    pub call_options: Option<OptionLeg>,
    /// Put leg.
    pub put_options: Option<OptionLeg>,
}

/// Option chain response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChainResponse {
    /// Always `success`.
    pub status: String,
    /// Live or simulated.
    pub source: ChainSource,
    /// Rows ordered by strike.
    pub data: Vec<OptionChainData>,
}

// ============================================================================
// LTP Calculator
// ============================================================================

/// Query for the LTP calculator endpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LtpCalculatorQuery {
    /// Underlying symbol.
    pub symbol: String,
    /// Weekly or monthly resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<ExpiryKind>,
    /// Explicit expiry date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    /// Lot size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<u32>,
}

/// Support/resistance analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LtpCalculatorResponse {
    /// Analysis time.
    pub fetch_time: String,
    /// Direction reading.
    pub direction: String,
    /// Risky resistance.
    pub risky_resistance: f64,
    /// Risky support.
    pub risky_support: f64,
    /// Moderate resistance.
    pub moderate_resistance: f64,
    /// Moderate support.
    pub moderate_support: f64,
    /// Max gain at resistance.
    pub r_max_gain: f64,
    /// Max gain at support.
    pub s_max_gain: f64,
    /// Max pain at resistance.
    pub r_max_pain: f64,
    /// Max pain at support.
    pub s_max_pain: f64,
    /// Scenario label.
    pub scenario: String,
    /// Symbol.
    pub symbol: String,
    /// Expiry queried (`DD-MM-YYYY`).
    pub expiry: String,
}

// ============================================================================
// Yahoo Finance
// ============================================================================

/// Query for the intraday endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntradayQuery {
    /// Ticker symbol.
    pub symbol: String,
    /// Bar interval, e.g. `5m`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// History range, e.g. `1d`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

/// OHLC candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Seconds since epoch.
    pub time: i64,
    /// Open.
    pub open: f64,
    /// High.
    pub high: f64,
    /// Low.
    pub low: f64,
    /// Close.
    pub close: f64,
}

/// Latest price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatestPrice {
    /// Seconds since epoch.
    pub time: i64,
    /// Price.
    pub price: f64,
}

// ============================================================================
// Expiries
// ============================================================================

/// Vendor expiry list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryListResponse {
    /// Symbol.
    pub symbol: String,
    /// Listed expiries.
    pub expiries: Vec<String>,
    /// Resolved expiry.
    pub resolved: Option<String>,
    /// Preference used.
    pub preference: ExpiryKind,
    /// Served from cache.
    pub cached: bool,
}

/// Expiry applicable to a date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NiftyExpiryResponse {
    /// Date as requested.
    pub requested: String,
    /// Expiry (`DD-MM-YYYY`).
    pub expiry: String,
    /// Weekly or monthly.
    pub kind: ExpiryKind,
}

// ============================================================================
// Pricing
// ============================================================================

/// Query for the pricing endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PricingQuery {
    /// Underlying price.
    pub spot: f64,
    /// Strike.
    pub strike: f64,
    /// Calendar days to expiry.
    pub days_to_expiry: f64,
}

/// Pricing of one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegQuote {
    /// Price.
    pub price: f64,
    /// Delta.
    pub delta: f64,
    /// Gamma.
    pub gamma: f64,
    /// Theta per day.
    pub theta: f64,
    /// Vega per vol point.
    pub vega: f64,
    /// Volatility in percent.
    pub implied_volatility: f64,
    /// Probability of expiring in the money.
    pub probability_itm: f64,
}

/// Call and put pricing for one strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Strike.
    pub strike: f64,
    /// Spot.
    pub spot: f64,
    /// Days to expiry.
    pub days_to_expiry: f64,
    /// Call side.
    pub call: LegQuote,
    /// Put side.
    pub put: LegQuote,
}
