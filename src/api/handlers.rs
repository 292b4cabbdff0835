//! API request handlers.
//!
//! Handlers validate query parameters, call one adapter and are the only
//! layer that picks an HTTP status.

use crate::error::ApiError;
use crate::expiry::{
    ExpiryDate, ExpiryKind, next_monthly_expiry, next_weekly_expiry, nifty_expiry, resolve_expiry,
};
use crate::models::{
    Candle, ChainSource, ChartInterval, ChartRange, ExpiryListQuery, ExpiryListResponse,
    HealthResponse, IntradayQuery, LatestPrice, LatestPriceQuery, LtpCalculatorQuery,
    LtpCalculatorResponse, NiftyExpiryQuery, NiftyExpiryResponse, OptionChainQuery,
    OptionChainResponse, PricingQuery,
};
use crate::pricing::OptionQuote;
use crate::simulation::simulate_chain;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Returns a required, non-blank query parameter.
fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest(format!("{} is required", name)))
}

fn parse_expiry(value: &str) -> Result<ExpiryDate, ApiError> {
    ExpiryDate::parse(value).map_err(|_| {
        ApiError::InvalidRequest(format!(
            "Invalid expiry date: {}. Use DD-MM-YYYY or YYYY-MM-DD",
            value
        ))
    })
}

fn parse_expiry_kind(value: Option<&str>) -> Result<ExpiryKind, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(ExpiryKind::Monthly),
        Some(value) => value.parse().map_err(ApiError::InvalidRequest),
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Option Chain
// ============================================================================

/// Get the put/call option chain of an instrument.
///
/// Serves the live chain. When the live source fails and fallback is
/// enabled, a Black-Scholes chain around a simulated spot is returned with
/// `source = simulated`.
#[utoipa::path(
    get,
    path = "/api/v1/option-chain",
    params(OptionChainQuery),
    responses(
        (status = 200, description = "Option chain", body = OptionChainResponse),
        (status = 400, description = "Missing or invalid parameters", body = crate::error::ErrorResponse),
        (status = 503, description = "Live source failed and fallback is disabled", body = crate::error::ErrorResponse)
    ),
    tag = "Option Chain"
)]
pub async fn get_option_chain(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OptionChainQuery>,
) -> Result<Json<OptionChainResponse>, ApiError> {
    let instrument_key = required(query.instrument_key, "instrument_key")?;
    let expiry = parse_expiry(&required(query.expiry_date, "expiry_date")?)?;

    let err = match state.upstox.fetch_option_chain(&instrument_key, expiry).await {
        Ok(data) => {
            return Ok(Json(OptionChainResponse {
                status: "success".to_string(),
                source: ChainSource::Live,
                data,
            }));
        }
        Err(err) => err,
    };

    let expose = state.config.diagnostics.expose_upstream_details;
    if !state.config.simulation.fallback_enabled {
        error!("Option chain for {} unavailable: {}", instrument_key, err);
        return Err(ApiError::unavailable(&err, Some(&instrument_key), expose));
    }

    warn!(
        "Option chain for {} falling back to simulation: {}",
        instrument_key, err
    );
    let base_price = state.config.simulation.base_price_for(&instrument_key);
    let spot = state.simulator.simulate_spot(&instrument_key, base_price);
    let data = simulate_chain(
        &state.pricer,
        state.layout,
        &instrument_key,
        expiry,
        spot,
        Local::now().date_naive(),
    );

    Ok(Json(OptionChainResponse {
        status: "success".to_string(),
        source: ChainSource::Simulated,
        data,
    }))
}

// ============================================================================
// LTP Calculator
// ============================================================================

/// Get the support/resistance analysis of a symbol.
///
/// Without `expiryDate` the expiry is resolved from the vendor's expiry list
/// (`expiry` selects weekly or monthly), or computed from the calendar when
/// the list is unavailable.
#[utoipa::path(
    get,
    path = "/api/v1/ltp-calculator",
    params(LtpCalculatorQuery),
    responses(
        (status = 200, description = "Support/resistance analysis", body = LtpCalculatorResponse),
        (status = 400, description = "Missing or invalid parameters", body = crate::error::ErrorResponse),
        (status = 429, description = "Calls too close together", body = crate::error::ErrorResponse),
        (status = 502, description = "Vendor failure", body = crate::error::ErrorResponse),
        (status = 500, description = "Internal error", body = crate::error::ErrorResponse)
    ),
    tag = "LTP Calculator"
)]
pub async fn get_ltp_calculator(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LtpCalculatorQuery>,
) -> Result<Json<LtpCalculatorResponse>, ApiError> {
    let symbol = required(query.symbol, "symbol")?;
    let kind = parse_expiry_kind(query.expiry.as_deref())?;

    let lot_size = match query.lot_size.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => state.config.ltp_calculator.default_lot_size,
        Some(value) => value
            .parse::<u32>()
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| {
                ApiError::InvalidRequest(format!(
                    "Invalid lotSize: {}. Use a positive integer",
                    value
                ))
            })?,
    };

    let explicit = query
        .expiry_date
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(parse_expiry)
        .transpose()?;
    let expiry = match explicit {
        Some(expiry) => expiry,
        None => resolve_ltp_expiry(&state, &symbol, kind).await,
    };

    debug!("LTP calculator {} expiry {} lot {}", symbol, expiry, lot_size);
    let expose = state.config.diagnostics.expose_upstream_details;
    let result = state
        .ltp_calculator
        .fetch(&symbol, expiry, lot_size)
        .await
        .map_err(|err| {
            error!("LTP calculator failed for {}: {}", symbol, err);
            ApiError::upstream(&err, Some(&symbol), expose)
        })?;

    Ok(Json(result))
}

async fn resolve_ltp_expiry(state: &AppState, symbol: &str, kind: ExpiryKind) -> ExpiryDate {
    let now = now();
    let computed = || match kind {
        ExpiryKind::Weekly => next_weekly_expiry(now),
        ExpiryKind::Monthly => next_monthly_expiry(now),
    };

    match state.ltp_calculator.list_expiries(symbol).await {
        Ok((expiries, _)) => resolve_expiry(&expiries, kind == ExpiryKind::Weekly, now)
            .and_then(|resolved| ExpiryDate::parse(&resolved).ok())
            .unwrap_or_else(|| {
                warn!("No usable expiry listed for {}, using calendar", symbol);
                computed()
            }),
        Err(err) => {
            warn!("Expiry list for {} unavailable, using calendar: {}", symbol, err);
            computed()
        }
    }
}

// ============================================================================
// Yahoo Finance
// ============================================================================

/// Get intraday candles of a symbol.
#[utoipa::path(
    get,
    path = "/api/v1/yahoo-finance/intraday",
    params(IntradayQuery),
    responses(
        (status = 200, description = "Candles, oldest first", body = Vec<Candle>),
        (status = 400, description = "Missing symbol or invalid interval/range", body = crate::error::ErrorResponse),
        (status = 502, description = "Chart source failure", body = crate::error::ErrorResponse)
    ),
    tag = "Yahoo Finance"
)]
pub async fn get_intraday(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IntradayQuery>,
) -> Result<Json<Vec<Candle>>, ApiError> {
    let symbol = required(query.symbol, "symbol")?;
    let interval: ChartInterval = match query.interval {
        Some(value) => value.parse().map_err(ApiError::InvalidRequest)?,
        None => ChartInterval::default(),
    };
    let range: ChartRange = match query.range {
        Some(value) => value.parse().map_err(ApiError::InvalidRequest)?,
        None => ChartRange::default(),
    };

    let expose = state.config.diagnostics.expose_upstream_details;
    let candles = state
        .yahoo
        .intraday(&symbol, interval, range)
        .await
        .map_err(|err| {
            error!("Intraday chart failed for {}: {}", symbol, err);
            ApiError::upstream(&err, Some(&symbol), expose)
        })?;

    Ok(Json(candles))
}

/// Get the latest price of a symbol.
#[utoipa::path(
    get,
    path = "/api/v1/yahoo-finance/latest-price",
    params(LatestPriceQuery),
    responses(
        (status = 200, description = "Latest price", body = LatestPrice),
        (status = 400, description = "Missing symbol", body = crate::error::ErrorResponse),
        (status = 502, description = "Chart source failure", body = crate::error::ErrorResponse)
    ),
    tag = "Yahoo Finance"
)]
pub async fn get_latest_price(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LatestPriceQuery>,
) -> Result<Json<LatestPrice>, ApiError> {
    let symbol = required(query.symbol, "symbol")?;
    let expose = state.config.diagnostics.expose_upstream_details;

    let latest = state.yahoo.latest_price(&symbol).await.map_err(|err| {
        error!("Latest price failed for {}: {}", symbol, err);
        ApiError::upstream(&err, Some(&symbol), expose)
    })?;

    Ok(Json(latest))
}

// ============================================================================
// Expiries
// ============================================================================

/// List the vendor's expiries for a symbol and the one resolution picks.
#[utoipa::path(
    get,
    path = "/api/v1/expiries",
    params(ExpiryListQuery),
    responses(
        (status = 200, description = "Available expiries", body = ExpiryListResponse),
        (status = 400, description = "Missing symbol or invalid preference", body = crate::error::ErrorResponse),
        (status = 502, description = "Vendor failure", body = crate::error::ErrorResponse)
    ),
    tag = "Expiries"
)]
pub async fn list_expiries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExpiryListQuery>,
) -> Result<Json<ExpiryListResponse>, ApiError> {
    let symbol = required(query.symbol, "symbol")?;
    let preference = parse_expiry_kind(query.expiry.as_deref())?;
    let expose = state.config.diagnostics.expose_upstream_details;

    let (expiries, cached) = state
        .ltp_calculator
        .list_expiries(&symbol)
        .await
        .map_err(|err| ApiError::upstream(&err, Some(&symbol), expose))?;
    let resolved = resolve_expiry(&expiries, preference == ExpiryKind::Weekly, now());

    Ok(Json(ExpiryListResponse {
        symbol,
        expiries,
        resolved,
        preference,
        cached,
    }))
}

/// Get the NIFTY expiry that applies to a date.
#[utoipa::path(
    get,
    path = "/api/v1/expiries/nifty",
    params(NiftyExpiryQuery),
    responses(
        (status = 200, description = "Applicable expiry", body = NiftyExpiryResponse)
    ),
    tag = "Expiries"
)]
pub async fn get_nifty_expiry(Query(query): Query<NiftyExpiryQuery>) -> Json<NiftyExpiryResponse> {
    let today = Local::now().date_naive();
    let requested = query
        .date
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| today.format("%Y-%m-%d").to_string());

    let resolved = nifty_expiry(&requested, today);
    Json(NiftyExpiryResponse {
        requested,
        expiry: resolved.expiry.vendor_format(),
        kind: resolved.kind,
    })
}

// ============================================================================
// Pricing
// ============================================================================

/// Price a call/put pair with Black-Scholes.
#[utoipa::path(
    get,
    path = "/api/v1/pricing/quote",
    params(PricingQuery),
    responses(
        (status = 200, description = "Call and put quote", body = OptionQuote),
        (status = 400, description = "Missing or invalid parameters", body = crate::error::ErrorResponse)
    ),
    tag = "Pricing"
)]
pub async fn get_pricing_quote(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PricingQuery>,
) -> Result<Json<OptionQuote>, ApiError> {
    let number = |value: Option<&str>| {
        value
            .map(str::trim)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };
    let positive = |value: Option<&str>, name: &str| {
        number(value)
            .filter(|v| *v > 0.0)
            .ok_or_else(|| ApiError::InvalidRequest(format!("{} must be a positive number", name)))
    };

    let spot = positive(query.spot.as_deref(), "spot")?;
    let strike = positive(query.strike.as_deref(), "strike")?;
    let days = number(query.days_to_expiry.as_deref())
        .filter(|v| *v >= 0.0)
        .ok_or_else(|| {
            ApiError::InvalidRequest("days_to_expiry must be zero or positive".to_string())
        })?;

    Ok(Json(state.pricer.price(spot, strike, days)))
}
