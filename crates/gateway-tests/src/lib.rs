//! Integration tests for the Option Chain Gateway API.
//!
//! Each test starts the real router in-process on an ephemeral port, backed
//! by a fake vendor that plays Upstox, the LTP calculator and Yahoo Finance,
//! and drives it through [`gateway_client::GatewayClient`].

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use gateway_client::{ClientConfig, GatewayClient};
use option_chain_gateway::api::create_router;
use option_chain_gateway::config::Config;
use option_chain_gateway::state::AppState;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

/// Result type for test helpers.
pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Instrument key served by the fake option chain.
pub const NIFTY_KEY: &str = "NSE_INDEX|Nifty 50";

/// Serves `router` on an ephemeral local port and returns its base URL.
///
/// # Errors
/// Returns error if no local port can be bound.
pub async fn serve(router: Router) -> TestResult<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{}", addr))
}

/// Starts the gateway with `config` and returns a client for it.
///
/// # Errors
/// Returns error if the state, the listener or the client cannot be built.
pub async fn spawn_gateway(config: Config) -> TestResult<GatewayClient> {
    let state = Arc::new(AppState::from_config(config)?);
    let base_url = serve(create_router(state)).await?;
    Ok(GatewayClient::new(ClientConfig {
        base_url,
        timeout: Duration::from_secs(10),
    })?)
}

/// Configuration pointing every source at `vendor_url`.
///
/// The 429 retry delay and the vendor call gap are shortened so tests stay
/// fast, and upstream diagnostics are exposed.
#[must_use]
pub fn test_config(vendor_url: &str) -> Config {
    let mut config = Config::default();
    config.upstream.retry_delay_ms = 10;
    config.upstream.timeout_secs = 5;
    config.upstox.base_url = vendor_url.to_string();
    config.upstox.access_token = Some("test-token".to_string());
    config.ltp_calculator.base_url = vendor_url.to_string();
    config.ltp_calculator.min_request_gap_ms = 0;
    config.yahoo.base_url = vendor_url.to_string();
    config.simulation.strikes_each_side = 2;
    config.diagnostics.expose_upstream_details = true;
    config
}

/// A running fake vendor.
#[derive(Debug, Clone)]
pub struct FakeVendor {
    /// Base URL of every fake source.
    pub base_url: String,
    ltp_hits: Arc<AtomicUsize>,
    expiry_hits: Arc<AtomicUsize>,
}

impl FakeVendor {
    /// Requests received by the LTP calculator endpoint.
    #[must_use]
    pub fn ltp_hits(&self) -> usize {
        self.ltp_hits.load(Ordering::SeqCst)
    }

    /// Requests received by the expiry list endpoint.
    #[must_use]
    pub fn expiry_hits(&self) -> usize {
        self.expiry_hits.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct VendorState {
    ltp_status: StatusCode,
    expiries: Arc<Vec<String>>,
    ltp_hits: Arc<AtomicUsize>,
    expiry_hits: Arc<AtomicUsize>,
}

/// Starts a fake vendor.
///
/// The LTP calculator answers with `ltp_status` (an analysis body on 200,
/// plain text otherwise) and the expiry list returns `expiries`.
///
/// # Errors
/// Returns error if no local port can be bound.
pub async fn spawn_fake_vendor(ltp_status: u16, expiries: &[&str]) -> TestResult<FakeVendor> {
    let state = VendorState {
        ltp_status: StatusCode::from_u16(ltp_status)?,
        expiries: Arc::new(expiries.iter().map(|e| e.to_string()).collect()),
        ltp_hits: Arc::new(AtomicUsize::new(0)),
        expiry_hits: Arc::new(AtomicUsize::new(0)),
    };

    let router = Router::new()
        .route("/option/chain", get(option_chain))
        .route("/expiries", get(expiry_list))
        .route("/ltp-calculator", get(ltp_calculator))
        .route("/v8/finance/chart/{symbol}", get(chart))
        .with_state(state.clone());

    Ok(FakeVendor {
        base_url: serve(router).await?,
        ltp_hits: state.ltp_hits,
        expiry_hits: state.expiry_hits,
    })
}

fn leg(ltp: f64, delta: f64) -> Value {
    json!({
        "instrument_key": "NSE_FO|TEST",
        "market_data": {"ltp": ltp, "volume": 1200, "oi": 5000.0, "close_price": ltp,
                        "bid_price": ltp - 0.5, "bid_qty": 75, "ask_price": ltp + 0.5,
                        "ask_qty": 150, "prev_oi": 4800.0},
        "option_greeks": {"vega": 10.0, "theta": -8.0, "gamma": 0.0005,
                          "delta": delta, "iv": 13.5, "pop": 45.0}
    })
}

async fn option_chain() -> Json<Value> {
    Json(json!({
        "status": "success",
        "data": [
            {"expiry": "2024-06-13", "pcr": 0.8, "strike_price": 22100.0,
             "underlying_key": NIFTY_KEY, "underlying_spot_price": 22040.0,
             "call_options": leg(45.0, 0.35), "put_options": leg(105.0, -0.65)},
            {"expiry": "2024-06-13", "pcr": 1.1, "strike_price": 22000.0,
             "underlying_key": NIFTY_KEY, "underlying_spot_price": 22040.0,
             "call_options": leg(95.0, 0.58), "put_options": leg(55.0, -0.42)}
        ]
    }))
}

async fn expiry_list(State(state): State<VendorState>) -> Json<Value> {
    state.expiry_hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({"data": state.expiries.as_slice()}))
}

async fn ltp_calculator(State(state): State<VendorState>) -> Response {
    state.ltp_hits.fetch_add(1, Ordering::SeqCst);
    if state.ltp_status != StatusCode::OK {
        return (state.ltp_status, "vendor busy").into_response();
    }
    Json(json!({
        "data": {
            "fetchTime": "2024-06-10T10:15:00+05:30",
            "direction": "Bearish",
            "scenario": "Resistance holding",
            "resistance": {"risky": 22300.0, "moderate": 22200.0, "maxGain": 1.1, "maxPain": 0.4},
            "support": {"risky": 21800.0, "moderate": 21900.0, "maxGain": 0.9, "maxPain": 0.6}
        }
    }))
    .into_response()
}

async fn chart(Path(symbol): Path<String>) -> Response {
    if symbol != "^NSEI" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"chart": {"result": null,
                        "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}})),
        )
            .into_response();
    }
    Json(json!({
        "chart": {
            "result": [{
                "meta": {"regularMarketPrice": 22040.5, "regularMarketTime": 1718012400},
                "timestamp": [1718000100, 1718000400, 1718000700],
                "indicators": {"quote": [{
                    "open": [22000.0, 22010.0, null],
                    "high": [22015.0, 22030.0, 22045.0],
                    "low": [21995.0, 22005.0, 22020.0],
                    "close": [22010.0, 22025.0, 22040.5]
                }]}
            }],
            "error": null
        }
    }))
    .into_response()
}
