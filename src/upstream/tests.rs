use super::*;
use crate::config::{LtpCalculatorConfig, UpstoxConfig, YahooConfig};
use crate::expiry::ExpiryDate;
use crate::models::{ChartInterval, ChartRange};
use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
use axum::routing::get;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn test_client(source_name: &'static str) -> UpstreamClient {
    UpstreamClient::new(Client::new(), source_name, Duration::from_millis(10))
}

/// Fake source answering `/data` with `responses[hit]`, repeating the last one.
async fn scripted(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/data",
        get(move || {
            let counter = counter.clone();
            let responses = responses.clone();
            async move {
                let hit = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[hit.min(responses.len() - 1)];
                (AxumStatus::from_u16(status).unwrap(), body)
            }
        }),
    );
    (spawn(router).await, hits)
}

// ============================================================================
// UpstreamClient
// ============================================================================

#[tokio::test]
async fn test_429_twice_hits_upstream_exactly_twice() {
    let (base, hits) = scripted(vec![(429, "slow down")]).await;
    let url = endpoint(&base, "data", &[]).unwrap();

    let result = test_client("fake")
        .get_json::<Value>(&url, HeaderMap::new())
        .await;

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    match result {
        Err(UpstreamError::Status { status, body, .. }) => {
            assert_eq!(status, 429);
            assert_eq!(body, "slow down");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_429_then_success_is_retried() {
    let (base, hits) = scripted(vec![(429, ""), (200, r#"{"ok":true}"#)]).await;
    let url = endpoint(&base, "data", &[]).unwrap();

    let value: Value = test_client("fake")
        .get_json(&url, HeaderMap::new())
        .await
        .unwrap();

    assert_eq!(value["ok"], true);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_429_retry_waits_for_retry_delay() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let recorded = hits.clone();
    let router = Router::new().route(
        "/data",
        get(move || {
            let recorded = recorded.clone();
            async move {
                let mut hits = recorded.lock();
                hits.push(Instant::now());
                if hits.len() == 1 {
                    (AxumStatus::TOO_MANY_REQUESTS, "")
                } else {
                    (AxumStatus::OK, r#"{"ok":true}"#)
                }
            }
        }),
    );
    let url = endpoint(&spawn(router).await, "data", &[]).unwrap();
    let delay = Duration::from_millis(200);

    let value: Value = UpstreamClient::new(Client::new(), "fake", delay)
        .get_json(&url, HeaderMap::new())
        .await
        .unwrap();

    assert_eq!(value["ok"], true);
    let hits = hits.lock();
    assert_eq!(hits.len(), 2);
    assert!(hits[1].duration_since(hits[0]) >= delay);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let (base, hits) = scripted(vec![(500, "boom")]).await;
    let url = endpoint(&base, "data", &[]).unwrap();

    let err = test_client("fake")
        .get_json::<Value>(&url, HeaderMap::new())
        .await
        .unwrap_err();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(err.upstream_status(), Some(500));
    assert_eq!(err.details(), Some("boom"));
    assert!(err.url().unwrap().ends_with("/data"));
}

#[tokio::test]
async fn test_invalid_json_is_invalid_shape() {
    let (base, _) = scripted(vec![(200, "<html>not json</html>")]).await;
    let url = endpoint(&base, "data", &[]).unwrap();

    let err = test_client("fake")
        .get_json::<Value>(&url, HeaderMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::InvalidShape { source_name: "fake", .. }));
}

#[tokio::test]
async fn test_unreachable_source_is_transport_error() {
    let url = endpoint("http://127.0.0.1:9", "data", &[]).unwrap();

    let err = test_client("fake")
        .get_json::<Value>(&url, HeaderMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::Transport { .. }));
    assert_eq!(err.upstream_status(), None);
}

#[test]
fn test_endpoint_encodes_params() {
    let url = endpoint(
        "https://api.example.com/v2/",
        "/option/chain",
        &[("instrument_key", "NSE_INDEX|Nifty 50"), ("expiry_date", "2024-06-13")],
    )
    .unwrap();

    assert_eq!(url.path(), "/v2/option/chain");
    assert_eq!(
        url.query(),
        Some("instrument_key=NSE_INDEX%7CNifty+50&expiry_date=2024-06-13")
    );
}

#[test]
fn test_endpoint_rejects_invalid_base() {
    let err = endpoint("not a url", "data", &[]).unwrap_err();
    assert!(matches!(err, UpstreamError::Client(_)));
}

#[test]
fn test_truncate_long_body() {
    let body = "x".repeat(MAX_BODY_CHARS + 10);
    assert_eq!(truncate(&body).len(), MAX_BODY_CHARS);
    assert_eq!(truncate("short"), "short");
}

// ============================================================================
// Throttle and cache
// ============================================================================

#[test]
fn test_throttle_enforces_min_gap() {
    let throttle = RequestThrottle::new("fake", Duration::from_secs(2));
    let start = Instant::now();

    assert!(throttle.acquire_at(start).is_ok());
    match throttle.acquire_at(start + Duration::from_millis(500)) {
        Err(UpstreamError::RateLimited { retry_after_ms, .. }) => assert_eq!(retry_after_ms, 1500),
        other => panic!("expected rate limit, got {:?}", other),
    }
    assert!(throttle.acquire_at(start + Duration::from_secs(2)).is_ok());
}

#[test]
fn test_rejected_call_does_not_reset_gap() {
    let throttle = RequestThrottle::new("fake", Duration::from_secs(2));
    let start = Instant::now();

    throttle.acquire_at(start).unwrap();
    assert!(throttle.acquire_at(start + Duration::from_secs(1)).is_err());
    assert!(throttle.acquire_at(start + Duration::from_millis(2100)).is_ok());
}

#[test]
fn test_zero_gap_admits_everything() {
    let throttle = RequestThrottle::new("fake", Duration::ZERO);
    let now = Instant::now();
    assert!(throttle.acquire_at(now).is_ok());
    assert!(throttle.acquire_at(now).is_ok());
}

#[test]
fn test_expiry_cache_ttl() {
    let cache = ExpiryCache::new(Duration::from_secs(60));
    let start = Instant::now();
    cache.insert_at("NIFTY", vec!["13-06-2024".to_string()], start);

    assert_eq!(
        cache.get_at("NIFTY", start + Duration::from_secs(59)),
        Some(vec!["13-06-2024".to_string()])
    );
    assert_eq!(cache.get_at("NIFTY", start + Duration::from_secs(60)), None);
    assert_eq!(cache.get_at("BANKNIFTY", start), None);
}

// ============================================================================
// Upstox
// ============================================================================

fn upstox_config(base_url: &str, token: Option<&str>) -> UpstoxConfig {
    UpstoxConfig {
        base_url: base_url.to_string(),
        access_token: token.map(str::to_string),
    }
}

async fn fake_upstox(body: Value) -> String {
    let router = Router::new().route(
        "/option/chain",
        get(move |headers: AxumHeaders| {
            let body = body.clone();
            async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Bearer secret");
                if authorized {
                    (AxumStatus::OK, Json(body))
                } else {
                    (AxumStatus::UNAUTHORIZED, Json(json!({"status": "error"})))
                }
            }
        }),
    );
    spawn(router).await
}

fn chain_leg(ltp: f64) -> Value {
    json!({
        "instrument_key": "NSE_FO|1",
        "market_data": {"ltp": ltp, "volume": 10, "oi": 5.0, "close_price": ltp,
                        "bid_price": ltp - 1.0, "bid_qty": 50, "ask_price": ltp + 1.0,
                        "ask_qty": 75, "prev_oi": 4.0},
        "option_greeks": {"vega": 1.0, "theta": -2.0, "gamma": 0.001,
                          "delta": 0.5, "iv": 14.0, "pop": 48.0}
    })
}

#[tokio::test]
async fn test_upstox_requires_token() {
    let adapter = UpstoxAdapter::new(
        test_client(upstox::SOURCE_NAME),
        &upstox_config("http://127.0.0.1:9", None),
    );
    let expiry = ExpiryDate::from_ymd(2024, 6, 13).unwrap();

    let err = adapter
        .fetch_option_chain("NSE_INDEX|Nifty 50", expiry)
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::NotConfigured("upstox")));
}

#[tokio::test]
async fn test_upstox_normalizes_and_sorts_chain() {
    let base = fake_upstox(json!({
        "status": "success",
        "data": [
            {"expiry": "2024-06-13", "pcr": 1.2, "strike_price": 22100.0,
             "underlying_key": "NSE_INDEX|Nifty 50", "underlying_spot_price": 22010.0,
             "call_options": chain_leg(40.0), "put_options": chain_leg(120.0)},
            {"strike_price": 22000.0, "underlying_spot_price": 22010.0,
             "call_options": chain_leg(90.0)}
        ]
    }))
    .await;
    let adapter = UpstoxAdapter::new(
        test_client(upstox::SOURCE_NAME),
        &upstox_config(&base, Some("secret")),
    );
    let expiry = ExpiryDate::from_ymd(2024, 6, 13).unwrap();

    let chain = adapter
        .fetch_option_chain("NSE_INDEX|Nifty 50", expiry)
        .await
        .unwrap();

    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].strike_price, 22000.0);
    assert_eq!(chain[0].expiry, "2024-06-13");
    assert!(chain[0].put_options.is_none());
    assert_eq!(chain[1].pcr, Some(1.2));
    let put = chain[1].put_options.as_ref().unwrap();
    assert_eq!(put.market_data.ltp, 120.0);
    assert_eq!(put.market_data.ask_qty, 75);
}

#[tokio::test]
async fn test_upstox_rejects_error_status() {
    let base = fake_upstox(json!({"status": "error", "errors": []})).await;
    let adapter = UpstoxAdapter::new(
        test_client(upstox::SOURCE_NAME),
        &upstox_config(&base, Some("secret")),
    );
    let expiry = ExpiryDate::from_ymd(2024, 6, 13).unwrap();

    let err = adapter.fetch_option_chain("X", expiry).await.unwrap_err();
    assert!(matches!(err, UpstreamError::InvalidShape { .. }));
}

#[tokio::test]
async fn test_upstox_rejects_leg_without_greeks() {
    let base = fake_upstox(json!({
        "status": "success",
        "data": [{"strike_price": 22000.0, "underlying_spot_price": 22010.0,
                  "call_options": {"market_data": {"ltp": 1.0}}}]
    }))
    .await;
    let adapter = UpstoxAdapter::new(
        test_client(upstox::SOURCE_NAME),
        &upstox_config(&base, Some("secret")),
    );
    let expiry = ExpiryDate::from_ymd(2024, 6, 13).unwrap();

    let err = adapter.fetch_option_chain("X", expiry).await.unwrap_err();
    match err {
        UpstreamError::InvalidShape { details, .. } => assert!(details.contains("option_greeks")),
        other => panic!("expected invalid shape, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upstox_wrong_token_is_status_error() {
    let base = fake_upstox(json!({"status": "success", "data": []})).await;
    let adapter = UpstoxAdapter::new(
        test_client(upstox::SOURCE_NAME),
        &upstox_config(&base, Some("expired")),
    );
    let expiry = ExpiryDate::from_ymd(2024, 6, 13).unwrap();

    let err = adapter.fetch_option_chain("X", expiry).await.unwrap_err();
    assert_eq!(err.upstream_status(), Some(401));
}

// ============================================================================
// LTP calculator
// ============================================================================

fn ltp_config(base_url: &str, gap_ms: u64) -> LtpCalculatorConfig {
    LtpCalculatorConfig {
        base_url: base_url.to_string(),
        api_key: Some("key-123".to_string()),
        min_request_gap_ms: gap_ms,
        ..LtpCalculatorConfig::default()
    }
}

async fn fake_ltp(analysis: Value) -> (String, Arc<AtomicUsize>) {
    let expiry_hits = Arc::new(AtomicUsize::new(0));
    let counter = expiry_hits.clone();
    let router = Router::new()
        .route(
            "/expiries",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"data": ["13-06-2024", "27-06-2024"]}))
                }
            }),
        )
        .route(
            "/ltp-calculator",
            get(move |headers: AxumHeaders| {
                let analysis = analysis.clone();
                async move {
                    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("key-123") {
                        return (AxumStatus::FORBIDDEN, Json(json!({})));
                    }
                    (AxumStatus::OK, Json(analysis))
                }
            }),
        );
    (spawn(router).await, expiry_hits)
}

fn analysis() -> Value {
    json!({
        "data": {
            "fetchTime": "2024-06-10T10:15:00+05:30",
            "direction": "Bullish",
            "scenario": "Support holding",
            "resistance": {"risky": 22500.0, "moderate": 22400.0, "maxGain": 1.5, "maxPain": 0.5},
            "support": {"risky": 21900.0, "moderate": 22000.0, "maxGain": 2.5, "maxPain": 0.7}
        }
    })
}

#[tokio::test]
async fn test_ltp_expiries_are_cached() {
    let (base, hits) = fake_ltp(analysis()).await;
    let adapter = LtpCalculatorAdapter::new(
        test_client(ltp_calculator::SOURCE_NAME),
        &ltp_config(&base, 0),
    );

    let (first, cached) = adapter.list_expiries("NIFTY").await.unwrap();
    assert!(!cached);
    assert_eq!(first, vec!["13-06-2024", "27-06-2024"]);

    let (second, cached) = adapter.list_expiries("NIFTY").await.unwrap();
    assert!(cached);
    assert_eq!(second, first);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ltp_fetch_maps_levels() {
    let (base, _) = fake_ltp(analysis()).await;
    let adapter = LtpCalculatorAdapter::new(
        test_client(ltp_calculator::SOURCE_NAME),
        &ltp_config(&base, 0),
    );
    let expiry = ExpiryDate::from_ymd(2024, 6, 13).unwrap();

    let result = adapter.fetch("NIFTY", expiry, 75).await.unwrap();

    assert_eq!(result.fetch_time, "2024-06-10T10:15:00+05:30");
    assert_eq!(result.direction, "Bullish");
    assert_eq!(result.risky_resistance, 22500.0);
    assert_eq!(result.moderate_support, 22000.0);
    assert_eq!(result.r_max_gain, 1.5);
    assert_eq!(result.s_max_pain, 0.7);
    assert_eq!(result.symbol, "NIFTY");
    assert_eq!(result.expiry, "13-06-2024");
}

#[tokio::test]
async fn test_ltp_fetch_missing_support_is_invalid_shape() {
    let mut body = analysis();
    body["data"]["support"] = Value::Null;
    let (base, _) = fake_ltp(body).await;
    let adapter = LtpCalculatorAdapter::new(
        test_client(ltp_calculator::SOURCE_NAME),
        &ltp_config(&base, 0),
    );
    let expiry = ExpiryDate::from_ymd(2024, 6, 13).unwrap();

    let err = adapter.fetch("NIFTY", expiry, 75).await.unwrap_err();
    match err {
        UpstreamError::InvalidShape { details, .. } => assert_eq!(details, "missing data.support"),
        other => panic!("expected invalid shape, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ltp_fetch_defaults_fetch_time() {
    let mut body = analysis();
    body["data"]
        .as_object_mut()
        .unwrap()
        .remove("fetchTime");
    let (base, _) = fake_ltp(body).await;
    let adapter = LtpCalculatorAdapter::new(
        test_client(ltp_calculator::SOURCE_NAME),
        &ltp_config(&base, 0),
    );
    let expiry = ExpiryDate::from_ymd(2024, 6, 13).unwrap();

    let result = adapter.fetch("NIFTY", expiry, 75).await.unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(&result.fetch_time).is_ok());
}

#[tokio::test]
async fn test_ltp_fetch_is_throttled() {
    let (base, _) = fake_ltp(analysis()).await;
    let adapter = LtpCalculatorAdapter::new(
        test_client(ltp_calculator::SOURCE_NAME),
        &ltp_config(&base, 60_000),
    );
    let expiry = ExpiryDate::from_ymd(2024, 6, 13).unwrap();

    assert!(adapter.fetch("NIFTY", expiry, 75).await.is_ok());
    let err = adapter.fetch("NIFTY", expiry, 75).await.unwrap_err();
    assert!(matches!(err, UpstreamError::RateLimited { source_name: "ltp-calculator", .. }));
}

#[tokio::test]
async fn test_ltp_fetch_without_api_key_is_rejected_upstream() {
    let (base, _) = fake_ltp(analysis()).await;
    let config = LtpCalculatorConfig {
        api_key: None,
        ..ltp_config(&base, 0)
    };
    let adapter = LtpCalculatorAdapter::new(test_client(ltp_calculator::SOURCE_NAME), &config);
    let expiry = ExpiryDate::from_ymd(2024, 6, 13).unwrap();

    let err = adapter.fetch("NIFTY", expiry, 75).await.unwrap_err();
    assert_eq!(err.upstream_status(), Some(403));
}

// ============================================================================
// Yahoo Finance
// ============================================================================

async fn fake_yahoo(body: Value) -> String {
    let router = Router::new().route(
        "/v8/finance/chart/{symbol}",
        get(move |Path(symbol): Path<String>| {
            let body = body.clone();
            async move {
                if symbol == "^NSEI" {
                    (AxumStatus::OK, Json(body))
                } else {
                    (
                        AxumStatus::NOT_FOUND,
                        Json(json!({"chart": {"result": null,
                                   "error": {"code": "Not Found", "description": "No data found"}}})),
                    )
                }
            }
        }),
    );
    spawn(router).await
}

fn chart() -> Value {
    json!({
        "chart": {
            "result": [{
                "meta": {"regularMarketPrice": 22010.5, "regularMarketTime": 1718012100},
                "timestamp": [1718001000, 1718001300, 1718001600],
                "indicators": {"quote": [{
                    "open": [22000.0, null, 22010.0],
                    "high": [22020.0, 22025.0, 22030.0],
                    "low": [21990.0, 21995.0, 22000.0],
                    "close": [22015.0, 22012.0, 22010.5]
                }]}
            }],
            "error": null
        }
    })
}

fn yahoo_adapter(base: &str) -> YahooAdapter {
    YahooAdapter::new(
        test_client(yahoo::SOURCE_NAME),
        &YahooConfig {
            base_url: base.to_string(),
        },
    )
}

#[tokio::test]
async fn test_yahoo_intraday_skips_null_bars() {
    let base = fake_yahoo(chart()).await;

    let candles = yahoo_adapter(&base)
        .intraday("^NSEI", ChartInterval::FiveMinutes, ChartRange::OneDay)
        .await
        .unwrap();

    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].time, 1718001000);
    assert_eq!(candles[0].open, 22000.0);
    assert_eq!(candles[1].time, 1718001600);
    assert_eq!(candles[1].close, 22010.5);
}

#[tokio::test]
async fn test_yahoo_latest_price() {
    let base = fake_yahoo(chart()).await;

    let latest = yahoo_adapter(&base).latest_price("^NSEI").await.unwrap();

    assert_eq!(latest.time, 1718012100);
    assert_eq!(latest.price, 22010.5);
}

#[tokio::test]
async fn test_yahoo_chart_error_is_invalid_shape() {
    let base = fake_yahoo(json!({
        "chart": {"result": null, "error": {"code": "Bad Request", "description": "Invalid input"}}
    }))
    .await;

    let err = yahoo_adapter(&base)
        .intraday("^NSEI", ChartInterval::OneMinute, ChartRange::OneDay)
        .await
        .unwrap_err();

    match err {
        UpstreamError::InvalidShape { details, .. } => assert!(details.contains("Invalid input")),
        other => panic!("expected invalid shape, got {:?}", other),
    }
}

#[tokio::test]
async fn test_yahoo_unknown_symbol_is_status_error() {
    let base = fake_yahoo(chart()).await;

    let err = yahoo_adapter(&base).latest_price("NOPE").await.unwrap_err();
    assert_eq!(err.upstream_status(), Some(404));
}

#[tokio::test]
async fn test_yahoo_empty_series() {
    let base = fake_yahoo(json!({
        "chart": {"result": [{"meta": {}, "timestamp": []}], "error": null}
    }))
    .await;

    let candles = yahoo_adapter(&base)
        .intraday("^NSEI", ChartInterval::OneDay, ChartRange::FiveDays)
        .await
        .unwrap();
    assert!(candles.is_empty());
}
