//! Yahoo Finance endpoint tests.

use gateway_client::{Error, IntradayQuery};
use gateway_tests::{spawn_fake_vendor, spawn_gateway, test_config};

fn intraday(symbol: &str, interval: Option<&str>) -> IntradayQuery {
    IntradayQuery {
        symbol: symbol.to_string(),
        interval: interval.map(str::to_string),
        range: Some("1d".to_string()),
    }
}

#[tokio::test]
async fn test_intraday_skips_incomplete_bars() {
    let vendor = spawn_fake_vendor(200, &[]).await.expect("fake vendor");
    let client = spawn_gateway(test_config(&vendor.base_url))
        .await
        .expect("gateway");

    let candles = client
        .get_intraday(&intraday("^NSEI", Some("5m")))
        .await
        .expect("candles");

    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].time, 1_718_000_100);
    assert_eq!(candles[1].close, 22_025.0);
}

#[tokio::test]
async fn test_latest_price() {
    let vendor = spawn_fake_vendor(200, &[]).await.expect("fake vendor");
    let client = spawn_gateway(test_config(&vendor.base_url))
        .await
        .expect("gateway");

    let latest = client.get_latest_price("^NSEI").await.expect("latest price");

    assert_eq!(latest.price, 22_040.5);
    assert_eq!(latest.time, 1_718_012_400);
}

#[tokio::test]
async fn test_unknown_symbol_is_bad_gateway_with_diagnostics() {
    let vendor = spawn_fake_vendor(200, &[]).await.expect("fake vendor");
    let client = spawn_gateway(test_config(&vendor.base_url))
        .await
        .expect("gateway");

    let result = client.get_latest_price("NOPE").await;

    match result {
        Err(Error::Api { status, code, .. }) => {
            assert_eq!(status, 502);
            assert_eq!(code.as_deref(), Some("UPSTREAM_ERROR"));
        }
        other => panic!("expected 502, got {:?}", other),
    }
}

#[tokio::test]
async fn test_intraday_rejects_unknown_interval() {
    let vendor = spawn_fake_vendor(200, &[]).await.expect("fake vendor");
    let client = spawn_gateway(test_config(&vendor.base_url))
        .await
        .expect("gateway");

    let result = client.get_intraday(&intraday("^NSEI", Some("7m"))).await;

    assert!(matches!(result, Err(Error::InvalidRequest(_))));
}
