//! Health check and expiry calendar tests.

use gateway_client::{Error, ExpiryKind, PricingQuery};
use gateway_tests::{spawn_fake_vendor, spawn_gateway, test_config};

#[tokio::test]
async fn test_health_check() {
    let vendor = spawn_fake_vendor(200, &[]).await.expect("fake vendor");
    let client = spawn_gateway(test_config(&vendor.base_url))
        .await
        .expect("gateway");

    let health = client.health_check().await.expect("health check failed");

    assert_eq!(health.status, "healthy");
    assert!(!health.version.is_empty());
}

#[tokio::test]
async fn test_nifty_expiry_weekly_and_monthly() {
    let vendor = spawn_fake_vendor(200, &[]).await.expect("fake vendor");
    let client = spawn_gateway(test_config(&vendor.base_url))
        .await
        .expect("gateway");

    let weekly = client
        .get_nifty_expiry(Some("2024-06-10"))
        .await
        .expect("weekly expiry");
    assert_eq!(weekly.requested, "2024-06-10");
    assert_eq!(weekly.expiry, "13-06-2024");
    assert_eq!(weekly.kind, ExpiryKind::Weekly);

    let monthly = client
        .get_nifty_expiry(Some("2024-06-24"))
        .await
        .expect("monthly expiry");
    assert_eq!(monthly.expiry, "27-06-2024");
    assert_eq!(monthly.kind, ExpiryKind::Monthly);
}

#[tokio::test]
async fn test_nifty_expiry_defaults_to_today() {
    let vendor = spawn_fake_vendor(200, &[]).await.expect("fake vendor");
    let client = spawn_gateway(test_config(&vendor.base_url))
        .await
        .expect("gateway");

    let response = client.get_nifty_expiry(None).await.expect("expiry");

    assert_eq!(response.requested.len(), 10);
    assert_eq!(response.expiry.len(), 10);
}

#[tokio::test]
async fn test_pricing_quote_parity() {
    let vendor = spawn_fake_vendor(200, &[]).await.expect("fake vendor");
    let client = spawn_gateway(test_config(&vendor.base_url))
        .await
        .expect("gateway");

    let quote = client
        .get_pricing_quote(&PricingQuery {
            spot: 22_000.0,
            strike: 22_000.0,
            days_to_expiry: 30.0,
        })
        .await
        .expect("quote");

    assert!(quote.call.price > 0.0);
    assert!(quote.put.price > 0.0);
    assert!(quote.call.delta > 0.0 && quote.call.delta < 1.0);
    assert!(quote.put.delta < 0.0 && quote.put.delta > -1.0);
    // At the money with positive rates the call is worth more than the put.
    assert!(quote.call.price > quote.put.price);
}

#[tokio::test]
async fn test_pricing_quote_rejects_non_positive_spot() {
    let vendor = spawn_fake_vendor(200, &[]).await.expect("fake vendor");
    let client = spawn_gateway(test_config(&vendor.base_url))
        .await
        .expect("gateway");

    let result = client
        .get_pricing_quote(&PricingQuery {
            spot: 0.0,
            strike: 22_000.0,
            days_to_expiry: 7.0,
        })
        .await;

    assert!(matches!(result, Err(Error::InvalidRequest(_))));
}
