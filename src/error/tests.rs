//! Unit tests for error module.

use super::*;
use serde_json::Value;

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn status_error() -> UpstreamError {
    UpstreamError::Status {
        source_name: "ltp-calculator",
        status: 429,
        body: "Too Many Requests".to_string(),
        url: "https://vendor.test/ltp-calculator?symbol=NIFTY".to_string(),
    }
}

// ============================================================================
// ErrorResponse Tests
// ============================================================================

#[test]
fn test_error_response_omits_empty_diagnostics() {
    let response = ErrorResponse {
        error: "Something went wrong".to_string(),
        code: "INTERNAL_ERROR".to_string(),
        status: "error".to_string(),
        details: None,
        url: None,
        symbol: None,
        upstream_status: None,
    };

    let json = serde_json::to_string(&response).unwrap();
    assert_eq!(
        json,
        r#"{"error":"Something went wrong","code":"INTERNAL_ERROR","status":"error"}"#
    );
}

// ============================================================================
// ApiError Display Tests
// ============================================================================

#[test]
fn test_api_error_invalid_request_display() {
    let error = ApiError::InvalidRequest("symbol is required".to_string());
    assert_eq!(format!("{}", error), "Invalid request: symbol is required");
}

#[test]
fn test_api_error_rate_limit_exceeded_display() {
    let error = ApiError::RateLimitExceeded {
        retry_after_secs: 2,
    };
    assert_eq!(format!("{}", error), "Rate limit exceeded, retry in 2 s");
}

#[test]
fn test_api_error_upstream_display() {
    let error = ApiError::upstream(&status_error(), Some("NIFTY"), false);
    assert_eq!(
        format!("{}", error),
        "Upstream error: ltp-calculator returned HTTP 429"
    );
}

// ============================================================================
// Mapping Tests
// ============================================================================

#[test]
fn test_upstream_rate_limit_maps_to_429() {
    let err = UpstreamError::RateLimited {
        source_name: "ltp-calculator",
        retry_after_ms: 1_200,
    };
    match ApiError::upstream(&err, None, false) {
        ApiError::RateLimitExceeded { retry_after_secs } => assert_eq!(retry_after_secs, 2),
        other => panic!("expected rate limit, got {:?}", other),
    }
}

#[test]
fn test_upstream_rate_limit_rounds_up_to_one_second() {
    let err = UpstreamError::RateLimited {
        source_name: "ltp-calculator",
        retry_after_ms: 0,
    };
    assert!(matches!(
        ApiError::upstream(&err, None, false),
        ApiError::RateLimitExceeded { retry_after_secs: 1 }
    ));
}

#[test]
fn test_upstream_client_error_maps_to_internal() {
    let err = UpstreamError::Client("invalid URL".to_string());
    let (status, code) = ApiError::upstream(&err, None, true).status_and_code();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(code, "INTERNAL_ERROR");
}

#[test]
fn test_diagnostics_are_gated() {
    match ApiError::upstream(&status_error(), Some("NIFTY"), false) {
        ApiError::Upstream { diagnostics, .. } => assert!(diagnostics.is_none()),
        other => panic!("expected upstream error, got {:?}", other),
    }

    match ApiError::upstream(&status_error(), Some("NIFTY"), true) {
        ApiError::Upstream { diagnostics, .. } => {
            let diagnostics = diagnostics.unwrap();
            assert_eq!(diagnostics.upstream_status, Some(429));
            assert_eq!(diagnostics.details.as_deref(), Some("Too Many Requests"));
            assert_eq!(diagnostics.symbol.as_deref(), Some("NIFTY"));
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

// ============================================================================
// ApiError IntoResponse Tests
// ============================================================================

#[tokio::test]
async fn test_api_error_invalid_request_into_response() {
    let error = ApiError::InvalidRequest("Bad input".to_string());
    let response = error.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid request: Bad input");
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert_eq!(body["status"], "error");
}

#[test]
fn test_api_error_internal_into_response() {
    let error = ApiError::Internal("Server error".to_string());
    let response = error.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_api_error_rate_limit_exceeded_into_response() {
    let error = ApiError::RateLimitExceeded {
        retry_after_secs: 2,
    };
    let response = error.into_response();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["Retry-After"], "2");
}

#[tokio::test]
async fn test_api_error_upstream_hides_details_by_default() {
    let response = ApiError::upstream(&status_error(), Some("NIFTY"), false).into_response();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["code"], "UPSTREAM_ERROR");
    assert!(body.get("details").is_none());
    assert!(body.get("url").is_none());
    assert!(body.get("upstream_status").is_none());
}

#[tokio::test]
async fn test_api_error_upstream_exposes_details_when_enabled() {
    let response = ApiError::upstream(&status_error(), Some("NIFTY"), true).into_response();

    let body = body_json(response).await;
    assert_eq!(body["details"], "Too Many Requests");
    assert_eq!(body["url"], "https://vendor.test/ltp-calculator?symbol=NIFTY");
    assert_eq!(body["symbol"], "NIFTY");
    assert_eq!(body["upstream_status"], 429);
}

#[tokio::test]
async fn test_api_error_unavailable_into_response() {
    let err = UpstreamError::NotConfigured("upstox");
    let response = ApiError::unavailable(&err, Some("NSE_INDEX|Nifty 50"), true).into_response();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    assert_eq!(body["error"], "Service unavailable: upstox is not configured");
    assert_eq!(body["symbol"], "NSE_INDEX|Nifty 50");
    assert!(body.get("upstream_status").is_none());
}

// ============================================================================
// ApiError Debug Tests
// ============================================================================

#[test]
fn test_api_error_debug() {
    let error = ApiError::InvalidRequest("NIFTY".to_string());
    let debug = format!("{:?}", error);
    assert!(debug.contains("InvalidRequest"));
    assert!(debug.contains("NIFTY"));
}
