//! Route configuration.

use crate::api::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;

/// Creates the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Option chain
        .route("/api/v1/option-chain", get(handlers::get_option_chain))
        // LTP calculator
        .route("/api/v1/ltp-calculator", get(handlers::get_ltp_calculator))
        // Yahoo Finance
        .route(
            "/api/v1/yahoo-finance/intraday",
            get(handlers::get_intraday),
        )
        .route(
            "/api/v1/yahoo-finance/latest-price",
            get(handlers::get_latest_price),
        )
        // Expiries
        .route("/api/v1/expiries", get(handlers::list_expiries))
        .route("/api/v1/expiries/nifty", get(handlers::get_nifty_expiry))
        // Pricing
        .route("/api/v1/pricing/quote", get(handlers::get_pricing_quote))
        .with_state(state)
}
