//! OpenAPI documentation.

use crate::error::ErrorResponse;
use crate::expiry::ExpiryKind;
use crate::models::{
    Candle, ChainSource, ExpiryListResponse, HealthResponse, LatestPrice, LtpCalculatorResponse,
    MarketData, NiftyExpiryResponse, OptionChainData, OptionChainResponse, OptionGreeks,
    OptionLeg,
};
use crate::pricing::{LegQuote, OptionQuote};
use utoipa::OpenApi;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health_check,
        crate::api::handlers::get_option_chain,
        crate::api::handlers::get_ltp_calculator,
        crate::api::handlers::get_intraday,
        crate::api::handlers::get_latest_price,
        crate::api::handlers::list_expiries,
        crate::api::handlers::get_nifty_expiry,
        crate::api::handlers::get_pricing_quote,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            ChainSource,
            MarketData,
            OptionGreeks,
            OptionLeg,
            OptionChainData,
            OptionChainResponse,
            LtpCalculatorResponse,
            Candle,
            LatestPrice,
            ExpiryKind,
            ExpiryListResponse,
            NiftyExpiryResponse,
            LegQuote,
            OptionQuote,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Option Chain", description = "Live or simulated option chains"),
        (name = "LTP Calculator", description = "Support and resistance analysis"),
        (name = "Yahoo Finance", description = "Intraday candles and latest prices"),
        (name = "Expiries", description = "Expiry lists and resolution"),
        (name = "Pricing", description = "Black-Scholes quotes"),
    ),
    info(
        title = "Option Chain Gateway API",
        version = "0.1.0",
        description = "REST gateway normalizing option chain and market data sources",
        license(name = "MIT"),
        contact(name = "Joaquin Bejar", email = "jb@taunais.com")
    )
)]
pub struct ApiDoc;
