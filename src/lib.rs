//! # Option Chain Gateway - REST API Server
//!
//! A REST gateway that reshapes third-party market data into stable JSON
//! for a trading dashboard. Built with [Axum](https://crates.io/crates/axum)
//! for async HTTP handling and documented with
//! [utoipa](https://crates.io/crates/utoipa).
//!
//! ## Key Features
//!
//! - **Option Chains**: Put/call chains from Upstox normalized per strike. When
//!   the broker is unavailable a Black-Scholes chain around a simulated spot is
//!   served instead, flagged as `simulated`.
//!
//! - **LTP Calculator**: Support/resistance analysis from the vendor, with the
//!   expiry resolved from the vendor's expiry list or the NSE calendar.
//!
//! - **Yahoo Finance**: Intraday candles and latest prices.
//!
//! - **Expiry Resolution**: Weekly/monthly Thursday expiry logic exposed
//!   directly.
//!
//! - **Upstream Policy**: One retry after HTTP 429, a minimum gap between
//!   vendor calls, a one hour expiry list cache, and structured errors for
//!   malformed responses.
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Route handlers, router and OpenAPI document |
//! | [`config`] | TOML configuration with environment overrides |
//! | [`error`] | API error types with `IntoResponse` implementation |
//! | [`expiry`] | Expiry date parsing and resolution |
//! | [`models`] | Request/response DTOs with OpenAPI schemas |
//! | [`pricing`] | Black-Scholes pricer |
//! | [`simulation`] | Spot random walk and simulated chains |
//! | [`state`] | Application state management |
//! | [`upstream`] | Data source adapters |
//!
//! ## API Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/option-chain?instrument_key&expiry_date` | Option chain |
//! | GET | `/api/v1/ltp-calculator?symbol&expiry&expiryDate&lotSize` | Support/resistance |
//! | GET | `/api/v1/yahoo-finance/intraday?symbol&interval&range` | Candles |
//! | GET | `/api/v1/yahoo-finance/latest-price?symbol` | Latest price |
//! | GET | `/api/v1/expiries?symbol&expiry` | Vendor expiry list |
//! | GET | `/api/v1/expiries/nifty?date` | NIFTY expiry for a date |
//! | GET | `/api/v1/pricing/quote?spot&strike&days_to_expiry` | Black-Scholes quote |
//!
//! ## Example Usage
//!
//! ```bash
//! # Defaults, or config/gateway.toml when present
//! cargo run
//!
//! # Explicit configuration and secrets
//! CONFIG_PATH=config/gateway.toml UPSTOX_ACCESS_TOKEN=... cargo run
//!
//! curl "http://localhost:8080/api/v1/option-chain?instrument_key=NSE_INDEX%7CNifty%2050&expiry_date=2024-06-13"
//! curl "http://localhost:8080/api/v1/expiries/nifty?date=2024-06-10"
//! ```
//!
//! ## Swagger UI
//!
//! ```text
//! http://localhost:8080/swagger-ui/
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod expiry;
pub mod models;
pub mod pricing;
pub mod simulation;
pub mod state;
pub mod upstream;
