//! HTTP client library for the Option Chain Gateway API.
//!
//! This crate provides a typed HTTP client for every gateway endpoint.
//!
//! # Example
//!
//! ```no_run
//! use gateway_client::{ClientConfig, GatewayClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gateway_client::Error> {
//!     let client = GatewayClient::new(ClientConfig {
//!         base_url: "http://localhost:8080".into(),
//!         timeout: Duration::from_secs(30),
//!     })?;
//!
//!     let chain = client
//!         .get_option_chain("NSE_INDEX|Nifty 50", "2024-06-13")
//!         .await?;
//!     println!("{} strikes from {:?}", chain.data.len(), chain.source);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{ClientConfig, GatewayClient};
pub use error::Error;
pub use types::*;
