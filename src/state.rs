//! Application state management.

use crate::config::Config;
use crate::pricing::OptionPricer;
use crate::simulation::{ChainLayout, SpotSimulator};
use crate::upstream::{
    LtpCalculatorAdapter, UpstoxAdapter, UpstreamClient, UpstreamError, YahooAdapter,
    build_http_client, ltp_calculator, upstox, yahoo,
};
use tracing::{info, warn};

/// Application state shared across all handlers.
#[derive(Debug)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Live option chain source.
    pub upstox: UpstoxAdapter,
    /// Support/resistance analytics vendor.
    pub ltp_calculator: LtpCalculatorAdapter,
    /// Candle and quote source.
    pub yahoo: YahooAdapter,
    /// Spot random walk for the fallback chain.
    pub simulator: SpotSimulator,
    /// Black-Scholes pricer for the fallback chain and pricing endpoint.
    pub pricer: OptionPricer,
    /// Strike layout of simulated chains.
    pub layout: ChainLayout,
}

impl AppState {
    /// Creates the application state from configuration.
    ///
    /// All adapters share one HTTP connection pool.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: Config) -> Result<Self, UpstreamError> {
        let http = build_http_client(&config.upstream)?;
        let retry_delay = config.upstream.retry_delay();
        let client = |source_name| UpstreamClient::new(http.clone(), source_name, retry_delay);

        if config.upstox.access_token.is_none() {
            warn!("No Upstox access token configured, option chains will be simulated");
        }

        let sim = &config.simulation;
        let state = Self {
            upstox: UpstoxAdapter::new(client(upstox::SOURCE_NAME), &config.upstox),
            ltp_calculator: LtpCalculatorAdapter::new(
                client(ltp_calculator::SOURCE_NAME),
                &config.ltp_calculator,
            ),
            yahoo: YahooAdapter::new(client(yahoo::SOURCE_NAME), &config.yahoo),
            simulator: SpotSimulator::new(sim.drift, sim.volatility)
                .with_instruments(sim.base_prices.keys().cloned()),
            pricer: OptionPricer::new(sim.risk_free_rate, sim.volatility),
            layout: ChainLayout {
                strike_step: sim.strike_step,
                strikes_each_side: sim.strikes_each_side,
            },
            config,
        };

        info!(
            "Initialized gateway state (fallback simulation {})",
            if state.config.simulation.fallback_enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        Ok(state)
    }
}
