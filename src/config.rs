//! Configuration module for loading and parsing TOML configuration files.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on simulated strikes per side of the ATM strike.
pub const MAX_STRIKES_EACH_SIDE: u32 = 100;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Settings shared by every outbound HTTP client.
    pub upstream: UpstreamConfig,
    /// Upstox option chain source.
    pub upstox: UpstoxConfig,
    /// LTP calculator analytics vendor.
    pub ltp_calculator: LtpCalculatorConfig,
    /// Yahoo Finance chart source.
    pub yahoo: YahooConfig,
    /// Fallback option chain simulation.
    pub simulation: SimulationConfig,
    /// Error diagnostics exposure.
    pub diagnostics: DiagnosticsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Delay before the single retry that follows an HTTP 429.
    pub retry_delay_ms: u64,
    /// User agent sent to every data source.
    pub user_agent: String,
}

impl UpstreamConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry delay as a [`Duration`].
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_delay_ms: 5_000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Upstox option chain configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstoxConfig {
    /// API base URL, without trailing slash.
    pub base_url: String,
    /// Bearer token. Without it the live chain is unavailable.
    pub access_token: Option<String>,
}

impl Default for UpstoxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.upstox.com/v2".to_string(),
            access_token: None,
        }
    }
}

/// LTP calculator vendor configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LtpCalculatorConfig {
    /// API base URL, without trailing slash.
    pub base_url: String,
    /// Optional API key sent as `x-api-key`.
    pub api_key: Option<String>,
    /// Minimum gap between two calculator requests.
    pub min_request_gap_ms: u64,
    /// Lifetime of a cached expiry list.
    pub expiry_cache_ttl_secs: u64,
    /// Lot size used when the request does not carry one.
    pub default_lot_size: u32,
}

impl LtpCalculatorConfig {
    /// Minimum request gap as a [`Duration`].
    #[must_use]
    pub fn min_request_gap(&self) -> Duration {
        Duration::from_millis(self.min_request_gap_ms)
    }

    /// Expiry cache TTL as a [`Duration`].
    #[must_use]
    pub fn expiry_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.expiry_cache_ttl_secs)
    }
}

impl Default for LtpCalculatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.ltpcalculator.com/v1".to_string(),
            api_key: None,
            min_request_gap_ms: 2_000,
            expiry_cache_ttl_secs: 3_600,
            default_lot_size: 75,
        }
    }
}

/// Yahoo Finance configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YahooConfig {
    /// Chart API base URL, without trailing slash.
    pub base_url: String,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
        }
    }
}

/// Fallback simulation configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Serve a simulated chain when the live source fails.
    pub fallback_enabled: bool,
    /// Annualized drift of the spot random walk.
    pub drift: f64,
    /// Annualized volatility of the walk, also used as pricing volatility.
    pub volatility: f64,
    /// Annualized risk-free rate for Black-Scholes.
    pub risk_free_rate: f64,
    /// Base price for instruments missing from `base_prices`.
    pub default_base_price: f64,
    /// Strike spacing of the simulated chain.
    pub strike_step: f64,
    /// Number of strikes generated on each side of the ATM strike.
    pub strikes_each_side: u32,
    /// Base price per instrument key.
    pub base_prices: HashMap<String, f64>,
}

impl SimulationConfig {
    /// Returns the base price configured for an instrument.
    #[must_use]
    pub fn base_price_for(&self, instrument_key: &str) -> f64 {
        self.base_prices
            .get(instrument_key)
            .copied()
            .unwrap_or(self.default_base_price)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
            drift: 0.05,
            volatility: 0.15,
            risk_free_rate: 0.05,
            default_base_price: 22_000.0,
            strike_step: 50.0,
            strikes_each_side: 10,
            base_prices: HashMap::new(),
        }
    }
}

/// Controls how much upstream detail error responses carry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Include upstream status, body and URL in error responses.
    pub expose_upstream_details: bool,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("upstox.base_url", &self.upstox.base_url),
            ("ltp_calculator.base_url", &self.ltp_calculator.base_url),
            ("yahoo.base_url", &self.yahoo.base_url),
        ] {
            if url::Url::parse(url).is_err() {
                return Err(ConfigError::InvalidValue(format!(
                    "{} is not a valid URL: {}",
                    name, url
                )));
            }
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "upstream.timeout_secs must be positive".to_string(),
            ));
        }
        if self.ltp_calculator.default_lot_size == 0 {
            return Err(ConfigError::InvalidValue(
                "ltp_calculator.default_lot_size must be positive".to_string(),
            ));
        }

        let sim = &self.simulation;
        let positive = |value: f64| value.is_finite() && value > 0.0;
        if !positive(sim.volatility) || sim.volatility > 5.0 {
            return Err(ConfigError::InvalidValue(
                "simulation.volatility must be between 0 and 5".to_string(),
            ));
        }
        if !sim.drift.is_finite() || !sim.risk_free_rate.is_finite() {
            return Err(ConfigError::InvalidValue(
                "simulation.drift and simulation.risk_free_rate must be finite".to_string(),
            ));
        }
        if !positive(sim.default_base_price) {
            return Err(ConfigError::InvalidValue(
                "simulation.default_base_price must be positive".to_string(),
            ));
        }
        if !positive(sim.strike_step) {
            return Err(ConfigError::InvalidValue(
                "simulation.strike_step must be positive".to_string(),
            ));
        }
        if sim.strikes_each_side > MAX_STRIKES_EACH_SIDE {
            return Err(ConfigError::InvalidValue(format!(
                "simulation.strikes_each_side must be at most {}",
                MAX_STRIKES_EACH_SIDE
            )));
        }
        if let Some((key, _)) = sim.base_prices.iter().find(|(_, price)| !positive(**price)) {
            return Err(ConfigError::InvalidValue(format!(
                "simulation base price for {} must be positive",
                key
            )));
        }

        Ok(())
    }

    /// Applies environment overrides for secrets and the listen address.
    ///
    /// Reads `HOST`, `PORT`, `UPSTOX_ACCESS_TOKEN` and `LTP_CALCULATOR_API_KEY`.
    ///
    /// # Errors
    /// Returns error if `PORT` is not a valid port number.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("PORT must be a number: {}", port))
            })?;
        }
        if let Ok(token) = std::env::var("UPSTOX_ACCESS_TOKEN") {
            self.upstox.access_token = Some(token);
        }
        if let Ok(key) = std::env::var("LTP_CALCULATOR_API_KEY") {
            self.ltp_calculator.api_key = Some(key);
        }
        Ok(())
    }
}
