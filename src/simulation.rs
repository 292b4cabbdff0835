//! Fallback option chain simulation.
//!
//! When the live option chain source is unavailable the gateway serves a
//! chain priced with Black-Scholes around a simulated spot. The spot follows
//! a geometric Brownian motion advanced by the real time elapsed between
//! requests, so consecutive responses look continuous.

use crate::expiry::ExpiryDate;
use crate::models::{MarketData, OptionChainData, OptionGreeks, OptionLeg};
use crate::pricing::{LegQuote, MIN_OPTION_PRICE, OptionPricer};
use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use std::collections::HashSet;
use std::time::Instant;
use tracing::debug;

const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 3600.0;

/// Floor applied to the walk, as a fraction of the base price.
pub const SPOT_FLOOR_RATIO: f64 = 0.9;

/// Half spread around the theoretical price for simulated bid/ask.
const HALF_SPREAD: f64 = 0.05;

/// Walk shared by every instrument without its own.
const SHARED_WALK: &str = "*";

/// Last simulated spot for one instrument.
#[derive(Debug, Clone, Copy)]
struct SpotState {
    spot: f64,
    updated_at: Instant,
}

/// Random walk of simulated spot prices.
///
/// Instruments registered with [`with_instruments`](Self::with_instruments)
/// each get their own walk. Any other key advances one shared walk, so the
/// state stays bounded whatever keys requests carry.
#[derive(Debug)]
pub struct SpotSimulator {
    /// Annualized drift.
    drift: f64,
    /// Annualized volatility.
    volatility: f64,
    instruments: HashSet<String>,
    states: DashMap<String, SpotState>,
}

impl SpotSimulator {
    /// Creates a new spot simulator.
    ///
    /// # Arguments
    /// * `drift` - Annualized drift (e.g., 0.05)
    /// * `volatility` - Annualized volatility (e.g., 0.15)
    #[must_use]
    pub fn new(drift: f64, volatility: f64) -> Self {
        Self {
            drift,
            volatility,
            instruments: HashSet::new(),
            states: DashMap::new(),
        }
    }

    /// Gives each of `keys` its own walk.
    #[must_use]
    pub fn with_instruments<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instruments.extend(keys.into_iter().map(Into::into));
        self
    }

    fn walk_key<'a>(&self, key: &'a str) -> &'a str {
        if self.instruments.contains(key) {
            key
        } else {
            SHARED_WALK
        }
    }

    /// Returns the next simulated spot for `key`.
    ///
    /// The first call returns `base_price`. Each later call advances the walk
    /// by the wall-clock time since the previous call.
    pub fn simulate_spot(&self, key: &str, base_price: f64) -> f64 {
        let shock = rand::rng().random::<f64>() - 0.5;
        self.simulate_spot_at(key, base_price, Instant::now(), shock)
    }

    /// Same as [`simulate_spot`](Self::simulate_spot) with an explicit clock
    /// and shock (`uniform(0,1) - 0.5`).
    pub fn simulate_spot_at(&self, key: &str, base_price: f64, now: Instant, shock: f64) -> f64 {
        let floor = SPOT_FLOOR_RATIO * base_price;

        let mut state = match self.states.entry(self.walk_key(key).to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(SpotState {
                    spot: base_price,
                    updated_at: now,
                });
                return base_price;
            }
            Entry::Occupied(occupied) => occupied.into_ref(),
        };

        let elapsed = now.saturating_duration_since(state.updated_at);
        let dt = elapsed.as_secs_f64() / SECONDS_PER_YEAR;
        let next = gbm_step(state.spot, self.drift, self.volatility, dt, shock).max(floor);

        state.spot = next;
        state.updated_at = now;

        debug!("Simulated spot {} = {:.2}", key, next);
        next
    }

    /// Last simulated spot for `key`, if any.
    #[must_use]
    pub fn current_spot(&self, key: &str) -> Option<f64> {
        self.states.get(self.walk_key(key)).map(|s| s.spot)
    }

    /// Number of walks in progress.
    #[must_use]
    pub fn walk_count(&self) -> usize {
        self.states.len()
    }
}

impl Default for SpotSimulator {
    fn default() -> Self {
        Self::new(0.05, 0.15)
    }
}

/// One geometric Brownian motion step over `dt` years.
#[must_use]
pub fn gbm_step(spot: f64, drift: f64, volatility: f64, dt: f64, shock: f64) -> f64 {
    let exponent = (drift - volatility * volatility / 2.0) * dt + volatility * dt.sqrt() * shock;
    spot * exponent.exp()
}

/// Layout of a simulated chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainLayout {
    /// Strike spacing.
    pub strike_step: f64,
    /// Strikes generated on each side of the ATM strike.
    pub strikes_each_side: u32,
}

impl ChainLayout {
    /// Strikes centered on the strike nearest to `spot`, ascending.
    #[must_use]
    pub fn strikes_around(&self, spot: f64) -> Vec<f64> {
        let atm = (spot / self.strike_step).round() * self.strike_step;
        let side = i64::from(self.strikes_each_side);

        (-side..=side)
            .map(|i| atm + i as f64 * self.strike_step)
            .filter(|strike| *strike > 0.0)
            .collect()
    }
}

/// Builds a simulated option chain around `spot`.
#[must_use]
pub fn simulate_chain(
    pricer: &OptionPricer,
    layout: ChainLayout,
    instrument_key: &str,
    expiry: ExpiryDate,
    spot: f64,
    today: NaiveDate,
) -> Vec<OptionChainData> {
    let days = expiry.days_from(today).max(0) as f64;

    layout
        .strikes_around(spot)
        .into_iter()
        .map(|strike| {
            let quote = pricer.price(spot, strike, days);
            OptionChainData {
                expiry: expiry.iso_format(),
                pcr: None,
                strike_price: strike,
                underlying_key: Some(instrument_key.to_string()),
                underlying_spot_price: spot,
                call_options: Some(simulated_leg(&quote.call)),
                put_options: Some(simulated_leg(&quote.put)),
            }
        })
        .collect()
}

fn simulated_leg(leg: &LegQuote) -> OptionLeg {
    OptionLeg {
        instrument_key: None,
        market_data: MarketData {
            ltp: round2(leg.price),
            volume: 0,
            oi: 0.0,
            close_price: round2(leg.price),
            bid_price: round2((leg.price - HALF_SPREAD).max(MIN_OPTION_PRICE)),
            bid_qty: 0,
            ask_price: round2(leg.price + HALF_SPREAD),
            ask_qty: 0,
            prev_oi: 0.0,
        },
        option_greeks: OptionGreeks {
            vega: leg.vega,
            theta: leg.theta,
            gamma: leg.gamma,
            delta: leg.delta,
            iv: leg.implied_volatility,
            pop: leg.probability_itm * 100.0,
        },
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
