//! Black-Scholes option pricing used by the fallback option chain.

use serde::Serialize;
use utoipa::ToSchema;

/// Smallest price ever quoted for a simulated option.
pub const MIN_OPTION_PRICE: f64 = 0.05;

const DAYS_PER_YEAR: f64 = 365.0;

/// Pricing and greeks for one side (call or put) of a strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct LegQuote {
    /// Theoretical price, never below [`MIN_OPTION_PRICE`].
    pub price: f64,
    /// Delta.
    pub delta: f64,
    /// Gamma.
    pub gamma: f64,
    /// Theta per calendar day.
    pub theta: f64,
    /// Vega per 1 volatility point.
    pub vega: f64,
    /// Volatility used, in percent.
    pub implied_volatility: f64,
    /// Probability of expiring in the money, 0 to 1.
    pub probability_itm: f64,
}

/// Call and put pricing for one strike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct OptionQuote {
    /// Strike price.
    pub strike: f64,
    /// Spot price used.
    pub spot: f64,
    /// Days until expiry.
    pub days_to_expiry: f64,
    /// Call side.
    pub call: LegQuote,
    /// Put side.
    pub put: LegQuote,
}

/// Simple Black-Scholes pricer with a flat volatility.
#[derive(Debug, Clone, Copy)]
pub struct OptionPricer {
    /// Risk-free rate (annualized).
    risk_free_rate: f64,
    /// Volatility (annualized).
    volatility: f64,
}

impl OptionPricer {
    /// Creates a new option pricer.
    ///
    /// # Arguments
    /// * `risk_free_rate` - Annualized risk-free rate (e.g., 0.05 for 5%)
    /// * `volatility` - Annualized volatility (e.g., 0.15 for 15%)
    #[must_use]
    pub fn new(risk_free_rate: f64, volatility: f64) -> Self {
        Self {
            risk_free_rate,
            volatility,
        }
    }

    /// Volatility used for pricing.
    #[must_use]
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Prices both sides of a strike.
    ///
    /// # Arguments
    /// * `spot` - Current underlying price
    /// * `strike` - Option strike price
    /// * `days_to_expiry` - Calendar days until expiry
    ///
    /// Expired options (`days_to_expiry <= 0`) are priced at intrinsic value.
    #[must_use]
    pub fn price(&self, spot: f64, strike: f64, days_to_expiry: f64) -> OptionQuote {
        let t = days_to_expiry / DAYS_PER_YEAR;
        let iv_percent = self.volatility * 100.0;

        if t <= 0.0 || spot <= 0.0 || strike <= 0.0 {
            return self.intrinsic(spot, strike, days_to_expiry);
        }

        let r = self.risk_free_rate;
        let sigma = self.volatility;
        let sqrt_t = t.sqrt();

        let d1 = ((spot / strike).ln() + (r + sigma * sigma / 2.0) * t) / (sigma * sqrt_t);
        let d2 = d1 - sigma * sqrt_t;

        let discount = (-r * t).exp();
        let pdf_d1 = norm_pdf(d1);

        let call_price = spot * norm_cdf(d1) - strike * discount * norm_cdf(d2);
        let put_price = strike * discount * norm_cdf(-d2) - spot * norm_cdf(-d1);

        let gamma = pdf_d1 / (spot * sigma * sqrt_t);
        let vega = spot * pdf_d1 * sqrt_t / 100.0;

        let decay = -spot * pdf_d1 * sigma / (2.0 * sqrt_t);
        let call_theta = (decay - r * strike * discount * norm_cdf(d2)) / DAYS_PER_YEAR;
        let put_theta = (decay + r * strike * discount * norm_cdf(-d2)) / DAYS_PER_YEAR;

        OptionQuote {
            strike,
            spot,
            days_to_expiry,
            call: LegQuote {
                price: call_price.max(MIN_OPTION_PRICE),
                delta: norm_cdf(d1),
                gamma,
                theta: call_theta,
                vega,
                implied_volatility: iv_percent,
                probability_itm: norm_cdf(d2),
            },
            put: LegQuote {
                price: put_price.max(MIN_OPTION_PRICE),
                delta: norm_cdf(d1) - 1.0,
                gamma,
                theta: put_theta,
                vega,
                implied_volatility: iv_percent,
                probability_itm: norm_cdf(-d2),
            },
        }
    }

    fn intrinsic(&self, spot: f64, strike: f64, days_to_expiry: f64) -> OptionQuote {
        let iv_percent = self.volatility * 100.0;
        let call_itm = spot > strike;
        let put_itm = spot < strike;

        OptionQuote {
            strike,
            spot,
            days_to_expiry,
            call: LegQuote {
                price: (spot - strike).max(MIN_OPTION_PRICE),
                delta: if call_itm { 1.0 } else { 0.0 },
                gamma: 0.0,
                theta: 0.0,
                vega: 0.0,
                implied_volatility: iv_percent,
                probability_itm: if call_itm { 1.0 } else { 0.0 },
            },
            put: LegQuote {
                price: (strike - spot).max(MIN_OPTION_PRICE),
                delta: if put_itm { -1.0 } else { 0.0 },
                gamma: 0.0,
                theta: 0.0,
                vega: 0.0,
                implied_volatility: iv_percent,
                probability_itm: if put_itm { 1.0 } else { 0.0 },
            },
        }
    }
}

impl Default for OptionPricer {
    fn default() -> Self {
        Self::new(0.05, 0.15)
    }
}

/// Standard normal CDF approximation.
#[must_use]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Standard normal PDF.
#[must_use]
pub fn norm_pdf(x: f64) -> f64 {
    (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Error function approximation (Abramowitz-Stegun 7.1.26).
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}
