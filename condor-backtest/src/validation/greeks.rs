//! Fallback greeks from Black-Scholes.
//!
//! Broker exports often carry delta and IV but omit gamma, theta and vega.
//! Missing values are filled from a Black-Scholes model using the quoted IV.
//!
//! Conventions:
//! - theta is per calendar day
//! - vega is per 1 point of volatility

use std::f64::consts::{PI, SQRT_2};

use chrono::NaiveDate;
use statrs::function::erf::erf;
use tracing::{debug, warn};

use crate::data::{Contract, OptionType};

/// Risk-free rate used when none is supplied.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.05;

/// Black-Scholes greeks calculator.
#[derive(Debug, Clone, Copy)]
pub struct BlackScholes {
    /// Risk-free interest rate
    pub rate: f64,
    /// Continuous dividend yield
    pub dividend: f64,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RISK_FREE_RATE,
            dividend: 0.0,
        }
    }
}

impl BlackScholes {
    pub fn new(rate: f64, dividend: f64) -> Self {
        Self { rate, dividend }
    }

    fn d1(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let numerator =
            (spot / strike).ln() + (self.rate - self.dividend + 0.5 * vol * vol) * time;
        numerator / (vol * time.sqrt())
    }

    fn d2(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        self.d1(spot, strike, time, vol) - vol * time.sqrt()
    }

    /// Standard normal CDF.
    pub fn norm_cdf(x: f64) -> f64 {
        0.5 * (1.0 + erf(x / SQRT_2))
    }

    fn norm_pdf(x: f64) -> f64 {
        (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
    }

    pub fn delta(&self, spot: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        if time <= 0.0 || vol <= 0.0 {
            return match opt_type {
                OptionType::Call if spot > strike => 1.0,
                OptionType::Put if spot < strike => -1.0,
                _ => 0.0,
            };
        }

        let d1 = self.d1(spot, strike, time, vol);
        let discount = (-self.dividend * time).exp();

        match opt_type {
            OptionType::Call => discount * Self::norm_cdf(d1),
            OptionType::Put => discount * (Self::norm_cdf(d1) - 1.0),
        }
    }

    /// Gamma (same for calls and puts).
    pub fn gamma(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        if time <= 0.0 || vol <= 0.0 {
            return 0.0;
        }

        let d1 = self.d1(spot, strike, time, vol);
        let discount = (-self.dividend * time).exp();

        discount * Self::norm_pdf(d1) / (spot * vol * time.sqrt())
    }

    /// Vega per 1 point of volatility.
    pub fn vega(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        if time <= 0.0 || vol <= 0.0 {
            return 0.0;
        }

        let d1 = self.d1(spot, strike, time, vol);
        let discount = (-self.dividend * time).exp();

        spot * discount * Self::norm_pdf(d1) * time.sqrt() / 100.0
    }

    /// Theta per calendar day.
    pub fn theta(&self, spot: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        if time <= 0.0 || vol <= 0.0 {
            return 0.0;
        }

        let d1 = self.d1(spot, strike, time, vol);
        let d2 = self.d2(spot, strike, time, vol);
        let discount_d = (-self.dividend * time).exp();
        let discount_r = (-self.rate * time).exp();

        let decay = -spot * discount_d * Self::norm_pdf(d1) * vol / (2.0 * time.sqrt());

        let annual = match opt_type {
            OptionType::Call => {
                decay + self.dividend * spot * discount_d * Self::norm_cdf(d1)
                    - self.rate * strike * discount_r * Self::norm_cdf(d2)
            }
            OptionType::Put => {
                decay - self.dividend * spot * discount_d * Self::norm_cdf(-d1)
                    + self.rate * strike * discount_r * Self::norm_cdf(-d2)
            }
        };
        annual / 365.0
    }
}

/// Sanity problems in broker-supplied greeks, if any.
pub fn greeks_issue(contract: &Contract) -> Option<String> {
    const TOLERANCE: f64 = 0.05;

    if contract.delta.abs() > 1.0 + TOLERANCE {
        return Some(format!("delta {:.3} outside [-1, 1]", contract.delta));
    }
    match contract.option_type {
        OptionType::Call if contract.delta < -TOLERANCE => {
            return Some(format!("call has negative delta {:.3}", contract.delta));
        }
        OptionType::Put if contract.delta > TOLERANCE => {
            return Some(format!("put has positive delta {:.3}", contract.delta));
        }
        _ => {}
    }
    if contract.gamma.is_some_and(|g| g < -TOLERANCE) {
        return Some("negative gamma".to_string());
    }
    if contract.vega.is_some_and(|v| v < -TOLERANCE) {
        return Some("negative vega".to_string());
    }
    None
}

/// Fills missing gamma, theta and vega on contracts.
#[derive(Debug, Clone)]
pub struct GreeksEstimator {
    model: BlackScholes,
}

impl GreeksEstimator {
    /// Build an estimator; a missing rate falls back to
    /// [`DEFAULT_RISK_FREE_RATE`] with a warning.
    pub fn new(risk_free_rate: Option<f64>) -> Self {
        let rate = match risk_free_rate {
            Some(r) if r.is_finite() => r,
            _ => {
                warn!(
                    fallback = DEFAULT_RISK_FREE_RATE,
                    "No risk-free rate supplied; using fallback"
                );
                DEFAULT_RISK_FREE_RATE
            }
        };
        Self {
            model: BlackScholes::new(rate, 0.0),
        }
    }

    pub fn rate(&self) -> f64 {
        self.model.rate
    }

    /// Return a contract with missing greeks filled from the model.
    ///
    /// Contracts that already carry all greeks, or that lack a usable IV or
    /// spot, come back unchanged.
    pub fn fill_missing(&self, contract: &Contract, spot: f64, as_of: NaiveDate) -> Contract {
        if let Some(issue) = greeks_issue(contract) {
            warn!(contract = %contract, %issue, "Suspicious broker greeks");
        }

        if contract.has_full_greeks() {
            return contract.clone();
        }

        if contract.implied_vol <= 0.0 || spot <= 0.0 {
            warn!(
                contract = %contract,
                iv = contract.implied_vol,
                "Cannot compute fallback greeks without IV and spot"
            );
            return contract.clone();
        }

        let strike: f64 = contract.strike.try_into().unwrap_or(0.0);
        if strike <= 0.0 {
            return contract.clone();
        }
        let time = contract.dte(as_of).max(0) as f64 / 365.0;
        let vol = contract.implied_vol;

        let gamma = self.model.gamma(spot, strike, time, vol);
        let theta = self.model.theta(spot, strike, time, vol, contract.option_type);
        let vega = self.model.vega(spot, strike, time, vol);

        warn!(contract = %contract, "Filled missing greeks from Black-Scholes");
        debug!(gamma, theta, vega, "Fallback greeks");

        contract.with_greeks(gamma, theta, vega)
    }

    pub fn fill_all(&self, contracts: &[Contract], spot: f64, as_of: NaiveDate) -> Vec<Contract> {
        contracts
            .iter()
            .map(|c| self.fill_missing(c, spot, as_of))
            .collect()
    }
}

impl Default for GreeksEstimator {
    fn default() -> Self {
        Self {
            model: BlackScholes::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contract(option_type: OptionType, delta: f64) -> Contract {
        Contract {
            ticker: "SPY".to_string(),
            strike: dec!(100),
            expiration: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            option_type,
            bid: dec!(2.0),
            ask: dec!(2.2),
            volume: 100,
            open_interest: 1000,
            delta,
            implied_vol: 0.20,
            last: None,
            gamma: None,
            theta: None,
            vega: None,
        }
    }

    #[test]
    fn test_norm_cdf() {
        assert!((BlackScholes::norm_cdf(0.0) - 0.5).abs() < 1e-12);
        assert!((BlackScholes::norm_cdf(1.96) - 0.975).abs() < 1e-3);
    }

    #[test]
    fn test_atm_greeks() {
        let bs = BlackScholes::new(0.05, 0.0);
        let call_delta = bs.delta(100.0, 100.0, 0.25, 0.20, OptionType::Call);
        let put_delta = bs.delta(100.0, 100.0, 0.25, 0.20, OptionType::Put);
        assert!(call_delta > 0.5 && call_delta < 0.6);
        assert!((call_delta - put_delta - 1.0).abs() < 1e-9);

        assert!(bs.gamma(100.0, 100.0, 0.25, 0.20) > 0.0);
        assert!(bs.vega(100.0, 100.0, 0.25, 0.20) > 0.0);
        assert!(bs.theta(100.0, 100.0, 0.25, 0.20, OptionType::Call) < 0.0);
    }

    #[test]
    fn test_expired_delta() {
        let bs = BlackScholes::default();
        assert_eq!(bs.delta(105.0, 100.0, 0.0, 0.2, OptionType::Call), 1.0);
        assert_eq!(bs.delta(105.0, 100.0, 0.0, 0.2, OptionType::Put), 0.0);
        assert_eq!(bs.delta(95.0, 100.0, 0.0, 0.2, OptionType::Put), -1.0);
    }

    #[test]
    fn test_fill_missing() {
        let estimator = GreeksEstimator::new(Some(0.04));
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let original = contract(OptionType::Put, -0.45);

        let filled = estimator.fill_missing(&original, 100.0, as_of);
        assert!(filled.has_full_greeks());
        assert!(filled.gamma.unwrap() > 0.0);
        assert!(filled.vega.unwrap() > 0.0);
        // Source contract untouched.
        assert!(!original.has_full_greeks());
    }

    #[test]
    fn test_fill_missing_without_iv_is_noop() {
        let estimator = GreeksEstimator::default();
        let mut c = contract(OptionType::Call, 0.3);
        c.implied_vol = 0.0;
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(estimator.fill_missing(&c, 100.0, as_of), c);
    }

    #[test]
    fn test_missing_rate_falls_back() {
        assert_eq!(GreeksEstimator::new(None).rate(), DEFAULT_RISK_FREE_RATE);
        assert_eq!(GreeksEstimator::new(Some(f64::NAN)).rate(), DEFAULT_RISK_FREE_RATE);
    }

    #[test]
    fn test_greeks_issue() {
        assert!(greeks_issue(&contract(OptionType::Call, 0.3)).is_none());
        assert!(greeks_issue(&contract(OptionType::Call, -0.3)).is_some());
        assert!(greeks_issue(&contract(OptionType::Put, 0.3)).is_some());
        assert!(greeks_issue(&contract(OptionType::Put, -1.2)).is_some());
    }
}
