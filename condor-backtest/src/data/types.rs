//! Core data types for iron condor screening and backtesting.
//!
//! These types represent one option contract from a chain snapshot and the
//! underlying price series the simulator walks. Contracts are immutable once
//! built; an "update" always produces a new instance.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

/// A single option contract.
///
/// Delta and implied volatility are required; the remaining greeks and the
/// last trade price are optional because broker exports frequently omit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Underlying symbol (e.g., "SPY")
    pub ticker: String,

    /// Strike price
    pub strike: Decimal,

    /// Option expiration date
    pub expiration: NaiveDate,

    /// Option type (call or put)
    pub option_type: OptionType,

    /// Bid price
    pub bid: Decimal,

    /// Ask price
    pub ask: Decimal,

    /// Trading volume
    pub volume: i64,

    /// Open interest
    pub open_interest: i64,

    /// Delta (puts negative, calls positive)
    pub delta: f64,

    /// Implied volatility as a decimal (0.25 = 25%)
    pub implied_vol: f64,

    /// Last trade price
    pub last: Option<Decimal>,

    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
}

impl Contract {
    /// Mid price between bid and ask.
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    /// Bid-ask spread as a fraction of mid (0.10 = 10%).
    ///
    /// Infinite when the mid is not positive, so such quotes always fail a
    /// spread filter.
    pub fn spread_pct(&self) -> f64 {
        let mid = self.mid();
        if mid <= Decimal::ZERO {
            return f64::INFINITY;
        }
        ((self.ask - self.bid) / mid).try_into().unwrap_or(f64::INFINITY)
    }

    /// Days to expiration measured from `as_of`.
    pub fn dte(&self, as_of: NaiveDate) -> i32 {
        (self.expiration - as_of).num_days() as i32
    }

    /// Whether all optional greeks are present.
    pub fn has_full_greeks(&self) -> bool {
        self.gamma.is_some() && self.theta.is_some() && self.vega.is_some()
    }

    /// Return a copy with the given greeks filled in where missing.
    pub fn with_greeks(&self, gamma: f64, theta: f64, vega: f64) -> Self {
        Self {
            gamma: self.gamma.or(Some(gamma)),
            theta: self.theta.or(Some(theta)),
            vega: self.vega.or(Some(vega)),
            ..self.clone()
        }
    }
}

impl std::fmt::Display for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}{} {} delta={:.3} iv={:.2}%",
            self.ticker,
            self.strike.normalize(),
            if self.option_type == OptionType::Call { "C" } else { "P" },
            self.expiration,
            self.delta,
            self.implied_vol * 100.0
        )
    }
}

/// One sample of the underlying price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
}

/// Chronologically ordered underlying price samples.
///
/// Deserializes from a plain sample list and sorts it like [`PricePath::new`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PricePoint>", into = "Vec<PricePoint>")]
pub struct PricePath {
    points: Vec<PricePoint>,
}

impl PricePath {
    /// Build a path, sorting samples by date (stable for equal dates).
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self { points }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (NaiveDate, Decimal)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, price)| PricePoint { date, price })
                .collect(),
        )
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Samples with `start <= date <= end`, in order.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = &PricePoint> {
        self.points
            .iter()
            .skip_while(move |p| p.date < start)
            .take_while(move |p| p.date <= end)
    }

    /// Closing prices as f64, for volatility estimation.
    pub fn closes(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.price.try_into().unwrap_or(0.0))
            .collect()
    }
}

impl From<Vec<PricePoint>> for PricePath {
    fn from(points: Vec<PricePoint>) -> Self {
        Self::new(points)
    }
}

impl From<PricePath> for Vec<PricePoint> {
    fn from(path: PricePath) -> Self {
        path.points
    }
}

/// Daily bar data for the underlying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderlyingBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contract(bid: Decimal, ask: Decimal) -> Contract {
        Contract {
            ticker: "SPY".to_string(),
            strike: dec!(545),
            expiration: NaiveDate::from_ymd_opt(2024, 2, 16).unwrap(),
            option_type: OptionType::Put,
            bid,
            ask,
            volume: 100,
            open_interest: 1000,
            delta: -0.2,
            implied_vol: 0.18,
            last: None,
            gamma: None,
            theta: None,
            vega: None,
        }
    }

    #[test]
    fn test_option_type_parsing() {
        assert_eq!(OptionType::from_str("C"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str("P"), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("call"), Some(OptionType::Call));
        assert_eq!(OptionType::from_str(" PUT "), Some(OptionType::Put));
        assert_eq!(OptionType::from_str("X"), None);
    }

    #[test]
    fn test_mid_and_spread() {
        let c = contract(dec!(1.90), dec!(2.10));
        assert_eq!(c.mid(), dec!(2.00));
        assert!((c.spread_pct() - 0.10).abs() < 1e-12);

        let dead = contract(dec!(0), dec!(0));
        assert!(dead.spread_pct().is_infinite());
    }

    #[test]
    fn test_dte_uses_as_of() {
        let c = contract(dec!(1), dec!(1.2));
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(c.dte(as_of), 32);
    }

    #[test]
    fn test_with_greeks_keeps_existing_values() {
        let mut c = contract(dec!(1), dec!(1.2));
        c.gamma = Some(0.05);
        let filled = c.with_greeks(0.01, -0.02, 0.03);
        assert_eq!(filled.gamma, Some(0.05));
        assert_eq!(filled.theta, Some(-0.02));
        assert_eq!(filled.vega, Some(0.03));
        assert!(filled.has_full_greeks());
        assert!(!c.has_full_greeks());
    }

    #[test]
    fn test_price_path_sorted_and_windowed() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let path = PricePath::from_pairs(vec![
            (d(3), dec!(103)),
            (d(1), dec!(101)),
            (d(2), dec!(102)),
            (d(4), dec!(104)),
        ]);
        let dates: Vec<_> = path.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(1), d(2), d(3), d(4)]);

        let window: Vec<_> = path.between(d(2), d(3)).map(|p| p.price).collect();
        assert_eq!(window, vec![dec!(102), dec!(103)]);
    }

    #[test]
    fn test_deserialized_price_path_is_sorted() {
        let json = r#"[
            {"date": "2024-01-03", "price": "103"},
            {"date": "2024-01-01", "price": "101"},
            {"date": "2024-01-02", "price": "102"}
        ]"#;
        let path: PricePath = serde_json::from_str(json).unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();

        let window: Vec<_> = path.between(d(1), d(2)).map(|p| p.price).collect();
        assert_eq!(window, vec![dec!(101), dec!(102)]);

        let again: PricePath = serde_json::from_str(&serde_json::to_string(&path).unwrap()).unwrap();
        assert_eq!(again, path);
    }
}
