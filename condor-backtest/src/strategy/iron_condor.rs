//! Validated four-leg iron condor.
//!
//! An iron condor is a bull put spread plus a bear call spread on the same
//! underlying and expiration:
//! - short put / long put below the market
//! - short call / long call above the market
//!
//! Structural invariants are checked once in [`IronCondor::new`]. Every
//! financial quantity is derived from the leg prices on demand.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::data::{Contract, OptionType};

/// Widths closer than this are considered symmetric.
const SYMMETRY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Structural errors raised when four legs cannot form an iron condor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpreadError {
    #[error("All legs must share a ticker (found {0})")]
    TickerMismatch(String),

    #[error("All legs must share an expiration (found {0})")]
    ExpirationMismatch(String),

    #[error("{leg} must be a {expected}")]
    WrongOptionType {
        leg: &'static str,
        expected: &'static str,
    },

    #[error("Short put strike ({short}) must be above long put strike ({long})")]
    InvertedPutStrikes { short: Decimal, long: Decimal },

    #[error("Short call strike ({short}) must be below long call strike ({long})")]
    InvertedCallStrikes { short: Decimal, long: Decimal },

    #[error("Short call strike ({call}) must be above short put strike ({put})")]
    OverlappingShorts { put: Decimal, call: Decimal },
}

/// Why a structurally valid (or attempted) candidate was dropped.
///
/// These are routine outcomes of scanning a chain, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateRejection {
    /// No long put within strike tolerance of the target.
    NoLongPut,
    /// No long call within strike tolerance of the target.
    NoLongCall,
    /// Legs could not form a valid condor.
    InvalidStructure,
    /// Net credit is zero or negative.
    NonPositiveCredit,
    /// Max loss is zero or negative.
    NonPositiveMaxLoss,
    /// Max profit reaches a wing width.
    CreditExceedsWidth,
    /// Wings differ while asymmetric condors are disallowed.
    Asymmetric,
    /// Max loss above the configured cap.
    MaxLossAboveCap,
}

impl CandidateRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoLongPut => "no_long_put",
            Self::NoLongCall => "no_long_call",
            Self::InvalidStructure => "invalid_structure",
            Self::NonPositiveCredit => "non_positive_credit",
            Self::NonPositiveMaxLoss => "non_positive_max_loss",
            Self::CreditExceedsWidth => "credit_exceeds_width",
            Self::Asymmetric => "asymmetric",
            Self::MaxLossAboveCap => "max_loss_above_cap",
        }
    }
}

/// Iron condor built from four shared contracts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IronCondor {
    short_put: Arc<Contract>,
    long_put: Arc<Contract>,
    short_call: Arc<Contract>,
    long_call: Arc<Contract>,
}

impl IronCondor {
    /// Validate and assemble the four legs.
    pub fn new(
        short_put: Arc<Contract>,
        long_put: Arc<Contract>,
        short_call: Arc<Contract>,
        long_call: Arc<Contract>,
    ) -> Result<Self, SpreadError> {
        let legs = [&short_put, &long_put, &short_call, &long_call];

        if legs.iter().any(|c| c.ticker != short_put.ticker) {
            let tickers: Vec<&str> = legs.iter().map(|c| c.ticker.as_str()).collect();
            return Err(SpreadError::TickerMismatch(tickers.join(", ")));
        }

        if legs.iter().any(|c| c.expiration != short_put.expiration) {
            let expirations: Vec<String> =
                legs.iter().map(|c| c.expiration.to_string()).collect();
            return Err(SpreadError::ExpirationMismatch(expirations.join(", ")));
        }

        for (leg, contract, expected) in [
            ("short put", &short_put, OptionType::Put),
            ("long put", &long_put, OptionType::Put),
            ("short call", &short_call, OptionType::Call),
            ("long call", &long_call, OptionType::Call),
        ] {
            if contract.option_type != expected {
                return Err(SpreadError::WrongOptionType {
                    leg,
                    expected: expected.as_str(),
                });
            }
        }

        if short_put.strike <= long_put.strike {
            return Err(SpreadError::InvertedPutStrikes {
                short: short_put.strike,
                long: long_put.strike,
            });
        }

        if short_call.strike >= long_call.strike {
            return Err(SpreadError::InvertedCallStrikes {
                short: short_call.strike,
                long: long_call.strike,
            });
        }

        if short_call.strike <= short_put.strike {
            return Err(SpreadError::OverlappingShorts {
                put: short_put.strike,
                call: short_call.strike,
            });
        }

        Ok(Self {
            short_put,
            long_put,
            short_call,
            long_call,
        })
    }

    pub fn short_put(&self) -> &Contract {
        &self.short_put
    }

    pub fn long_put(&self) -> &Contract {
        &self.long_put
    }

    pub fn short_call(&self) -> &Contract {
        &self.short_call
    }

    pub fn long_call(&self) -> &Contract {
        &self.long_call
    }

    pub fn ticker(&self) -> &str {
        &self.short_put.ticker
    }

    pub fn expiration(&self) -> NaiveDate {
        self.short_put.expiration
    }

    /// Days to expiration at `as_of`.
    pub fn entry_dte(&self, as_of: NaiveDate) -> i32 {
        self.short_put.dte(as_of)
    }

    /// Net credit at mid prices for the whole structure.
    pub fn net_credit(&self) -> Decimal {
        let put_credit = self.short_put.mid() - self.long_put.mid();
        let call_credit = self.short_call.mid() - self.long_call.mid();
        put_credit + call_credit
    }

    pub fn max_profit(&self) -> Decimal {
        self.net_credit()
    }

    pub fn put_side_width(&self) -> Decimal {
        self.short_put.strike - self.long_put.strike
    }

    pub fn call_side_width(&self) -> Decimal {
        self.long_call.strike - self.short_call.strike
    }

    pub fn max_loss_put_side(&self) -> Decimal {
        self.put_side_width() - self.net_credit()
    }

    pub fn max_loss_call_side(&self) -> Decimal {
        self.call_side_width() - self.net_credit()
    }

    /// Worst case at expiration; only one side can be breached.
    pub fn max_loss(&self) -> Decimal {
        self.max_loss_put_side().max(self.max_loss_call_side())
    }

    /// Max profit over max loss, in percent. Zero when max loss is not positive.
    pub fn return_on_risk(&self) -> f64 {
        let max_loss = self.max_loss();
        if max_loss <= Decimal::ZERO {
            return 0.0;
        }
        let ratio: f64 = (self.max_profit() / max_loss).try_into().unwrap_or(0.0);
        ratio * 100.0
    }

    pub fn put_breakeven(&self) -> Decimal {
        self.short_put.strike - self.net_credit()
    }

    pub fn call_breakeven(&self) -> Decimal {
        self.short_call.strike + self.net_credit()
    }

    pub fn is_symmetric(&self) -> bool {
        (self.put_side_width() - self.call_side_width()).abs() < SYMMETRY_TOLERANCE
    }

    /// Reason this condor is not a tradable credit structure, if any.
    pub fn rejection(&self) -> Option<CandidateRejection> {
        let max_profit = self.max_profit();
        if self.net_credit() <= Decimal::ZERO {
            Some(CandidateRejection::NonPositiveCredit)
        } else if self.max_loss() <= Decimal::ZERO {
            Some(CandidateRejection::NonPositiveMaxLoss)
        } else if max_profit >= self.put_side_width() || max_profit >= self.call_side_width() {
            Some(CandidateRejection::CreditExceedsWidth)
        } else {
            None
        }
    }

    /// Current value of one side given the underlying price, from intrinsic
    /// values only.
    pub fn put_side_intrinsic(&self, price: Decimal) -> Decimal {
        let short = (self.short_put.strike - price).max(Decimal::ZERO);
        let long = (self.long_put.strike - price).max(Decimal::ZERO);
        (short - long).max(Decimal::ZERO)
    }

    pub fn call_side_intrinsic(&self, price: Decimal) -> Decimal {
        let short = (price - self.short_call.strike).max(Decimal::ZERO);
        let long = (price - self.long_call.strike).max(Decimal::ZERO);
        (short - long).max(Decimal::ZERO)
    }

    /// Whether `price` lies strictly between the short strikes.
    pub fn is_inside(&self, price: Decimal) -> bool {
        price > self.short_put.strike && price < self.short_call.strike
    }
}

impl fmt::Display for IronCondor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} P[{}/{}] C[{}/{}] credit={:.2}",
            self.ticker(),
            self.expiration(),
            self.long_put.strike.normalize(),
            self.short_put.strike.normalize(),
            self.short_call.strike.normalize(),
            self.long_call.strike.normalize(),
            self.net_credit()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn leg(strike: Decimal, option_type: OptionType, mid: Decimal, delta: f64) -> Arc<Contract> {
        Arc::new(Contract {
            ticker: "SPY".to_string(),
            strike,
            expiration: NaiveDate::from_ymd_opt(2024, 2, 16).unwrap(),
            option_type,
            bid: mid - dec!(0.05),
            ask: mid + dec!(0.05),
            volume: 1000,
            open_interest: 5000,
            delta,
            implied_vol: 0.18,
            last: None,
            gamma: None,
            theta: None,
            vega: None,
        })
    }

    fn condor_with_mids(sp: Decimal, lp: Decimal, sc: Decimal, lc: Decimal) -> IronCondor {
        IronCondor::new(
            leg(dec!(545), OptionType::Put, sp, -0.20),
            leg(dec!(540), OptionType::Put, lp, -0.12),
            leg(dec!(575), OptionType::Call, sc, 0.20),
            leg(dec!(580), OptionType::Call, lc, 0.12),
        )
        .unwrap()
    }

    #[test]
    fn test_derived_quantities() {
        // 2.5 + 2.5 - 0.5 - 0.5 = 4.00 credit on 5-wide wings
        let condor = condor_with_mids(dec!(2.50), dec!(0.50), dec!(2.50), dec!(0.50));

        assert_eq!(condor.net_credit(), dec!(4.00));
        assert_eq!(condor.max_profit(), dec!(4.00));
        assert_eq!(condor.put_side_width(), dec!(5));
        assert_eq!(condor.call_side_width(), dec!(5));
        assert_eq!(condor.max_loss(), dec!(1.00));
        assert!((condor.return_on_risk() - 400.0).abs() < 1e-9);
        assert_eq!(condor.put_breakeven(), dec!(541.00));
        assert_eq!(condor.call_breakeven(), dec!(579.00));
        assert!(condor.is_symmetric());
        assert_eq!(condor.rejection(), None);
        assert_eq!(
            condor.to_string(),
            "SPY 2024-02-16 P[540/545] C[575/580] credit=4.00"
        );
    }

    #[test]
    fn test_entry_dte() {
        let condor = condor_with_mids(dec!(2.50), dec!(0.50), dec!(2.50), dec!(0.50));
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        assert_eq!(condor.entry_dte(as_of), 35);
    }

    #[test]
    fn test_rejections() {
        let debit = condor_with_mids(dec!(0.50), dec!(1.00), dec!(0.50), dec!(1.00));
        assert_eq!(debit.rejection(), Some(CandidateRejection::NonPositiveCredit));

        // Credit equal to the width leaves no risk.
        let riskless = condor_with_mids(dec!(3.00), dec!(0.50), dec!(3.00), dec!(0.50));
        assert_eq!(riskless.net_credit(), dec!(5.00));
        assert_eq!(riskless.rejection(), Some(CandidateRejection::NonPositiveMaxLoss));
    }

    #[test]
    fn test_mismatched_ticker_is_fatal() {
        let mut other = (*leg(dec!(575), OptionType::Call, dec!(1), 0.2)).clone();
        other.ticker = "QQQ".to_string();
        let result = IronCondor::new(
            leg(dec!(545), OptionType::Put, dec!(1), -0.2),
            leg(dec!(540), OptionType::Put, dec!(0.5), -0.1),
            Arc::new(other),
            leg(dec!(580), OptionType::Call, dec!(0.5), 0.1),
        );
        assert!(matches!(result, Err(SpreadError::TickerMismatch(_))));
    }

    #[test]
    fn test_mismatched_expiration_is_fatal() {
        let mut other = (*leg(dec!(580), OptionType::Call, dec!(0.5), 0.1)).clone();
        other.expiration = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let result = IronCondor::new(
            leg(dec!(545), OptionType::Put, dec!(1), -0.2),
            leg(dec!(540), OptionType::Put, dec!(0.5), -0.1),
            leg(dec!(575), OptionType::Call, dec!(1), 0.2),
            Arc::new(other),
        );
        assert!(matches!(result, Err(SpreadError::ExpirationMismatch(_))));
    }

    #[test]
    fn test_wrong_types_and_strike_order() {
        let put = |k| leg(k, OptionType::Put, dec!(1), -0.2);
        let call = |k| leg(k, OptionType::Call, dec!(1), 0.2);

        assert_eq!(
            IronCondor::new(call(dec!(545)), put(dec!(540)), call(dec!(575)), call(dec!(580))),
            Err(SpreadError::WrongOptionType {
                leg: "short put",
                expected: "put"
            })
        );
        assert!(matches!(
            IronCondor::new(put(dec!(540)), put(dec!(545)), call(dec!(575)), call(dec!(580))),
            Err(SpreadError::InvertedPutStrikes { .. })
        ));
        assert!(matches!(
            IronCondor::new(put(dec!(545)), put(dec!(540)), call(dec!(580)), call(dec!(575))),
            Err(SpreadError::InvertedCallStrikes { .. })
        ));
        assert!(matches!(
            IronCondor::new(put(dec!(545)), put(dec!(540)), call(dec!(545)), call(dec!(550))),
            Err(SpreadError::OverlappingShorts { .. })
        ));
    }

    #[test]
    fn test_intrinsic_values() {
        let condor = condor_with_mids(dec!(2.50), dec!(0.50), dec!(2.50), dec!(0.50));
        assert!(condor.is_inside(dec!(560)));
        assert!(!condor.is_inside(dec!(545)));
        assert_eq!(condor.put_side_intrinsic(dec!(543)), dec!(2));
        assert_eq!(condor.put_side_intrinsic(dec!(530)), dec!(5));
        assert_eq!(condor.call_side_intrinsic(dec!(577)), dec!(2));
        assert_eq!(condor.call_side_intrinsic(dec!(560)), dec!(0));
    }
}
