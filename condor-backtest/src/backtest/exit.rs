//! Exit thresholds and the valuation heuristics used by the simulator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exit thresholds for one backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    /// Close when P&L reaches this fraction of max profit (0.50 = 50%).
    pub profit_target_pct: f64,

    /// Close when the loss reaches this fraction of max loss (1.0 = 100%).
    pub stop_loss_pct: f64,

    /// Close once days to expiration fall to this value. Negative disables.
    pub min_dte_to_close: i32,

    /// Close this many days before earnings. Zero disables.
    pub close_before_earnings_days: i32,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            profit_target_pct: 0.50,
            stop_loss_pct: 1.0,
            min_dte_to_close: 21,
            close_before_earnings_days: 3,
        }
    }
}

/// Approximations standing in for live quotes during simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConstants {
    /// Share of max profit still held as time value while inside the shorts,
    /// scaled by remaining DTE fraction.
    pub time_value_damping: Decimal,

    /// Exit cost on a min-DTE close, as a fraction of max profit.
    pub min_dte_exit_cost_pct: Decimal,

    /// Exit cost on an earnings close, as a fraction of max profit.
    pub earnings_exit_cost_pct: Decimal,
}

impl Default for ValuationConstants {
    fn default() -> Self {
        Self {
            time_value_damping: Decimal::new(3, 1),
            min_dte_exit_cost_pct: Decimal::new(25, 2),
            earnings_exit_cost_pct: Decimal::new(30, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let exit = ExitConfig::default();
        assert_eq!(exit.profit_target_pct, 0.50);
        assert_eq!(exit.stop_loss_pct, 1.0);
        assert_eq!(exit.min_dte_to_close, 21);
        assert_eq!(exit.close_before_earnings_days, 3);

        let valuation = ValuationConstants::default();
        assert_eq!(valuation.time_value_damping, dec!(0.3));
        assert_eq!(valuation.min_dte_exit_cost_pct, dec!(0.25));
        assert_eq!(valuation.earnings_exit_cost_pct, dec!(0.30));
    }
}
