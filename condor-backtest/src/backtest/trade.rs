//! Simulated trade outcomes.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::strategy::IronCondor;

/// Reason a simulated position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Closed ahead of an earnings announcement.
    Earnings,
    /// Closed at the minimum-DTE threshold.
    MinDte,
    /// Hit the profit target.
    ProfitTarget,
    /// Hit the stop loss.
    StopLoss,
    /// Held to expiration.
    Expiration,
}

impl ExitReason {
    pub const ALL: [ExitReason; 5] = [
        Self::ProfitTarget,
        Self::StopLoss,
        Self::MinDte,
        Self::Earnings,
        Self::Expiration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earnings => "earnings",
            Self::MinDte => "min_dte",
            Self::ProfitTarget => "profit_target",
            Self::StopLoss => "stop_loss",
            Self::Expiration => "expiration",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of simulating one condor from entry to exit.
///
/// Money fields are per share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeOutcome {
    pub condor: IronCondor,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub exit_reason: ExitReason,

    /// Credit received at entry.
    pub entry_credit: Decimal,
    /// Cost paid to close (or value at expiration).
    pub exit_cost: Decimal,
    /// entry_credit - exit_cost
    pub realized_pnl: Decimal,
    pub max_profit: Decimal,
    pub max_loss: Decimal,

    /// Realized P&L as a percentage of max loss.
    pub return_pct: f64,
    pub days_held: i64,
    pub is_winner: bool,

    /// Earnings fell within [entry, expiration].
    pub had_earnings: bool,
}

impl TradeOutcome {
    pub fn ticker(&self) -> &str {
        self.condor.ticker()
    }

    pub fn pnl_f64(&self) -> f64 {
        self.realized_pnl.try_into().unwrap_or(0.0)
    }
}
