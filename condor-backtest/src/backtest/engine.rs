//! Day-stepped iron condor simulator.
//!
//! Walks the price path from entry to expiration. On each sample the exit
//! rules are checked in fixed priority order:
//! 1. Earnings proximity (fixed exit cost)
//! 2. Minimum DTE (fixed exit cost)
//! 3. Profit target, then stop loss (heuristic position value)
//!
//! If nothing fires, the position is settled at expiration on intrinsic value.

use std::sync::Arc;

use chrono::NaiveDate;
use rayon::prelude::*;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use super::exit::{ExitConfig, ValuationConstants};
use super::trade::{ExitReason, TradeOutcome};
use crate::data::PricePath;
use crate::earnings::{earnings_in_window, parse_earnings_date};
use crate::strategy::IronCondor;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    #[error("No price samples between entry {entry} and expiration {expiration}")]
    EmptyPricePath {
        entry: NaiveDate,
        expiration: NaiveDate,
    },

    #[error("Sampling error: {0}")]
    Sampling(String),
}

/// Position lifecycle inside one simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PositionState {
    Open,
    Closed {
        date: NaiveDate,
        reason: ExitReason,
        cost: Decimal,
    },
}

/// One unit of batch work.
#[derive(Debug, Clone)]
pub struct BacktestJob {
    pub condor: IronCondor,
    pub entry_date: NaiveDate,
    pub price_path: Arc<PricePath>,
    /// Raw `YYYY-MM-DD` earnings date, if any.
    pub earnings_date: Option<String>,
}

/// Simulates condors under one exit configuration.
#[derive(Debug, Clone, Default)]
pub struct CondorSimulator {
    exit: ExitConfig,
    valuation: ValuationConstants,
}

impl CondorSimulator {
    pub fn new(exit: ExitConfig, valuation: ValuationConstants) -> Self {
        Self { exit, valuation }
    }

    pub fn exit_config(&self) -> &ExitConfig {
        &self.exit
    }

    /// Simulate one condor from `entry_date`.
    ///
    /// A malformed earnings date is logged and treated as absent.
    pub fn simulate(
        &self,
        condor: &IronCondor,
        entry_date: NaiveDate,
        path: &PricePath,
        earnings_date: Option<&str>,
    ) -> Result<TradeOutcome, SimulationError> {
        let expiration = condor.expiration();
        let earnings = earnings_date.and_then(parse_earnings_date);
        let entry_credit = condor.net_credit();
        let max_profit = condor.max_profit();
        let max_loss = condor.max_loss();
        let initial_dte = (expiration - entry_date).num_days();

        let mut state = PositionState::Open;
        let mut last_price = None;

        for point in path.between(entry_date, expiration) {
            last_price = Some(point.price);
            let dte = (expiration - point.date).num_days();

            if let Some((reason, cost)) =
                self.check_exit(condor, point.price, point.date, dte, initial_dte, earnings)
            {
                state = PositionState::Closed {
                    date: point.date,
                    reason,
                    cost,
                };
                break;
            }
        }

        let final_price = last_price.ok_or(SimulationError::EmptyPricePath {
            entry: entry_date,
            expiration,
        })?;

        let (exit_date, exit_reason, exit_cost) = match state {
            PositionState::Closed { date, reason, cost } => (date, reason, cost),
            PositionState::Open => (
                expiration,
                ExitReason::Expiration,
                self.expiration_value(condor, final_price),
            ),
        };

        let realized_pnl = entry_credit - exit_cost;
        let return_pct = if max_loss > Decimal::ZERO {
            let ratio: f64 = (realized_pnl / max_loss).try_into().unwrap_or(0.0);
            ratio * 100.0
        } else {
            0.0
        };

        debug!(
            condor = %condor,
            %entry_date,
            %exit_date,
            reason = exit_reason.as_str(),
            pnl = %realized_pnl,
            "Simulated trade"
        );

        Ok(TradeOutcome {
            condor: condor.clone(),
            entry_date,
            exit_date,
            exit_reason,
            entry_credit,
            exit_cost,
            realized_pnl,
            max_profit,
            max_loss,
            return_pct,
            days_held: (exit_date - entry_date).num_days(),
            is_winner: realized_pnl > Decimal::ZERO,
            had_earnings: earnings_in_window(entry_date, expiration, earnings),
        })
    }

    /// Evaluate the exit rules for one sample, in priority order.
    fn check_exit(
        &self,
        condor: &IronCondor,
        price: Decimal,
        date: NaiveDate,
        dte: i64,
        initial_dte: i64,
        earnings: Option<NaiveDate>,
    ) -> Option<(ExitReason, Decimal)> {
        let max_profit = condor.max_profit();

        if let Some(earnings) = earnings {
            let window = i64::from(self.exit.close_before_earnings_days);
            let days_to_earnings = (earnings - date).num_days();
            if window > 0 && (0..=window).contains(&days_to_earnings) {
                return Some((
                    ExitReason::Earnings,
                    max_profit * self.valuation.earnings_exit_cost_pct,
                ));
            }
        }

        if dte <= i64::from(self.exit.min_dte_to_close) {
            return Some((
                ExitReason::MinDte,
                max_profit * self.valuation.min_dte_exit_cost_pct,
            ));
        }

        let value = self.position_value(condor, price, dte, initial_dte);
        let pnl = condor.net_credit() - value;

        if let Some(target) = threshold(max_profit, self.exit.profit_target_pct) {
            if pnl >= target {
                return Some((ExitReason::ProfitTarget, value));
            }
        }

        if let Some(stop) = threshold(condor.max_loss(), self.exit.stop_loss_pct) {
            if pnl <= -stop {
                return Some((ExitReason::StopLoss, value));
            }
        }

        None
    }

    /// Heuristic value of the open position.
    ///
    /// Inside the short strikes: remaining time fraction of max profit,
    /// damped. Otherwise: breached side's intrinsic spread value, capped at
    /// max loss.
    pub fn position_value(
        &self,
        condor: &IronCondor,
        price: Decimal,
        dte: i64,
        initial_dte: i64,
    ) -> Decimal {
        if condor.is_inside(price) {
            let time_fraction = Decimal::from(dte.max(0)) / Decimal::from(initial_dte.max(1));
            return condor.max_profit() * time_fraction * self.valuation.time_value_damping;
        }

        breached_value(condor, price).min(condor.max_loss())
    }

    /// Intrinsic value at expiration.
    pub fn expiration_value(&self, condor: &IronCondor, price: Decimal) -> Decimal {
        if condor.is_inside(price) {
            Decimal::ZERO
        } else {
            breached_value(condor, price)
        }
    }

    /// Simulate many jobs in parallel. Results keep input order.
    pub fn simulate_batch(&self, jobs: &[BacktestJob]) -> Vec<Result<TradeOutcome, SimulationError>> {
        let results: Vec<_> = jobs
            .par_iter()
            .map(|job| {
                self.simulate(
                    &job.condor,
                    job.entry_date,
                    &job.price_path,
                    job.earnings_date.as_deref(),
                )
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(jobs = jobs.len(), failed, "Batch simulation complete");
        results
    }
}

fn breached_value(condor: &IronCondor, price: Decimal) -> Decimal {
    if price <= condor.short_put().strike {
        condor.put_side_intrinsic(price)
    } else {
        condor.call_side_intrinsic(price)
    }
}

/// `base * pct`, or `None` when `pct` is not finite or the product leaves
/// Decimal's range. `None` means the rule can never fire.
fn threshold(base: Decimal, pct: f64) -> Option<Decimal> {
    if !pct.is_finite() {
        return None;
    }
    Decimal::try_from(pct).ok().and_then(|p| base.checked_mul(p))
}
