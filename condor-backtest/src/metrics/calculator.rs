//! Performance metrics calculator.
//!
//! Reduces a set of simulated trade outcomes to summary statistics. Every
//! metric is zero-safe: an empty input yields an all-zero summary.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::backtest::{ExitReason, TradeOutcome};

/// Assumed number of condor trades per year (30-45 day holds).
pub const TRADES_PER_YEAR: f64 = 10.0;

/// Sortino value reported when no trade lost money.
pub const SORTINO_CAP: f64 = 10.0;

/// Summary statistics over a set of trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    // Counts
    pub total_trades: usize,
    pub winners: usize,
    pub losers: usize,
    /// Percentage of winning trades (0-100).
    pub win_rate: f64,

    // Returns, percent of max loss
    pub avg_return_pct: f64,
    pub avg_winner_pct: f64,
    pub avg_loser_pct: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,

    // P&L, per share
    pub total_pnl: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    /// Gross profit / gross loss; 0 when there are no losses.
    pub profit_factor: f64,

    // Risk
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,

    pub avg_days_held: f64,
    pub exit_reasons: BTreeMap<ExitReason, usize>,
}

impl Default for PerformanceSummary {
    fn default() -> Self {
        Self {
            total_trades: 0,
            winners: 0,
            losers: 0,
            win_rate: 0.0,
            avg_return_pct: 0.0,
            avg_winner_pct: 0.0,
            avg_loser_pct: 0.0,
            best_trade_pct: 0.0,
            worst_trade_pct: 0.0,
            total_pnl: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            profit_factor: 0.0,
            max_drawdown_pct: 0.0,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            avg_days_held: 0.0,
            exit_reasons: BTreeMap::new(),
        }
    }
}

impl PerformanceSummary {
    pub fn exit_count(&self, reason: ExitReason) -> usize {
        self.exit_reasons.get(&reason).copied().unwrap_or(0)
    }

    /// Generate a summary report.
    pub fn summary(&self) -> String {
        let exits = ExitReason::ALL
            .iter()
            .map(|r| format!("{}: {}", r, self.exit_count(*r)))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "Performance Summary\n\
             ====================\n\
             \n\
             Trades: {} (W: {}, L: {})\n\
             Win Rate: {:.1}%\n\
             Profit Factor: {:.2}\n\
             \n\
             Total P&L: ${:.2}\n\
             Avg Return: {:.2}%\n\
             Avg Winner: {:.2}%\n\
             Avg Loser: {:.2}%\n\
             Best Trade: {:.2}%\n\
             Worst Trade: {:.2}%\n\
             \n\
             Max Drawdown: {:.2}%\n\
             Sharpe Ratio: {:.2}\n\
             Sortino Ratio: {:.2}\n\
             \n\
             Avg Days Held: {:.1}\n\
             Exits: {}",
            self.total_trades,
            self.winners,
            self.losers,
            self.win_rate,
            self.profit_factor,
            self.total_pnl,
            self.avg_return_pct,
            self.avg_winner_pct,
            self.avg_loser_pct,
            self.best_trade_pct,
            self.worst_trade_pct,
            self.max_drawdown_pct,
            self.sharpe_ratio,
            self.sortino_ratio,
            self.avg_days_held,
            exits
        )
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate all metrics from a set of outcomes.
    pub fn calculate(outcomes: &[TradeOutcome]) -> PerformanceSummary {
        if outcomes.is_empty() {
            return PerformanceSummary::default();
        }

        // Basic counts
        let total_trades = outcomes.len();
        let winners = outcomes.iter().filter(|o| o.is_winner).count();
        let losers = total_trades - winners;
        let win_rate = winners as f64 / total_trades as f64 * 100.0;

        // Returns
        let returns: Vec<f64> = outcomes.iter().map(|o| o.return_pct).collect();
        let winner_returns: Vec<f64> = outcomes
            .iter()
            .filter(|o| o.is_winner)
            .map(|o| o.return_pct)
            .collect();
        let loser_returns: Vec<f64> = outcomes
            .iter()
            .filter(|o| !o.is_winner)
            .map(|o| o.return_pct)
            .collect();

        let best_trade_pct = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let worst_trade_pct = returns.iter().copied().fold(f64::INFINITY, f64::min);

        // P&L
        let total_pnl: Decimal = outcomes.iter().map(|o| o.realized_pnl).sum();
        let gross_profit: Decimal = outcomes
            .iter()
            .filter(|o| o.is_winner)
            .map(|o| o.realized_pnl)
            .sum();
        let gross_loss: Decimal = outcomes
            .iter()
            .filter(|o| !o.is_winner)
            .map(|o| o.realized_pnl)
            .sum::<Decimal>()
            .abs();

        let mut exit_reasons = BTreeMap::new();
        for outcome in outcomes {
            *exit_reasons.entry(outcome.exit_reason).or_insert(0) += 1;
        }

        let avg_days_held =
            outcomes.iter().map(|o| o.days_held as f64).sum::<f64>() / total_trades as f64;

        PerformanceSummary {
            total_trades,
            winners,
            losers,
            win_rate,
            avg_return_pct: mean(&returns),
            avg_winner_pct: mean(&winner_returns),
            avg_loser_pct: mean(&loser_returns),
            best_trade_pct,
            worst_trade_pct,
            total_pnl,
            gross_profit,
            gross_loss,
            profit_factor: Self::calculate_profit_factor(gross_profit, gross_loss),
            max_drawdown_pct: Self::calculate_max_drawdown(outcomes),
            sharpe_ratio: Self::calculate_sharpe(&returns, 0.0),
            sortino_ratio: Self::calculate_sortino(&returns, 0.0),
            avg_days_held,
            exit_reasons,
        }
    }

    /// Gross profit over gross loss, 0 when nothing lost.
    pub fn calculate_profit_factor(gross_profit: Decimal, gross_loss: Decimal) -> f64 {
        let loss: f64 = gross_loss.abs().try_into().unwrap_or(0.0);
        if loss == 0.0 {
            return 0.0;
        }
        let profit: f64 = gross_profit.try_into().unwrap_or(0.0);
        profit / loss
    }

    /// Largest fall of cumulative P&L from its running peak, in percent of
    /// the peak. Trades are replayed in exit-date order; drawdown only
    /// counts once cumulative P&L has been positive.
    pub fn calculate_max_drawdown(outcomes: &[TradeOutcome]) -> f64 {
        let mut ordered: Vec<&TradeOutcome> = outcomes.iter().collect();
        ordered.sort_by_key(|o| o.exit_date);

        let mut cumulative = 0.0;
        let mut peak = 0.0;
        let mut max_dd: f64 = 0.0;

        for outcome in ordered {
            cumulative += outcome.pnl_f64();
            if cumulative > peak {
                peak = cumulative;
            }
            if peak > 0.0 {
                max_dd = max_dd.max((peak - cumulative) / peak * 100.0);
            }
        }

        max_dd
    }

    /// Annualized Sharpe ratio of per-trade returns (sample std).
    pub fn calculate_sharpe(returns: &[f64], risk_free: f64) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let avg = mean(returns);
        let variance =
            returns.iter().map(|r| (r - avg).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
        let std_dev = variance.sqrt();

        if std_dev == 0.0 {
            return 0.0;
        }

        (avg - risk_free) / std_dev * TRADES_PER_YEAR.sqrt()
    }

    /// Annualized Sortino ratio. Downside deviation is the population std
    /// of the negative returns around zero.
    pub fn calculate_sortino(returns: &[f64], risk_free: f64) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
        if downside.is_empty() {
            return SORTINO_CAP;
        }

        let downside_std =
            (downside.iter().map(|r| r.powi(2)).sum::<f64>() / downside.len() as f64).sqrt();
        if downside_std == 0.0 {
            return SORTINO_CAP;
        }

        (mean(returns) - risk_free) / downside_std * TRADES_PER_YEAR.sqrt()
    }
}
