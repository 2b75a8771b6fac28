//! Markdown report for an earnings-edge comparison.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use tracing::info;

use super::calendar::PRE_EARNINGS_WINDOW_DAYS;
use super::edge::{EarningsComparison, MIN_TRADES_PER_GROUP, SIGNIFICANCE_LEVEL};
use crate::backtest::{ExitConfig, ExitReason, TradeOutcome};
use crate::metrics::PerformanceSummary;

/// Renders a comparison and its trades as markdown via `Display`.
pub struct EdgeReport<'a> {
    pub comparison: &'a EarningsComparison,
    pub outcomes: &'a [TradeOutcome],
    pub exit: &'a ExitConfig,
    /// Free-form generation stamp shown in the header.
    pub generated_at: String,
}

impl<'a> EdgeReport<'a> {
    pub fn new(
        comparison: &'a EarningsComparison,
        outcomes: &'a [TradeOutcome],
        exit: &'a ExitConfig,
        generated_at: impl Into<String>,
    ) -> Self {
        Self {
            comparison,
            outcomes,
            exit,
            generated_at: generated_at.into(),
        }
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_string())?;
        info!(path = %path.display(), "Earnings edge report written");
        Ok(())
    }
}

fn better(post_wins: bool) -> &'static str {
    if post_wins {
        "Post"
    } else {
        "Pre"
    }
}

fn write_metrics_table(f: &mut fmt::Formatter<'_>, m: &PerformanceSummary) -> fmt::Result {
    writeln!(f, "| Metric | Value |")?;
    writeln!(f, "|--------|-------|")?;
    writeln!(f, "| Total Trades | {} |", m.total_trades)?;
    writeln!(
        f,
        "| Win Rate | {:.1}% ({}W / {}L) |",
        m.win_rate, m.winners, m.losers
    )?;
    writeln!(f, "| Avg Return | {:.2}% |", m.avg_return_pct)?;
    writeln!(f, "| Avg Winner | {:.2}% |", m.avg_winner_pct)?;
    writeln!(f, "| Avg Loser | {:.2}% |", m.avg_loser_pct)?;
    writeln!(f, "| Total P&L | ${:.2} |", m.total_pnl)?;
    writeln!(f, "| Sharpe Ratio | {:.2} |", m.sharpe_ratio)?;
    writeln!(f, "| Sortino Ratio | {:.2} |", m.sortino_ratio)?;
    writeln!(f, "| Max Drawdown | {:.1}% |", m.max_drawdown_pct)?;
    writeln!(f, "| Profit Factor | {:.2} |", m.profit_factor)?;
    writeln!(f, "| Best Trade | {:.2}% |", m.best_trade_pct)?;
    writeln!(f, "| Worst Trade | {:.2}% |", m.worst_trade_pct)?;
    writeln!(f, "| Avg Days Held | {:.1} days |", m.avg_days_held)
}

fn sample_size_note(pre: usize, post: usize) -> &'static str {
    let smaller = pre.min(post);
    if smaller >= 50 {
        "GOOD: both groups have at least 50 trades."
    } else if smaller >= 30 {
        "MODERATE: both groups have 30-49 trades; directionally useful."
    } else if smaller >= MIN_TRADES_PER_GROUP {
        "LOW: both groups have 10-29 trades; treat results as preliminary."
    } else {
        "INSUFFICIENT: at least one group has fewer than 10 trades."
    }
}

impl fmt::Display for EdgeReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.comparison;
        let pre = &c.pre_earnings;
        let post = &c.post_earnings;

        writeln!(f, "# Earnings Edge Validation Report")?;
        writeln!(f)?;
        writeln!(f, "**Generated**: {}", self.generated_at)?;
        writeln!(f, "**Total Trades Analyzed**: {}", self.outcomes.len())?;
        writeln!(f)?;

        writeln!(f, "## Executive Summary")?;
        writeln!(f)?;
        writeln!(f, "{}", c.recommendation_message())?;
        writeln!(f)?;

        writeln!(f, "## Performance Comparison")?;
        writeln!(f)?;
        writeln!(f, "### Pre-Earnings (held through earnings)")?;
        writeln!(f)?;
        write_metrics_table(f, pre)?;
        writeln!(f)?;
        writeln!(f, "### Post-Earnings (no earnings while held)")?;
        writeln!(f)?;
        write_metrics_table(f, post)?;
        writeln!(f)?;

        writeln!(f, "## Key Differences")?;
        writeln!(f)?;
        writeln!(f, "| Metric | Pre | Post | Difference | Better |")?;
        writeln!(f, "|--------|-----|------|------------|--------|")?;
        writeln!(
            f,
            "| Win Rate | {:.1}% | {:.1}% | {:+.1}% | {} |",
            pre.win_rate,
            post.win_rate,
            c.win_rate_diff,
            better(c.win_rate_diff > 0.0)
        )?;
        writeln!(
            f,
            "| Avg Return | {:.2}% | {:.2}% | {:+.2}% | {} |",
            pre.avg_return_pct,
            post.avg_return_pct,
            c.avg_return_diff,
            better(c.avg_return_diff > 0.0)
        )?;
        writeln!(
            f,
            "| Sharpe Ratio | {:.2} | {:.2} | {:+.2} | {} |",
            pre.sharpe_ratio,
            post.sharpe_ratio,
            c.sharpe_diff,
            better(c.sharpe_diff > 0.0)
        )?;
        writeln!(
            f,
            "| Max Drawdown | {:.1}% | {:.1}% | {:+.1}% | {} |",
            pre.max_drawdown_pct,
            post.max_drawdown_pct,
            post.max_drawdown_pct - pre.max_drawdown_pct,
            better(post.max_drawdown_pct < pre.max_drawdown_pct)
        )?;
        writeln!(
            f,
            "| Profit Factor | {:.2} | {:.2} | {:+.2} | {} |",
            pre.profit_factor,
            post.profit_factor,
            post.profit_factor - pre.profit_factor,
            better(post.profit_factor > pre.profit_factor)
        )?;
        writeln!(f)?;

        writeln!(f, "## Hypothesis Test")?;
        writeln!(f)?;
        writeln!(
            f,
            "- **H0**: no difference in mean return between pre- and post-earnings trades"
        )?;
        writeln!(f, "- **Test**: Welch two-sample t-test (two-tailed)")?;
        match &c.significance {
            Some(test) => {
                writeln!(f, "- **t-statistic**: {:.3}", test.t_statistic)?;
                writeln!(f, "- **Degrees of freedom**: {:.1}", test.degrees_of_freedom)?;
                writeln!(f, "- **p-value**: {:.4}", test.p_value)?;
                let verdict = if test.is_significant {
                    "REJECT H0"
                } else {
                    "FAIL TO REJECT H0"
                };
                writeln!(
                    f,
                    "- **Result**: {} at p < {:.2}",
                    verdict, SIGNIFICANCE_LEVEL
                )?;
            }
            None => {
                writeln!(f, "- **Result**: not run")?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Sample size: {}", sample_size_note(pre.total_trades, post.total_trades))?;
        writeln!(f)?;

        writeln!(f, "## Exit Reasons")?;
        writeln!(f)?;
        writeln!(f, "| Exit Reason | Count | Percentage |")?;
        writeln!(f, "|-------------|-------|------------|")?;
        let total = self.outcomes.len();
        let mut counts: Vec<(ExitReason, usize)> = ExitReason::ALL
            .iter()
            .map(|r| (*r, self.outcomes.iter().filter(|o| o.exit_reason == *r).count()))
            .filter(|(_, n)| *n > 0)
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        for (reason, count) in counts {
            let pct = count as f64 / total as f64 * 100.0;
            writeln!(f, "| {} | {} | {:.1}% |", reason, count, pct)?;
        }
        writeln!(f)?;

        writeln!(f, "## Methodology")?;
        writeln!(f)?;
        writeln!(
            f,
            "- Profit target: {:.0}% of max profit",
            self.exit.profit_target_pct * 100.0
        )?;
        writeln!(
            f,
            "- Stop loss: {:.0}% of max loss",
            self.exit.stop_loss_pct * 100.0
        )?;
        writeln!(f, "- Time exit: {} DTE", self.exit.min_dte_to_close)?;
        writeln!(
            f,
            "- Earnings exit: {} days before earnings",
            self.exit.close_before_earnings_days
        )?;
        writeln!(
            f,
            "- Screening flags expirations 0-{} days before earnings as pre-earnings",
            PRE_EARNINGS_WINDOW_DAYS
        )?;
        writeln!(
            f,
            "- Returns are a percentage of max loss; Sharpe and Sortino assume 10 trades per year"
        )
    }
}
