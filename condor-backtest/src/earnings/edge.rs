//! Earnings-edge analysis.
//!
//! Splits simulated trades into those that held through an earnings
//! announcement ("pre-earnings") and the rest ("post-earnings"), summarizes
//! each group, and runs a Welch two-sample t-test on per-trade returns.
//!
//! Differences are always reported as post minus pre.

use std::fmt;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::{info, warn};

use crate::backtest::TradeOutcome;
use crate::metrics::{MetricsCalculator, PerformanceSummary};

/// Minimum trades per group before the test is run.
pub const MIN_TRADES_PER_GROUP: usize = 10;

/// Two-tailed significance threshold.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// How the p-value is derived from the t-statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PValueMethod {
    /// Fixed bands on |t|; normal approximation above 30 degrees of freedom.
    #[default]
    LookupBands,
    /// Exact two-tailed Student-t tail probability.
    StudentT,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceConfig {
    pub method: PValueMethod,
}

/// Result of a Welch t-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificanceTest {
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
    pub is_significant: bool,
}

/// Two-tailed p-value from fixed |t| bands.
pub fn lookup_p_value(t_statistic: f64, degrees_of_freedom: f64) -> f64 {
    let t = t_statistic.abs();
    if degrees_of_freedom > 30.0 {
        match t {
            t if t > 3.0 => 0.0027,
            t if t > 2.5 => 0.0124,
            t if t > 2.0 => 0.0455,
            t if t > 1.96 => 0.05,
            t if t > 1.5 => 0.1336,
            t if t > 1.0 => 0.3173,
            _ => 0.5,
        }
    } else {
        // Coarser and conservative for small samples
        match t {
            t if t > 2.5 => 0.02,
            t if t > 2.0 => 0.06,
            t if t > 1.5 => 0.15,
            _ => 0.5,
        }
    }
}

/// Two-tailed p-value from the Student-t distribution.
///
/// Falls back to the lookup bands if the distribution cannot be built.
pub fn student_t_p_value(t_statistic: f64, degrees_of_freedom: f64) -> f64 {
    match StudentsT::new(0.0, 1.0, degrees_of_freedom) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t_statistic.abs()))).clamp(0.0, 1.0),
        Err(e) => {
            warn!(degrees_of_freedom, error = %e, "Falling back to p-value bands");
            lookup_p_value(t_statistic, degrees_of_freedom)
        }
    }
}

fn mean_and_variance(sample: &[f64]) -> (f64, f64) {
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let variance = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance)
}

/// Welch two-sample t-test of `sample1` against `sample2`.
///
/// Returns `None` when either sample has fewer than two values or both
/// variances are zero.
pub fn welch_t_test(sample1: &[f64], sample2: &[f64], method: PValueMethod) -> Option<SignificanceTest> {
    if sample1.len() < 2 || sample2.len() < 2 {
        return None;
    }

    let n1 = sample1.len() as f64;
    let n2 = sample2.len() as f64;
    let (mean1, var1) = mean_and_variance(sample1);
    let (mean2, var2) = mean_and_variance(sample2);

    let a = var1 / n1;
    let b = var2 / n2;
    let standard_error = (a + b).sqrt();
    if standard_error == 0.0 {
        return None;
    }

    let t_statistic = (mean1 - mean2) / standard_error;
    let degrees_of_freedom = (a + b).powi(2) / (a.powi(2) / (n1 - 1.0) + b.powi(2) / (n2 - 1.0));

    let p_value = match method {
        PValueMethod::LookupBands => lookup_p_value(t_statistic, degrees_of_freedom),
        PValueMethod::StudentT => student_t_p_value(t_statistic, degrees_of_freedom),
    };

    Some(SignificanceTest {
        t_statistic,
        degrees_of_freedom,
        p_value,
        is_significant: p_value < SIGNIFICANCE_LEVEL,
    })
}

/// Outcome of the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Fewer than the minimum trades in a group.
    InsufficientData,
    /// Post-earnings trades significantly outperform.
    EdgeConfirmed,
    /// Post-earnings trades do better, not significantly.
    WeakEvidence,
    /// Pre-earnings trades significantly outperform.
    Unexpected,
    NoEdge,
}

impl Recommendation {
    pub fn decide(
        pre: &PerformanceSummary,
        post: &PerformanceSummary,
        is_significant: bool,
    ) -> Self {
        if pre.total_trades < MIN_TRADES_PER_GROUP || post.total_trades < MIN_TRADES_PER_GROUP {
            return Self::InsufficientData;
        }

        let post_better = post.avg_return_pct > pre.avg_return_pct;
        let pre_better = pre.avg_return_pct > post.avg_return_pct;

        match (is_significant, post_better, pre_better) {
            (true, true, _) => Self::EdgeConfirmed,
            (false, true, _) => Self::WeakEvidence,
            (true, _, true) => Self::Unexpected,
            _ => Self::NoEdge,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            Self::InsufficientData => "INSUFFICIENT DATA",
            Self::EdgeConfirmed => "EARNINGS EDGE CONFIRMED",
            Self::WeakEvidence => "WEAK EVIDENCE",
            Self::Unexpected => "UNEXPECTED",
            Self::NoEdge => "NO EARNINGS EDGE",
        }
    }
}

/// Pre- versus post-earnings comparison.
#[derive(Debug, Clone, Serialize)]
pub struct EarningsComparison {
    pub pre_earnings: PerformanceSummary,
    pub post_earnings: PerformanceSummary,

    pub win_rate_diff: f64,
    pub avg_return_diff: f64,
    pub sharpe_diff: f64,

    /// Present only when the test ran.
    pub significance: Option<SignificanceTest>,
    pub is_significant: bool,
    /// 1.0 when the test did not run.
    pub p_value: f64,

    pub recommendation: Recommendation,
}

impl EarningsComparison {
    pub fn total_trades(&self) -> usize {
        self.pre_earnings.total_trades + self.post_earnings.total_trades
    }

    /// Human-readable recommendation.
    pub fn recommendation_message(&self) -> String {
        let headline = self.recommendation.headline();
        let p = self.p_value;
        match self.recommendation {
            Recommendation::InsufficientData if self.total_trades() == 0 => {
                format!("{}: Not enough trades to analyze earnings edge.", headline)
            }
            Recommendation::InsufficientData => format!(
                "{}: Need at least {} trades in each group for reliable analysis.",
                headline, MIN_TRADES_PER_GROUP
            ),
            Recommendation::EdgeConfirmed => format!(
                "{}: Post-earnings setups significantly outperform (p={:.4}). \
                 Avoid pre-earnings setups. Win rate improvement: {:+.1}%, \
                 return improvement: {:+.2}%.",
                headline, p, self.win_rate_diff, self.avg_return_diff
            ),
            Recommendation::WeakEvidence => format!(
                "{}: Post-earnings setups show better returns but the difference \
                 is not statistically significant (p={:.4}). Collect more data \
                 before drawing conclusions; conservatively avoid pre-earnings setups.",
                headline, p
            ),
            Recommendation::Unexpected => format!(
                "{}: Pre-earnings setups significantly outperform (p={:.4}). \
                 Check data quality and market regime before trusting this.",
                headline, p
            ),
            Recommendation::NoEdge => format!(
                "{}: No significant difference between pre-earnings and \
                 post-earnings setups (p={:.4}).",
                headline, p
            ),
        }
    }
}

impl fmt::Display for EarningsComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pre={} post={} win_rate_diff={:+.1}% return_diff={:+.2}% p={:.4} -> {}",
            self.pre_earnings.total_trades,
            self.post_earnings.total_trades,
            self.win_rate_diff,
            self.avg_return_diff,
            self.p_value,
            self.recommendation.headline()
        )
    }
}

/// Compares trades that held through earnings against the rest.
#[derive(Debug, Clone, Default)]
pub struct EarningsEdgeAnalyzer {
    config: SignificanceConfig,
}

impl EarningsEdgeAnalyzer {
    pub fn new(config: SignificanceConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, outcomes: &[TradeOutcome]) -> EarningsComparison {
        let (pre, post): (Vec<TradeOutcome>, Vec<TradeOutcome>) =
            outcomes.iter().cloned().partition(|o| o.had_earnings);

        let pre_earnings = MetricsCalculator::calculate(&pre);
        let post_earnings = MetricsCalculator::calculate(&post);

        let sufficient =
            pre.len() >= MIN_TRADES_PER_GROUP && post.len() >= MIN_TRADES_PER_GROUP;

        let significance = if sufficient {
            let post_returns: Vec<f64> = post.iter().map(|o| o.return_pct).collect();
            let pre_returns: Vec<f64> = pre.iter().map(|o| o.return_pct).collect();
            welch_t_test(&post_returns, &pre_returns, self.config.method)
        } else {
            info!(
                pre = pre.len(),
                post = post.len(),
                min = MIN_TRADES_PER_GROUP,
                "Skipping significance test"
            );
            None
        };

        let is_significant = significance.is_some_and(|s| s.is_significant);
        let p_value = significance.map_or(1.0, |s| s.p_value);
        let recommendation = Recommendation::decide(&pre_earnings, &post_earnings, is_significant);

        let comparison = EarningsComparison {
            win_rate_diff: post_earnings.win_rate - pre_earnings.win_rate,
            avg_return_diff: post_earnings.avg_return_pct - pre_earnings.avg_return_pct,
            sharpe_diff: post_earnings.sharpe_ratio - pre_earnings.sharpe_ratio,
            pre_earnings,
            post_earnings,
            significance,
            is_significant,
            p_value,
            recommendation,
        };

        info!(%comparison, "Earnings edge analysis complete");
        comparison
    }
}
