//! Weighted composite scoring.
//!
//! Each component is min-max normalized to [0, 1], weighted, and summed:
//! - return on risk
//! - average short-strike distance from spot
//! - liquidity (already in [0, 1])
//! - IV/RV ratio

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::analytics::CondorAnalytics;

/// Component weights; expected to sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub return_on_risk: f64,
    pub distance_from_em: f64,
    pub liquidity: f64,
    pub iv_edge: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            return_on_risk: 0.30,
            distance_from_em: 0.30,
            liquidity: 0.20,
            iv_edge: 0.20,
        }
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        self.return_on_risk + self.distance_from_em + self.liquidity + self.iv_edge
    }
}

/// Normalization bounds per component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationBounds {
    /// Return on risk, percent.
    pub ror_min: f64,
    pub ror_max: f64,
    /// Average distance from spot, percent.
    pub distance_min: f64,
    pub distance_max: f64,
    pub iv_ratio_min: f64,
    pub iv_ratio_max: f64,
}

impl Default for NormalizationBounds {
    fn default() -> Self {
        Self {
            ror_min: 10.0,
            ror_max: 50.0,
            distance_min: 0.0,
            distance_max: 15.0,
            iv_ratio_min: 1.0,
            iv_ratio_max: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    pub normalization: NormalizationBounds,
}

impl ScoringConfig {
    /// Warn when weights drift from 1.0 by more than 0.01. Returns whether
    /// the weights are balanced.
    pub fn check_weights(&self) -> bool {
        let total = self.weights.total();
        if (total - 1.0).abs() > 0.01 {
            warn!(total, "Scoring weights do not sum to 1.0");
            false
        } else {
            true
        }
    }
}

/// Min-max normalization clamped to [0, 1]; 0.5 when the range is empty.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 0.5;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Composite score for one analytics record.
pub fn composite_score(analytics: &CondorAnalytics, config: &ScoringConfig) -> f64 {
    let w = &config.weights;
    let n = &config.normalization;

    let ror = normalize(analytics.condor.return_on_risk(), n.ror_min, n.ror_max);
    let distance = normalize(analytics.avg_distance_pct(), n.distance_min, n.distance_max);
    let iv_edge = normalize(analytics.iv_to_rv_ratio, n.iv_ratio_min, n.iv_ratio_max);

    w.return_on_risk * ror
        + w.distance_from_em * distance
        + w.liquidity * analytics.liquidity_score
        + w.iv_edge * iv_edge
}

pub fn score_analytics(analytics: CondorAnalytics, config: &ScoringConfig) -> CondorAnalytics {
    let score = composite_score(&analytics, config);
    analytics.with_score(score)
}

/// Score and sort highest first. Ties keep input order.
pub fn rank(
    analytics: Vec<CondorAnalytics>,
    config: &ScoringConfig,
    top_n: Option<usize>,
) -> Vec<CondorAnalytics> {
    config.check_weights();

    let mut scored: Vec<CondorAnalytics> = analytics
        .into_iter()
        .map(|a| score_analytics(a, config))
        .collect();

    scored.sort_by(|a, b| {
        let sa = a.composite_score.unwrap_or(0.0);
        let sb = b.composite_score.unwrap_or(0.0);
        sb.total_cmp(&sa)
    });

    if let Some(n) = top_n {
        scored.truncate(n);
    }
    scored
}

/// Normalization bounds taken from the candidate pool itself, with default
/// weights.
pub fn adaptive_normalization(analytics: &[CondorAnalytics]) -> ScoringConfig {
    if analytics.is_empty() {
        return ScoringConfig::default();
    }

    fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
        values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
    }

    let (ror_min, ror_max) = bounds(analytics.iter().map(|a| a.condor.return_on_risk()));
    let (distance_min, distance_max) = bounds(analytics.iter().map(|a| a.avg_distance_pct()));
    let (iv_ratio_min, iv_ratio_max) = bounds(analytics.iter().map(|a| a.iv_to_rv_ratio));

    ScoringConfig {
        weights: ScoringWeights::default(),
        normalization: NormalizationBounds {
            ror_min,
            ror_max,
            distance_min,
            distance_max,
            iv_ratio_min,
            iv_ratio_max,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{analyze_condor, ExpectedMoveMethod, MarketContext};
    use crate::data::{Contract, OptionType};
    use crate::strategy::IronCondor;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn leg(strike: Decimal, option_type: OptionType, mid: Decimal) -> Arc<Contract> {
        Arc::new(Contract {
            ticker: "SPY".to_string(),
            strike,
            expiration: NaiveDate::from_ymd_opt(2024, 2, 16).unwrap(),
            option_type,
            bid: mid,
            ask: mid,
            volume: 1000,
            open_interest: 5000,
            delta: 0.0,
            implied_vol: 0.18,
            last: None,
            gamma: None,
            theta: None,
            vega: None,
        })
    }

    fn analytics(short_put: Decimal, short_call: Decimal, credit_side: Decimal) -> CondorAnalytics {
        let condor = IronCondor::new(
            leg(short_put, OptionType::Put, credit_side + dec!(0.5)),
            leg(short_put - dec!(5), OptionType::Put, dec!(0.5)),
            leg(short_call, OptionType::Call, credit_side + dec!(0.5)),
            leg(short_call + dec!(5), OptionType::Call, dec!(0.5)),
        )
        .unwrap();
        let ctx = MarketContext {
            spot: 560.0,
            iv_history: vec![],
            realized_vol: 0.12,
            earnings_date: None,
            as_of: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
            expected_move_method: ExpectedMoveMethod::Straddle,
        };
        analyze_condor(&condor, &ctx)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(30.0, 10.0, 50.0), 0.5);
        assert_eq!(normalize(60.0, 10.0, 50.0), 1.0);
        assert_eq!(normalize(0.0, 10.0, 50.0), 0.0);
        assert_eq!(normalize(5.0, 3.0, 3.0), 0.5);
    }

    #[test]
    fn test_weight_check() {
        assert!(ScoringConfig::default().check_weights());
        let skewed = ScoringConfig {
            weights: ScoringWeights {
                return_on_risk: 0.5,
                ..ScoringWeights::default()
            },
            ..ScoringConfig::default()
        };
        assert!(!skewed.check_weights());
    }

    #[test]
    fn test_composite_score_components() {
        // Credit 1.0 per side = 2.0 total; max loss 3.0; RoR 66.7% -> 1.0
        // Distance 15 / 560 = 2.68% -> 0.179; liquidity 1.0; IV/RV 1.5 -> 0.5
        let a = analytics(dec!(545), dec!(575), dec!(1.0));
        let score = composite_score(&a, &ScoringConfig::default());
        let distance = (15.0 / 560.0 * 100.0) / 15.0;
        let expected = 0.30 * 1.0 + 0.30 * distance + 0.20 * 1.0 + 0.20 * 0.5;
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let low = analytics(dec!(545), dec!(575), dec!(0.3));
        let high = analytics(dec!(540), dec!(580), dec!(1.0));
        let ranked = rank(vec![low, high], &ScoringConfig::default(), Some(1));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].condor.short_put().strike, dec!(540));
        assert!(ranked[0].composite_score.is_some());
    }

    #[test]
    fn test_rank_ties_keep_order() {
        let first = analytics(dec!(545), dec!(575), dec!(1.0));
        let second = analytics(dec!(545), dec!(575), dec!(1.0));
        let ranked = rank(vec![first.clone(), second], &ScoringConfig::default(), None);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].composite_score, ranked[1].composite_score);
    }

    #[test]
    fn test_adaptive_normalization() {
        let pool = vec![
            analytics(dec!(545), dec!(575), dec!(0.3)),
            analytics(dec!(540), dec!(580), dec!(1.0)),
        ];
        let config = adaptive_normalization(&pool);
        let n = config.normalization;
        assert!(n.ror_min < n.ror_max);
        assert!(n.distance_min < n.distance_max);
        assert_eq!(n.iv_ratio_min, n.iv_ratio_max);

        assert_eq!(
            adaptive_normalization(&[]).normalization.ror_min,
            NormalizationBounds::default().ror_min
        );
    }
}
