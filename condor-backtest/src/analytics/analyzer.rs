//! Per-condor analytics.
//!
//! Combines one condor with market context into a read-only record of
//! distances, volatility edge, liquidity, and earnings proximity.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::expected_move::{calculate_expected_move, ExpectedMoveMethod};
use super::volatility::{iv_percentile, iv_rank};
use crate::data::Contract;
use crate::earnings::{is_pre_earnings, parse_earnings_date};
use crate::strategy::IronCondor;
use crate::validation::liquidity_score;

/// Market inputs shared by every condor of one screen.
#[derive(Debug, Clone)]
pub struct MarketContext {
    /// Underlying price.
    pub spot: f64,
    /// Historical implied volatility for rank and percentile.
    pub iv_history: Vec<f64>,
    /// Annualized realized volatility; 0 when unknown.
    pub realized_vol: f64,
    /// Raw earnings date (`YYYY-MM-DD`), if any.
    pub earnings_date: Option<String>,
    pub as_of: NaiveDate,
    pub expected_move_method: ExpectedMoveMethod,
}

/// Analytics for a single condor.
#[derive(Debug, Clone, Serialize)]
pub struct CondorAnalytics {
    pub condor: IronCondor,
    pub spot: f64,

    /// Expected move from the ATM straddle.
    pub expected_move_straddle: f64,
    /// Expected move from IV.
    pub expected_move_iv: f64,

    pub put_distance_dollars: f64,
    pub call_distance_dollars: f64,
    pub put_distance_pct: f64,
    pub call_distance_pct: f64,

    pub iv_rank: f64,
    pub iv_percentile: f64,
    pub realized_vol: f64,
    pub iv_to_rv_ratio: f64,

    pub is_pre_earnings: bool,
    pub earnings_date: Option<NaiveDate>,

    /// Weighted leg liquidity in [0, 1].
    pub liquidity_score: f64,

    pub composite_score: Option<f64>,
}

impl CondorAnalytics {
    /// True when either short strike sits inside the expected move.
    pub fn within_expected_move(&self) -> bool {
        let lower = self.spot - self.expected_move_straddle;
        let upper = self.spot + self.expected_move_straddle;
        let put_strike: f64 = self.condor.short_put().strike.try_into().unwrap_or(0.0);
        let call_strike: f64 = self.condor.short_call().strike.try_into().unwrap_or(0.0);
        put_strike >= lower || call_strike <= upper
    }

    pub fn avg_distance_pct(&self) -> f64 {
        (self.put_distance_pct + self.call_distance_pct) / 2.0
    }

    /// IV premium over realized volatility.
    pub fn iv_edge(&self) -> f64 {
        self.iv_to_rv_ratio - 1.0
    }

    pub fn with_score(self, score: f64) -> Self {
        Self {
            composite_score: Some(score),
            ..self
        }
    }
}

impl fmt::Display for CondorAnalytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let score = self
            .composite_score
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "N/A".to_string());
        write!(
            f,
            "{} RoR={:.1}% IVR={:.0} IV/RV={:.2} Liq={:.2} Score={}",
            self.condor,
            self.condor.return_on_risk(),
            self.iv_rank,
            self.iv_to_rv_ratio,
            self.liquidity_score,
            score
        )
    }
}

/// Leg-weighted liquidity; short legs dominate.
pub fn condor_liquidity(condor: &IronCondor) -> f64 {
    0.35 * liquidity_score(condor.short_put())
        + 0.15 * liquidity_score(condor.long_put())
        + 0.35 * liquidity_score(condor.short_call())
        + 0.15 * liquidity_score(condor.long_call())
}

/// Compute analytics for one condor.
pub fn analyze_condor(condor: &IronCondor, ctx: &MarketContext) -> CondorAnalytics {
    let current_iv = (condor.short_put().implied_vol + condor.short_call().implied_vol) / 2.0;

    let legs: [&Contract; 4] = [
        condor.short_put(),
        condor.long_put(),
        condor.short_call(),
        condor.long_call(),
    ];
    let expected = calculate_expected_move(&legs, ctx.spot, ctx.as_of, ctx.expected_move_method);
    let (expected_move_straddle, expected_move_iv) =
        expected.map(|m| (m.straddle, m.iv)).unwrap_or((0.0, 0.0));

    let put_strike: f64 = condor.short_put().strike.try_into().unwrap_or(0.0);
    let call_strike: f64 = condor.short_call().strike.try_into().unwrap_or(0.0);
    let put_distance_dollars = ctx.spot - put_strike;
    let call_distance_dollars = call_strike - ctx.spot;
    let (put_distance_pct, call_distance_pct) = if ctx.spot > 0.0 {
        (
            put_distance_dollars / ctx.spot * 100.0,
            call_distance_dollars / ctx.spot * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    let iv_to_rv_ratio = if ctx.realized_vol > 0.0 {
        current_iv / ctx.realized_vol
    } else {
        1.0
    };

    let earnings_date = ctx.earnings_date.as_deref().and_then(parse_earnings_date);

    CondorAnalytics {
        condor: condor.clone(),
        spot: ctx.spot,
        expected_move_straddle,
        expected_move_iv,
        put_distance_dollars,
        call_distance_dollars,
        put_distance_pct,
        call_distance_pct,
        iv_rank: iv_rank(current_iv, &ctx.iv_history),
        iv_percentile: iv_percentile(current_iv, &ctx.iv_history),
        realized_vol: ctx.realized_vol,
        iv_to_rv_ratio,
        is_pre_earnings: is_pre_earnings(condor.expiration(), earnings_date),
        earnings_date,
        liquidity_score: condor_liquidity(condor),
        composite_score: None,
    }
}
