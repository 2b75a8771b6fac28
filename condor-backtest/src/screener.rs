//! Chain screening pipeline.
//!
//! One chain snapshot goes through:
//! - the IV gate and liquidity filters
//! - the greeks fallback
//! - candidate generation and the max-loss cap
//! - per-condor analytics and composite ranking

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::analytics::{
    analyze_condor, CondorAnalytics, ExpectedMoveMethod, IvHistory, MarketContext,
};
use crate::config::AppConfig;
use crate::data::Contract;
use crate::scoring::{rank, ScoringConfig};
use crate::strategy::{CandidateRejection, CondorBuilder, StrategyConfig};
use crate::validation::{apply_max_loss_cap, filter_contracts, FilterConfig, GreeksEstimator};

/// Market state for one underlying on one date.
#[derive(Debug, Clone)]
pub struct ChainSnapshot {
    pub contracts: Vec<Contract>,
    pub spot: f64,
    pub as_of: NaiveDate,
    /// Oldest first. Only the most recent year of observations is used.
    pub iv_history: Vec<f64>,
    /// Annualized; 0 when unknown.
    pub realized_vol: f64,
    /// Raw `YYYY-MM-DD` earnings date, if any.
    pub earnings_date: Option<String>,
}

/// Result of screening one chain.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenResult {
    /// IV of the contract nearest the money.
    pub current_iv: f64,
    pub iv_rank: f64,
    pub iv_percentile: f64,
    /// Standard deviations from the windowed mean, when enough history exists.
    pub iv_zscore: Option<f64>,
    pub contracts_in: usize,
    pub contracts_passed: usize,
    pub chain_rejected: bool,
    pub candidates: usize,
    pub rejections: BTreeMap<CandidateRejection, usize>,
    /// Highest composite score first.
    pub ranked: Vec<CondorAnalytics>,
}

impl ScreenResult {
    pub fn summary(&self) -> String {
        format!(
            "IV={:.3} IVR={:.0} IVP={:.0} contracts={}/{} candidates={} ranked={}{}",
            self.current_iv,
            self.iv_rank,
            self.iv_percentile,
            self.contracts_passed,
            self.contracts_in,
            self.candidates,
            self.ranked.len(),
            if self.chain_rejected { " (chain rejected)" } else { "" }
        )
    }
}

/// IV of the contract whose strike is nearest `spot`; 0 for an empty chain.
pub fn atm_implied_vol(contracts: &[Contract], spot: f64) -> f64 {
    contracts
        .iter()
        .min_by(|a, b| {
            let da = (f64::try_from(a.strike).unwrap_or(0.0) - spot).abs();
            let db = (f64::try_from(b.strike).unwrap_or(0.0) - spot).abs();
            da.total_cmp(&db)
        })
        .map(|c| c.implied_vol)
        .unwrap_or(0.0)
}

/// Screens option chains for iron condors.
pub struct CondorScreener {
    builder: CondorBuilder,
    filters: FilterConfig,
    scoring: ScoringConfig,
    greeks: GreeksEstimator,
    expected_move_method: ExpectedMoveMethod,
}

impl CondorScreener {
    pub fn new(
        strategy: StrategyConfig,
        filters: FilterConfig,
        scoring: ScoringConfig,
        greeks: GreeksEstimator,
        expected_move_method: ExpectedMoveMethod,
    ) -> Self {
        Self {
            builder: CondorBuilder::new(strategy),
            filters,
            scoring,
            greeks,
            expected_move_method,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.strategy.clone(),
            config.filters.clone(),
            config.scoring,
            GreeksEstimator::new(config.analytics.risk_free_rate),
            config.analytics.expected_move_method,
        )
    }

    pub fn screen(&self, snapshot: &ChainSnapshot, top_n: Option<usize>) -> ScreenResult {
        let current_iv = atm_implied_vol(&snapshot.contracts, snapshot.spot);
        let history = IvHistory::from_values(snapshot.iv_history.iter().copied());
        let rank_value = history.rank(current_iv);
        let percentile_value = history.percentile(current_iv);

        let report = filter_contracts(&snapshot.contracts, rank_value, percentile_value, &self.filters);

        let contracts: Vec<Arc<Contract>> = self
            .greeks
            .fill_all(&report.passed, snapshot.spot, snapshot.as_of)
            .into_iter()
            .map(Arc::new)
            .collect();

        let mut candidates = self.builder.generate(&contracts, snapshot.as_of);
        apply_max_loss_cap(&mut candidates, &self.filters);

        let ctx = MarketContext {
            spot: snapshot.spot,
            iv_history: history.values().to_vec(),
            realized_vol: snapshot.realized_vol,
            earnings_date: snapshot.earnings_date.clone(),
            as_of: snapshot.as_of,
            expected_move_method: self.expected_move_method,
        };
        let analyzed: Vec<CondorAnalytics> =
            candidates.iter().map(|c| analyze_condor(c, &ctx)).collect();
        let ranked = rank(analyzed, &self.scoring, top_n);

        let result = ScreenResult {
            current_iv,
            iv_rank: rank_value,
            iv_percentile: percentile_value,
            iv_zscore: history.zscore(current_iv),
            contracts_in: snapshot.contracts.len(),
            contracts_passed: report.passed.len(),
            chain_rejected: report.chain_rejected,
            candidates: candidates.count(),
            rejections: candidates.rejection_counts().clone(),
            ranked,
        };
        info!(summary = %result.summary(), "Screened chain");
        result
    }
}
