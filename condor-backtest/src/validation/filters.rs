//! Hard liquidity and volatility filters applied before candidate generation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::Contract;
use crate::strategy::{CandidateRejection, CondorCandidates};

/// Filter thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum IV rank (0-100) for the whole chain.
    pub min_iv_rank: f64,
    /// Minimum IV percentile (0-100) for the whole chain.
    pub min_iv_percentile: f64,
    /// Maximum bid-ask spread as a fraction of mid (0.15 = 15%).
    pub max_bid_ask_spread_pct: f64,
    pub min_open_interest: i64,
    pub min_volume: i64,
    /// Optional cap on condor max loss.
    pub max_loss_cap: Option<Decimal>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_iv_rank: 40.0,
            min_iv_percentile: 40.0,
            max_bid_ask_spread_pct: 0.15,
            min_open_interest: 500,
            min_volume: 1,
            max_loss_cap: None,
        }
    }
}

/// Outcome of filtering one chain.
#[derive(Debug, Clone, Default)]
pub struct FilterReport {
    pub passed: Vec<Contract>,
    /// Set when IV rank or percentile rejected the whole chain.
    pub chain_rejected: bool,
    pub wide_spread: usize,
    pub low_open_interest: usize,
    pub no_volume: usize,
}

impl FilterReport {
    pub fn total_rejected(&self) -> usize {
        self.wide_spread + self.low_open_interest + self.no_volume
    }
}

/// Apply chain-level IV gates and per-contract liquidity filters.
pub fn filter_contracts(
    contracts: &[Contract],
    iv_rank: f64,
    iv_percentile: f64,
    config: &FilterConfig,
) -> FilterReport {
    let mut report = FilterReport::default();

    if iv_rank < config.min_iv_rank {
        warn!(
            iv_rank,
            min = config.min_iv_rank,
            "IV rank below minimum; rejecting entire chain"
        );
        report.chain_rejected = true;
        return report;
    }

    if iv_percentile < config.min_iv_percentile {
        warn!(
            iv_percentile,
            min = config.min_iv_percentile,
            "IV percentile below minimum; rejecting entire chain"
        );
        report.chain_rejected = true;
        return report;
    }

    for contract in contracts {
        if contract.spread_pct() > config.max_bid_ask_spread_pct {
            report.wide_spread += 1;
        } else if contract.open_interest < config.min_open_interest {
            report.low_open_interest += 1;
        } else if contract.volume < config.min_volume {
            report.no_volume += 1;
        } else {
            report.passed.push(contract.clone());
        }
    }

    info!(
        passed = report.passed.len(),
        total = contracts.len(),
        "Filter results"
    );
    if report.total_rejected() > 0 {
        debug!(
            wide_spread = report.wide_spread,
            low_oi = report.low_open_interest,
            no_volume = report.no_volume,
            "Rejected contracts"
        );
    }

    report
}

/// Drop condors whose max loss exceeds the configured cap.
pub fn apply_max_loss_cap(candidates: &mut CondorCandidates, config: &FilterConfig) {
    if let Some(cap) = config.max_loss_cap {
        candidates.reject_where(CandidateRejection::MaxLossAboveCap, |c| c.max_loss() > cap);
    }
}

/// Liquidity score in [0, 1] from spread, open interest and volume.
pub fn liquidity_score(contract: &Contract) -> f64 {
    let spread_score = (1.0 - contract.spread_pct() / 0.15).max(0.0);
    let oi_score = (contract.open_interest as f64 / 5000.0).min(1.0);
    let volume_score = (contract.volume as f64 / 1000.0).min(1.0);

    0.5 * spread_score + 0.3 * oi_score + 0.2 * volume_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn contract(bid: Decimal, ask: Decimal, oi: i64, volume: i64) -> Contract {
        Contract {
            ticker: "SPY".to_string(),
            strike: dec!(545),
            expiration: NaiveDate::from_ymd_opt(2024, 2, 16).unwrap(),
            option_type: OptionType::Put,
            bid,
            ask,
            volume,
            open_interest: oi,
            delta: -0.2,
            implied_vol: 0.18,
            last: None,
            gamma: None,
            theta: None,
            vega: None,
        }
    }

    #[test]
    fn test_iv_gate_rejects_chain() {
        let contracts = vec![contract(dec!(1.95), dec!(2.05), 5000, 100)];
        let config = FilterConfig::default();

        let low_rank = filter_contracts(&contracts, 30.0, 80.0, &config);
        assert!(low_rank.chain_rejected);
        assert!(low_rank.passed.is_empty());

        let low_pct = filter_contracts(&contracts, 80.0, 30.0, &config);
        assert!(low_pct.chain_rejected);

        let ok = filter_contracts(&contracts, 50.0, 50.0, &config);
        assert!(!ok.chain_rejected);
        assert_eq!(ok.passed.len(), 1);
    }

    #[test]
    fn test_per_contract_filters() {
        let contracts = vec![
            contract(dec!(1.95), dec!(2.05), 5000, 100),
            contract(dec!(1.00), dec!(2.00), 5000, 100),
            contract(dec!(1.95), dec!(2.05), 100, 100),
            contract(dec!(1.95), dec!(2.05), 5000, 0),
        ];
        let report = filter_contracts(&contracts, 50.0, 50.0, &FilterConfig::default());
        assert_eq!(report.passed.len(), 1);
        assert_eq!(report.wide_spread, 1);
        assert_eq!(report.low_open_interest, 1);
        assert_eq!(report.no_volume, 1);
    }

    #[test]
    fn test_liquidity_score() {
        let perfect = contract(dec!(2.00), dec!(2.00), 5000, 1000);
        assert!((liquidity_score(&perfect) - 1.0).abs() < 1e-12);

        // 5% spread: spread score 2/3, half OI, half volume.
        let mid = contract(dec!(1.95), dec!(2.05), 2500, 500);
        let expected = 0.5 * (2.0 / 3.0) + 0.3 * 0.5 + 0.2 * 0.5;
        assert!((liquidity_score(&mid) - expected).abs() < 1e-9);

        let dead = contract(dec!(0), dec!(0), 0, 0);
        assert_eq!(liquidity_score(&dead), 0.0);
    }
}
