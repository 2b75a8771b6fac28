//! Iron condor candidate generation.
//!
//! Scans a pool of contracts for one underlying:
//! - DTE window filter
//! - Per-expiration grouping (no cross-expiration combinations)
//! - Short legs selected by delta band
//! - Long legs located by wing width within a strike tolerance
//! - Every put side paired with every call side, then validated

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::iron_condor::{CandidateRejection, IronCondor};
use crate::data::{Contract, OptionType};

/// Configuration for candidate generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Minimum days to expiration.
    pub min_dte: i32,
    /// Maximum days to expiration.
    pub max_dte: i32,
    /// Minimum absolute delta of the short legs.
    pub min_delta: f64,
    /// Maximum absolute delta of the short legs.
    pub max_delta: f64,
    /// Distance from short put to long put.
    pub wing_width_put: Decimal,
    /// Distance from short call to long call.
    pub wing_width_call: Decimal,
    /// Allow different put and call wing widths.
    pub allow_asymmetric: bool,
    /// Largest strike mismatch accepted when locating a long leg.
    pub strike_tolerance: Decimal,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_dte: 30,
            max_dte: 45,
            min_delta: 0.15,
            max_delta: 0.25,
            wing_width_put: Decimal::from(5),
            wing_width_call: Decimal::from(5),
            allow_asymmetric: true,
            strike_tolerance: Decimal::new(5, 1),
        }
    }
}

impl StrategyConfig {
    /// Call wing width actually used; pinned to the put width when
    /// asymmetric condors are disallowed.
    pub fn effective_call_width(&self) -> Decimal {
        if self.allow_asymmetric {
            self.wing_width_call
        } else {
            self.wing_width_put
        }
    }

    fn short_put_in_band(&self, contract: &Contract) -> bool {
        contract.delta >= -self.max_delta && contract.delta <= -self.min_delta
    }

    fn short_call_in_band(&self, contract: &Contract) -> bool {
        contract.delta >= self.min_delta && contract.delta <= self.max_delta
    }
}

/// Materialized, re-iterable set of generated condors.
///
/// Every traversal yields the same sequence in generation order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CondorCandidates {
    condors: Vec<IronCondor>,
    rejections: BTreeMap<CandidateRejection, usize>,
}

impl CondorCandidates {
    pub fn iter(&self) -> std::slice::Iter<'_, IronCondor> {
        self.condors.iter()
    }

    pub fn count(&self) -> usize {
        self.condors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.condors.is_empty()
    }

    pub fn as_slice(&self) -> &[IronCondor] {
        &self.condors
    }

    pub fn into_vec(self) -> Vec<IronCondor> {
        self.condors
    }

    /// Number of discarded combinations per reason.
    pub fn rejection_counts(&self) -> &BTreeMap<CandidateRejection, usize> {
        &self.rejections
    }

    pub fn total_rejected(&self) -> usize {
        self.rejections.values().sum()
    }

    /// Drop condors matching `predicate`, recording them under `reason`.
    pub fn reject_where<F>(&mut self, reason: CandidateRejection, predicate: F)
    where
        F: Fn(&IronCondor) -> bool,
    {
        let before = self.condors.len();
        self.condors.retain(|c| !predicate(c));
        let removed = before - self.condors.len();
        if removed > 0 {
            *self.rejections.entry(reason).or_insert(0) += removed;
        }
    }

    fn reject(&mut self, reason: CandidateRejection) {
        *self.rejections.entry(reason).or_insert(0) += 1;
    }
}

impl<'a> IntoIterator for &'a CondorCandidates {
    type Item = &'a IronCondor;
    type IntoIter = std::slice::Iter<'a, IronCondor>;

    fn into_iter(self) -> Self::IntoIter {
        self.condors.iter()
    }
}

/// One expiration's contracts, indexed by strike per side.
struct ExpirationSlice {
    /// Contracts in input order.
    contracts: Vec<Arc<Contract>>,
    puts: BTreeMap<Decimal, Arc<Contract>>,
    calls: BTreeMap<Decimal, Arc<Contract>>,
}

impl ExpirationSlice {
    fn new(contracts: Vec<Arc<Contract>>) -> Self {
        let mut puts = BTreeMap::new();
        let mut calls = BTreeMap::new();
        for contract in &contracts {
            let side = match contract.option_type {
                OptionType::Put => &mut puts,
                OptionType::Call => &mut calls,
            };
            // First quote at a strike wins.
            side.entry(contract.strike)
                .or_insert_with(|| Arc::clone(contract));
        }
        Self {
            contracts,
            puts,
            calls,
        }
    }
}

/// Locate the contract at `target`, or the nearest one within `tolerance`.
/// Equidistant matches resolve to the lower strike.
fn find_by_strike(
    index: &BTreeMap<Decimal, Arc<Contract>>,
    target: Decimal,
    tolerance: Decimal,
) -> Option<&Arc<Contract>> {
    if let Some(exact) = index.get(&target) {
        return Some(exact);
    }

    let below = index.range(..target).next_back();
    let above = index
        .range((Bound::Excluded(target), Bound::Unbounded))
        .next();

    fn within<'a>(
        entry: Option<(&Decimal, &'a Arc<Contract>)>,
        target: Decimal,
        tolerance: Decimal,
    ) -> Option<(Decimal, &'a Arc<Contract>)> {
        entry.and_then(|(strike, c)| {
            let diff = (*strike - target).abs();
            (diff <= tolerance).then_some((diff, c))
        })
    }

    match (
        within(below, target, tolerance),
        within(above, target, tolerance),
    ) {
        (Some((d_low, low)), Some((d_high, high))) => {
            if d_high < d_low {
                Some(high)
            } else {
                Some(low)
            }
        }
        (Some((_, low)), None) => Some(low),
        (None, Some((_, high))) => Some(high),
        (None, None) => None,
    }
}

/// Builds iron condor candidates from a contract pool.
pub struct CondorBuilder {
    config: StrategyConfig,
}

impl CondorBuilder {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Generate all valid condors from `contracts` as of `as_of`.
    ///
    /// An empty result is normal when nothing satisfies the constraints.
    pub fn generate(&self, contracts: &[Arc<Contract>], as_of: NaiveDate) -> CondorCandidates {
        let mut out = CondorCandidates::default();

        for (expiration, slice) in self.group_by_expiration(contracts, as_of) {
            let before = out.condors.len();
            self.generate_for_expiration(&slice, &mut out);
            debug!(
                %expiration,
                contracts = slice.contracts.len(),
                generated = out.condors.len() - before,
                "Screened expiration"
            );
        }

        info!(
            generated = out.count(),
            rejected = out.total_rejected(),
            "Candidate generation complete"
        );
        out
    }

    /// DTE filter, then group by expiration in first-seen order.
    fn group_by_expiration(
        &self,
        contracts: &[Arc<Contract>],
        as_of: NaiveDate,
    ) -> Vec<(NaiveDate, ExpirationSlice)> {
        let mut order: Vec<NaiveDate> = Vec::new();
        let mut groups: HashMap<NaiveDate, Vec<Arc<Contract>>> = HashMap::new();

        for contract in contracts {
            let dte = contract.dte(as_of);
            if dte < self.config.min_dte || dte > self.config.max_dte {
                continue;
            }
            groups
                .entry(contract.expiration)
                .or_insert_with(|| {
                    order.push(contract.expiration);
                    Vec::new()
                })
                .push(Arc::clone(contract));
        }

        order
            .into_iter()
            .filter_map(|exp| groups.remove(&exp).map(|g| (exp, ExpirationSlice::new(g))))
            .collect()
    }

    fn generate_for_expiration(&self, slice: &ExpirationSlice, out: &mut CondorCandidates) {
        let cfg = &self.config;
        let call_width = cfg.effective_call_width();

        let mut put_sides = Vec::new();
        for short in slice
            .contracts
            .iter()
            .filter(|c| c.option_type == OptionType::Put && cfg.short_put_in_band(c))
        {
            let target = short.strike - cfg.wing_width_put;
            match find_by_strike(&slice.puts, target, cfg.strike_tolerance) {
                Some(long) => put_sides.push((short, long)),
                None => out.reject(CandidateRejection::NoLongPut),
            }
        }

        let mut call_sides = Vec::new();
        for short in slice
            .contracts
            .iter()
            .filter(|c| c.option_type == OptionType::Call && cfg.short_call_in_band(c))
        {
            let target = short.strike + call_width;
            match find_by_strike(&slice.calls, target, cfg.strike_tolerance) {
                Some(long) => call_sides.push((short, long)),
                None => out.reject(CandidateRejection::NoLongCall),
            }
        }

        for (short_put, long_put) in &put_sides {
            for (short_call, long_call) in &call_sides {
                let condor = match IronCondor::new(
                    Arc::clone(short_put),
                    Arc::clone(long_put),
                    Arc::clone(short_call),
                    Arc::clone(long_call),
                ) {
                    Ok(c) => c,
                    Err(e) => {
                        debug!(error = %e, "Discarding invalid combination");
                        out.reject(CandidateRejection::InvalidStructure);
                        continue;
                    }
                };

                if let Some(reason) = condor.rejection() {
                    debug!(condor = %condor, reason = reason.as_str(), "Discarding candidate");
                    out.reject(reason);
                    continue;
                }

                if !cfg.allow_asymmetric && !condor.is_symmetric() {
                    out.reject(CandidateRejection::Asymmetric);
                    continue;
                }

                out.condors.push(condor);
            }
        }
    }
}
