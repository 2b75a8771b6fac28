//! Seeded synthetic study for exercising the earnings-edge analysis.
//!
//! Generates condors around a fixed spot, a geometric Brownian motion path
//! for each, and earnings dates for a share of the trades. The same seed
//! always produces the same trades.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use tracing::{info, warn};

use super::engine::{BacktestJob, CondorSimulator, SimulationError};
use super::trade::TradeOutcome;
use crate::data::{Contract, OptionType, PricePath, PricePoint};
use crate::strategy::IronCondor;

/// Parameters of the synthetic study.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticStudyConfig {
    pub seed: u64,
    pub num_trades: usize,
    pub ticker: String,
    pub spot: f64,
    pub start_date: NaiveDate,
    pub min_dte: i64,
    pub max_dte: i64,
    /// Days between consecutive entries, inclusive range.
    pub entry_gap_days: (i64, i64),
    /// Short strikes sit this far out of the money, inclusive range.
    pub otm_pct: (f64, f64),
    pub wing_width: f64,
    /// Net credit as a fraction of wing width, inclusive range.
    pub credit_pct: (f64, f64),
    /// Share of trades that carry an earnings date.
    pub earnings_share: f64,
    /// Earnings offset from expiration in days (negative = before).
    pub earnings_offset_days: (i64, i64),
    /// Annual volatility of the path without / with earnings.
    pub base_vol: f64,
    pub earnings_vol: f64,
}

impl Default for SyntheticStudyConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_trades: 100,
            ticker: "SPY".to_string(),
            spot: 560.0,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            min_dte: 30,
            max_dte: 45,
            entry_gap_days: (7, 14),
            otm_pct: (0.06, 0.10),
            wing_width: 5.0,
            credit_pct: (0.20, 0.35),
            earnings_share: 0.4,
            earnings_offset_days: (-5, -3),
            base_vol: 0.15,
            earnings_vol: 0.18,
        }
    }
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO).round_dp(2)
}

fn sample_range_f64(rng: &mut StdRng, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

fn sample_range_i64(rng: &mut StdRng, (lo, hi): (i64, i64)) -> i64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// Generates synthetic trades and simulates them.
pub struct SyntheticStudy {
    config: SyntheticStudyConfig,
    rng: StdRng,
    shock: Normal,
}

impl SyntheticStudy {
    pub fn new(config: SyntheticStudyConfig) -> Result<Self, SimulationError> {
        let shock = Normal::new(0.0, 1.0)
            .map_err(|e| SimulationError::Sampling(e.to_string()))?;
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            shock,
        })
    }

    fn leg(
        &self,
        strike: Decimal,
        expiration: NaiveDate,
        option_type: OptionType,
        mid: Decimal,
        short: bool,
    ) -> Arc<Contract> {
        let half_spread = Decimal::new(5, 2);
        let sign = if option_type == OptionType::Put { -1.0 } else { 1.0 };
        Arc::new(Contract {
            ticker: self.config.ticker.clone(),
            strike,
            expiration,
            option_type,
            bid: mid - half_spread,
            ask: mid + half_spread,
            volume: if short { 500 } else { 100 },
            open_interest: if short { 5000 } else { 1000 },
            delta: sign * if short { 0.15 } else { 0.05 },
            implied_vol: if short { 0.16 } else { 0.15 },
            last: Some(mid),
            gamma: None,
            theta: None,
            vega: None,
        })
    }

    /// Build one condor with a sampled distance and credit.
    fn generate_condor(&mut self, expiration: NaiveDate) -> Result<IronCondor, SimulationError> {
        let otm = sample_range_f64(&mut self.rng, self.config.otm_pct);
        let credit = sample_range_f64(&mut self.rng, self.config.credit_pct) * self.config.wing_width;

        let spot = self.config.spot;
        let width = to_decimal(self.config.wing_width);
        let short_put = to_decimal((spot * (1.0 - otm)).round());
        let short_call = to_decimal((spot * (1.0 + otm)).round());

        let long_mid = Decimal::new(55, 2);
        let short_mid = long_mid + to_decimal(credit / 2.0);

        IronCondor::new(
            self.leg(short_put, expiration, OptionType::Put, short_mid, true),
            self.leg(short_put - width, expiration, OptionType::Put, long_mid, false),
            self.leg(short_call, expiration, OptionType::Call, short_mid, true),
            self.leg(short_call + width, expiration, OptionType::Call, long_mid, false),
        )
        .map_err(|e| SimulationError::Sampling(e.to_string()))
    }

    /// Daily geometric Brownian motion with zero drift.
    fn generate_path(&mut self, start: NaiveDate, end: NaiveDate, vol: f64) -> PricePath {
        let daily_vol = vol / 252f64.sqrt();
        let mut price = self.config.spot;
        let mut points = Vec::new();

        for date in start.iter_days().take_while(|d| *d <= end) {
            points.push(PricePoint {
                date,
                price: to_decimal(price),
            });
            let z: f64 = self.rng.sample(&self.shock);
            price *= 1.0 + daily_vol * z;
        }

        PricePath::new(points)
    }

    /// Generate the study's jobs without simulating them.
    pub fn generate_jobs(&mut self) -> Result<Vec<BacktestJob>, SimulationError> {
        let mut jobs = Vec::with_capacity(self.config.num_trades);
        let mut entry = self.config.start_date;

        for _ in 0..self.config.num_trades {
            let dte = sample_range_i64(&mut self.rng, (self.config.min_dte, self.config.max_dte));
            let expiration = entry + Duration::days(dte);
            let has_earnings = self.rng.gen_bool(self.config.earnings_share.clamp(0.0, 1.0));

            let condor = self.generate_condor(expiration)?;
            let earnings_date = if has_earnings {
                let offset = sample_range_i64(&mut self.rng, self.config.earnings_offset_days);
                Some((expiration + Duration::days(offset)).to_string())
            } else {
                None
            };

            let vol = if has_earnings {
                self.config.earnings_vol
            } else {
                self.config.base_vol
            };
            let price_path = Arc::new(self.generate_path(entry, expiration, vol));

            jobs.push(BacktestJob {
                condor,
                entry_date: entry,
                price_path,
                earnings_date,
            });

            entry += Duration::days(sample_range_i64(&mut self.rng, self.config.entry_gap_days));
        }

        Ok(jobs)
    }

    /// Generate and simulate all trades.
    pub fn run(&mut self, simulator: &CondorSimulator) -> Result<Vec<TradeOutcome>, SimulationError> {
        let jobs = self.generate_jobs()?;
        info!(trades = jobs.len(), seed = self.config.seed, "Running synthetic study");

        let mut outcomes = Vec::with_capacity(jobs.len());
        for result in simulator.simulate_batch(&jobs) {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(error = %e, "Skipping synthetic trade"),
            }
        }
        Ok(outcomes)
    }
}
