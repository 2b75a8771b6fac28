//! End-to-end pipeline tests: generate, simulate, aggregate, analyze.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use condor_backtest::backtest::{
    BacktestJob, CondorSimulator, ExitConfig, ExitReason, SyntheticStudy, SyntheticStudyConfig,
    TradeOutcome, ValuationConstants,
};
use condor_backtest::data::{Contract, OptionType, PricePath, PricePoint};
use condor_backtest::earnings::{EarningsEdgeAnalyzer, EdgeReport, Recommendation};
use condor_backtest::metrics::{MetricsCalculator, PerformanceSummary, SORTINO_CAP};
use condor_backtest::strategy::{CondorBuilder, IronCondor, StrategyConfig};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn as_of() -> NaiveDate {
    date(2024, 1, 12)
}

fn expiration() -> NaiveDate {
    date(2024, 2, 16)
}

fn contract(strike: i64, option_type: OptionType, mid: Decimal, delta: f64) -> Arc<Contract> {
    Arc::new(Contract {
        ticker: "SPY".to_string(),
        strike: Decimal::from(strike),
        expiration: expiration(),
        option_type,
        bid: mid - dec!(0.05),
        ask: mid + dec!(0.05),
        volume: 800,
        open_interest: 4000,
        delta,
        implied_vol: 0.18,
        last: None,
        gamma: None,
        theta: None,
        vega: None,
    })
}

fn chain() -> Vec<Arc<Contract>> {
    vec![
        contract(535, OptionType::Put, dec!(1.0), -0.08),
        contract(540, OptionType::Put, dec!(1.5), -0.12),
        contract(545, OptionType::Put, dec!(2.4), -0.18),
        contract(550, OptionType::Put, dec!(3.4), -0.24),
        contract(555, OptionType::Put, dec!(4.8), -0.35),
        contract(565, OptionType::Call, dec!(4.6), 0.35),
        contract(570, OptionType::Call, dec!(3.2), 0.24),
        contract(575, OptionType::Call, dec!(2.2), 0.18),
        contract(580, OptionType::Call, dec!(1.4), 0.12),
        contract(585, OptionType::Call, dec!(0.9), 0.08),
    ]
}

fn flat_path(price: Decimal) -> PricePath {
    let days = (expiration() - as_of()).num_days();
    PricePath::new(
        (0..=days)
            .map(|i| PricePoint {
                date: as_of() + Duration::days(i),
                price,
            })
            .collect(),
    )
}

fn find(condors: &[IronCondor], short_put: i64, short_call: i64) -> IronCondor {
    condors
        .iter()
        .find(|c| {
            c.short_put().strike == Decimal::from(short_put)
                && c.short_call().strike == Decimal::from(short_call)
        })
        .cloned()
        .unwrap()
}

fn run_pipeline() -> (Vec<TradeOutcome>, PerformanceSummary) {
    let candidates = CondorBuilder::new(StrategyConfig::default()).generate(&chain(), as_of());
    let path = Arc::new(flat_path(dec!(560)));
    let jobs: Vec<BacktestJob> = candidates
        .iter()
        .map(|condor| BacktestJob {
            condor: condor.clone(),
            entry_date: as_of(),
            price_path: Arc::clone(&path),
            earnings_date: Some("2024-02-20".to_string()),
        })
        .collect();

    let outcomes: Vec<TradeOutcome> = CondorSimulator::default()
        .simulate_batch(&jobs)
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    let summary = MetricsCalculator::calculate(&outcomes);
    (outcomes, summary)
}

#[test]
fn generated_condors_hold_invariants() {
    let config = StrategyConfig::default();
    let candidates = CondorBuilder::new(config.clone()).generate(&chain(), as_of());
    assert_eq!(candidates.count(), 4);

    for condor in &candidates {
        assert!(condor.net_credit() > Decimal::ZERO);
        assert!(condor.max_loss() > Decimal::ZERO);
        assert!(condor.max_profit() < condor.put_side_width());
        assert!(condor.max_profit() < condor.call_side_width());
        let put_delta = condor.short_put().delta;
        let call_delta = condor.short_call().delta;
        assert!((-config.max_delta..=-config.min_delta).contains(&put_delta));
        assert!((config.min_delta..=config.max_delta).contains(&call_delta));
    }

    // Re-iterable: a second pass sees the same sequence.
    let first: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
    let second: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
    assert_eq!(first, second);
}

#[test]
fn flat_path_never_stops_out() {
    let candidates = CondorBuilder::new(StrategyConfig::default()).generate(&chain(), as_of());
    let condor = find(candidates.as_slice(), 545, 575);
    let outcome = CondorSimulator::default()
        .simulate(&condor, as_of(), &flat_path(dec!(560)), None)
        .unwrap();

    assert!(matches!(
        outcome.exit_reason,
        ExitReason::ProfitTarget | ExitReason::MinDte | ExitReason::Expiration
    ));
    assert!(outcome.is_winner);
}

#[test]
fn untouched_condor_keeps_full_credit_at_expiration() {
    let candidates = CondorBuilder::new(StrategyConfig::default()).generate(&chain(), as_of());
    let condor = find(candidates.as_slice(), 545, 575);
    let hold = ExitConfig {
        profit_target_pct: 10.0,
        min_dte_to_close: -1,
        close_before_earnings_days: 0,
        ..ExitConfig::default()
    };
    let outcome = CondorSimulator::new(hold, ValuationConstants::default())
        .simulate(&condor, as_of(), &flat_path(dec!(560)), None)
        .unwrap();

    assert_eq!(outcome.exit_reason, ExitReason::Expiration);
    assert_eq!(outcome.exit_date, expiration());
    assert_eq!(outcome.realized_pnl, outcome.entry_credit);
    assert_eq!(outcome.days_held, 35);
}

#[test]
fn pipeline_is_deterministic() {
    let (outcomes_a, summary_a) = run_pipeline();
    let (outcomes_b, summary_b) = run_pipeline();
    assert_eq!(outcomes_a, outcomes_b);
    assert_eq!(summary_a, summary_b);
    assert_eq!(summary_a.total_trades, 4);
    assert!(outcomes_a.iter().all(|o| !o.had_earnings));
}

#[test]
fn identical_winners_aggregate() {
    let candidates = CondorBuilder::new(StrategyConfig::default()).generate(&chain(), as_of());
    let condor = find(candidates.as_slice(), 545, 575);
    let outcome = TradeOutcome {
        condor,
        entry_date: as_of(),
        exit_date: date(2024, 1, 26),
        exit_reason: ExitReason::ProfitTarget,
        entry_credit: dec!(500),
        exit_cost: dec!(75),
        realized_pnl: dec!(425),
        max_profit: dec!(500),
        max_loss: dec!(75),
        return_pct: 425.0 / 75.0 * 100.0,
        days_held: 14,
        is_winner: true,
        had_earnings: false,
    };
    let outcomes = vec![outcome; 5];
    let summary = MetricsCalculator::calculate(&outcomes);

    assert_eq!(summary.win_rate, 100.0);
    assert!((summary.avg_return_pct - 566.67).abs() < 0.01);
    assert_eq!(summary.profit_factor, 0.0);
    assert_eq!(summary.sortino_ratio, SORTINO_CAP);
}

#[test]
fn synthetic_study_feeds_edge_analysis() {
    let run = || {
        SyntheticStudy::new(SyntheticStudyConfig::default())
            .unwrap()
            .run(&CondorSimulator::default())
            .unwrap()
    };
    let outcomes = run();
    assert_eq!(outcomes, run());
    assert_eq!(outcomes.len(), 100);

    let comparison = EarningsEdgeAnalyzer::default().analyze(&outcomes);
    assert_eq!(comparison.total_trades(), 100);
    assert!(comparison.pre_earnings.total_trades >= 10);
    assert!(comparison.post_earnings.total_trades >= 10);
    assert_ne!(comparison.recommendation, Recommendation::InsufficientData);
    assert!(comparison.significance.is_some());

    let exit = ExitConfig::default();
    let report = EdgeReport::new(&comparison, &outcomes, &exit, "test").to_string();
    assert!(report.contains("## Key Differences"));
    assert!(report.contains("## Exit Reasons"));
    assert!(report.contains("Welch two-sample t-test"));
}
