//! Performance metrics module.
//!
//! Provides performance calculations over simulated trades:
//! - Win rate, profit factor
//! - Sharpe ratio, Sortino ratio
//! - Maximum drawdown

pub mod calculator;

pub use calculator::{MetricsCalculator, PerformanceSummary, SORTINO_CAP, TRADES_PER_YEAR};
