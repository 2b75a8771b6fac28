//! Backtest simulation for iron condors.
//!
//! This module provides:
//! - Exit thresholds and valuation heuristics
//! - The day-stepped simulator and parallel batch runner
//! - Simulated trade outcomes
//! - A seeded synthetic study for end-to-end runs

pub mod engine;
pub mod exit;
pub mod synthetic;
pub mod trade;

pub use engine::{BacktestJob, CondorSimulator, SimulationError};
pub use exit::{ExitConfig, ValuationConstants};
pub use synthetic::{SyntheticStudy, SyntheticStudyConfig};
pub use trade::{ExitReason, TradeOutcome};
