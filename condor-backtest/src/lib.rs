pub mod analytics;
pub mod backtest;
pub mod config;
pub mod data;
pub mod earnings;
pub mod metrics;
pub mod scoring;
pub mod screener;
pub mod strategy;
pub mod validation;

// Re-export commonly used types
pub use data::{Contract, OptionType, PricePath, PricePoint};
pub use strategy::{CondorBuilder, CondorCandidates, IronCondor, SpreadError, StrategyConfig};
pub use validation::{FilterConfig, GreeksEstimator};
pub use analytics::{analyze_condor, CondorAnalytics, MarketContext};
pub use scoring::{rank, ScoringConfig};
pub use backtest::{CondorSimulator, ExitConfig, ExitReason, SyntheticStudy, TradeOutcome};
pub use metrics::{MetricsCalculator, PerformanceSummary};
pub use earnings::{EarningsComparison, EarningsEdgeAnalyzer, EdgeReport};
pub use config::{AppConfig, ConfigError};
pub use screener::{ChainSnapshot, CondorScreener, ScreenResult};
