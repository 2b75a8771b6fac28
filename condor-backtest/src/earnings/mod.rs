//! Earnings awareness.
//!
//! - Earnings-date parsing and pre-earnings classification
//! - Pre- versus post-earnings significance analysis
//! - Markdown reporting

pub mod calendar;
pub mod edge;
pub mod report;

pub use calendar::{
    earnings_in_window, is_pre_earnings, parse_earnings_date, PRE_EARNINGS_WINDOW_DAYS,
};
pub use edge::{
    lookup_p_value, student_t_p_value, welch_t_test, EarningsComparison, EarningsEdgeAnalyzer,
    PValueMethod, Recommendation, SignificanceConfig, SignificanceTest, MIN_TRADES_PER_GROUP,
    SIGNIFICANCE_LEVEL,
};
pub use report::EdgeReport;
