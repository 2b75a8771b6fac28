//! Options analytics module.
//!
//! Provides:
//! - IV rank, IV percentile and realized volatility
//! - Expected move (straddle and IV methods)
//! - Per-condor analytics records

pub mod analyzer;
pub mod expected_move;
pub mod volatility;

pub use analyzer::{analyze_condor, condor_liquidity, CondorAnalytics, MarketContext};
pub use expected_move::{calculate_expected_move, ExpectedMove, ExpectedMoveMethod};
pub use volatility::{
    iv_percentile, iv_rank, realized_vol_close_to_close, realized_vol_garman_klass,
    realized_volatility, IvHistory,
};
