//! Pre-screen validation of chain data.
//!
//! - Hard liquidity filters and the chain-level IV gate
//! - Liquidity scoring
//! - Black-Scholes fallback for missing greeks

pub mod filters;
pub mod greeks;

pub use filters::{apply_max_loss_cap, filter_contracts, liquidity_score, FilterConfig, FilterReport};
pub use greeks::{greeks_issue, BlackScholes, GreeksEstimator, DEFAULT_RISK_FREE_RATE};
