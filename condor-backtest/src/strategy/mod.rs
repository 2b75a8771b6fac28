//! Iron condor construction.
//!
//! - `iron_condor`: the validated four-leg spread and its derived values
//! - `builder`: candidate generation over an option chain

pub mod builder;
pub mod iron_condor;

pub use builder::{CondorBuilder, CondorCandidates, StrategyConfig};
pub use iron_condor::{CandidateRejection, IronCondor, SpreadError};
