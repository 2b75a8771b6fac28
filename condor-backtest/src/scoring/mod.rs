//! Composite scoring and ranking of analyzed condors.

pub mod scorer;

pub use scorer::{
    adaptive_normalization, composite_score, normalize, rank, score_analytics,
    NormalizationBounds, ScoringConfig, ScoringWeights,
};
