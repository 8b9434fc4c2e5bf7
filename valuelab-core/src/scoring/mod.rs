//! Relative-value scoring: four sub-scores and a weighted composite.

pub mod config;
pub mod scorer;

pub use config::{ScoringConfig, ScoringConfigError, ScoringWeights, WEIGHT_TOLERANCE};
pub use scorer::{
    momentum_decay_score, price_position_score, volatility_adjusted_score,
    volume_confirmation_score, ScoredUniverse, Scorer,
};
