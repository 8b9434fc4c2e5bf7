use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoringConfigError {
    #[error("invalid configuration: scoring weights sum to {sum}, expected 1.0")]
    WeightsDoNotSumToOne { sum: f64 },

    #[error("invalid configuration: scoring weight '{name}' is {value}, must be finite and >= 0")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("invalid configuration: momentum_decay_factor {0} must be in (0, 1]")]
    InvalidDecayFactor(f64),

    #[error("invalid configuration: {0} must be greater than zero")]
    ZeroWindow(&'static str),
}

/// Weights of the four sub-scores in the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub price_position: f64,
    pub momentum_decay: f64,
    pub volatility_adjusted: f64,
    pub volume_confirmation: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            price_position: 0.4,
            momentum_decay: 0.3,
            volatility_adjusted: 0.2,
            volume_confirmation: 0.1,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.price_position + self.momentum_decay + self.volatility_adjusted + self.volume_confirmation
    }

    pub fn validate(&self) -> Result<(), ScoringConfigError> {
        let named = [
            ("price_position", self.price_position),
            ("momentum_decay", self.momentum_decay),
            ("volatility_adjusted", self.volatility_adjusted),
            ("volume_confirmation", self.volume_confirmation),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(ScoringConfigError::InvalidWeight { name, value });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ScoringConfigError::WeightsDoNotSumToOne { sum });
        }
        Ok(())
    }
}

/// Parameters of the scorer. Validated once when a `Scorer` is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    /// Calendar days of history in a window.
    pub lookback_days: u32,
    /// Minimum bars a window needs before it can be scored.
    pub min_window_days: usize,
    /// Per-day multiplier on each additional consecutive down-day.
    pub momentum_decay_factor: f64,
    /// Trailing daily returns used for the volatility estimate.
    pub volatility_window: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            lookback_days: 90,
            min_window_days: 20,
            momentum_decay_factor: 0.95,
            volatility_window: 30,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ScoringConfigError> {
        self.weights.validate()?;
        if !(self.momentum_decay_factor > 0.0 && self.momentum_decay_factor <= 1.0) {
            return Err(ScoringConfigError::InvalidDecayFactor(self.momentum_decay_factor));
        }
        if self.lookback_days == 0 {
            return Err(ScoringConfigError::ZeroWindow("lookback_days"));
        }
        if self.min_window_days == 0 {
            return Err(ScoringConfigError::ZeroWindow("min_window_days"));
        }
        if self.volatility_window == 0 {
            return Err(ScoringConfigError::ZeroWindow("volatility_window"));
        }
        Ok(())
    }
}
