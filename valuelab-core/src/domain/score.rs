use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Instrument;

/// Sub-scores and composite score for one instrument on one date.
///
/// Recomputed per date and never mutated; a new date yields a new record.
/// Every score field lies in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub date: NaiveDate,
    pub instrument: Instrument,
    pub market: String,
    pub price_position: f64,
    pub momentum_decay: f64,
    pub volatility_adj: f64,
    pub volume_conf: f64,
    pub final_score: f64,
    /// Close of the last bar in the window.
    pub close: f64,
    /// Number of bars the scores were computed from.
    pub bars: usize,
}

/// Why an instrument produced no score (or no fill) for a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientHistory { available: usize, required: usize },
    NotFound { detail: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientHistory { available, required } => {
                write!(f, "insufficient history ({available} bars, need {required})")
            }
            Self::NotFound { detail } => write!(f, "not found: {detail}"),
        }
    }
}
