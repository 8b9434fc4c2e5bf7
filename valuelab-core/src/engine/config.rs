use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::allocation::AllocationConfig;
use crate::domain::Instrument;
use crate::scoring::ScoringConfig;

/// What to do when an instrument cannot be scored or priced for a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingHistoryPolicy {
    /// Leave the instrument out of that period only.
    #[default]
    SkipInstrument,
    /// Stop the whole run (`AbortedAtPeriod`).
    Abort,
}

/// What to do when no instrument at all can be scored for a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPeriodPolicy {
    /// Record the period as skipped; holdings and invested capital carry forward.
    #[default]
    SkipPeriod,
    Abort,
}

/// Immutable configuration of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub instruments: Vec<Instrument>,
    pub scoring: ScoringConfig,
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub history_policy: MissingHistoryPolicy,
    #[serde(default)]
    pub empty_period_policy: EmptyPeriodPolicy,
}
