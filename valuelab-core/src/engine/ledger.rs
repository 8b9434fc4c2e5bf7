//! Append-only record of a backtest run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::allocation::BudgetShortfall;
use crate::domain::{Instrument, SkipReason};

/// One simulated fill: one instrument in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub period_date: NaiveDate,
    pub instrument: Instrument,
    pub score: f64,
    pub allocation: f64,
    pub price: f64,
    pub shares_bought: f64,
    /// Portfolio totals after the period committed.
    pub cumulative_invested: f64,
    pub cumulative_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Committed,
    /// Nothing could be scored; state carried forward unchanged.
    Skipped,
}

/// Why an instrument received nothing in a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    InsufficientHistory { available: usize, required: usize },
    NotFound { detail: String },
    /// Scored, but the allocation floors left no budget for it.
    BudgetInsufficient,
}

impl From<SkipReason> for ExclusionReason {
    fn from(reason: SkipReason) -> Self {
        match reason {
            SkipReason::InsufficientHistory { available, required } => {
                Self::InsufficientHistory { available, required }
            }
            SkipReason::NotFound { detail } => Self::NotFound { detail },
        }
    }
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientHistory { available, required } => {
                write!(f, "insufficient history ({available} bars, need {required})")
            }
            Self::NotFound { detail } => write!(f, "not found: {detail}"),
            Self::BudgetInsufficient => write!(f, "budget insufficient for allocation floor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub instrument: Instrument,
    pub reason: ExclusionReason,
}

/// Outcome of one attempted period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period_date: NaiveDate,
    pub status: PeriodStatus,
    pub scored: usize,
    pub funded: usize,
    pub invested: f64,
    pub cumulative_invested: f64,
    pub cumulative_value: f64,
    pub exclusions: Vec<Exclusion>,
    pub shortfall: Option<BudgetShortfall>,
}

/// Portfolio totals at the end of one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    /// New money put in this period.
    pub contribution: f64,
    pub cumulative_invested: f64,
    pub cumulative_value: f64,
}

/// Fill rows plus one summary per attempted period, in chronological order.
///
/// Only the engine appends; once a run completes the ledger is read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestLedger {
    rows: Vec<LedgerRow>,
    periods: Vec<PeriodSummary>,
}

impl BacktestLedger {
    pub(crate) fn commit(&mut self, rows: Vec<LedgerRow>, summary: PeriodSummary) {
        self.rows.extend(rows);
        self.periods.push(summary);
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn periods(&self) -> &[PeriodSummary] {
        &self.periods
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn period_dates(&self) -> Vec<NaiveDate> {
        self.periods.iter().map(|p| p.period_date).collect()
    }

    pub fn value_points(&self) -> Vec<ValuePoint> {
        self.periods
            .iter()
            .map(|p| ValuePoint {
                date: p.period_date,
                contribution: p.invested,
                cumulative_invested: p.cumulative_invested,
                cumulative_value: p.cumulative_value,
            })
            .collect()
    }

    /// Distinct instruments that received at least one fill.
    pub fn instruments_bought(&self) -> usize {
        let set: std::collections::BTreeSet<&Instrument> =
            self.rows.iter().map(|r| &r.instrument).collect();
        set.len()
    }
}
