//! BacktestEngine: a state machine over monthly periods.
//!
//! `Initialized → Running(0) → Running(1) → … → Completed`, or `Aborted` when
//! the strict policies are configured. Each period either commits completely
//! (scores, allocation, fills, summary) or the run stops; state is built on a
//! copy and swapped in only after every step succeeded. Sink writes follow the
//! commit, so a sink never sees records from a period the ledger lacks.
//!
//! Per period:
//! 1. fetch a lookback window and score every tracked instrument (parallel
//!    fan-out, joined before allocation)
//! 2. allocate the monthly budget over the scored set
//! 3. buy `allocation / close` fractional shares for each funded instrument
//! 4. revalue every holding at the period close
//! 5. append one ledger row per funded instrument and a period summary

use chrono::NaiveDate;
use rayon::prelude::*;
use thiserror::Error;

use super::calendar::monthly_period_dates;
use super::config::{BacktestConfig, EmptyPeriodPolicy, MissingHistoryPolicy};
use super::ledger::{
    BacktestLedger, Exclusion, ExclusionReason, LedgerRow, PeriodStatus, PeriodSummary,
};
use super::sink::{RecordSink, SinkError};
use super::state::{EnginePhase, SimulationState};
use crate::allocation::{allocate, AllocationError};
use crate::data::{DataError, PriceStore};
use crate::domain::{Instrument, ScoreRecord, SkipReason};
use crate::scoring::{Scorer, ScoringConfigError};

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("aborted at period {period}{}: {reason}", describe(.instrument))]
    AbortedAtPeriod {
        period: NaiveDate,
        instrument: Option<Instrument>,
        reason: String,
    },

    #[error("allocation failed at period {period}: {source}")]
    Allocation {
        period: NaiveDate,
        #[source]
        source: AllocationError,
    },

    /// The period is already in the ledger; the sink may hold only part of it.
    #[error("record sink failed at period {period}: {source}")]
    Sink {
        period: NaiveDate,
        #[source]
        source: SinkError,
    },

    #[error("engine is not runnable in phase {0:?}")]
    NotRunnable(EnginePhase),
}

fn describe(instrument: &Option<Instrument>) -> String {
    instrument.as_ref().map(|i| format!(" ({i})")).unwrap_or_default()
}

impl From<ScoringConfigError> for BacktestError {
    fn from(e: ScoringConfigError) -> Self {
        Self::InvalidConfiguration(e.to_string())
    }
}

/// A scored instrument with its fill price for the period.
struct Candidate {
    record: ScoreRecord,
    price: f64,
}

/// Everything one period produces, applied to the engine only on success.
struct PeriodOutcome {
    state: SimulationState,
    rows: Vec<LedgerRow>,
    summary: PeriodSummary,
    scores: Vec<ScoreRecord>,
}

pub struct BacktestEngine<'a, S: PriceStore + ?Sized> {
    config: BacktestConfig,
    scorer: Scorer,
    store: &'a S,
    periods: Vec<NaiveDate>,
    phase: EnginePhase,
    state: SimulationState,
    ledger: BacktestLedger,
    sink: Option<&'a mut dyn RecordSink>,
}

impl<'a, S: PriceStore + ?Sized> BacktestEngine<'a, S> {
    /// Validate the configuration and lay out the period calendar.
    pub fn new(config: BacktestConfig, store: &'a S) -> Result<Self, BacktestError> {
        let scorer = Scorer::new(config.scoring.clone())?;
        config
            .allocation
            .validate()
            .map_err(|e| BacktestError::InvalidConfiguration(e.to_string()))?;
        if config.start_date > config.end_date {
            return Err(BacktestError::InvalidConfiguration(format!(
                "backtest start {} is after end {}",
                config.start_date, config.end_date
            )));
        }
        if config.instruments.is_empty() {
            return Err(BacktestError::InvalidConfiguration("no instruments to track".into()));
        }

        let periods = monthly_period_dates(store, config.start_date, config.end_date);
        tracing::info!(
            start = %config.start_date,
            end = %config.end_date,
            periods = periods.len(),
            instruments = config.instruments.len(),
            "backtest initialized"
        );

        Ok(Self {
            config,
            scorer,
            store,
            periods,
            phase: EnginePhase::Initialized,
            state: SimulationState::default(),
            ledger: BacktestLedger::default(),
            sink: None,
        })
    }

    /// Write every committed period's scores and fills to `sink`.
    pub fn with_sink(mut self, sink: &'a mut dyn RecordSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn ledger(&self) -> &BacktestLedger {
        &self.ledger
    }

    /// Process the next period. Returns `Ok(None)` once every period is done.
    pub fn step(&mut self) -> Result<Option<&PeriodSummary>, BacktestError> {
        let index = match self.phase {
            EnginePhase::Initialized => 0,
            EnginePhase::Running { period_index } => period_index,
            EnginePhase::Completed => return Ok(None),
            aborted @ EnginePhase::Aborted { .. } => {
                return Err(BacktestError::NotRunnable(aborted))
            }
        };
        let Some(&period) = self.periods.get(index) else {
            self.phase = EnginePhase::Completed;
            tracing::info!(periods = self.ledger.periods().len(), "backtest completed");
            return Ok(None);
        };

        let outcome = match self.process_period(period) {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.abort(index, period, e)),
        };

        let fills_from = self.ledger.rows().len();
        self.state = outcome.state;
        self.ledger.commit(outcome.rows, outcome.summary);
        self.phase = EnginePhase::Running { period_index: index + 1 };

        if let Err(source) = self.write_committed(&outcome.scores, fills_from) {
            return Err(self.abort(index, period, BacktestError::Sink { period, source }));
        }
        Ok(self.ledger.periods().last())
    }

    fn abort(&mut self, index: usize, period: NaiveDate, e: BacktestError) -> BacktestError {
        tracing::error!(%period, error = %e, "backtest aborted");
        self.phase = EnginePhase::Aborted { period_index: index };
        e
    }

    /// Hand the scores and the ledger rows from `fills_from` onward to the sink.
    fn write_committed(
        &mut self,
        scores: &[ScoreRecord],
        fills_from: usize,
    ) -> Result<(), SinkError> {
        let Some(sink) = self.sink.as_deref_mut() else {
            return Ok(());
        };
        for record in scores {
            sink.write_score(record)?;
        }
        for row in &self.ledger.rows()[fills_from..] {
            sink.write_fill(row)?;
        }
        sink.flush()
    }

    /// Run every remaining period and hand back the finished ledger.
    pub fn run(mut self) -> Result<BacktestLedger, BacktestError> {
        while self.step()?.is_some() {}
        Ok(self.ledger)
    }

    fn process_period(&self, period: NaiveDate) -> Result<PeriodOutcome, BacktestError> {
        let scorer = &self.scorer;
        let store = self.store;
        let lookback = self.config.scoring.lookback_days;
        let evaluated: Vec<(Instrument, Result<Candidate, SkipReason>)> = self
            .config
            .instruments
            .par_iter()
            .map(|inst| (inst.clone(), evaluate(scorer, store, lookback, inst, period)))
            .collect();

        let mut candidates = Vec::with_capacity(evaluated.len());
        let mut exclusions = Vec::new();
        for (instrument, result) in evaluated {
            match result {
                Ok(c) => candidates.push(c),
                Err(reason) => {
                    if self.config.history_policy == MissingHistoryPolicy::Abort {
                        return Err(BacktestError::AbortedAtPeriod {
                            period,
                            instrument: Some(instrument),
                            reason: reason.to_string(),
                        });
                    }
                    tracing::warn!(%period, %instrument, %reason, "instrument skipped for period");
                    exclusions.push(Exclusion { instrument, reason: reason.into() });
                }
            }
        }

        let mut next = self.state.clone();

        if candidates.is_empty() {
            if self.config.empty_period_policy == EmptyPeriodPolicy::Abort {
                return Err(BacktestError::AbortedAtPeriod {
                    period,
                    instrument: None,
                    reason: "no instrument could be scored".into(),
                });
            }
            let value = next.revalue(self.store, period);
            tracing::warn!(%period, "no instrument could be scored; period skipped");
            let summary = PeriodSummary {
                period_date: period,
                status: PeriodStatus::Skipped,
                scored: 0,
                funded: 0,
                invested: 0.0,
                cumulative_invested: next.cumulative_invested,
                cumulative_value: value,
                exclusions,
                shortfall: None,
            };
            return Ok(PeriodOutcome {
                state: next,
                rows: Vec::new(),
                summary,
                scores: Vec::new(),
            });
        }

        let scores: Vec<(Instrument, f64)> = candidates
            .iter()
            .map(|c| (c.record.instrument.clone(), c.record.final_score))
            .collect();
        let alloc = &self.config.allocation;
        let allocation = allocate(&scores, alloc.monthly_budget, alloc.minimum_allocation_pct)
            .map_err(|source| BacktestError::Allocation { period, source })?;

        if let Some(shortfall) = &allocation.shortfall {
            for instrument in &shortfall.excluded {
                exclusions.push(Exclusion {
                    instrument: instrument.clone(),
                    reason: ExclusionReason::BudgetInsufficient,
                });
            }
        }

        let mut fills = Vec::new();
        let mut invested = 0.0;
        for c in &candidates {
            let amount = allocation.map.get(&c.record.instrument).unwrap_or(0.0);
            if amount <= 0.0 {
                continue;
            }
            let shares = next.buy(&c.record.instrument, amount, c.price);
            invested += amount;
            fills.push((c, amount, shares));
        }
        let value = next.revalue(self.store, period);

        let rows: Vec<LedgerRow> = fills
            .into_iter()
            .map(|(c, amount, shares)| LedgerRow {
                period_date: period,
                instrument: c.record.instrument.clone(),
                score: c.record.final_score,
                allocation: amount,
                price: c.price,
                shares_bought: shares,
                cumulative_invested: next.cumulative_invested,
                cumulative_value: value,
            })
            .collect();

        tracing::info!(
            %period,
            scored = candidates.len(),
            funded = rows.len(),
            invested,
            cumulative_invested = next.cumulative_invested,
            cumulative_value = value,
            "period committed"
        );

        let summary = PeriodSummary {
            period_date: period,
            status: PeriodStatus::Committed,
            scored: candidates.len(),
            funded: rows.len(),
            invested,
            cumulative_invested: next.cumulative_invested,
            cumulative_value: value,
            exclusions,
            shortfall: allocation.shortfall,
        };
        let scores = candidates.into_iter().map(|c| c.record).collect();
        Ok(PeriodOutcome { state: next, rows, summary, scores })
    }
}

fn evaluate<S: PriceStore + ?Sized>(
    scorer: &Scorer,
    store: &S,
    lookback_days: u32,
    instrument: &Instrument,
    period: NaiveDate,
) -> Result<Candidate, SkipReason> {
    let window = store
        .get_window(instrument, period, lookback_days)
        .map_err(skip_from_data)?;
    let record = scorer.score(&window, period)?;
    let price = store.get_close(instrument, period).map_err(skip_from_data)?;
    if !price.is_finite() || price <= 0.0 {
        return Err(SkipReason::NotFound { detail: format!("unusable close {price} on {period}") });
    }
    Ok(Candidate { record, price })
}

fn skip_from_data(e: DataError) -> SkipReason {
    SkipReason::NotFound { detail: e.to_string() }
}
