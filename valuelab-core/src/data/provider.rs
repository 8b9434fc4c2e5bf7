//! Price store trait and structured error types.
//!
//! The PriceStore trait abstracts over where historical bars live (CSV files,
//! memory, a provider-backed cache) so the engine can be driven by any source
//! and mocked in tests. Stores are read-only during a backtest run.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Instrument, PriceWindow, WindowError};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("{instrument}: {detail}")]
    NotFound { instrument: Instrument, detail: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Window(#[from] WindowError),
}

impl DataError {
    pub fn not_found(instrument: &Instrument, detail: impl Into<String>) -> Self {
        Self::NotFound { instrument: instrument.clone(), detail: detail.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Read access to historical daily bars.
pub trait PriceStore: Send + Sync {
    /// Bars for `instrument` dated in `(as_of - lookback_days, as_of]`.
    fn get_window(
        &self,
        instrument: &Instrument,
        as_of: NaiveDate,
        lookback_days: u32,
    ) -> Result<PriceWindow, DataError>;

    /// Close of the latest bar dated on or before `date`.
    fn get_close(&self, instrument: &Instrument, date: NaiveDate) -> Result<f64, DataError>;

    /// First trading day on or after `date`, if any data exists that late.
    fn next_trading_day(&self, date: NaiveDate) -> Option<NaiveDate>;
}
