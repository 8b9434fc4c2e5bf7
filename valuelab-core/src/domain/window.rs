//! PriceWindow: the trailing bar history used as scoring input.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Bar, Instrument};

#[derive(Debug, Error, PartialEq)]
pub enum WindowError {
    #[error("{instrument}: bar dates must be strictly increasing ({previous} then {next})")]
    NotStrictlyIncreasing {
        instrument: Instrument,
        previous: NaiveDate,
        next: NaiveDate,
    },
}

/// Ordered bars for one instrument over a lookback period.
///
/// Invariant: dates strictly increasing, so no duplicate dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceWindow {
    instrument: Instrument,
    bars: Vec<Bar>,
}

impl PriceWindow {
    pub fn new(instrument: Instrument, bars: Vec<Bar>) -> Result<Self, WindowError> {
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(WindowError::NotStrictlyIncreasing {
                    instrument,
                    previous: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        Ok(Self { instrument, bars })
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Bars dated on or before `as_of`. Dates are sorted, so this is a prefix.
    pub fn up_to(&self, as_of: NaiveDate) -> &[Bar] {
        let end = self.bars.partition_point(|b| b.date <= as_of);
        &self.bars[..end]
    }
}

/// Close-to-close simple returns. Length is `bars.len() - 1` (empty for < 2 bars).
pub fn daily_returns(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            if w[0].close > 0.0 {
                (w[1].close - w[0].close) / w[0].close
            } else {
                0.0
            }
        })
        .collect()
}
