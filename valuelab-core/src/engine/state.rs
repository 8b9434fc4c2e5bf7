//! Mutable simulation state and the engine's lifecycle phase.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::PriceStore;
use crate::domain::Instrument;

/// Where the engine is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePhase {
    Initialized,
    /// Next period to process.
    Running { period_index: usize },
    Completed,
    Aborted { period_index: usize },
}

/// Portfolio state carried from one period to the next.
///
/// Owned exclusively by the engine; updated once per committed period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub period_date: Option<NaiveDate>,
    /// Fractional shares held per instrument.
    pub holdings: BTreeMap<Instrument, f64>,
    /// Last price each holding was valued at.
    pub last_prices: BTreeMap<Instrument, f64>,
    pub cumulative_invested: f64,
    pub cumulative_value: f64,
}

impl SimulationState {
    pub fn buy(&mut self, instrument: &Instrument, amount: f64, price: f64) -> f64 {
        let shares = amount / price;
        *self.holdings.entry(instrument.clone()).or_insert(0.0) += shares;
        self.last_prices.insert(instrument.clone(), price);
        self.cumulative_invested += amount;
        shares
    }

    /// Value every holding at its close on `date`.
    ///
    /// A holding without a close on or before `date` keeps its last known price.
    pub fn revalue<S: PriceStore + ?Sized>(&mut self, store: &S, date: NaiveDate) -> f64 {
        let mut total = 0.0;
        for (instrument, shares) in &self.holdings {
            let price = match store.get_close(instrument, date) {
                Ok(p) if p.is_finite() && p > 0.0 => p,
                _ => {
                    tracing::warn!(%instrument, %date, "no close for holding; using last known price");
                    self.last_prices.get(instrument).copied().unwrap_or(0.0)
                }
            };
            self.last_prices.insert(instrument.clone(), price);
            total += shares * price;
        }
        self.period_date = Some(date);
        self.cumulative_value = total;
        total
    }
}
