//! Equal-weight monthly DCA: the naive benchmark a scored strategy is judged against.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ledger::ValuePoint;
use super::state::SimulationState;
use crate::data::PriceStore;
use crate::domain::Instrument;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineRun {
    pub points: Vec<ValuePoint>,
    pub state: SimulationState,
}

impl BaselineRun {
    pub fn final_value(&self) -> f64 {
        self.state.cumulative_value
    }

    pub fn total_invested(&self) -> f64 {
        self.state.cumulative_invested
    }
}

/// Put `budget / instruments.len()` into every instrument on every date.
///
/// An instrument with no usable close on or before a date is left out for
/// that date and its share of the budget stays uninvested.
pub fn simulate_equal_weight_dca<S: PriceStore + ?Sized>(
    store: &S,
    instruments: &[Instrument],
    dates: &[NaiveDate],
    budget: f64,
) -> BaselineRun {
    let mut run = BaselineRun::default();
    if instruments.is_empty() {
        return run;
    }
    let per_instrument = budget / instruments.len() as f64;

    for &date in dates {
        let mut contribution = 0.0;
        for instrument in instruments {
            match store.get_close(instrument, date) {
                Ok(price) if price.is_finite() && price > 0.0 => {
                    run.state.buy(instrument, per_instrument, price);
                    contribution += per_instrument;
                }
                _ => tracing::debug!(%instrument, %date, "baseline: no price, share not invested"),
            }
        }
        let value = run.state.revalue(store, date);
        run.points.push(ValuePoint {
            date,
            contribution,
            cumulative_invested: run.state.cumulative_invested,
            cumulative_value: value,
        });
    }
    run
}
