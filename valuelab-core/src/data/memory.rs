//! In-memory price store over cleaned, date-sorted bar series.

use std::collections::{BTreeSet, HashMap};

use chrono::{Duration, NaiveDate};

use super::provider::{DataError, PriceStore};
use crate::domain::{clean_bars, Bar, Instrument, PriceWindow};

#[derive(Debug, Default, Clone)]
pub struct InMemoryPriceStore {
    series: HashMap<Instrument, Vec<Bar>>,
    calendar: BTreeSet<NaiveDate>,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) an instrument's history. Bars are cleaned first.
    pub fn insert(&mut self, instrument: Instrument, bars: Vec<Bar>) {
        let bars = clean_bars(bars);
        self.calendar.extend(bars.iter().map(|b| b.date));
        self.series.insert(instrument, bars);
    }

    pub fn with_series(mut self, instrument: Instrument, bars: Vec<Bar>) -> Self {
        self.insert(instrument, bars);
        self
    }

    pub fn instruments(&self) -> Vec<&Instrument> {
        let mut v: Vec<&Instrument> = self.series.keys().collect();
        v.sort();
        v
    }

    pub fn bars(&self, instrument: &Instrument) -> Option<&[Bar]> {
        self.series.get(instrument).map(|v| v.as_slice())
    }

    pub fn contains(&self, instrument: &Instrument) -> bool {
        self.series.contains_key(instrument)
    }

    /// Instruments in sorted order paired with their bars.
    pub fn iter_sorted(&self) -> Vec<(&Instrument, &[Bar])> {
        let mut v: Vec<(&Instrument, &[Bar])> =
            self.series.iter().map(|(i, b)| (i, b.as_slice())).collect();
        v.sort_by(|a, b| a.0.cmp(b.0));
        v
    }

    /// Date range over which every given instrument can be scored.
    ///
    /// Start is the latest date at bar index `warmup_bars` (the first date with
    /// a full lookback behind it); end is the earliest last bar. Instruments
    /// with no bars are ignored. Returns `None` if nothing is loaded.
    pub fn available_range(
        &self,
        instruments: &[Instrument],
        warmup_bars: usize,
    ) -> Option<(NaiveDate, NaiveDate)> {
        let mut start: Option<NaiveDate> = None;
        let mut end: Option<NaiveDate> = None;
        for inst in instruments {
            let Some(bars) = self.series.get(inst) else { continue };
            let Some(last) = bars.last() else { continue };
            let first_scoreable = bars.get(warmup_bars).unwrap_or(last).date;
            start = Some(start.map_or(first_scoreable, |s| s.max(first_scoreable)));
            end = Some(end.map_or(last.date, |e| e.min(last.date)));
        }
        start.zip(end)
    }

    fn series_for(&self, instrument: &Instrument) -> Result<&[Bar], DataError> {
        self.series
            .get(instrument)
            .map(|v| v.as_slice())
            .ok_or_else(|| DataError::not_found(instrument, "no price history loaded"))
    }
}

impl PriceStore for InMemoryPriceStore {
    fn get_window(
        &self,
        instrument: &Instrument,
        as_of: NaiveDate,
        lookback_days: u32,
    ) -> Result<PriceWindow, DataError> {
        let bars = self.series_for(instrument)?;
        let start = as_of - Duration::days(i64::from(lookback_days));
        let lo = bars.partition_point(|b| b.date <= start);
        let hi = bars.partition_point(|b| b.date <= as_of);
        let slice: &[Bar] = if lo < hi { &bars[lo..hi] } else { &[] };
        Ok(PriceWindow::new(instrument.clone(), slice.to_vec())?)
    }

    fn get_close(&self, instrument: &Instrument, date: NaiveDate) -> Result<f64, DataError> {
        let bars = self.series_for(instrument)?;
        let idx = bars.partition_point(|b| b.date <= date);
        if idx == 0 {
            return Err(DataError::not_found(instrument, format!("no bar on or before {date}")));
        }
        Ok(bars[idx - 1].close)
    }

    fn next_trading_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.calendar.range(date..).next().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn bar(date: NaiveDate, close: f64) -> Bar {
        Bar {
            date,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
            adjusted_close: close,
        }
    }

    fn store() -> (InMemoryPriceStore, Instrument) {
        let spy = Instrument::new("SPY", "US");
        let bars = vec![bar(d(1, 2), 10.0), bar(d(1, 3), 11.0), bar(d(1, 5), 12.0), bar(d(2, 1), 13.0)];
        (InMemoryPriceStore::new().with_series(spy.clone(), bars), spy)
    }

    #[test]
    fn window_covers_half_open_lookback() {
        let (store, spy) = store();
        // (Jan 2, Jan 5] with a 3-day lookback
        let w = store.get_window(&spy, d(1, 5), 3).unwrap();
        assert_eq!(w.len(), 2);
        assert_eq!(w.bars()[0].date, d(1, 3));
    }

    #[test]
    fn window_for_unknown_instrument_is_not_found() {
        let (store, _) = store();
        let err = store.get_window(&Instrument::new("QQQ", "US"), d(1, 5), 90).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn close_uses_latest_bar_on_or_before() {
        let (store, spy) = store();
        assert_eq!(store.get_close(&spy, d(1, 4)).unwrap(), 11.0);
        assert_eq!(store.get_close(&spy, d(1, 5)).unwrap(), 12.0);
        assert!(store.get_close(&spy, d(1, 1)).unwrap_err().is_not_found());
    }

    #[test]
    fn next_trading_day_moves_forward() {
        let (store, _) = store();
        assert_eq!(store.next_trading_day(d(1, 4)), Some(d(1, 5)));
        assert_eq!(store.next_trading_day(d(1, 5)), Some(d(1, 5)));
        assert_eq!(store.next_trading_day(d(2, 2)), None);
    }

    #[test]
    fn available_range_intersects_instruments() {
        let (mut store, spy) = store();
        let qqq = Instrument::new("QQQ", "US");
        store.insert(qqq.clone(), vec![bar(d(1, 3), 1.0), bar(d(1, 5), 1.0), bar(d(1, 20), 1.0)]);
        let range = store.available_range(&[spy, qqq], 1).unwrap();
        assert_eq!(range, (d(1, 5), d(1, 20)));
    }
}
