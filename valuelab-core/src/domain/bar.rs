//! Bar: the fundamental market data unit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// OHLCV bar for one instrument on one trading day. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adjusted_close: f64,
}

impl Bar {
    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.adjusted_close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Drop unusable bars and put the rest in strict date order.
///
/// Removes bars with a non-finite or non-positive close, bars whose OHLC
/// prices contradict each other and bars with zero volume (usually exchange
/// holidays echoed by the provider), sorts by date and keeps the first bar
/// seen for any duplicated date.
pub fn clean_bars(bars: Vec<Bar>) -> Vec<Bar> {
    let before = bars.len();
    let mut kept: Vec<Bar> = bars
        .into_iter()
        .filter(|b| b.close.is_finite() && b.close > 0.0 && b.volume > 0 && b.is_sane())
        .collect();
    kept.sort_by_key(|b| b.date);
    kept.dedup_by_key(|b| b.date);

    if kept.len() < before {
        tracing::debug!(before, after = kept.len(), "cleaned bar series");
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000,
            adjusted_close: 103.0,
        }
    }

    fn bar_on(day: u32, close: f64, volume: u64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
            volume,
            ..sample_bar()
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn clean_drops_zero_volume_and_bad_close() {
        let bars = vec![
            bar_on(3, 101.0, 10),
            bar_on(4, 0.0, 10),
            bar_on(5, f64::NAN, 10),
            bar_on(8, 102.0, 0),
            Bar { high: 97.0, ..bar_on(9, 100.0, 10) },
            Bar { high: 101.0, ..bar_on(10, 104.0, 10) },
        ];
        let cleaned = clean_bars(bars);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].close, 101.0);
    }

    #[test]
    fn clean_sorts_and_dedups_dates() {
        let bars = vec![bar_on(5, 103.0, 10), bar_on(3, 101.0, 10), bar_on(5, 999.0, 10)];
        let cleaned = clean_bars(bars);
        let dates: Vec<u32> = cleaned.iter().map(|b| chrono::Datelike::day(&b.date)).collect();
        assert_eq!(dates, vec![3, 5]);
        assert_eq!(cleaned[1].close, 103.0);
    }
}
