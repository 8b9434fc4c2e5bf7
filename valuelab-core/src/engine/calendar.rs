//! Monthly period generation.

use chrono::{Months, NaiveDate};

use crate::data::PriceStore;

/// Period dates for `[start, end]`: the start date advanced one calendar month
/// at a time (always offset from `start`, so a 31st clamps to short months
/// without drifting), each moved forward to the next trading day in `store`.
///
/// Dates whose next trading day falls after `end`, or that collapse onto an
/// already generated date, are dropped.
pub fn monthly_period_dates<S: PriceStore + ?Sized>(
    store: &S,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut i = 0u32;
    while let Some(candidate) = start.checked_add_months(Months::new(i)) {
        if candidate > end {
            break;
        }
        i += 1;
        let Some(trading_day) = store.next_trading_day(candidate) else {
            break;
        };
        if trading_day > end {
            break;
        }
        if dates.last().map_or(true, |last| trading_day > *last) {
            dates.push(trading_day);
        }
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryPriceStore;
    use crate::domain::{Bar, Instrument};
    use chrono::{Datelike, Duration, Weekday};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn weekday_store(start: NaiveDate, end: NaiveDate) -> InMemoryPriceStore {
        let mut bars = Vec::new();
        let mut day = start;
        while day <= end {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                bars.push(Bar {
                    date: day,
                    open: 1.0,
                    high: 1.0,
                    low: 1.0,
                    close: 1.0,
                    volume: 1,
                    adjusted_close: 1.0,
                });
            }
            day += Duration::days(1);
        }
        InMemoryPriceStore::new().with_series(Instrument::new("SPY", "US"), bars)
    }

    #[test]
    fn twelve_months_in_a_year() {
        let store = weekday_store(d(2023, 1, 1), d(2023, 12, 31));
        let dates = monthly_period_dates(&store, d(2023, 1, 2), d(2023, 12, 31));
        assert_eq!(dates.len(), 12);
        assert_eq!(dates[0], d(2023, 1, 2));
    }

    #[test]
    fn weekend_dates_move_forward() {
        let store = weekday_store(d(2023, 1, 1), d(2023, 12, 31));
        // 2023-04-01 is a Saturday
        let dates = monthly_period_dates(&store, d(2023, 3, 1), d(2023, 5, 31));
        assert_eq!(dates, vec![d(2023, 3, 1), d(2023, 4, 3), d(2023, 5, 1)]);
    }

    #[test]
    fn month_end_start_clamps_without_drift() {
        let store = weekday_store(d(2024, 1, 1), d(2024, 6, 30));
        let dates = monthly_period_dates(&store, d(2024, 1, 31), d(2024, 5, 31));
        // Feb 29 (Thu), Mar 31 is a Sunday -> Apr 1, Apr 30, May 31
        assert_eq!(
            dates,
            vec![d(2024, 1, 31), d(2024, 2, 29), d(2024, 4, 1), d(2024, 4, 30), d(2024, 5, 31)]
        );
    }

    #[test]
    fn stops_when_data_runs_out() {
        let store = weekday_store(d(2023, 1, 1), d(2023, 3, 15));
        let dates = monthly_period_dates(&store, d(2023, 1, 2), d(2023, 12, 31));
        assert_eq!(dates.len(), 3);
    }
}
