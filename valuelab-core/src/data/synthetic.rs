//! Synthetic bars for development and demos.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::{Bar, Instrument};

/// Generate a weekday-only random walk starting at 100.0.
///
/// Seeded from the instrument, so the same instrument and range always
/// produce the same series. Results built on these bars must be tagged
/// synthetic by the caller.
pub fn generate_synthetic_bars(instrument: &Instrument, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    let seed_bytes = blake3::hash(instrument.file_stem().as_bytes());
    let seed: [u8; 32] = *seed_bytes.as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == Weekday::Sat || weekday == Weekday::Sun {
            current += Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar { date: current, open, high, low, close, volume, adjusted_close: close });

        price = close;
        current += Duration::days(1);
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_per_instrument() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let a = generate_synthetic_bars(&Instrument::new("SPY", "US"), start, end);
        let b = generate_synthetic_bars(&Instrument::new("SPY", "US"), start, end);
        let c = generate_synthetic_bars(&Instrument::new("QQQ", "US"), start, end);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn skips_weekends_and_stays_sane() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let bars = generate_synthetic_bars(&Instrument::new("SPY", "US"), start, end);
        assert_eq!(bars.len(), 23);
        assert!(bars.iter().all(|b| b.is_sane()));
        assert!(bars.iter().all(|b| !matches!(b.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }
}
