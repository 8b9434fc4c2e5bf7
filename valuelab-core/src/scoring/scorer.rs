//! Scorer: turns a trailing price window into a ScoreRecord.
//!
//! Every sub-score is a pure function of a bar slice, so scoring the same
//! window on the same date twice is bit-identical. All outputs lie in [0, 1].

use chrono::NaiveDate;
use rayon::prelude::*;

use super::config::{ScoringConfig, ScoringConfigError};
use crate::domain::window::daily_returns;
use crate::domain::{Bar, Instrument, PriceWindow, ScoreRecord, SkipReason};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Scorer bound to a validated configuration.
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
}

/// Result of scoring a set of instruments on one date.
#[derive(Debug, Clone, Default)]
pub struct ScoredUniverse {
    /// Sorted by `final_score` descending, ties by instrument.
    pub scored: Vec<ScoreRecord>,
    pub skipped: Vec<(Instrument, SkipReason)>,
}

impl Scorer {
    /// Validates the configuration; weights that do not sum to 1.0 fail here,
    /// never per call.
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score one instrument's window as of `as_of`.
    ///
    /// Only bars dated on or before `as_of` are used. Fewer than
    /// `min_window_days` of them yields `SkipReason::InsufficientHistory`.
    pub fn score(&self, window: &PriceWindow, as_of: NaiveDate) -> Result<ScoreRecord, SkipReason> {
        let bars = window.up_to(as_of);
        let required = self.config.min_window_days.max(1);
        if bars.len() < required {
            return Err(SkipReason::InsufficientHistory { available: bars.len(), required });
        }
        // non-empty: required >= 1
        let close = bars[bars.len() - 1].close;

        let price_position = price_position_score(bars);
        let momentum_decay = momentum_decay_score(bars, self.config.momentum_decay_factor);
        let volatility_adj =
            volatility_adjusted_score(price_position, bars, self.config.volatility_window);
        let volume_conf = volume_confirmation_score(bars);

        let w = &self.config.weights;
        let final_score = clamp_unit(
            price_position * w.price_position
                + momentum_decay * w.momentum_decay
                + volatility_adj * w.volatility_adjusted
                + volume_conf * w.volume_confirmation,
        );

        let instrument = window.instrument().clone();
        tracing::debug!(
            instrument = %instrument,
            %as_of,
            price_position,
            momentum_decay,
            volatility_adj,
            volume_conf,
            final_score,
            "scored"
        );

        Ok(ScoreRecord {
            date: as_of,
            market: instrument.market.clone(),
            instrument,
            price_position,
            momentum_decay,
            volatility_adj,
            volume_conf,
            final_score,
            close,
            bars: bars.len(),
        })
    }

    /// Score many windows in parallel and rank the results.
    pub fn score_universe(&self, windows: &[PriceWindow], as_of: NaiveDate) -> ScoredUniverse {
        let results: Vec<(Instrument, Result<ScoreRecord, SkipReason>)> = windows
            .par_iter()
            .map(|w| (w.instrument().clone(), self.score(w, as_of)))
            .collect();

        let mut universe = ScoredUniverse::default();
        for (instrument, result) in results {
            match result {
                Ok(record) => universe.scored.push(record),
                Err(reason) => universe.skipped.push((instrument, reason)),
            }
        }
        universe.scored.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| a.instrument.cmp(&b.instrument))
        });
        universe
    }
}

// ─── Sub-scores ─────────────────────────────────────────────────────

/// Where the last close sits in the window's high/low range; 1.0 at the low.
///
/// A zero range carries no information and scores exactly 0.5.
pub fn price_position_score(bars: &[Bar]) -> f64 {
    let Some(last) = bars.last() else {
        return 0.5;
    };
    let max_high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let min_low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let range = max_high - min_low;
    if !range.is_finite() || range <= 0.0 {
        return 0.5;
    }
    clamp_unit((max_high - last.close) / range)
}

/// Decay-weighted length of the down-day streak ending at the last bar.
///
/// The j-th consecutive down-day (counting back from the last bar) adds
/// `decay^j`. The sum is divided by the value a window made entirely of
/// down-days would reach, so a longer decline always scores higher while each
/// extra day adds less than the one before.
pub fn momentum_decay_score(bars: &[Bar], decay: f64) -> f64 {
    let returns = daily_returns(bars);
    let m = returns.len();
    if m == 0 {
        return 0.0;
    }
    let streak = returns.iter().rev().take_while(|r| **r < 0.0).count();
    if streak == 0 {
        return 0.0;
    }
    let score = if (decay - 1.0).abs() < f64::EPSILON {
        streak as f64 / m as f64
    } else {
        // geometric sums: (1 - d^k) / (1 - d) over (1 - d^m) / (1 - d)
        (1.0 - decay.powi(streak as i32)) / (1.0 - decay.powi(m as i32))
    };
    clamp_unit(score)
}

/// Position score pulled toward 0.5 by the trailing return volatility.
///
/// Uses the sample standard deviation of the last `volatility_window` daily
/// returns, annualized; the deviation from neutral is divided by
/// `1 + annualized_vol`. Zero volatility returns the position score as is.
pub fn volatility_adjusted_score(position: f64, bars: &[Bar], volatility_window: usize) -> f64 {
    let returns = daily_returns(bars);
    let tail = &returns[returns.len().saturating_sub(volatility_window)..];
    let sigma = sample_std(tail);
    if !sigma.is_finite() || sigma <= 0.0 {
        return clamp_unit(position);
    }
    let annualized = sigma * TRADING_DAYS_PER_YEAR.sqrt();
    clamp_unit(0.5 + (position - 0.5) / (1.0 + annualized))
}

/// Down-day volume relative to up-day volume, squashed with `r / (1 + r)`.
///
/// Only down-days (selling with no buying) scores 1.0; no down-days scores
/// 0.0; a window without any price change scores 0.5.
pub fn volume_confirmation_score(bars: &[Bar]) -> f64 {
    let mut down = (0.0_f64, 0usize);
    let mut up = (0.0_f64, 0usize);
    for pair in bars.windows(2) {
        let volume = pair[1].volume as f64;
        if pair[1].close < pair[0].close {
            down.0 += volume;
            down.1 += 1;
        } else if pair[1].close > pair[0].close {
            up.0 += volume;
            up.1 += 1;
        }
    }
    match (down.1, up.1) {
        (0, 0) => 0.5,
        (0, _) => 0.0,
        (_, 0) => 1.0,
        (dn, un) => {
            let avg_down = down.0 / dn as f64;
            let avg_up = up.0 / un as f64;
            if avg_up <= 0.0 {
                return if avg_down > 0.0 { 1.0 } else { 0.5 };
            }
            let ratio = avg_down / avg_up;
            clamp_unit(ratio / (1.0 + ratio))
        }
    }
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
