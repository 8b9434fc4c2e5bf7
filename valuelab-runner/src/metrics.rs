//! Performance metrics: pure functions over a completed run's value series.
//!
//! Every metric takes the per-period `ValuePoint`s (or the plain value curve)
//! and returns a scalar. Monthly returns strip out each period's new money:
//! `r_t = (V_t - C_t) / V_{t-1} - 1`.

use serde::{Deserialize, Serialize};
use valuelab_core::engine::{BacktestLedger, PeriodStatus, ValuePoint};

const PERIODS_PER_YEAR: f64 = 12.0;
const DAYS_PER_YEAR: f64 = 365.25;
/// Deviations at or below this are treated as no variance at all.
const ZERO_DEVIATION: f64 = 1e-12;

/// Aggregate statistics for a strategy run or a baseline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_invested: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    /// `None` when monthly returns have zero variance or fewer than two exist.
    pub sharpe_ratio: Option<f64>,
    /// `None` when there is no downside at all.
    pub sortino_ratio: Option<f64>,
    /// Largest peak-to-trough decline, as a positive fraction.
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub elapsed_days: i64,
    pub periods: usize,
    pub periods_committed: usize,
    pub periods_skipped: usize,
    pub fills: usize,
    pub instruments_bought: usize,
    pub monthly_returns: Vec<f64>,
}

impl Metrics {
    /// Metrics of a completed backtest ledger.
    pub fn compute(ledger: &BacktestLedger) -> Self {
        let mut metrics = Self::from_points(&ledger.value_points());
        metrics.periods_committed = ledger
            .periods()
            .iter()
            .filter(|p| p.status == PeriodStatus::Committed)
            .count();
        metrics.periods_skipped = metrics.periods - metrics.periods_committed;
        metrics.fills = ledger.rows().len();
        metrics.instruments_bought = ledger.instruments_bought();
        metrics
    }

    /// Return and risk metrics of any per-period value series.
    pub fn from_points(points: &[ValuePoint]) -> Self {
        let values: Vec<f64> = points.iter().map(|p| p.cumulative_value).collect();
        let returns = monthly_returns(points);
        let (total_invested, final_value) = points
            .last()
            .map(|p| (p.cumulative_invested, p.cumulative_value))
            .unwrap_or((0.0, 0.0));
        let elapsed_days = match (points.first(), points.last()) {
            (Some(first), Some(last)) => (last.date - first.date).num_days(),
            _ => 0,
        };

        Self {
            total_invested,
            final_value,
            total_return: total_return(total_invested, final_value),
            annualized_return: annualized_return(total_invested, final_value, elapsed_days),
            sharpe_ratio: sharpe_ratio(&returns),
            sortino_ratio: sortino_ratio(&returns),
            max_drawdown: max_drawdown(&values),
            win_rate: win_rate(&values),
            elapsed_days,
            periods: points.len(),
            periods_committed: points.len(),
            periods_skipped: 0,
            fills: 0,
            instruments_bought: 0,
            monthly_returns: returns,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `(final_value - invested) / invested`; 0.0 when nothing was invested.
pub fn total_return(invested: f64, final_value: f64) -> f64 {
    if invested <= 0.0 {
        return 0.0;
    }
    (final_value - invested) / invested
}

/// Compound growth of `final_value / invested` scaled to a 365.25-day year.
///
/// Returns 0.0 for a zero-length run or nothing invested, and -1.0 when
/// everything was lost.
pub fn annualized_return(invested: f64, final_value: f64, elapsed_days: i64) -> f64 {
    if invested <= 0.0 || elapsed_days <= 0 {
        return 0.0;
    }
    let growth = final_value / invested;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(DAYS_PER_YEAR / elapsed_days as f64) - 1.0
}

/// Contribution-adjusted period returns. Periods following a zero value are skipped.
pub fn monthly_returns(points: &[ValuePoint]) -> Vec<f64> {
    points
        .windows(2)
        .filter(|w| w[0].cumulative_value > 0.0)
        .map(|w| (w[1].cumulative_value - w[1].contribution) / w[0].cumulative_value - 1.0)
        .collect()
}

/// mean / sample std of monthly returns, annualized by √12.
pub fn sharpe_ratio(returns: &[f64]) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let std = std_dev(returns);
    if std <= ZERO_DEVIATION {
        return None;
    }
    Some(mean_f64(returns) / std * PERIODS_PER_YEAR.sqrt())
}

/// Like Sharpe, with the downside deviation (negative returns only) below.
pub fn sortino_ratio(returns: &[f64]) -> Option<f64> {
    if returns.len() < 2 {
        return None;
    }
    let downside_sq: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).collect();
    if downside_sq.is_empty() {
        return None;
    }
    let downside_std = (downside_sq.iter().sum::<f64>() / returns.len() as f64).sqrt();
    if downside_std <= ZERO_DEVIATION {
        return None;
    }
    Some(mean_f64(returns) / downside_std * PERIODS_PER_YEAR.sqrt())
}

/// Largest `(peak - trough) / peak` after a running maximum, as a positive fraction.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - v) / peak);
        }
    }
    max_dd
}

/// Fraction of period-to-period transitions where the value rose.
pub fn win_rate(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let wins = values.windows(2).filter(|w| w[1] > w[0]).count();
    wins as f64 / (values.len() - 1) as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
