//! Scored strategy versus the equal-weight DCA baseline.

use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub strategy: Metrics,
    pub baseline: Metrics,
    /// Strategy total return minus baseline total return.
    pub excess_total_return: f64,
    pub excess_annualized_return: f64,
}

impl StrategyComparison {
    pub fn new(strategy: Metrics, baseline: Metrics) -> Self {
        Self {
            excess_total_return: strategy.total_return - baseline.total_return,
            excess_annualized_return: strategy.annualized_return - baseline.annualized_return,
            strategy,
            baseline,
        }
    }

    pub fn outperformed(&self) -> bool {
        self.excess_total_return > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use valuelab_core::engine::ValuePoint;

    fn run(final_value: f64) -> Metrics {
        let d0 = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        Metrics::from_points(&[
            ValuePoint { date: d0, contribution: 1000.0, cumulative_invested: 1000.0, cumulative_value: 1000.0 },
            ValuePoint { date: d1, contribution: 0.0, cumulative_invested: 1000.0, cumulative_value: final_value },
        ])
    }

    #[test]
    fn excess_is_strategy_minus_baseline() {
        let cmp = StrategyComparison::new(run(1200.0), run(1100.0));
        assert!((cmp.excess_total_return - 0.1).abs() < 1e-12);
        assert!(cmp.excess_annualized_return > 0.0);
        assert!(cmp.outperformed());
    }

    #[test]
    fn equal_runs_do_not_outperform() {
        let cmp = StrategyComparison::new(run(1100.0), run(1100.0));
        assert_eq!(cmp.excess_total_return, 0.0);
        assert!(!cmp.outperformed());
    }
}
