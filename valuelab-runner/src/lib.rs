//! ValueLab Runner: run orchestration on top of `valuelab-core`.
//!
//! This crate provides:
//! - TOML configuration with load-time validation and a content-hash run id
//! - Price loading from per-instrument CSV files with a synthetic fallback
//! - Return and risk metrics over a completed ledger
//! - Strategy versus equal-weight DCA comparison
//! - JSONL record sinks and JSON/CSV/text artifacts

pub mod comparison;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sink;

pub use comparison::StrategyComparison;
pub use config::{AppConfig, BacktestSection, ConfigError, RunId};
pub use data_loader::{compute_dataset_hash, load_prices, DataSource, LoadError, LoadOptions, LoadedData};
pub use metrics::Metrics;
pub use runner::{
    allocate_now, effective_range, load_options, run_backtest, score_universe, AllocationPlan,
    AllocationRow, BacktestResult, RunError, SCHEMA_VERSION,
};
pub use sink::{read_jsonl, JsonlSink};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn metrics_is_send_sync() {
        assert_send::<Metrics>();
        assert_sync::<Metrics>();
        assert_send::<StrategyComparison>();
        assert_sync::<StrategyComparison>();
    }

    #[test]
    fn results_are_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
        assert_send::<AllocationPlan>();
        assert_sync::<AllocationPlan>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<AppConfig>();
        assert_sync::<AppConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }
}
