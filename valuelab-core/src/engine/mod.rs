//! Monthly backtest engine: period calendar, simulation state machine,
//! append-only ledger, record sinks, and the equal-weight DCA baseline.

pub mod backtest;
pub mod baseline;
pub mod calendar;
pub mod config;
pub mod ledger;
pub mod sink;
pub mod state;

pub use backtest::{BacktestEngine, BacktestError};
pub use baseline::{simulate_equal_weight_dca, BaselineRun};
pub use calendar::monthly_period_dates;
pub use config::{BacktestConfig, EmptyPeriodPolicy, MissingHistoryPolicy};
pub use ledger::{
    BacktestLedger, Exclusion, ExclusionReason, LedgerRow, PeriodStatus, PeriodSummary, ValuePoint,
};
pub use sink::{MemorySink, RecordSink, SinkError};
pub use state::{EnginePhase, SimulationState};
