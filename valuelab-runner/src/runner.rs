//! Run orchestration: wires configuration, loaded prices, engine, and metrics.
//!
//! Three entry points, one per CLI subcommand:
//! - `score_universe()`: rank every configured instrument as of a date.
//! - `allocate_now()`: score, then split one month's budget.
//! - `run_backtest()`: full monthly replay plus the DCA baseline comparison.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use valuelab_core::allocation::{allocate, AllocationError, BudgetShortfall, Concentration};
use valuelab_core::data::{InMemoryPriceStore, PriceStore};
use valuelab_core::domain::{Instrument, SkipReason};
use valuelab_core::engine::{
    simulate_equal_weight_dca, BacktestEngine, BacktestError, BacktestLedger, RecordSink,
};
use valuelab_core::scoring::{ScoredUniverse, Scorer, ScoringConfigError};

use crate::comparison::StrategyComparison;
use crate::config::{AppConfig, ConfigError, RunId};
use crate::data_loader::{LoadError, LoadOptions, LoadedData};
use crate::metrics::Metrics;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("scoring config error: {0}")]
    Scoring(#[from] ScoringConfigError),
    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
    #[error("loaded data cannot score any date in {start}..={end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    /// Configured instruments with no price data at all.
    pub missing: Vec<Instrument>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub comparison: StrategyComparison,
    pub ledger: BacktestLedger,
}

impl BacktestResult {
    pub fn metrics(&self) -> &Metrics {
        &self.comparison.strategy
    }
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// One line of a monthly allocation plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRow {
    pub instrument: Instrument,
    pub score: f64,
    pub amount: f64,
    /// Share of the allocated total.
    pub weight: f64,
    pub price: f64,
    /// Fractional shares the amount buys at `price`.
    pub shares: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub as_of: NaiveDate,
    pub budget: f64,
    /// Highest score first.
    pub rows: Vec<AllocationRow>,
    pub concentration: Concentration,
    pub shortfall: Option<BudgetShortfall>,
    pub skipped: Vec<(Instrument, SkipReason)>,
}

/// Load options covering the backtest range, `through`, and a lookback warmup.
pub fn load_options(
    config: &AppConfig,
    data_dir: Option<std::path::PathBuf>,
    synthetic: bool,
    through: Option<NaiveDate>,
) -> LoadOptions {
    let mut start = config.backtest.start_date;
    let mut end = config.backtest.end_date;
    if let Some(date) = through {
        start = start.min(date);
        end = end.max(date);
    }
    LoadOptions {
        data_dir,
        start: start - Duration::days(2 * i64::from(config.lookback_days)),
        end,
        synthetic,
    }
}

/// Backtest date range, intersected with the data's scoreable span when
/// `clamp_to_data` is set.
pub fn effective_range(
    config: &AppConfig,
    store: &InMemoryPriceStore,
) -> Result<(NaiveDate, NaiveDate), RunError> {
    let (start, end) = (config.backtest.start_date, config.backtest.end_date);
    if !config.backtest.clamp_to_data {
        return Ok((start, end));
    }
    let Some((data_start, data_end)) =
        store.available_range(&config.instruments(), config.min_window_days)
    else {
        return Err(RunError::EmptyRange { start, end });
    };
    let clamped = (start.max(data_start), end.min(data_end));
    if clamped.0 > clamped.1 {
        return Err(RunError::EmptyRange { start, end });
    }
    if clamped != (start, end) {
        tracing::info!(from = %clamped.0, to = %clamped.1, "backtest range clamped to available data");
    }
    Ok(clamped)
}

/// Score every configured instrument as of `as_of`.
pub fn score_universe<S: PriceStore + ?Sized>(
    config: &AppConfig,
    store: &S,
    as_of: NaiveDate,
) -> Result<ScoredUniverse, RunError> {
    let scorer = Scorer::new(config.scoring_config())?;
    let mut windows = Vec::new();
    let mut not_found = Vec::new();
    for inst in config.instruments() {
        match store.get_window(&inst, as_of, config.lookback_days) {
            Ok(w) => windows.push(w),
            Err(e) => {
                tracing::warn!(instrument = %inst, error = %e, "no price window");
                not_found.push((inst, SkipReason::NotFound { detail: e.to_string() }));
            }
        }
    }
    let mut universe = scorer.score_universe(&windows, as_of);
    universe.skipped.extend(not_found);
    universe.skipped.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(universe)
}

/// Score, then split one month's budget across the scored instruments.
pub fn allocate_now<S: PriceStore + ?Sized>(
    config: &AppConfig,
    store: &S,
    as_of: NaiveDate,
) -> Result<AllocationPlan, RunError> {
    let universe = score_universe(config, store, as_of)?;
    let alloc_config = config.allocation_config();
    let scores: Vec<(Instrument, f64)> = universe
        .scored
        .iter()
        .map(|r| (r.instrument.clone(), r.final_score))
        .collect();
    let allocation = allocate(&scores, alloc_config.monthly_budget, alloc_config.minimum_allocation_pct)?;

    let total = allocation.map.total();
    let rows = universe
        .scored
        .iter()
        .filter_map(|r| {
            let amount = allocation.map.get(&r.instrument)?;
            Some(AllocationRow {
                instrument: r.instrument.clone(),
                score: r.final_score,
                amount,
                weight: if total > 0.0 { amount / total } else { 0.0 },
                price: r.close,
                shares: if r.close > 0.0 { amount / r.close } else { 0.0 },
            })
        })
        .collect();

    Ok(AllocationPlan {
        as_of,
        budget: alloc_config.monthly_budget,
        rows,
        concentration: Concentration::of(&allocation.map),
        shortfall: allocation.shortfall,
        skipped: universe.skipped,
    })
}

/// Replay the strategy month by month, then the DCA baseline over the same dates.
pub fn run_backtest(
    config: &AppConfig,
    loaded: &LoadedData,
    sink: Option<&mut dyn RecordSink>,
) -> Result<BacktestResult, RunError> {
    let (start, end) = effective_range(config, &loaded.store)?;
    let mut bt_config = config.backtest_config();
    bt_config.start_date = start;
    bt_config.end_date = end;
    let instruments = bt_config.instruments.clone();
    let budget = bt_config.allocation.monthly_budget;

    let mut engine = BacktestEngine::new(bt_config, &loaded.store)?;
    if let Some(sink) = sink {
        engine = engine.with_sink(sink);
    }
    let ledger = engine.run()?;

    let baseline = simulate_equal_weight_dca(&loaded.store, &instruments, &ledger.period_dates(), budget);
    let comparison =
        StrategyComparison::new(Metrics::compute(&ledger), Metrics::from_points(&baseline.points));

    tracing::info!(
        total_return = comparison.strategy.total_return,
        baseline_return = comparison.baseline.total_return,
        periods = ledger.periods().len(),
        "backtest finished"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
        missing: loaded.missing.clone(),
        start_date: start,
        end_date: end,
        comparison,
        ledger,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::load_prices;

    const CONFIG: &str = r#"
monthly_budget = 1000.0
minimum_allocation_pct = 5.0

[backtest]
start_date = "2023-01-01"
end_date = "2023-06-30"

[tickers.US]
etfs = ["SPY", "QQQ", "IWM"]
"#;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn setup() -> (AppConfig, LoadedData) {
        let config = AppConfig::from_toml(CONFIG).unwrap();
        let opts = load_options(&config, None, true, None);
        let loaded = load_prices(&config.instruments(), &opts).unwrap();
        (config, loaded)
    }

    #[test]
    fn load_options_cover_warmup_and_as_of() {
        let config = AppConfig::from_toml(CONFIG).unwrap();
        let opts = load_options(&config, None, true, Some(d(2024, 3, 1)));
        assert_eq!(opts.start, d(2023, 1, 1) - Duration::days(180));
        assert_eq!(opts.end, d(2024, 3, 1));
    }

    #[test]
    fn score_universe_ranks_descending() {
        let (config, loaded) = setup();
        let universe = score_universe(&config, &loaded.store, d(2023, 6, 1)).unwrap();
        assert_eq!(universe.scored.len(), 3);
        assert!(universe
            .scored
            .windows(2)
            .all(|w| w[0].final_score >= w[1].final_score));
    }

    #[test]
    fn allocation_plan_spends_budget() {
        let (config, loaded) = setup();
        let plan = allocate_now(&config, &loaded.store, d(2023, 6, 1)).unwrap();
        let total: f64 = plan.rows.iter().map(|r| r.amount).sum();
        assert!((total - 1000.0).abs() < 1e-6);
        assert!(plan.rows.iter().all(|r| r.amount >= 50.0 - 1e-9));
        let weights: f64 = plan.rows.iter().map(|r| r.weight).sum();
        assert!((weights - 1.0).abs() < 1e-9);
        assert!(plan.shortfall.is_none());
        assert!(plan.concentration.herfindahl_index >= 1.0 / 3.0 - 1e-9);
    }

    #[test]
    fn backtest_compares_against_baseline() {
        let (config, loaded) = setup();
        let result = run_backtest(&config, &loaded, None).unwrap();
        assert!(result.has_synthetic);
        assert_eq!(result.ledger.periods().len(), 6);
        assert!((result.metrics().total_invested - 6000.0).abs() < 1e-6);
        assert!((result.comparison.baseline.total_invested - 6000.0).abs() < 1e-6);
        assert_eq!(result.comparison.baseline.periods, 6);
        assert_eq!(result.run_id, config.run_id());
    }

    #[test]
    fn clamp_to_data_narrows_range() {
        let mut config = AppConfig::from_toml(CONFIG).unwrap();
        config.backtest.clamp_to_data = true;
        config.backtest.start_date = d(2000, 1, 1);
        let opts = LoadOptions { data_dir: None, start: d(2022, 10, 1), end: d(2023, 6, 30), synthetic: true };
        let loaded = load_prices(&config.instruments(), &opts).unwrap();
        let (start, end) = effective_range(&config, &loaded.store).unwrap();
        assert!(start > d(2022, 10, 1));
        assert_eq!(end, d(2023, 6, 30));
    }

    #[test]
    fn clamp_with_no_overlap_is_an_error() {
        let mut config = AppConfig::from_toml(CONFIG).unwrap();
        config.backtest.clamp_to_data = true;
        let opts = LoadOptions { data_dir: None, start: d(2020, 1, 1), end: d(2020, 6, 30), synthetic: true };
        let loaded = load_prices(&config.instruments(), &opts).unwrap();
        assert!(matches!(effective_range(&config, &loaded.store), Err(RunError::EmptyRange { .. })));
    }
}
