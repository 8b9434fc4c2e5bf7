//! Runner pipeline from a config file on disk to artifacts and JSONL sinks.

use std::path::Path;

use valuelab_core::data::{generate_synthetic_bars, CsvPriceStore};
use valuelab_core::domain::{Instrument, ScoreRecord};
use valuelab_core::engine::LedgerRow;
use valuelab_runner::sink::{LEDGER_FILE, SCORES_FILE};
use valuelab_runner::{
    export, load_options, load_prices, read_jsonl, run_backtest, AppConfig, JsonlSink,
};

const CONFIG: &str = r#"
monthly_budget = 1000.0
minimum_allocation_pct = 10.0

[backtest]
start_date = "2023-01-01"
end_date = "2023-12-31"

[tickers.US]
etfs = ["SPY", "QQQ", "IWM"]

[tickers.AU]
etfs = ["VAS.AX"]
"#;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("valuelab.toml");
    std::fs::write(&path, CONFIG).unwrap();
    path
}

fn seed_csv(dir: &Path, instruments: &[Instrument]) {
    let store = CsvPriceStore::new(dir);
    for inst in instruments {
        let start = chrono::NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        store.save(inst, &generate_synthetic_bars(inst, start, end)).unwrap();
    }
}

#[test]
fn csv_backed_run_writes_artifacts_and_sinks() {
    let tmp = tempfile::tempdir().unwrap();
    let config = AppConfig::from_file(&write_config(tmp.path())).unwrap();
    let data_dir = tmp.path().join("data");
    seed_csv(&data_dir, &config.instruments());

    let loaded = load_prices(
        &config.instruments(),
        &load_options(&config, Some(data_dir), false, None),
    )
    .unwrap();
    assert!(!loaded.has_synthetic);

    let sink_dir = tmp.path().join("records");
    let mut sink = JsonlSink::open(&sink_dir).unwrap();
    let result = run_backtest(&config, &loaded, Some(&mut sink)).unwrap();
    drop(sink);

    assert_eq!(result.ledger.periods().len(), 12);
    assert!((result.metrics().total_invested - 12_000.0).abs() < 1e-6);

    let fills: Vec<LedgerRow> = read_jsonl(&sink_dir.join(LEDGER_FILE)).unwrap();
    assert_eq!(fills.len(), result.ledger.rows().len());
    let scores: Vec<ScoreRecord> = read_jsonl(&sink_dir.join(SCORES_FILE)).unwrap();
    assert_eq!(scores.len(), 12 * 4);

    let out = export::save_artifacts(&result, &tmp.path().join("out")).unwrap();
    let back = export::load_artifacts(&out).unwrap();
    assert_eq!(back.run_id, result.run_id);
}

#[test]
fn missing_file_instrument_is_excluded_every_period() {
    let tmp = tempfile::tempdir().unwrap();
    let config = AppConfig::from_toml(CONFIG).unwrap();
    let data_dir = tmp.path().join("data");
    let mut instruments = config.instruments();
    let absent = instruments.pop().unwrap();
    seed_csv(&data_dir, &instruments);

    let loaded = load_prices(
        &config.instruments(),
        &load_options(&config, Some(data_dir), false, None),
    )
    .unwrap();
    assert_eq!(loaded.missing, vec![absent.clone()]);

    let result = run_backtest(&config, &loaded, None).unwrap();
    for period in result.ledger.periods() {
        assert!(period.exclusions.iter().any(|e| e.instrument == absent));
    }
    assert!(result.ledger.rows().iter().all(|r| r.instrument != absent));
}

#[test]
fn same_inputs_same_report() {
    let config = AppConfig::from_toml(CONFIG).unwrap();
    let opts = load_options(&config, None, true, None);
    let a = run_backtest(&config, &load_prices(&config.instruments(), &opts).unwrap(), None).unwrap();
    let b = run_backtest(&config, &load_prices(&config.instruments(), &opts).unwrap(), None).unwrap();
    assert_eq!(a.dataset_hash, b.dataset_hash);
    assert_eq!(a.ledger, b.ledger);
    assert_eq!(a.comparison, b.comparison);
}
