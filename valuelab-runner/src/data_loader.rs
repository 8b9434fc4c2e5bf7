//! Price loading for the runner.
//!
//! For every configured instrument:
//! 1. If `{TICKER}_{MARKET}.csv` exists in the data directory → use it
//! 2. If not and `synthetic` is set → generate a seeded random walk (tagged)
//! 3. Otherwise → record it as missing; the engine skips it with `NotFound`
//!
//! Loading fails only when no instrument at all has data.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use valuelab_core::data::{generate_synthetic_bars, CsvPriceStore, DataError, InMemoryPriceStore};
use valuelab_core::domain::Instrument;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no price data for any of {count} instruments (use --synthetic for synthetic data)")]
    NoData { count: usize },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Directory of per-instrument CSV files. `None` skips straight to the fallback.
    pub data_dir: Option<PathBuf>,
    /// Date range for synthetic bars.
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Generate synthetic bars for instruments without a file.
    pub synthetic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Csv,
    Synthetic,
}

#[derive(Debug)]
pub struct LoadedData {
    pub store: InMemoryPriceStore,
    pub sources: BTreeMap<Instrument, DataSource>,
    /// Configured instruments that ended up with no data.
    pub missing: Vec<Instrument>,
    /// BLAKE3 over all bar data, in sorted instrument order.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

pub fn load_prices(instruments: &[Instrument], opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let mut store = InMemoryPriceStore::new();
    let mut sources = BTreeMap::new();
    let mut missing = Vec::new();
    let mut has_synthetic = false;

    let csv = opts.data_dir.clone().map(CsvPriceStore::new);

    for inst in instruments {
        if let Some(csv) = &csv {
            match csv.load(inst) {
                Ok(bars) => {
                    tracing::debug!(instrument = %inst, bars = bars.len(), "loaded price file");
                    store.insert(inst.clone(), bars);
                    sources.insert(inst.clone(), DataSource::Csv);
                    continue;
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        if opts.synthetic {
            tracing::warn!(instrument = %inst, "generating synthetic data; results will be tagged as synthetic");
            store.insert(inst.clone(), generate_synthetic_bars(inst, opts.start, opts.end));
            sources.insert(inst.clone(), DataSource::Synthetic);
            has_synthetic = true;
            continue;
        }

        tracing::warn!(instrument = %inst, "no price data; instrument will be skipped");
        missing.push(inst.clone());
    }

    if sources.is_empty() {
        return Err(LoadError::NoData { count: instruments.len() });
    }

    let dataset_hash = compute_dataset_hash(&store);
    Ok(LoadedData { store, sources, missing, dataset_hash, has_synthetic })
}

/// Deterministic BLAKE3 hash over dates and OHLCV values.
pub fn compute_dataset_hash(store: &InMemoryPriceStore) -> String {
    let mut hasher = blake3::Hasher::new();
    for (inst, bars) in store.iter_sorted() {
        hasher.update(inst.file_stem().as_bytes());
        for bar in bars {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
            hasher.update(&bar.adjusted_close.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
