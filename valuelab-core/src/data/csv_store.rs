//! CSV-backed price store.
//!
//! Layout: one file per instrument, `{dir}/{TICKER}_{MARKET}.csv`, with the
//! header `date,open,high,low,close,volume,adjusted_close` and ISO dates.

use std::fs;
use std::path::{Path, PathBuf};

use super::memory::InMemoryPriceStore;
use super::provider::DataError;
use crate::domain::{Bar, Instrument};

/// Directory of per-instrument CSV files.
#[derive(Debug, Clone)]
pub struct CsvPriceStore {
    dir: PathBuf,
}

impl CsvPriceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, instrument: &Instrument) -> PathBuf {
        self.dir.join(format!("{}.csv", instrument.file_stem()))
    }

    pub fn has(&self, instrument: &Instrument) -> bool {
        self.path_for(instrument).is_file()
    }

    /// Load one instrument's bars. A missing file is `NotFound`.
    pub fn load(&self, instrument: &Instrument) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(instrument);
        if !path.is_file() {
            return Err(DataError::not_found(
                instrument,
                format!("no price file at {}", path.display()),
            ));
        }
        read_bars_csv(&path)
    }

    /// Persist one instrument's bars, replacing any existing file.
    pub fn save(&self, instrument: &Instrument, bars: &[Bar]) -> Result<(), DataError> {
        fs::create_dir_all(&self.dir)
            .map_err(|source| DataError::Io { path: self.dir.clone(), source })?;
        write_bars_csv(&self.path_for(instrument), bars)
    }

    /// Load every instrument that has a file into an in-memory store.
    ///
    /// Returns the store and the instruments that had no file.
    pub fn load_all(
        &self,
        instruments: &[Instrument],
    ) -> Result<(InMemoryPriceStore, Vec<Instrument>), DataError> {
        let mut store = InMemoryPriceStore::new();
        let mut missing = Vec::new();
        for inst in instruments {
            match self.load(inst) {
                Ok(bars) => store.insert(inst.clone(), bars),
                Err(e) if e.is_not_found() => {
                    tracing::warn!(instrument = %inst, "no price file found");
                    missing.push(inst.clone());
                }
                Err(e) => return Err(e),
            }
        }
        Ok((store, missing))
    }
}

pub fn read_bars_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|source| DataError::Csv { path: path.to_path_buf(), source })?;
    let mut bars = Vec::new();
    for row in rdr.deserialize::<Bar>() {
        let bar = row.map_err(|source| DataError::Csv { path: path.to_path_buf(), source })?;
        bars.push(bar);
    }
    Ok(bars)
}

pub fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<(), DataError> {
    let csv_err = |source| DataError::Csv { path: path.to_path_buf(), source };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    for bar in bars {
        wtr.serialize(bar).map_err(csv_err)?;
    }
    wtr.flush().map_err(|source| DataError::Io { path: path.to_path_buf(), source })
}
