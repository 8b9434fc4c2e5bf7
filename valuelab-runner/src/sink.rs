//! JSONL record sink: one JSON object per line, append-only.
//!
//! Writes `scores.jsonl` and `ledger.jsonl` into a directory. Each committed
//! period is flushed before the engine moves on.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use valuelab_core::domain::ScoreRecord;
use valuelab_core::engine::{LedgerRow, RecordSink, SinkError};

pub const SCORES_FILE: &str = "scores.jsonl";
pub const LEDGER_FILE: &str = "ledger.jsonl";

pub struct JsonlSink {
    dir: PathBuf,
    scores: BufWriter<File>,
    fills: BufWriter<File>,
}

impl JsonlSink {
    /// Open (creating if needed) both files in `dir` for appending.
    pub fn open(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let append = |name: &str| -> io::Result<BufWriter<File>> {
            let file = OpenOptions::new().create(true).append(true).open(dir.join(name))?;
            Ok(BufWriter::new(file))
        };
        Ok(Self { dir: dir.to_path_buf(), scores: append(SCORES_FILE)?, fills: append(LEDGER_FILE)? })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordSink for JsonlSink {
    fn write_score(&mut self, record: &ScoreRecord) -> Result<(), SinkError> {
        let json = serde_json::to_string(record)?;
        writeln!(self.scores, "{json}")?;
        Ok(())
    }

    fn write_fill(&mut self, row: &LedgerRow) -> Result<(), SinkError> {
        let json = serde_json::to_string(row)?;
        writeln!(self.fills, "{json}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.scores.flush()?;
        self.fills.flush()?;
        Ok(())
    }
}

/// Read every record from a JSONL file. Malformed lines are logged and skipped.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> io::Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut out = Vec::new();
    for (lineno, line) in io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => out.push(record),
            Err(e) => tracing::warn!(path = %path.display(), line = lineno + 1, error = %e, "skipping malformed record"),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use valuelab_core::domain::Instrument;

    fn row(price: f64) -> LedgerRow {
        LedgerRow {
            period_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            instrument: Instrument::new("SPY", "US"),
            score: 0.6,
            allocation: 500.0,
            price,
            shares_bought: 500.0 / price,
            cumulative_invested: 500.0,
            cumulative_value: 500.0,
        }
    }

    #[test]
    fn appends_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut sink = JsonlSink::open(dir.path()).unwrap();
            sink.write_fill(&row(10.0)).unwrap();
            sink.flush().unwrap();
        }
        {
            let mut sink = JsonlSink::open(dir.path()).unwrap();
            sink.write_fill(&row(20.0)).unwrap();
            sink.flush().unwrap();
        }
        let rows: Vec<LedgerRow> = read_jsonl(&dir.path().join(LEDGER_FILE)).unwrap();
        assert_eq!(rows, vec![row(10.0), row(20.0)]);
    }

    #[test]
    fn skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LEDGER_FILE);
        let good = serde_json::to_string(&row(10.0)).unwrap();
        fs::write(&path, format!("{good}\nnot json\n\n{good}\n")).unwrap();
        let rows: Vec<LedgerRow> = read_jsonl(&path).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<LedgerRow> = read_jsonl(&dir.path().join("none.jsonl")).unwrap();
        assert!(rows.is_empty());
    }
}
