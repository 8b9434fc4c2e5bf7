//! Append-only destinations for score records and ledger rows.

use thiserror::Error;

use super::ledger::LedgerRow;
use crate::domain::ScoreRecord;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Receives every committed period's score records and fills.
///
/// The engine only defines the logical record shapes; file formats belong to
/// implementations.
pub trait RecordSink {
    fn write_score(&mut self, record: &ScoreRecord) -> Result<(), SinkError>;

    fn write_fill(&mut self, row: &LedgerRow) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub scores: Vec<ScoreRecord>,
    pub fills: Vec<LedgerRow>,
}

impl RecordSink for MemorySink {
    fn write_score(&mut self, record: &ScoreRecord) -> Result<(), SinkError> {
        self.scores.push(record.clone());
        Ok(())
    }

    fn write_fill(&mut self, row: &LedgerRow) -> Result<(), SinkError> {
        self.fills.push(row.clone());
        Ok(())
    }
}
