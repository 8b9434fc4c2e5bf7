//! ValueLab Core: domain types, price stores, scorer, allocator, monthly backtest engine.
//!
//! This crate contains the heart of the DCA simulator:
//! - Domain types (bars, instruments, price windows, score records)
//! - Price stores (in-memory, per-instrument CSV, synthetic generator)
//! - Four-factor value scorer over a lookback window
//! - Score-weighted budget allocator with a per-instrument floor
//! - Monthly backtest state machine with an append-only ledger

pub mod allocation;
pub mod data;
pub mod domain;
pub mod engine;
pub mod scoring;

pub use allocation::{allocate, Allocation, AllocationConfig, AllocationError, AllocationMap};
pub use data::{DataError, InMemoryPriceStore, PriceStore};
pub use domain::{Bar, Instrument, PriceWindow, ScoreRecord, SkipReason};
pub use engine::{BacktestConfig, BacktestEngine, BacktestError, BacktestLedger};
pub use scoring::{Scorer, ScoringConfig, ScoringWeights};
