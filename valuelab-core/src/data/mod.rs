//! Price data: store trait, in-memory and CSV-backed stores, synthetic bars.

pub mod csv_store;
pub mod memory;
pub mod provider;
pub mod synthetic;

pub use csv_store::{read_bars_csv, write_bars_csv, CsvPriceStore};
pub use memory::InMemoryPriceStore;
pub use provider::{DataError, PriceStore};
pub use synthetic::generate_synthetic_bars;
