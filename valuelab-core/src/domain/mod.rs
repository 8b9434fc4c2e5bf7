//! Domain types for ValueLab

pub mod bar;
pub mod instrument;
pub mod score;
pub mod window;

pub use bar::{clean_bars, Bar};
pub use instrument::Instrument;
pub use score::{ScoreRecord, SkipReason};
pub use window::{PriceWindow, WindowError};
