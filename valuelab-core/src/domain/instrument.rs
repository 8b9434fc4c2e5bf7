use std::fmt;

use serde::{Deserialize, Serialize};

/// A tradable equity or ETF, identified by ticker + market.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub ticker: String,
    pub market: String,
}

impl Instrument {
    pub fn new(ticker: impl Into<String>, market: impl Into<String>) -> Self {
        Self { ticker: ticker.into(), market: market.into() }
    }

    /// Storage key used for per-instrument files: `{TICKER}_{MARKET}`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.ticker, self.market)
    }

    /// Check the ticker follows the naming convention of its market.
    ///
    /// AU listings carry the `.AX` suffix; US listings carry no suffix.
    /// Unknown markets only require a non-empty ticker.
    pub fn has_valid_format(&self) -> bool {
        let ticker = self.ticker.trim();
        if ticker.is_empty() || self.market.trim().is_empty() {
            return false;
        }
        match self.market.as_str() {
            "AU" => ticker.ends_with(".AX"),
            "US" => !ticker.contains('.'),
            _ => true,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.market, self.ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_file_stem() {
        let inst = Instrument::new("VAS.AX", "AU");
        assert_eq!(inst.to_string(), "AU:VAS.AX");
        assert_eq!(inst.file_stem(), "VAS.AX_AU");
    }

    #[test]
    fn market_specific_ticker_formats() {
        assert!(Instrument::new("BHP.AX", "AU").has_valid_format());
        assert!(!Instrument::new("BHP", "AU").has_valid_format());
        assert!(Instrument::new("SPY", "US").has_valid_format());
        assert!(!Instrument::new("SPY.X", "US").has_valid_format());
        assert!(Instrument::new("7203.T", "JP").has_valid_format());
        assert!(!Instrument::new("  ", "US").has_valid_format());
    }

    #[test]
    fn ordering_is_by_ticker_then_market() {
        let mut v = vec![Instrument::new("QQQ", "US"), Instrument::new("A200.AX", "AU")];
        v.sort();
        assert_eq!(v[0].ticker, "A200.AX");
    }
}
