//! TOML application configuration.
//!
//! ```toml
//! monthly_budget = 1000.0
//! minimum_allocation_pct = 5.0     # percent of the budget
//! lookback_days = 90
//! supported_markets = ["US", "AU"]
//!
//! [scoring_weights]
//! price_position = 0.4
//! momentum_decay = 0.3
//! volatility_adjusted = 0.2
//! volume_confirmation = 0.1
//!
//! [backtest]
//! start_date = "2023-01-01"
//! end_date = "2023-12-31"
//!
//! [tickers.US]
//! etfs = ["SPY", "QQQ"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use valuelab_core::allocation::AllocationConfig;
use valuelab_core::domain::Instrument;
use valuelab_core::engine::{BacktestConfig, EmptyPeriodPolicy, MissingHistoryPolicy};
use valuelab_core::scoring::{ScoringConfig, ScoringWeights};

/// Unique identifier for a configuration (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Backtest date range and failure policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub history_policy: MissingHistoryPolicy,
    #[serde(default)]
    pub empty_period_policy: EmptyPeriodPolicy,
    /// Intersect the date range with the span the loaded data can score.
    #[serde(default)]
    pub clamp_to_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub monthly_budget: f64,
    /// Percent of the monthly budget, e.g. `5.0` for 5%.
    #[serde(default = "default_min_pct")]
    pub minimum_allocation_pct: f64,
    #[serde(default = "default_lookback")]
    pub lookback_days: u32,
    #[serde(default = "default_min_window")]
    pub min_window_days: usize,
    #[serde(default = "default_decay")]
    pub momentum_decay_factor: f64,
    #[serde(default = "default_vol_window")]
    pub volatility_window: usize,
    #[serde(default = "default_markets")]
    pub supported_markets: Vec<String>,
    #[serde(default)]
    pub scoring_weights: ScoringWeights,
    pub backtest: BacktestSection,
    /// market → group name → tickers
    #[serde(default)]
    pub tickers: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

fn default_min_pct() -> f64 {
    5.0
}
fn default_lookback() -> u32 {
    90
}
fn default_min_window() -> usize {
    20
}
fn default_decay() -> f64 {
    0.95
}
fn default_vol_window() -> usize {
    30
}
fn default_markets() -> Vec<String> {
    vec!["US".into(), "AU".into()]
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Check everything that would otherwise fail mid-run.
    ///
    /// Ticker naming problems are logged, not rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.allocation_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if !(0.0..=100.0).contains(&self.minimum_allocation_pct) {
            return Err(ConfigError::Invalid(format!(
                "minimum_allocation_pct must be within [0, 100], got {}",
                self.minimum_allocation_pct
            )));
        }
        if self.backtest.start_date > self.backtest.end_date {
            return Err(ConfigError::Invalid(format!(
                "backtest start_date {} is after end_date {}",
                self.backtest.start_date, self.backtest.end_date
            )));
        }
        for market in self.tickers.keys() {
            if !self.supported_markets.iter().any(|m| m == market) {
                return Err(ConfigError::Invalid(format!(
                    "tickers listed for unsupported market '{market}'"
                )));
            }
        }
        if self.instruments().is_empty() {
            return Err(ConfigError::Invalid("no tickers configured".into()));
        }
        for inst in self.instruments() {
            if !inst.has_valid_format() {
                tracing::warn!(instrument = %inst, "ticker does not follow its market's naming convention");
            }
        }
        Ok(())
    }

    /// Deterministic hash of the configuration.
    pub fn run_id(&self) -> RunId {
        // AppConfig holds only plain data; serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Every configured instrument, deduplicated and sorted.
    pub fn instruments(&self) -> Vec<Instrument> {
        let mut out: Vec<Instrument> = self
            .tickers
            .iter()
            .flat_map(|(market, groups)| {
                groups
                    .values()
                    .flatten()
                    .map(move |ticker| Instrument::new(ticker.trim(), market.as_str()))
            })
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            weights: self.scoring_weights,
            lookback_days: self.lookback_days,
            min_window_days: self.min_window_days,
            momentum_decay_factor: self.momentum_decay_factor,
            volatility_window: self.volatility_window,
        }
    }

    pub fn allocation_config(&self) -> AllocationConfig {
        AllocationConfig {
            monthly_budget: self.monthly_budget,
            minimum_allocation_pct: self.minimum_allocation_pct / 100.0,
        }
    }

    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            start_date: self.backtest.start_date,
            end_date: self.backtest.end_date,
            instruments: self.instruments(),
            scoring: self.scoring_config(),
            allocation: self.allocation_config(),
            history_policy: self.backtest.history_policy,
            empty_period_policy: self.backtest.empty_period_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
monthly_budget = 1000.0
minimum_allocation_pct = 5.0

[backtest]
start_date = "2023-01-01"
end_date = "2023-12-31"

[tickers.US]
etfs = ["SPY", "QQQ"]
tech = ["AAPL", "SPY"]

[tickers.AU]
etfs = ["VAS.AX"]
"#;

    #[test]
    fn parses_with_defaults() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.lookback_days, 90);
        assert_eq!(config.volatility_window, 30);
        assert_eq!(config.scoring_weights, ScoringWeights::default());
        assert_eq!(config.backtest.history_policy, MissingHistoryPolicy::SkipInstrument);
        assert!(!config.backtest.clamp_to_data);
    }

    #[test]
    fn instruments_are_deduplicated_and_sorted() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        let names: Vec<String> = config.instruments().iter().map(|i| i.to_string()).collect();
        assert_eq!(names, vec!["US:AAPL", "US:QQQ", "US:SPY", "AU:VAS.AX"]);
    }

    #[test]
    fn percent_floor_becomes_fraction() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        let alloc = config.allocation_config();
        assert!((alloc.minimum_allocation_pct - 0.05).abs() < 1e-12);
        assert!((alloc.floor_amount() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn weights_must_sum_to_one() {
        let text = SAMPLE.replace(
            "[backtest]",
            "[scoring_weights]\nprice_position = 0.5\nmomentum_decay = 0.3\nvolatility_adjusted = 0.2\nvolume_confirmation = 0.1\n\n[backtest]",
        );
        assert!(matches!(AppConfig::from_toml(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_non_positive_budget() {
        let text = SAMPLE.replace("monthly_budget = 1000.0", "monthly_budget = 0.0");
        assert!(matches!(AppConfig::from_toml(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_reversed_dates() {
        let text = SAMPLE.replace("2023-12-31", "2022-12-31");
        assert!(matches!(AppConfig::from_toml(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_unsupported_market() {
        let text = format!("{SAMPLE}\n[tickers.JP]\netfs = [\"1306.T\"]\n");
        assert!(matches!(AppConfig::from_toml(&text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn parses_policies() {
        let text = SAMPLE.replace(
            "end_date = \"2023-12-31\"",
            "end_date = \"2023-12-31\"\nhistory_policy = \"abort\"\nempty_period_policy = \"abort\"\nclamp_to_data = true",
        );
        let config = AppConfig::from_toml(&text).unwrap();
        assert_eq!(config.backtest.history_policy, MissingHistoryPolicy::Abort);
        assert_eq!(config.backtest.empty_period_policy, EmptyPeriodPolicy::Abort);
        assert!(config.backtest.clamp_to_data);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(AppConfig::from_toml("monthly_budget = ["), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn run_id_is_deterministic() {
        let a = AppConfig::from_toml(SAMPLE).unwrap();
        let b = AppConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(a.run_id(), b.run_id());
        assert_eq!(a.run_id().len(), 64);

        let mut c = a.clone();
        c.monthly_budget = 2000.0;
        assert_ne!(a.run_id(), c.run_id());
    }

    #[test]
    fn backtest_config_threads_values() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        let bt = config.backtest_config();
        assert_eq!(bt.instruments.len(), 4);
        assert_eq!(bt.scoring.lookback_days, 90);
        assert_eq!(bt.allocation.monthly_budget, 1000.0);
    }
}
