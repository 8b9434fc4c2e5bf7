//! ValueLab CLI: rank, allocate, and backtest a value-tilted DCA strategy.
//!
//! Commands:
//! - `score`: rank the configured universe as of a date
//! - `allocate`: score, then split one month's budget
//! - `backtest`: replay the strategy monthly and compare against equal-weight DCA

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use valuelab_core::engine::RecordSink;
use valuelab_runner::{
    allocate_now, export, load_options, load_prices, run_backtest, score_universe, AppConfig,
    JsonlSink, LoadedData,
};

#[derive(Parser)]
#[command(name = "valuelab", about = "ValueLab CLI: relative-value scoring and DCA backtesting")]
struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Common {
    /// Path to the TOML config file.
    #[arg(long, default_value = "valuelab.toml")]
    config: PathBuf,

    /// Directory of `{TICKER}_{MARKET}.csv` price files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Generate synthetic prices for instruments without a file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank every configured instrument by value score.
    Score {
        #[command(flatten)]
        common: Common,

        /// Scoring date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Number of rows to print.
        #[arg(long, default_value_t = 20)]
        top: usize,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Score, then allocate the monthly budget.
    Allocate {
        #[command(flatten)]
        common: Common,

        /// Allocation date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the monthly backtest and the equal-weight DCA baseline.
    Backtest {
        #[command(flatten)]
        common: Common,

        /// Directory for report.json, ledger.csv, periods.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Append scores.jsonl and ledger.jsonl here while the run progresses.
        #[arg(long)]
        records_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Score { common, as_of, top, json } => run_score(common, as_of, top, json),
        Commands::Allocate { common, as_of, json } => run_allocate(common, as_of, json),
        Commands::Backtest { common, output_dir, records_dir } => {
            run_backtest_cmd(common, output_dir, records_dir)
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}': expected YYYY-MM-DD"))
}

fn as_of_or_today(as_of: Option<String>) -> Result<NaiveDate> {
    match as_of {
        Some(s) => parse_date(&s),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn load(common: &Common, through: Option<NaiveDate>) -> Result<(AppConfig, LoadedData)> {
    let config = AppConfig::from_file(&common.config)
        .with_context(|| format!("loading {}", common.config.display()))?;
    let data_dir = common.data_dir.is_dir().then(|| common.data_dir.clone());
    if data_dir.is_none() && !common.synthetic {
        bail!(
            "data directory {} does not exist (use --synthetic for synthetic data)",
            common.data_dir.display()
        );
    }
    let opts = load_options(&config, data_dir, common.synthetic, through);
    let loaded = load_prices(&config.instruments(), &opts)?;
    tracing::info!(
        instruments = loaded.sources.len(),
        missing = loaded.missing.len(),
        dataset_hash = %&loaded.dataset_hash[..12],
        "prices loaded"
    );
    Ok((config, loaded))
}

fn run_score(common: Common, as_of: Option<String>, top: usize, json: bool) -> Result<()> {
    let as_of = as_of_or_today(as_of)?;
    let (config, loaded) = load(&common, Some(as_of))?;
    let universe = score_universe(&config, &loaded.store, as_of)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&universe.scored)?);
    } else {
        println!("Scores as of {as_of}");
        print!("{}", export::score_table(&universe, top));
    }
    Ok(())
}

fn run_allocate(common: Common, as_of: Option<String>, json: bool) -> Result<()> {
    let as_of = as_of_or_today(as_of)?;
    let (config, loaded) = load(&common, Some(as_of))?;
    let plan = allocate_now(&config, &loaded.store, as_of)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", export::allocation_table(&plan));
    }
    Ok(())
}

fn run_backtest_cmd(common: Common, output_dir: PathBuf, records_dir: Option<PathBuf>) -> Result<()> {
    let (config, loaded) = load(&common, None)?;

    let mut sink = match &records_dir {
        Some(dir) => Some(
            JsonlSink::open(dir).with_context(|| format!("opening record sink in {}", dir.display()))?,
        ),
        None => None,
    };
    let result = run_backtest(&config, &loaded, sink.as_mut().map(|s| s as &mut dyn RecordSink))?;

    println!();
    print!("{}", export::performance_summary(&result));
    let dir = export::save_artifacts(&result, &output_dir)?;
    println!();
    println!("Artifacts written to {}", dir.display());
    if let Some(dir) = records_dir {
        println!("Records appended to {}", dir.display());
    }
    Ok(())
}
