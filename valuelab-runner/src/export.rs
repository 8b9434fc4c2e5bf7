//! Reporting and export: JSON, CSV, and plain-text artifacts.
//!
//! - **JSON**: `report.json`, the full `BacktestResult` with schema versioning
//! - **CSV**: `ledger.csv` (one row per fill) and `periods.csv` (one row per period)
//! - **Text**: performance summary, score table, allocation table for the terminal

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use valuelab_core::engine::{LedgerRow, PeriodStatus, PeriodSummary};
use valuelab_core::scoring::ScoredUniverse;

use crate::metrics::Metrics;
use crate::runner::{AllocationPlan, BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting schema versions newer than this build.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: period_date, market, ticker, score, allocation, price,
/// shares_bought, cumulative_invested, cumulative_value
pub fn export_ledger_csv(rows: &[LedgerRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "period_date",
        "market",
        "ticker",
        "score",
        "allocation",
        "price",
        "shares_bought",
        "cumulative_invested",
        "cumulative_value",
    ])?;
    for r in rows {
        wtr.write_record([
            &r.period_date.to_string(),
            &r.instrument.market,
            &r.instrument.ticker,
            &format!("{:.6}", r.score),
            &format!("{:.2}", r.allocation),
            &format!("{:.4}", r.price),
            &format!("{:.6}", r.shares_bought),
            &format!("{:.2}", r.cumulative_invested),
            &format!("{:.2}", r.cumulative_value),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: period_date, status, scored, funded, invested, cumulative_invested,
/// cumulative_value, excluded, budget_insufficient
pub fn export_periods_csv(periods: &[PeriodSummary]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "period_date",
        "status",
        "scored",
        "funded",
        "invested",
        "cumulative_invested",
        "cumulative_value",
        "excluded",
        "budget_insufficient",
    ])?;
    for p in periods {
        let status = match p.status {
            PeriodStatus::Committed => "committed",
            PeriodStatus::Skipped => "skipped",
        }
        .to_string();
        let excluded: Vec<String> = p
            .exclusions
            .iter()
            .map(|e| format!("{} ({})", e.instrument, e.reason))
            .collect();
        wtr.write_record([
            &p.period_date.to_string(),
            &status,
            &p.scored.to_string(),
            &p.funded.to_string(),
            &format!("{:.2}", p.invested),
            &format!("{:.2}", p.cumulative_invested),
            &format!("{:.2}", p.cumulative_value),
            &excluded.join("; "),
            &p.shortfall.is_some().to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `report.json`, `ledger.csv`, `periods.csv` into `output_dir`.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;

    std::fs::write(output_dir.join("report.json"), export_json(result)?)?;
    std::fs::write(output_dir.join("ledger.csv"), export_ledger_csv(result.ledger.rows())?)?;
    std::fs::write(output_dir.join("periods.csv"), export_periods_csv(result.ledger.periods())?)?;

    Ok(output_dir.to_path_buf())
}

/// Load a `BacktestResult` from an artifact directory's `report.json`.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Text reports ───────────────────────────────────────────────────

fn ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a (insufficient variance)".to_string(), |v| format!("{v:.3}"))
}

fn metrics_block(out: &mut String, m: &Metrics) {
    let _ = writeln!(out, "Total Invested:   {:.2}", m.total_invested);
    let _ = writeln!(out, "Final Value:      {:.2}", m.final_value);
    let _ = writeln!(out, "Total Return:     {:.2}%", m.total_return * 100.0);
    let _ = writeln!(out, "Annualized:       {:.2}%", m.annualized_return * 100.0);
    let _ = writeln!(out, "Sharpe:           {}", ratio(m.sharpe_ratio));
    let _ = writeln!(out, "Sortino:          {}", ratio(m.sortino_ratio));
    let _ = writeln!(out, "Max Drawdown:     {:.2}%", m.max_drawdown * 100.0);
    let _ = writeln!(out, "Win Rate:         {:.1}%", m.win_rate * 100.0);
}

/// Human-readable backtest summary.
pub fn performance_summary(result: &BacktestResult) -> String {
    let m = result.metrics();
    let mut out = String::with_capacity(1024);
    let _ = writeln!(out, "=== Backtest Result ===");
    let _ = writeln!(out, "Run:              {}", &result.run_id[..12.min(result.run_id.len())]);
    let _ = writeln!(out, "Period:           {} to {}", result.start_date, result.end_date);
    let _ = writeln!(
        out,
        "Periods:          {} ({} committed, {} skipped)",
        m.periods, m.periods_committed, m.periods_skipped
    );
    let _ = writeln!(out, "Fills:            {} across {} instruments", m.fills, m.instruments_bought);
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Strategy ---");
    metrics_block(&mut out, m);
    let _ = writeln!(out);
    let _ = writeln!(out, "--- Equal-weight DCA ---");
    metrics_block(&mut out, &result.comparison.baseline);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Excess Return:    {:+.2}% total, {:+.2}% annualized",
        result.comparison.excess_total_return * 100.0,
        result.comparison.excess_annualized_return * 100.0
    );
    if !result.missing.is_empty() {
        let names: Vec<String> = result.missing.iter().map(|i| i.to_string()).collect();
        let _ = writeln!(out, "WARNING: no data for {}", names.join(", "));
    }
    if result.has_synthetic {
        let _ = writeln!(out, "WARNING: Results based on SYNTHETIC data");
    }
    out
}

/// Top `top` scored instruments, then the skipped ones.
pub fn score_table(universe: &ScoredUniverse, top: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<4} {:<14} {:>7} {:>7} {:>7} {:>7} {:>7} {:>10}",
        "#", "instrument", "score", "pos", "mom", "vol", "volume", "close"
    );
    for (i, r) in universe.scored.iter().take(top).enumerate() {
        let _ = writeln!(
            out,
            "{:<4} {:<14} {:>7.3} {:>7.3} {:>7.3} {:>7.3} {:>7.3} {:>10.2}",
            i + 1,
            r.instrument.to_string(),
            r.final_score,
            r.price_position,
            r.momentum_decay,
            r.volatility_adj,
            r.volume_conf,
            r.close
        );
    }
    for (inst, reason) in &universe.skipped {
        let _ = writeln!(out, "skipped {inst}: {reason}");
    }
    out
}

pub fn allocation_table(plan: &AllocationPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Allocation of {:.2} as of {}", plan.budget, plan.as_of);
    let _ = writeln!(
        out,
        "{:<14} {:>7} {:>10} {:>7} {:>10} {:>10}",
        "instrument", "score", "amount", "weight", "price", "shares"
    );
    for r in &plan.rows {
        let _ = writeln!(
            out,
            "{:<14} {:>7.3} {:>10.2} {:>6.1}% {:>10.2} {:>10.4}",
            r.instrument.to_string(),
            r.score,
            r.amount,
            r.weight * 100.0,
            r.price,
            r.shares
        );
    }
    let c = &plan.concentration;
    let _ = writeln!(
        out,
        "HHI {:.3}, largest {:.1}%, top-3 {:.1}%",
        c.herfindahl_index,
        c.max_weight * 100.0,
        c.top3_weight * 100.0
    );
    if let Some(s) = &plan.shortfall {
        let excluded: Vec<String> = s.excluded.iter().map(|i| i.to_string()).collect();
        let _ = writeln!(
            out,
            "WARNING: budget covers only {} of {} floors of {:.2}; excluded {}",
            s.funded,
            s.eligible,
            s.floor_amount,
            excluded.join(", ")
        );
    }
    for (inst, reason) in &plan.skipped {
        let _ = writeln!(out, "skipped {inst}: {reason}");
    }
    out
}
