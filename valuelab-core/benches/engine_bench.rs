//! Criterion benchmarks for ValueLab hot paths.
//!
//! Benchmarks:
//! 1. Scoring a single window
//! 2. Allocation across a growing universe
//! 3. Full monthly backtest over a synthetic universe

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use valuelab_core::allocation::{allocate, AllocationConfig};
use valuelab_core::data::{generate_synthetic_bars, InMemoryPriceStore, PriceStore};
use valuelab_core::domain::Instrument;
use valuelab_core::engine::{BacktestConfig, BacktestEngine, EmptyPeriodPolicy, MissingHistoryPolicy};
use valuelab_core::scoring::{Scorer, ScoringConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn universe(n: usize) -> Vec<Instrument> {
    (0..n).map(|i| Instrument::new(format!("SYN{i:03}"), "US")).collect()
}

fn store_for(instruments: &[Instrument]) -> InMemoryPriceStore {
    let mut store = InMemoryPriceStore::new();
    for inst in instruments {
        store.insert(inst.clone(), generate_synthetic_bars(inst, d(2018, 1, 1), d(2023, 12, 31)));
    }
    store
}

// ── 1. Scoring ───────────────────────────────────────────────────────

fn bench_score(c: &mut Criterion) {
    let instruments = universe(1);
    let store = store_for(&instruments);
    let scorer = Scorer::new(ScoringConfig::default()).unwrap();
    let as_of = d(2023, 6, 30);
    let window = store.get_window(&instruments[0], as_of, 90).unwrap();

    c.bench_function("score_window_90d", |b| {
        b.iter(|| scorer.score(black_box(&window), as_of))
    });
}

// ── 2. Allocation ────────────────────────────────────────────────────

fn bench_allocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate");
    for n in [5usize, 20, 100] {
        let scores: Vec<(Instrument, f64)> = universe(n)
            .into_iter()
            .enumerate()
            .map(|(i, inst)| (inst, ((i * 37) % 100) as f64 / 100.0))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &scores, |b, scores| {
            b.iter(|| allocate(black_box(scores), 10_000.0, 0.005))
        });
    }
    group.finish();
}

// ── 3. Full Backtest ─────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let instruments = universe(25);
    let store = store_for(&instruments);
    let config = BacktestConfig {
        start_date: d(2019, 1, 1),
        end_date: d(2023, 12, 31),
        instruments,
        scoring: ScoringConfig::default(),
        allocation: AllocationConfig { monthly_budget: 5_000.0, minimum_allocation_pct: 0.02 },
        history_policy: MissingHistoryPolicy::SkipInstrument,
        empty_period_policy: EmptyPeriodPolicy::SkipPeriod,
    };

    c.bench_function("backtest_25x60_months", |b| {
        b.iter(|| {
            BacktestEngine::new(black_box(config.clone()), &store)
                .unwrap()
                .run()
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_score, bench_allocate, bench_backtest);
criterion_main!(benches);
