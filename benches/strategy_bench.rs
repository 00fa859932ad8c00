//! Strategy Benchmarks - Per-Round Hot Path
//!
//! Benchmarks the domain work done once per resolved round: every
//! strategy over a full 2000-round history, then arbitration. A round
//! lasts a minute, so anything under a second is comfortable.
//!
//! Run with: cargo bench --bench strategy_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use wingo_signal_bot::domain::arbiter::Arbiter;
use wingo_signal_bot::domain::draw::SizeClass;
use wingo_signal_bot::domain::strategy::{
    LaggedClassifier, PatternFrequency, Strategy, StreakRule,
};

/// 2000 pseudo-random sizes, the history cap.
fn full_history() -> Vec<SizeClass> {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    (0..2000)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            SizeClass::from_value((state % 10) as u8)
        })
        .collect()
}

/// Benchmark the streak rule table lookup.
fn bench_streak_rule(c: &mut Criterion) {
    let history = full_history();
    let strategy = StreakRule::default();

    c.bench_function("streak_rule_2000", |b| {
        b.iter(|| strategy.evaluate(black_box(&history)));
    });
}

/// Benchmark the pattern search over the last 500 rounds.
fn bench_pattern_frequency(c: &mut Criterion) {
    let history = full_history();
    let strategy = PatternFrequency::default();

    c.bench_function("pattern_frequency_2000", |b| {
        b.iter(|| strategy.evaluate(black_box(&history)));
    });
}

/// Benchmark training and querying the lagged classifier.
fn bench_lagged_classifier(c: &mut Criterion) {
    let history = full_history();
    let strategy = LaggedClassifier::default();

    c.bench_function("lagged_classifier_2000", |b| {
        b.iter(|| strategy.evaluate(black_box(&history)));
    });
}

/// Benchmark one full arbitration (all stages plus fallback).
fn bench_arbiter_select(c: &mut Criterion) {
    let history = full_history();
    let arbiter = Arbiter::default();
    let last = history[history.len() - 1];

    c.bench_function("arbiter_select_2000", |b| {
        b.iter(|| arbiter.select(black_box(&history), black_box(last)));
    });
}

criterion_group!(
    benches,
    bench_streak_rule,
    bench_pattern_frequency,
    bench_lagged_classifier,
    bench_arbiter_select,
);
criterion_main!(benches);
