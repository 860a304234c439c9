//! Benchmarks for the scheduling engine and whole-measure submission.
//!
//! Run with: cargo bench
//!
//! The dispatch loop holds the queue lock only for a push or a pop, so these
//! costs bound how long a producer can delay the dispatch thread.
//!
//! Reference budget: the default polling quantum is 5 ms, and a dense 12-beat
//! measure submits fewer than 100 events.
//!
//! Benchmark groups:
//!   - engine/*     Queue and timeline primitives
//!   - scenarios/*  Submitting measures of the built-in rhythms

use criterion::{criterion_group, criterion_main};

mod engine;
mod scenarios;

/// Pending-set sizes to measure at.
pub const QUEUE_SIZES: &[usize] = &[64, 1024, 16_384];

criterion_group!(
    benches,
    // Engine primitives
    engine::bench_queue,
    engine::bench_timeline,
    // Real-world scenarios
    scenarios::bench_measures,
);
criterion_main!(benches);
