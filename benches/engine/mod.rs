//! Benchmarks for engine primitives.

mod queue;
mod timeline;

pub use queue::bench_queue;
pub use timeline::bench_timeline;
