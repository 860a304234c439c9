//! Real-world scenario benchmarks.
//!
//! These benchmarks submit whole measures of the built-in rhythms the way
//! the players do, into a scheduler whose dispatch thread is not running.

mod measure;

pub use measure::bench_measures;
