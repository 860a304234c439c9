//! Benchmarks for tick-to-instant conversion.

use std::hint::black_box;
use std::time::Instant;

use criterion::Criterion;
use ostinato::engine::Timeline;

pub fn bench_timeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/timeline");
    let timeline = Timeline::new(Instant::now(), 128.0, 960);

    group.bench_function("at", |b| {
        let mut tick = 0u64;
        b.iter(|| {
            tick = tick.wrapping_add(240);
            black_box(timeline.at(black_box(tick)))
        })
    });

    group.bench_function("beats_to_ticks", |b| {
        b.iter(|| black_box(timeline.beats_to_ticks(black_box(3.75))))
    });

    group.finish();
}
