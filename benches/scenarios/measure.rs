//! Benchmarks for submitting one measure of every part of a rhythm.

use std::hint::black_box;
use std::time::{Duration, Instant};

use criterion::{BatchSize, BenchmarkId, Criterion};
use ostinato::config::SchedulerConfig;
use ostinato::engine::{EventScheduler, Timeline};
use ostinato::io::RecordingSink;
use ostinato::runtime::Track;
use ostinato::sequencing::RhythmLibrary;

pub fn bench_measures(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/measure");
    let library = RhythmLibrary::builtin();

    for key in ["fanga", "agbekor", "moribayassa"] {
        let Ok(rhythm) = library.find(key) else {
            continue;
        };
        let tracks: Vec<Track> = rhythm
            .parts
            .iter()
            .map(|part| Track::from_part(part, rhythm.channel))
            .collect();
        let measure_ticks = rhythm.measure_ticks(960);
        let timeline = Timeline::new(Instant::now() + Duration::from_secs(3600), rhythm.bpm, 960);

        group.bench_with_input(BenchmarkId::new("submit", key), &key, |b, _| {
            b.iter_batched(
                || EventScheduler::new(RecordingSink::new(), SchedulerConfig::default()),
                |scheduler| {
                    let notes: usize = tracks
                        .iter()
                        .map(|t| t.schedule(&scheduler, &timeline, 0, measure_ticks))
                        .sum();
                    black_box(notes);
                    scheduler
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}
