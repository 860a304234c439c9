//! Benchmarks for the deadline queue.

use std::hint::black_box;
use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion};
use ostinato::engine::EventQueue;
use ostinato::io::MidiEvent;

use crate::QUEUE_SIZES;

/// Deadlines scattered over one second, out of submission order.
fn deadlines(t0: Instant, count: usize) -> Vec<Instant> {
    (0..count)
        .map(|i| t0 + Duration::from_micros(((i * 7919) % 1_000_000) as u64))
        .collect()
}

pub fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/queue");
    let t0 = Instant::now();
    let message = MidiEvent::note_on(9, 56, 100).to_message();

    for &size in QUEUE_SIZES {
        let times = deadlines(t0, size);

        // Fill then drain in deadline order
        group.bench_with_input(BenchmarkId::new("push_pop", size), &size, |b, _| {
            let mut queue = EventQueue::with_capacity(size);
            b.iter(|| {
                for &deadline in &times {
                    queue.push(black_box(deadline), message);
                }
                while let Some(event) = queue.pop() {
                    black_box(event);
                }
            })
        });

        // One push and one pop against a standing backlog
        let mut queue = EventQueue::with_capacity(size + 1);
        for &deadline in &times {
            queue.push(deadline, message);
        }
        let late = t0 + Duration::from_secs(2);
        group.bench_with_input(BenchmarkId::new("steady_state", size), &size, |b, _| {
            b.iter(|| {
                queue.push(black_box(late), message);
                black_box(queue.pop_due(late));
            })
        });
    }

    group.finish();
}
