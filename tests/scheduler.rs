mod common;

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use common::{assert_close, recording_scheduler};
use ostinato::io::MidiEvent;

#[test]
fn submissions_from_many_threads_dispatch_in_deadline_order() {
    let (scheduler, sink) = recording_scheduler();
    let t0 = Instant::now() + Duration::from_millis(50);

    let mut deadlines = HashMap::new();
    let workers: Vec<_> = (0..4u8)
        .map(|channel| {
            let scheduler = scheduler.clone();
            let plan: Vec<(u8, Instant)> = (0..40u8)
                .map(|key| {
                    let offset = (key as u64 * 37 + channel as u64 * 11) % 200;
                    (key, t0 + Duration::from_millis(offset))
                })
                .collect();
            for &(key, deadline) in &plan {
                deadlines.insert((channel, key), deadline);
            }
            thread::spawn(move || {
                for (key, deadline) in plan {
                    scheduler.submit(deadline, MidiEvent::note_on(channel, key, 100));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    thread::sleep(Duration::from_millis(400));
    let stats = scheduler.stop().unwrap();
    assert_eq!(stats.dispatched, 160);

    let order: Vec<Instant> = sink
        .events()
        .into_iter()
        .map(|event| match event {
            MidiEvent::NoteOn { channel, key, .. } => deadlines[&(channel, key)],
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert!(
        order.windows(2).all(|w| w[0] <= w[1]),
        "dispatch order must follow deadlines"
    );
}

#[test]
fn equal_deadlines_keep_submission_order() {
    let (scheduler, sink) = recording_scheduler();
    let t = Instant::now();
    // A at T+100, B and C at T+50, D at T+10
    scheduler.submit(t + Duration::from_millis(100), MidiEvent::note_on(0, 1, 100));
    scheduler.submit(t + Duration::from_millis(50), MidiEvent::note_on(0, 2, 100));
    scheduler.submit(t + Duration::from_millis(50), MidiEvent::note_on(0, 3, 100));
    scheduler.submit(t + Duration::from_millis(10), MidiEvent::note_on(0, 4, 100));

    thread::sleep(Duration::from_millis(200));
    scheduler.stop().unwrap();

    let keys: Vec<u8> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            MidiEvent::NoteOn { key, .. } => Some(key),
            _ => None,
        })
        .collect();
    assert_eq!(keys, vec![4, 2, 3, 1], "expected D, B, C, A");
}

#[test]
fn dispatch_lands_near_its_deadline() {
    let (scheduler, sink) = recording_scheduler();
    let t0 = Instant::now() + Duration::from_millis(20);
    for i in 0..20u8 {
        scheduler.submit(
            t0 + Duration::from_millis(i as u64 * 10),
            MidiEvent::note_on(0, i, 100),
        );
    }

    thread::sleep(Duration::from_millis(300));
    scheduler.stop().unwrap();

    let messages = sink.messages();
    assert_eq!(messages.len(), 20);
    for (i, message) in messages.iter().enumerate() {
        let deadline = t0 + Duration::from_millis(i as u64 * 10);
        assert!(message.at >= deadline, "message {i} dispatched early");
        // one polling quantum plus scheduling slack
        assert_close(message.at - deadline, Duration::ZERO, Duration::from_millis(15));
    }
}

#[test]
fn events_pending_at_stop_are_abandoned() {
    let (scheduler, sink) = recording_scheduler();
    scheduler.submit_after(Duration::from_secs(30), MidiEvent::note_on(0, 60, 100));
    scheduler.submit_after(Duration::from_secs(30), MidiEvent::note_off(0, 60));

    let stats = scheduler.stop().unwrap();
    assert_eq!(stats.abandoned, 2);
    assert_eq!(scheduler.pending(), 0);
    assert!(sink.is_empty());
}

#[test]
fn send_now_bypasses_the_queue() {
    let (scheduler, sink) = recording_scheduler();
    scheduler.submit_after(Duration::from_secs(30), MidiEvent::note_on(0, 60, 100));
    scheduler
        .send_now(MidiEvent::ProgramChange {
            channel: 2,
            program: 73,
        })
        .unwrap();

    assert_eq!(
        sink.events(),
        vec![MidiEvent::ProgramChange {
            channel: 2,
            program: 73
        }]
    );
    assert_eq!(scheduler.pending(), 1);
    scheduler.stop().unwrap();
}
