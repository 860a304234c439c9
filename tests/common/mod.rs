#![allow(dead_code)]

use std::time::{Duration, Instant};

use ostinato::config::{PlayerConfig, SchedulerConfig};
use ostinato::engine::EventScheduler;
use ostinato::io::midi::ALL_NOTES_OFF;
use ostinato::io::{MidiEvent, RecordedMessage, RecordingSink};
use ostinato::sequencing::{Hit, Rhythm};

/// A started scheduler writing into a sink the test keeps a handle to.
pub fn recording_scheduler() -> (EventScheduler, RecordingSink) {
    let sink = RecordingSink::new();
    let scheduler = EventScheduler::spawn(sink.clone(), SchedulerConfig::default())
        .expect("scheduler should start");
    (scheduler, sink)
}

/// Player settings for fast tests: short start offset and lookahead.
pub fn quick_player() -> PlayerConfig {
    PlayerConfig {
        start_offset: Duration::from_millis(30),
        lookahead: Duration::from_millis(15),
        seed: Some(42),
        ..PlayerConfig::default()
    }
}

/// Bell on every half beat, one drum on the downbeat.
pub fn eighth_bell(name: &str, bpm: f64, bell: u8, drum: u8) -> Rhythm {
    let bell_hits: Vec<Hit> = (0..8)
        .map(|i| Hit::new(i as f64 * 0.5, bell, 100, 0.1))
        .collect();
    Rhythm::builder(name, bpm, 4)
        .part("Bell", bell_hits)
        .part("Drum", vec![Hit::new(0.0, drum, 120, 0.25)])
        .build()
        .expect("valid rhythm")
}

/// `(dispatch instant, key)` of every note-on with a non-zero velocity.
pub fn note_ons(messages: &[RecordedMessage]) -> Vec<(Instant, u8)> {
    messages
        .iter()
        .filter_map(|m| match m.event() {
            Some(MidiEvent::NoteOn { key, velocity, .. }) if velocity > 0 => Some((m.at, key)),
            _ => None,
        })
        .collect()
}

/// Every note-on is followed by its note-off, or by an all-notes-off on its
/// channel.
pub fn assert_paired(messages: &[RecordedMessage]) {
    let events: Vec<MidiEvent> = messages.iter().filter_map(|m| m.event()).collect();
    for (i, event) in events.iter().enumerate() {
        let MidiEvent::NoteOn {
            channel,
            key,
            velocity,
        } = *event
        else {
            continue;
        };
        if velocity == 0 {
            continue;
        }
        let closed = events[i + 1..].iter().any(|later| match *later {
            MidiEvent::NoteOff {
                channel: c, key: k, ..
            } => c == channel && k == key,
            MidiEvent::ControlChange {
                channel: c,
                controller,
                ..
            } => c == channel && controller == ALL_NOTES_OFF,
            _ => false,
        });
        assert!(closed, "note-on {key} on channel {channel} (message {i}) never released");
    }
}

pub fn assert_close(actual: Duration, expected: Duration, tolerance: Duration) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= tolerance,
        "expected {expected:?} +/- {tolerance:?}, got {actual:?}"
    );
}
