mod common;

use std::thread;
use std::time::{Duration, Instant};

use common::{assert_close, assert_paired, eighth_bell, note_ons, quick_player, recording_scheduler};
use ostinato::config::SchedulerConfig;
use ostinato::engine::EventScheduler;
use ostinato::io::{OutputSink, RecordingSink, SinkError};
use ostinato::runtime::{PlayerHandle, RandomMelody, RhythmPlayer, Step, StepPlayer, StepSource};
use ostinato::sequencing::notes::{BASS_DRUM, COWBELL, C_MAJOR};
use ostinato::sequencing::Scale;
use ostinato::{ConfigError, Error};

fn wait_finished(handle: &PlayerHandle, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        assert!(Instant::now() < deadline, "player did not finish in {timeout:?}");
        thread::sleep(Duration::from_millis(5));
    }
}

/// Ascending notes, one every `ticks`.
struct Ladder {
    next: u8,
    ticks: u64,
}

impl StepSource for Ladder {
    fn next_step(&mut self) -> Step {
        let step = Step::note(0, self.next, 90, self.ticks).gated(self.ticks / 2);
        self.next += 1;
        step
    }
}

struct Stuck;

impl StepSource for Stuck {
    fn next_step(&mut self) -> Step {
        Step::rest(0)
    }
}

/// Records like [`RecordingSink`] but takes 3ms per message, like a
/// congested hardware port.
struct SlowSink(RecordingSink);

impl OutputSink for SlowSink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.0.send(bytes)?;
        thread::sleep(Duration::from_millis(3));
        Ok(())
    }
}

#[test]
fn rhythm_player_plays_limited_measures_on_an_even_grid() {
    let (scheduler, sink) = recording_scheduler();
    // 600 BPM: 100ms beats, 50ms between bell strokes
    let rhythm = eighth_bell("Grid", 600.0, COWBELL, BASS_DRUM);
    let handle = RhythmPlayer::new(scheduler.clone(), rhythm, quick_player())
        .unwrap()
        .limit(3)
        .start()
        .unwrap();

    wait_finished(&handle, Duration::from_secs(3));
    handle.join().unwrap();
    thread::sleep(Duration::from_millis(100));
    scheduler.stop().unwrap();

    let messages = sink.messages();
    let ons = note_ons(&messages);
    assert_eq!(ons.len(), 3 * 9);
    assert_eq!(ons.iter().filter(|(_, key)| *key == BASS_DRUM).count(), 3);

    let bells: Vec<Instant> = ons
        .iter()
        .filter(|(_, key)| *key == COWBELL)
        .map(|(at, _)| *at)
        .collect();
    for pair in bells.windows(2) {
        assert_close(
            pair[1] - pair[0],
            Duration::from_millis(50),
            Duration::from_millis(15),
        );
    }
    assert_paired(&messages);
}

#[test]
fn step_player_spaces_steps_by_their_advance() {
    let (scheduler, sink) = recording_scheduler();
    let config = quick_player();
    // half a beat at 240 BPM
    let source = Ladder {
        next: 60,
        ticks: config.ppq as u64 / 2,
    };
    let handle = StepPlayer::new("ladder", scheduler.clone(), source, 240.0, config)
        .unwrap()
        .limit(6)
        .start()
        .unwrap();

    wait_finished(&handle, Duration::from_secs(3));
    handle.join().unwrap();
    thread::sleep(Duration::from_millis(100));
    scheduler.stop().unwrap();

    let messages = sink.messages();
    let ons = note_ons(&messages);
    let keys: Vec<u8> = ons.iter().map(|(_, key)| *key).collect();
    assert_eq!(keys, vec![60, 61, 62, 63, 64, 65]);
    for pair in ons.windows(2) {
        assert_close(
            pair[1].0 - pair[0].0,
            Duration::from_millis(125),
            Duration::from_millis(15),
        );
    }
    assert_paired(&messages);
}

#[test]
fn step_players_sharing_an_origin_line_up() {
    let (scheduler, sink) = recording_scheduler();
    let config = quick_player();
    let origin = Instant::now() + Duration::from_millis(50);
    let ticks = config.ppq as u64;

    let low = StepPlayer::new("low", scheduler.clone(), Ladder { next: 40, ticks }, 300.0, config.clone())
        .unwrap()
        .starting_at(origin)
        .limit(3)
        .start()
        .unwrap();
    let high = StepPlayer::new("high", scheduler.clone(), Ladder { next: 80, ticks }, 300.0, config)
        .unwrap()
        .starting_at(origin)
        .limit(3)
        .start()
        .unwrap();

    wait_finished(&low, Duration::from_secs(3));
    wait_finished(&high, Duration::from_secs(3));
    low.join().unwrap();
    high.join().unwrap();
    thread::sleep(Duration::from_millis(150));
    scheduler.stop().unwrap();

    let ons = note_ons(&sink.messages());
    let lows: Vec<Instant> = ons.iter().filter(|(_, k)| *k < 60).map(|(at, _)| *at).collect();
    let highs: Vec<Instant> = ons.iter().filter(|(_, k)| *k >= 60).map(|(at, _)| *at).collect();
    assert_eq!(lows.len(), 3);
    assert_eq!(highs.len(), 3);
    for (a, b) in lows.iter().zip(&highs) {
        let skew = if a > b { *a - *b } else { *b - *a };
        assert!(skew < Duration::from_millis(10), "voices drifted apart by {skew:?}");
    }
}

#[test]
fn stopping_early_leaves_no_hanging_notes() {
    let (scheduler, sink) = recording_scheduler();
    let rhythm = eighth_bell("Loop", 600.0, COWBELL, BASS_DRUM);
    let handle = RhythmPlayer::new(scheduler.clone(), rhythm, quick_player())
        .unwrap()
        .start()
        .unwrap();

    thread::sleep(Duration::from_millis(270));
    handle.join().unwrap();
    scheduler.silence_all().unwrap();
    scheduler.stop().unwrap();
    scheduler.silence_all().unwrap();

    let messages = sink.messages();
    assert!(!note_ons(&messages).is_empty());
    assert_paired(&messages);
}

#[test]
fn stop_is_prompt_even_at_slow_tempo() {
    let (scheduler, _sink) = recording_scheduler();
    // 12 seconds per measure
    let rhythm = eighth_bell("Slow", 20.0, COWBELL, BASS_DRUM);
    let handle = RhythmPlayer::new(scheduler.clone(), rhythm, quick_player())
        .unwrap()
        .start()
        .unwrap();

    thread::sleep(Duration::from_millis(100));
    let asked = Instant::now();
    handle.join().unwrap();
    assert!(asked.elapsed() < Duration::from_millis(100));
    scheduler.stop().unwrap();
}

#[test]
fn zero_length_step_fails_the_player() {
    let (scheduler, _sink) = recording_scheduler();
    let handle = StepPlayer::new("stuck", scheduler.clone(), Stuck, 120.0, quick_player())
        .unwrap()
        .start()
        .unwrap();

    wait_finished(&handle, Duration::from_secs(1));
    let result = handle.join();
    assert!(
        matches!(result, Err(Error::Config(ConfigError::ZeroLengthStep))),
        "got {result:?}"
    );
    scheduler.stop().unwrap();
}

#[test]
fn invalid_tempo_is_rejected_up_front() {
    let (scheduler, _sink) = recording_scheduler();
    let result = StepPlayer::new("bad", scheduler.clone(), Stuck, 0.0, quick_player());
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidTempo { .. }))
    ));
    scheduler.stop().unwrap();
}

#[test]
fn unplayable_source_settings_are_rejected_before_start() {
    let (scheduler, _sink) = recording_scheduler();
    let config = quick_player();
    let backwards = RandomMelody::new(Scale::new(C_MAJOR).unwrap(), 1, config.ppq, Some(1))
        .velocity(90..=10);
    let result = StepPlayer::new("melody", scheduler.clone(), backwards, 120.0, config.clone());
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::OutOfRange { what: "velocity", .. }))
    ));

    let boxed: Box<dyn StepSource> = Box::new(
        RandomMelody::new(Scale::new(C_MAJOR).unwrap(), 1, config.ppq, Some(1)).gate(0.9..=0.1),
    );
    assert!(StepPlayer::new("boxed", scheduler.clone(), boxed, 120.0, config).is_err());
    scheduler.stop().unwrap();
}

#[test]
fn tempo_outside_the_playable_range_is_rejected() {
    let (scheduler, _sink) = recording_scheduler();
    for bpm in [1e-12, 5000.0, f64::NAN] {
        let result = StepPlayer::new("bad", scheduler.clone(), Stuck, bpm, quick_player());
        assert!(
            matches!(result, Err(Error::Config(ConfigError::InvalidTempo { .. }))),
            "{bpm} bpm accepted"
        );
    }
    scheduler.stop().unwrap();
}

#[test]
fn slow_output_does_not_push_later_onsets_back() {
    let sink = RecordingSink::new();
    let scheduler =
        EventScheduler::spawn(SlowSink(sink.clone()), SchedulerConfig::default()).unwrap();
    let config = quick_player();
    let origin = Instant::now() + Duration::from_millis(50);
    // half a beat at 240 BPM: 125ms per step
    let source = Ladder {
        next: 40,
        ticks: config.ppq as u64 / 2,
    };
    let handle = StepPlayer::new("ladder", scheduler.clone(), source, 240.0, config)
        .unwrap()
        .starting_at(origin)
        .limit(20)
        .start()
        .unwrap();

    wait_finished(&handle, Duration::from_secs(5));
    handle.join().unwrap();
    thread::sleep(Duration::from_millis(150));
    scheduler.stop().unwrap();

    let ons = note_ons(&sink.messages());
    assert_eq!(ons.len(), 20);
    for (k, (at, key)) in ons.iter().enumerate() {
        assert_eq!(*key, 40 + k as u8);
        let expected = origin + Duration::from_millis(125 * k as u64);
        assert!(
            *at + Duration::from_millis(2) >= expected,
            "onset {k} fired {:?} early",
            expected - *at
        );
        assert!(
            at.saturating_duration_since(expected) < Duration::from_millis(12),
            "onset {k} fired {:?} late",
            at.saturating_duration_since(expected)
        );
    }
}
