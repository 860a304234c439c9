use std::time::{Duration, Instant};

/// Maps a player's tick cursor onto the monotonic clock.
///
/// Instants are always computed from the absolute tick count, never by
/// accumulating per-step durations, so a cursor that advances by exact tick
/// amounts lands on exact instants no matter how late anything ran.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    origin: Instant,
    bpm: f64,
    ppq: u32,
}

impl Timeline {
    pub fn new(origin: Instant, bpm: f64, ppq: u32) -> Self {
        Self { origin, bpm, ppq }
    }

    /// Timeline whose tick 0 is `offset` from now.
    pub fn starting_in(offset: Duration, bpm: f64, ppq: u32) -> Self {
        Self::new(Instant::now() + offset, bpm, ppq)
    }

    pub fn origin(&self) -> Instant {
        self.origin
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Wall-clock length of `ticks`.
    pub fn duration_of(&self, ticks: u64) -> Duration {
        Duration::from_secs_f64(ticks as f64 * self.seconds_per_beat() / self.ppq as f64)
    }

    /// Instant of tick `ticks`.
    pub fn at(&self, ticks: u64) -> Instant {
        self.origin + self.duration_of(ticks)
    }

    /// Convert a beat position to ticks, rounding to the nearest tick.
    pub fn beats_to_ticks(&self, beats: f64) -> u64 {
        beats_to_ticks(beats, self.ppq)
    }

    /// A new timeline at a different tempo whose tick 0 falls on this
    /// timeline's tick `ticks`. Used when a player changes pattern mid-run.
    pub fn rebase(&self, ticks: u64, bpm: f64) -> Self {
        Self::new(self.at(ticks), bpm, self.ppq)
    }
}

/// Round a (non-negative) beat position to ticks.
pub fn beats_to_ticks(beats: f64, ppq: u32) -> u64 {
    (beats.max(0.0) * ppq as f64).round() as u64
}
