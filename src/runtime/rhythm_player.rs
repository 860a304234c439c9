use std::time::Instant;

use tracing::{debug, info};

use super::handle::{spawn, Player, PlayerHandle};
use super::signal::StopSignal;
use super::track::Track;
use super::wake_before;
use crate::config::PlayerConfig;
use crate::engine::{EventScheduler, Timeline};
use crate::error::Result;
use crate::sequencing::Rhythm;

/// Loops every part of one rhythm, one measure at a time.
///
/// Each measure is submitted whole, then the player sleeps until
/// `lookahead` before the next measure begins.
pub struct RhythmPlayer {
    rhythm: Rhythm,
    scheduler: EventScheduler,
    config: PlayerConfig,
    origin: Option<Instant>,
    measures: Option<u64>,
}

impl RhythmPlayer {
    pub fn new(scheduler: EventScheduler, rhythm: Rhythm, config: PlayerConfig) -> Result<Self> {
        rhythm.validate()?;
        config.validate()?;
        Ok(Self {
            rhythm,
            scheduler,
            config,
            origin: None,
            measures: None,
        })
    }

    /// Put the first downbeat at `origin`, shared with other players.
    pub fn starting_at(mut self, origin: Instant) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Stop by itself after `measures` measures.
    pub fn limit(mut self, measures: u64) -> Self {
        self.measures = Some(measures);
        self
    }

    pub fn rhythm(&self) -> &Rhythm {
        &self.rhythm
    }

    pub fn start(self) -> Result<PlayerHandle> {
        spawn(self)
    }
}

impl Player for RhythmPlayer {
    fn name(&self) -> &str {
        "rhythm"
    }

    fn run(&mut self, stop: &StopSignal) -> Result<()> {
        let ppq = self.config.ppq;
        let timeline = match self.origin {
            Some(origin) => Timeline::new(origin, self.rhythm.bpm, ppq),
            None => Timeline::starting_in(self.config.start_offset, self.rhythm.bpm, ppq),
        };
        let measure_ticks = self.rhythm.measure_ticks(ppq);
        let tracks: Vec<Track> = self
            .rhythm
            .parts
            .iter()
            .map(|part| Track::from_part(part, self.rhythm.channel))
            .collect();

        info!(
            rhythm = %self.rhythm.name,
            bpm = self.rhythm.bpm,
            beats = self.rhythm.beats_per_measure,
            "playing rhythm"
        );

        let mut cursor = 0u64;
        let mut measure = 0u64;
        while !stop.is_stopped() {
            if self.measures.is_some_and(|limit| measure >= limit) {
                break;
            }
            let notes: usize = tracks
                .iter()
                .map(|track| track.schedule(&self.scheduler, &timeline, cursor, measure_ticks))
                .sum();
            debug!(measure, cursor, notes, "measure submitted");

            cursor += measure_ticks;
            measure += 1;
            if stop.wait_until(wake_before(&timeline, cursor, self.config.lookahead)) {
                break;
            }
        }
        Ok(())
    }
}
