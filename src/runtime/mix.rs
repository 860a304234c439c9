//! Mix player - cycles through patterns with thinning and build-up
//!
//! ```text
//! Groove --(p)--> ThinOut --> Hold --> BuildUp --> [Bridge] --> Groove (next pattern)
//!   ^  |
//!   +--+ (1 - p)
//! ```
//!
//! Every section is a whole number of measures of the pattern currently on
//! the timeline. The switch to the next pattern rebases the timeline at the
//! next measure boundary with the incoming tempo.

use std::fmt;

use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info};

use super::handle::{spawn, Player, PlayerHandle};
use super::rng_from;
use super::signal::StopSignal;
use super::track::Track;
use super::voice_set::VoiceSet;
use super::wake_before;
use crate::config::{MixConfig, PlayerConfig};
use crate::engine::{EventScheduler, Timeline};
use crate::error::Result;
use crate::sequencing::Rhythm;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixState {
    /// Full pattern (plus melody, if any).
    Groove,
    /// Non-core parts drop out one per measure.
    ThinOut,
    /// Core parts only.
    Hold,
    /// Non-core parts return while the next pattern's core fades in.
    BuildUp,
    /// The next pattern's core alone, at its own tempo.
    Bridge,
}

impl fmt::Display for MixState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MixState::Groove => "groove",
            MixState::ThinOut => "thin-out",
            MixState::Hold => "hold",
            MixState::BuildUp => "build-up",
            MixState::Bridge => "bridge",
        };
        f.write_str(name)
    }
}

/// One finished section, as reported to observers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRecord {
    pub state: MixState,
    /// Index of the pattern whose measure grid the section used.
    pub pattern: usize,
    pub measures: u32,
    /// Section start on the current timeline (reset to 0 at each switch).
    pub start_tick: u64,
    pub measure_ticks: u64,
}

pub struct MixPlayer {
    voices: VoiceSet,
    scheduler: EventScheduler,
    mix: MixConfig,
    config: PlayerConfig,
    observer: Option<Sender<SectionRecord>>,
    rng: StdRng,
    state: MixState,
    current: usize,
    cursor: u64,
}

impl MixPlayer {
    pub fn new(
        scheduler: EventScheduler,
        voices: VoiceSet,
        mix: MixConfig,
        config: PlayerConfig,
    ) -> Result<Self> {
        voices.validate()?;
        mix.validate()?;
        config.validate()?;
        let rng = rng_from(config.seed);
        Ok(Self {
            voices,
            scheduler,
            mix,
            config,
            observer: None,
            rng,
            state: MixState::Groove,
            current: 0,
            cursor: 0,
        })
    }

    /// Report each finished section on `observer`.
    pub fn with_observer(mut self, observer: Sender<SectionRecord>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn start(self) -> Result<PlayerHandle> {
        spawn(self)
    }

    fn rhythm(&self, index: usize) -> &Rhythm {
        self.voices.rhythm(index)
    }

    fn next_index(&self) -> usize {
        (self.current + 1) % self.voices.len()
    }

    fn report(&self, state: MixState, pattern: usize, measures: u32, start_tick: u64) {
        let record = SectionRecord {
            state,
            pattern,
            measures,
            start_tick,
            measure_ticks: self.rhythm(pattern).measure_ticks(self.config.ppq),
        };
        debug!(?record, "section finished");
        if let Some(observer) = &self.observer {
            let _ = observer.send(record);
        }
    }

    /// Submit one measure and sleep until just before the next.
    /// Returns `true` if stopped.
    fn play_measure(&mut self, timeline: &Timeline, tracks: &[Track], stop: &StopSignal) -> bool {
        let measure_ticks = self.rhythm(self.current).measure_ticks(timeline.ppq());
        for track in tracks {
            track.schedule(&self.scheduler, timeline, self.cursor, measure_ticks);
        }
        self.cursor += measure_ticks;
        stop.wait_until(wake_before(timeline, self.cursor, self.config.lookahead))
    }

    fn tracks_of<'a>(rhythm: &Rhythm, names: impl IntoIterator<Item = &'a str>) -> Vec<Track> {
        names
            .into_iter()
            .filter_map(|name| rhythm.part(name))
            .map(|part| Track::from_part(part, rhythm.channel))
            .collect()
    }

    fn groove(&mut self, timeline: &Timeline, stop: &StopSignal) -> bool {
        let mut measures = self
            .rng
            .gen_range(self.mix.groove_min_measures..=self.mix.groove_max_measures);
        if self.mix.even_grooves {
            measures = (measures / 2 * 2).max(2);
        }

        let rhythm = self.rhythm(self.current).clone();
        info!(rhythm = %rhythm.name, measures, "groove");
        let drums = Self::tracks_of(&rhythm, rhythm.build_order.iter().map(String::as_str));

        let start = self.cursor;
        for _ in 0..measures {
            let mut tracks = drums.clone();
            if let Some(melody) = self.voices.melody_mut() {
                tracks.extend(melody.generate(&rhythm.name, &mut self.rng));
            }
            if self.play_measure(timeline, &tracks, stop) {
                return true;
            }
        }
        self.report(MixState::Groove, self.current, measures, start);

        if self.rng.gen_bool(self.mix.thin_out_probability) {
            self.state = MixState::ThinOut;
        }
        false
    }

    fn thin_out(&mut self, timeline: &Timeline, stop: &StopSignal) -> bool {
        let rhythm = self.rhythm(self.current).clone();
        let mut active: Vec<&str> = rhythm.build_order.iter().map(String::as_str).collect();
        let layered = rhythm.layered_parts();
        info!(rhythm = %rhythm.name, parts = layered.len(), "thinning out");

        let start = self.cursor;
        for _ in 0..layered.len() {
            let tracks = Self::tracks_of(&rhythm, active.iter().copied());
            if self.play_measure(timeline, &tracks, stop) {
                return true;
            }
            // drop the last non-core part still playing
            if let Some(pos) = active.iter().rposition(|name| !rhythm.is_core(name)) {
                active.remove(pos);
            }
        }
        if !layered.is_empty() {
            self.report(MixState::ThinOut, self.current, layered.len() as u32, start);
        }
        self.state = MixState::Hold;
        false
    }

    fn hold(&mut self, timeline: &Timeline, stop: &StopSignal) -> bool {
        let rhythm = self.rhythm(self.current).clone();
        let tracks = Self::tracks_of(&rhythm, rhythm.core_parts());
        info!(rhythm = %rhythm.name, measures = self.mix.hold_measures, "holding core");

        let start = self.cursor;
        for _ in 0..self.mix.hold_measures {
            if self.play_measure(timeline, &tracks, stop) {
                return true;
            }
        }
        self.report(MixState::Hold, self.current, self.mix.hold_measures, start);
        self.state = MixState::BuildUp;
        false
    }

    fn build_up(&mut self, timeline: &Timeline, stop: &StopSignal) -> bool {
        let rhythm = self.rhythm(self.current).clone();
        let next_index = self.next_index();
        let incoming = (next_index != self.current).then(|| self.rhythm(next_index).clone());

        if let Some(melody) = self.voices.melody_mut() {
            melody.rotate();
            let [lead, ..] = melody.channels();
            info!(lead_channel = lead, "melody roles rotated");
        }
        info!(
            from = %rhythm.name,
            to = %incoming.as_ref().map_or(rhythm.name.as_str(), |r| r.name.as_str()),
            "building up"
        );

        let layered = rhythm.layered_parts();
        let mut active = rhythm.core_parts();
        let steps = layered.len().max(1);

        let start = self.cursor;
        for step in 0..steps {
            if let Some(&part) = layered.get(step) {
                active.push(part);
            }
            let mut tracks = Self::tracks_of(&rhythm, active.iter().copied());
            if let Some(next) = &incoming {
                let velocity = crossfade_velocity(&self.mix, step);
                tracks.extend(
                    Self::tracks_of(next, next.core_parts())
                        .into_iter()
                        .map(|t| t.with_velocity(velocity)),
                );
            }
            if self.play_measure(timeline, &tracks, stop) {
                return true;
            }
        }
        self.report(MixState::BuildUp, self.current, steps as u32, start);
        self.state = MixState::Groove;
        false
    }

    fn bridge(&mut self, timeline: &Timeline, stop: &StopSignal) -> bool {
        let rhythm = self.rhythm(self.current).clone();
        info!(rhythm = %rhythm.name, "bridge");
        let tracks = Self::tracks_of(&rhythm, rhythm.core_parts());
        let start = self.cursor;
        if self.play_measure(timeline, &tracks, stop) {
            return true;
        }
        self.report(MixState::Bridge, self.current, 1, start);
        self.state = MixState::Groove;
        false
    }

    /// Move to the next pattern: rebase the timeline at the current cursor
    /// with the incoming tempo.
    fn switch(&mut self, timeline: &Timeline) -> Timeline {
        let next = self.next_index();
        let rebased = timeline.rebase(self.cursor, self.rhythm(next).bpm);
        self.current = next;
        self.cursor = 0;
        info!(rhythm = %self.rhythm(next).name, bpm = rebased.bpm(), "switched pattern");
        rebased
    }
}

/// Velocity of the incoming core on build-up measure `step`.
pub fn crossfade_velocity(mix: &MixConfig, step: usize) -> u8 {
    let velocity =
        mix.crossfade_start_velocity as usize + step.saturating_mul(mix.crossfade_step as usize);
    velocity.min(127) as u8
}

impl Player for MixPlayer {
    fn name(&self) -> &str {
        if self.voices.melody().is_some() {
            "melodic-mix"
        } else {
            "rhythmic-mix"
        }
    }

    fn run(&mut self, stop: &StopSignal) -> Result<()> {
        if let Some(melody) = self.voices.melody() {
            for program in melody.program_changes() {
                self.scheduler.send_now(program)?;
            }
        }

        let first = self.rhythm(self.current);
        let mut timeline =
            Timeline::starting_in(self.config.start_offset, first.bpm, self.config.ppq);
        info!(rhythm = %first.name, patterns = self.voices.len(), "starting mix");

        while !stop.is_stopped() {
            let stopped = match self.state {
                MixState::Groove => self.groove(&timeline, stop),
                MixState::ThinOut => self.thin_out(&timeline, stop),
                MixState::Hold => self.hold(&timeline, stop),
                MixState::BuildUp => {
                    let stopped = self.build_up(&timeline, stop);
                    if !stopped && self.next_index() != self.current {
                        timeline = self.switch(&timeline);
                        if self.mix.bridge_measure {
                            self.state = MixState::Bridge;
                        }
                    }
                    stopped
                }
                MixState::Bridge => self.bridge(&timeline, stop),
            };
            if stopped {
                break;
            }
        }
        Ok(())
    }
}
