use std::time::Instant;

use tracing::{debug, info};

use super::handle::{spawn, Player, PlayerHandle};
use super::signal::StopSignal;
use super::wake_before;
use crate::config::{validate_bpm, PlayerConfig};
use crate::engine::{EventScheduler, Timeline};
use crate::error::{ConfigError, Result};
use crate::io::MidiEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepNote {
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
}

/// What a step player emits at one cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Sounded together at the step's onset; empty for a rest.
    pub notes: Vec<StepNote>,
    /// How long the notes sound.
    pub length_ticks: u64,
    /// Distance from this onset to the next.
    pub advance_ticks: u64,
}

impl Step {
    pub fn rest(advance_ticks: u64) -> Self {
        Self {
            notes: Vec::new(),
            length_ticks: 0,
            advance_ticks,
        }
    }

    /// A single note that sounds for the whole step.
    pub fn note(channel: u8, note: u8, velocity: u8, ticks: u64) -> Self {
        Self::chord(channel, &[note], velocity, ticks)
    }

    pub fn chord(channel: u8, notes: &[u8], velocity: u8, ticks: u64) -> Self {
        Self {
            notes: notes
                .iter()
                .map(|&note| StepNote {
                    channel,
                    note,
                    velocity,
                })
                .collect(),
            length_ticks: ticks,
            advance_ticks: ticks,
        }
    }

    /// Sound for `length_ticks` but keep the step's advance.
    pub fn gated(mut self, length_ticks: u64) -> Self {
        self.length_ticks = length_ticks;
        self
    }

    pub fn is_rest(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Endless generator of steps.
pub trait StepSource: Send + 'static {
    fn next_step(&mut self) -> Step;

    /// Program changes to send before the first step.
    fn programs(&self) -> Vec<MidiEvent> {
        Vec::new()
    }

    /// Reject settings `next_step` could not honour. Called by
    /// [`StepPlayer::new`] before any thread starts.
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        Ok(())
    }
}

impl<S: StepSource + ?Sized> StepSource for Box<S> {
    fn next_step(&mut self) -> Step {
        (**self).next_step()
    }

    fn programs(&self) -> Vec<MidiEvent> {
        (**self).programs()
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        (**self).validate()
    }
}

/// Plays a [`StepSource`] one step at a time.
///
/// After submitting a step the player sleeps until `lookahead` before the
/// next onset, computed from the absolute cursor so sleep overshoot never
/// accumulates.
pub struct StepPlayer<S> {
    name: String,
    source: S,
    scheduler: EventScheduler,
    config: PlayerConfig,
    bpm: f64,
    origin: Option<Instant>,
    steps: Option<u64>,
}

impl<S: StepSource> StepPlayer<S> {
    pub fn new(
        name: impl Into<String>,
        scheduler: EventScheduler,
        source: S,
        bpm: f64,
        config: PlayerConfig,
    ) -> Result<Self> {
        let name = name.into();
        validate_bpm(&name, bpm)?;
        config.validate()?;
        source.validate()?;
        Ok(Self {
            name,
            source,
            scheduler,
            config,
            bpm,
            origin: None,
            steps: None,
        })
    }

    /// Put tick 0 at `origin` instead of `start_offset` from thread start,
    /// so several players can share one downbeat.
    pub fn starting_at(mut self, origin: Instant) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Stop by itself after `steps` steps.
    pub fn limit(mut self, steps: u64) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn start(self) -> Result<PlayerHandle> {
        spawn(self)
    }
}

impl<S: StepSource> Player for StepPlayer<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, stop: &StopSignal) -> Result<()> {
        for program in self.source.programs() {
            self.scheduler.send_now(program)?;
        }

        let ppq = self.config.ppq;
        let timeline = match self.origin {
            Some(origin) => Timeline::new(origin, self.bpm, ppq),
            None => Timeline::starting_in(self.config.start_offset, self.bpm, ppq),
        };
        info!(player = %self.name, bpm = self.bpm, "step player running");

        let mut cursor = 0u64;
        let mut steps = 0u64;
        while !stop.is_stopped() {
            if self.steps.is_some_and(|limit| steps >= limit) {
                break;
            }
            let step = self.source.next_step();
            if step.advance_ticks == 0 {
                return Err(ConfigError::ZeroLengthStep.into());
            }

            if !step.is_rest() {
                let on = timeline.at(cursor);
                let off = timeline.at(cursor + step.length_ticks.max(1));
                for n in &step.notes {
                    self.scheduler
                        .submit(on, MidiEvent::note_on(n.channel, n.note, n.velocity));
                }
                for n in &step.notes {
                    self.scheduler.submit(off, MidiEvent::note_off(n.channel, n.note));
                }
            }
            debug!(player = %self.name, cursor, notes = step.notes.len(), "step submitted");

            cursor += step.advance_ticks;
            steps += 1;
            if stop.wait_until(wake_before(&timeline, cursor, self.config.lookahead)) {
                break;
            }
        }
        Ok(())
    }
}
