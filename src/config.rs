//! Tunable settings for the scheduler and the players.
//!
//! Every constant that shapes playback (polling quantum, start offset,
//! transition probabilities, section lengths) lives here rather than in the
//! player code, so variants are data, not forks.

use std::ops::RangeInclusive;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default tick resolution (pulses per quarter note).
pub const DEFAULT_PPQ: u32 = 960;

/// Tempo range every player accepts, in beats per minute.
pub const TEMPO_RANGE: RangeInclusive<f64> = 1.0..=1000.0;

/// Check a tempo against [`TEMPO_RANGE`]; `owner` names the rhythm or player
/// in the error.
pub fn validate_bpm(owner: &str, bpm: f64) -> Result<(), ConfigError> {
    if TEMPO_RANGE.contains(&bpm) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTempo {
            rhythm: owner.to_string(),
            bpm,
        })
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// How long the dispatch loop idles when nothing is queued. Bounds the
    /// time it takes to notice work or a stop request without a wake-up.
    pub poll_quantum: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_quantum: Duration::from_millis(5),
        }
    }
}

impl SchedulerConfig {
    /// A zero quantum would turn the idle wait into a busy loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_quantum.is_zero() {
            return Err(ConfigError::OutOfRange {
                what: "poll quantum (ms)",
                value: 0,
            });
        }
        Ok(())
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Tick resolution of the player's cursor.
    pub ppq: u32,
    /// Distance between "now" at player start and the first downbeat.
    pub start_offset: Duration,
    /// How far ahead of a window the player wakes to submit it.
    pub lookahead: Duration,
    /// Seed for the player's RNG; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            ppq: DEFAULT_PPQ,
            start_offset: Duration::from_millis(100),
            lookahead: Duration::from_millis(50),
            seed: None,
        }
    }
}

impl PlayerConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ppq == 0 {
            return Err(ConfigError::OutOfRange {
                what: "ppq",
                value: 0,
            });
        }
        Ok(())
    }
}

/// Shape of the groove / thin-out / hold / build-up cycle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct MixConfig {
    /// Shortest groove section, in measures.
    pub groove_min_measures: u32,
    /// Longest groove section, in measures (inclusive).
    pub groove_max_measures: u32,
    /// Chance of leaving the groove after each groove section.
    pub thin_out_probability: f64,
    /// Length of the core-only hold section.
    pub hold_measures: u32,
    /// Velocity of the incoming pattern's core parts on the first build-up
    /// measure.
    pub crossfade_start_velocity: u8,
    /// Velocity added per build-up measure.
    pub crossfade_step: u8,
    /// Play one measure of the incoming core parts alone, at the incoming
    /// tempo, before switching.
    pub bridge_measure: bool,
    /// Round groove lengths down to an even number of measures so every
    /// melodic call gets its response.
    pub even_grooves: bool,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self::rhythmic()
    }
}

impl MixConfig {
    /// Drums only: longer grooves, eager to transition.
    pub fn rhythmic() -> Self {
        Self {
            groove_min_measures: 3,
            groove_max_measures: 5,
            thin_out_probability: 0.9,
            hold_measures: 2,
            crossfade_start_velocity: 70,
            crossfade_step: 20,
            bridge_measure: true,
            even_grooves: false,
        }
    }

    /// Drums with melody: even-length grooves so call/response phrases pair.
    pub fn melodic() -> Self {
        Self {
            groove_min_measures: 4,
            groove_max_measures: 6,
            thin_out_probability: 0.8,
            even_grooves: true,
            ..Self::rhythmic()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.groove_min_measures == 0 {
            return Err(ConfigError::InvalidMix(
                "groove sections need at least one measure".into(),
            ));
        }
        if self.even_grooves && self.groove_max_measures < 2 {
            return Err(ConfigError::InvalidMix(
                "even grooves need a maximum of at least two measures".into(),
            ));
        }
        if self.groove_min_measures > self.groove_max_measures {
            return Err(ConfigError::InvalidMix(format!(
                "groove range {}..={} is empty",
                self.groove_min_measures, self.groove_max_measures
            )));
        }
        if !(0.0..=1.0).contains(&self.thin_out_probability) {
            return Err(ConfigError::InvalidMix(format!(
                "thin-out probability {} not in 0..=1",
                self.thin_out_probability
            )));
        }
        if self.hold_measures == 0 {
            return Err(ConfigError::InvalidMix(
                "hold needs at least one measure".into(),
            ));
        }
        if self.crossfade_start_velocity > 127 {
            return Err(ConfigError::OutOfRange {
                what: "crossfade velocity",
                value: self.crossfade_start_velocity as u32,
            });
        }
        Ok(())
    }
}
