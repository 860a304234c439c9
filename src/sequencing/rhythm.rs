use crate::config::validate_bpm;
use crate::engine::timeline::beats_to_ticks;
use crate::error::ConfigError;
use crate::io::midi::DRUM_CHANNEL;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One note of a part, positioned within a measure.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Onset, in beats from the start of the measure
    pub beat: f64,
    /// MIDI note number
    pub note: u8,
    /// MIDI velocity (0-127)
    pub velocity: u8,
    /// Sounding length in beats
    pub length: f64,
}

impl Hit {
    pub const fn new(beat: f64, note: u8, velocity: u8, length: f64) -> Self {
        Self {
            beat,
            note,
            velocity,
            length,
        }
    }

    pub fn onset_ticks(&self, ppq: u32) -> u64 {
        beats_to_ticks(self.beat, ppq)
    }

    /// Never zero, so every note-off lands after its note-on.
    pub fn length_ticks(&self, ppq: u32) -> u64 {
        beats_to_ticks(self.length, ppq).max(1)
    }
}

/// A named rhythmic role (a drum, a bell, a shaker).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    pub hits: Vec<Hit>,
}

fn default_channel() -> u8 {
    DRUM_CHANNEL
}

/// A looping multi-part pattern, one measure long.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Rhythm {
    pub name: String,
    pub bpm: f64,
    pub beats_per_measure: u32,
    /// Order in which parts are introduced; thinning removes in reverse.
    pub build_order: Vec<String>,
    /// Parts that keep playing through thin-out and hold.
    pub core: Vec<String>,
    pub parts: Vec<Part>,
    #[cfg_attr(feature = "serde", serde(default = "default_channel"))]
    pub channel: u8,
}

impl Rhythm {
    pub fn builder(name: impl Into<String>, bpm: f64, beats_per_measure: u32) -> RhythmBuilder {
        RhythmBuilder::new(name.into(), bpm, beats_per_measure)
    }

    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }

    pub fn is_core(&self, name: &str) -> bool {
        self.core.iter().any(|c| c == name)
    }

    /// Measure length in ticks.
    pub fn measure_ticks(&self, ppq: u32) -> u64 {
        self.beats_per_measure as u64 * ppq as u64
    }

    /// Non-core parts, in build order.
    pub fn layered_parts(&self) -> Vec<&str> {
        self.build_order
            .iter()
            .map(String::as_str)
            .filter(|name| !self.is_core(name))
            .collect()
    }

    /// Core parts, in build order.
    pub fn core_parts(&self) -> Vec<&str> {
        self.build_order
            .iter()
            .map(String::as_str)
            .filter(|name| self.is_core(name))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rhythm = || self.name.clone();

        if self.parts.is_empty() {
            return Err(ConfigError::EmptyRhythm { rhythm: rhythm() });
        }
        validate_bpm(&self.name, self.bpm)?;
        if self.beats_per_measure == 0 {
            return Err(ConfigError::EmptyMeasure { rhythm: rhythm() });
        }
        if self.channel > 15 {
            return Err(ConfigError::OutOfRange {
                what: "channel",
                value: self.channel as u32,
            });
        }

        for part in &self.parts {
            for hit in &part.hits {
                if !(hit.beat >= 0.0 && hit.beat < self.beats_per_measure as f64) {
                    return Err(ConfigError::HitOutsideMeasure {
                        rhythm: rhythm(),
                        part: part.name.clone(),
                        beat: hit.beat,
                        beats: self.beats_per_measure,
                    });
                }
                if !(hit.length.is_finite() && hit.length > 0.0) {
                    return Err(ConfigError::InvalidLength {
                        rhythm: rhythm(),
                        part: part.name.clone(),
                        length: hit.length,
                    });
                }
                if hit.note > 127 {
                    return Err(ConfigError::OutOfRange {
                        what: "note",
                        value: hit.note as u32,
                    });
                }
                if hit.velocity > 127 {
                    return Err(ConfigError::OutOfRange {
                        what: "velocity",
                        value: hit.velocity as u32,
                    });
                }
            }
            if !self.build_order.contains(&part.name) {
                return Err(ConfigError::PartNotInBuildOrder {
                    rhythm: rhythm(),
                    part: part.name.clone(),
                });
            }
        }

        for name in self.build_order.iter().chain(&self.core) {
            if self.part(name).is_none() {
                return Err(ConfigError::UnknownPart {
                    rhythm: rhythm(),
                    part: name.clone(),
                });
            }
        }
        if self.core.is_empty() {
            return Err(ConfigError::NoCoreParts { rhythm: rhythm() });
        }
        Ok(())
    }
}

/// Fluent construction of a [`Rhythm`].
pub struct RhythmBuilder {
    name: String,
    bpm: f64,
    beats_per_measure: u32,
    parts: Vec<Part>,
    build_order: Option<Vec<String>>,
    core: Option<Vec<String>>,
    channel: u8,
}

impl RhythmBuilder {
    fn new(name: String, bpm: f64, beats_per_measure: u32) -> Self {
        Self {
            name,
            bpm,
            beats_per_measure,
            parts: Vec::new(),
            build_order: None,
            core: None,
            channel: DRUM_CHANNEL,
        }
    }

    /// Add a part with its hits.
    pub fn part(mut self, name: impl Into<String>, hits: impl Into<Vec<Hit>>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            hits: hits.into(),
        });
        self
    }

    /// Defaults to the order parts were added.
    pub fn build_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    /// Defaults to the first part of the build order.
    pub fn core<I, S>(mut self, core: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.core = Some(core.into_iter().map(Into::into).collect());
        self
    }

    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn build(self) -> Result<Rhythm, ConfigError> {
        let build_order = self
            .build_order
            .unwrap_or_else(|| self.parts.iter().map(|p| p.name.clone()).collect());
        let core = self
            .core
            .unwrap_or_else(|| build_order.iter().take(1).cloned().collect());

        let rhythm = Rhythm {
            name: self.name,
            bpm: self.bpm,
            beats_per_measure: self.beats_per_measure,
            build_order,
            core,
            parts: self.parts,
            channel: self.channel,
        };
        rhythm.validate()?;
        Ok(rhythm)
    }
}
