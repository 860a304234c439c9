use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::track::Track;
use crate::error::ConfigError;
use crate::io::MidiEvent;
use crate::sequencing::notes::{FLUTE, KALIMBA, MARIMBA, VEL_GHOST, VEL_NORMAL};
use crate::sequencing::{Hit, Phrase, PhraseTable, Rhythm, RhythmLibrary, Scale};

const LEAD_LENGTH: f64 = 0.4;
const HARMONY_LENGTH: f64 = 0.6;
const PAD_LENGTH: f64 = 2.0;
/// Harmony sits this many scale steps under the phrase degree.
const HARMONY_OFFSET: i32 = -2;

/// Melodic phrase generator layered over the drums.
///
/// Three roles on three channels: lead (call/response), harmony and pad.
/// Roles rotate across channels on every [`rotate`](Self::rotate).
#[derive(Debug, Clone)]
pub struct MelodyLayer {
    phrases: BTreeMap<String, PhraseTable>,
    scale: Scale,
    /// lead, harmony, pad
    channels: [u8; 3],
    /// Program per channel slot, fixed to the channel (not the role).
    programs: [(u8, u8); 3],
    base: usize,
    is_call: bool,
}

impl MelodyLayer {
    pub fn new(phrases: BTreeMap<String, PhraseTable>, scale: Scale) -> Self {
        let base = scale.midpoint();
        Self {
            phrases,
            scale,
            channels: [0, 1, 2],
            programs: [(0, KALIMBA), (1, MARIMBA), (2, FLUTE)],
            base,
            is_call: true,
        }
    }

    pub fn from_library(library: &RhythmLibrary) -> Self {
        Self::new(library.phrases.clone(), library.scale.clone())
    }

    /// Assign channels and their programs, in lead/harmony/pad order.
    pub fn with_channels(mut self, channels: [u8; 3], programs: [u8; 3]) -> Self {
        self.channels = channels;
        self.programs = [
            (channels[0], programs[0]),
            (channels[1], programs[1]),
            (channels[2], programs[2]),
        ];
        self
    }

    pub fn validate(&self, rhythms: &[Rhythm]) -> Result<(), ConfigError> {
        if self.scale.is_empty() {
            return Err(ConfigError::EmptyScale);
        }
        if let Some(&channel) = self.channels.iter().find(|&&c| c > 15) {
            return Err(ConfigError::OutOfRange {
                what: "channel",
                value: channel as u32,
            });
        }
        if let Some(&(_, program)) = self.programs.iter().find(|(_, p)| *p > 127) {
            return Err(ConfigError::OutOfRange {
                what: "program",
                value: program as u32,
            });
        }
        for rhythm in rhythms {
            let table = self
                .phrases
                .get(&rhythm.name)
                .ok_or_else(|| ConfigError::MissingPhrases {
                    rhythm: rhythm.name.clone(),
                })?;
            table.validate(&rhythm.name, rhythm.beats_per_measure)?;
        }
        Ok(())
    }

    /// Current lead, harmony and pad channels.
    pub fn channels(&self) -> [u8; 3] {
        self.channels
    }

    /// Program changes for the melody channels.
    pub fn program_changes(&self) -> Vec<MidiEvent> {
        self.programs
            .iter()
            .map(|&(channel, program)| MidiEvent::ProgramChange { channel, program })
            .collect()
    }

    /// Lead moves to the harmony's channel, harmony to the pad's, pad to
    /// the lead's.
    pub fn rotate(&mut self) {
        self.channels.rotate_left(1);
    }

    /// Fresh phrases for one measure of `rhythm`: lead, harmony and pad.
    ///
    /// The lead alternates between call and response phrases on every call.
    pub fn generate(&mut self, rhythm: &str, rng: &mut StdRng) -> Vec<Track> {
        let Some(table) = self.phrases.get(rhythm) else {
            return Vec::new();
        };
        let [lead_ch, harmony_ch, pad_ch] = self.channels;

        let lead_pool = if self.is_call {
            &table.calls
        } else {
            &table.responses
        };
        self.is_call = !self.is_call;

        let mut tracks = Vec::with_capacity(3);
        if let Some(phrase) = lead_pool.choose(rng) {
            tracks.push(self.voice("lead", lead_ch, phrase, 0, VEL_NORMAL, LEAD_LENGTH));
        }
        if let Some(phrase) = table.harmonies.choose(rng) {
            tracks.push(self.voice(
                "harmony",
                harmony_ch,
                phrase,
                HARMONY_OFFSET,
                VEL_GHOST,
                HARMONY_LENGTH,
            ));
        }
        tracks.push(self.voice("pad", pad_ch, &table.pad, 0, VEL_GHOST - 10, PAD_LENGTH));
        tracks
    }

    fn voice(
        &self,
        name: &str,
        channel: u8,
        phrase: &Phrase,
        offset: i32,
        velocity: u8,
        length: f64,
    ) -> Track {
        let hits = phrase
            .iter()
            .map(|&(beat, degree)| {
                let note = self.scale.note(self.base, degree + offset);
                Hit::new(beat, note, velocity, length)
            })
            .collect();
        Track::new(name, channel, hits)
    }
}

/// The patterns a mix cycles through, with or without a melody layer.
#[derive(Debug, Clone)]
pub struct VoiceSet {
    rhythms: Vec<Rhythm>,
    melody: Option<MelodyLayer>,
}

impl VoiceSet {
    /// Drums only.
    pub fn rhythmic(rhythms: Vec<Rhythm>) -> Self {
        Self {
            rhythms,
            melody: None,
        }
    }

    /// Drums with a melody layer.
    pub fn melodic(rhythms: Vec<Rhythm>, melody: MelodyLayer) -> Self {
        Self {
            rhythms,
            melody: Some(melody),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rhythms.is_empty() {
            return Err(ConfigError::NoRhythms);
        }
        for rhythm in &self.rhythms {
            rhythm.validate()?;
        }
        if let Some(melody) = &self.melody {
            melody.validate(&self.rhythms)?;
        }
        Ok(())
    }

    pub fn rhythms(&self) -> &[Rhythm] {
        &self.rhythms
    }

    pub fn rhythm(&self, index: usize) -> &Rhythm {
        &self.rhythms[index % self.rhythms.len()]
    }

    pub fn len(&self) -> usize {
        self.rhythms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhythms.is_empty()
    }

    pub fn melody(&self) -> Option<&MelodyLayer> {
        self.melody.as_ref()
    }

    pub fn melody_mut(&mut self) -> Option<&mut MelodyLayer> {
        self.melody.as_mut()
    }
}
