use super::notes::A_MINOR_PENTATONIC;
use crate::error::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `(beat, scale-degree offset)` pairs making up one measure of melody.
pub type Phrase = Vec<(f64, i32)>;

fn default_pad() -> Phrase {
    vec![(0.0, -4)]
}

/// Melodic material for one rhythm: call and response phrases for the lead,
/// harmony phrases, and the long pad notes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseTable {
    pub calls: Vec<Phrase>,
    pub responses: Vec<Phrase>,
    pub harmonies: Vec<Phrase>,
    #[cfg_attr(feature = "serde", serde(default = "default_pad"))]
    pub pad: Phrase,
}

impl PhraseTable {
    pub fn new(calls: Vec<Phrase>, responses: Vec<Phrase>, harmonies: Vec<Phrase>) -> Self {
        Self {
            calls,
            responses,
            harmonies,
            pad: default_pad(),
        }
    }

    pub fn with_pad(mut self, pad: Phrase) -> Self {
        self.pad = pad;
        self
    }

    /// Check that every phrase kind is populated and every beat lies inside
    /// a `beats`-beat measure.
    pub fn validate(&self, rhythm: &str, beats: u32) -> Result<(), ConfigError> {
        let groups: [(&'static str, &[Phrase]); 3] = [
            ("call", &self.calls),
            ("response", &self.responses),
            ("harmony", &self.harmonies),
        ];
        for (kind, phrases) in groups {
            if phrases.is_empty() {
                return Err(ConfigError::EmptyPhrases {
                    rhythm: rhythm.to_string(),
                    kind,
                });
            }
            for phrase in phrases {
                check_beats(rhythm, kind, phrase, beats)?;
            }
        }
        check_beats(rhythm, "pad", &self.pad, beats)
    }
}

fn check_beats(rhythm: &str, kind: &str, phrase: &Phrase, beats: u32) -> Result<(), ConfigError> {
    match phrase
        .iter()
        .find(|(beat, _)| !(*beat >= 0.0 && *beat < beats as f64))
    {
        Some(&(beat, _)) => Err(ConfigError::HitOutsideMeasure {
            rhythm: rhythm.to_string(),
            part: kind.to_string(),
            beat,
            beats,
        }),
        None => Ok(()),
    }
}

/// Ordered set of MIDI notes that phrase degrees index into.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<u8>", into = "Vec<u8>"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    notes: Vec<u8>,
}

impl Scale {
    pub fn new(notes: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let notes = notes.into();
        if notes.is_empty() {
            return Err(ConfigError::EmptyScale);
        }
        if let Some(&note) = notes.iter().find(|&&n| n > 127) {
            return Err(ConfigError::OutOfRange {
                what: "note",
                value: note as u32,
            });
        }
        Ok(Self { notes })
    }

    pub fn a_minor_pentatonic() -> Self {
        Self {
            notes: A_MINOR_PENTATONIC.to_vec(),
        }
    }

    pub fn notes(&self) -> &[u8] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Index of the middle note; melodies start from here.
    pub fn midpoint(&self) -> usize {
        self.notes.len() / 2
    }

    /// Note `degree` steps from `base`, clamped to the ends of the scale.
    pub fn note(&self, base: usize, degree: i32) -> u8 {
        let last = self.notes.len() as i64 - 1;
        let index = (base as i64 + degree as i64).clamp(0, last.max(0));
        self.notes[index as usize]
    }
}

impl TryFrom<Vec<u8>> for Scale {
    type Error = ConfigError;

    fn try_from(notes: Vec<u8>) -> Result<Self, Self::Error> {
        Scale::new(notes)
    }
}

impl From<Scale> for Vec<u8> {
    fn from(scale: Scale) -> Self {
        scale.notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PhraseTable {
        PhraseTable::new(
            vec![vec![(0.5, 2), (1.5, 4)]],
            vec![vec![(0.5, 1)]],
            vec![vec![(0.0, 0)]],
        )
    }

    #[test]
    fn degrees_clamp_to_scale_ends() {
        let scale = Scale::new(A_MINOR_PENTATONIC).unwrap();
        assert_eq!(scale.midpoint(), 3);
        assert_eq!(scale.note(3, 0), 76);
        assert_eq!(scale.note(3, 2), 81);
        assert_eq!(scale.note(3, -10), 69, "below the scale clamps to the lowest note");
        assert_eq!(scale.note(3, 10), 84, "above the scale clamps to the highest note");
    }

    #[test]
    fn empty_scale_is_rejected() {
        assert_eq!(Scale::new(Vec::new()), Err(ConfigError::EmptyScale));
    }

    #[test]
    fn default_pad_is_one_long_low_note() {
        assert_eq!(table().pad, vec![(0.0, -4)]);
    }

    #[test]
    fn missing_responses_are_rejected() {
        let mut t = table();
        t.responses.clear();
        assert_eq!(
            t.validate("x", 4),
            Err(ConfigError::EmptyPhrases {
                rhythm: "x".into(),
                kind: "response"
            })
        );
    }

    #[test]
    fn phrase_beats_must_fit_the_measure() {
        assert!(table().validate("x", 4).is_ok());
        let t = table().with_pad(vec![(4.0, -4)]);
        assert!(matches!(
            t.validate("x", 4),
            Err(ConfigError::HitOutsideMeasure { part, .. }) if part == "pad"
        ));
    }
}
