//! Built-in West African rhythm library.
//!
//! Seven looping drum patterns, each with a melodic phrase table for the
//! melodic mix, over an A minor pentatonic scale. Meters are counted in
//! beats per measure (Agbekor is 12, Bikutsi 6).

use std::collections::BTreeMap;
#[cfg(feature = "serde")]
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::notes::*;
use super::phrase::{PhraseTable, Scale};
use super::rhythm::{Hit, Rhythm};
use crate::error::ConfigError;

/// Rhythms, their phrase tables and the melody scale, validated together.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RhythmLibrary {
    pub rhythms: Vec<Rhythm>,
    /// Keyed by rhythm name.
    pub phrases: BTreeMap<String, PhraseTable>,
    pub scale: Scale,
}

impl RhythmLibrary {
    pub fn new(
        rhythms: Vec<Rhythm>,
        phrases: BTreeMap<String, PhraseTable>,
        scale: Scale,
    ) -> Result<Self, ConfigError> {
        let library = Self {
            rhythms,
            phrases,
            scale,
        };
        library.validate()?;
        Ok(library)
    }

    /// Every rhythm is well formed and every phrase table fits its rhythm.
    /// Rhythms without a phrase table are allowed; melodic playback checks
    /// for the tables it needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rhythms.is_empty() {
            return Err(ConfigError::NoRhythms);
        }
        if self.scale.is_empty() {
            return Err(ConfigError::EmptyScale);
        }
        for rhythm in &self.rhythms {
            rhythm.validate()?;
            if let Some(table) = self.phrases.get(&rhythm.name) {
                table.validate(&rhythm.name, rhythm.beats_per_measure)?;
            }
        }
        Ok(())
    }

    /// Look up a rhythm by 1-based index ("3") or by case-insensitive name
    /// prefix ("kpan").
    pub fn find(&self, key: &str) -> Result<&Rhythm, ConfigError> {
        let key = key.trim();
        if let Ok(index) = key.parse::<usize>() {
            return index
                .checked_sub(1)
                .and_then(|i| self.rhythms.get(i))
                .ok_or_else(|| ConfigError::UnknownRhythm(key.to_string()));
        }
        let lower = key.to_lowercase();
        self.rhythms
            .iter()
            .find(|r| !lower.is_empty() && r.name.to_lowercase().starts_with(&lower))
            .ok_or_else(|| ConfigError::UnknownRhythm(key.to_string()))
    }

    pub fn phrases_for(&self, rhythm: &str) -> Option<&PhraseTable> {
        self.phrases.get(rhythm)
    }

    /// Subset of rhythms by 1-based index, in the given order.
    pub fn select(&self, indices: &[usize]) -> Result<Vec<Rhythm>, ConfigError> {
        indices
            .iter()
            .map(|&i| {
                i.checked_sub(1)
                    .and_then(|i| self.rhythms.get(i))
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownRhythm(i.to_string()))
            })
            .collect()
    }

    /// The two-pattern drum mix: Fanga and Kpanlogo.
    pub fn rhythmic_mix(&self) -> Result<Vec<Rhythm>, ConfigError> {
        self.select(&[1, 3])
    }

    /// Every pattern, in library order.
    pub fn melodic_mix(&self) -> Vec<Rhythm> {
        self.rhythms.clone()
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let library: Self = serde_json::from_str(json)?;
        library.validate()?;
        Ok(library)
    }

    #[cfg(feature = "serde")]
    pub fn load(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The shipped library.
    pub fn builtin() -> Self {
        Self {
            rhythms: builtin_rhythms(),
            phrases: builtin_phrases(),
            scale: Scale::a_minor_pentatonic(),
        }
    }
}

impl Default for RhythmLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

fn hits(list: &[(f64, u8, u8, f64)]) -> Vec<Hit> {
    list.iter()
        .map(|&(beat, note, velocity, length)| Hit::new(beat, note, velocity, length))
        .collect()
}

fn rhythm(
    name: &str,
    bpm: f64,
    beats: u32,
    build_order: &[&str],
    core: &[&str],
    parts: Vec<(&str, Vec<Hit>)>,
) -> Rhythm {
    Rhythm {
        name: name.to_string(),
        bpm,
        beats_per_measure: beats,
        build_order: build_order.iter().map(|s| s.to_string()).collect(),
        core: core.iter().map(|s| s.to_string()).collect(),
        parts: parts
            .into_iter()
            .map(|(name, hits)| super::rhythm::Part {
                name: name.to_string(),
                hits,
            })
            .collect(),
        channel: crate::io::midi::DRUM_CHANNEL,
    }
}

pub const FANGA: &str = "Fanga (Liberia/Guinea)";
pub const AGBEKOR: &str = "Agbekor (Ewe - Ghana)";
pub const KPANLOGO: &str = "Kpanlogo (Ga - Ghana)";
pub const BIKUTSI: &str = "Bikutsi (Cameroon)";
pub const SHIKO: &str = "Shiko (Nigeria)";
pub const WASSOULOU: &str = "Wassoulou (Mali)";
pub const MORIBAYASSA: &str = "Moribayassa (Guinea)";

fn builtin_rhythms() -> Vec<Rhythm> {
    const A: u8 = VEL_ACCENT;
    const N: u8 = VEL_NORMAL;
    const G: u8 = VEL_GHOST;

    vec![
        rhythm(
            FANGA,
            130.0,
            4,
            &["Kenkeni (Bell)", "Sangban", "Dundun", "Djembe"],
            &["Kenkeni (Bell)"],
            vec![
                ("Dundun", hits(&[(0.0, LOW_TOM, A, 0.5), (2.0, LOW_TOM, A, 0.5)])),
                (
                    "Sangban",
                    hits(&[(1.0, LOW_MID_TOM, N, 0.25), (3.0, LOW_MID_TOM, N, 0.25)]),
                ),
                (
                    "Kenkeni (Bell)",
                    hits(&[
                        (0.0, COWBELL, N, 0.1),
                        (0.5, COWBELL, G, 0.1),
                        (1.0, COWBELL, N, 0.1),
                        (1.5, COWBELL, G, 0.1),
                        (2.0, COWBELL, N, 0.1),
                        (2.5, COWBELL, G, 0.1),
                        (3.0, COWBELL, N, 0.1),
                        (3.5, COWBELL, G, 0.1),
                    ]),
                ),
                (
                    "Djembe",
                    hits(&[
                        (0.75, HIGH_BONGO, N, 0.1),
                        (1.5, OPEN_HIGH_CONGA, A, 0.1),
                        (2.75, HIGH_BONGO, N, 0.1),
                        (3.25, OPEN_HIGH_CONGA, N, 0.1),
                        (3.75, OPEN_HIGH_CONGA, A, 0.1),
                    ]),
                ),
            ],
        ),
        rhythm(
            AGBEKOR,
            110.0,
            12,
            &["Gankogui (Bell)", "Axatse (Shaker)", "Kagan (Drum)"],
            &["Gankogui (Bell)", "Axatse (Shaker)"],
            vec![
                (
                    "Gankogui (Bell)",
                    hits(&[
                        (0.0, HIGH_AGOGO, A, 0.5),
                        (2.0, LOW_AGOGO, N, 0.5),
                        (3.0, HIGH_AGOGO, A, 0.5),
                        (5.0, LOW_AGOGO, N, 0.5),
                        (6.0, HIGH_AGOGO, A, 0.5),
                        (7.0, LOW_AGOGO, N, 0.5),
                        (9.0, LOW_AGOGO, N, 0.5),
                        (10.0, HIGH_AGOGO, A, 0.5),
                    ]),
                ),
                (
                    "Axatse (Shaker)",
                    hits(&[
                        (0.0, MARACAS, N, 0.2),
                        (3.0, MARACAS, N, 0.2),
                        (6.0, MARACAS, N, 0.2),
                        (9.0, MARACAS, N, 0.2),
                    ]),
                ),
                (
                    "Kagan (Drum)",
                    hits(&[
                        (1.0, MUTE_HIGH_CONGA, N, 0.2),
                        (2.0, MUTE_HIGH_CONGA, G, 0.2),
                        (4.0, MUTE_HIGH_CONGA, N, 0.2),
                        (5.0, MUTE_HIGH_CONGA, G, 0.2),
                        (7.0, MUTE_HIGH_CONGA, N, 0.2),
                        (8.0, MUTE_HIGH_CONGA, G, 0.2),
                        (10.0, MUTE_HIGH_CONGA, N, 0.2),
                        (11.0, MUTE_HIGH_CONGA, G, 0.2),
                    ]),
                ),
            ],
        ),
        rhythm(
            KPANLOGO,
            125.0,
            4,
            &["Bell", "Conga 2", "Conga 1"],
            &["Bell"],
            vec![
                (
                    "Bell",
                    hits(&[
                        (0.0, COWBELL, A, 0.2),
                        (1.0, COWBELL, N, 0.2),
                        (1.5, COWBELL, N, 0.2),
                        (2.5, COWBELL, A, 0.2),
                        (3.0, COWBELL, N, 0.2),
                    ]),
                ),
                (
                    "Conga 1",
                    hits(&[
                        (0.0, MUTE_HIGH_CONGA, A, 0.2),
                        (2.0, MUTE_HIGH_CONGA, A, 0.2),
                        (3.5, MUTE_HIGH_CONGA, A, 0.2),
                    ]),
                ),
                (
                    "Conga 2",
                    hits(&[
                        (1.0, HIGH_TIMBALE, N, 0.2),
                        (1.5, MUTE_HIGH_CONGA, G, 0.2),
                        (3.0, HIGH_TIMBALE, N, 0.2),
                    ]),
                ),
            ],
        ),
        rhythm(
            BIKUTSI,
            140.0,
            6,
            &["Woodblock", "Snare", "Kick"],
            &["Woodblock"],
            vec![
                ("Kick", hits(&[(0.0, BASS_DRUM, A, 0.2), (3.0, BASS_DRUM, A, 0.2)])),
                (
                    "Snare",
                    hits(&[(1.5, ACOUSTIC_SNARE, N, 0.2), (4.5, ACOUSTIC_SNARE, N, 0.2)]),
                ),
                (
                    "Woodblock",
                    hits(&[
                        (0.0, HIGH_WOOD_BLOCK, N, 0.1),
                        (1.0, HIGH_WOOD_BLOCK, G, 0.1),
                        (2.0, HIGH_WOOD_BLOCK, N, 0.1),
                        (3.0, HIGH_WOOD_BLOCK, N, 0.1),
                        (4.0, HIGH_WOOD_BLOCK, G, 0.1),
                        (5.0, HIGH_WOOD_BLOCK, N, 0.1),
                    ]),
                ),
            ],
        ),
        rhythm(
            SHIKO,
            115.0,
            4,
            &["Bell", "Low Tom", "High Tom"],
            &["Bell"],
            vec![
                (
                    "Bell",
                    hits(&[
                        (0.0, COWBELL, A, 0.2),
                        (0.75, COWBELL, N, 0.2),
                        (1.5, COWBELL, N, 0.2),
                        (2.5, COWBELL, A, 0.2),
                        (3.25, COWBELL, N, 0.2),
                    ]),
                ),
                ("Low Tom", hits(&[(0.0, LOW_TOM, A, 0.2), (2.0, LOW_TOM, G, 0.2)])),
                (
                    "High Tom",
                    hits(&[
                        (1.0, HIGH_TOM, N, 0.2),
                        (3.0, HIGH_TOM, N, 0.2),
                        (3.5, HIGH_TOM, A, 0.2),
                    ]),
                ),
            ],
        ),
        rhythm(
            WASSOULOU,
            128.0,
            4,
            &["Kenkeni (Bell)", "Djembe Tone", "Djembe Bass"],
            &["Kenkeni (Bell)"],
            vec![
                (
                    "Djembe Bass",
                    hits(&[(0.0, HIGH_BONGO, A, 0.2), (2.0, HIGH_BONGO, A, 0.2)]),
                ),
                (
                    "Djembe Tone",
                    hits(&[
                        (1.0, OPEN_HIGH_CONGA, N, 0.2),
                        (2.5, OPEN_HIGH_CONGA, A, 0.2),
                        (3.0, OPEN_HIGH_CONGA, N, 0.2),
                        (3.5, OPEN_HIGH_CONGA, G, 0.2),
                    ]),
                ),
                (
                    "Kenkeni (Bell)",
                    hits(&[
                        (0.0, COWBELL, N, 0.1),
                        (1.0, COWBELL, G, 0.1),
                        (2.0, COWBELL, N, 0.1),
                        (3.0, COWBELL, G, 0.1),
                    ]),
                ),
            ],
        ),
        rhythm(
            MORIBAYASSA,
            150.0,
            4,
            &["Dundun", "Djembe Tone", "Djembe Slap"],
            &["Dundun"],
            vec![
                (
                    "Djembe Slap",
                    hits(&[
                        (0.75, MUTE_HIGH_CONGA, A, 0.15),
                        (1.75, MUTE_HIGH_CONGA, A, 0.15),
                        (2.75, MUTE_HIGH_CONGA, A, 0.15),
                        (3.75, MUTE_HIGH_CONGA, A, 0.15),
                    ]),
                ),
                (
                    "Djembe Tone",
                    hits(&[
                        (0.5, OPEN_HIGH_CONGA, N, 0.1),
                        (1.5, OPEN_HIGH_CONGA, N, 0.1),
                        (2.5, OPEN_HIGH_CONGA, N, 0.1),
                        (3.5, OPEN_HIGH_CONGA, N, 0.1),
                    ]),
                ),
                (
                    "Dundun",
                    hits(&[
                        (0.0, LOW_TOM, A, 0.2),
                        (1.0, LOW_TOM, N, 0.2),
                        (2.0, LOW_TOM, A, 0.2),
                        (3.0, LOW_TOM, N, 0.2),
                    ]),
                ),
            ],
        ),
    ]
}

fn builtin_phrases() -> BTreeMap<String, PhraseTable> {
    let mut phrases = BTreeMap::new();
    let mut add = |name: &str, table: PhraseTable| {
        phrases.insert(name.to_string(), table);
    };

    add(
        FANGA,
        PhraseTable::new(
            vec![
                vec![(0.5, 2), (1.5, 4), (2.5, 3)],
                vec![(0.75, 4), (2.25, 2), (3.25, 1)],
            ],
            vec![
                vec![(0.5, 1), (1.5, 0), (2.5, -1)],
                vec![(0.75, 2), (1.75, 1), (3.25, 0)],
            ],
            vec![vec![(0.5, 0), (2.5, 1)], vec![(0.75, 2), (2.25, 0)]],
        ),
    );
    add(
        KPANLOGO,
        PhraseTable::new(
            vec![
                vec![(0.0, 0), (0.75, 2), (1.5, 4)],
                vec![(0.5, 4), (1.5, 3), (2.5, 2)],
            ],
            vec![
                vec![(0.75, 3), (1.75, 2), (2.75, 1), (3.75, 0)],
                vec![(0.5, 1), (1.5, 0)],
            ],
            vec![vec![(0.0, -2), (1.5, 0)], vec![(0.5, 2), (2.5, 1)]],
        )
        .with_pad(vec![(0.0, -4), (2.0, -2)]),
    );
    add(
        AGBEKOR,
        PhraseTable::new(
            vec![vec![(0.0, 3), (3.0, 5), (6.0, 4)], vec![(2.0, 2), (5.0, 1), (8.0, 0)]],
            vec![
                vec![(0.0, 4), (3.0, 3), (6.0, 2), (9.0, 1)],
                vec![(2.0, 0), (5.0, -1), (8.0, -2), (11.0, 0)],
            ],
            vec![vec![(0.0, 1), (6.0, 2)], vec![(3.0, -1), (9.0, 0)]],
        ),
    );
    add(
        BIKUTSI,
        PhraseTable::new(
            vec![vec![(0.0, 4), (1.5, 5), (3.0, 4)], vec![(0.5, 2), (2.0, 3), (4.0, 1)]],
            vec![
                vec![(0.0, 2), (1.5, 1), (3.0, 0)],
                vec![(0.5, 3), (2.0, 2), (3.5, 1), (5.0, 0)],
            ],
            vec![vec![(0.0, 0), (3.0, 2)], vec![(1.5, -1), (4.5, 0)]],
        ),
    );
    add(
        SHIKO,
        PhraseTable::new(
            vec![vec![(0.0, 0), (1.5, 2), (2.5, 3)], vec![(0.75, 4), (2.0, 2), (3.0, 1)]],
            vec![
                vec![(0.0, 1), (1.0, 0), (2.5, 2)],
                vec![(0.75, 2), (1.5, 1), (3.25, 0)],
            ],
            vec![vec![(0.0, -2), (2.5, 0)], vec![(0.75, 1), (3.25, -1)]],
        ),
    );
    add(
        WASSOULOU,
        PhraseTable::new(
            vec![vec![(0.0, 2), (1.0, 3), (2.0, 4)], vec![(0.5, 5), (2.5, 3)]],
            vec![
                vec![(0.0, 1), (1.0, 0), (2.0, -1)],
                vec![(0.5, 3), (1.5, 2), (2.5, 1), (3.5, 0)],
            ],
            vec![vec![(0.0, 0), (2.0, 2)], vec![(0.5, 3), (2.5, 1)]],
        ),
    );
    add(
        MORIBAYASSA,
        PhraseTable::new(
            vec![
                vec![(0.75, 5), (1.75, 6), (2.75, 5)],
                vec![(0.5, 2), (1.5, 3), (2.5, 4)],
            ],
            vec![
                vec![(0.75, 4), (1.75, 3), (2.75, 2), (3.75, 1)],
                vec![(0.5, 1), (1.5, 0)],
            ],
            vec![vec![(0.75, 3), (2.75, 3)], vec![(0.5, 0), (2.5, 2)]],
        ),
    );
    phrases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_library_is_valid() {
        let library = RhythmLibrary::builtin();
        library.validate().unwrap();
        assert_eq!(library.rhythms.len(), 7);
        for rhythm in &library.rhythms {
            assert!(
                library.phrases_for(&rhythm.name).is_some(),
                "{} has no phrase table",
                rhythm.name
            );
        }
    }

    #[test]
    fn find_by_index_and_prefix() {
        let library = RhythmLibrary::builtin();
        assert_eq!(library.find("1").unwrap().name, FANGA);
        assert_eq!(library.find("kpan").unwrap().name, KPANLOGO);
        assert_eq!(library.find("Wassoulou").unwrap().bpm, 128.0);
        assert!(matches!(library.find("0"), Err(ConfigError::UnknownRhythm(_))));
        assert!(matches!(library.find("8"), Err(ConfigError::UnknownRhythm(_))));
        assert!(matches!(library.find("samba"), Err(ConfigError::UnknownRhythm(_))));
    }

    #[test]
    fn rhythmic_mix_pairs_fanga_and_kpanlogo() {
        let mix = RhythmLibrary::builtin().rhythmic_mix().unwrap();
        let names: Vec<_> = mix.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec![FANGA, KPANLOGO]);
    }

    #[test]
    fn agbekor_keeps_bell_and_shaker_as_core() {
        let library = RhythmLibrary::builtin();
        let agbekor = library.find("agbekor").unwrap();
        assert_eq!(agbekor.beats_per_measure, 12);
        assert_eq!(agbekor.layered_parts(), vec!["Kagan (Drum)"]);
        assert_eq!(agbekor.core_parts().len(), 2);
    }

    #[test]
    fn library_without_rhythms_is_rejected() {
        let result = RhythmLibrary::new(
            Vec::new(),
            BTreeMap::new(),
            Scale::new(A_MINOR_PENTATONIC).unwrap(),
        );
        assert_eq!(result, Err(ConfigError::NoRhythms));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_library_loads_and_validates() {
        let json = r#"{
            "rhythms": [{
                "name": "Pulse",
                "bpm": 90.0,
                "beats_per_measure": 2,
                "build_order": ["Bell"],
                "core": ["Bell"],
                "parts": [{ "name": "Bell", "hits": [
                    { "beat": 0.0, "note": 56, "velocity": 100, "length": 0.1 }
                ]}]
            }],
            "phrases": {},
            "scale": [60, 62, 64]
        }"#;
        let library = RhythmLibrary::from_json(json).unwrap();
        assert_eq!(library.rhythms[0].channel, crate::io::midi::DRUM_CHANNEL);
        assert_eq!(library.scale.midpoint(), 1);

        let broken = json.replace("\"beat\": 0.0", "\"beat\": 2.0");
        assert!(matches!(
            RhythmLibrary::from_json(&broken),
            Err(crate::error::Error::Config(ConfigError::HitOutsideMeasure { .. }))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn builtin_can_be_exported_for_editing() {
        let json = RhythmLibrary::builtin().to_json().unwrap();
        let reloaded = RhythmLibrary::from_json(&json).unwrap();
        assert_eq!(reloaded.rhythms.len(), 7);
        assert_eq!(reloaded.find("3").unwrap().name, KPANLOGO);
        assert_eq!(reloaded.phrases_for(KPANLOGO).unwrap().pad.len(), 2);
    }
}
