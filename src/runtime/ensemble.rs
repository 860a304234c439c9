//! Several producers locked to one downbeat.
//!
//! An [`Ensemble`] is a tempo plus a list of voices: step sources, each on
//! its own channel, and optionally a drum rhythm. Starting it computes one
//! origin and hands it to every player, so bar lines agree across threads.

use std::time::Instant;

use tracing::info;

use super::handle::PlayerHandle;
use super::parts::{Arpeggio, BrokenChord, Motif, MotifPitch, MotifQueue, RootBass, WalkingBass};
use super::rhythm_player::RhythmPlayer;
use super::step::{StepPlayer, StepSource};
use super::{ChordProgression, RandomMelody};
use crate::config::{validate_bpm, PlayerConfig};
use crate::engine::EventScheduler;
use crate::error::{ConfigError, Result};
use crate::sequencing::notes::*;
use crate::sequencing::{Duration, Hit, Rhythm, Scale};

/// One player of an ensemble.
pub enum EnsembleVoice {
    Steps {
        name: String,
        source: Box<dyn StepSource>,
    },
    Drums(Rhythm),
}

impl EnsembleVoice {
    pub fn name(&self) -> &str {
        match self {
            EnsembleVoice::Steps { name, .. } => name,
            EnsembleVoice::Drums(rhythm) => &rhythm.name,
        }
    }
}

pub struct Ensemble {
    name: String,
    bpm: f64,
    voices: Vec<EnsembleVoice>,
}

impl Ensemble {
    pub fn new(name: impl Into<String>, bpm: f64) -> Self {
        Self {
            name: name.into(),
            bpm,
            voices: Vec::new(),
        }
    }

    pub fn voice(mut self, name: impl Into<String>, source: impl StepSource) -> Self {
        self.voices.push(EnsembleVoice::Steps {
            name: name.into(),
            source: Box::new(source),
        });
        self
    }

    /// Add a drum rhythm; it plays at the ensemble's tempo.
    pub fn drums(mut self, mut rhythm: Rhythm) -> Self {
        rhythm.bpm = self.bpm;
        self.voices.push(EnsembleVoice::Drums(rhythm));
        self
    }

    /// Change the tempo of every voice, drums included.
    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        for voice in &mut self.voices {
            if let EnsembleVoice::Drums(rhythm) = voice {
                rhythm.bpm = bpm;
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn voices(&self) -> &[EnsembleVoice] {
        &self.voices
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        validate_bpm(&self.name, self.bpm)?;
        if self.voices.is_empty() {
            return Err(ConfigError::EmptyEnsemble(self.name.clone()));
        }
        for voice in &self.voices {
            match voice {
                EnsembleVoice::Steps { source, .. } => source.validate()?,
                EnsembleVoice::Drums(rhythm) => rhythm.validate()?,
            }
        }
        Ok(())
    }

    /// Start every voice on one shared origin.
    ///
    /// Nothing starts unless the whole ensemble validates. If a later
    /// voice fails to spawn, the handles already returned are dropped,
    /// which stops those players too.
    pub fn start(
        self,
        scheduler: &EventScheduler,
        config: &PlayerConfig,
    ) -> Result<Vec<PlayerHandle>> {
        self.validate()?;
        config.validate()?;

        let origin = Instant::now() + config.start_offset;
        info!(
            ensemble = %self.name,
            bpm = self.bpm,
            voices = self.voices.len(),
            "starting ensemble"
        );

        let mut handles = Vec::with_capacity(self.voices.len());
        for voice in self.voices {
            let handle = match voice {
                EnsembleVoice::Steps { name, source } => {
                    StepPlayer::new(name, scheduler.clone(), source, self.bpm, config.clone())?
                        .starting_at(origin)
                        .start()?
                }
                EnsembleVoice::Drums(rhythm) => {
                    RhythmPlayer::new(scheduler.clone(), rhythm, config.clone())?
                        .starting_at(origin)
                        .start()?
                }
            };
            handles.push(handle);
        }
        Ok(handles)
    }

    /// Shuffled pop chords under a random soprano-sax line.
    pub fn random(bpm: f64, seed: Option<u64>, ppq: u32) -> Result<Self> {
        let chords = ChordProgression::pop(0, ppq)
            .program(SYNTH_PAD)
            .velocity(55..=65)
            .shuffled(voice_seed(seed, 1));
        let melody = RandomMelody::new(Scale::new(C_MAJOR)?, 1, ppq, seed)
            .lengths([Duration::EIGHTH, Duration::EIGHTH, Duration::QUARTER])
            .rest_probability(0.1)
            .program(SOPRANO_SAX);
        Ok(Self::new("Random", bpm)
            .voice("chords", chords)
            .voice("melody", melody))
    }

    /// I-V-vi-IV synth-pop band at 125 BPM: drums, bass, electric piano,
    /// arpeggio, square lead and pad, one chord per bar.
    pub fn synth_pop(seed: Option<u64>, ppq: u32) -> Result<Self> {
        let chords = || SYNTH_POP_CHORDS.iter().map(|c| c.to_vec()).collect::<Vec<_>>();
        let lead: Vec<Motif> = SYNTH_POP_LEAD
            .iter()
            .map(|motif| motif.iter().map(|&semis| (semis, 0.5)).collect())
            .collect();

        Ok(Self::new("Synth-pop", 125.0)
            .drums(synth_pop_drums()?)
            .voice(
                "bass",
                RootBass::new(chords(), 1, Duration::WHOLE, ppq)
                    .onsets([0.0, 2.0])
                    .length(1.0)
                    .transpose(-12)
                    .program(SYNTH_BASS),
            )
            .voice(
                "keys",
                ChordProgression::new(chords(), 2, Duration::WHOLE, ppq).program(ELECTRIC_PIANO),
            )
            .voice(
                "arpeggio",
                Arpeggio::new(chords(), [0, 1, 2, 1], 3, Duration::SIXTEENTH, ppq)
                    .repeats(4)
                    .program(CALLIOPE_LEAD),
            )
            .voice(
                "lead",
                MotifQueue::new(lead, MotifPitch::Semitones { root: 60 }, 4, ppq)
                    .gap(0.5)
                    .velocity(120..=120)
                    .program(SQUARE_LEAD)
                    .seeded(voice_seed(seed, 4)),
            )
            .voice(
                "pad",
                ChordProgression::new(chords(), 5, Duration::WHOLE, ppq).program(WARM_PAD),
            ))
    }

    /// Four-voice piano counterpoint at 80 BPM: a soprano line, its
    /// inversion in alto and tenor, a root bass and a broken-chord
    /// accompaniment.
    pub fn piano(seed: Option<u64>, ppq: u32) -> Result<Self> {
        let chords = || PIANO_CHORDS.iter().map(|c| c.to_vec()).collect::<Vec<_>>();
        let motifs: Vec<Motif> = PIANO_MOTIFS.iter().map(|m| m.to_vec()).collect();
        let degrees = || Scale::new(C_IONIAN).map(MotifPitch::Degrees);

        Ok(Self::new("Piano counterpoint", 80.0)
            .voice(
                "soprano",
                MotifQueue::new(motifs.clone(), degrees()?, 0, ppq)
                    .gap(0.5)
                    .velocity(62..=78)
                    .program(ACOUSTIC_GRAND)
                    .seeded(voice_seed(seed, 0)),
            )
            .voice(
                "alto",
                MotifQueue::new(motifs.clone(), degrees()?, 1, ppq)
                    .inverted()
                    .gap(0.5)
                    .velocity(57..=73)
                    .program(ACOUSTIC_GRAND)
                    .seeded(voice_seed(seed, 1)),
            )
            .voice(
                "tenor",
                MotifQueue::new(motifs, degrees()?, 2, ppq)
                    .inverted()
                    .transpose(-12)
                    .gap(0.5)
                    .velocity(57..=73)
                    .program(ACOUSTIC_GRAND)
                    .seeded(voice_seed(seed, 2)),
            )
            .voice(
                "bass",
                RootBass::new(chords(), 3, Duration::WHOLE, ppq)
                    .onsets([0.0, 1.5, 3.0])
                    .length(0.4)
                    .transpose(-24)
                    .velocity(52..=68)
                    .program(ACOUSTIC_GRAND)
                    .seeded(voice_seed(seed, 3)),
            )
            .voice(
                "accompaniment",
                BrokenChord::new(chords(), 4, Duration::EIGHTH, 8, ppq)
                    .transpose(-12)
                    .length(0.3)
                    .velocity(42..=58)
                    .program(ACOUSTIC_GRAND)
                    .seeded(voice_seed(seed, 4)),
            ))
    }

    /// Minor-blues combo at 100 BPM: shuffled jazz voicings with rests, a
    /// blues-scale melody, a walking bass and a sparse kick.
    pub fn jazz(seed: Option<u64>, ppq: u32) -> Result<Self> {
        let voicings = JAZZ_VOICINGS.iter().map(|c| c.to_vec()).collect();
        let kick = Rhythm::builder("Jazz kick", 100.0, 4)
            .part(
                "Kick",
                [
                    Hit::new(0.0, BASS_DRUM, VEL_GHOST, 0.25),
                    Hit::new(2.5, BASS_DRUM, 60, 0.25),
                ],
            )
            .build()?;

        Ok(Self::new("Jazz", 100.0)
            .drums(kick)
            .voice(
                "chords",
                ChordProgression::new(voicings, 0, Duration::HALF, ppq)
                    .velocity(40..=70)
                    .rest_probability(0.1)
                    .program(ACOUSTIC_GRAND)
                    .shuffled(voice_seed(seed, 0)),
            )
            .voice(
                "melody",
                RandomMelody::new(Scale::new(C_MINOR_BLUES)?, 1, ppq, voice_seed(seed, 1))
                    .lengths([Duration::EIGHTH, Duration::EIGHTH, Duration::QUARTER])
                    .velocity(50..=80)
                    .gate(0.25..=0.75)
                    .rest_probability(0.1)
                    .program(ACOUSTIC_GRAND),
            )
            .voice(
                "bass",
                WalkingBass::new(JAZZ_BASS, 2, Duration::QUARTER, ppq)
                    .velocity(40..=60)
                    .program(ACOUSTIC_BASS)
                    .seeded(voice_seed(seed, 2)),
            ))
    }
}

/// Each voice gets its own stream so one seed reproduces the whole band.
fn voice_seed(seed: Option<u64>, voice: u64) -> Option<u64> {
    seed.map(|s| s.wrapping_add(voice))
}

fn synth_pop_drums() -> std::result::Result<Rhythm, ConfigError> {
    let on = |beats: &[f64], note: u8, velocity: u8| -> Vec<Hit> {
        beats.iter().map(|&b| Hit::new(b, note, velocity, 0.1)).collect()
    };
    Rhythm::builder("Synth-pop kit", 125.0, 4)
        .part("Kick", on(&[0.0, 1.0, 2.0, 3.0], BASS_DRUM, VEL_ACCENT))
        .part("Snare", on(&[1.0, 3.0], ACOUSTIC_SNARE, VEL_ACCENT))
        .part(
            "Hat",
            on(&[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5], CLOSED_HI_HAT, VEL_NORMAL),
        )
        .build()
}

/// C - G - Am - F, close voiced above middle C.
const SYNTH_POP_CHORDS: [[u8; 3]; 4] = [[60, 64, 67], [67, 71, 74], [69, 72, 76], [65, 69, 72]];

/// Semitones above middle C, played as eighths.
const SYNTH_POP_LEAD: [&[i32]; 3] = [
    &[0, 2, 4, 5, 4, 2],
    &[4, 5, 7, 9, 7, 5],
    &[7, 9, 12, 9, 7, 5],
];

/// Diatonic triads of C major, I to vii and back to I.
const PIANO_CHORDS: [[u8; 3]; 8] = [
    [60, 64, 67],
    [62, 65, 69],
    [64, 67, 71],
    [65, 69, 72],
    [67, 71, 74],
    [69, 72, 76],
    [71, 74, 77],
    [60, 67, 76],
];

/// Scale degrees and lengths in beats.
const PIANO_MOTIFS: [&[(i32, f64)]; 4] = [
    &[(0, 1.0), (2, 0.5), (4, 0.5), (5, 1.0)],
    &[(7, 1.0), (5, 0.5), (4, 0.5), (2, 1.0)],
    &[(4, 1.0), (2, 1.0), (0, 2.0)],
    &[(5, 0.5), (7, 0.5), (9, 1.0), (7, 1.0)],
];

/// Cm, F7, Bb, Eb, Am7b5, D7b9, Gm7 and C7 in two inversions where they
/// have them.
const JAZZ_VOICINGS: [&[u8]; 12] = [
    &[60, 63, 67],
    &[63, 67, 72],
    &[53, 57, 60, 65],
    &[57, 60, 65, 69],
    &[58, 62, 65],
    &[62, 65, 70],
    &[63, 67, 70],
    &[67, 70, 75],
    &[57, 60, 63, 66],
    &[62, 65, 68, 71],
    &[55, 58, 62, 65],
    &[60, 63, 67, 70],
];

const JAZZ_BASS: [u8; 8] = [48, 50, 52, 53, 55, 57, 59, 60];

#[cfg(test)]
mod tests {
    use super::*;

    const PPQ: u32 = 960;

    #[test]
    fn presets_validate() {
        for ensemble in [
            Ensemble::synth_pop(Some(1), PPQ).unwrap(),
            Ensemble::piano(Some(1), PPQ).unwrap(),
            Ensemble::jazz(Some(1), PPQ).unwrap(),
            Ensemble::random(110.0, Some(1), PPQ).unwrap(),
        ] {
            assert!(ensemble.validate().is_ok(), "{}", ensemble.name());
        }
    }

    #[test]
    fn drums_follow_the_ensemble_tempo() {
        let band = Ensemble::synth_pop(None, PPQ).unwrap().with_bpm(90.0);
        assert_eq!(band.bpm(), 90.0);
        match &band.voices()[0] {
            EnsembleVoice::Drums(rhythm) => assert_eq!(rhythm.bpm, 90.0),
            EnsembleVoice::Steps { .. } => panic!("drums should come first"),
        }
    }

    #[test]
    fn empty_or_unplayable_ensembles_are_rejected() {
        assert_eq!(
            Ensemble::new("Nobody", 100.0).validate(),
            Err(ConfigError::EmptyEnsemble("Nobody".into()))
        );
        assert!(matches!(
            Ensemble::jazz(None, PPQ).unwrap().with_bpm(0.0).validate(),
            Err(ConfigError::InvalidTempo { .. })
        ));
        let broken = Ensemble::new("Broken", 100.0).voice(
            "melody",
            RandomMelody::new(Scale::new(C_MAJOR).unwrap(), 1, PPQ, None).velocity(90..=10),
        );
        assert!(matches!(
            broken.validate(),
            Err(ConfigError::OutOfRange { what: "velocity", .. })
        ));
    }

    #[test]
    fn piano_voices_use_distinct_channels() {
        let piano = Ensemble::piano(None, PPQ).unwrap();
        let mut channels: Vec<u8> = piano
            .voices()
            .iter()
            .filter_map(|voice| match voice {
                EnsembleVoice::Steps { source, .. } => {
                    source.programs().first().map(|p| p.channel())
                }
                EnsembleVoice::Drums(_) => None,
            })
            .collect();
        channels.dedup();
        assert_eq!(channels, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn one_seed_reproduces_the_band() {
        let mut a = Ensemble::jazz(Some(11), PPQ).unwrap();
        let mut b = Ensemble::jazz(Some(11), PPQ).unwrap();
        for (x, y) in a.voices.iter_mut().zip(b.voices.iter_mut()) {
            if let (
                EnsembleVoice::Steps { source: x, .. },
                EnsembleVoice::Steps { source: y, .. },
            ) = (x, y)
            {
                for _ in 0..32 {
                    assert_eq!(x.next_step(), y.next_step());
                }
            }
        }
    }
}
