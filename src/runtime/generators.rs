//! Built-in step sources
//!
//! `RandomMelody` wanders over a scale; `ChordProgression` walks a list of
//! voicings. Both own a seeded RNG so a seed reproduces a performance.

use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{check_channel, check_chords, check_velocity, program_change, rng_from};
use super::step::{Step, StepSource};
use crate::error::ConfigError;
use crate::io::MidiEvent;
use crate::sequencing::{Duration, Scale};

/// Random notes from a scale with optional rests and a humanized gate.
pub struct RandomMelody {
    scale: Scale,
    channel: u8,
    ppq: u32,
    lengths: Vec<Duration>,
    velocity: RangeInclusive<u8>,
    rest_probability: f64,
    gate: RangeInclusive<f64>,
    program: Option<u8>,
    rng: StdRng,
}

impl RandomMelody {
    pub fn new(scale: Scale, channel: u8, ppq: u32, seed: Option<u64>) -> Self {
        Self {
            scale,
            channel,
            ppq,
            lengths: vec![Duration::EIGHTH],
            velocity: 50..=80,
            rest_probability: 0.0,
            gate: 0.75..=1.0,
            program: None,
            rng: rng_from(seed),
        }
    }

    /// Step lengths to choose from, uniformly.
    pub fn lengths(mut self, lengths: impl Into<Vec<Duration>>) -> Self {
        self.lengths = lengths.into();
        self
    }

    pub fn velocity(mut self, range: RangeInclusive<u8>) -> Self {
        self.velocity = range;
        self
    }

    pub fn rest_probability(mut self, probability: f64) -> Self {
        self.rest_probability = probability;
        self
    }

    /// Fraction of each step the note sounds for.
    pub fn gate(mut self, range: RangeInclusive<f64>) -> Self {
        self.gate = range;
        self
    }

    pub fn program(mut self, program: u8) -> Self {
        self.program = Some(program);
        self
    }
}

impl StepSource for RandomMelody {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.scale.is_empty() {
            return Err(ConfigError::EmptyScale);
        }
        check_channel(self.channel)?;
        if self.lengths.is_empty() || self.lengths.iter().any(|d| d.to_ticks(self.ppq) == 0) {
            return Err(ConfigError::ZeroLengthStep);
        }
        check_velocity(&self.velocity)?;
        if !(0.0..=1.0).contains(&self.rest_probability) {
            return Err(ConfigError::InvalidMix(format!(
                "rest probability {} not in 0..=1",
                self.rest_probability
            )));
        }
        if self.gate.is_empty() || *self.gate.start() <= 0.0 {
            return Err(ConfigError::InvalidMix("gate must be positive".into()));
        }
        Ok(())
    }

    fn next_step(&mut self) -> Step {
        let length = self
            .lengths
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(Duration::EIGHTH);
        let ticks = length.to_ticks(self.ppq);

        if self.rng.gen_bool(self.rest_probability.clamp(0.0, 1.0)) {
            return Step::rest(ticks);
        }

        let note = self
            .scale
            .notes()
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(60);
        let velocity = self.rng.gen_range(self.velocity.clone());
        let gate = self.rng.gen_range(self.gate.clone());
        let sounding = ((ticks as f64 * gate).round() as u64).max(1);

        Step::note(self.channel, note, velocity, ticks).gated(sounding)
    }

    fn programs(&self) -> Vec<MidiEvent> {
        program_change(self.channel, self.program)
    }
}

/// C - G - Am - F
pub const POP_PROGRESSION: [[u8; 3]; 4] = [[60, 64, 67], [67, 71, 74], [57, 60, 64], [53, 57, 60]];

/// One chord per step, in order or picked at random.
pub struct ChordProgression {
    chords: Vec<Vec<u8>>,
    channel: u8,
    ticks: u64,
    velocity: RangeInclusive<u8>,
    rest_probability: f64,
    shuffle: bool,
    index: usize,
    program: Option<u8>,
    rng: StdRng,
}

impl ChordProgression {
    pub fn new(chords: Vec<Vec<u8>>, channel: u8, step: Duration, ppq: u32) -> Self {
        Self {
            chords,
            channel,
            ticks: step.to_ticks(ppq),
            velocity: 60..=60,
            rest_probability: 0.0,
            shuffle: false,
            index: 0,
            program: None,
            rng: rng_from(None),
        }
    }

    pub fn pop(channel: u8, ppq: u32) -> Self {
        Self::new(
            POP_PROGRESSION.iter().map(|c| c.to_vec()).collect(),
            channel,
            Duration::HALF,
            ppq,
        )
    }

    pub fn velocity(mut self, range: RangeInclusive<u8>) -> Self {
        self.velocity = range;
        self
    }

    /// Chance of a silent step in place of a chord.
    pub fn rest_probability(mut self, probability: f64) -> Self {
        self.rest_probability = probability;
        self
    }

    /// Seed velocity and rest choices.
    pub fn seeded(mut self, seed: Option<u64>) -> Self {
        self.rng = rng_from(seed);
        self
    }

    /// Pick each chord at random instead of cycling.
    pub fn shuffled(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seeded(seed)
    }

    pub fn program(mut self, program: u8) -> Self {
        self.program = Some(program);
        self
    }
}

impl StepSource for ChordProgression {
    fn validate(&self) -> Result<(), ConfigError> {
        check_chords(&self.chords)?;
        if self.ticks == 0 {
            return Err(ConfigError::ZeroLengthStep);
        }
        check_channel(self.channel)?;
        check_velocity(&self.velocity)?;
        if !(0.0..=1.0).contains(&self.rest_probability) {
            return Err(ConfigError::InvalidMix(format!(
                "rest probability {} not in 0..=1",
                self.rest_probability
            )));
        }
        Ok(())
    }

    fn next_step(&mut self) -> Step {
        if self.rest_probability > 0.0 && self.rng.gen_bool(self.rest_probability.clamp(0.0, 1.0)) {
            return Step::rest(self.ticks);
        }
        let index = if self.shuffle {
            self.rng.gen_range(0..self.chords.len().max(1))
        } else {
            let i = self.index;
            self.index = (self.index + 1) % self.chords.len().max(1);
            i
        };
        let velocity = self.rng.gen_range(self.velocity.clone());
        match self.chords.get(index) {
            Some(chord) => Step::chord(self.channel, chord, velocity, self.ticks),
            None => Step::rest(self.ticks),
        }
    }

    fn programs(&self) -> Vec<MidiEvent> {
        program_change(self.channel, self.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencing::notes::C_MAJOR;

    fn melody(seed: u64) -> RandomMelody {
        RandomMelody::new(Scale::new(C_MAJOR).unwrap(), 1, 960, Some(seed))
            .lengths([Duration::EIGHTH, Duration::QUARTER])
            .rest_probability(0.2)
    }

    #[test]
    fn same_seed_same_melody() {
        let mut a = melody(7);
        let mut b = melody(7);
        for _ in 0..64 {
            assert_eq!(a.next_step(), b.next_step());
        }
    }

    #[test]
    fn melody_stays_in_scale_and_on_the_grid() {
        let mut source = melody(3);
        let mut rests = 0;
        for _ in 0..500 {
            let step = source.next_step();
            assert!(step.advance_ticks == 480 || step.advance_ticks == 960);
            if step.is_rest() {
                rests += 1;
                continue;
            }
            let n = step.notes[0];
            assert!(C_MAJOR.contains(&n.note));
            assert!((50..=80).contains(&n.velocity));
            assert!(step.length_ticks >= 1 && step.length_ticks <= step.advance_ticks);
        }
        assert!(rests > 0 && rests < 500, "rests: {rests}");
    }

    #[test]
    fn progression_cycles_in_order() {
        let mut chords = ChordProgression::pop(0, 960);
        let roots: Vec<u8> = (0..5).map(|_| chords.next_step().notes[0].note).collect();
        assert_eq!(roots, vec![60, 67, 57, 53, 60]);
    }

    #[test]
    fn progression_validation() {
        assert!(ChordProgression::pop(0, 960).validate().is_ok());
        let empty = ChordProgression::new(vec![vec![]], 0, Duration::HALF, 960);
        assert!(empty.validate().is_err());
        assert!(melody(1).validate().is_ok());
        assert!(melody(1).rest_probability(2.0).validate().is_err());
        assert!(ChordProgression::pop(0, 960).velocity(90..=10).validate().is_err());
    }

    #[test]
    fn empty_ranges_are_rejected_before_sampling() {
        assert!(matches!(
            melody(1).velocity(90..=10).validate(),
            Err(ConfigError::OutOfRange { what: "velocity", .. })
        ));
        assert!(melody(1).gate(0.9..=0.1).validate().is_err());
    }

    #[test]
    fn progression_rests_keep_the_step_length() {
        let mut chords = ChordProgression::pop(0, 960).rest_probability(1.0);
        let step = chords.next_step();
        assert!(step.is_rest());
        assert_eq!(step.advance_ticks, 1920);
    }

    #[test]
    fn program_is_announced_once_per_source() {
        let source = melody(1).program(65);
        assert_eq!(
            source.programs(),
            vec![MidiEvent::ProgramChange {
                channel: 1,
                program: 65
            }]
        );
    }
}
