//! Band parts
//!
//! Step sources for the roles an ensemble is made of: a bass that follows
//! chord roots, an arpeggiator, a broken-chord accompaniment, a queue of
//! melodic motifs and a walking bass. Each one cycles through the same
//! chord list with one chord per `bar`, so voices started on a shared origin
//! change harmony together.

use std::collections::VecDeque;
use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::step::{Step, StepSource};
use super::{check_channel, check_chords, check_velocity, program_change, rng_from};
use crate::engine::timeline::beats_to_ticks;
use crate::error::ConfigError;
use crate::io::MidiEvent;
use crate::sequencing::{Duration, Scale};

fn shift(note: u8, semitones: i32) -> i32 {
    note as i32 + semitones
}

fn clamp_note(note: i32) -> u8 {
    note.clamp(0, 127) as u8
}

fn check_shifted(chords: &[Vec<u8>], semitones: i32) -> Result<(), ConfigError> {
    match chords
        .iter()
        .flatten()
        .map(|&n| shift(n, semitones))
        .find(|n| !(0..=127).contains(n))
    {
        Some(note) => Err(ConfigError::OutOfRange {
            what: "transposed note",
            value: note.unsigned_abs(),
        }),
        None => Ok(()),
    }
}

/// The root of each chord on fixed beats of the bar.
///
/// The root is the first note of the voicing, moved by `transpose`
/// semitones. A note never rings past the next onset.
pub struct RootBass {
    chords: Vec<Vec<u8>>,
    channel: u8,
    ppq: u32,
    bar_ticks: u64,
    onsets: Vec<f64>,
    length: f64,
    transpose: i32,
    velocity: RangeInclusive<u8>,
    program: Option<u8>,
    rng: StdRng,
    chord: usize,
    hit: usize,
}

impl RootBass {
    pub fn new(chords: Vec<Vec<u8>>, channel: u8, bar: Duration, ppq: u32) -> Self {
        Self {
            chords,
            channel,
            ppq,
            bar_ticks: bar.to_ticks(ppq),
            onsets: vec![0.0],
            length: 1.0,
            transpose: -12,
            velocity: 90..=90,
            program: None,
            rng: rng_from(None),
            chord: 0,
            hit: 0,
        }
    }

    /// Onsets in beats from the start of each bar. The first must be 0.
    pub fn onsets(mut self, beats: impl Into<Vec<f64>>) -> Self {
        self.onsets = beats.into();
        self
    }

    /// Sounding length of each note, in beats.
    pub fn length(mut self, beats: f64) -> Self {
        self.length = beats;
        self
    }

    pub fn transpose(mut self, semitones: i32) -> Self {
        self.transpose = semitones;
        self
    }

    pub fn velocity(mut self, range: RangeInclusive<u8>) -> Self {
        self.velocity = range;
        self
    }

    pub fn program(mut self, program: u8) -> Self {
        self.program = Some(program);
        self
    }

    pub fn seeded(mut self, seed: Option<u64>) -> Self {
        self.rng = rng_from(seed);
        self
    }

    fn onset_ticks(&self, index: usize) -> u64 {
        match self.onsets.get(index) {
            Some(&beat) => beats_to_ticks(beat, self.ppq),
            None => self.bar_ticks,
        }
    }
}

impl StepSource for RootBass {
    fn validate(&self) -> Result<(), ConfigError> {
        check_chords(&self.chords)?;
        check_channel(self.channel)?;
        check_velocity(&self.velocity)?;
        check_shifted(&self.chords, self.transpose)?;
        if self.bar_ticks == 0 || !(self.length > 0.0) {
            return Err(ConfigError::ZeroLengthStep);
        }
        let ticks: Vec<u64> = (0..=self.onsets.len()).map(|i| self.onset_ticks(i)).collect();
        if self.onsets.first() != Some(&0.0) || ticks.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::InvalidPart(format!(
                "bass onsets {:?} must start at 0 and rise within the bar",
                self.onsets
            )));
        }
        Ok(())
    }

    fn next_step(&mut self) -> Step {
        let advance = self.onset_ticks(self.hit + 1).saturating_sub(self.onset_ticks(self.hit));
        let root = self
            .chords
            .get(self.chord)
            .and_then(|chord| chord.first())
            .copied();

        self.hit += 1;
        if self.hit >= self.onsets.len() {
            self.hit = 0;
            self.chord = (self.chord + 1) % self.chords.len().max(1);
        }

        let advance = advance.max(1);
        match root {
            Some(root) => {
                let length = beats_to_ticks(self.length, self.ppq).clamp(1, advance);
                let velocity = self.rng.gen_range(self.velocity.clone());
                Step::note(self.channel, clamp_note(shift(root, self.transpose)), velocity, advance)
                    .gated(length)
            }
            None => Step::rest(advance),
        }
    }

    fn programs(&self) -> Vec<MidiEvent> {
        program_change(self.channel, self.program)
    }
}

/// Plays chord tones one at a time in a fixed index order.
///
/// With `order = [0, 1, 2, 1]` each pass walks root, third, fifth, third.
/// The pattern repeats `repeats` times per chord.
pub struct Arpeggio {
    chords: Vec<Vec<u8>>,
    order: Vec<usize>,
    channel: u8,
    ticks: u64,
    repeats: usize,
    velocity: RangeInclusive<u8>,
    program: Option<u8>,
    rng: StdRng,
    chord: usize,
    position: usize,
}

impl Arpeggio {
    pub fn new(
        chords: Vec<Vec<u8>>,
        order: impl Into<Vec<usize>>,
        channel: u8,
        step: Duration,
        ppq: u32,
    ) -> Self {
        Self {
            chords,
            order: order.into(),
            channel,
            ticks: step.to_ticks(ppq),
            repeats: 1,
            velocity: 90..=90,
            program: None,
            rng: rng_from(None),
            chord: 0,
            position: 0,
        }
    }

    pub fn repeats(mut self, passes: usize) -> Self {
        self.repeats = passes;
        self
    }

    pub fn velocity(mut self, range: RangeInclusive<u8>) -> Self {
        self.velocity = range;
        self
    }

    pub fn program(mut self, program: u8) -> Self {
        self.program = Some(program);
        self
    }

    pub fn seeded(mut self, seed: Option<u64>) -> Self {
        self.rng = rng_from(seed);
        self
    }
}

impl StepSource for Arpeggio {
    fn validate(&self) -> Result<(), ConfigError> {
        check_chords(&self.chords)?;
        check_channel(self.channel)?;
        check_velocity(&self.velocity)?;
        if self.ticks == 0 {
            return Err(ConfigError::ZeroLengthStep);
        }
        if self.order.is_empty() || self.repeats == 0 {
            return Err(ConfigError::InvalidPart(
                "arpeggio needs an order and at least one pass".into(),
            ));
        }
        let shortest = self.chords.iter().map(Vec::len).min().unwrap_or(0);
        if let Some(&index) = self.order.iter().find(|&&i| i >= shortest) {
            return Err(ConfigError::OutOfRange {
                what: "arpeggio index",
                value: index as u32,
            });
        }
        Ok(())
    }

    fn next_step(&mut self) -> Step {
        let note = self.chords.get(self.chord).and_then(|chord| {
            let index = self.order.get(self.position % self.order.len().max(1))?;
            chord.get(index % chord.len().max(1)).copied()
        });

        self.position += 1;
        if self.position >= self.order.len() * self.repeats.max(1) {
            self.position = 0;
            self.chord = (self.chord + 1) % self.chords.len().max(1);
        }

        match note {
            Some(note) => {
                let velocity = self.rng.gen_range(self.velocity.clone());
                Step::note(self.channel, note, velocity, self.ticks)
            }
            None => Step::rest(self.ticks),
        }
    }

    fn programs(&self) -> Vec<MidiEvent> {
        program_change(self.channel, self.program)
    }
}

/// Random chord tones, one per step, `per_chord` steps on each chord.
///
/// The pool is the transposed voicing plus its root an octave higher.
pub struct BrokenChord {
    chords: Vec<Vec<u8>>,
    channel: u8,
    ppq: u32,
    ticks: u64,
    per_chord: usize,
    length: Option<f64>,
    transpose: i32,
    velocity: RangeInclusive<u8>,
    program: Option<u8>,
    rng: StdRng,
    chord: usize,
    count: usize,
}

impl BrokenChord {
    pub fn new(
        chords: Vec<Vec<u8>>,
        channel: u8,
        step: Duration,
        per_chord: usize,
        ppq: u32,
    ) -> Self {
        Self {
            chords,
            channel,
            ppq,
            ticks: step.to_ticks(ppq),
            per_chord,
            length: None,
            transpose: 0,
            velocity: 50..=50,
            program: None,
            rng: rng_from(None),
            chord: 0,
            count: 0,
        }
    }

    /// Sounding length in beats; the whole step when unset.
    pub fn length(mut self, beats: f64) -> Self {
        self.length = Some(beats);
        self
    }

    pub fn transpose(mut self, semitones: i32) -> Self {
        self.transpose = semitones;
        self
    }

    pub fn velocity(mut self, range: RangeInclusive<u8>) -> Self {
        self.velocity = range;
        self
    }

    pub fn program(mut self, program: u8) -> Self {
        self.program = Some(program);
        self
    }

    pub fn seeded(mut self, seed: Option<u64>) -> Self {
        self.rng = rng_from(seed);
        self
    }
}

impl StepSource for BrokenChord {
    fn validate(&self) -> Result<(), ConfigError> {
        check_chords(&self.chords)?;
        check_channel(self.channel)?;
        check_velocity(&self.velocity)?;
        check_shifted(&self.chords, self.transpose + 12)?;
        check_shifted(&self.chords, self.transpose)?;
        if self.ticks == 0 || self.per_chord == 0 || self.length.is_some_and(|l| !(l > 0.0)) {
            return Err(ConfigError::ZeroLengthStep);
        }
        Ok(())
    }

    fn next_step(&mut self) -> Step {
        let Some(chord) = self.chords.get(self.chord) else {
            return Step::rest(self.ticks.max(1));
        };
        let upper_root = chord.first().map(|&root| shift(root, self.transpose + 12));
        let pool: Vec<i32> = chord
            .iter()
            .map(|&n| shift(n, self.transpose))
            .chain(upper_root)
            .collect();
        let note = pool.choose(&mut self.rng).copied().map(clamp_note);

        self.count += 1;
        if self.count >= self.per_chord {
            self.count = 0;
            self.chord = (self.chord + 1) % self.chords.len();
        }

        match note {
            Some(note) => {
                let velocity = self.rng.gen_range(self.velocity.clone());
                let sounding = self
                    .length
                    .map_or(self.ticks, |beats| beats_to_ticks(beats, self.ppq))
                    .clamp(1, self.ticks);
                Step::note(self.channel, note, velocity, self.ticks).gated(sounding)
            }
            None => Step::rest(self.ticks.max(1)),
        }
    }

    fn programs(&self) -> Vec<MidiEvent> {
        program_change(self.channel, self.program)
    }
}

/// How a motif's pitch numbers become MIDI notes.
#[derive(Debug, Clone, PartialEq)]
pub enum MotifPitch {
    /// Semitones above `root`.
    Semitones { root: u8 },
    /// Scale degrees; degrees past either end continue in the next octave.
    Degrees(Scale),
}

impl MotifPitch {
    fn resolve(&self, pitch: i32) -> i32 {
        match self {
            MotifPitch::Semitones { root } => shift(*root, pitch),
            MotifPitch::Degrees(scale) => {
                let len = scale.len().max(1) as i32;
                let note = scale
                    .notes()
                    .get(pitch.rem_euclid(len) as usize)
                    .copied()
                    .unwrap_or(60);
                shift(note, 12 * pitch.div_euclid(len))
            }
        }
    }
}

/// A short melodic figure: `(pitch, beats)` pairs.
pub type Motif = Vec<(i32, f64)>;

/// Plays motifs front to back, rotating the queue after each one.
///
/// An inverted queue mirrors every pitch around zero, so a rising figure
/// falls by the same steps. A `gap` of silence follows each motif.
pub struct MotifQueue {
    motifs: VecDeque<Motif>,
    pitch: MotifPitch,
    inverted: bool,
    transpose: i32,
    channel: u8,
    ppq: u32,
    gap: f64,
    velocity: RangeInclusive<u8>,
    program: Option<u8>,
    rng: StdRng,
    position: usize,
}

impl MotifQueue {
    pub fn new(motifs: Vec<Motif>, pitch: MotifPitch, channel: u8, ppq: u32) -> Self {
        Self {
            motifs: motifs.into(),
            pitch,
            inverted: false,
            transpose: 0,
            channel,
            ppq,
            gap: 0.0,
            velocity: 100..=100,
            program: None,
            rng: rng_from(None),
            position: 0,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    pub fn transpose(mut self, semitones: i32) -> Self {
        self.transpose = semitones;
        self
    }

    /// Silence after each motif, in beats.
    pub fn gap(mut self, beats: f64) -> Self {
        self.gap = beats;
        self
    }

    pub fn velocity(mut self, range: RangeInclusive<u8>) -> Self {
        self.velocity = range;
        self
    }

    pub fn program(mut self, program: u8) -> Self {
        self.program = Some(program);
        self
    }

    pub fn seeded(mut self, seed: Option<u64>) -> Self {
        self.rng = rng_from(seed);
        self
    }

    fn note_of(&self, pitch: i32) -> i32 {
        let pitch = if self.inverted { -pitch } else { pitch };
        self.pitch.resolve(pitch) + self.transpose
    }
}

impl StepSource for MotifQueue {
    fn validate(&self) -> Result<(), ConfigError> {
        check_channel(self.channel)?;
        check_velocity(&self.velocity)?;
        if let MotifPitch::Degrees(scale) = &self.pitch {
            if scale.is_empty() {
                return Err(ConfigError::EmptyScale);
            }
        }
        if self.motifs.is_empty() || self.motifs.iter().any(Vec::is_empty) {
            return Err(ConfigError::InvalidPart("motif queue has an empty motif".into()));
        }
        if !(self.gap >= 0.0) {
            return Err(ConfigError::InvalidPart(format!("motif gap {} is negative", self.gap)));
        }
        for &(pitch, beats) in self.motifs.iter().flatten() {
            if beats_to_ticks(beats, self.ppq) == 0 {
                return Err(ConfigError::ZeroLengthStep);
            }
            let note = self.note_of(pitch);
            if !(0..=127).contains(&note) {
                return Err(ConfigError::OutOfRange {
                    what: "motif note",
                    value: note.unsigned_abs(),
                });
            }
        }
        Ok(())
    }

    fn next_step(&mut self) -> Step {
        let gap_ticks = beats_to_ticks(self.gap, self.ppq);
        for _ in 0..=self.motifs.len() {
            let next = self
                .motifs
                .front()
                .and_then(|motif| motif.get(self.position))
                .copied();
            if let Some((pitch, beats)) = next {
                self.position += 1;
                let ticks = beats_to_ticks(beats, self.ppq).max(1);
                let velocity = self.rng.gen_range(self.velocity.clone());
                return Step::note(self.channel, clamp_note(self.note_of(pitch)), velocity, ticks);
            }
            self.position = 0;
            self.motifs.rotate_left(1.min(self.motifs.len()));
            if gap_ticks > 0 {
                return Step::rest(gap_ticks);
            }
        }
        Step::rest(self.ppq.max(1) as u64)
    }

    fn programs(&self) -> Vec<MidiEvent> {
        program_change(self.channel, self.program)
    }
}

/// A bass line that walks up or down the note list by one or two places
/// each step, turning back at either end.
pub struct WalkingBass {
    notes: Vec<u8>,
    channel: u8,
    ticks: u64,
    gate: f64,
    velocity: RangeInclusive<u8>,
    program: Option<u8>,
    rng: StdRng,
    index: usize,
}

impl WalkingBass {
    pub fn new(notes: impl Into<Vec<u8>>, channel: u8, step: Duration, ppq: u32) -> Self {
        Self {
            notes: notes.into(),
            channel,
            ticks: step.to_ticks(ppq),
            gate: 0.9,
            velocity: 40..=60,
            program: None,
            rng: rng_from(None),
            index: 0,
        }
    }

    /// Fraction of each step the note sounds for.
    pub fn gate(mut self, fraction: f64) -> Self {
        self.gate = fraction;
        self
    }

    pub fn velocity(mut self, range: RangeInclusive<u8>) -> Self {
        self.velocity = range;
        self
    }

    pub fn program(mut self, program: u8) -> Self {
        self.program = Some(program);
        self
    }

    pub fn seeded(mut self, seed: Option<u64>) -> Self {
        self.rng = rng_from(seed);
        self
    }
}

impl StepSource for WalkingBass {
    fn validate(&self) -> Result<(), ConfigError> {
        check_chords(std::slice::from_ref(&self.notes))?;
        check_channel(self.channel)?;
        check_velocity(&self.velocity)?;
        if self.ticks == 0 {
            return Err(ConfigError::ZeroLengthStep);
        }
        if !(self.gate > 0.0 && self.gate <= 1.0) {
            return Err(ConfigError::InvalidPart(format!("gate {} not in (0, 1]", self.gate)));
        }
        Ok(())
    }

    fn next_step(&mut self) -> Step {
        let Some(&note) = self.notes.get(self.index) else {
            return Step::rest(self.ticks.max(1));
        };
        let last = self.notes.len() as i64 - 1;
        let stride = [-2i64, -1, 1, 2].choose(&mut self.rng).copied().unwrap_or(1);
        let mut next = self.index as i64 + stride;
        if next < 0 || next > last {
            next = self.index as i64 - stride;
        }
        self.index = next.clamp(0, last.max(0)) as usize;

        let velocity = self.rng.gen_range(self.velocity.clone());
        let sounding = ((self.ticks as f64 * self.gate).round() as u64).clamp(1, self.ticks.max(1));
        Step::note(self.channel, note, velocity, self.ticks).gated(sounding)
    }

    fn programs(&self) -> Vec<MidiEvent> {
        program_change(self.channel, self.program)
    }
}
