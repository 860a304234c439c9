/// Musical note length as an exact fraction of a whole note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    pub numerator: u32,
    /// 4 = quarter, 8 = eighth, ...
    pub denominator: u32,
}

impl Duration {
    pub const WHOLE: Duration = Duration::new(1, 1);
    pub const HALF: Duration = Duration::new(1, 2);
    pub const QUARTER: Duration = Duration::new(1, 4);
    pub const EIGHTH: Duration = Duration::new(1, 8);
    pub const SIXTEENTH: Duration = Duration::new(1, 16);

    pub const DOTTED_QUARTER: Duration = Duration::QUARTER.dotted();
    pub const EIGHTH_TRIPLET: Duration = Duration::EIGHTH.triplet();

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Duration {
            numerator,
            denominator,
        }
    }

    /// Multiply by 3/2.
    pub const fn dotted(self) -> Self {
        Duration::new(self.numerator * 3, self.denominator * 2)
    }

    /// Multiply by 2/3 (three in the time of two).
    pub const fn triplet(self) -> Self {
        Duration::new(self.numerator * 2, self.denominator * 3)
    }

    /// Length in ticks at `ppq` pulses per quarter note.
    ///
    /// Exact whenever `ppq` is divisible by the reduced denominator / 4,
    /// which holds for everything down to 64th-note triplets at PPQ 960.
    pub fn to_ticks(&self, ppq: u32) -> u64 {
        (self.numerator as u64 * 4 * ppq as u64) / self.denominator as u64
    }

    /// Length in quarter-note beats.
    pub fn beats(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PPQ: u32 = 960;

    #[test]
    fn straight_lengths() {
        assert_eq!(Duration::WHOLE.to_ticks(PPQ), 3840);
        assert_eq!(Duration::QUARTER.to_ticks(PPQ), 960);
        assert_eq!(Duration::EIGHTH.to_ticks(PPQ), 480);
        assert_eq!(Duration::SIXTEENTH.to_ticks(PPQ), 240);
    }

    #[test]
    fn dotted_and_triplet_lengths_are_exact() {
        assert_eq!(Duration::DOTTED_QUARTER.to_ticks(PPQ), 1440);
        assert_eq!(Duration::EIGHTH_TRIPLET.to_ticks(PPQ), 320);
        // three triplet eighths fill one quarter exactly
        assert_eq!(
            3 * Duration::EIGHTH_TRIPLET.to_ticks(PPQ),
            Duration::QUARTER.to_ticks(PPQ)
        );
    }

    #[test]
    fn beats_are_quarter_notes() {
        assert_eq!(Duration::HALF.beats(), 2.0);
        assert_eq!(Duration::EIGHTH.beats(), 0.5);
    }
}
