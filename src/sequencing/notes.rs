/*
General MIDI Constants
======================

Percussion keys (channel 10), a few melodic programs and the velocity levels
the rhythm tables use. Percussion names follow the GM 1 percussion map.

Pitched notes are plain MIDI numbers: C4 (middle C) = 60, A4 = 69.
*/

// Dynamics
pub const VEL_ACCENT: u8 = 120;
pub const VEL_NORMAL: u8 = 100;
pub const VEL_GHOST: u8 = 70;

// GM percussion
pub const BASS_DRUM: u8 = 36;
pub const ACOUSTIC_SNARE: u8 = 38;
pub const CLOSED_HI_HAT: u8 = 42;
pub const LOW_TOM: u8 = 45;
pub const LOW_MID_TOM: u8 = 47;
pub const HIGH_TOM: u8 = 50;
pub const COWBELL: u8 = 56;
pub const HIGH_BONGO: u8 = 60;
pub const MUTE_HIGH_CONGA: u8 = 62;
pub const OPEN_HIGH_CONGA: u8 = 63;
pub const HIGH_TIMBALE: u8 = 65;
pub const HIGH_AGOGO: u8 = 67;
pub const LOW_AGOGO: u8 = 68;
pub const MARACAS: u8 = 70;
pub const HIGH_WOOD_BLOCK: u8 = 76;

// GM programs (0-indexed)
pub const ACOUSTIC_GRAND: u8 = 0;
pub const ELECTRIC_PIANO: u8 = 4;
pub const MARIMBA: u8 = 12;
pub const ACOUSTIC_BASS: u8 = 32;
pub const SYNTH_BASS: u8 = 38;
pub const SOPRANO_SAX: u8 = 64;
pub const FLUTE: u8 = 73;
pub const SQUARE_LEAD: u8 = 80;
pub const CALLIOPE_LEAD: u8 = 82;
pub const SYNTH_PAD: u8 = 88;
pub const WARM_PAD: u8 = 89;
pub const KALIMBA: u8 = 108;

// Scales
pub const A_MINOR_PENTATONIC: [u8; 7] = [69, 72, 74, 76, 79, 81, 84];
pub const C_MAJOR: [u8; 8] = [60, 62, 64, 65, 67, 69, 71, 72];
/// One octave without the upper tonic, for degree arithmetic that wraps.
pub const C_IONIAN: [u8; 7] = [60, 62, 64, 65, 67, 69, 71];
pub const C_MINOR_BLUES: [u8; 6] = [60, 63, 65, 66, 69, 71];
