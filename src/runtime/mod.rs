//! Producers: threads that turn musical material into scheduled events.
//!
//! Every producer owns a [`Timeline`] and an integer tick cursor. It submits
//! note-on/note-off pairs at `timeline.at(tick)` and then sleeps on its
//! [`StopSignal`] until shortly before the next window, so late wake-ups
//! never shift the music.
//!
//! # Example
//!
//! ```ignore
//! use ostinato::{config::*, engine::EventScheduler, io::RecordingSink};
//! use ostinato::runtime::RhythmPlayer;
//! use ostinato::sequencing::RhythmLibrary;
//!
//! let scheduler = EventScheduler::spawn(RecordingSink::new(), SchedulerConfig::default())?;
//! let rhythm = RhythmLibrary::builtin().find("fanga")?.clone();
//! let player = RhythmPlayer::new(scheduler.clone(), rhythm, PlayerConfig::default())?.start()?;
//! // ...
//! player.join()?;
//! scheduler.silence_all()?;
//! scheduler.stop()?;
//! ```

pub mod ensemble;
pub mod generators;
pub mod handle;
pub mod mix;
pub mod parts;
pub mod rhythm_player;
pub mod signal;
pub mod step;
pub mod track;
pub mod voice_set;

use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::engine::Timeline;
use crate::error::ConfigError;
use crate::io::midi::CHANNEL_COUNT;
use crate::io::MidiEvent;

pub use ensemble::{Ensemble, EnsembleVoice};
pub use generators::{ChordProgression, RandomMelody};
pub use handle::{spawn, Player, PlayerHandle};
pub use mix::{MixPlayer, MixState, SectionRecord};
pub use parts::{Arpeggio, BrokenChord, Motif, MotifPitch, MotifQueue, RootBass, WalkingBass};
pub use rhythm_player::RhythmPlayer;
pub use signal::StopSignal;
pub use step::{Step, StepNote, StepPlayer, StepSource};
pub use track::Track;
pub use voice_set::{MelodyLayer, VoiceSet};

pub(crate) fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// `lookahead` before tick `ticks`, or the tick itself if that would
/// underflow the clock.
pub(crate) fn wake_before(timeline: &Timeline, ticks: u64, lookahead: Duration) -> Instant {
    let at = timeline.at(ticks);
    at.checked_sub(lookahead).unwrap_or(at)
}

/// The program change a source announces, if it has one.
pub(crate) fn program_change(channel: u8, program: Option<u8>) -> Vec<MidiEvent> {
    program
        .map(|program| MidiEvent::ProgramChange { channel, program })
        .into_iter()
        .collect()
}

pub(crate) fn check_channel(channel: u8) -> Result<(), ConfigError> {
    if channel >= CHANNEL_COUNT {
        return Err(ConfigError::OutOfRange {
            what: "channel",
            value: channel as u32,
        });
    }
    Ok(())
}

/// Non-empty and within MIDI's 7 bits, so sampling it can't panic.
pub(crate) fn check_velocity(range: &RangeInclusive<u8>) -> Result<(), ConfigError> {
    if range.is_empty() || *range.end() > 127 {
        return Err(ConfigError::OutOfRange {
            what: "velocity",
            value: *range.end() as u32,
        });
    }
    Ok(())
}

pub(crate) fn check_chords(chords: &[Vec<u8>]) -> Result<(), ConfigError> {
    if chords.is_empty() || chords.iter().any(Vec::is_empty) {
        return Err(ConfigError::InvalidPart("chord list has an empty chord".into()));
    }
    if let Some(&note) = chords.iter().flatten().find(|&&n| n > 127) {
        return Err(ConfigError::OutOfRange {
            what: "note",
            value: note as u32,
        });
    }
    Ok(())
}
