//! Error types for the scheduler, players and configuration.

use thiserror::Error;

use crate::io::SinkError;

/// Rejected rhythm, phrase or player configuration.
///
/// Raised by `validate()` before any thread starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("rhythm '{rhythm}' has no parts")]
    EmptyRhythm { rhythm: String },

    #[error("'{rhythm}': tempo {bpm} is outside 1..=1000 bpm")]
    InvalidTempo { rhythm: String, bpm: f64 },

    #[error("rhythm '{rhythm}': beats per measure must be at least 1")]
    EmptyMeasure { rhythm: String },

    #[error("rhythm '{rhythm}': build order names unknown part '{part}'")]
    UnknownPart { rhythm: String, part: String },

    #[error("rhythm '{rhythm}': part '{part}' is missing from the build order")]
    PartNotInBuildOrder { rhythm: String, part: String },

    #[error("rhythm '{rhythm}': at least one core part is required")]
    NoCoreParts { rhythm: String },

    #[error("rhythm '{rhythm}', part '{part}': hit at beat {beat} lies outside the {beats}-beat measure")]
    HitOutsideMeasure {
        rhythm: String,
        part: String,
        beat: f64,
        beats: u32,
    },

    #[error("rhythm '{rhythm}', part '{part}': hit length must be positive, got {length}")]
    InvalidLength {
        rhythm: String,
        part: String,
        length: f64,
    },

    #[error("{what} out of MIDI range: {value}")]
    OutOfRange { what: &'static str, value: u32 },

    #[error("no phrase table for rhythm '{rhythm}'")]
    MissingPhrases { rhythm: String },

    #[error("phrase table for '{rhythm}' has no {kind} phrases")]
    EmptyPhrases { rhythm: String, kind: &'static str },

    #[error("scale must contain at least one note")]
    EmptyScale,

    #[error("mix needs at least one rhythm")]
    NoRhythms,

    #[error("invalid mix setting: {0}")]
    InvalidMix(String),

    #[error("invalid part setting: {0}")]
    InvalidPart(String),

    #[error("ensemble '{0}' has no voices")]
    EmptyEnsemble(String),

    #[error("unknown rhythm '{0}'")]
    UnknownRhythm(String),

    #[error("step source produced a zero-length step")]
    ZeroLengthStep,
}

/// Failures of the dispatch thread's lifecycle or of the sink while it ran.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("invalid scheduler settings: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn dispatch thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("dispatch thread panicked")]
    Panicked,

    #[error("{failed} dispatch(es) failed; first error: {first}")]
    Sink { failed: u64, first: SinkError },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("output error: {0}")]
    Sink(#[from] SinkError),

    #[error("MIDI output port {index} not available (ports: {available:?})")]
    PortUnavailable { index: usize, available: Vec<String> },

    #[error("MIDI device error: {0}")]
    MidiDevice(String),

    #[error("failed to spawn player thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("player '{0}' panicked")]
    PlayerPanicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "midir")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::MidiDevice(e.to_string())
    }
}

#[cfg(feature = "midir")]
impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::MidiDevice(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
