pub mod config; // Scheduler, player and mix settings
pub mod engine; // Deadline queue, dispatch thread, tick timeline
pub mod error;
pub mod io; // MIDI wire format and output sinks
pub mod runtime; // Producer threads: rhythm, step and mix players
pub mod sequencing; // Rhythms, phrases and the built-in library

pub use config::{MixConfig, PlayerConfig, SchedulerConfig, DEFAULT_PPQ};
pub use engine::{EventScheduler, Timeline};
pub use error::{ConfigError, Error, Result, SchedulerError};
pub use io::{MidiEvent, MidiMessage, OutputSink, SinkError};
