// Purpose - output sinks and the MIDI wire format

pub mod midi;
#[cfg(feature = "midir")]
pub mod port;
pub mod record;
#[cfg(feature = "rtrb")]
pub mod ring;

use thiserror::Error;

pub use midi::{MidiEvent, MidiMessage};
#[cfg(feature = "midir")]
pub use port::MidirSink;
pub use record::{RecordedMessage, RecordingSink};
#[cfg(feature = "rtrb")]
pub use ring::{MessageReceiver, RingSink};

/// Errors a sink can report for a single send.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("MIDI send failed: {0}")]
    Send(String),

    #[error("output sink is full")]
    Full,

    #[error("output sink is closed")]
    Closed,
}

/// Destination for encoded MIDI messages.
///
/// `send` is expected to be fast and non-blocking beyond handing off a few
/// bytes; the scheduler calls it from its dispatch thread.
pub trait OutputSink: Send + 'static {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SinkError>;
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        (**self).send(bytes)
    }
}
