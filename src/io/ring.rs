use rtrb::{Consumer, Producer, RingBuffer};

use super::{MidiEvent, OutputSink, SinkError};

/// In-process sink: decoded events go into a lock-free ring so a consumer on
/// another thread (an audio callback, a monitor) can drain them without
/// touching a MIDI port.
pub struct RingSink {
    tx: Producer<MidiEvent>,
}

impl RingSink {
    /// Create a sink and the consumer end of its ring.
    pub fn with_capacity(capacity: usize) -> (Self, Consumer<MidiEvent>) {
        let (tx, rx) = RingBuffer::new(capacity);
        (Self { tx }, rx)
    }
}

impl OutputSink for RingSink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        if self.tx.is_abandoned() {
            return Err(SinkError::Closed);
        }
        // Anything we can't decode has no consumer-side representation.
        let Some(event) = MidiEvent::from_bytes(bytes) else {
            return Ok(());
        };
        self.tx.push(event).map_err(|_| SinkError::Full)
    }
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<MidiEvent>;
}

impl MessageReceiver for Consumer<MidiEvent> {
    fn pop(&mut self) -> Option<MidiEvent> {
        Consumer::pop(self).ok()
    }
}
