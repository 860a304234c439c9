use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::{MidiEvent, MidiMessage, OutputSink, SinkError};

/// A message captured by [`RecordingSink`] along with the instant it arrived.
#[derive(Debug, Clone, Copy)]
pub struct RecordedMessage {
    pub at: Instant,
    pub message: MidiMessage,
}

impl RecordedMessage {
    pub fn event(&self) -> Option<MidiEvent> {
        self.message.event()
    }
}

/// Sink that timestamps every message into a shared log.
///
/// Clones share the same log, so one clone can be handed to the scheduler
/// while another is kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<RecordedMessage>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// Snapshot of everything recorded so far, in arrival order.
    pub fn messages(&self) -> Vec<RecordedMessage> {
        self.log.lock().clone()
    }

    /// Decoded events in arrival order; undecodable messages are skipped.
    pub fn events(&self) -> Vec<MidiEvent> {
        self.log.lock().iter().filter_map(|m| m.event()).collect()
    }

    pub fn clear(&self) {
        self.log.lock().clear();
    }
}

impl OutputSink for RecordingSink {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        let at = Instant::now();
        let message = MidiMessage::from_raw(bytes)
            .ok_or_else(|| SinkError::Send(format!("unsupported message length {}", bytes.len())))?;
        self.log.lock().push(RecordedMessage { at, message });
        Ok(())
    }
}
