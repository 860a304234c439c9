/// Channel-voice messages the players emit.
///
/// Channels are 0-based (0..=15). On encode the channel is masked to 4 bits
/// and data bytes to 7 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
}

/// Controller number for "All Notes Off".
pub const ALL_NOTES_OFF: u8 = 123;

/// Number of logical MIDI channels.
pub const CHANNEL_COUNT: u8 = 16;

/// General MIDI percussion channel (channel 10, 0-indexed).
pub const DRUM_CHANNEL: u8 = 9;

impl MidiEvent {
    pub fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        MidiEvent::NoteOn {
            channel,
            key,
            velocity,
        }
    }

    pub fn note_off(channel: u8, key: u8) -> Self {
        MidiEvent::NoteOff {
            channel,
            key,
            velocity: 0,
        }
    }

    pub fn all_notes_off(channel: u8) -> Self {
        MidiEvent::ControlChange {
            channel,
            controller: ALL_NOTES_OFF,
            value: 0,
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            MidiEvent::NoteOn { channel, .. }
            | MidiEvent::NoteOff { channel, .. }
            | MidiEvent::ControlChange { channel, .. }
            | MidiEvent::ProgramChange { channel, .. } => channel,
        }
    }

    /// Encode into wire bytes.
    pub fn to_message(&self) -> MidiMessage {
        match *self {
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            } => MidiMessage::three(0x90 | (channel & 0x0F), key, velocity),
            MidiEvent::NoteOff {
                channel,
                key,
                velocity,
            } => MidiMessage::three(0x80 | (channel & 0x0F), key, velocity),
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => MidiMessage::three(0xB0 | (channel & 0x0F), controller, value),
            MidiEvent::ProgramChange { channel, program } => {
                MidiMessage::two(0xC0 | (channel & 0x0F), program)
            }
        }
    }

    /// Decode wire bytes. Returns `None` for anything that isn't one of the
    /// channel-voice messages above.
    ///
    /// A note-on with velocity 0 decodes as a note-off, per the running
    /// convention most synths follow.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0F;
        match (status & 0xF0, data) {
            (0x90, [key, 0, ..]) => Some(MidiEvent::NoteOff {
                channel,
                key: *key,
                velocity: 0,
            }),
            (0x90, [key, velocity, ..]) => Some(MidiEvent::NoteOn {
                channel,
                key: *key,
                velocity: *velocity,
            }),
            (0x80, [key, velocity, ..]) => Some(MidiEvent::NoteOff {
                channel,
                key: *key,
                velocity: *velocity,
            }),
            (0xB0, [controller, value, ..]) => Some(MidiEvent::ControlChange {
                channel,
                controller: *controller,
                value: *value,
            }),
            (0xC0, [program, ..]) => Some(MidiEvent::ProgramChange {
                channel,
                program: *program,
            }),
            _ => None,
        }
    }
}

impl From<MidiEvent> for MidiMessage {
    fn from(event: MidiEvent) -> Self {
        event.to_message()
    }
}

/// Encoded MIDI message, at most three bytes, stored inline so queueing never
/// allocates.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiMessage {
    bytes: [u8; 3],
    len: u8,
}

impl MidiMessage {
    fn three(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            bytes: [status, data1 & 0x7F, data2 & 0x7F],
            len: 3,
        }
    }

    fn two(status: u8, data1: u8) -> Self {
        Self {
            bytes: [status, data1 & 0x7F, 0],
            len: 2,
        }
    }

    /// Wrap raw bytes. Fails if the slice is empty or longer than three bytes.
    pub fn from_raw(raw: &[u8]) -> Option<Self> {
        if raw.is_empty() || raw.len() > 3 {
            return None;
        }
        let mut bytes = [0u8; 3];
        bytes[..raw.len()].copy_from_slice(raw);
        Some(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn status(&self) -> u8 {
        self.bytes[0]
    }

    pub fn event(&self) -> Option<MidiEvent> {
        MidiEvent::from_bytes(self.as_bytes())
    }
}

impl std::fmt::Debug for MidiMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MidiMessage(")?;
        for (i, b) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{b:02X}")?;
        }
        write!(f, ")")
    }
}
