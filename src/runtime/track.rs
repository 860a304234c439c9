//! Track - one part on one channel
//!
//! A track turns a list of measure-relative hits into note-on/note-off pairs
//! at absolute ticks of a player's timeline.

use crate::engine::{EventScheduler, Timeline};
use crate::io::MidiEvent;
use crate::sequencing::{Hit, Part};

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    pub channel: u8,
    pub hits: Vec<Hit>,
    /// Replaces every hit's velocity when set (cross-fades).
    pub velocity: Option<u8>,
}

impl Track {
    pub fn new(name: impl Into<String>, channel: u8, hits: Vec<Hit>) -> Self {
        Self {
            name: name.into(),
            channel,
            hits,
            velocity: None,
        }
    }

    pub fn from_part(part: &Part, channel: u8) -> Self {
        Self::new(part.name.clone(), channel, part.hits.clone())
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = Some(velocity.min(127));
        self
    }

    /// Submit one measure starting at tick `measure_start`.
    ///
    /// Hits whose onset falls at or after `measure_ticks` are skipped, so a
    /// part borrowed from a longer meter never spills into the next measure.
    /// Returns the number of notes submitted.
    pub fn schedule(
        &self,
        scheduler: &EventScheduler,
        timeline: &Timeline,
        measure_start: u64,
        measure_ticks: u64,
    ) -> usize {
        let ppq = timeline.ppq();
        let mut notes = 0;
        for hit in &self.hits {
            let onset = hit.onset_ticks(ppq);
            if onset >= measure_ticks {
                continue;
            }
            let on = measure_start + onset;
            let off = on + hit.length_ticks(ppq);
            let velocity = self.velocity.unwrap_or(hit.velocity);

            scheduler.submit(
                timeline.at(on),
                MidiEvent::note_on(self.channel, hit.note, velocity),
            );
            scheduler.submit(timeline.at(off), MidiEvent::note_off(self.channel, hit.note));
            notes += 1;
        }
        notes
    }
}
