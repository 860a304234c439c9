use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Instant;

use crate::io::MidiMessage;

/// A message waiting for its deadline.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledEvent {
    pub deadline: Instant,
    /// Submission sequence number; breaks deadline ties in FIFO order.
    pub seq: u64,
    pub message: MidiMessage,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Min-heap of pending events keyed on `(deadline, seq)`.
///
/// Not synchronized; the scheduler wraps it in a mutex.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Insert an event. Returns true if it became the earliest pending event.
    pub fn push(&mut self, deadline: Instant, message: MidiMessage) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;
        let event = ScheduledEvent {
            deadline,
            seq,
            message,
        };
        let is_head = self.heap.peek().map_or(true, |Reverse(head)| event < *head);
        self.heap.push(Reverse(event));
        is_head
    }

    pub fn peek_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(e)| e.deadline)
    }

    /// Remove the earliest event if its deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<ScheduledEvent> {
        match self.heap.peek() {
            Some(Reverse(head)) if head.deadline <= now => self.heap.pop().map(|Reverse(e)| e),
            _ => None,
        }
    }

    /// Remove the earliest event regardless of its deadline.
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop().map(|Reverse(e)| e)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
