//! Deadline-ordered MIDI dispatch.
//!
//! Producers submit `(deadline, message)` pairs from any thread; a single
//! dispatch thread owns the output sink and sends each message at the first
//! moment not before its deadline. Delivery is at-most-once and
//! fire-and-forget: a failing sink is logged and counted, never retried.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info, trace, warn};

use super::queue::{EventQueue, ScheduledEvent};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::io::midi::CHANNEL_COUNT;
use crate::io::{MidiEvent, MidiMessage, OutputSink, SinkError};

/// Counters reported when the dispatch thread stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub failed: u64,
    /// Worst observed gap between an event's deadline and its dispatch.
    pub max_lateness: Duration,
    /// Events still queued when the thread stopped; they are discarded.
    pub abandoned: usize,
}

#[derive(Default)]
struct FailureLog {
    count: u64,
    first: Option<SinkError>,
}

struct Shared {
    queue: Mutex<EventQueue>,
    wake: Condvar,
    running: AtomicBool,
    sink: Mutex<Box<dyn OutputSink>>,
    dispatched: AtomicU64,
    max_lateness_ns: AtomicU64,
    failures: Mutex<FailureLog>,
    worker: Mutex<Option<JoinHandle<()>>>,
    config: SchedulerConfig,
}

/// Handle to the scheduler. Clones share one queue, sink and dispatch thread.
#[derive(Clone)]
pub struct EventScheduler {
    shared: Arc<Shared>,
}

impl EventScheduler {
    pub fn new(sink: impl OutputSink, config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(EventQueue::with_capacity(256)),
                wake: Condvar::new(),
                running: AtomicBool::new(false),
                sink: Mutex::new(Box::new(sink) as Box<dyn OutputSink>),
                dispatched: AtomicU64::new(0),
                max_lateness_ns: AtomicU64::new(0),
                failures: Mutex::new(FailureLog::default()),
                worker: Mutex::new(None),
                config,
            }),
        }
    }

    /// Construct and start in one step.
    pub fn spawn(sink: impl OutputSink, config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let scheduler = Self::new(sink, config);
        scheduler.start()?;
        Ok(scheduler)
    }

    /// Spawn the dispatch thread.
    pub fn start(&self) -> Result<(), SchedulerError> {
        self.shared.config.validate()?;
        let mut worker = self.shared.worker.lock();
        if worker.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }
        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("ostinato-scheduler".to_string())
            .spawn(move || dispatch_loop(&shared))
            .inspect_err(|_| self.shared.running.store(false, Ordering::Release))?;
        *worker = Some(handle);
        info!(
            poll_quantum_ms = self.shared.config.poll_quantum.as_secs_f64() * 1000.0,
            "scheduler started"
        );
        Ok(())
    }

    /// Stop the dispatch thread and wait for it to exit.
    ///
    /// Events still queued are discarded. If any dispatch failed while the
    /// thread ran, the first failure is returned along with the count.
    /// Calling `stop` on a scheduler that isn't running returns the current
    /// counters.
    pub fn stop(&self) -> Result<DispatchStats, SchedulerError> {
        self.shared.running.store(false, Ordering::Release);
        {
            // Taking the queue lock orders this notify after the loop's
            // running check, so the wake-up can't be lost.
            let _queue = self.shared.queue.lock();
            self.shared.wake.notify_all();
        }
        let handle = self.shared.worker.lock().take();
        if let Some(handle) = handle {
            handle.join().map_err(|_| SchedulerError::Panicked)?;
        }

        let abandoned = {
            let mut queue = self.shared.queue.lock();
            let n = queue.len();
            queue.clear();
            n
        };
        let stats = DispatchStats {
            dispatched: self.shared.dispatched.load(Ordering::Acquire),
            failed: self.shared.failures.lock().count,
            max_lateness: Duration::from_nanos(self.shared.max_lateness_ns.load(Ordering::Acquire)),
            abandoned,
        };
        info!(
            dispatched = stats.dispatched,
            failed = stats.failed,
            abandoned = stats.abandoned,
            max_lateness_us = stats.max_lateness.as_micros() as u64,
            "scheduler stopped"
        );

        let mut failures = self.shared.failures.lock();
        match failures.first.take() {
            Some(first) => Err(SchedulerError::Sink {
                failed: std::mem::take(&mut failures.count),
                first,
            }),
            None => Ok(stats),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Queue `message` for dispatch at `deadline`.
    ///
    /// Deadlines in the past are dispatched on the next wake-up. Never waits
    /// on the sink.
    pub fn submit(&self, deadline: Instant, message: impl Into<MidiMessage>) {
        let message = message.into();
        let mut queue = self.shared.queue.lock();
        if queue.push(deadline, message) {
            // The loop may be sleeping toward a later deadline.
            self.shared.wake.notify_one();
        }
    }

    pub fn submit_after(&self, delay: Duration, message: impl Into<MidiMessage>) {
        self.submit(Instant::now() + delay, message);
    }

    /// Write straight to the sink, bypassing the queue.
    pub fn send_now(&self, message: impl Into<MidiMessage>) -> Result<(), SinkError> {
        let message = message.into();
        self.shared.sink.lock().send(message.as_bytes())
    }

    /// "All notes off" on every channel, sent immediately.
    ///
    /// Stops notes whose note-off is still queued, or was lost when a player
    /// stopped between a note's begin and end.
    pub fn silence_all(&self) -> Result<(), SinkError> {
        let mut sink = self.shared.sink.lock();
        let mut first_error = None;
        for channel in 0..CHANNEL_COUNT {
            let message = MidiEvent::all_notes_off(channel).to_message();
            if let Err(e) = sink.send(message.as_bytes()) {
                first_error.get_or_insert(e);
            }
        }
        debug!("all notes silenced");
        first_error.map_or(Ok(()), Err)
    }

    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn dispatched(&self) -> u64 {
        self.shared.dispatched.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }
}

fn dispatch_loop(shared: &Shared) {
    let quantum = shared.config.poll_quantum;
    let mut queue = shared.queue.lock();

    while shared.running.load(Ordering::Acquire) {
        let now = Instant::now();
        match queue.peek_deadline() {
            None => {
                shared.wake.wait_for(&mut queue, quantum);
            }
            Some(deadline) if deadline <= now => {
                if let Some(event) = queue.pop_due(now) {
                    // Submitters must not wait on sink I/O.
                    MutexGuard::unlocked(&mut queue, || shared.dispatch(event, now));
                }
            }
            Some(deadline) => {
                // Sleep the remaining delta; re-check afterwards either way,
                // since wake-ups can be early (new head, stop) or late.
                shared.wake.wait_until(&mut queue, deadline);
            }
        }
    }
    trace!("dispatch loop exited");
}

impl Shared {
    fn dispatch(&self, event: ScheduledEvent, now: Instant) {
        let lateness = now.saturating_duration_since(event.deadline);
        self.max_lateness_ns
            .fetch_max(lateness.as_nanos() as u64, Ordering::AcqRel);

        let result = self.sink.lock().send(event.message.as_bytes());
        match result {
            Ok(()) => {
                self.dispatched.fetch_add(1, Ordering::AcqRel);
                trace!(
                    seq = event.seq,
                    message = ?event.message,
                    lateness_us = lateness.as_micros() as u64,
                    "dispatched"
                );
            }
            Err(e) => {
                warn!(seq = event.seq, message = ?event.message, error = %e, "dispatch failed");
                let mut failures = self.failures.lock();
                failures.count += 1;
                failures.first.get_or_insert(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::RecordingSink;

    fn note(key: u8) -> MidiEvent {
        MidiEvent::note_on(0, key, 100)
    }

    #[test]
    fn dispatches_in_deadline_order() {
        let sink = RecordingSink::new();
        let scheduler = EventScheduler::new(sink.clone(), SchedulerConfig::default());
        let t = Instant::now() + Duration::from_millis(20);
        scheduler.submit(t + Duration::from_millis(100), note(b'A'));
        scheduler.submit(t + Duration::from_millis(50), note(b'B'));
        scheduler.submit(t + Duration::from_millis(50), note(b'C'));
        scheduler.submit(t + Duration::from_millis(10), note(b'D'));
        scheduler.start().unwrap();

        thread::sleep(Duration::from_millis(250));
        let stats = scheduler.stop().unwrap();

        assert_eq!(stats.dispatched, 4);
        let keys: Vec<u8> = sink
            .events()
            .into_iter()
            .map(|e| match e {
                MidiEvent::NoteOn { key, .. } => key,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(keys, vec![b'D', b'B', b'C', b'A']);
    }

    #[test]
    fn past_deadline_is_dispatched_not_dropped() {
        let sink = RecordingSink::new();
        let scheduler = EventScheduler::spawn(sink.clone(), SchedulerConfig::default()).unwrap();
        let now = Instant::now();
        let past = now.checked_sub(Duration::from_millis(500)).unwrap_or(now);
        scheduler.submit(past, note(1));

        thread::sleep(Duration::from_millis(50));
        scheduler.stop().unwrap();
        assert_eq!(sink.events(), vec![note(1)]);
    }

    #[test]
    fn earlier_submission_wakes_a_long_sleep() {
        let sink = RecordingSink::new();
        let scheduler = EventScheduler::spawn(sink.clone(), SchedulerConfig::default()).unwrap();
        scheduler.submit_after(Duration::from_secs(30), note(2));
        thread::sleep(Duration::from_millis(20));

        let submitted = Instant::now();
        scheduler.submit(submitted + Duration::from_millis(10), note(1));
        thread::sleep(Duration::from_millis(100));
        let stats = scheduler.stop().unwrap();

        let messages = sink.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].at >= submitted + Duration::from_millis(10));
        assert_eq!(stats.abandoned, 1);
    }

    #[test]
    fn stop_interrupts_sleep_promptly() {
        let scheduler =
            EventScheduler::spawn(RecordingSink::new(), SchedulerConfig::default()).unwrap();
        scheduler.submit_after(Duration::from_secs(60), note(1));
        thread::sleep(Duration::from_millis(20));

        let begin = Instant::now();
        scheduler.stop().unwrap();
        assert!(begin.elapsed() < Duration::from_millis(500));
        assert!(!scheduler.is_running());
    }

    #[test]
    fn zero_quantum_refuses_to_start() {
        let config = SchedulerConfig {
            poll_quantum: Duration::ZERO,
        };
        let result = EventScheduler::spawn(RecordingSink::new(), config);
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }

    #[test]
    fn idle_scheduler_is_not_an_error() {
        let scheduler =
            EventScheduler::spawn(RecordingSink::new(), SchedulerConfig::default()).unwrap();
        thread::sleep(Duration::from_millis(30));
        let stats = scheduler.stop().unwrap();
        assert_eq!(stats, DispatchStats::default());
    }

    #[test]
    fn double_start_is_rejected() {
        let scheduler =
            EventScheduler::spawn(RecordingSink::new(), SchedulerConfig::default()).unwrap();
        assert!(matches!(scheduler.start(), Err(SchedulerError::AlreadyRunning)));
        scheduler.stop().unwrap();
    }

    #[test]
    fn silence_all_covers_every_channel() {
        let sink = RecordingSink::new();
        let scheduler = EventScheduler::new(sink.clone(), SchedulerConfig::default());
        scheduler.silence_all().unwrap();

        let events = sink.events();
        assert_eq!(events.len(), CHANNEL_COUNT as usize);
        for (channel, event) in events.into_iter().enumerate() {
            assert_eq!(event, MidiEvent::all_notes_off(channel as u8));
        }
    }

    struct BrokenSink;

    impl OutputSink for BrokenSink {
        fn send(&mut self, _bytes: &[u8]) -> Result<(), SinkError> {
            Err(SinkError::Send("unplugged".into()))
        }
    }

    #[test]
    fn sink_failures_surface_at_stop() {
        let scheduler = EventScheduler::spawn(BrokenSink, SchedulerConfig::default()).unwrap();
        scheduler.submit(Instant::now(), note(1));
        scheduler.submit(Instant::now(), note(2));
        thread::sleep(Duration::from_millis(50));

        match scheduler.stop() {
            Err(SchedulerError::Sink { failed, first }) => {
                assert_eq!(failed, 2);
                assert_eq!(first, SinkError::Send("unplugged".into()));
            }
            other => panic!("expected sink error, got {other:?}"),
        }
    }
}
