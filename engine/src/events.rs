//! Event values and the queue-backed reporter.
//!
//! `QueueReporter` turns reporter hooks into `SplitEvent` values on an
//! unbounded channel so that a polling consumer (a UI loop, or the CLI's
//! JSON mode) can render them on its own schedule.

use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use serde::Serialize;

use crate::error::{ErrorKind, SplitError};
use crate::progress::{SplitReporter, Throttle, PROGRESS_INTERVAL_QUEUE};

/// One step of a split, as seen by a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SplitEvent {
    InitialInfo {
        total_parts: u64,
        total_bytes: u64,
    },
    StartPart {
        part_number: u64,
        total_parts: u64,
    },
    FinishPart {
        part_number: u64,
        total_parts: u64,
    },
    FileProgress {
        written_bytes: u64,
        total_bytes: u64,
    },
    ArchiveBit {
        error: Option<String>,
    },
    /// Terminal: the split completed.
    NormalExit,
    /// Terminal: the split failed or the worker panicked.
    ExceptionExit {
        kind: ErrorKind,
        message: String,
        debug: String,
    },
}

impl SplitEvent {
    /// True for the last event of a run. Nothing follows a terminal event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SplitEvent::NormalExit | SplitEvent::ExceptionExit { .. })
    }

    pub fn from_error(err: &SplitError) -> Self {
        SplitEvent::ExceptionExit {
            kind: err.kind(),
            message: err.to_string(),
            debug: format!("{:?}", err),
        }
    }
}

/// Unbounded FIFO of events with a non-blocking consumer side.
#[derive(Debug, Clone)]
pub struct EventQueue {
    sender: Sender<SplitEvent>,
    receiver: Receiver<SplitEvent>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        EventQueue { sender, receiver }
    }

    /// Producer handle for this queue.
    pub fn sender(&self) -> Sender<SplitEvent> {
        self.sender.clone()
    }

    /// Enqueue without blocking.
    pub fn push(&self, event: SplitEvent) {
        // The queue owns a receiver, so the channel is never disconnected.
        let _ = self.sender.send(event);
    }

    /// Take the next event if one is ready.
    pub fn try_next(&self) -> Option<SplitEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Take every event that is ready right now.
    pub fn drain(&self) -> Vec<SplitEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// A SplitReporter implementation that sends events to a channel.
///
/// Only FileProgress is rate-limited; part boundaries and the archive-bit
/// result are always forwarded.
pub struct QueueReporter {
    sender: Sender<SplitEvent>,
    throttle: Mutex<Throttle>,
}

impl QueueReporter {
    pub fn new(sender: Sender<SplitEvent>) -> Self {
        Self::with_interval(sender, PROGRESS_INTERVAL_QUEUE)
    }

    pub fn with_interval(sender: Sender<SplitEvent>, interval: Duration) -> Self {
        QueueReporter {
            sender,
            throttle: Mutex::new(Throttle::new(interval)),
        }
    }

    fn send(&self, event: SplitEvent) {
        let _ = self.sender.send(event);
    }
}

impl SplitReporter for QueueReporter {
    fn on_initial_info(&self, total_parts: u64, total_bytes: u64) {
        self.send(SplitEvent::InitialInfo {
            total_parts,
            total_bytes,
        });
    }

    fn on_start_part(&self, part_number: u64, total_parts: u64) {
        self.send(SplitEvent::StartPart {
            part_number,
            total_parts,
        });
    }

    fn on_finish_part(&self, part_number: u64, total_parts: u64) {
        self.send(SplitEvent::FinishPart {
            part_number,
            total_parts,
        });
    }

    fn on_file_progress(&self, written_bytes: u64, total_bytes: u64) {
        let admitted = self
            .throttle
            .lock()
            .map(|mut throttle| throttle.admit())
            .unwrap_or(false);
        if admitted {
            self.send(SplitEvent::FileProgress {
                written_bytes,
                total_bytes,
            });
        }
    }

    fn on_archive_bit(&self, error: Option<&str>) {
        self.send(SplitEvent::ArchiveBit {
            error: error.map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_hooks_become_events_in_order() {
        let queue = EventQueue::new();
        let reporter = QueueReporter::new(queue.sender());

        reporter.on_initial_info(2, 300);
        reporter.on_start_part(0, 2);
        reporter.on_finish_part(0, 2);
        reporter.on_archive_bit(None);

        assert_eq!(
            queue.drain(),
            vec![
                SplitEvent::InitialInfo { total_parts: 2, total_bytes: 300 },
                SplitEvent::StartPart { part_number: 0, total_parts: 2 },
                SplitEvent::FinishPart { part_number: 0, total_parts: 2 },
                SplitEvent::ArchiveBit { error: None },
            ]
        );
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn test_progress_burst_is_rate_limited() {
        let queue = EventQueue::new();
        let reporter = QueueReporter::new(queue.sender());

        for written in 0..1000 {
            reporter.on_file_progress(written, 1000);
        }
        let progress = queue
            .drain()
            .into_iter()
            .filter(|e| matches!(e, SplitEvent::FileProgress { .. }))
            .count();
        assert!(progress <= 1, "forwarded {} progress events", progress);
    }

    #[test]
    fn test_push_and_try_next_are_fifo() {
        let queue = EventQueue::new();
        assert!(queue.is_empty());
        queue.push(SplitEvent::StartPart { part_number: 0, total_parts: 2 });
        queue.push(SplitEvent::NormalExit);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.try_next(), Some(SplitEvent::StartPart { part_number: 0, total_parts: 2 }));
        assert_eq!(queue.try_next(), Some(SplitEvent::NormalExit));
        assert!(queue.try_next().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_zero_interval_forwards_every_progress_call() {
        let queue = EventQueue::new();
        let reporter = QueueReporter::with_interval(queue.sender(), Duration::ZERO);
        for written in 1..=5 {
            reporter.on_file_progress(written, 5);
        }
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn test_exception_exit_from_error() {
        let err = SplitError::InvalidInput {
            path: PathBuf::from("dir"),
        };
        let event = SplitEvent::from_error(&err);
        assert!(event.is_terminal());
        match event {
            SplitEvent::ExceptionExit { kind, message, debug } => {
                assert_eq!(kind, ErrorKind::InvalidInput);
                assert_eq!(message, "dir is not a file");
                assert!(debug.contains("InvalidInput"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_events_serialize_tagged() {
        let json = serde_json::to_string(&SplitEvent::StartPart {
            part_number: 1,
            total_parts: 3,
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"start_part","part_number":1,"total_parts":3}"#);

        let json = serde_json::to_string(&SplitEvent::NormalExit).unwrap();
        assert_eq!(json, r#"{"event":"normal_exit"}"#);

        let err = SplitError::WriteError {
            path: PathBuf::from("00"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk gone"),
        };
        let json = serde_json::to_value(SplitEvent::from_error(&err)).unwrap();
        assert_eq!(json["kind"], "IOFailure");
        assert_eq!(json["kind"], err.kind().to_string().as_str());
    }
}
