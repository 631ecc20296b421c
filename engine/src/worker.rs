//! Background split worker.
//!
//! Runs a split on its own thread with a `QueueReporter`, then pushes one
//! terminal event. The caller polls the queue from its own loop and never
//! blocks on the split's I/O.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use tracing::{error, info, info_span};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::events::{EventQueue, QueueReporter, SplitEvent};
use crate::job::Splitter;
use crate::model::SplitRequest;

/// Handle to a split running on a background thread.
pub struct SplitWorker {
    id: Uuid,
    queue: EventQueue,
    thread: Option<JoinHandle<()>>,
    finished: bool,
}

impl SplitWorker {
    /// Spawn a split with the default `Splitter` and a fresh queue.
    pub fn spawn(request: SplitRequest) -> std::io::Result<Self> {
        Self::spawn_with(Splitter::new(), request, None)
    }

    /// Spawn a split with a caller-supplied engine and, optionally, queue.
    ///
    /// # Errors
    /// Returns an error only if the OS refuses to create the thread.
    pub fn spawn_with(
        splitter: Splitter,
        request: SplitRequest,
        queue: Option<EventQueue>,
    ) -> std::io::Result<Self> {
        let id = Uuid::new_v4();
        let queue = queue.unwrap_or_default();
        let thread_queue = queue.clone();

        let thread = thread::Builder::new()
            .name(format!("split-{}", id.simple()))
            .spawn(move || {
                let span = info_span!("split_worker", %id);
                let _guard = span.enter();

                let reporter = QueueReporter::new(thread_queue.sender());
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    splitter.split(&request, &reporter)
                }));

                let terminal = match outcome {
                    Ok(Ok(summary)) => {
                        info!(output = %summary.output_dir.display(), "worker finished");
                        SplitEvent::NormalExit
                    }
                    Ok(Err(err)) => {
                        error!(kind = %err.kind(), "split failed: {}", err);
                        SplitEvent::from_error(&err)
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!("split worker panicked: {}", message);
                        SplitEvent::ExceptionExit {
                            kind: ErrorKind::Panic,
                            debug: format!("panic: {:?}", message),
                            message,
                        }
                    }
                };
                thread_queue.push(terminal);
            })?;

        Ok(SplitWorker {
            id,
            queue,
            thread: Some(thread),
            finished: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The queue events are delivered on.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Take every event available now, without blocking.
    ///
    /// Stops at the terminal event; after that the worker is finished and
    /// further polls return nothing.
    pub fn poll(&mut self) -> Vec<SplitEvent> {
        let mut events = Vec::new();
        while !self.finished {
            let Some(event) = self.queue.try_next() else {
                break;
            };
            self.finished = event.is_terminal();
            events.push(event);
        }
        events
    }

    /// True once the terminal event has been returned by `poll`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wait for the worker thread to exit.
    ///
    /// Events are left on the queue; poll them before or after joining.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            // The thread body catches panics from the split itself.
            let _ = thread.join();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
