//! Write pipeline
//!
//! The bounded queue and single writer thread shared by every backend.

use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::KvError;
use super::{Event, EventSink};

/// State handed to the writer thread when it starts
struct Worker {
    events: Receiver<Event>,
    errors: Sender<KvError>,
    sink: Box<dyn EventSink>,
}

/// Bounded FIFO queue in front of a single persisting thread
///
/// ## Concurrency:
/// - `events`: cloned per call, blocks producers when the queue is full
/// - `errors`: capacity 1, the writer blocks while it is full
/// - `worker`: taken exactly once by `start`
pub(crate) struct WritePipeline {
    events: Sender<Event>,
    errors: Receiver<KvError>,
    worker: Mutex<Option<Worker>>,
}

impl WritePipeline {
    pub(crate) fn new(capacity: usize, sink: Box<dyn EventSink>) -> Self {
        let (events_tx, events_rx) = channel::bounded(capacity);
        let (errors_tx, errors_rx) = channel::bounded(1);

        Self {
            events: events_tx,
            errors: errors_rx,
            worker: Mutex::new(Some(Worker {
                events: events_rx,
                errors: errors_tx,
                sink,
            })),
        }
    }

    /// Queue an event, waiting for room if the queue is full
    pub(crate) fn enqueue(&self, event: Event) {
        if let Err(e) = self.events.send(event) {
            // Only possible if the writer thread died
            tracing::error!(
                "Transaction log writer is gone, dropping {} for key {:?}",
                e.0.kind,
                e.0.key
            );
        }
    }

    pub(crate) fn errors(&self) -> Receiver<KvError> {
        self.errors.clone()
    }

    /// Spawn the writer thread. Returns false if it was already started.
    pub(crate) fn start(&self, backend: &'static str) -> bool {
        let Some(worker) = self.worker.lock().take() else {
            tracing::warn!("{} transaction logger is already running", backend);
            return false;
        };

        let spawned = thread::Builder::new()
            .name("txlog-writer".to_string())
            .spawn(move || write_loop(worker, backend));

        match spawned {
            Ok(_) => {
                tracing::info!("{} transaction logger running", backend);
                true
            }
            Err(e) => {
                tracing::error!("Failed to spawn transaction log writer: {}", e);
                false
            }
        }
    }
}

/// Persist events in dequeue order until every producer is gone
///
/// A failed event is reported and skipped; the loop keeps going.
fn write_loop(mut worker: Worker, backend: &'static str) {
    for event in worker.events.iter() {
        match worker.sink.persist(&event) {
            Ok(sequence) => {
                tracing::trace!(
                    "Persisted {} {:?} as sequence {}",
                    event.kind,
                    event.key,
                    sequence
                );
            }
            Err(e) => {
                let err = KvError::Write {
                    kind: event.kind,
                    key: event.key,
                    reason: e.to_string(),
                };
                tracing::debug!("{} write failed: {}", backend, err);
                if worker.errors.send(err).is_err() {
                    // Error stream has no reader left; nothing to report to
                    tracing::warn!("Dropping write error, no error stream consumer");
                }
            }
        }
    }

    tracing::debug!("{} transaction log writer stopped", backend);
}
