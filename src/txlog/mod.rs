//! Transaction Log Module
//!
//! Records every mutation asynchronously so the in-memory store can be
//! rebuilt after a restart.
//!
//! ## Responsibilities
//! - Queue Put/Delete events from any number of callers
//! - Persist them in queue order on a single writer thread
//! - Assign strictly increasing sequence numbers (per backend)
//! - Stream recorded history back for replay at startup
//!
//! ## Data Flow
//! ```text
//!  write_put / write_delete          err()
//!            │                         ▲
//!            ▼                         │
//!   ┌──────────────────┐      ┌────────┴───────┐
//!   │ bounded queue(16)│ ───▶ │  writer thread │ ───▶ EventSink (file / sqlite)
//!   └──────────────────┘      └────────────────┘
//!
//!  read_events() ───▶ (events, errors) ───▶ recovery::replay ───▶ Store
//! ```
//!
//! ## Durability
//! Writes are fire-and-forget. A failed event is reported on the error
//! stream and dropped; it is not retried.

mod event;
mod file;
mod pipeline;
pub mod recovery;
mod sqlite;

pub use event::{Event, EventType};
pub use file::FileTransactionLogger;
pub use recovery::{LogState, Recovered, ReplaySummary};
pub use sqlite::SqliteTransactionLogger;

use crossbeam::channel::Receiver;

use crate::error::{KvError, Result};

/// Capability set every transaction log backend provides
///
/// One logger is owned per running store. All methods take `&self` so the
/// logger can be shared across request-handling threads.
pub trait TransactionLogger: Send + Sync {
    /// Enqueue a Put. Blocks only while the queue is full.
    fn write_put(&self, key: &str, value: &str);

    /// Enqueue a Delete. Blocks only while the queue is full.
    fn write_delete(&self, key: &str);

    /// Stream of asynchronous write failures
    ///
    /// The stream holds a single error; leaving it undrained stalls the
    /// writer on its second failure.
    fn err(&self) -> Receiver<KvError>;

    /// Stream recorded history in sequence order
    ///
    /// Returns an unbuffered event stream and an error stream carrying at
    /// most one terminal failure. Must not overlap with live writing.
    fn read_events(&self) -> (Receiver<Event>, Receiver<KvError>);

    /// Start the background writer. Later calls are ignored.
    fn run(&self);
}

/// Persists events for the writer thread
///
/// Each backend owns its sequence assignment strategy here: the file
/// backend keeps a counter, the relational backend asks the database.
pub trait EventSink: Send + 'static {
    /// Durably record `event`, returning the sequence it was given.
    fn persist(&mut self, event: &Event) -> Result<u64>;
}
