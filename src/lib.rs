//! # kvlog
//!
//! A key-value store made crash-recoverable by a transaction log:
//! - Every Put/Delete is queued and persisted asynchronously
//! - Strictly increasing sequence numbers per log
//! - Interchangeable backends: flat file or SQLite table
//! - History replayed into memory before the store goes live
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────────┐
//!   │    Store    │ ◀─replay─│ TransactionLogger│
//!   │  (RwLock)   │          │ (queue + writer) │
//!   └─────────────┘          └────────┬─────────┘
//!                                     │
//!                          ┌──────────┴──────────┐
//!                          ▼                     ▼
//!                   ┌────────────┐        ┌────────────┐
//!                   │    File    │        │   SQLite   │
//!                   └────────────┘        └────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod txlog;
pub mod store;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::{Config, LogBackend, SyncStrategy};
pub use engine::Engine;
pub use store::{KeyValueStore, Store};
pub use txlog::{Event, EventType, FileTransactionLogger, SqliteTransactionLogger, TransactionLogger};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
