//! Error types for kvlog
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::txlog::EventType;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for kvlog operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // -------------------------------------------------------------------------
    // Transaction Log Errors
    // -------------------------------------------------------------------------
    /// The backend could not be opened or its schema verified/created.
    #[error("Transaction log initialization failed: {0}")]
    Initialization(String),

    /// A log record could not be parsed during replay.
    #[error("Input parse error at line {line}: {reason}")]
    Parse { line: u64, reason: String },

    /// A log record's sequence did not advance past its predecessor.
    #[error("Transaction numbers out of sequence: {found} follows {previous}")]
    OutOfSequence { previous: u64, found: u64 },

    /// The backend failed while streaming history.
    #[error("Transaction log read failure: {0}")]
    ReplayRead(String),

    /// A single event failed to persist during live operation.
    #[error("Failed to persist {kind} event for key {key:?}: {reason}")]
    Write {
        kind: EventType,
        key: String,
        reason: String,
    },

    /// An event holds characters the backend's record format cannot carry.
    #[error("Event cannot be encoded: {0}")]
    Unencodable(String),

    /// The record reached the log but the flush to disk failed; it will
    /// still replay.
    #[error("Written as sequence {sequence} but not synced: {reason}")]
    Unsynced { sequence: u64, reason: String },

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// True for failures that abort the replay phase.
    pub fn is_replay_error(&self) -> bool {
        matches!(
            self,
            KvError::Parse { .. } | KvError::OutOfSequence { .. } | KvError::ReplayRead(_)
        )
    }

    /// True for failures that must stop the store from starting.
    pub fn is_fatal(&self) -> bool {
        matches!(self, KvError::Initialization(_)) || self.is_replay_error()
    }
}
