//! Engine Module
//!
//! Couples the in-memory store with its transaction log.
//!
//! ## Responsibilities
//! - Run the recovery state machine on startup
//! - Apply mutations to the store, then enqueue them on the logger
//! - Drain the logger's error stream so the writer never stalls

use std::thread;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::protocol::Command;
use crate::store::{KeyValueStore, Store};
use crate::txlog::recovery::{self, LogState, ReplaySummary};
use crate::txlog::TransactionLogger;

/// The key-value engine
///
/// ## Concurrency Model
///
/// - **Store**: shared/exclusive locking inside `Store`
/// - **Logger**: `write_put`/`write_delete` are safe from any thread; the
///   queue decides the order events reach the log
/// - **Errors**: a background thread logs every write failure
///
/// Two handlers racing on the same key may apply to the store and the log
/// in different orders. The log order is what a restart reproduces.
pub struct Engine {
    config: Config,
    store: Store,
    logger: Box<dyn TransactionLogger>,
    replay: ReplaySummary,
    state: LogState,
}

impl Engine {
    /// Open the configured log, replay it into a fresh store and go live
    ///
    /// Fails without serving if the log cannot be opened or replayed.
    pub fn open(config: Config) -> Result<Self> {
        let store = Store::new();
        let recovered = recovery::recover(&config, &store)?;

        spawn_error_drain(recovered.logger.as_ref())?;

        Ok(Self {
            config,
            store,
            logger: recovered.logger,
            replay: recovered.summary,
            state: LogState::Live,
        })
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Option<String>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Ping => Ok(Some("PONG".to_string())),
        }
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Result<String> {
        self.store.get(key)
    }

    /// Put a key-value pair
    ///
    /// Returns once the store is updated; the log write happens later.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.store.put(key.to_string(), value.to_string())?;
        self.logger.write_put(key, value);
        Ok(())
    }

    /// Delete a key
    pub fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(key)?;
        self.logger.write_delete(key);
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// The underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// What startup replay applied
    pub fn replay_summary(&self) -> &ReplaySummary {
        &self.replay
    }

    pub fn state(&self) -> LogState {
        self.state
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Log every asynchronous write failure until the logger goes away
fn spawn_error_drain(logger: &dyn TransactionLogger) -> Result<()> {
    let errors = logger.err();
    thread::Builder::new()
        .name("txlog-errors".to_string())
        .spawn(move || {
            for err in errors.iter() {
                tracing::error!("Transaction log write lost: {}", err);
            }
        })
        .map(|_| ())
        .map_err(|e| KvError::Initialization(format!("cannot spawn error drain: {}", e)))
}
