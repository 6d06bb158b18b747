//! Configuration for kvlog
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{KvError, Result};

/// Main configuration for a kvlog instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Transaction Log Configuration
    // -------------------------------------------------------------------------
    /// Durable backend the transaction log is written to
    pub log_backend: LogBackend,

    /// Sync strategy: how often the file backend fsyncs
    pub sync_strategy: SyncStrategy,

    /// Capacity of the bounded event queue in front of the writer
    pub queue_capacity: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Transaction log backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogBackend {
    /// Append-only, tab-separated text file
    File { path: PathBuf },

    /// `transactions` table in an SQLite database file
    Sqlite { path: PathBuf },
}

/// File backend sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

/// Default queue depth between callers and the writer
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

impl Default for Config {
    fn default() -> Self {
        Self {
            log_backend: LogBackend::File {
                path: PathBuf::from("./kvlog_data/transaction.log"),
            },
            sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            listen_addr: "127.0.0.1:8080".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings that would leave the store unusable
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(KvError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(KvError::Config(
                "sync strategy entry count must be at least 1".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(KvError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Log to an append-only file at `path`
    pub fn file_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_backend = LogBackend::File { path: path.into() };
        self
    }

    /// Log to an SQLite database at `path`
    pub fn sqlite_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_backend = LogBackend::Sqlite { path: path.into() };
        self
    }

    /// Set the file backend sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the event queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
