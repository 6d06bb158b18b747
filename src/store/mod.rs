//! Store Module
//!
//! In-memory key-value map that replayed and live mutations are applied to.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Shared/exclusive locking for concurrent request handlers
//! - Never writes to the transaction log itself

mod table;

pub use table::Store;

use crate::error::Result;

/// Operations the recovery protocol and request handlers need from a store
pub trait KeyValueStore: Send + Sync {
    /// Insert or overwrite `key`
    fn put(&self, key: String, value: String) -> Result<()>;

    /// Value for `key`, or `KvError::KeyNotFound`
    fn get(&self, key: &str) -> Result<String>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}
