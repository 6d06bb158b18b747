//! Store implementation
//!
//! HashMap guarded by a parking_lot RwLock.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{KvError, Result};
use super::KeyValueStore;

/// Mutex-guarded map of string keys to string values
#[derive(Default)]
pub struct Store {
    data: RwLock<HashMap<String, String>>,
}

impl Store {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Snapshot of all entries, sorted by key
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort();
        entries
    }
}

impl KeyValueStore for Store {
    fn put(&self, key: String, value: String) -> Result<()> {
        self.data.write().insert(key, value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<String> {
        self.data.read().get(key).cloned().ok_or(KvError::KeyNotFound)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }
}
