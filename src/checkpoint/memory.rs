//! In-Memory Checkpoint Store

use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use super::CheckpointStore;
use crate::error::CheckpointError;

/// Thread-safe checkpoint store that lives for the process only
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    values: RwLock<HashMap<String, i64>>,
    commits: AtomicU64,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without counting it as a commit
    pub fn with_value(self, key: impl Into<String>, value: i64) -> Self {
        self.values.write().insert(key.into(), value);
        self
    }

    /// Number of batches committed so far
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Copy of every stored value
    pub fn entries(&self) -> HashMap<String, i64> {
        self.values.read().clone()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.values.read().get(key).copied().unwrap_or(default)
    }

    fn commit(&self, writes: &[(String, i64)]) -> Result<(), CheckpointError> {
        let mut values = self.values.write();
        for (key, value) in writes {
            values.insert(key.clone(), *value);
        }
        self.commits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_with_default() {
        let store = MemoryCheckpointStore::new().with_value("a", 5);
        assert_eq!(store.get_i64("a", -1), 5);
        assert_eq!(store.get_i64("b", -1), -1);
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn test_commit_overwrites() {
        let store = MemoryCheckpointStore::new().with_value("a", 5);
        store
            .commit(&[("a".to_string(), 6), ("b".to_string(), 7)])
            .unwrap();

        let entries = store.entries();
        assert_eq!(entries.get("a"), Some(&6));
        assert_eq!(entries.get("b"), Some(&7));
        assert_eq!(store.commit_count(), 1);
    }
}
