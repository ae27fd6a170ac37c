//! Pending Checkpoint Edit
//!
//! Buffers the next-due writes of one tick and flushes them as a single
//! batch.

use std::collections::BTreeMap;

use super::{CheckpointKey, CheckpointStore};
use crate::error::CheckpointError;

/// Uncommitted checkpoint writes (last write to a key wins)
#[derive(Debug, Default)]
pub struct CheckpointEdit {
    pending: BTreeMap<String, i64>,
}

impl CheckpointEdit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a write under an arbitrary key
    pub fn set(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.pending.insert(key.into(), value);
        self
    }

    /// Stage the next-due time of one action
    pub fn set_next_due(&mut self, key: CheckpointKey, time: i64) -> &mut Self {
        self.set(key.as_str(), time)
    }

    /// Staged value for a key, if any
    pub fn pending(&self, key: &str) -> Option<i64> {
        self.pending.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Flush every staged write to `store` as one batch.
    ///
    /// The edit is consumed either way. An empty edit never touches the
    /// store.
    pub fn commit<S: CheckpointStore + ?Sized>(self, store: &S) -> Result<usize, CheckpointError> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let writes: Vec<(String, i64)> = self.pending.into_iter().collect();
        store.commit(&writes)?;
        Ok(writes.len())
    }
}
