//! Checkpoint Storage
//!
//! Durable next-due timestamps, read individually and written in batches.

mod editor;
mod file;
mod memory;

pub use editor::CheckpointEdit;
pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;

use std::fmt;
use std::sync::Arc;

use crate::error::CheckpointError;

/// Sentinel stored for an action that has never been scheduled
pub const NOT_SCHEDULED: i64 = -1;

/// Well-known checkpoint keys, one per maintenance action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckpointKey {
    PruneBySize,
    Expiration,
    Cleanup,
}

impl CheckpointKey {
    pub const ALL: [CheckpointKey; 3] = [Self::PruneBySize, Self::Expiration, Self::Cleanup];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PruneBySize => "prune_by_size_time",
            Self::Expiration => "expiration_time",
            Self::Cleanup => "cleanup_time",
        }
    }
}

impl fmt::Display for CheckpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable mapping from named keys to integer timestamps
pub trait CheckpointStore {
    /// Read a value, returning `default` when the key is absent
    fn get_i64(&self, key: &str, default: i64) -> i64;

    /// Apply a batch of writes atomically: either all become visible or none
    fn commit(&self, writes: &[(String, i64)]) -> Result<(), CheckpointError>;

    /// Read the next-due time of one action
    fn next_due(&self, key: CheckpointKey) -> i64 {
        self.get_i64(key.as_str(), NOT_SCHEDULED)
    }
}

impl<T: CheckpointStore + ?Sized> CheckpointStore for &T {
    fn get_i64(&self, key: &str, default: i64) -> i64 {
        (**self).get_i64(key, default)
    }

    fn commit(&self, writes: &[(String, i64)]) -> Result<(), CheckpointError> {
        (**self).commit(writes)
    }
}

impl<T: CheckpointStore + ?Sized> CheckpointStore for Arc<T> {
    fn get_i64(&self, key: &str, default: i64) -> i64 {
        (**self).get_i64(key, default)
    }

    fn commit(&self, writes: &[(String, i64)]) -> Result<(), CheckpointError> {
        (**self).commit(writes)
    }
}
