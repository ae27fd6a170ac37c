//! Maintenance Backend
//!
//! The narrow storage-management surface the scheduler drives. Record
//! layout, sync and serialization stay behind this trait.

mod memory;

pub use memory::{MemoryBackend, MemoryBackendConfig};

use std::sync::Arc;

use crate::error::BackendError;

/// Storage operations needed by the retention scheduler
pub trait MaintenanceBackend {
    /// Number of stored environments
    fn environment_count(&self) -> Result<u64, BackendError>;

    /// Delete `count` environments, least recently used first. Dependent
    /// events go with them.
    fn prune_environments(&self, count: u64) -> Result<(), BackendError>;

    /// Number of stored events
    fn event_count(&self) -> Result<u64, BackendError>;

    /// Delete up to `count` events, oldest first. Best effort.
    fn prune_events(&self, count: u64) -> Result<(), BackendError>;

    /// Delete everything recorded strictly before `cutoff_ms`
    fn delete_data_before(&self, cutoff_ms: i64) -> Result<(), BackendError>;

    /// Whether storage needs cleanup now, regardless of schedule
    fn should_cleanup_early(&self) -> Result<bool, BackendError>;

    /// Reclaim and defragment storage
    fn cleanup(&self) -> Result<(), BackendError>;

    /// Release resources held for the current tick
    fn close(&self) -> Result<(), BackendError>;
}

impl<T: MaintenanceBackend + ?Sized> MaintenanceBackend for &T {
    fn environment_count(&self) -> Result<u64, BackendError> {
        (**self).environment_count()
    }

    fn prune_environments(&self, count: u64) -> Result<(), BackendError> {
        (**self).prune_environments(count)
    }

    fn event_count(&self) -> Result<u64, BackendError> {
        (**self).event_count()
    }

    fn prune_events(&self, count: u64) -> Result<(), BackendError> {
        (**self).prune_events(count)
    }

    fn delete_data_before(&self, cutoff_ms: i64) -> Result<(), BackendError> {
        (**self).delete_data_before(cutoff_ms)
    }

    fn should_cleanup_early(&self) -> Result<bool, BackendError> {
        (**self).should_cleanup_early()
    }

    fn cleanup(&self) -> Result<(), BackendError> {
        (**self).cleanup()
    }

    fn close(&self) -> Result<(), BackendError> {
        (**self).close()
    }
}

impl<T: MaintenanceBackend + ?Sized> MaintenanceBackend for Arc<T> {
    fn environment_count(&self) -> Result<u64, BackendError> {
        (**self).environment_count()
    }

    fn prune_environments(&self, count: u64) -> Result<(), BackendError> {
        (**self).prune_environments(count)
    }

    fn event_count(&self) -> Result<u64, BackendError> {
        (**self).event_count()
    }

    fn prune_events(&self, count: u64) -> Result<(), BackendError> {
        (**self).prune_events(count)
    }

    fn delete_data_before(&self, cutoff_ms: i64) -> Result<(), BackendError> {
        (**self).delete_data_before(cutoff_ms)
    }

    fn should_cleanup_early(&self) -> Result<bool, BackendError> {
        (**self).should_cleanup_early()
    }

    fn cleanup(&self) -> Result<(), BackendError> {
        (**self).cleanup()
    }

    fn close(&self) -> Result<(), BackendError> {
        (**self).close()
    }
}
