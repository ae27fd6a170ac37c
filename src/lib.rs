//! PRUNEKEEP - Retention Maintenance Scheduler
//!
//! Keeps a locally accumulated telemetry store in bounds. Each tick decides
//! whether size pruning, expiration or storage cleanup is due, runs what is,
//! and persists the next due time of every action.

pub mod backend;
pub mod checkpoint;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod policy;

pub use backend::{MaintenanceBackend, MemoryBackend, MemoryBackendConfig};
pub use checkpoint::{
    CheckpointEdit, CheckpointKey, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore,
    NOT_SCHEDULED,
};
pub use config::{PruneConfig, ScheduleConfig};
pub use error::{BackendError, CheckpointError, PruneError};
pub use metrics::MaintenanceMetrics;
pub use policy::{Action, ActionOutcome, PrunePolicy, TickReport};
