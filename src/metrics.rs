//! Maintenance Metrics
//!
//! Tick and action counters.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::policy::{Action, TickReport};

/// Metrics collector
#[derive(Debug, Default)]
pub struct MaintenanceMetrics {
    /// Total ticks
    ticks: AtomicU64,

    /// Runs per action, indexed in tick order
    runs: [AtomicU64; 3],

    action_failures: AtomicU64,
    commit_failures: AtomicU64,
    release_failures: AtomicU64,

    /// Checkpoint writes committed
    checkpoint_writes: AtomicU64,
}

impl MaintenanceMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one tick
    pub fn record(&self, report: &TickReport) {
        self.ticks.fetch_add(1, Ordering::Relaxed);

        for (slot, action) in self.runs.iter().zip(Action::ALL) {
            if report.ran(action) {
                slot.fetch_add(1, Ordering::Relaxed);
            }
        }

        if report.action_error.is_some() {
            self.action_failures.fetch_add(1, Ordering::Relaxed);
        }
        if report.commit_error.is_some() {
            self.commit_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.checkpoint_writes
            .fetch_add(report.committed as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_release_failure(&self) {
        self.release_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Number of ticks in which `action` ran
    pub fn runs(&self, action: Action) -> u64 {
        self.runs[action.index()].load(Ordering::Relaxed)
    }

    pub fn action_failures(&self) -> u64 {
        self.action_failures.load(Ordering::Relaxed)
    }

    pub fn commit_failures(&self) -> u64 {
        self.commit_failures.load(Ordering::Relaxed)
    }

    pub fn release_failures(&self) -> u64 {
        self.release_failures.load(Ordering::Relaxed)
    }

    pub fn checkpoint_writes(&self) -> u64 {
        self.checkpoint_writes.load(Ordering::Relaxed)
    }

    /// Get a summary of metrics
    pub fn summary(&self) -> String {
        format!(
            "Ticks: {} | Runs: prune-by-size={}, expiration={}, cleanup={} | Failures: action={}, commit={}, release={}",
            self.ticks(),
            self.runs(Action::PruneBySize),
            self.runs(Action::Expiration),
            self.runs(Action::Cleanup),
            self.action_failures(),
            self.commit_failures(),
            self.release_failures()
        )
    }
}
