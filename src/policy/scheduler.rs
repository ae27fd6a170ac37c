//! Prune Policy
//!
//! Three maintenance actions, each on its own schedule:
//!   1) Prune-by-size: recorded data is taking up an unreasonable amount of space.
//!   2) Expiration: data has been kept longer than it is useful.
//!   3) Cleanup: storage maintenance (bloat, fragmentation). Runs on its own
//!      schedule, or early whenever the backend asks for it.

use tracing::{debug, error, info, warn};

use super::{Action, ActionOutcome, Schedule, TickReport};
use crate::backend::MaintenanceBackend;
use crate::checkpoint::{CheckpointEdit, CheckpointStore};
use crate::clock::format_millis;
use crate::config::PruneConfig;
use crate::error::{BackendError, PruneError};
use crate::metrics::MaintenanceMetrics;

/// Releases the backend when a tick ends, including on unwind
struct ReleaseGuard<'a, B: MaintenanceBackend> {
    backend: &'a B,
    metrics: &'a MaintenanceMetrics,
}

impl<B: MaintenanceBackend> Drop for ReleaseGuard<'_, B> {
    fn drop(&mut self) {
        if let Err(err) = self.backend.close() {
            let err = PruneError::Release(err);
            warn!(error = ?err, "Got error releasing maintenance backend");
            self.metrics.record_release_failure();
        }
    }
}

/// Retention scheduler over a checkpoint store and a maintenance backend
pub struct PrunePolicy<S, B> {
    store: S,
    backend: B,
    config: PruneConfig,
    metrics: MaintenanceMetrics,
}

impl<S: CheckpointStore, B: MaintenanceBackend> PrunePolicy<S, B> {
    pub fn new(store: S, backend: B, config: PruneConfig) -> Self {
        Self {
            store,
            backend,
            config,
            metrics: MaintenanceMetrics::new(),
        }
    }

    pub fn config(&self) -> &PruneConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MaintenanceMetrics {
        &self.metrics
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Schedule backing one action
    pub fn schedule(&self, action: Action) -> Schedule {
        Schedule::for_action(action, &self.config)
    }

    /// Run whatever maintenance is due at `now` (epoch millis).
    ///
    /// Never fails: action errors and commit errors are logged and reported
    /// in the returned [`TickReport`]. Staged checkpoints are committed even
    /// when an action fails, and the backend is released exactly once.
    pub fn tick(&self, now: i64) -> TickReport {
        let _release = ReleaseGuard {
            backend: &self.backend,
            metrics: &self.metrics,
        };

        let mut report = TickReport::new(now);
        let mut edit = CheckpointEdit::new();

        if let Err(err) = self.run_actions(now, &mut edit, &mut report) {
            // Action faults never propagate out of a tick
            error!(error = ?err, "Got error pruning stored data");
            report.action_error = Some(err);
        }

        match edit.commit(&self.store) {
            Ok(committed) => report.committed = committed,
            Err(err) => {
                let err = PruneError::Commit(err);
                error!(error = ?err, "Got error committing checkpoints");
                report.commit_error = Some(err);
            }
        }

        self.metrics.record(&report);
        report
    }

    fn run_actions(
        &self,
        now: i64,
        edit: &mut CheckpointEdit,
        report: &mut TickReport,
    ) -> Result<(), PruneError> {
        for action in Action::ALL {
            let result = match action {
                Action::PruneBySize => self.attempt_prune_by_size(now, edit),
                Action::Expiration => self.attempt_expiration(now, edit),
                Action::Cleanup => self.attempt_storage_cleanup(now, edit),
            };

            match result {
                Ok(outcome) => {
                    if outcome.ran() {
                        info!(action = %action, "Maintenance action ran");
                    }
                    report.set(action, outcome);
                }
                Err(source) => {
                    report.set(action, ActionOutcome::Failed);
                    return Err(PruneError::action(action, source));
                }
            }
        }
        Ok(())
    }

    fn attempt_prune_by_size(
        &self,
        now: i64,
        edit: &mut CheckpointEdit,
    ) -> Result<ActionOutcome, BackendError> {
        self.schedule(Action::PruneBySize)
            .run_if_due(&self.store, edit, now, || self.prune_by_size())
    }

    fn prune_by_size(&self) -> Result<(), BackendError> {
        // Environments go first: their cascading deletes may remove events.
        // Orphaned environments are not handled here.
        let environment_count = self.backend.environment_count()?;
        if environment_count > self.config.max_environments {
            let prune = environment_count.saturating_sub(self.config.environments_after_prune);
            debug!(count = prune, "Pruning environments");
            self.backend.prune_environments(prune)?;
        }

        let event_count = self.backend.event_count()?;
        if event_count > self.config.max_events {
            let prune = event_count.saturating_sub(self.config.events_after_prune);
            debug!(count = prune, "Pruning up to count events, best effort");
            self.backend.prune_events(prune)?;
        }
        Ok(())
    }

    fn attempt_expiration(
        &self,
        now: i64,
        edit: &mut CheckpointEdit,
    ) -> Result<ActionOutcome, BackendError> {
        self.schedule(Action::Expiration)
            .run_if_due(&self.store, edit, now, || {
                let cutoff = now.saturating_sub(self.config.event_retention_ms);
                debug!(cutoff = %format_millis(cutoff), "Pruning data older than cutoff");
                self.backend.delete_data_before(cutoff)
            })
    }

    fn attempt_storage_cleanup(
        &self,
        now: i64,
        edit: &mut CheckpointEdit,
    ) -> Result<ActionOutcome, BackendError> {
        let schedule = self.schedule(Action::Cleanup);

        if self.backend.should_cleanup_early()? {
            debug!("Cleaning up storage early");
            schedule.run_now(edit, now, || self.backend.cleanup())?;
            return Ok(ActionOutcome::Ran);
        }

        schedule.run_if_due(&self.store, edit, now, || self.backend.cleanup())
    }
}
