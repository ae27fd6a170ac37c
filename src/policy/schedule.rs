//! Due-check with clock skew correction
//!
//! Shared by every scheduled maintenance action.

use tracing::debug;

use super::{Action, ActionOutcome};
use crate::checkpoint::{CheckpointEdit, CheckpointKey, CheckpointStore};
use crate::config::{PruneConfig, ScheduleConfig};
use crate::error::BackendError;

/// Where a stored next-due time stands relative to `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    /// Never scheduled
    Uninitialized,
    /// Further ahead than the skew limit allows; the clock went backwards
    ClockSkewed,
    /// Still in the future
    NotDue,
    /// At or before `now`
    Due,
}

/// When a due run stages its next-due time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvanceOrder {
    /// Only once the action succeeded; a failure retries next tick
    #[default]
    AfterSuccess,
    /// Before the action runs; a failure still waits a full interval
    BeforeRun,
}

/// Checkpoint key plus cadence for one action
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub action: Action,
    pub key: CheckpointKey,
    pub config: ScheduleConfig,
    pub advance: AdvanceOrder,
}

impl Schedule {
    pub fn new(action: Action, key: CheckpointKey, config: ScheduleConfig) -> Self {
        Self {
            action,
            key,
            config,
            advance: AdvanceOrder::AfterSuccess,
        }
    }

    pub fn with_advance(mut self, advance: AdvanceOrder) -> Self {
        self.advance = advance;
        self
    }

    /// Schedule configured for `action`
    pub fn for_action(action: Action, config: &PruneConfig) -> Self {
        // Cleanup backs off even when it fails; it is the expensive one
        let (cadence, advance) = match action {
            Action::PruneBySize => (config.prune_by_size, AdvanceOrder::AfterSuccess),
            Action::Expiration => (config.expiration, AdvanceOrder::AfterSuccess),
            Action::Cleanup => (config.cleanup, AdvanceOrder::BeforeRun),
        };
        Self::new(action, action.checkpoint_key(), cadence).with_advance(advance)
    }

    /// Classify a stored next-due time
    pub fn check(&self, next_due: i64, now: i64) -> DueState {
        if next_due < 0 {
            DueState::Uninitialized
        } else if next_due > now.saturating_add(self.config.skew_limit_ms) {
            DueState::ClockSkewed
        } else if next_due > now {
            DueState::NotDue
        } else {
            DueState::Due
        }
    }

    /// Next-due time for a run (or reset) at `now`
    pub fn next_due_from(&self, now: i64) -> i64 {
        now.saturating_add(self.config.interval_ms)
    }

    /// Stage the next-due time for a run (or reset) at `now`
    pub fn advance(&self, edit: &mut CheckpointEdit, now: i64) {
        edit.set_next_due(self.key, self.next_due_from(now));
    }

    /// Run `action` unconditionally, staging the next-due time in the
    /// configured order
    pub fn run_now<F>(&self, edit: &mut CheckpointEdit, now: i64, action: F) -> Result<(), BackendError>
    where
        F: FnOnce() -> Result<(), BackendError>,
    {
        match self.advance {
            AdvanceOrder::BeforeRun => {
                self.advance(edit, now);
                action()
            }
            AdvanceOrder::AfterSuccess => {
                action()?;
                self.advance(edit, now);
                Ok(())
            }
        }
    }

    /// Run `action` if this schedule is due.
    ///
    /// Uninitialized and skewed schedules are reset to `now + interval`
    /// without running. A due run stages `now + interval` before or after
    /// `action` according to [`AdvanceOrder`].
    pub fn run_if_due<S, F>(
        &self,
        store: &S,
        edit: &mut CheckpointEdit,
        now: i64,
        action: F,
    ) -> Result<ActionOutcome, BackendError>
    where
        S: CheckpointStore + ?Sized,
        F: FnOnce() -> Result<(), BackendError>,
    {
        let next_due = store.next_due(self.key);
        match self.check(next_due, now) {
            DueState::Uninitialized => {
                debug!(action = %self.action, "Initializing next-due time");
                self.advance(edit, now);
                Ok(ActionOutcome::Initialized)
            }
            DueState::ClockSkewed => {
                debug!(action = %self.action, next_due, now, "Clock skew detected - resetting next-due time");
                self.advance(edit, now);
                Ok(ActionOutcome::ClockSkewReset)
            }
            DueState::NotDue => {
                debug!(action = %self.action, next_due, "Skipping - wait period has not yet elapsed");
                Ok(ActionOutcome::NotDue)
            }
            DueState::Due => {
                self.run_now(edit, now, action)?;
                Ok(ActionOutcome::Ran)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{MemoryCheckpointStore, NOT_SCHEDULED};

    const DAY: i64 = crate::config::MILLIS_PER_DAY;

    fn schedule() -> Schedule {
        Schedule::new(
            Action::Expiration,
            CheckpointKey::Expiration,
            ScheduleConfig::days(1, 3),
        )
    }

    #[test]
    fn test_check_branches() {
        let s = schedule();
        let now = 100 * DAY;

        assert_eq!(s.check(NOT_SCHEDULED, now), DueState::Uninitialized);
        assert_eq!(s.check(now + 3 * DAY + 1, now), DueState::ClockSkewed);
        assert_eq!(s.check(now + 3 * DAY, now), DueState::NotDue);
        assert_eq!(s.check(now + 1, now), DueState::NotDue);
        assert_eq!(s.check(now, now), DueState::Due);
        assert_eq!(s.check(0, now), DueState::Due);
    }

    #[test]
    fn test_saturates_near_bounds() {
        let s = schedule();
        assert_eq!(s.check(i64::MAX, i64::MAX - 1), DueState::NotDue);
        assert_eq!(s.next_due_from(i64::MAX - 1), i64::MAX);
    }

    #[test]
    fn test_run_if_due_only_advances_on_success() {
        let s = schedule();
        let now = 10 * DAY;
        let store = MemoryCheckpointStore::new().with_value(CheckpointKey::Expiration.as_str(), now);

        let mut edit = CheckpointEdit::new();
        let result = s.run_if_due(&store, &mut edit, now, || {
            Err(BackendError::Unavailable("gone".into()))
        });
        assert!(result.is_err());
        assert!(edit.is_empty());

        let mut edit = CheckpointEdit::new();
        let outcome = s.run_if_due(&store, &mut edit, now, || Ok(())).unwrap();
        assert_eq!(outcome, ActionOutcome::Ran);
        assert_eq!(edit.pending(CheckpointKey::Expiration.as_str()), Some(now + DAY));
    }

    #[test]
    fn test_advance_before_run_survives_failure() {
        let s = schedule().with_advance(AdvanceOrder::BeforeRun);
        let now = 10 * DAY;
        let store = MemoryCheckpointStore::new().with_value(CheckpointKey::Expiration.as_str(), now);

        let mut edit = CheckpointEdit::new();
        let result = s.run_if_due(&store, &mut edit, now, || {
            Err(BackendError::Unavailable("gone".into()))
        });
        assert!(result.is_err());
        assert_eq!(edit.pending(CheckpointKey::Expiration.as_str()), Some(now + DAY));
    }

    #[test]
    fn test_for_action_orders() {
        let config = PruneConfig::default();
        assert_eq!(
            Schedule::for_action(Action::PruneBySize, &config).advance,
            AdvanceOrder::AfterSuccess
        );
        assert_eq!(
            Schedule::for_action(Action::Expiration, &config).advance,
            AdvanceOrder::AfterSuccess
        );
        let cleanup = Schedule::for_action(Action::Cleanup, &config);
        assert_eq!(cleanup.advance, AdvanceOrder::BeforeRun);
        assert_eq!(cleanup.key, CheckpointKey::Cleanup);
        assert_eq!(cleanup.config, config.cleanup);
    }

    #[test]
    fn test_run_if_due_skips_without_calling() {
        let s = schedule();
        let now = 10 * DAY;
        let store = MemoryCheckpointStore::new().with_value(CheckpointKey::Expiration.as_str(), now + 1);

        let mut edit = CheckpointEdit::new();
        let outcome = s
            .run_if_due(&store, &mut edit, now, || panic!("must not run"))
            .unwrap();
        assert_eq!(outcome, ActionOutcome::NotDue);
        assert!(edit.is_empty());
    }
}
