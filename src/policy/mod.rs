//! Retention Policy
//!
//! Decides on every tick which maintenance actions are due and runs them.

mod schedule;
mod scheduler;

pub use schedule::{AdvanceOrder, DueState, Schedule};
pub use scheduler::PrunePolicy;

use std::fmt;

use crate::checkpoint::CheckpointKey;
use crate::error::PruneError;

/// The three maintenance actions, in the order a tick runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    PruneBySize,
    Expiration,
    Cleanup,
}

impl Action {
    pub const ALL: [Action; 3] = [Self::PruneBySize, Self::Expiration, Self::Cleanup];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PruneBySize => "prune-by-size",
            Self::Expiration => "expiration",
            Self::Cleanup => "cleanup",
        }
    }

    /// Key under which this action's next-due time is stored
    pub fn checkpoint_key(&self) -> CheckpointKey {
        match self {
            Self::PruneBySize => CheckpointKey::PruneBySize,
            Self::Expiration => CheckpointKey::Expiration,
            Self::Cleanup => CheckpointKey::Cleanup,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::PruneBySize => 0,
            Self::Expiration => 1,
            Self::Cleanup => 2,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one action during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action executed
    Ran,
    /// First sighting; next-due time established
    Initialized,
    /// Next-due time was implausibly far ahead and has been reset
    ClockSkewReset,
    /// Wait period has not elapsed
    NotDue,
    /// The backend reported an error
    Failed,
    /// An earlier action failed, so this one was never evaluated
    NotAttempted,
}

impl ActionOutcome {
    pub fn ran(&self) -> bool {
        matches!(self, Self::Ran)
    }
}

/// Summary of one tick
#[derive(Debug)]
pub struct TickReport {
    pub now: i64,
    outcomes: [ActionOutcome; 3],
    /// Action failure, if any. Later actions were not attempted.
    pub action_error: Option<PruneError>,
    pub commit_error: Option<PruneError>,
    /// Number of checkpoint writes committed
    pub committed: usize,
}

impl TickReport {
    pub(crate) fn new(now: i64) -> Self {
        Self {
            now,
            outcomes: [ActionOutcome::NotAttempted; 3],
            action_error: None,
            commit_error: None,
            committed: 0,
        }
    }

    pub(crate) fn set(&mut self, action: Action, outcome: ActionOutcome) {
        self.outcomes[action.index()] = outcome;
    }

    pub fn outcome(&self, action: Action) -> ActionOutcome {
        self.outcomes[action.index()]
    }

    pub fn ran(&self, action: Action) -> bool {
        self.outcome(action).ran()
    }

    /// True when neither an action nor the commit failed
    pub fn is_clean(&self) -> bool {
        self.action_error.is_none() && self.commit_error.is_none()
    }
}
