//! Error Types
//!
//! Backend faults and checkpoint faults are kept apart so a tick can tell
//! which stage failed.

use std::io;
use thiserror::Error;

use crate::policy::Action;

/// Failure reported by a maintenance backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend cannot be reached or has been torn down
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A specific backend operation failed
    #[error("{operation} failed: {message}")]
    Operation {
        operation: &'static str,
        message: String,
    },

    /// An event referenced an environment the backend does not know
    #[error("unknown environment {0}")]
    UnknownEnvironment(u64),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BackendError {
    pub fn operation(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Operation {
            operation,
            message: message.into(),
        }
    }
}

/// Failure reading or committing checkpoints
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint io: {0}")]
    Io(#[from] io::Error),

    #[error("invalid checkpoint magic")]
    BadMagic,

    #[error("unsupported checkpoint version: {0}")]
    UnsupportedVersion(u8),

    #[error("checkpoint file truncated")]
    Truncated,

    #[error("checkpoint key is not valid utf-8")]
    InvalidKey,
}

/// Failure observed during a tick
#[derive(Debug, Error)]
pub enum PruneError {
    #[error("{action} failed")]
    Action {
        action: Action,
        #[source]
        source: BackendError,
    },

    #[error("checkpoint commit failed")]
    Commit(#[source] CheckpointError),

    #[error("backend release failed")]
    Release(#[source] BackendError),
}

impl PruneError {
    pub fn action(action: Action, source: BackendError) -> Self {
        Self::Action { action, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_action_error_keeps_source() {
        let err = PruneError::action(
            Action::Expiration,
            BackendError::operation("delete_data_before", "disk full"),
        );
        assert_eq!(err.to_string(), "expiration failed");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("delete_data_before failed: disk full")
        );
    }
}
