//! PRUNEKEEP CLI
//!
//! Inspect and reset the retention checkpoint file.

use clap::{Parser, Subcommand, ValueEnum};
use prunekeep::checkpoint::{CheckpointStore, FileCheckpointStore, NOT_SCHEDULED};
use prunekeep::error::CheckpointError;
use prunekeep::clock::{format_millis, now_millis};
use prunekeep::policy::{Action, DueState, Schedule};
use prunekeep::PruneConfig;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// PRUNEKEEP - Retention checkpoint tool
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Checkpoint file
    #[arg(short, long, default_value = "./data/prunekeep.ckpt")]
    checkpoint: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show when each maintenance action is next due
    Status,

    /// Forget next-due times so the next tick reinitializes them
    Reset {
        /// Only reset this action (default: all)
        #[arg(short, long, value_enum)]
        action: Option<ActionArg>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ActionArg {
    Size,
    Expiration,
    Cleanup,
}

impl From<ActionArg> for Action {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Size => Action::PruneBySize,
            ActionArg::Expiration => Action::Expiration,
            ActionArg::Cleanup => Action::Cleanup,
        }
    }
}

/// One line per action describing its next-due state at `now`
fn status_lines<S: CheckpointStore>(store: &S, config: &PruneConfig, now: i64) -> Vec<String> {
    Action::ALL
        .iter()
        .map(|&action| {
            let schedule = Schedule::for_action(action, config);
            let next_due = store.next_due(schedule.key);
            let state = match schedule.check(next_due, now) {
                DueState::Uninitialized => "unscheduled".to_string(),
                DueState::ClockSkewed => format!("skewed ({})", format_millis(next_due)),
                DueState::NotDue => format!("pending until {}", format_millis(next_due)),
                DueState::Due => format!("due since {}", format_millis(next_due)),
            };
            format!("{:<14} {}", action.as_str(), state)
        })
        .collect()
}

/// Write `NOT_SCHEDULED` for each action so the next tick reinitializes it
fn reset<S: CheckpointStore>(store: &S, actions: &[Action]) -> Result<usize, CheckpointError> {
    let writes: Vec<(String, i64)> = actions
        .iter()
        .map(|a| (a.checkpoint_key().as_str().to_string(), NOT_SCHEDULED))
        .collect();
    store.commit(&writes)?;
    Ok(writes.len())
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("prunekeep=info".parse()?))
        .init();

    let args = Args::parse();
    let store = FileCheckpointStore::open(&args.checkpoint)?;
    let config = PruneConfig::default();

    match args.command {
        Cmd::Status => {
            let now = now_millis();
            println!("now: {}", format_millis(now));
            for line in status_lines(&store, &config, now) {
                println!("{}", line);
            }
        }
        Cmd::Reset { action } => {
            let actions: Vec<Action> = match action {
                Some(a) => vec![a.into()],
                None => Action::ALL.to_vec(),
            };
            let count = reset(&store, &actions)?;
            info!(path = %store.path().display(), reset = count, "Reset next-due times");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prunekeep::checkpoint::CheckpointKey;
    use prunekeep::config::MILLIS_PER_DAY;
    use tempfile::tempdir;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_status_lines() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path().join("prune.ckpt")).unwrap();
        store
            .commit(&[
                (CheckpointKey::PruneBySize.as_str().to_string(), NOW - 1),
                (CheckpointKey::Expiration.as_str().to_string(), NOW + 1),
                (CheckpointKey::Cleanup.as_str().to_string(), NOW + 365 * MILLIS_PER_DAY),
            ])
            .unwrap();

        let lines = status_lines(&store, &PruneConfig::default(), NOW);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("prune-by-size"));
        assert!(lines[0].contains("due since"));
        assert!(lines[1].contains("pending until"));
        assert!(lines[2].contains("skewed"));
    }

    #[test]
    fn test_status_lines_unscheduled() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::open(dir.path().join("prune.ckpt")).unwrap();

        let lines = status_lines(&store, &PruneConfig::default(), NOW);
        assert!(lines.iter().all(|l| l.ends_with("unscheduled")));
    }

    #[test]
    fn test_reset_single_action() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prune.ckpt");
        let store = FileCheckpointStore::open(&path).unwrap();
        store
            .commit(&[
                (CheckpointKey::Expiration.as_str().to_string(), NOW),
                (CheckpointKey::Cleanup.as_str().to_string(), NOW),
            ])
            .unwrap();

        assert_eq!(reset(&store, &[Action::Cleanup]).unwrap(), 1);

        let reopened = FileCheckpointStore::open(&path).unwrap();
        assert_eq!(reopened.next_due(CheckpointKey::Cleanup), NOT_SCHEDULED);
        assert_eq!(reopened.next_due(CheckpointKey::Expiration), NOW);
    }

    #[test]
    fn test_reset_all_actions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prune.ckpt");
        let store = FileCheckpointStore::open(&path).unwrap();
        store
            .commit(&[(CheckpointKey::PruneBySize.as_str().to_string(), NOW)])
            .unwrap();

        assert_eq!(reset(&store, &Action::ALL).unwrap(), 3);

        let reopened = FileCheckpointStore::open(&path).unwrap();
        assert_eq!(reopened.entries().len(), 3);
        for action in Action::ALL {
            assert_eq!(reopened.next_due(action.checkpoint_key()), NOT_SCHEDULED);
        }
    }
}
