//! Retention Configuration

/// Milliseconds per day
pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Cadence of one scheduled maintenance action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Minimum time between two runs of the action
    pub interval_ms: i64,

    /// How far in the future a stored next-due time may sit before it is
    /// treated as the product of a clock rollback
    pub skew_limit_ms: i64,
}

impl ScheduleConfig {
    pub const fn new(interval_ms: i64, skew_limit_ms: i64) -> Self {
        Self {
            interval_ms,
            skew_limit_ms,
        }
    }

    pub const fn days(interval_days: i64, skew_limit_days: i64) -> Self {
        Self::new(
            interval_days * MILLIS_PER_DAY,
            skew_limit_days * MILLIS_PER_DAY,
        )
    }
}

/// Retention scheduler configuration
#[derive(Debug, Clone)]
pub struct PruneConfig {
    /// Prune-by-size cadence
    pub prune_by_size: ScheduleConfig,

    /// Expiration cadence
    pub expiration: ScheduleConfig,

    /// Scheduled cleanup cadence
    pub cleanup: ScheduleConfig,

    /// Environment ceiling that triggers pruning
    pub max_environments: u64,

    /// Environment count left after a prune
    pub environments_after_prune: u64,

    /// Event ceiling that triggers pruning
    pub max_events: u64,

    /// Event count left after a prune
    pub events_after_prune: u64,

    /// Age after which any record is expired
    pub event_retention_ms: i64,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            prune_by_size: ScheduleConfig::days(1, 7),
            expiration: ScheduleConfig::days(1, 7),
            cleanup: ScheduleConfig::days(30, 60),
            max_environments: 50,
            environments_after_prune: 35,
            max_events: 10_000,
            events_after_prune: 8_000,
            event_retention_ms: 180 * MILLIS_PER_DAY,
        }
    }
}

impl PruneConfig {
    pub fn with_prune_by_size(mut self, schedule: ScheduleConfig) -> Self {
        self.prune_by_size = schedule;
        self
    }

    pub fn with_expiration(mut self, schedule: ScheduleConfig) -> Self {
        self.expiration = schedule;
        self
    }

    pub fn with_cleanup(mut self, schedule: ScheduleConfig) -> Self {
        self.cleanup = schedule;
        self
    }

    /// Set the environment ceiling and the post-prune target
    pub fn with_environment_limits(mut self, max: u64, after_prune: u64) -> Self {
        self.max_environments = max;
        self.environments_after_prune = after_prune;
        self
    }

    /// Set the event ceiling and the post-prune target
    pub fn with_event_limits(mut self, max: u64, after_prune: u64) -> Self {
        self.max_events = max;
        self.events_after_prune = after_prune;
        self
    }

    pub fn with_event_retention(mut self, retention_ms: i64) -> Self {
        self.event_retention_ms = retention_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_targets_below_ceilings() {
        let config = PruneConfig::default();
        assert!(config.environments_after_prune < config.max_environments);
        assert!(config.events_after_prune < config.max_events);
        assert!(config.cleanup.interval_ms > config.expiration.interval_ms);
    }

    #[test]
    fn test_builders() {
        let config = PruneConfig::default()
            .with_prune_by_size(ScheduleConfig::days(7, 14))
            .with_environment_limits(1000, 800)
            .with_event_retention(MILLIS_PER_DAY);

        assert_eq!(config.prune_by_size.interval_ms, 7 * MILLIS_PER_DAY);
        assert_eq!(config.prune_by_size.skew_limit_ms, 14 * MILLIS_PER_DAY);
        assert_eq!(config.max_environments, 1000);
        assert_eq!(config.environments_after_prune, 800);
        assert_eq!(config.event_retention_ms, MILLIS_PER_DAY);
    }
}
