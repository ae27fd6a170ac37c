//! In-Memory Maintenance Backend
//!
//! Reference backend holding environments and events in process memory.
//! Environments are evicted least recently used first and take their events
//! with them; deletions leave fragmentation that only `cleanup` reclaims.

use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::MaintenanceBackend;
use crate::error::BackendError;

/// Memory backend configuration
#[derive(Debug, Clone)]
pub struct MemoryBackendConfig {
    /// Fraction of deleted rows (over live + deleted) above which cleanup is
    /// requested early
    pub cleanup_threshold: f64,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self {
            cleanup_threshold: 0.1,
        }
    }
}

impl MemoryBackendConfig {
    pub fn with_cleanup_threshold(mut self, threshold: f64) -> Self {
        self.cleanup_threshold = threshold;
        self
    }
}

#[derive(Debug, Clone)]
struct Environment {
    last_used_ms: i64,
}

#[derive(Debug, Clone)]
struct Event {
    environment: u64,
    recorded_ms: i64,
}

#[derive(Debug, Default)]
struct Inner {
    environments: HashMap<u64, Environment>,
    events: Vec<Event>,
    next_id: u64,
    /// Rows deleted since the last cleanup
    deleted: u64,
}

impl Inner {
    fn remove_events_where(&mut self, mut doomed: impl FnMut(&Event) -> bool) -> u64 {
        let before = self.events.len();
        self.events.retain(|e| !doomed(e));
        let removed = (before - self.events.len()) as u64;
        self.deleted += removed;
        removed
    }

    fn live_rows(&self) -> u64 {
        (self.environments.len() + self.events.len()) as u64
    }
}

/// Thread-safe in-memory telemetry store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    config: MemoryBackendConfig,
    releases: AtomicU64,
    cleanups: AtomicU64,
}

impl MemoryBackend {
    pub fn new(config: MemoryBackendConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            config,
            releases: AtomicU64::new(0),
            cleanups: AtomicU64::new(0),
        }
    }

    /// Register an environment, returning its id
    pub fn add_environment(&self, last_used_ms: i64) -> u64 {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.environments.insert(id, Environment { last_used_ms });
        id
    }

    /// Mark an environment as used at `now_ms`
    pub fn touch_environment(&self, id: u64, now_ms: i64) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        let env = inner
            .environments
            .get_mut(&id)
            .ok_or(BackendError::UnknownEnvironment(id))?;
        env.last_used_ms = env.last_used_ms.max(now_ms);
        Ok(())
    }

    /// Record an event against an existing environment
    pub fn record_event(&self, environment: u64, recorded_ms: i64) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        if !inner.environments.contains_key(&environment) {
            return Err(BackendError::UnknownEnvironment(environment));
        }
        inner.events.push(Event {
            environment,
            recorded_ms,
        });
        Ok(())
    }

    pub fn has_environment(&self, id: u64) -> bool {
        self.inner.lock().environments.contains_key(&id)
    }

    /// Timestamp of the oldest stored event
    pub fn oldest_event_ms(&self) -> Option<i64> {
        self.inner.lock().events.iter().map(|e| e.recorded_ms).min()
    }

    /// Rows deleted since the last cleanup
    pub fn fragmented_rows(&self) -> u64 {
        self.inner.lock().deleted
    }

    /// Number of times the backend has been released
    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::Relaxed)
    }

    /// Number of cleanups performed
    pub fn cleanup_count(&self) -> u64 {
        self.cleanups.load(Ordering::Relaxed)
    }
}

impl MaintenanceBackend for MemoryBackend {
    fn environment_count(&self) -> Result<u64, BackendError> {
        Ok(self.inner.lock().environments.len() as u64)
    }

    fn prune_environments(&self, count: u64) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();

        let mut by_age: Vec<(u64, i64)> = inner
            .environments
            .iter()
            .map(|(id, env)| (*id, env.last_used_ms))
            .collect();
        by_age.sort_by_key(|(id, last_used)| (*last_used, *id));

        let doomed: Vec<u64> = by_age
            .into_iter()
            .take(count as usize)
            .map(|(id, _)| id)
            .collect();
        for id in &doomed {
            inner.environments.remove(id);
        }
        inner.deleted += doomed.len() as u64;

        // Cascade
        let cascaded = inner.remove_events_where(|e| doomed.contains(&e.environment));
        debug!(
            environments = doomed.len(),
            events = cascaded,
            "Pruned environments"
        );
        Ok(())
    }

    fn event_count(&self) -> Result<u64, BackendError> {
        Ok(self.inner.lock().events.len() as u64)
    }

    fn prune_events(&self, count: u64) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        let take = (count as usize).min(inner.events.len());
        if take == 0 {
            return Ok(());
        }

        // Stable sort keeps insertion order among equal timestamps
        inner.events.sort_by_key(|e| e.recorded_ms);
        inner.events.drain(..take);
        inner.deleted += take as u64;
        debug!(events = take, "Pruned events");
        Ok(())
    }

    fn delete_data_before(&self, cutoff_ms: i64) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        let events = inner.remove_events_where(|e| e.recorded_ms < cutoff_ms);

        let Inner {
            environments,
            events: remaining,
            ..
        } = &mut *inner;
        let before = environments.len();
        environments.retain(|id, env| {
            env.last_used_ms >= cutoff_ms || remaining.iter().any(|e| e.environment == *id)
        });
        let stale = (before - environments.len()) as u64;
        inner.deleted += stale;

        debug!(cutoff_ms, events, environments = stale, "Deleted expired data");
        Ok(())
    }

    fn should_cleanup_early(&self) -> Result<bool, BackendError> {
        let inner = self.inner.lock();
        if inner.deleted == 0 {
            return Ok(false);
        }
        let total = inner.live_rows() + inner.deleted;
        Ok(inner.deleted as f64 / total as f64 > self.config.cleanup_threshold)
    }

    fn cleanup(&self) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        inner.deleted = 0;
        inner.events.shrink_to_fit();
        inner.environments.shrink_to_fit();
        self.cleanups.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close(&self) -> Result<(), BackendError> {
        self.releases.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MemoryBackend {
        MemoryBackend::new(MemoryBackendConfig::default())
    }

    #[test]
    fn test_prune_environments_lru_cascade() {
        let backend = backend();
        let a = backend.add_environment(100);
        let b = backend.add_environment(200);
        let c = backend.add_environment(300);
        backend.record_event(a, 110).unwrap();
        backend.record_event(a, 120).unwrap();
        backend.record_event(b, 210).unwrap();
        backend.record_event(c, 310).unwrap();

        // 'a' becomes most recent
        backend.touch_environment(a, 400).unwrap();
        backend.prune_environments(1).unwrap();

        assert!(backend.has_environment(a));
        assert!(!backend.has_environment(b));
        assert!(backend.has_environment(c));
        assert_eq!(backend.event_count().unwrap(), 3);
        assert_eq!(backend.fragmented_rows(), 2);
    }

    #[test]
    fn test_prune_events_oldest_first() {
        let backend = backend();
        let env = backend.add_environment(0);
        for at in [50, 10, 40, 20, 30] {
            backend.record_event(env, at).unwrap();
        }

        backend.prune_events(2).unwrap();
        assert_eq!(backend.event_count().unwrap(), 3);
        assert_eq!(backend.oldest_event_ms(), Some(30));

        // More than available is not an error
        backend.prune_events(100).unwrap();
        assert_eq!(backend.event_count().unwrap(), 0);
    }

    #[test]
    fn test_delete_data_before() {
        let backend = backend();
        let old = backend.add_environment(100);
        let mixed = backend.add_environment(100);
        let fresh = backend.add_environment(900);
        backend.record_event(old, 150).unwrap();
        backend.record_event(mixed, 150).unwrap();
        backend.record_event(mixed, 800).unwrap();
        backend.record_event(fresh, 950).unwrap();

        backend.delete_data_before(500).unwrap();

        assert!(!backend.has_environment(old));
        assert!(backend.has_environment(mixed));
        assert!(backend.has_environment(fresh));
        assert_eq!(backend.event_count().unwrap(), 2);
        assert_eq!(backend.oldest_event_ms(), Some(800));
    }

    #[test]
    fn test_fragmentation_requests_cleanup() {
        let backend = MemoryBackend::new(MemoryBackendConfig::default().with_cleanup_threshold(0.25));
        let env = backend.add_environment(0);
        for at in 0..9 {
            backend.record_event(env, at).unwrap();
        }
        assert!(!backend.should_cleanup_early().unwrap());

        // 2 deleted of 10 rows
        backend.prune_events(2).unwrap();
        assert!(!backend.should_cleanup_early().unwrap());

        // 4 deleted of 10 rows
        backend.prune_events(2).unwrap();
        assert!(backend.should_cleanup_early().unwrap());

        backend.cleanup().unwrap();
        assert!(!backend.should_cleanup_early().unwrap());
        assert_eq!(backend.cleanup_count(), 1);
    }

    #[test]
    fn test_unknown_environment() {
        let backend = backend();
        let err = backend.record_event(7, 0).unwrap_err();
        assert!(matches!(err, BackendError::UnknownEnvironment(7)));
    }
}
