//! Expiring capability cache keyed by scope

use crate::clock::Clock;
use crate::tracker::CapabilitySet;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Cached {
    capabilities: CapabilitySet,
    fetched_at: Instant,
}

/// Capability sets per scope, expiring after a fixed timeout
#[derive(Debug)]
pub struct PermissionCache {
    entries: RwLock<HashMap<String, Cached>>,
    timeout: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl PermissionCache {
    /// Create an empty cache
    pub fn new(timeout: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            timeout,
            max_entries: max_entries.max(1),
            clock,
        }
    }

    /// Fresh capabilities for `scope`
    pub fn get(&self, scope: &str) -> Option<CapabilitySet> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(scope)
            .filter(|cached| now.saturating_duration_since(cached.fetched_at) < self.timeout)
            .map(|cached| cached.capabilities.clone())
    }

    /// Store capabilities for `scope`, evicting the oldest entry when full
    pub fn insert(&self, scope: &str, capabilities: CapabilitySet) {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(scope) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, cached)| cached.fetched_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            scope.to_string(),
            Cached {
                capabilities,
                fetched_at: now,
            },
        );
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, cached| now.saturating_duration_since(cached.fetched_at) < self.timeout);
        before - entries.len()
    }

    /// Entries held, fresh or not
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
