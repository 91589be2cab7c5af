//! Bounded in-process store for pending login attempts
//!
//! Each entry is keyed `oauth_session_<state>` and can be taken exactly once.
//! Expired entries are never returned and are dropped by `purge_expired`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use idgate_common::Clock;
use idgate_domain::constants::{AUTH_STATE_CAPACITY, AUTH_STATE_KEY_PREFIX, AUTH_STATE_TTL_SECS};
use idgate_domain::AuthState;
use parking_lot::RwLock;
use tracing::debug;

pub struct AuthStateStore {
    entries: RwLock<HashMap<String, AuthState>>,
    ttl: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl AuthStateStore {
    /// Store with the default five-minute lifetime and 10 000 entry bound.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_limits(clock, Duration::from_secs(AUTH_STATE_TTL_SECS), AUTH_STATE_CAPACITY)
    }

    pub fn with_limits(clock: Arc<dyn Clock>, ttl: Duration, capacity: usize) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl, capacity: capacity.max(1), clock }
    }

    /// Namespaced storage key for a state value.
    pub fn storage_key(state: &str) -> String {
        format!("{AUTH_STATE_KEY_PREFIX}{state}")
    }

    /// Lifetime of a pending login.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Record a pending login, evicting the oldest entry when full.
    pub fn put(&self, entry: AuthState) {
        let now = self.clock.now();
        let mut entries = self.entries.write();

        if entries.len() >= self.capacity {
            entries.retain(|_, e| !e.is_expired(now, self.ttl));
        }
        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                entries.remove(&key);
                debug!("Pending login store full, evicted oldest entry");
            }
        }

        entries.insert(Self::storage_key(&entry.state), entry);
    }

    /// Remove and return the entry for `state`.
    ///
    /// Returns `None` when absent or expired; either way the entry is gone
    /// afterwards, so a replay always fails.
    pub fn take(&self, state: &str) -> Option<AuthState> {
        let entry = self.entries.write().remove(&Self::storage_key(state))?;
        if entry.state != state || entry.is_expired(self.clock.now(), self.ttl) {
            return None;
        }
        Some(entry)
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now, self.ttl));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
