//! Token cache implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use idgate_common::{Clock, EncryptionService};
use idgate_domain::{AuthError, CacheHealth, CacheStats, CachedToken, Result, TokenResponse};
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Per-key results of a batch operation.
///
/// Every requested key lands in exactly one of the two maps.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub succeeded: HashMap<String, T>,
    pub failed: HashMap<String, AuthError>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self { succeeded: HashMap::new(), failed: HashMap::new() }
    }
}

impl<T> BatchOutcome<T> {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, key: String, result: Result<T>) {
        match result {
            Ok(value) => {
                self.succeeded.insert(key, value);
            }
            Err(err) => {
                self.failed.insert(key, err);
            }
        }
    }
}

struct Entry {
    /// Token fields are sealed when `token.encrypted` is set
    token: CachedToken,
    /// Insertion sequence, breaks `cached_at` ties for eviction
    seq: u64,
}

#[derive(Default)]
struct Table {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

/// Concurrent token cache keyed by user id.
pub struct TokenCache {
    table: RwLock<Table>,
    cipher: RwLock<Option<EncryptionService>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl TokenCache {
    /// Cache holding at most `capacity` entries. Pass an encryption service to
    /// seal tokens at rest.
    pub fn new(capacity: usize, cipher: Option<EncryptionService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            cipher: RwLock::new(cipher),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            clock,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn encryption_enabled(&self) -> bool {
        self.cipher.read().is_some()
    }

    /// Insert or replace the entry for `token.user_id`.
    ///
    /// `cached_at` and `last_accessed_at` are stamped with the current time and
    /// the access count starts at zero. At capacity, the entry with the oldest
    /// `cached_at` is evicted first.
    pub fn store(&self, token: CachedToken) -> Result<()> {
        let now = self.clock.now();
        let mut token = self.seal(token)?;
        token.cached_at = now;
        token.last_accessed_at = now;
        token.access_count = 0;

        let user_id = token.user_id.clone();
        let mut table = self.table.write();
        if !table.entries.contains_key(&user_id) && table.entries.len() >= self.capacity {
            let oldest = table
                .entries
                .iter()
                .min_by_key(|(_, e)| (e.token.cached_at, e.seq))
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                table.entries.remove(&key);
                debug!(evicted = %key, "Token cache full, evicted oldest entry");
            }
        }

        let seq = table.next_seq;
        table.next_seq += 1;
        table.entries.insert(user_id, Entry { token, seq });
        Ok(())
    }

    /// Cache a token endpoint response for `user_id`.
    pub fn store_response(&self, user_id: &str, tokens: &TokenResponse) -> Result<()> {
        self.store(CachedToken::from_response(user_id, tokens, self.clock.now()))
    }

    /// Write a refreshed response: updates the existing entry (keeping its
    /// `cached_at`) or stores a new one.
    pub fn upsert_response(&self, user_id: &str, tokens: &TokenResponse) -> Result<()> {
        let token = CachedToken::from_response(user_id, tokens, self.clock.now());
        match self.update(token.clone()) {
            Err(AuthError::CacheMiss) => self.store(token),
            other => other,
        }
    }

    /// Fetch the entry for `user_id`.
    ///
    /// Expired entries are removed and reported as [`AuthError::CacheMiss`].
    /// An entry that fails to decrypt is removed and also reads as a miss.
    pub fn get(&self, user_id: &str) -> Result<CachedToken> {
        let now = self.clock.now();
        let (sealed, seq) = {
            let mut table = self.table.write();
            let Some(entry) = table.entries.get_mut(user_id) else {
                return Err(self.miss());
            };
            if entry.token.is_expired(now) {
                table.entries.remove(user_id);
                debug!(user_id = %user_id, "Cached token expired");
                return Err(self.miss());
            }
            entry.token.access_count += 1;
            entry.token.last_accessed_at = now;
            (entry.token.clone(), entry.seq)
        };

        match self.open(sealed) {
            Ok(token) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(token)
            }
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "Dropping cached token that failed to decrypt");
                let mut table = self.table.write();
                if table.entries.get(user_id).is_some_and(|e| e.seq == seq) {
                    table.entries.remove(user_id);
                }
                Err(self.miss())
            }
        }
    }

    /// Replace the token fields of an existing entry, keeping its `cached_at`
    /// and access count.
    pub fn update(&self, token: CachedToken) -> Result<()> {
        let now = self.clock.now();
        let mut sealed = self.seal(token)?;

        let mut table = self.table.write();
        let entry = table.entries.get_mut(&sealed.user_id).ok_or(AuthError::CacheMiss)?;
        if entry.token.is_expired(now) {
            let user_id = sealed.user_id;
            table.entries.remove(&user_id);
            return Err(AuthError::CacheMiss);
        }
        sealed.cached_at = entry.token.cached_at;
        sealed.access_count = entry.token.access_count;
        sealed.last_accessed_at = now;
        entry.token = sealed;
        Ok(())
    }

    /// Remove the entry for `user_id`. Returns whether one existed.
    pub fn delete(&self, user_id: &str) -> bool {
        self.table.write().entries.remove(user_id).is_some()
    }

    pub fn store_many(&self, tokens: Vec<CachedToken>) -> BatchOutcome<()> {
        let mut outcome = BatchOutcome::default();
        for token in tokens {
            let key = token.user_id.clone();
            outcome.record(key, self.store(token));
        }
        outcome
    }

    pub fn get_many<I, S>(&self, user_ids: I) -> BatchOutcome<CachedToken>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcome = BatchOutcome::default();
        for user_id in user_ids {
            let user_id = user_id.as_ref();
            outcome.record(user_id.to_string(), self.get(user_id));
        }
        outcome
    }

    /// Delete several entries; each key maps to whether it existed.
    pub fn delete_many<I, S>(&self, user_ids: I) -> BatchOutcome<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcome = BatchOutcome::default();
        for user_id in user_ids {
            let user_id = user_id.as_ref();
            outcome.record(user_id.to_string(), Ok(self.delete(user_id)));
        }
        outcome
    }

    /// Present and unexpired. Does not touch statistics.
    pub fn is_valid(&self, user_id: &str) -> bool {
        let now = self.clock.now();
        self.table.read().entries.get(user_id).is_some_and(|e| !e.token.is_expired(now))
    }

    /// Present and expired. An absent entry is not "expired".
    pub fn is_expired(&self, user_id: &str) -> bool {
        let now = self.clock.now();
        self.table.read().entries.get(user_id).is_some_and(|e| e.token.is_expired(now))
    }

    /// Remaining lifetime, `None` when absent or expired.
    pub fn ttl(&self, user_id: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.table.read().entries.get(user_id).and_then(|e| e.token.remaining(now))
    }

    /// Remove expired entries, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut table = self.table.write();
        let before = table.entries.len();
        table.entries.retain(|_, e| !e.token.is_expired(now));
        let removed = before - table.entries.len();
        if removed > 0 {
            debug!(removed, "Removed expired cached tokens");
        }
        removed
    }

    /// Drop every entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut table = self.table.write();
        let removed = table.entries.len();
        table.entries.clear();
        removed
    }

    pub fn reset_stats(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().entries.is_empty()
    }

    /// Counters and entry breakdown computed from the current table.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let table = self.table.read();
        let expired = table.entries.values().filter(|e| e.token.is_expired(now)).count();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            total_entries: table.entries.len(),
            active_entries: table.entries.len() - expired,
            expired_entries: expired,
            oldest_cached_at: table.entries.values().map(|e| e.token.cached_at).min(),
            newest_cached_at: table.entries.values().map(|e| e.token.cached_at).max(),
        }
    }

    pub fn health(&self) -> CacheHealth {
        let stats = self.stats();
        CacheHealth {
            hit_rate: stats.hit_rate(),
            utilization: stats.total_entries as f64 / self.capacity as f64,
            capacity: self.capacity,
            encryption_enabled: self.encryption_enabled(),
            stats,
        }
    }

    /// Switch to a new encryption key. Entries sealed under the old key read
    /// as misses from now on.
    pub fn rotate_encryption_key(&self, key: Vec<u8>) -> Result<()> {
        let mut cipher = self.cipher.write();
        match cipher.as_mut() {
            Some(service) => service.rotate_key(key)?,
            None => *cipher = Some(EncryptionService::new(key)?),
        }
        warn!("Token cache encryption key rotated");
        Ok(())
    }

    fn miss(&self) -> AuthError {
        self.misses.fetch_add(1, Ordering::Relaxed);
        AuthError::CacheMiss
    }

    fn seal(&self, mut token: CachedToken) -> Result<CachedToken> {
        let cipher = self.cipher.read();
        let Some(service) = cipher.as_ref() else {
            token.encrypted = false;
            return Ok(token);
        };

        let seal = |plain: &str| service.encrypt_to_string(plain.as_bytes());
        token.access_token = seal(token.access_token.as_str())?;
        token.refresh_token = token.refresh_token.as_deref().map(seal).transpose()?;
        token.id_token = token.id_token.as_deref().map(seal).transpose()?;
        token.encrypted = true;
        Ok(token)
    }

    fn open(&self, mut token: CachedToken) -> Result<CachedToken> {
        if !token.encrypted {
            return Ok(token);
        }
        let cipher = self.cipher.read();
        let service = cipher
            .as_ref()
            .ok_or_else(|| AuthError::Internal("entry is sealed but no key is loaded".into()))?;

        let open = |sealed: &str| -> Result<String> {
            let bytes = service.decrypt_from_string(sealed)?;
            String::from_utf8(bytes).map_err(|e| AuthError::Internal(e.to_string()))
        };
        token.access_token = open(token.access_token.as_str())?;
        token.refresh_token = token.refresh_token.as_deref().map(open).transpose()?;
        token.id_token = token.id_token.as_deref().map(open).transpose()?;
        Ok(token)
    }
}
