//! Concurrent in-memory session registry
//!
//! Sessions are indexed by id and by user. Expiry is detected lazily on read
//! and eagerly by `sweep_expired`; both paths take the same write lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use idgate_common::Clock;
use idgate_domain::constants::SESSION_ID_BYTES;
use idgate_domain::{AuthError, Result, Session, SessionConfig, SessionStats, TokenResponse};
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info};

#[derive(Default)]
struct SessionTable {
    sessions: HashMap<String, Session>,
    /// Session ids per user, in creation order
    by_user: HashMap<String, Vec<String>>,
}

impl SessionTable {
    fn insert(&mut self, session: Session) {
        self.by_user.entry(session.user_id.clone()).or_default().push(session.id.clone());
        self.sessions.insert(session.id.clone(), session);
    }

    fn remove(&mut self, session_id: &str) -> Option<Session> {
        let session = self.sessions.remove(session_id)?;
        if let Some(ids) = self.by_user.get_mut(&session.user_id) {
            ids.retain(|id| id != session_id);
            if ids.is_empty() {
                self.by_user.remove(&session.user_id);
            }
        }
        Some(session)
    }

    fn user_sessions<'a>(&'a self, user_id: &str) -> impl Iterator<Item = &'a Session> + 'a {
        self.by_user
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.sessions.get(id))
    }
}

/// Session store with per-user limits and a hard lifetime ceiling.
pub struct SessionStore {
    table: RwLock<SessionTable>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self { table: RwLock::new(SessionTable::default()), config, clock }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a session for `user_id` from a token response.
    ///
    /// When the user already holds the maximum number of active sessions, the
    /// oldest active one is evicted first.
    pub fn create(
        &self,
        user_id: &str,
        tokens: &TokenResponse,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Session {
        let now = self.clock.now();
        let session = Session {
            id: generate_session_id(),
            user_id: user_id.to_string(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            id_token: tokens.id_token.clone(),
            token_type: tokens.token_type.clone(),
            expires_at: self.initial_expiry(now, tokens.expires_in),
            created_at: now,
            last_accessed_at: now,
            is_active: true,
            metadata,
        };

        let mut table = self.table.write();
        let active: Vec<(DateTime<Utc>, String)> = table
            .user_sessions(user_id)
            .filter(|s| s.is_active && !s.is_expired(now))
            .map(|s| (s.created_at, s.id.clone()))
            .collect();

        if active.len() >= self.config.max_sessions_per_user {
            // min_by_key keeps the first of equal keys, i.e. the earliest inserted
            if let Some((_, oldest)) = active.iter().min_by_key(|(created_at, _)| *created_at) {
                table.remove(oldest);
                info!(
                    user_id = %user_id,
                    evicted = %Session::short_id(oldest),
                    "Session limit reached, evicted oldest session"
                );
            }
        }

        table.insert(session.clone());
        debug!(user_id = %user_id, session = %Session::short_id(&session.id), "Session created");
        session
    }

    /// Read-only lookup.
    pub fn get(&self, session_id: &str) -> Result<Session> {
        let now = self.clock.now();
        {
            let table = self.table.read();
            let session = table.sessions.get(session_id).ok_or(AuthError::SessionNotFound)?;
            if !session.is_expired(now) {
                return if session.is_active {
                    Ok(session.clone())
                } else {
                    Err(AuthError::SessionInvalid)
                };
            }
        }
        self.expire(session_id, now)
    }

    /// Lookup that also records the access.
    pub fn validate(&self, session_id: &str) -> Result<Session> {
        let now = self.clock.now();
        let mut table = self.table.write();
        let session = table.sessions.get_mut(session_id).ok_or(AuthError::SessionNotFound)?;
        if session.is_expired(now) {
            table.remove(session_id);
            return Err(AuthError::SessionExpired);
        }
        if !session.is_active {
            return Err(AuthError::SessionInvalid);
        }
        session.last_accessed_at = now;
        Ok(session.clone())
    }

    /// Push `expires_at` out by `duration`, never past `created_at + max_ttl`.
    pub fn extend(&self, session_id: &str, duration: Duration) -> Result<Session> {
        let now = self.clock.now();
        let mut table = self.table.write();
        let session = table.sessions.get_mut(session_id).ok_or(AuthError::SessionNotFound)?;
        if session.is_expired(now) {
            table.remove(session_id);
            return Err(AuthError::SessionExpired);
        }
        if !session.is_active {
            return Err(AuthError::SessionInvalid);
        }

        let ceiling = add_duration(session.created_at, self.config.max_ttl);
        session.expires_at = add_duration(session.expires_at, duration).min(ceiling);
        Ok(session.clone())
    }

    /// Replace the tokens after a refresh; expiry is recomputed from now under
    /// the same lifetime ceiling.
    pub fn update_tokens(&self, session_id: &str, tokens: &TokenResponse) -> Result<Session> {
        let now = self.clock.now();
        let mut table = self.table.write();
        let session = table.sessions.get_mut(session_id).ok_or(AuthError::SessionNotFound)?;
        if !session.is_active {
            return Err(AuthError::SessionInvalid);
        }

        session.access_token = tokens.access_token.clone();
        if let Some(refresh) = &tokens.refresh_token {
            session.refresh_token = Some(refresh.clone());
        }
        if let Some(id_token) = &tokens.id_token {
            session.id_token = Some(id_token.clone());
        }
        session.token_type = tokens.token_type.clone();

        let ceiling = add_duration(session.created_at, self.config.max_ttl);
        session.expires_at = self.initial_expiry(now, tokens.expires_in).min(ceiling);
        session.last_accessed_at = now;
        Ok(session.clone())
    }

    /// Mark a session inactive without removing it.
    pub fn deactivate(&self, session_id: &str) -> Result<()> {
        let mut table = self.table.write();
        let session = table.sessions.get_mut(session_id).ok_or(AuthError::SessionNotFound)?;
        session.is_active = false;
        Ok(())
    }

    /// Remove a session. Returns whether it existed; absence is not an error.
    pub fn delete(&self, session_id: &str) -> bool {
        let removed = self.table.write().remove(session_id).is_some();
        if removed {
            debug!(session = %Session::short_id(session_id), "Session deleted");
        }
        removed
    }

    /// Remove every session of a user, returning how many were removed.
    pub fn delete_all_for_user(&self, user_id: &str) -> usize {
        let mut table = self.table.write();
        let ids = table.by_user.remove(user_id).unwrap_or_default();
        let removed = ids.iter().filter(|id| table.sessions.remove(id.as_str()).is_some()).count();
        if removed > 0 {
            info!(user_id = %user_id, removed, "Deleted all sessions for user");
        }
        removed
    }

    /// Remove expired and inactive sessions.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut table = self.table.write();
        let doomed: Vec<String> = table
            .sessions
            .values()
            .filter(|s| s.is_expired(now) || !s.is_active)
            .map(|s| s.id.clone())
            .collect();
        for id in &doomed {
            table.remove(id);
        }
        if !doomed.is_empty() {
            debug!(removed = doomed.len(), "Swept expired sessions");
        }
        doomed.len()
    }

    /// Active, unexpired sessions of a user, newest first.
    pub fn list_for_user(&self, user_id: &str) -> Vec<Session> {
        let now = self.clock.now();
        let table = self.table.read();
        let mut sessions: Vec<Session> = table
            .user_sessions(user_id)
            .filter(|s| s.is_active && !s.is_expired(now))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    pub fn active_count_for_user(&self, user_id: &str) -> usize {
        let now = self.clock.now();
        self.table.read().user_sessions(user_id).filter(|s| s.is_active && !s.is_expired(now)).count()
    }

    /// Total sessions held, including ones not yet swept.
    pub fn count(&self) -> usize {
        self.table.read().sessions.len()
    }

    pub fn stats(&self) -> SessionStats {
        let now = self.clock.now();
        let table = self.table.read();
        let expired = table.sessions.values().filter(|s| s.is_expired(now)).count();
        let active =
            table.sessions.values().filter(|s| s.is_active && !s.is_expired(now)).count();
        SessionStats {
            total: table.sessions.len(),
            active,
            expired,
            users: table.by_user.len(),
        }
    }

    fn expire(&self, session_id: &str, now: DateTime<Utc>) -> Result<Session> {
        let mut table = self.table.write();
        match table.sessions.get(session_id) {
            None => Err(AuthError::SessionNotFound),
            Some(session) if session.is_expired(now) => {
                table.remove(session_id);
                Err(AuthError::SessionExpired)
            }
            // Extended between the read and write locks
            Some(session) if session.is_active => Ok(session.clone()),
            Some(_) => Err(AuthError::SessionInvalid),
        }
    }

    /// `min(now + default_ttl, now + expires_in)` capped by `now + max_ttl`.
    /// A non-positive `expires_in` leaves the default TTL in force.
    fn initial_expiry(&self, now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
        let mut ttl = self.config.default_ttl;
        if expires_in > 0 {
            ttl = ttl.min(Duration::from_secs(expires_in.unsigned_abs()));
        }
        add_duration(now, ttl.min(self.config.max_ttl))
    }
}

fn add_duration(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    //! Unit tests for session::store.
    use idgate_common::MockClock;

    use super::*;

    fn tokens(expires_in: i64) -> TokenResponse {
        TokenResponse {
            access_token: "at".into(),
            id_token: Some("id".into()),
            refresh_token: Some("rt".into()),
            token_type: "Bearer".into(),
            scope: None,
            expires_in,
            refresh_token_expires_in: None,
        }
    }

    fn store() -> (SessionStore, MockClock) {
        let clock = MockClock::new();
        (SessionStore::new(SessionConfig::default(), Arc::new(clock.clone())), clock)
    }

    /// Validates the initial expiry computation.
    ///
    /// Assertions:
    /// - A short token lifetime wins over the default TTL.
    /// - A zero lifetime leaves the default TTL.
    #[test]
    fn expiry_is_min_of_default_and_token_lifetime() {
        let (store, clock) = store();
        let now = clock.now();

        let short = store.create("u1", &tokens(600), HashMap::new());
        assert_eq!(short.expires_at, now + chrono::Duration::seconds(600));

        let unspecified = store.create("u1", &tokens(0), HashMap::new());
        assert_eq!(unspecified.expires_at, now + chrono::Duration::hours(24));

        let long = store.create("u1", &tokens(90 * 24 * 3600), HashMap::new());
        assert_eq!(long.expires_at, now + chrono::Duration::hours(24));
    }

    #[test]
    fn session_ids_are_256_bit_and_unique() {
        let (store, _) = store();
        let a = store.create("u1", &tokens(3600), HashMap::new());
        let b = store.create("u1", &tokens(3600), HashMap::new());
        assert_eq!(URL_SAFE_NO_PAD.decode(&a.id).unwrap().len(), 32);
        assert_ne!(a.id, b.id);
    }

    /// Validates `get` versus `validate` touch semantics.
    #[test]
    fn validate_touches_but_get_does_not() {
        let (store, clock) = store();
        let session = store.create("u1", &tokens(3600), HashMap::new());
        clock.advance_secs(10);

        assert_eq!(store.get(&session.id).unwrap().last_accessed_at, session.last_accessed_at);
        let touched = store.validate(&session.id).unwrap();
        assert_eq!(touched.last_accessed_at, clock.now());
        assert_eq!(store.get(&session.id).unwrap().last_accessed_at, clock.now());
    }

    /// Validates lazy expiry on read.
    ///
    /// Assertions:
    /// - At the exact expiry instant the session is still returned.
    /// - One second later `get` reports `SessionExpired` and removes it.
    #[test]
    fn get_expires_lazily() {
        let (store, clock) = store();
        let session = store.create("u1", &tokens(60), HashMap::new());

        clock.advance_secs(60);
        assert!(store.get(&session.id).is_ok());

        clock.advance_secs(1);
        assert_eq!(store.get(&session.id).unwrap_err(), AuthError::SessionExpired);
        assert_eq!(store.get(&session.id).unwrap_err(), AuthError::SessionNotFound);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn inactive_session_is_invalid() {
        let (store, _) = store();
        let session = store.create("u1", &tokens(3600), HashMap::new());
        store.deactivate(&session.id).unwrap();

        assert_eq!(store.get(&session.id).unwrap_err(), AuthError::SessionInvalid);
        assert_eq!(store.validate(&session.id).unwrap_err(), AuthError::SessionInvalid);
        assert_eq!(store.sweep_expired(), 1);
    }

    /// Validates the lifetime ceiling on `extend`.
    #[test]
    fn extend_is_clamped_to_max_ttl() {
        let (store, _) = store();
        let session = store.create("u1", &tokens(3600), HashMap::new());

        let extended = store.extend(&session.id, Duration::from_secs(1800)).unwrap();
        assert_eq!(extended.expires_at, session.expires_at + chrono::Duration::seconds(1800));

        let clamped = store.extend(&session.id, Duration::from_secs(30 * 24 * 3600)).unwrap();
        assert_eq!(clamped.expires_at, session.created_at + chrono::Duration::days(7));
    }

    #[test]
    fn delete_is_idempotent() {
        let (store, _) = store();
        let session = store.create("u1", &tokens(3600), HashMap::new());

        assert!(store.delete(&session.id));
        assert!(!store.delete(&session.id));
        assert_eq!(store.get(&session.id).unwrap_err(), AuthError::SessionNotFound);
    }

    #[test]
    fn update_tokens_keeps_refresh_token_when_absent() {
        let (store, clock) = store();
        let session = store.create("u1", &tokens(600), HashMap::new());
        clock.advance_secs(300);

        let mut refreshed = tokens(600);
        refreshed.access_token = "at-2".into();
        refreshed.refresh_token = None;
        let updated = store.update_tokens(&session.id, &refreshed).unwrap();

        assert_eq!(updated.access_token, "at-2");
        assert_eq!(updated.refresh_token.as_deref(), Some("rt"));
        assert_eq!(updated.expires_at, clock.now() + chrono::Duration::seconds(600));
    }

    #[test]
    fn stats_count_users_and_expired() {
        let (store, clock) = store();
        store.create("u1", &tokens(60), HashMap::new());
        store.create("u2", &tokens(3600), HashMap::new());
        clock.advance_secs(120);

        let stats = store.stats();
        assert_eq!(stats, SessionStats { total: 2, active: 1, expired: 1, users: 2 });
        assert_eq!(store.sweep_expired(), 1);
        assert_eq!(store.stats().users, 1);
    }
}
