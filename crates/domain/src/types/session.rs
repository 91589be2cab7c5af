//! Server-side sessions

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated session owned by the session store.
///
/// `metadata` carries display data captured at login (`username`, `roles`).
#[derive(Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub is_active: bool,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &Self::short_id(&self.id))
            .field("user_id", &self.user_id)
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .field("last_accessed_at", &self.last_accessed_at)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Strictly past `expires_at`; a session is still valid at the exact instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Time left before expiry.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        super::remaining(self.expires_at, now)
    }

    /// Display name captured at login, if any.
    pub fn username(&self) -> Option<&str> {
        self.metadata.get("username").and_then(|v| v.as_str())
    }

    /// Roles captured at login.
    pub fn roles(&self) -> Vec<String> {
        self.metadata
            .get("roles")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|r| r.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    /// First eight characters of a session id, safe to log.
    pub fn short_id(id: &str) -> &str {
        id.get(..8).unwrap_or(id)
    }
}

/// Point-in-time session counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub users: usize,
}
