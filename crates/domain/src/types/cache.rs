//! Cached provider tokens and cache statistics

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::login::TokenResponse;
use crate::constants::DEFAULT_TOKEN_TTL_SECS;

/// Provider tokens cached for one user.
///
/// Token fields hold plaintext when handed to or returned from the cache;
/// `encrypted` reports whether the cache sealed them at rest.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: String,
    pub scope: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
    pub cached_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u64,
    pub encrypted: bool,
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("user_id", &self.user_id)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .field("cached_at", &self.cached_at)
            .field("access_count", &self.access_count)
            .field("encrypted", &self.encrypted)
            .finish_non_exhaustive()
    }
}

impl CachedToken {
    /// Build a cache entry from a token endpoint response.
    ///
    /// A missing or non-positive `expires_in` falls back to one hour.
    pub fn from_response(user_id: impl Into<String>, tokens: &TokenResponse, now: DateTime<Utc>) -> Self {
        let lifetime =
            if tokens.expires_in > 0 { tokens.expires_in } else { DEFAULT_TOKEN_TTL_SECS };
        Self {
            user_id: user_id.into(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            id_token: tokens.id_token.clone(),
            token_type: tokens.token_type.clone(),
            scope: tokens.scope.clone(),
            expires_at: super::add_secs(now, lifetime),
            refresh_expires_at: tokens.refresh_token_expires_in.map(|s| super::add_secs(now, s)),
            cached_at: now,
            last_accessed_at: now,
            access_count: 0,
            encrypted: false,
        }
    }

    /// Strictly past `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Time left before the access token expires.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        super::remaining(self.expires_at, now)
    }

    /// Whether the refresh token can still be redeemed.
    pub fn can_refresh(&self, now: DateTime<Utc>) -> bool {
        self.refresh_token.is_some() && self.refresh_expires_at.map_or(true, |at| now <= at)
    }
}

/// Cache counters, recomputed from the table on each request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_entries: usize,
    pub active_entries: usize,
    pub expired_entries: usize,
    pub oldest_cached_at: Option<DateTime<Utc>>,
    pub newest_cached_at: Option<DateTime<Utc>>,
}

impl CacheStats {
    /// Hits over lookups, 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Cache health report for operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealth {
    pub stats: CacheStats,
    pub hit_rate: f64,
    pub capacity: usize,
    pub utilization: f64,
    pub encryption_enabled: bool,
}
