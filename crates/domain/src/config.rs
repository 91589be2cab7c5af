//! Identity configuration
//!
//! Plain structures with defaults. Loading from the environment lives in
//! `idgate-infra`; this module only knows how to describe and validate a
//! configuration and how to derive the provider endpoints from it.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::constants::*;
use crate::errors::{AuthError, Result};
use crate::impl_domain_enum_conversions;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl_domain_enum_conversions!(Environment {
    Development => "development",
    Production => "production",
});

/// Order in which the hybrid authenticator tries credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPreference {
    #[default]
    BearerFirst,
    SessionFirst,
}

impl_domain_enum_conversions!(AuthPreference {
    BearerFirst => "bearer_first",
    SessionFirst => "session_first",
});

/// Identity provider registration
#[derive(Clone)]
pub struct ProviderConfig {
    /// Authority host, with or without scheme (`https://` is assumed)
    pub authority: String,
    pub tenant_id: String,
    pub client_id: String,
    /// Absent for public clients
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub post_logout_redirect_uri: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("authority", &self.authority)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("post_logout_redirect_uri", &self.post_logout_redirect_uri)
            .finish()
    }
}

impl ProviderConfig {
    /// Provider registration with default authority and scopes.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            authority: DEFAULT_AUTHORITY_HOST.to_string(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: redirect_uri.into(),
            scopes: DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect(),
            post_logout_redirect_uri: None,
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// `https://<provider>` with any trailing slash removed.
    pub fn authority_base(&self) -> String {
        let trimmed = self.authority.trim().trim_end_matches('/');
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        }
    }

    fn tenant_base(&self) -> String {
        format!("{}/{}", self.authority_base(), self.tenant_id)
    }

    pub fn authorize_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.tenant_base())
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.tenant_base())
    }

    pub fn keys_endpoint(&self) -> String {
        format!("{}/discovery/v2.0/keys", self.tenant_base())
    }

    pub fn logout_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/logout", self.tenant_base())
    }

    /// Tenant-scoped issuer expected in the `iss` claim.
    pub fn issuer(&self) -> String {
        format!("{}/v2.0", self.tenant_base())
    }

    /// Scopes joined with spaces, as sent on the wire.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Session lifetime policy
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub default_ttl: Duration,
    pub max_ttl: Duration,
    pub max_sessions_per_user: usize,
    pub cleanup_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            max_ttl: Duration::from_secs(DEFAULT_SESSION_MAX_TTL_SECS),
            max_sessions_per_user: DEFAULT_MAX_SESSIONS_PER_USER,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

/// Token cache policy
#[derive(Clone)]
pub struct CacheSettings {
    pub capacity: usize,
    pub cleanup_interval: Duration,
    pub encryption_enabled: bool,
    /// Standard base64 of a 32-byte key
    pub encryption_key: Option<String>,
}

impl fmt::Debug for CacheSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSettings")
            .field("capacity", &self.capacity)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("encryption_enabled", &self.encryption_enabled)
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            encryption_enabled: true,
            encryption_key: None,
        }
    }
}

/// Outbound HTTP settings
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { request_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS) }
    }
}

/// Signing key set cache policy
#[derive(Debug, Clone)]
pub struct KeySetSettings {
    pub freshness: Duration,
}

impl Default for KeySetSettings {
    fn default() -> Self {
        Self { freshness: Duration::from_secs(DEFAULT_KEYSET_FRESHNESS_SECS) }
    }
}

/// Complete configuration consumed at startup
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub provider: ProviderConfig,
    pub session: SessionConfig,
    pub cache: CacheSettings,
    pub http: HttpSettings,
    pub key_set: KeySetSettings,
    pub auth_preference: AuthPreference,
    pub environment: Environment,
    pub bind_addr: String,
}

impl IdentityConfig {
    /// Configuration with defaults for everything but the provider.
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            session: SessionConfig::default(),
            cache: CacheSettings::default(),
            http: HttpSettings::default(),
            key_set: KeySetSettings::default(),
            auth_preference: AuthPreference::default(),
            environment: Environment::default(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let provider = &self.provider;
        if provider.tenant_id.trim().is_empty() {
            return Err(AuthError::Config("tenant id must not be empty".into()));
        }
        if provider.client_id.trim().is_empty() {
            return Err(AuthError::Config("client id must not be empty".into()));
        }
        if provider.redirect_uri.trim().is_empty() {
            return Err(AuthError::Config("redirect uri must not be empty".into()));
        }
        Url::parse(&provider.redirect_uri)
            .map_err(|e| AuthError::Config(format!("redirect uri is not a valid URL: {e}")))?;
        if let Some(uri) = &provider.post_logout_redirect_uri {
            Url::parse(uri).map_err(|e| {
                AuthError::Config(format!("post-logout redirect uri is not a valid URL: {e}"))
            })?;
        }
        if provider.scopes.is_empty() {
            return Err(AuthError::Config("at least one scope is required".into()));
        }

        if self.session.default_ttl > self.session.max_ttl {
            return Err(AuthError::Config(format!(
                "default session TTL ({}s) exceeds maximum TTL ({}s)",
                self.session.default_ttl.as_secs(),
                self.session.max_ttl.as_secs()
            )));
        }
        if self.session.max_sessions_per_user == 0 {
            return Err(AuthError::Config("max sessions per user must be at least 1".into()));
        }
        if self.cache.capacity == 0 {
            return Err(AuthError::Config("cache capacity must be at least 1".into()));
        }
        if self.http.request_timeout.is_zero() {
            return Err(AuthError::Config("HTTP timeout must be positive".into()));
        }
        if self.session.cleanup_interval.is_zero() {
            return Err(AuthError::Config("session cleanup interval must be positive".into()));
        }
        if self.cache.cleanup_interval.is_zero() {
            return Err(AuthError::Config("cache cleanup interval must be positive".into()));
        }
        if self.key_set.freshness.is_zero() {
            return Err(AuthError::Config("key set freshness must be positive".into()));
        }
        Ok(())
    }
}
