//! Configuration loader
//!
//! Builds an [`IdentityConfig`] from environment variables. The binary loads a
//! `.env` file first (via `dotenvy`), so everything below may also come from
//! there.
//!
//! ## Environment Variables
//! Required:
//! - `IDGATE_TENANT_ID`: Provider tenant
//! - `IDGATE_CLIENT_ID`: Application (client) id
//! - `IDGATE_REDIRECT_URI`: Callback URL registered with the provider
//!
//! Optional:
//! - `IDGATE_CLIENT_SECRET`: Only for confidential clients
//! - `IDGATE_AUTHORITY_HOST`: Provider host (default `login.microsoftonline.com`)
//! - `IDGATE_SCOPES`: Comma-separated scopes (default `openid,profile,email,User.Read`)
//! - `IDGATE_POST_LOGOUT_REDIRECT_URI`: Where the provider sends the user after logout
//! - `IDGATE_SESSION_TTL_SECS`, `IDGATE_SESSION_MAX_TTL_SECS`,
//!   `IDGATE_MAX_SESSIONS_PER_USER`, `IDGATE_SESSION_CLEANUP_SECS`
//! - `IDGATE_CACHE_CAPACITY`, `IDGATE_CACHE_CLEANUP_SECS`
//! - `IDGATE_CACHE_ENCRYPTION`: Whether cached tokens are encrypted (true/false)
//! - `IDGATE_CACHE_ENCRYPTION_KEY`: Standard base64 of a 32-byte key
//! - `IDGATE_HTTP_TIMEOUT_SECS`: Outbound request timeout
//! - `IDGATE_KEYSET_FRESHNESS_SECS`: Signing key cache lifetime
//! - `IDGATE_AUTH_PREFERENCE`: `bearer_first` or `session_first`
//! - `IDGATE_ENV`: `development` or `production`
//! - `IDGATE_BIND_ADDR`: Listen address (default `0.0.0.0:8080`)

use std::str::FromStr;
use std::time::Duration;

use idgate_domain::{AuthError, IdentityConfig, ProviderConfig, Result};

/// Load and validate the configuration.
///
/// # Errors
/// Returns `AuthError::Config` if a required variable is missing, a value
/// does not parse, or the resulting configuration fails validation.
pub fn load() -> Result<IdentityConfig> {
    let config = load_from_env()?;
    config.validate()?;
    tracing::info!(
        tenant = %config.provider.tenant_id,
        environment = %config.environment,
        "Configuration loaded from environment variables"
    );
    Ok(config)
}

/// Load configuration from environment variables without validating it.
///
/// # Errors
/// Returns `AuthError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<IdentityConfig> {
    let mut provider = ProviderConfig::new(
        env_var("IDGATE_TENANT_ID")?,
        env_var("IDGATE_CLIENT_ID")?,
        env_var("IDGATE_REDIRECT_URI")?,
    );
    if let Some(host) = env_opt("IDGATE_AUTHORITY_HOST") {
        provider.authority = host;
    }
    provider.client_secret = env_opt("IDGATE_CLIENT_SECRET");
    provider.post_logout_redirect_uri = env_opt("IDGATE_POST_LOGOUT_REDIRECT_URI");
    if let Some(scopes) = env_opt("IDGATE_SCOPES") {
        provider.scopes = parse_scopes(&scopes);
    }

    let mut config = IdentityConfig::new(provider);

    let session = &mut config.session;
    session.default_ttl = env_secs("IDGATE_SESSION_TTL_SECS", session.default_ttl)?;
    session.max_ttl = env_secs("IDGATE_SESSION_MAX_TTL_SECS", session.max_ttl)?;
    session.max_sessions_per_user =
        env_parse("IDGATE_MAX_SESSIONS_PER_USER", session.max_sessions_per_user)?;
    session.cleanup_interval = env_secs("IDGATE_SESSION_CLEANUP_SECS", session.cleanup_interval)?;

    let cache = &mut config.cache;
    cache.capacity = env_parse("IDGATE_CACHE_CAPACITY", cache.capacity)?;
    cache.cleanup_interval = env_secs("IDGATE_CACHE_CLEANUP_SECS", cache.cleanup_interval)?;
    cache.encryption_enabled = env_bool("IDGATE_CACHE_ENCRYPTION", cache.encryption_enabled);
    cache.encryption_key = env_opt("IDGATE_CACHE_ENCRYPTION_KEY");

    config.http.request_timeout =
        env_secs("IDGATE_HTTP_TIMEOUT_SECS", config.http.request_timeout)?;
    config.key_set.freshness = env_secs("IDGATE_KEYSET_FRESHNESS_SECS", config.key_set.freshness)?;
    config.auth_preference = env_parse("IDGATE_AUTH_PREFERENCE", config.auth_preference)?;
    config.environment = env_parse("IDGATE_ENV", config.environment)?;
    if let Some(addr) = env_opt("IDGATE_BIND_ADDR") {
        config.bind_addr = addr;
    }

    Ok(config)
}

/// Comma-separated scope list; blanks are dropped.
fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Get required environment variable
///
/// # Errors
/// Returns `AuthError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    env_opt(key)
        .ok_or_else(|| AuthError::Config(format!("Missing required environment variable: {key}")))
}

/// Optional variable; blank counts as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse an optional variable with `FromStr`, falling back to `default`.
fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| AuthError::Config(format!("Invalid value for {key}: {e}"))),
        None => Ok(default),
    }
}

fn env_secs(key: &str, default: Duration) -> Result<Duration> {
    env_parse(key, default.as_secs()).map(Duration::from_secs)
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
