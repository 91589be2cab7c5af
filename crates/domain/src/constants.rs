//! Domain constants
//!
//! Defaults and wire-level names shared by every idgate crate.

// Provider defaults
pub const DEFAULT_AUTHORITY_HOST: &str = "login.microsoftonline.com";
pub const DEFAULT_SCOPES: &[&str] = &["openid", "profile", "email", "User.Read"];

// Login state
pub const AUTH_STATE_TTL_SECS: u64 = 300;
pub const AUTH_STATE_CAPACITY: usize = 10_000;
pub const AUTH_STATE_KEY_PREFIX: &str = "oauth_session_";
pub const PKCE_VERIFIER_LEN: usize = 128;

// Sessions
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_SESSION_MAX_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_MAX_SESSIONS_PER_USER: usize = 5;
pub const SESSION_ID_BYTES: usize = 32;
pub const SESSION_HEADER: &str = "X-Session-ID";
pub const SESSION_COOKIE: &str = "session_id";

// Token cache
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60;

// Background sweeps
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 5 * 60;

// Outbound HTTP and key set
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_KEYSET_FRESHNESS_SECS: u64 = 60 * 60;
/// Minimum spacing between refetches caused by an unknown `kid`
pub const KEYSET_MIN_REFETCH_SECS: u64 = 30;
pub const MIN_RSA_MODULUS_BITS: usize = 2048;

// Binary
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
