//! Logging setup and structured-logging helpers

use idgate_domain::AuthError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,idgate=debug";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. With `json` set, events are
/// written as one JSON object per line.
pub fn init_tracing(json: bool) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| fmt::layer().json().with_current_span(true)))
        .with((!json).then(|| fmt::layer().with_target(true)))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Convert an `AuthError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &AuthError) -> &'static str {
    match error {
        AuthError::InvalidToken(_) => "invalid_token",
        AuthError::TokenExpired => "token_expired",
        AuthError::KeyNotFound(_) => "key_not_found",
        AuthError::KeyFetchFailed(_) => "key_fetch_failed",
        AuthError::InvalidState => "invalid_state",
        AuthError::TokenExchangeFailed(_) => "token_exchange_failed",
        AuthError::TokenRefreshFailed(_) => "token_refresh_failed",
        AuthError::SessionNotFound => "session_not_found",
        AuthError::SessionExpired => "session_expired",
        AuthError::SessionInvalid => "session_invalid",
        AuthError::CacheMiss => "cache_miss",
        AuthError::Provider { .. } => "provider",
        AuthError::Config(_) => "config",
        AuthError::Internal(_) => "internal",
    }
}
