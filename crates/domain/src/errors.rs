//! Error types used throughout the identity subsystem

use std::time::Duration;

use idgate_common::{CommonError, ErrorClassification, ErrorSeverity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for idgate
///
/// Expiry variants (`TokenExpired`, `SessionExpired`) are kept apart from
/// hard invalidity so callers can attempt a refresh instead of forcing a new
/// login.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Signing key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to fetch signing keys: {0}")]
    KeyFetchFailed(String),

    #[error("Invalid or expired authorization state")]
    InvalidState,

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session expired")]
    SessionExpired,

    #[error("Session invalid")]
    SessionInvalid,

    #[error("Cache miss")]
    CacheMiss,

    /// OAuth error returned by the provider on the callback, passed through
    /// verbatim.
    #[error("Provider returned error: {error}")]
    Provider { error: String, description: Option<String> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for idgate operations
pub type Result<T> = std::result::Result<T, AuthError>;

impl AuthError {
    /// True for the expiry variants a caller may answer with a refresh.
    pub fn is_expiry(&self) -> bool {
        matches!(self, Self::TokenExpired | Self::SessionExpired)
    }

    /// True for failures that talk to the identity provider over the network.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::KeyFetchFailed(_) | Self::TokenExchangeFailed(_) | Self::TokenRefreshFailed(_)
        )
    }
}

impl ErrorClassification for AuthError {
    fn is_retryable(&self) -> bool {
        self.is_network()
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CacheMiss | Self::SessionNotFound => ErrorSeverity::Info,
            Self::TokenExpired | Self::SessionExpired => ErrorSeverity::Warning,
            Self::InvalidToken(_)
            | Self::KeyNotFound(_)
            | Self::InvalidState
            | Self::SessionInvalid
            | Self::Provider { .. } => ErrorSeverity::Warning,
            Self::KeyFetchFailed(_)
            | Self::TokenExchangeFailed(_)
            | Self::TokenRefreshFailed(_)
            | Self::Config(_) => ErrorSeverity::Error,
            Self::Internal(_) => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self.severity(), ErrorSeverity::Critical)
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl From<CommonError> for AuthError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::Config { .. } => Self::Config(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}
