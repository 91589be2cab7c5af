//! Conversions from external infrastructure errors into domain errors.

use idgate_domain::AuthError;
use reqwest::Error as HttpError;
use thiserror::Error;

/// Failure talking to the identity provider over HTTP.
///
/// Kept separate from [`AuthError`] because the same transport failure maps to
/// a different domain error depending on the call (key fetch, code exchange,
/// refresh).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request timed out")]
    Timeout,

    #[error("HTTP connection failure")]
    Connect,

    /// Non-2xx answer. `detail` is the OAuth `error` code when the body carried
    /// one, otherwise the canonical reason phrase.
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("HTTP request failed: {0}")]
    Other(String),
}

impl TransportError {
    /// Wrap the failure in the domain error for the calling operation, e.g.
    /// `err.into_auth(AuthError::KeyFetchFailed)`.
    pub fn into_auth(self, kind: fn(String) -> AuthError) -> AuthError {
        kind(self.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for TransportError {
    fn from(err: HttpError) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }

        if err.is_connect() {
            return Self::Connect;
        }

        if err.is_decode() {
            return Self::Decode(err.to_string());
        }

        if let Some(status) = err.status() {
            return Self::Status {
                status: status.as_u16(),
                detail: status.canonical_reason().unwrap_or("unknown status").to_string(),
            };
        }

        Self::Other(err.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
