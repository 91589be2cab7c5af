//! Domain types and models
//!
//! - [`keys`]: published signing keys and the cached key set
//! - [`login`]: pending login state, provider token responses, callback input
//! - [`session`]: server-side sessions
//! - [`cache`]: cached provider tokens and cache statistics
//! - [`claims`]: verified token claims and authenticated identities

pub mod cache;
pub mod claims;
pub mod keys;
pub mod login;
pub mod session;

pub use cache::{CacheHealth, CacheStats, CachedToken};
pub use claims::{AuthSource, AuthenticatedIdentity, VerifiedClaims};
pub use keys::{KeySet, SigningKey};
pub use login::{AuthState, CallbackParams, LoginRedirect, TokenResponse};
pub use session::{Session, SessionStats};

use chrono::{DateTime, Utc};

/// Add whole seconds to an instant, saturating instead of overflowing.
pub(crate) fn add_secs(at: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    chrono::Duration::try_seconds(secs)
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Time left until `deadline`, or `None` once it has passed.
pub(crate) fn remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Option<std::time::Duration> {
    if now > deadline {
        return None;
    }
    deadline.signed_duration_since(now).to_std().ok()
}
