//! Bearer-or-session authentication
//!
//! Tries the presented credentials in the configured order. The first one
//! that validates wins, so when both would succeed the preferred source is
//! reported. When every presented credential fails, the error from the first
//! one tried is returned; credentials that were not presented are skipped and
//! never contribute an error.

use std::sync::Arc;

use idgate_domain::{
    AuthError, AuthPreference, AuthSource, AuthenticatedIdentity, Result,
};
use tracing::debug;

use super::ports::TokenVerifier;
use crate::session::SessionStore;

pub struct HybridAuthenticator {
    verifier: Option<Arc<dyn TokenVerifier>>,
    sessions: Arc<SessionStore>,
    preference: AuthPreference,
}

impl HybridAuthenticator {
    pub fn new(
        verifier: Option<Arc<dyn TokenVerifier>>,
        sessions: Arc<SessionStore>,
        preference: AuthPreference,
    ) -> Self {
        Self { verifier, sessions, preference }
    }

    pub fn preference(&self) -> AuthPreference {
        self.preference
    }

    /// Resolve an identity from a bearer token and/or a session id.
    pub async fn authenticate(
        &self,
        bearer: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<AuthenticatedIdentity> {
        let order = match self.preference {
            AuthPreference::BearerFirst => [AuthSource::Bearer, AuthSource::Session],
            AuthPreference::SessionFirst => [AuthSource::Session, AuthSource::Bearer],
        };

        let mut first_error = None;
        for source in order {
            let attempt = match (source, bearer, session_id) {
                (AuthSource::Bearer, Some(token), _) if !token.is_empty() => {
                    self.from_bearer(token).await
                }
                (AuthSource::Session, _, Some(id)) if !id.is_empty() => self.from_session(id),
                _ => continue,
            };
            match attempt {
                Ok(identity) => {
                    debug!(user_id = %identity.user_id, source = ?source, "Request authenticated");
                    return Ok(identity);
                }
                Err(err) => {
                    debug!(source = ?source, error = %err, "Credential rejected");
                    first_error.get_or_insert(err);
                }
            }
        }

        Err(first_error.unwrap_or_else(|| AuthError::InvalidToken("no credentials presented".into())))
    }

    async fn from_bearer(&self, token: &str) -> Result<AuthenticatedIdentity> {
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| AuthError::InvalidToken("bearer tokens are not accepted".into()))?;
        let claims = verifier.verify(token).await?;
        Ok(AuthenticatedIdentity {
            user_id: claims.subject,
            username: claims.username,
            roles: claims.roles,
            source: AuthSource::Bearer,
        })
    }

    fn from_session(&self, session_id: &str) -> Result<AuthenticatedIdentity> {
        let session = self.sessions.validate(session_id)?;
        Ok(AuthenticatedIdentity {
            username: session.username().unwrap_or(&session.user_id).to_string(),
            roles: session.roles(),
            user_id: session.user_id,
            source: AuthSource::Session,
        })
    }
}
