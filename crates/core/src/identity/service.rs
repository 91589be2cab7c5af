//! Identity service - core business logic

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use idgate_domain::{
    AuthError, CallbackParams, LoginRedirect, Result, Session, TokenResponse, VerifiedClaims,
};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::auth::ports::TokenVerifier;
use crate::auth::AuthorizationFlow;
use crate::session::SessionStore;
use crate::token_cache::TokenCache;

/// Result of a completed login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: Session,
    pub claims: VerifiedClaims,
    pub tokens: TokenResponse,
}

/// Ties the login flow to session and token persistence.
pub struct IdentityService {
    flow: Arc<AuthorizationFlow>,
    verifier: Option<Arc<dyn TokenVerifier>>,
    sessions: Arc<SessionStore>,
    cache: Arc<TokenCache>,
}

impl IdentityService {
    /// Create a new identity service
    ///
    /// Without a verifier, ID tokens from the token endpoint are trusted as
    /// delivered over the back channel and only decoded.
    pub fn new(
        flow: Arc<AuthorizationFlow>,
        verifier: Option<Arc<dyn TokenVerifier>>,
        sessions: Arc<SessionStore>,
        cache: Arc<TokenCache>,
    ) -> Self {
        Self { flow, verifier, sessions, cache }
    }

    pub fn flow(&self) -> &Arc<AuthorizationFlow> {
        &self.flow
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.cache
    }

    pub fn begin_login(&self) -> LoginRedirect {
        self.flow.begin_login()
    }

    /// Redeem the callback, establish a session and cache the tokens.
    #[instrument(skip_all)]
    pub async fn complete_login(&self, params: &CallbackParams) -> Result<LoginOutcome> {
        let tokens = self.flow.complete_login(params).await?;
        let claims = self.identify(&tokens).await?;

        let mut metadata = HashMap::from([
            ("username".to_string(), json!(claims.username)),
            ("roles".to_string(), json!(claims.roles)),
        ]);
        if let Some(tenant) = &claims.tenant_id {
            metadata.insert("tenant_id".to_string(), json!(tenant));
        }
        if let Some(oid) = &claims.object_id {
            metadata.insert("object_id".to_string(), json!(oid));
        }

        let session = self.sessions.create(&claims.subject, &tokens, metadata);
        if let Err(err) = self.cache.store_response(&claims.subject, &tokens) {
            warn!(user_id = %claims.subject, error = %err, "Failed to cache tokens after login");
        }

        info!(
            user_id = %claims.subject,
            session = %Session::short_id(&session.id),
            "Login completed"
        );
        Ok(LoginOutcome { session, claims, tokens })
    }

    /// Redeem a refresh token without touching any stored state.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.flow.refresh(refresh_token).await
    }

    /// Refresh a user's tokens using the cached (or session-held) refresh
    /// token, then write the result back to the cache and the user's sessions.
    #[instrument(skip(self))]
    pub async fn silent_refresh(&self, user_id: &str) -> Result<TokenResponse> {
        let refresh_token = self.refresh_token_for(user_id)?;
        let mut tokens = self.flow.refresh(&refresh_token).await?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token);
        }

        if let Err(err) = self.cache.upsert_response(user_id, &tokens) {
            warn!(user_id = %user_id, error = %err, "Failed to cache refreshed tokens");
        }

        for session in self.sessions.list_for_user(user_id) {
            if let Err(err) = self.sessions.update_tokens(&session.id, &tokens) {
                debug!(session = %Session::short_id(&session.id), error = %err, "Skipped session update");
            }
        }

        info!(user_id = %user_id, "Silent refresh completed");
        Ok(tokens)
    }

    /// End a session and return the provider logout URL.
    ///
    /// Cached tokens are dropped once the user has no active session left.
    /// Unknown sessions are not an error.
    pub fn logout(&self, session_id: &str) -> String {
        if let Ok(session) = self.sessions.get(session_id) {
            self.sessions.delete(session_id);
            if self.sessions.active_count_for_user(&session.user_id) == 0 {
                self.cache.delete(&session.user_id);
            }
            info!(user_id = %session.user_id, "Logged out");
        } else {
            self.sessions.delete(session_id);
        }
        self.flow.logout_url()
    }

    fn refresh_token_for(&self, user_id: &str) -> Result<String> {
        if let Ok(cached) = self.cache.get(user_id) {
            if let Some(token) = cached.refresh_token {
                return Ok(token);
            }
        }
        self.sessions
            .list_for_user(user_id)
            .into_iter()
            .find_map(|s| s.refresh_token)
            .ok_or_else(|| AuthError::TokenRefreshFailed("no refresh token available".into()))
    }

    async fn identify(&self, tokens: &TokenResponse) -> Result<VerifiedClaims> {
        match (&self.verifier, &tokens.id_token) {
            (Some(verifier), Some(id_token)) => verifier.verify(id_token).await,
            (_, Some(id_token)) => decode_unverified(id_token),
            (_, None) => {
                debug!("No ID token in response, reading subject from access token");
                decode_unverified(&tokens.access_token)
            }
        }
    }
}

/// Read the claims of a JWT without checking its signature.
fn decode_unverified(token: &str) -> Result<VerifiedClaims> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::InvalidToken("token is not a JWT".into()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::InvalidToken(format!("payload is not base64url: {e}")))?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::InvalidToken(format!("payload is not JSON: {e}")))?;
    VerifiedClaims::from_claims(&claims)
}
