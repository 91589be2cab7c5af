//! PKCE authorization-code flow
//!
//! `begin_login` records a pending [`AuthState`] and returns the provider
//! authorization URL; `complete_login` consumes that state exactly once and
//! redeems the code. Persisting the resulting tokens is the caller's job.

use std::sync::Arc;

use idgate_common::auth::{
    generate_code_verifier_with_len, generate_state, validate_state, PKCEChallenge,
};
use idgate_common::Clock;
use idgate_domain::constants::PKCE_VERIFIER_LEN;
use idgate_domain::{
    AuthError, AuthState, CallbackParams, LoginRedirect, ProviderConfig, Result, TokenResponse,
};
use tracing::{debug, info, instrument, warn};

use super::ports::TokenEndpoint;
use super::state_store::AuthStateStore;

pub struct AuthorizationFlow {
    provider: ProviderConfig,
    endpoint: Arc<dyn TokenEndpoint>,
    states: Arc<AuthStateStore>,
    clock: Arc<dyn Clock>,
}

impl AuthorizationFlow {
    pub fn new(
        provider: ProviderConfig,
        endpoint: Arc<dyn TokenEndpoint>,
        states: Arc<AuthStateStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { provider, endpoint, states, clock }
    }

    /// Pending login store, shared with the background purge.
    pub fn states(&self) -> &Arc<AuthStateStore> {
        &self.states
    }

    /// Start a login attempt.
    pub fn begin_login(&self) -> LoginRedirect {
        let challenge =
            PKCEChallenge::from_verifier(generate_code_verifier_with_len(PKCE_VERIFIER_LEN));
        let state = generate_state();

        self.states.put(AuthState {
            state: state.clone(),
            code_verifier: challenge.code_verifier.clone(),
            redirect_uri: self.provider.redirect_uri.clone(),
            created_at: self.clock.now(),
        });

        let scope = self.provider.scope_string();
        let params = [
            ("client_id", self.provider.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", self.provider.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state.as_str()),
            ("code_challenge", challenge.code_challenge.as_str()),
            ("code_challenge_method", challenge.challenge_method()),
            ("response_mode", "query"),
        ];
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        debug!("Login started");
        LoginRedirect {
            authorization_url: format!("{}?{}", self.provider.authorize_endpoint(), query),
            state,
            expires_in: self.states.ttl().as_secs(),
        }
    }

    /// Handle the provider callback and redeem the authorization code.
    ///
    /// A provider `error` parameter is passed through as
    /// [`AuthError::Provider`] without touching the pending state.
    #[instrument(skip_all)]
    pub async fn complete_login(&self, params: &CallbackParams) -> Result<TokenResponse> {
        if let Some(error) = &params.error {
            warn!(error = %error, "Provider returned an error on callback");
            return Err(AuthError::Provider {
                error: error.clone(),
                description: params.error_description.clone(),
            });
        }

        let state = params.state.as_deref().ok_or(AuthError::InvalidState)?;
        let pending = self.states.take(state).ok_or(AuthError::InvalidState)?;
        if !validate_state(&pending.state, state) {
            return Err(AuthError::InvalidState);
        }
        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::TokenExchangeFailed("callback carried no code".into()))?;

        let tokens =
            self.endpoint.exchange_code(code, &pending.code_verifier, &pending.redirect_uri).await?;
        info!("Authorization code redeemed");
        Ok(tokens)
    }

    /// Redeem a refresh token.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        if refresh_token.is_empty() {
            return Err(AuthError::TokenRefreshFailed("refresh token is empty".into()));
        }
        self.endpoint.refresh(refresh_token).await
    }

    /// Provider logout URL, with the post-logout redirect when configured.
    pub fn logout_url(&self) -> String {
        let base = self.provider.logout_endpoint();
        match &self.provider.post_logout_redirect_uri {
            Some(uri) => format!("{base}?post_logout_redirect_uri={}", urlencoding::encode(uri)),
            None => base,
        }
    }
}
