//! Provider token endpoint client
//!
//! Server-to-server form POSTs for the `authorization_code` and
//! `refresh_token` grants.

use async_trait::async_trait;
use idgate_core::TokenEndpoint;
use idgate_domain::{AuthError, ProviderConfig, Result, TokenResponse};
use tracing::{info, instrument, warn};

use super::client::HttpClient;

/// [`TokenEndpoint`] backed by the provider's `oauth2/v2.0/token` endpoint.
pub struct HttpTokenEndpoint {
    client: HttpClient,
    provider: ProviderConfig,
}

impl HttpTokenEndpoint {
    pub fn new(client: HttpClient, provider: ProviderConfig) -> Self {
        Self { client, provider }
    }

    /// Common form fields; the secret is only sent by confidential clients.
    fn base_form<'a>(&'a self, grant_type: &'a str) -> Vec<(&'a str, &'a str)> {
        let mut form = vec![("grant_type", grant_type), ("client_id", self.provider.client_id.as_str())];
        if let Some(secret) = &self.provider.client_secret {
            form.push(("client_secret", secret.as_str()));
        }
        form
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    #[instrument(skip_all)]
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        let mut form = self.base_form("authorization_code");
        form.extend([
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ]);

        let tokens: TokenResponse = self
            .client
            .post_form(&self.provider.token_endpoint(), &form)
            .await
            .map_err(|e| {
                warn!(error = %e, "Authorization code exchange failed");
                e.into_auth(AuthError::TokenExchangeFailed)
            })?;

        info!(expires_in = tokens.expires_in, "Exchanged authorization code");
        Ok(tokens)
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let scope = self.provider.scope_string();
        let mut form = self.base_form("refresh_token");
        form.extend([("refresh_token", refresh_token), ("scope", scope.as_str())]);

        let tokens: TokenResponse = self
            .client
            .post_form(&self.provider.token_endpoint(), &form)
            .await
            .map_err(|e| {
                warn!(error = %e, "Token refresh failed");
                e.into_auth(AuthError::TokenRefreshFailed)
            })?;

        info!(expires_in = tokens.expires_in, "Refreshed tokens");
        Ok(tokens)
    }
}
