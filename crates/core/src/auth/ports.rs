//! Port interfaces for the identity provider
//!
//! These traits define the boundaries between core business logic
//! and the HTTP adapters in `idgate-infra`.

use async_trait::async_trait;
use idgate_domain::{KeySet, Result, TokenResponse, VerifiedClaims};

/// Source of the provider's published signing keys
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the current key set.
    ///
    /// Network and parse failures are `AuthError::KeyFetchFailed`.
    async fn fetch_keys(&self) -> Result<KeySet>;
}

/// Provider token endpoint
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Redeem an authorization code (`grant_type=authorization_code`).
    ///
    /// Non-2xx responses and timeouts are `AuthError::TokenExchangeFailed`.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse>;

    /// Redeem a refresh token (`grant_type=refresh_token`).
    ///
    /// Non-2xx responses and timeouts are `AuthError::TokenRefreshFailed`.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse>;
}

/// Stateless bearer token verification
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify signature and standard claims, returning the mapped claims.
    async fn verify(&self, token: &str) -> Result<VerifiedClaims>;
}
