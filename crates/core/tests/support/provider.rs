//! In-memory provider ports

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use idgate_core::{KeySource, TokenEndpoint};
use idgate_domain::{AuthError, KeySet, Result, SigningKey, TokenResponse};
use parking_lot::Mutex;

/// Serves a fixed key list and counts fetches.
pub struct StaticKeySource {
    keys: Mutex<Vec<SigningKey>>,
    fetches: AtomicUsize,
}

impl StaticKeySource {
    pub fn new(keys: Vec<SigningKey>) -> Self {
        Self { keys: Mutex::new(keys), fetches: AtomicUsize::new(0) }
    }

    /// Simulate a provider key rotation.
    pub fn publish(&self, keys: Vec<SigningKey>) {
        *self.keys.lock() = keys;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch_keys(&self) -> Result<KeySet> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(KeySet::new(self.keys.lock().clone(), Utc::now()))
    }
}

/// Key source whose provider is unreachable.
pub struct UnreachableKeySource;

#[async_trait]
impl KeySource for UnreachableKeySource {
    async fn fetch_keys(&self) -> Result<KeySet> {
        Err(AuthError::KeyFetchFailed("connection refused".into()))
    }
}

/// Token endpoint returning a scripted response.
pub struct StubTokenEndpoint {
    response: Mutex<TokenResponse>,
    pub exchanges: AtomicUsize,
    pub refreshes: Mutex<Vec<String>>,
}

impl StubTokenEndpoint {
    pub fn new(response: TokenResponse) -> Self {
        Self {
            response: Mutex::new(response),
            exchanges: AtomicUsize::new(0),
            refreshes: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_with(&self, response: TokenResponse) {
        *self.response.lock() = response;
    }
}

#[async_trait]
impl TokenEndpoint for StubTokenEndpoint {
    async fn exchange_code(
        &self,
        code: &str,
        _code_verifier: &str,
        _redirect_uri: &str,
    ) -> Result<TokenResponse> {
        if code == "rejected" {
            return Err(AuthError::TokenExchangeFailed("invalid_grant".into()));
        }
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.lock().clone())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.refreshes.lock().push(refresh_token.to_string());
        Ok(self.response.lock().clone())
    }
}

pub fn token_response(id_token: Option<String>, expires_in: i64) -> TokenResponse {
    TokenResponse {
        access_token: "access-token".into(),
        id_token,
        refresh_token: Some("refresh-token".into()),
        token_type: "Bearer".into(),
        scope: Some("openid profile email User.Read".into()),
        expires_in,
        refresh_token_expires_in: None,
    }
}
