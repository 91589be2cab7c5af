//! Provider key-discovery client
//!
//! Fetches the published JSON Web Key Set and keeps the RSA signing keys.
//! Keys without a `kid`, non-RSA keys and encryption keys are skipped.

use std::sync::Arc;

use async_trait::async_trait;
use idgate_common::Clock;
use idgate_core::KeySource;
use idgate_domain::{AuthError, KeySet, ProviderConfig, Result, SigningKey};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::client::HttpClient;

/// Raw JWK structure as returned by the keys endpoint. Unknown members
/// (`x5c`, `x5t`, `issuer`, ...) are ignored.
#[derive(Debug, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    #[serde(rename = "use", default)]
    key_use: Option<String>,
    #[serde(default)]
    alg: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

impl Jwk {
    fn into_signing_key(self) -> Option<SigningKey> {
        if self.kty != "RSA" || self.key_use.as_deref().is_some_and(|u| u != "sig") {
            return None;
        }
        Some(SigningKey {
            key_id: self.kid?,
            modulus: self.n?,
            exponent: self.e?,
            algorithm: self.alg,
        })
    }
}

/// [`KeySource`] backed by the provider's `discovery/v2.0/keys` endpoint.
pub struct HttpKeySource {
    client: HttpClient,
    url: String,
    clock: Arc<dyn Clock>,
}

impl HttpKeySource {
    pub fn new(client: HttpClient, url: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self { client, url: url.into(), clock }
    }

    pub fn for_provider(client: HttpClient, provider: &ProviderConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(client, provider.keys_endpoint(), clock)
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    #[instrument(skip_all)]
    async fn fetch_keys(&self) -> Result<KeySet> {
        let document: JwksDocument = self
            .client
            .get_json(&self.url)
            .await
            .map_err(|e| e.into_auth(AuthError::KeyFetchFailed))?;

        let published = document.keys.len();
        let keys: Vec<SigningKey> =
            document.keys.into_iter().filter_map(Jwk::into_signing_key).collect();
        if keys.len() < published {
            debug!(skipped = published - keys.len(), "Ignored non-signing or incomplete keys");
        }

        info!(keys = keys.len(), "Fetched provider signing keys");
        Ok(KeySet::new(keys, self.clock.now()))
    }
}
