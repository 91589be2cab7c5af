//! Signed token verification against the provider's key set
//!
//! The key set is cached in memory and replaced wholesale. A `kid` that is not
//! in the cached set (or a set older than the freshness window) triggers one
//! fetch; a second miss is final. Refetches caused by unknown `kid`s are spaced
//! at least `KEYSET_MIN_REFETCH_SECS` apart.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use idgate_common::Clock;
use idgate_domain::constants::{KEYSET_MIN_REFETCH_SECS, MIN_RSA_MODULUS_BITS};
use idgate_domain::{AuthError, KeySet, ProviderConfig, Result, SigningKey, VerifiedClaims};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::ports::{KeySource, TokenVerifier};

const ACCEPTED_ALGORITHMS: &[Algorithm] = &[Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Verifies provider-issued RS* tokens using a cached JWKS.
pub struct KeySetVerifier {
    source: Arc<dyn KeySource>,
    issuer: String,
    audience: String,
    freshness: Duration,
    clock: Arc<dyn Clock>,
    cache: RwLock<Option<KeySet>>,
    refresh_lock: tokio::sync::Mutex<()>,
    last_miss_refetch: RwLock<Option<DateTime<Utc>>>,
}

enum Lookup {
    Hit(SigningKey),
    /// Fresh set without the `kid`
    Miss(DateTime<Utc>),
    /// Set absent or stale; carries the `fetched_at` of the cached set
    Refetch(Option<DateTime<Utc>>),
}

impl KeySetVerifier {
    pub fn new(
        source: Arc<dyn KeySource>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        freshness: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            issuer: issuer.into(),
            audience: audience.into(),
            freshness,
            clock,
            cache: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            last_miss_refetch: RwLock::new(None),
        }
    }

    /// Verifier expecting the tenant-scoped issuer and the client id as
    /// audience.
    pub fn for_provider(
        source: Arc<dyn KeySource>,
        provider: &ProviderConfig,
        freshness: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(source, provider.issuer(), provider.client_id.clone(), freshness, clock)
    }

    /// Drop the cached key set; the next verification fetches.
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }

    /// Fetch the key set now, replacing whatever is cached.
    pub async fn refresh_keys(&self) -> Result<usize> {
        let _guard = self.refresh_lock.lock().await;
        let set = self.source.fetch_keys().await?;
        let count = set.len();
        *self.cache.write() = Some(set);
        debug!(keys = count, "Signing key set refreshed");
        Ok(count)
    }

    /// Number of keys in the cached set.
    pub fn cached_key_count(&self) -> usize {
        self.cache.read().as_ref().map_or(0, KeySet::len)
    }

    fn lookup(&self, kid: &str) -> Lookup {
        let cache = self.cache.read();
        match cache.as_ref() {
            Some(set) if !set.is_stale(self.clock.now(), self.freshness) => match set.find(kid) {
                Some(key) => Lookup::Hit(key.clone()),
                None => Lookup::Miss(set.fetched_at),
            },
            Some(set) => Lookup::Refetch(Some(set.fetched_at)),
            None => Lookup::Refetch(None),
        }
    }

    fn miss_refetch_allowed(&self, now: DateTime<Utc>) -> bool {
        match *self.last_miss_refetch.read() {
            Some(at) => (now - at).num_seconds() >= KEYSET_MIN_REFETCH_SECS as i64,
            None => true,
        }
    }

    async fn signing_key(&self, kid: &str) -> Result<SigningKey> {
        let (observed, miss) = match self.lookup(kid) {
            Lookup::Hit(key) => return Ok(key),
            Lookup::Miss(fetched_at) => {
                if !self.miss_refetch_allowed(self.clock.now()) {
                    debug!(kid = %kid, "Unknown key id inside refetch interval, not fetching");
                    return Err(AuthError::KeyNotFound(kid.to_string()));
                }
                (Some(fetched_at), true)
            }
            Lookup::Refetch(observed) => (observed, false),
        };

        {
            let _guard = self.refresh_lock.lock().await;
            // Another caller may have refreshed while we waited.
            let current = self.cache.read().as_ref().map(|set| set.fetched_at);
            if current == observed {
                debug!(kid = %kid, "Key set miss or stale, fetching");
                let set = self.source.fetch_keys().await?;
                *self.cache.write() = Some(set);
                if miss {
                    *self.last_miss_refetch.write() = Some(self.clock.now());
                }
            }
        }

        let cache = self.cache.read();
        cache
            .as_ref()
            .and_then(|set| set.find(kid))
            .cloned()
            .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.algorithms = vec![algorithm];
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;
        validation
    }
}

/// Decode a base64url big-endian integer, dropping leading zero bytes.
fn key_component(value: &str) -> std::result::Result<Vec<u8>, String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| e.to_string())?;
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    Ok(bytes[start..].to_vec())
}

fn bit_length(magnitude: &[u8]) -> usize {
    match magnitude.first() {
        Some(first) => (magnitude.len() - 1) * 8 + (8 - first.leading_zeros() as usize),
        None => 0,
    }
}

/// RSA public key from JWK components. Anything that is not a usable RSA
/// key is reported as `KeyNotFound`.
fn decoding_key(key: &SigningKey) -> Result<DecodingKey> {
    let malformed =
        |reason: String| AuthError::KeyNotFound(format!("{}: malformed key material: {reason}", key.key_id));

    let modulus = key_component(&key.modulus).map_err(&malformed)?;
    let exponent = key_component(&key.exponent).map_err(&malformed)?;

    let modulus_bits = bit_length(&modulus);
    if modulus_bits < MIN_RSA_MODULUS_BITS {
        return Err(malformed(format!("modulus is {modulus_bits} bits")));
    }
    let odd = exponent.last().is_some_and(|b| b & 1 == 1);
    if !odd || exponent.len() > 8 || bit_length(&exponent) < 2 {
        return Err(malformed("unusable public exponent".into()));
    }

    DecodingKey::from_rsa_components(&key.modulus, &key.exponent).map_err(|e| malformed(e.to_string()))
}

#[async_trait]
impl TokenVerifier for KeySetVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedClaims> {
        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("malformed header: {e}")))?;

        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::InvalidToken(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AuthError::InvalidToken("header has no key id".into()))?;

        let key = self.signing_key(kid).await?;
        let decoding_key = decoding_key(&key)?;

        let data = decode::<serde_json::Value>(token, &decoding_key, &self.validation(header.alg))
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidIssuer => AuthError::InvalidToken("issuer mismatch".into()),
                ErrorKind::InvalidAudience => AuthError::InvalidToken("audience mismatch".into()),
                ErrorKind::ImmatureSignature => AuthError::InvalidToken("token not yet valid".into()),
                ErrorKind::InvalidSignature => AuthError::InvalidToken("bad signature".into()),
                _ => AuthError::InvalidToken(e.to_string()),
            })
            .inspect_err(|err| warn!(error = %err, "Token verification failed"))?;

        let claims = VerifiedClaims::from_claims(&data.claims)?;
        debug!(sub = %claims.subject, "Token verified");
        Ok(claims)
    }
}
