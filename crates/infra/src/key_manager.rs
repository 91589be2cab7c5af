//! Encryption key management for the token cache
use idgate_common::EncryptionService;
use idgate_domain::{AuthError, CacheSettings, Environment, Result};
use tracing::{info, warn};

/// Resolves the token cache encryption key at startup
pub struct KeyManager;

impl KeyManager {
    /// Build the cache cipher described by `settings`.
    ///
    /// - Encryption disabled: no cipher.
    /// - Key configured: it must be standard base64 of exactly 32 bytes.
    /// - No key in development: a random key is generated for this process and
    ///   its fingerprint logged. Cached tokens do not survive a restart.
    /// - No key in production: refused.
    pub fn resolve(
        settings: &CacheSettings,
        environment: Environment,
    ) -> Result<Option<EncryptionService>> {
        if !settings.encryption_enabled {
            warn!("Token cache encryption is disabled; tokens are held in plaintext");
            return Ok(None);
        }

        if let Some(encoded) = &settings.encryption_key {
            let service = EncryptionService::from_base64(encoded)?;
            info!(fingerprint = %service.key_fingerprint(), "Loaded token cache encryption key");
            return Ok(Some(service));
        }

        match environment {
            Environment::Production => Err(AuthError::Config(
                "IDGATE_CACHE_ENCRYPTION_KEY is required in production when cache encryption is enabled"
                    .into(),
            )),
            Environment::Development => {
                let service = EncryptionService::new(Self::generate_key())?;
                warn!(
                    fingerprint = %service.key_fingerprint(),
                    "Generated ephemeral token cache encryption key; set IDGATE_CACHE_ENCRYPTION_KEY to persist one"
                );
                Ok(Some(service))
            }
        }
    }

    /// Generate a new random key
    pub fn generate_key() -> Vec<u8> {
        EncryptionService::generate_key()
    }

    /// Generate a new random key in the configuration format (standard base64)
    pub fn generate_encoded_key() -> String {
        EncryptionService::encode_key(&Self::generate_key())
    }
}
