//! AES-256-GCM encryption for token material at rest.
//!
//! - [`EncryptionService`]: authenticated encryption with a fresh random nonce
//!   per call
//! - [`EncryptedData`]: serializable nonce + ciphertext container
//!
//! ## Usage
//!
//! ```rust
//! use idgate_common::crypto::encryption::EncryptionService;
//!
//! let key = EncryptionService::generate_key();
//! let service = EncryptionService::new(key)?;
//!
//! let sealed = service.encrypt_to_string(b"refresh-token")?;
//! let opened = service.decrypt_from_string(&sealed)?;
//! assert_eq!(opened, b"refresh-token");
//! # Ok::<(), idgate_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

const ALGORITHM: &str = "AES-256-GCM";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Encrypted payload: nonce, ciphertext (with GCM tag) and algorithm label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub algorithm: String,
}

/// AES-GCM encryption service bound to a single 32-byte key.
pub struct EncryptionService {
    key: Vec<u8>,
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key", &"[REDACTED]")
            .field("fingerprint", &self.key_fingerprint())
            .finish()
    }
}

impl EncryptionService {
    /// Create a new encryption service from a raw 32-byte key.
    pub fn new(key: Vec<u8>) -> CommonResult<Self> {
        let cipher = Self::build_cipher(&key)?;
        Ok(Self { key, cipher })
    }

    /// Create a service from a standard base64-encoded 32-byte key.
    pub fn from_base64(encoded: &str) -> CommonResult<Self> {
        let key = BASE64.decode(encoded.trim()).map_err(|e| {
            CommonError::config_field("encryption_key", format!("invalid base64: {e}"))
        })?;
        Self::new(key)
    }

    /// Generate a random 32-byte symmetric key.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Encode a raw key as standard base64 (the configuration format).
    pub fn encode_key(key: &[u8]) -> String {
        BASE64.encode(key)
    }

    /// Encrypt bytes into an `EncryptedData` payload.
    pub fn encrypt(&self, data: &[u8]) -> CommonResult<EncryptedData> {
        let nonce_bytes = Self::generate_nonce();
        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce_bytes), data)
            .map_err(|e| CommonError::internal(format!("Encryption failed: {e}")))?;

        Ok(EncryptedData {
            nonce: nonce_bytes.to_vec(),
            ciphertext,
            algorithm: ALGORITHM.to_string(),
        })
    }

    /// Decrypt an [`EncryptedData`] payload back into raw bytes.
    pub fn decrypt(&self, encrypted: &EncryptedData) -> CommonResult<Vec<u8>> {
        if encrypted.algorithm != ALGORITHM {
            return Err(CommonError::internal(format!(
                "Unsupported algorithm: {}",
                encrypted.algorithm
            )));
        }

        let nonce_array: [u8; NONCE_LEN] = encrypted.nonce.as_slice().try_into().map_err(|_| {
            CommonError::internal("Nonce must be exactly 12 bytes for AES-256-GCM".to_string())
        })?;

        self.cipher
            .decrypt(&Nonce::from(nonce_array), encrypted.ciphertext.as_ref())
            .map_err(|e| CommonError::internal(format!("Decryption failed: {e}")))
    }

    /// Encrypt bytes and encode the payload as a base64 string.
    pub fn encrypt_to_string(&self, data: &[u8]) -> CommonResult<String> {
        let encrypted = self.encrypt(data)?;
        let serialized = serde_json::to_vec(&encrypted)?;
        Ok(BASE64.encode(serialized))
    }

    /// Decode a base64 string and decrypt the contained payload.
    pub fn decrypt_from_string(&self, encrypted_str: &str) -> CommonResult<Vec<u8>> {
        let decoded = BASE64
            .decode(encrypted_str)
            .map_err(|e| CommonError::internal(format!("Base64 decode failed: {e}")))?;
        let encrypted: EncryptedData = serde_json::from_slice(&decoded)?;
        self.decrypt(&encrypted)
    }

    /// Generate a short fingerprint for the current key.
    ///
    /// Safe to log; reveals nothing usable about the key itself.
    pub fn key_fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&self.key);
        let result = hasher.finalize();
        BASE64.encode(&result[..8])
    }

    /// Replace the current encryption key with a new one.
    ///
    /// Payloads sealed under the previous key can no longer be opened.
    pub fn rotate_key(&mut self, new_key: Vec<u8>) -> CommonResult<()> {
        self.cipher = Self::build_cipher(&new_key)?;
        self.key = new_key;
        Ok(())
    }

    fn build_cipher(key: &[u8]) -> CommonResult<Aes256Gcm> {
        if key.len() != KEY_LEN {
            return Err(CommonError::config_field(
                "encryption_key",
                format!("key must be exactly {KEY_LEN} bytes, got {}", key.len()),
            ));
        }

        Aes256Gcm::new_from_slice(key).map_err(|e| {
            CommonError::internal(format!("Failed to create encryption cipher: {e}"))
        })
    }

    fn generate_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }
}
