//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 with the `S256` method. Verifiers are drawn from the
//! unreserved URL alphabet so they can be sent verbatim in form bodies.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Minimum verifier length allowed by RFC 7636
pub const MIN_VERIFIER_LEN: usize = 43;

/// Maximum verifier length allowed by RFC 7636
pub const MAX_VERIFIER_LEN: usize = 128;

/// The only challenge method we emit
pub const CHALLENGE_METHOD: &str = "S256";

const UNRESERVED: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Generate a cryptographically secure code verifier of maximum length (128).
pub fn generate_code_verifier() -> String {
    generate_code_verifier_with_len(MAX_VERIFIER_LEN)
}

/// Generate a code verifier of the requested length.
///
/// Lengths outside 43..=128 are clamped into range.
pub fn generate_code_verifier_with_len(len: usize) -> String {
    let len = len.clamp(MIN_VERIFIER_LEN, MAX_VERIFIER_LEN);
    let mut rng = OsRng;
    (0..len).map(|_| UNRESERVED[rng.gen_range(0..UNRESERVED.len())] as char).collect()
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier)))
/// without padding.
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random state token for CSRF protection
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43 characters).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Validate that the state token matches
pub fn validate_state(expected: &str, actual: &str) -> bool {
    expected == actual
}

/// PKCE challenge pair for one login attempt.
///
/// Single-use: the verifier travels with the pending login state and is
/// discarded once the authorization code has been exchanged.
#[derive(Debug, Clone)]
pub struct PKCEChallenge {
    /// Random string (43-128 chars), kept secret until token exchange
    pub code_verifier: String,

    /// SHA256 hash of code_verifier (base64url, no padding)
    pub code_challenge: String,
}

impl PKCEChallenge {
    /// Generate a new challenge with a 128-character verifier
    ///
    /// # Examples
    /// ```
    /// use idgate_common::auth::pkce::PKCEChallenge;
    ///
    /// let challenge = PKCEChallenge::generate();
    /// assert_eq!(challenge.code_verifier.len(), 128);
    /// assert_eq!(challenge.challenge_method(), "S256");
    /// ```
    pub fn generate() -> Self {
        Self::from_verifier(generate_code_verifier())
    }

    /// Build a challenge around an existing verifier
    pub fn from_verifier(code_verifier: String) -> Self {
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}
