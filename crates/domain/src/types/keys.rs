//! Published signing keys

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// RSA public key published by the provider, identified by `kid`.
///
/// Modulus and exponent stay in their published base64url form; the verifier
/// rebuilds the public key from them on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningKey {
    pub key_id: String,
    pub modulus: String,
    pub exponent: String,
    /// Declared algorithm (`RS256`, ...) when the provider publishes one
    pub algorithm: Option<String>,
}

/// Snapshot of the provider's key set. Replaced wholesale on refresh.
#[derive(Debug, Clone)]
pub struct KeySet {
    pub keys: Vec<SigningKey>,
    pub fetched_at: DateTime<Utc>,
}

impl KeySet {
    pub fn new(keys: Vec<SigningKey>, fetched_at: DateTime<Utc>) -> Self {
        Self { keys, fetched_at }
    }

    /// Exact `kid` lookup.
    pub fn find(&self, key_id: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|k| k.key_id == key_id)
    }

    /// True once the set is older than `freshness`.
    pub fn is_stale(&self, now: DateTime<Utc>, freshness: Duration) -> bool {
        match now.signed_duration_since(self.fetched_at).to_std() {
            Ok(age) => age > freshness,
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(kid: &str) -> SigningKey {
        SigningKey {
            key_id: kid.into(),
            modulus: "n".into(),
            exponent: "AQAB".into(),
            algorithm: Some("RS256".into()),
        }
    }

    #[test]
    fn find_matches_exact_kid_only() {
        let set = KeySet::new(vec![key("abc"), key("abcd")], Utc::now());
        assert_eq!(set.find("abc").map(|k| k.key_id.as_str()), Some("abc"));
        assert!(set.find("ab").is_none());
        assert!(set.find("ABC").is_none());
    }

    #[test]
    fn staleness_uses_freshness_window() {
        let fetched = Utc::now();
        let set = KeySet::new(vec![key("k1")], fetched);
        let hour = Duration::from_secs(3600);

        assert!(!set.is_stale(fetched + chrono::Duration::seconds(3600), hour));
        assert!(set.is_stale(fetched + chrono::Duration::seconds(3601), hour));
    }
}
