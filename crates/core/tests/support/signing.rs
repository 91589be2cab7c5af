//! RSA test keys and token minting

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use idgate_domain::SigningKey;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};

pub const ISSUER: &str = "https://login.microsoftonline.com/tenant-1/v2.0";
pub const AUDIENCE: &str = "client-1";

/// RSA-2048 key pair published under a key id.
pub struct TestKey {
    pub kid: String,
    encoding_key: EncodingKey,
    n: String,
    e: String,
}

impl TestKey {
    pub fn generate(kid: &str) -> Self {
        let private_key =
            RsaPrivateKey::new(&mut OsRng, 2048).expect("failed to generate RSA-2048 key");
        let public_key = RsaPublicKey::from(&private_key);
        let pem = private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .expect("failed to export RSA key as PKCS8 PEM");
        let encoding_key =
            EncodingKey::from_rsa_pem(pem.as_bytes()).expect("failed to build EncodingKey");

        Self {
            kid: kid.to_string(),
            encoding_key,
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    }

    /// Public half as the provider would publish it.
    pub fn signing_key(&self) -> SigningKey {
        SigningKey {
            key_id: self.kid.clone(),
            modulus: self.n.clone(),
            exponent: self.e.clone(),
            algorithm: Some("RS256".into()),
        }
    }

    /// JWKS document containing this key.
    pub fn jwks(&self) -> Value {
        json!({
            "keys": [{
                "kty": "RSA", "use": "sig", "alg": "RS256",
                "kid": self.kid, "n": self.n, "e": self.e
            }]
        })
    }

    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding_key).expect("failed to sign token")
    }
}

/// Key shared by every test in the binary; generation is slow.
pub fn primary_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| TestKey::generate("key-1"))
}

pub fn secondary_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| TestKey::generate("key-2"))
}

pub fn now_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("clock before epoch").as_secs() as i64
}

/// Claims valid for an hour for `sub`.
pub fn claims_for(sub: &str) -> Value {
    let now = now_secs();
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": sub,
        "oid": format!("oid-{sub}"),
        "tid": "tenant-1",
        "preferred_username": format!("{sub}@contoso.com"),
        "roles": ["Reader"],
        "iat": now,
        "nbf": now - 5,
        "exp": now + 3600,
    })
}
