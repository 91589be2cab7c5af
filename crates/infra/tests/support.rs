//! Shared helpers for `idgate-infra` integration tests: an RSA signing key
//! and a wiremock-backed identity provider.

#![allow(dead_code)]

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use idgate_domain::ProviderConfig;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANT: &str = "tenant-1";
pub const CLIENT_ID: &str = "client-1";
pub const REDIRECT_URI: &str = "https://app.example.com/auth/callback";

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

        Self {
            kid: kid.to_string(),
            encoding_key: EncodingKey::from_rsa_pem(pem.as_bytes()).expect("EncodingKey"),
            n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
        }
    }

    pub fn jwk(&self) -> Value {
        json!({"kty": "RSA", "use": "sig", "alg": "RS256", "kid": self.kid, "n": self.n, "e": self.e})
    }

    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding_key).expect("failed to sign token")
    }
}

pub fn primary_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| TestKey::generate("key-1"))
}

pub fn secondary_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| TestKey::generate("key-2"))
}

/// Wiremock standing in for the identity provider.
pub struct FakeProvider {
    pub server: MockServer,
}

impl FakeProvider {
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(TENANT, CLIENT_ID, REDIRECT_URI).with_authority(self.server.uri())
    }

    pub fn issuer(&self) -> String {
        self.provider_config().issuer()
    }

    /// ID token claims for `sub`, valid for an hour.
    pub fn claims_for(&self, sub: &str) -> Value {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
        json!({
            "iss": self.issuer(),
            "aud": CLIENT_ID,
            "sub": sub,
            "oid": format!("oid-{sub}"),
            "tid": TENANT,
            "name": format!("User {sub}"),
            "email": format!("{sub}@contoso.com"),
            "roles": ["Reader", "Writer"],
            "iat": now,
            "nbf": now - 5,
            "exp": now + 3600,
        })
    }

    /// Serve `keys` from the discovery endpoint, expecting `fetches` requests.
    pub async fn publish_keys(&self, keys: &[&TestKey], fetches: u64) {
        let jwks = json!({ "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>() });
        Mock::given(method("GET"))
            .and(path(format!("/{TENANT}/discovery/v2.0/keys")))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
            .expect(fetches)
            .mount(&self.server)
            .await;
    }

    /// Answer the authorization_code grant for `code` with `id_token`.
    pub async fn accept_code(&self, code: &str, id_token: &str, expires_in: i64) {
        Mock::given(method("POST"))
            .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains(format!("code={code}")))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "scope": "openid profile email User.Read",
                "expires_in": expires_in,
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "id_token": id_token,
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Answer the refresh_token grant with a rotated access token.
    pub async fn accept_refresh(&self, refresh_token: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains(format!("refresh_token={refresh_token}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "expires_in": 1800,
                "access_token": "access-2",
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }
}
