//! Shared helpers for `idgate-api` route tests: a signing key, a
//! wiremock-backed identity provider and a router built over it.

#![allow(dead_code)]

use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use idgate_api::{router, AppContext};
use idgate_domain::{IdentityConfig, ProviderConfig};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANT: &str = "tenant-1";
pub const CLIENT_ID: &str = "client-1";
pub const REDIRECT_URI: &str = "https://app.example.com/auth/callback";

pub struct TestKey {
    pub kid: String,
    encoding_key: EncodingKey,
    n: String,
    e: String,
}

impl TestKey {
    fn generate(kid: &str) -> Self {
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

    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        encode(&header, claims, &self.encoding_key).expect("failed to sign token")
    }
}

pub fn signing_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| TestKey::generate("api-key-1"))
}

/// Router over a context whose provider is a wiremock server.
pub struct TestApp {
    pub provider: MockServer,
    pub ctx: Arc<AppContext>,
    pub router: Router,
}

impl TestApp {
    pub async fn start() -> Self {
        let provider = MockServer::start().await;
        let provider_config = ProviderConfig::new(TENANT, CLIENT_ID, REDIRECT_URI)
            .with_authority(provider.uri());
        let config = IdentityConfig::new(provider_config);
        let ctx = Arc::new(AppContext::new(config).expect("application context"));
        let router = router(ctx.clone());
        Self { provider, ctx, router }
    }

    pub fn id_token_for(&self, sub: &str) -> String {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
        let issuer = self.ctx.config.provider.issuer();
        signing_key().sign(&json!({
            "iss": issuer,
            "aud": CLIENT_ID,
            "sub": sub,
            "preferred_username": format!("{sub}@contoso.com"),
            "roles": ["Reader"],
            "iat": now,
            "exp": now + 3600,
        }))
    }

    pub async fn publish_keys(&self, fetches: u64) {
        let key = signing_key();
        let jwks = json!({"keys": [{
            "kty": "RSA", "use": "sig", "alg": "RS256",
            "kid": key.kid, "n": key.n, "e": key.e,
        }]});
        Mock::given(method("GET"))
            .and(path(format!("/{TENANT}/discovery/v2.0/keys")))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
            .expect(fetches)
            .mount(&self.provider)
            .await;
    }

    pub async fn accept_code(&self, code: &str, id_token: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/{TENANT}/oauth2/v2.0/token")))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains(format!("code={code}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "expires_in": 3600,
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "id_token": id_token,
            })))
            .expect(1)
            .mount(&self.provider)
            .await;
    }

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
            .mount(&self.provider)
            .await;
    }

    /// Drive one request through the router.
    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        Reply { status, headers, body }
    }

    pub async fn get(&self, uri: &str) -> Reply {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// Run the login redirect and callback, returning the session id.
    pub async fn login_as(&self, sub: &str) -> String {
        self.accept_code("code-1", &self.id_token_for(sub)).await;
        let login = self.get("/auth/login").await;
        let state = login.body["state"].as_str().expect("state").to_string();
        let reply = self.get(&format!("/auth/callback?code=code-1&state={state}")).await;
        assert_eq!(reply.status, StatusCode::OK, "callback failed: {}", reply.body);
        reply.body["session_id"].as_str().expect("session_id").to_string()
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
