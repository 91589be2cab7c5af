//! End-to-end tests of the HTTP adapters against a fake identity provider
//!
//! The full login path runs through `IdentityService` with the reqwest-backed
//! key source and token endpoint, so everything below the HTTP surface is
//! exercised together.

mod support;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use idgate_common::{Clock, EncryptionService, SystemClock};
use idgate_core::{
    AuthStateStore, AuthorizationFlow, IdentityService, KeySetVerifier, SessionStore, TokenCache,
    TokenVerifier,
};
use idgate_domain::{AuthError, CallbackParams, SessionConfig};
use idgate_infra::{HttpClient, HttpKeySource, HttpTokenEndpoint};
use support::{primary_key, secondary_key, FakeProvider, CLIENT_ID};

fn http() -> HttpClient {
    HttpClient::builder().timeout(Duration::from_secs(5)).build().expect("http client")
}

fn verifier(provider: &FakeProvider) -> KeySetVerifier {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let config = provider.provider_config();
    let source = Arc::new(HttpKeySource::for_provider(http(), &config, clock.clone()));
    KeySetVerifier::new(source, config.issuer(), CLIENT_ID, Duration::from_secs(3600), clock)
}

fn service(provider: &FakeProvider) -> IdentityService {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let config = provider.provider_config();
    let endpoint = Arc::new(HttpTokenEndpoint::new(http(), config.clone()));
    let states = Arc::new(AuthStateStore::new(clock.clone()));
    let flow = Arc::new(AuthorizationFlow::new(config, endpoint, states, clock.clone()));
    let verifier: Arc<dyn TokenVerifier> = Arc::new(verifier(provider));
    let sessions = Arc::new(SessionStore::new(SessionConfig::default(), clock.clone()));
    let cipher = EncryptionService::new(EncryptionService::generate_key()).expect("cipher");
    let cache = Arc::new(TokenCache::new(100, Some(cipher), clock));
    IdentityService::new(flow, Some(verifier), sessions, cache)
}

/// Validates the complete login against the fake provider.
///
/// Assertions:
/// - The token endpoint receives the code and a PKCE verifier.
/// - The ID token is verified against the published key.
/// - The session belongs to the token subject and expires within the token
///   lifetime.
#[tokio::test]
async fn login_round_trip_against_provider() {
    let provider = FakeProvider::start().await;
    provider.publish_keys(&[primary_key()], 1).await;
    let id_token = primary_key().sign(&provider.claims_for("user-7"));
    provider.accept_code("xyz", &id_token, 3600).await;

    let service = service(&provider);
    let redirect = service.begin_login();
    assert!(redirect
        .authorization_url
        .starts_with(&format!("{}/tenant-1/oauth2/v2.0/authorize?client_id=client-1", provider.server.uri())));

    let before = Utc::now();
    let outcome = service
        .complete_login(&CallbackParams {
            code: Some("xyz".into()),
            state: Some(redirect.state.clone()),
            ..Default::default()
        })
        .await
        .expect("login");

    assert_eq!(outcome.session.user_id, "user-7");
    assert!(outcome.session.expires_at >= before + chrono::Duration::seconds(3600));
    assert!(outcome.session.expires_at <= Utc::now() + chrono::Duration::seconds(3600));
    assert_eq!(outcome.claims.username, "user-7@contoso.com");
    assert_eq!(outcome.claims.roles, vec!["Reader", "Writer"]);
    assert_eq!(outcome.claims.object_id.as_deref(), Some("oid-user-7"));

    let sessions = service.sessions().list_for_user("user-7");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn silent_refresh_round_trip() {
    let provider = FakeProvider::start().await;
    provider.publish_keys(&[primary_key()], 1).await;
    let id_token = primary_key().sign(&provider.claims_for("user-8"));
    provider.accept_code("xyz", &id_token, 3600).await;
    provider.accept_refresh("refresh-1").await;

    let service = service(&provider);
    let redirect = service.begin_login();
    let outcome = service
        .complete_login(&CallbackParams {
            code: Some("xyz".into()),
            state: Some(redirect.state),
            ..Default::default()
        })
        .await
        .expect("login");

    let tokens = service.silent_refresh("user-8").await.expect("refresh");
    assert_eq!(tokens.access_token, "access-2");
    assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-1"));

    let session = service.sessions().get(&outcome.session.id).expect("session");
    assert_eq!(session.access_token, "access-2");
    assert_eq!(service.cache().get("user-8").expect("cached").access_token, "access-2");
}

/// Validates that an unknown `kid` triggers exactly one extra fetch.
#[tokio::test]
async fn unknown_key_refetches_once_then_fails() {
    let provider = FakeProvider::start().await;
    provider.publish_keys(&[primary_key()], 2).await;
    let verifier = verifier(&provider);

    let good = primary_key().sign(&provider.claims_for("u1"));
    verifier.verify(&good).await.expect("cold verify fetches once");

    let foreign = secondary_key().sign(&provider.claims_for("u1"));
    let err = verifier.verify(&foreign).await.unwrap_err();
    assert!(matches!(err, AuthError::KeyNotFound(_)));
    // expect(2) on the mock is checked when the server drops
}

#[tokio::test]
async fn rotated_key_is_picked_up() {
    let provider = FakeProvider::start().await;
    provider.publish_keys(&[primary_key(), secondary_key()], 1).await;
    let verifier = verifier(&provider);

    let claims = verifier
        .verify(&secondary_key().sign(&provider.claims_for("u2")))
        .await
        .expect("verify");
    assert_eq!(claims.subject, "u2");
    assert_eq!(verifier.cached_key_count(), 2);
}

#[tokio::test]
async fn unreachable_key_endpoint_is_key_fetch_failure() {
    let provider = FakeProvider::start().await;
    let verifier = verifier(&provider);

    let token = primary_key().sign(&provider.claims_for("u3"));
    let err = verifier.verify(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::KeyFetchFailed(_)));
}

#[tokio::test]
async fn rejected_code_leaves_no_session() {
    let provider = FakeProvider::start().await;
    let service = service(&provider);
    let redirect = service.begin_login();

    let err = service
        .complete_login(&CallbackParams {
            code: Some("unknown-code".into()),
            state: Some(redirect.state),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::TokenExchangeFailed(_)));
    assert_eq!(service.sessions().count(), 0);
}
