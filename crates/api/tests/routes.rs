//! Route-level tests driving the axum router with `oneshot` against a fake
//! identity provider.

mod support;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use support::{json_request, TestApp};

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::start().await;
    let reply = app.get("/health").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert_eq!(reply.body["sessions"], 0);
}

/// Validates the login redirect payload.
///
/// Assertions:
/// - The URL targets the tenant authorize endpoint with an S256 challenge.
/// - The state in the body is the one embedded in the URL.
/// - The response is marked non-cacheable.
#[tokio::test]
async fn login_returns_authorization_url() {
    let app = TestApp::start().await;
    let reply = app.get("/auth/login").await;

    assert_eq!(reply.status, StatusCode::OK);
    let url = reply.body["authorization_url"].as_str().unwrap();
    let state = reply.body["state"].as_str().unwrap();
    assert!(url.contains("/tenant-1/oauth2/v2.0/authorize?client_id=client-1"));
    assert!(url.contains(&format!("&state={state}&")));
    assert!(url.contains("code_challenge_method=S256"));
    assert_eq!(reply.body["expires_in"], 300);
    assert_eq!(reply.headers[header::CACHE_CONTROL], "no-store");
}

/// Validates the complete browser login and the session endpoints.
///
/// Assertions:
/// - The callback sets an HttpOnly `session_id` cookie.
/// - `/auth/me` resolves the identity from the cookie and from a bearer token.
/// - Introspection reports the user and never the tokens.
/// - Logout removes the session and returns the provider logout URL.
#[tokio::test]
async fn login_session_and_logout() {
    let app = TestApp::start().await;
    app.publish_keys(1).await;
    app.accept_code("code-1", &app.id_token_for("user-1")).await;

    let login = app.get("/auth/login").await;
    let state = login.body["state"].as_str().unwrap().to_string();
    let callback = app.get(&format!("/auth/callback?code=code-1&state={state}")).await;
    assert_eq!(callback.status, StatusCode::OK);
    assert_eq!(callback.body["user_id"], "user-1");
    let session_id = callback.body["session_id"].as_str().unwrap().to_string();
    let cookie = callback.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with(&format!("session_id={session_id};")));
    assert!(cookie.contains("HttpOnly"));

    let me = app
        .send(
            Request::get("/auth/me")
                .header(header::COOKIE, format!("session_id={session_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user_id"], "user-1");
    assert_eq!(me.body["source"], "session");

    let me = app
        .send(
            Request::get("/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", app.id_token_for("user-1")))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["source"], "bearer");
    assert_eq!(me.body["username"], "user-1@contoso.com");

    let session = app
        .send(
            Request::get("/auth/session")
                .header("X-Session-ID", &session_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(session.status, StatusCode::OK);
    assert_eq!(session.body["user_id"], "user-1");
    assert!(session.body.get("access_token").is_none());

    let logout = app
        .send(
            Request::get("/auth/logout")
                .header("X-Session-ID", &session_id)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert!(logout.body["logout_url"].as_str().unwrap().contains("/tenant-1/oauth2/v2.0/logout"));
    assert!(app.ctx.identity.sessions().get(&session_id).is_err());
    assert!(app.ctx.identity.cache().get("user-1").is_err());
}

#[tokio::test]
async fn unknown_state_is_invalid_request() {
    let app = TestApp::start().await;
    let reply = app.get("/auth/callback?code=code-1&state=forged").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "invalid_request");
}

#[tokio::test]
async fn provider_error_is_passed_through() {
    let app = TestApp::start().await;
    let reply = app
        .get("/auth/callback?error=access_denied&error_description=User%20cancelled")
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "access_denied");
    assert_eq!(reply.body["error_description"], "User cancelled");
}

/// Validates that failed authentication reveals nothing specific.
#[tokio::test]
async fn me_rejects_missing_and_unknown_credentials() {
    let app = TestApp::start().await;

    let reply = app.get("/auth/me").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body, json!({"error": "unauthorized"}));
    assert_eq!(reply.headers[header::WWW_AUTHENTICATE], "Bearer");

    let reply = app
        .send(
            Request::get("/auth/me")
                .header("X-Session-ID", "no-such-session")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body, json!({"error": "unauthorized"}));
}

#[tokio::test]
async fn session_extension_moves_expiry() {
    let app = TestApp::start().await;
    app.publish_keys(1).await;
    let session_id = app.login_as("user-2").await;
    let before = app.ctx.identity.sessions().get(&session_id).unwrap().expires_at;

    let mut request = json_request("POST", "/auth/session/extend", &json!({"seconds": 600}));
    request.headers_mut().insert("x-session-id", session_id.parse().unwrap());
    let reply = app.send(request).await;

    assert_eq!(reply.status, StatusCode::OK);
    let after = app.ctx.identity.sessions().get(&session_id).unwrap().expires_at;
    assert_eq!((after - before).num_seconds(), 600);

    let mut request = json_request("POST", "/auth/session/extend", &json!({"seconds": 0}));
    request.headers_mut().insert("x-session-id", session_id.parse().unwrap());
    assert_eq!(app.send(request).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_delete_is_idempotent() {
    let app = TestApp::start().await;
    for _ in 0..2 {
        let reply = app
            .send(
                Request::delete("/auth/session")
                    .header("X-Session-ID", "gone")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
    }
}

/// Validates the refresh passthrough.
///
/// Assertions:
/// - A redeemed refresh token returns the provider's new access token.
/// - A malformed body is rejected before reaching the provider.
#[tokio::test]
async fn refresh_redeems_token() {
    let app = TestApp::start().await;
    app.accept_refresh("refresh-1").await;

    let reply = app
        .send(json_request("POST", "/auth/refresh", &json!({"refresh_token": "refresh-1"})))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["access_token"], "access-2");
    assert_eq!(reply.headers[header::CACHE_CONTROL], "no-store");

    let reply = app.send(json_request("POST", "/auth/refresh", &json!({"token": "x"}))).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "invalid_request");
}

#[tokio::test]
async fn rejected_refresh_hides_provider_detail() {
    let app = TestApp::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .respond_with(
            wiremock::ResponseTemplate::new(400)
                .set_body_json(json!({"error": "invalid_grant", "error_description": "AADSTS70000"})),
        )
        .mount(&app.provider)
        .await;

    let reply = app
        .send(json_request("POST", "/auth/refresh", &json!({"refresh_token": "stale"})))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "invalid_grant");
    assert!(!reply.body.to_string().contains("AADSTS"));
}

#[tokio::test]
async fn cache_admin_reports_and_clears() {
    let app = TestApp::start().await;
    app.publish_keys(1).await;
    app.login_as("user-3").await;

    let stats = app.get("/admin/cache/stats").await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["stats"]["total_entries"], 1);
    assert_eq!(stats.body["capacity"], 10_000);
    assert_eq!(stats.body["encryption_enabled"], true);

    let cleared = app.send(Request::post("/admin/cache/clear").body(Body::empty()).unwrap()).await;
    assert_eq!(cleared.status, StatusCode::NO_CONTENT);
    assert!(app.ctx.identity.cache().is_empty());
}

#[tokio::test]
async fn background_tasks_start_and_stop() {
    let app = TestApp::start().await;
    app.ctx.start_background_tasks().await.unwrap();
    assert!(app.ctx.background_tasks_running().await);
    assert!(app.ctx.start_background_tasks().await.is_err());

    app.ctx.shutdown().await.unwrap();
    assert!(!app.ctx.background_tasks_running().await);
}
