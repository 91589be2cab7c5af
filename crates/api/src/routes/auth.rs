//! Login, callback, refresh and logout handlers

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use chrono::{DateTime, Utc};
use idgate_domain::{AuthenticatedIdentity, CallbackParams, Environment, LoginRedirect};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::NO_STORE;
use crate::context::AppContext;
use crate::error::{ApiError, ApiResult};
use crate::utils::request::{bearer_token, clear_session_cookie, session_cookie, session_id};

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub session_id: String,
    pub user_id: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub logout_url: String,
}

pub async fn login(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let redirect: LoginRedirect = ctx.identity.begin_login();
    (NO_STORE, Json(redirect))
}

/// Provider redirect target. Establishes the session and sets its cookie.
#[instrument(skip_all)]
pub async fn callback(
    State(ctx): State<Arc<AppContext>>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<impl IntoResponse> {
    let outcome = ctx.identity.complete_login(&params).await?;
    let session = outcome.session;

    let max_age = session.expires_at.signed_duration_since(ctx.clock.now()).num_seconds();
    let secure = ctx.config.environment == Environment::Production;
    let cookie = session_cookie(&session.id, max_age, secure);

    info!(user_id = %session.user_id, "Session established");
    Ok((
        NO_STORE,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(CallbackResponse {
            session_id: session.id,
            user_id: session.user_id,
            username: outcome.claims.username,
            expires_at: session.expires_at,
        }),
    ))
}

/// Redeem a refresh token presented by the caller.
pub async fn refresh(
    State(ctx): State<Arc<AppContext>>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if request.refresh_token.trim().is_empty() {
        return Err(ApiError::BadRequest("refresh_token is required".into()));
    }
    let tokens = ctx.identity.refresh(&request.refresh_token).await?;
    Ok((NO_STORE, Json(tokens)))
}

pub async fn me(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> ApiResult<Json<AuthenticatedIdentity>> {
    let bearer = bearer_token(&headers);
    let session = session_id(&headers);
    let identity =
        ctx.authenticator.authenticate(bearer.as_deref(), session.as_deref()).await?;
    Ok(Json(identity))
}

/// End the caller's session, if any, and hand back the provider logout URL.
pub async fn logout(State(ctx): State<Arc<AppContext>>, headers: HeaderMap) -> impl IntoResponse {
    let logout_url = match session_id(&headers) {
        Some(id) => ctx.identity.logout(&id),
        None => ctx.identity.flow().logout_url(),
    };
    (
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        Json(LogoutResponse { logout_url }),
    )
}
