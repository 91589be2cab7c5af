//! Session introspection and lifecycle handlers

use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use chrono::{DateTime, Utc};
use idgate_domain::{AuthError, Session};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::{ApiError, ApiResult};
use crate::utils::request::{clear_session_cookie, session_id};

/// Public view of a session. Tokens are never included.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub user_id: String,
    pub username: Option<String>,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        Self {
            username: session.username().map(str::to_string),
            roles: session.roles(),
            session_id: session.id,
            user_id: session.user_id,
            created_at: session.created_at,
            last_accessed_at: session.last_accessed_at,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtendRequest {
    pub seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct ExtendResponse {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

fn require_session_id(headers: &HeaderMap) -> Result<String, ApiError> {
    session_id(headers).ok_or(ApiError::Auth(AuthError::SessionNotFound))
}

pub async fn get_session(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionView>> {
    let id = require_session_id(&headers)?;
    let session = ctx.identity.sessions().validate(&id)?;
    Ok(Json(session.into()))
}

/// Idempotent: unknown or missing sessions still answer 204.
pub async fn delete_session(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(id) = session_id(&headers) {
        ctx.identity.sessions().delete(&id);
    }
    (StatusCode::NO_CONTENT, AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]))
}

pub async fn extend_session(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Result<Json<ExtendRequest>, JsonRejection>,
) -> ApiResult<Json<ExtendResponse>> {
    let id = require_session_id(&headers)?;
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if request.seconds == 0 {
        return Err(ApiError::BadRequest("seconds must be positive".into()));
    }

    let session = ctx.identity.sessions().extend(&id, Duration::from_secs(request.seconds))?;
    Ok(Json(ExtendResponse { session_id: session.id, expires_at: session.expires_at }))
}
