//! HTTP routes
//!
//! - [`auth`]: login, callback, refresh, logout and `/auth/me`
//! - [`session`]: session introspection, deletion and extension
//! - [`admin`]: token cache statistics and clearing
//! - [`health`]: liveness

pub mod admin;
pub mod auth;
pub mod health;
pub mod session;

use std::sync::Arc;

use axum::http::header;
use axum::routing::{get, post};
use axum::Router;

use crate::context::AppContext;

/// Headers for responses that carry tokens or session ids.
pub(crate) type NoStoreHeaders = [(header::HeaderName, &'static str); 2];
pub(crate) const NO_STORE: NoStoreHeaders =
    [(header::CACHE_CONTROL, "no-store"), (header::PRAGMA, "no-cache")];

/// Build the application router over a shared context.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/session", get(session::get_session).delete(session::delete_session))
        .route("/auth/session/extend", post(session::extend_session))
        .route("/admin/cache/stats", get(admin::cache_stats))
        .route("/admin/cache/clear", post(admin::clear_cache))
        .route("/health", get(health::health))
        .with_state(ctx)
}
