//! Token cache administration

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use idgate_domain::CacheHealth;
use tracing::info;

use crate::context::AppContext;

pub async fn cache_stats(State(ctx): State<Arc<AppContext>>) -> Json<CacheHealth> {
    Json(ctx.identity.cache().health())
}

pub async fn clear_cache(State(ctx): State<Arc<AppContext>>) -> StatusCode {
    let removed = ctx.identity.cache().clear();
    info!(removed, "Token cache cleared");
    StatusCode::NO_CONTENT
}
