//! Liveness endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;

/// Health payload
///
/// ```json
/// { "status": "ok", "version": "0.1.0", "sessions": 3, "cached_tokens": 2, "signing_keys": 2 }
/// ```
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub sessions: usize,
    pub cached_tokens: usize,
    pub signing_keys: usize,
}

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: ctx.identity.sessions().count(),
        cached_tokens: ctx.identity.cache().len(),
        signing_keys: ctx.verifier.cached_key_count(),
    })
}
