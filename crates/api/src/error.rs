//! HTTP error responses
//!
//! Bodies follow the OAuth 2.0 error shape (`error` plus optional
//! `error_description`). Credential failures collapse to a generic
//! `unauthorized` so callers cannot probe which check failed; provider
//! callback errors are passed through.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use idgate_common::ErrorClassification;
use idgate_domain::AuthError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::logging::error_label;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Error returned by every handler.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(err) => match err {
                AuthError::InvalidToken(_)
                | AuthError::TokenExpired
                | AuthError::KeyNotFound(_)
                | AuthError::SessionNotFound
                | AuthError::SessionExpired
                | AuthError::SessionInvalid => StatusCode::UNAUTHORIZED,
                AuthError::InvalidState
                | AuthError::TokenExchangeFailed(_)
                | AuthError::TokenRefreshFailed(_)
                | AuthError::Provider { .. } => StatusCode::BAD_REQUEST,
                AuthError::CacheMiss => StatusCode::NOT_FOUND,
                AuthError::KeyFetchFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
                AuthError::Config(_) | AuthError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    /// Client-facing body. Never carries token material or upstream detail.
    pub fn body(&self) -> ErrorBody {
        let (error, description): (&str, Option<String>) = match self {
            ApiError::BadRequest(msg) => ("invalid_request", Some(msg.clone())),
            ApiError::Auth(err) => match err {
                AuthError::TokenExpired => ("token_expired", None),
                AuthError::SessionExpired => ("session_expired", None),
                AuthError::InvalidToken(_)
                | AuthError::KeyNotFound(_)
                | AuthError::SessionNotFound
                | AuthError::SessionInvalid => ("unauthorized", None),
                AuthError::InvalidState => {
                    ("invalid_request", Some("invalid or expired state".to_string()))
                }
                AuthError::TokenExchangeFailed(_) => {
                    ("invalid_grant", Some("authorization code could not be redeemed".to_string()))
                }
                AuthError::TokenRefreshFailed(_) => {
                    ("invalid_grant", Some("refresh token could not be redeemed".to_string()))
                }
                AuthError::Provider { error, description } => {
                    return ErrorBody { error: error.clone(), error_description: description.clone() };
                }
                AuthError::CacheMiss => ("not_found", None),
                AuthError::KeyFetchFailed(_) => ("temporarily_unavailable", None),
                AuthError::Config(_) | AuthError::Internal(_) => ("server_error", None),
            },
        };
        ErrorBody { error: error.to_string(), error_description: description }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Auth(err) if err.is_critical() || status.is_server_error() => {
                error!(error = %err, label = error_label(err), "Request failed");
            }
            ApiError::Auth(err) => {
                warn!(label = error_label(err), status = status.as_u16(), "Request rejected");
            }
            ApiError::BadRequest(msg) => warn!(reason = %msg, "Bad request"),
        }

        let mut response = (status, Json(self.body())).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, header::HeaderValue::from_static("Bearer"));
        }
        response
    }
}
