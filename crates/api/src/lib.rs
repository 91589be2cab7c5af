//! # idgate API
//!
//! HTTP surface over the identity services: the PKCE login redirect and
//! callback, token refresh, session management, hybrid `/auth/me`
//! authentication and token cache administration.

pub mod context;
pub mod error;
pub mod routes;
pub mod utils;

pub use context::AppContext;
pub use error::{ApiError, ApiResult};
pub use routes::router;
