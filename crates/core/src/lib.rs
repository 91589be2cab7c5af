//! # idgate Core
//!
//! Identity business logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Token verification against the provider's published key set
//! - The PKCE login flow and its pending-state store
//! - The session store and the encrypted token cache
//! - Hybrid bearer/session authentication and the identity orchestrator
//!
//! ## Architecture Principles
//! - Only depends on `idgate-common` and `idgate-domain`
//! - No HTTP: the provider is reached through the [`KeySource`] and
//!   [`TokenEndpoint`] ports implemented in `idgate-infra`
//! - Shared tables sit behind reader/writer locks that are never held across
//!   an `.await`

pub mod auth;
pub mod identity;
pub mod session;
pub mod token_cache;

pub use auth::ports::{KeySource, TokenEndpoint, TokenVerifier};
pub use auth::{AuthStateStore, AuthorizationFlow, HybridAuthenticator, KeySetVerifier};
pub use identity::{IdentityService, LoginOutcome};
pub use session::SessionStore;
pub use token_cache::{BatchOutcome, TokenCache};
