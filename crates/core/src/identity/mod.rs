//! Identity orchestration: login, refresh and logout across the flow,
//! session store and token cache.

pub mod service;

pub use service::{IdentityService, LoginOutcome};
