//! Authentication: provider ports, token verification, the login flow and
//! hybrid credential resolution.

pub mod flow;
pub mod hybrid;
pub mod ports;
pub mod state_store;
pub mod verifier;

pub use flow::AuthorizationFlow;
pub use hybrid::HybridAuthenticator;
pub use state_store::AuthStateStore;
pub use verifier::KeySetVerifier;
