//! Infrastructure error types and conversions into [`AuthError`].
//!
//! [`AuthError`]: idgate_domain::AuthError

pub mod conversions;

pub use conversions::TransportError;
