//! Shared cryptographic primitives used by the token cache.

pub mod encryption;

pub use encryption::{EncryptedData, EncryptionService};
