//! Encrypted, TTL-bounded token cache
//!
//! One entry per user, last write wins. When encryption is enabled the token
//! fields are sealed with AES-256-GCM before they enter the table; a payload
//! that no longer opens (corrupted, or sealed under a rotated key) reads as a
//! miss.

pub mod cache;

pub use cache::{BatchOutcome, TokenCache};
