//! # idgate Domain
//!
//! Identity domain types for idgate.
//!
//! This crate contains:
//! - Signing keys, login state, sessions, cached tokens and verified claims
//! - The `AuthError` taxonomy and Result definition
//! - Configuration structures and endpoint builders
//! - Domain constants
//!
//! ## Architecture
//! - Depends only on `idgate-common` (foundation tier)
//! - No I/O, no locking
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
