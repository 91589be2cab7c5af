//! # idgate Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - HTTP adapters for the provider key-discovery and token endpoints
//! - Environment configuration loading
//! - Encryption key resolution for the token cache
//! - Background sweep scheduling
//!
//! ## Architecture
//! - Implements traits defined in `idgate-core`
//! - Contains all "impure" code (network, environment, timers)

pub mod config;
pub mod errors;
pub mod http;
pub mod key_manager;
pub mod scheduling;

// Re-export commonly used items
pub use errors::TransportError;
pub use http::*;
pub use key_manager::*;
pub use scheduling::{SweepScheduler, SweepSchedulerConfig};
