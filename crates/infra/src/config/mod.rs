//! Configuration loading
//!
//! This module loads the identity configuration from environment variables.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env};
