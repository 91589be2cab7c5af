//! Server-side session management

pub mod store;

pub use store::SessionStore;
