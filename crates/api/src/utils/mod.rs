//! Utility helpers shared by the HTTP handlers and the binary

pub mod logging;
pub mod request;
