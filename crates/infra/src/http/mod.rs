//! HTTP adapters for the identity provider

pub mod client;
pub mod jwks_client;
pub mod token_client;

pub use client::{HttpClient, HttpClientBuilder};
pub use jwks_client::HttpKeySource;
pub use token_client::HttpTokenEndpoint;
