//! OAuth 2.0 primitives shared by the login flow.
//!
//! - **[`pkce`]**: RFC 7636 verifier/challenge generation and opaque state
//!   tokens

pub mod pkce;

pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_code_verifier_with_len,
    generate_state, validate_state, PKCEChallenge,
};
