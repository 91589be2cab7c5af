//! Shared test helpers for `idgate-core` integration tests.
//!
//! These helpers provide an RSA signing key, token minting and in-memory
//! provider ports so that tests can focus on behaviour instead of
//! boilerplate.

#![allow(dead_code)]

pub mod provider;
pub mod signing;
