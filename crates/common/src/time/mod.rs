//! Time abstractions.
//!
//! Every expiry decision in idgate (sessions, cached tokens, pending login
//! states, key set freshness) reads the wall clock through [`Clock`] so that
//! TTL boundaries can be tested deterministically with [`MockClock`].

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
