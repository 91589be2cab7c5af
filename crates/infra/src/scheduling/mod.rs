//! Background sweep scheduling
//!
//! Periodic cleanup for the in-process stores:
//! - Session sweep (expired and deactivated sessions)
//! - Token cache sweep (expired entries)
//! - Pending login purge (abandoned authorization states)
//!
//! Lifecycle is explicit: `start`/`stop`, tracked join handles and a
//! cancellation token, with a timeout on the final join.

pub mod error;
pub mod sweep_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use sweep_scheduler::{SweepJob, SweepScheduler, SweepSchedulerConfig};
