//! Fixed-interval sweeps for sessions, cached tokens and pending logins.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use idgate_common::{Clock, SystemClock};
//! use idgate_core::{AuthStateStore, SessionStore, TokenCache};
//! use idgate_domain::SessionConfig;
//! use idgate_infra::scheduling::{SchedulerResult, SweepScheduler, SweepSchedulerConfig};
//!
//! # async fn example() -> SchedulerResult<()> {
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let sessions = Arc::new(SessionStore::new(SessionConfig::default(), clock.clone()));
//! let cache = Arc::new(TokenCache::new(10_000, None, clock.clone()));
//! let states = Arc::new(AuthStateStore::new(clock));
//!
//! let mut scheduler =
//!     SweepScheduler::for_stores(SweepSchedulerConfig::default(), sessions, cache, states);
//! scheduler.start()?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use idgate_core::{AuthStateStore, SessionStore, TokenCache};
use idgate_domain::constants::DEFAULT_CLEANUP_INTERVAL_SECS;
use idgate_domain::IdentityConfig;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// A store that can drop its expired entries.
pub trait SweepJob: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Remove expired entries, returning how many were removed.
    fn sweep(&self) -> usize;
}

impl SweepJob for SessionStore {
    fn name(&self) -> &'static str {
        "sessions"
    }

    fn sweep(&self) -> usize {
        self.sweep_expired()
    }
}

impl SweepJob for TokenCache {
    fn name(&self) -> &'static str {
        "token_cache"
    }

    fn sweep(&self) -> usize {
        self.cleanup_expired()
    }
}

impl SweepJob for AuthStateStore {
    fn name(&self) -> &'static str {
        "auth_states"
    }

    fn sweep(&self) -> usize {
        self.purge_expired()
    }
}

/// Configuration for the sweep scheduler.
#[derive(Debug, Clone)]
pub struct SweepSchedulerConfig {
    /// Period of the session sweep.
    pub session_interval: Duration,
    /// Period of the token cache sweep.
    pub cache_interval: Duration,
    /// Period of the pending-login purge.
    pub state_interval: Duration,
    /// Timeout for awaiting each task's join handle on stop.
    pub join_timeout: Duration,
}

impl Default for SweepSchedulerConfig {
    fn default() -> Self {
        Self {
            session_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            cache_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            state_interval: Duration::from_secs(60),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl SweepSchedulerConfig {
    /// Intervals taken from the session and cache settings.
    pub fn from_config(config: &IdentityConfig) -> Self {
        Self {
            session_interval: config.session.cleanup_interval,
            cache_interval: config.cache.cleanup_interval,
            ..Self::default()
        }
    }
}

/// Sweep scheduler with explicit lifecycle management.
pub struct SweepScheduler {
    jobs: Vec<(Arc<dyn SweepJob>, Duration)>,
    join_timeout: Duration,
    handles: Vec<JoinHandle<()>>,
    cancellation: CancellationToken,
}

impl SweepScheduler {
    /// Scheduler over arbitrary jobs, each with its own period.
    pub fn new(jobs: Vec<(Arc<dyn SweepJob>, Duration)>, join_timeout: Duration) -> Self {
        Self { jobs, join_timeout, handles: Vec::new(), cancellation: CancellationToken::new() }
    }

    /// Scheduler for the three identity stores.
    pub fn for_stores(
        config: SweepSchedulerConfig,
        sessions: Arc<SessionStore>,
        cache: Arc<TokenCache>,
        states: Arc<AuthStateStore>,
    ) -> Self {
        let jobs: Vec<(Arc<dyn SweepJob>, Duration)> = vec![
            (sessions as Arc<dyn SweepJob>, config.session_interval),
            (cache as Arc<dyn SweepJob>, config.cache_interval),
            (states as Arc<dyn SweepJob>, config.state_interval),
        ];
        Self::new(jobs, config.join_timeout)
    }

    /// Spawn one task per job. Must be called inside a tokio runtime.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }
        if let Some((job, _)) = self.jobs.iter().find(|(_, period)| period.is_zero()) {
            return Err(SchedulerError::ZeroPeriod(job.name()));
        }

        self.cancellation = CancellationToken::new();
        self.handles = self
            .jobs
            .iter()
            .map(|(job, period)| {
                tokio::spawn(Self::run_job(job.clone(), *period, self.cancellation.clone()))
            })
            .collect();

        info!(jobs = self.handles.len(), "Sweep scheduler started");
        Ok(())
    }

    /// Cancel every task and wait for them to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        for handle in self.handles.drain(..) {
            tokio::time::timeout(self.join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: self.join_timeout.as_secs() })??;
        }

        info!("Sweep scheduler stopped");
        Ok(())
    }

    /// Returns true while any sweep task is active.
    pub fn is_running(&self) -> bool {
        self.handles.iter().any(|handle| !handle.is_finished())
    }

    async fn run_job(job: Arc<dyn SweepJob>, period: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; sweeping starts one period in.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(job = job.name(), "Sweep task cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = job.sweep();
                    if removed > 0 {
                        debug!(job = job.name(), removed, "Sweep removed expired entries");
                    }
                }
            }
        }
    }
}

impl Drop for SweepScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("SweepScheduler dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
