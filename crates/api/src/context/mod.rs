//! Application context - dependency injection container
//!
//! Wires the identity stores, the provider adapters and the sweep scheduler
//! from an [`IdentityConfig`]. Handlers receive the context as shared axum
//! state.

use std::sync::Arc;

use idgate_common::{Clock, SystemClock};
use idgate_core::{
    AuthStateStore, AuthorizationFlow, HybridAuthenticator, IdentityService, KeySetVerifier,
    SessionStore, TokenCache, TokenVerifier,
};
use idgate_domain::{IdentityConfig, Result};
use idgate_infra::{
    HttpClient, HttpKeySource, HttpTokenEndpoint, KeyManager, SweepScheduler,
    SweepSchedulerConfig,
};
use tokio::sync::Mutex;
use tracing::info;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: IdentityConfig,
    pub identity: Arc<IdentityService>,
    pub authenticator: Arc<HybridAuthenticator>,
    pub verifier: Arc<KeySetVerifier>,
    pub clock: Arc<dyn Clock>,
    scheduler: Mutex<SweepScheduler>,
}

impl AppContext {
    /// Build the context against the system clock.
    pub fn new(config: IdentityConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: IdentityConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let cipher = KeyManager::resolve(&config.cache, config.environment)?;
        let http = HttpClient::from_settings(&config.http)?;

        let key_source =
            Arc::new(HttpKeySource::for_provider(http.clone(), &config.provider, clock.clone()));
        let verifier = Arc::new(KeySetVerifier::for_provider(
            key_source,
            &config.provider,
            config.key_set.freshness,
            clock.clone(),
        ));
        let token_verifier: Arc<dyn TokenVerifier> = verifier.clone();

        let endpoint = Arc::new(HttpTokenEndpoint::new(http, config.provider.clone()));
        let states = Arc::new(AuthStateStore::new(clock.clone()));
        let flow = Arc::new(AuthorizationFlow::new(
            config.provider.clone(),
            endpoint,
            states.clone(),
            clock.clone(),
        ));

        let sessions = Arc::new(SessionStore::new(config.session.clone(), clock.clone()));
        let cache = Arc::new(TokenCache::new(config.cache.capacity, cipher, clock.clone()));

        let identity = Arc::new(IdentityService::new(
            flow,
            Some(token_verifier.clone()),
            sessions.clone(),
            cache.clone(),
        ));
        let authenticator = Arc::new(HybridAuthenticator::new(
            Some(token_verifier),
            sessions.clone(),
            config.auth_preference,
        ));

        let scheduler = SweepScheduler::for_stores(
            SweepSchedulerConfig::from_config(&config),
            sessions,
            cache,
            states,
        );

        info!(
            tenant = %config.provider.tenant_id,
            environment = ?config.environment,
            encryption = identity.cache().encryption_enabled(),
            "Application context initialized"
        );

        Ok(Self {
            config,
            identity,
            authenticator,
            verifier,
            clock,
            scheduler: Mutex::new(scheduler),
        })
    }

    /// Start the background sweeps. Must be called inside a tokio runtime.
    pub async fn start_background_tasks(&self) -> Result<()> {
        self.scheduler.lock().await.start()?;
        Ok(())
    }

    /// Stop the background sweeps, waiting for their tasks to finish.
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.lock().await;
        if scheduler.is_running() {
            scheduler.stop().await?;
        }
        info!("Application context shut down");
        Ok(())
    }

    pub async fn background_tasks_running(&self) -> bool {
        self.scheduler.lock().await.is_running()
    }
}
