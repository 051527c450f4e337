//! Storefront wiring: configuration, shared collaborators, and factories for
//! per-shopper engines.

pub mod config;

use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tracing::info;

use storefront_catalog::CatalogStream;
use storefront_compare::ComparisonSession;
use storefront_core::CurrentIdentity;
use storefront_infra::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, PersistenceAdapter, StoreError};
use storefront_rewards::{
    NotificationDispatcher, NotificationTransport, RevealScheduler, RewardWheelEngine, TokioScheduler,
};

pub use crate::config::{ConfigError, StorefrontConfig, ValidationError};

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("state store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Shared collaborators for every shopper session.
pub struct Storefront {
    config: StorefrontConfig,
    catalog: Arc<dyn CatalogStream>,
    persistence: PersistenceAdapter,
    scheduler: Arc<dyn RevealScheduler>,
    notifier: NotificationDispatcher,
}

impl Storefront {
    /// Validate `config`, open the configured state store and wire the
    /// engines' collaborators onto `runtime`.
    pub fn new(
        config: StorefrontConfig,
        catalog: Arc<dyn CatalogStream>,
        transport: Arc<dyn NotificationTransport>,
        runtime: Handle,
    ) -> Result<Self, StorefrontError> {
        config.validate().map_err(ConfigError::from)?;

        let store: Arc<dyn KeyValueStore> = match &config.storage.path {
            Some(path) => {
                info!(path = %path.display(), "using file state store");
                Arc::new(FileKeyValueStore::open(path.clone())?)
            }
            None => {
                info!("using in-memory state store");
                Arc::new(InMemoryKeyValueStore::new())
            }
        };

        let notifier = NotificationDispatcher::new(
            catalog.clone(),
            transport,
            (&config.notification).into(),
            runtime.clone(),
        );

        Ok(Self {
            persistence: PersistenceAdapter::new(store),
            scheduler: Arc::new(TokioScheduler::new(runtime)),
            catalog,
            notifier,
            config,
        })
    }

    /// Replace the reveal scheduler (tests drive reveals by hand).
    pub fn with_scheduler(mut self, scheduler: Arc<dyn RevealScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn persistence(&self) -> &PersistenceAdapter {
        &self.persistence
    }

    /// Start a comparison session for `identity`.
    pub async fn comparison(&self, identity: &CurrentIdentity) -> ComparisonSession {
        ComparisonSession::start(self.catalog.as_ref(), self.persistence.clone(), identity).await
    }

    /// Reward wheel for `identity`.
    pub fn wheel(&self, identity: CurrentIdentity) -> RewardWheelEngine {
        RewardWheelEngine::new(identity, self.persistence.clone(), self.scheduler.clone())
            .with_reveal_delay(self.config.wheel.reveal_delay())
            .with_notifier(self.notifier.clone())
    }
}

impl core::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.config)
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}
