//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::{self, MemoryOrderStore, PgOrderStore};
use crate::services::{
    FsProofStore, Notifier, NotifyError, OrderLifecycle, OrderStore, RandomCodeGenerator,
    default_notifier,
};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("email client setup failed: {0}")]
    Notifier(#[from] NotifyError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    lifecycle: OrderLifecycle,
    mailer: Option<Arc<dyn Notifier>>,
}

impl AppState {
    /// Assemble state from parts.
    ///
    /// `mailer` backs `POST /api/email`; `None` makes that endpoint answer
    /// with a misconfiguration error.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        lifecycle: OrderLifecycle,
        mailer: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                lifecycle,
                mailer,
            }),
        }
    }

    /// Build the production wiring from configuration.
    ///
    /// Uses `PostgreSQL` when `DATABASE_URL` is set and an in-memory store
    /// otherwise. Email goes through Mailgun when configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable or the email client
    /// cannot be built.
    pub async fn from_config(config: ApiConfig) -> Result<Self, StateError> {
        let store: Arc<dyn OrderStore> = match &config.database_url {
            Some(url) => {
                let pool = db::create_pool(url).await?;
                tracing::info!("Database pool created");
                Arc::new(PgOrderStore::new(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; orders are kept in memory only");
                Arc::new(MemoryOrderStore::new())
            }
        };

        let notifier = default_notifier(&config)?;
        let mailer = config.mailgun.is_some().then(|| Arc::clone(&notifier));

        let lifecycle = OrderLifecycle::new(
            store,
            notifier,
            Arc::new(FsProofStore::new(&config.proof_store_dir)),
            Arc::new(RandomCodeGenerator),
            config.lifecycle.clone(),
        );

        Ok(Self::new(config, lifecycle, mailer))
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the order lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> &OrderLifecycle {
        &self.inner.lifecycle
    }

    /// Email client for the relay endpoint, if configured.
    #[must_use]
    pub fn mailer(&self) -> Option<&Arc<dyn Notifier>> {
        self.inner.mailer.as_ref()
    }
}
