//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::services::MailerClient;
use crate::stripe::StripeClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    stripe: StripeClient,
    mailer: Option<MailerClient>,
}

impl AppState {
    /// Build the shared state, constructing the outbound API clients.
    ///
    /// # Errors
    ///
    /// Returns error if a client fails to build from its configuration.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, AppError> {
        let stripe = StripeClient::new(&config.stripe)?;
        let mailer = config
            .mailer
            .as_ref()
            .map(MailerClient::new)
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stripe,
                mailer,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn stripe(&self) -> &StripeClient {
        &self.inner.stripe
    }

    /// The mail relay client, when configured.
    #[must_use]
    pub fn mailer(&self) -> Option<&MailerClient> {
        self.inner.mailer.as_ref()
    }
}
