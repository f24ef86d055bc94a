use std::{fmt, sync::Arc};

use anyhow::{Context, anyhow};
use tracing::info;

use crate::infra::config::{Config, PaymentProvider, StorageBackend};
use repomart_core::application::{AppUnitOfWork, Marketplace};
use repomart_core::auth::AuthCrypto;
use repomart_core::clock::{Clock, SystemClock};
use repomart_core::database::{MemoryStore, PostgresDatabase};
use repomart_core::payments::PaymentGateway;
use repomart_core::payments::manual::ManualGateway;
use repomart_core::payments::stripe::StripeGateway;

#[derive(Clone)]
pub struct AppState {
    pub market: Arc<Marketplace>,
    pub config: Arc<Config>,
    /// Present when the PostgreSQL backend is active.
    pub postgres: Option<Arc<PostgresDatabase>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("storage_backend", &self.config.storage_backend)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn market(&self) -> &Marketplace {
        &self.market
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connect storage and the payment gateway described by `config` and wire
    /// every service on top of them.
    pub async fn build(config: Arc<Config>) -> anyhow::Result<Self> {
        let (uow, postgres) = match config.storage_backend {
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("DATABASE_URL is not set"))?;
                let db = PostgresDatabase::connect(url)
                    .await
                    .context("failed to connect to PostgreSQL")?;
                db.migrate().await.context("database migration failed")?;
                let uow = AppUnitOfWork::from_postgres(&db);
                (uow, Some(Arc::new(db)))
            }
            StorageBackend::Memory => {
                info!("using in-memory storage; data is lost on restart");
                (AppUnitOfWork::in_memory(Arc::new(MemoryStore::new())), None)
            }
        };

        let gateway: Arc<dyn PaymentGateway> = match config.payment_provider {
            PaymentProvider::Stripe => {
                let secret_key = config
                    .stripe_secret_key
                    .clone()
                    .ok_or_else(|| anyhow!("STRIPE_SECRET_KEY is not set"))?;
                Arc::new(
                    StripeGateway::new(
                        &config.stripe_api_base,
                        secret_key,
                        config.stripe_webhook_secret.as_bytes(),
                    )
                    .context("failed to build payment gateway")?,
                )
            }
            PaymentProvider::Manual => {
                Arc::new(ManualGateway::new(config.stripe_webhook_secret.as_bytes()))
            }
        };

        let crypto = AuthCrypto::new(&config.auth_password_pepper, &config.auth_token_key)
            .context("failed to initialise password hashing")?;

        Self::assemble(config, uow, Arc::new(crypto), gateway, Arc::new(SystemClock), postgres)
    }

    /// Wire services over an existing unit of work. Tests use this with the
    /// in-memory store, a manual gateway and a manual clock.
    pub fn assemble(
        config: Arc<Config>,
        uow: AppUnitOfWork,
        crypto: Arc<AuthCrypto>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        postgres: Option<Arc<PostgresDatabase>>,
    ) -> anyhow::Result<Self> {
        let market = Marketplace::new(
            Arc::new(uow),
            Arc::new(config.marketplace.clone()),
            crypto,
            gateway,
            clock,
        )
        .context("failed to build marketplace services")?;

        Ok(Self {
            market: Arc::new(market),
            config,
            postgres,
        })
    }
}
