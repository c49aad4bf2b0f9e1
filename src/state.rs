use std::sync::Arc;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sqlx::postgres::PgPool;

use crate::cloud::{CloudProvider, Ec2Provider, ScriptedProvider};
use crate::config::{Config, ProviderKind};
use crate::services::DeploymentEngine;
use crate::store::{DeploymentStore, PgDeploymentStore};

const PROVIDER_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// SeaORM connection for users and web apps
    pub db: DatabaseConnection,
    pub config: Config,
    pub store: Arc<dyn DeploymentStore>,
    pub engine: Arc<DeploymentEngine>,
}

impl AppState {
    /// Connect to PostgreSQL, run migrations and build the engine for the
    /// configured cloud provider
    pub async fn new(config: Config) -> Result<Self, AppStateError> {
        let db = connect_database(&config).await?;
        let store: Arc<dyn DeploymentStore> = Arc::new(PgDeploymentStore::new(db.clone()));
        let provider = build_provider(&config)?;

        Ok(Self::with_components(config, db, store, provider))
    }

    /// Assemble state from already-built parts (tests and local tooling)
    pub fn with_components(
        config: Config,
        db: DatabaseConnection,
        store: Arc<dyn DeploymentStore>,
        provider: Arc<dyn CloudProvider>,
    ) -> Self {
        let engine = Arc::new(DeploymentEngine::new(
            store.clone(),
            provider,
            config.cloud.defaults(),
            config.cloud.wait_timeout,
        ));

        Self {
            db,
            config,
            store,
            engine,
        }
    }
}

/// Run migrations with SQLx, then open the SeaORM pool
pub async fn connect_database(config: &Config) -> Result<DatabaseConnection, AppStateError> {
    let pg_pool = PgPool::connect(&config.database_url)
        .await
        .map_err(|e| AppStateError::Postgres(e.to_string()))?;

    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .map_err(|e| AppStateError::Migration(e.to_string()))?;
    pg_pool.close().await;

    let mut opt = ConnectOptions::new(&config.database_url);
    opt.max_connections(100)
        .min_connections(5)
        .sqlx_logging(true);

    Database::connect(opt)
        .await
        .map_err(|e| AppStateError::Postgres(e.to_string()))
}

pub fn build_provider(config: &Config) -> Result<Arc<dyn CloudProvider>, AppStateError> {
    let provider: Arc<dyn CloudProvider> = match config.cloud.provider {
        ProviderKind::Ec2 => Arc::new(
            Ec2Provider::new(
                config.cloud.ec2_endpoint.as_deref(),
                config.cloud.poll_interval,
                PROVIDER_REQUEST_TIMEOUT,
            )
            .map_err(|e| AppStateError::Cloud(e.to_string()))?,
        ),
        ProviderKind::Scripted => {
            tracing::warn!("Using the scripted cloud provider; no instances will be launched");
            Arc::new(ScriptedProvider::new())
        }
    };
    Ok(provider)
}

#[derive(Debug, thiserror::Error)]
pub enum AppStateError {
    #[error("PostgreSQL connection error: {0}")]
    Postgres(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Cloud provider setup error: {0}")]
    Cloud(String),
}
