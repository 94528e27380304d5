use crate::config::AppConfig;
use crate::storage::{MemoryStorage, S3Storage, StorageClient};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;

/// Pool used by the server and by maintenance commands that need no storage.
pub async fn connect_db(database_url: &str) -> anyhow::Result<PgPool> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")
}

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = connect_db(&config.database_url).await?;

        let storage = Arc::new(S3Storage::from_config(&config.s3).await?) as Arc<dyn StorageClient>;

        Ok(Self {
            db,
            config,
            storage,
        })
    }

    pub fn from_parts(db: PgPool, config: Arc<AppConfig>, storage: Arc<dyn StorageClient>) -> Self {
        Self {
            db,
            config,
            storage,
        }
    }

    /// State backed by a real pool but fake config and in-memory images.
    pub fn with_pool(db: PgPool) -> Self {
        Self::from_parts(
            db,
            Arc::new(AppConfig::for_tests()),
            Arc::new(MemoryStorage::default()),
        )
    }

    /// State whose pool never connects unless a query runs.
    pub fn fake() -> Self {
        let config = AppConfig::for_tests();
        let db = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(1))
            .connect_lazy(&config.database_url)
            .expect("lazy pool ok");
        Self::from_parts(db, Arc::new(config), Arc::new(MemoryStorage::default()))
    }
}
