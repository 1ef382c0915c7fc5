use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use cashdesk_core::closing::{AuthorizationGate, ClosureEngine};
use cashdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use cashdesk_db::repositories::{SqlClosureRepository, SqlTicketRepository};
use cashdesk_db::{connect_with_settings, migrations, DbPool, SqlClosingStore, SqlSecretStore};

use crate::state::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let gate = Arc::new(AuthorizationGate::new(Arc::new(SqlSecretStore::new(db_pool.clone()))));
    let engine = Arc::new(ClosureEngine::new(
        Arc::new(SqlClosingStore::new(db_pool.clone())),
        Arc::clone(&gate),
    ));

    let state = AppState {
        engine,
        gate,
        closures: Arc::new(SqlClosureRepository::new(db_pool.clone())),
        tickets: Arc::new(SqlTicketRepository::new(db_pool.clone())),
        admin: config.admin.clone(),
        db_pool: db_pool.clone(),
    };

    Ok(Application { config, db_pool, state })
}
