use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::config::DatabaseConfig;

/// Upper bound for the startup connectivity check.
const PING_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.to_owned());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(PING_TIMEOUT)
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;

    tokio::time::timeout(PING_TIMEOUT, db.ping())
        .await
        .map_err(|_| DbErr::Custom("database did not answer ping within 5s".into()))??;
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool established"
    );

    sync_schema(&db).await?;
    Ok(db)
}

/// Create or migrate the `grenades` and `images` tables from the entity definitions.
pub async fn sync_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.get_schema_registry("grenades_api::entity::*")
        .sync(db)
        .await
}
