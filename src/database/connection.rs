use crate::config::{DatabaseConfig, DatabaseType};
use crate::database::migration::Migrator;
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{debug, info};

pub async fn connect_app_db(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    if config.ty == DatabaseType::Sqlite
        && let Some(path) = &config.path
        && let Some(parent) = std::path::Path::new(path).parent()
    {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = config.url()?;

    let mut opt = ConnectOptions::new(&db_url);
    opt.connect_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    debug!(database = ?config.ty, "Connected to application database");

    if config.ty == DatabaseType::Sqlite {
        enable_sqlite_wal_mode(&db).await?;
    }

    Ok(db)
}

async fn enable_sqlite_wal_mode(db: &DatabaseConnection) -> Result<()> {
    db.execute(sea_orm::Statement::from_string(
        sea_orm::DatabaseBackend::Sqlite,
        "PRAGMA journal_mode = WAL;".to_string(),
    ))
    .await?;

    db.execute(sea_orm::Statement::from_string(
        sea_orm::DatabaseBackend::Sqlite,
        "PRAGMA busy_timeout = 10000;".to_string(),
    ))
    .await?;

    Ok(())
}

pub async fn check_migration_status(db: &DatabaseConnection) -> Result<()> {
    let pending = Migrator::get_pending_migrations(db).await?;
    if !pending.is_empty() {
        let pending_names: Vec<String> = pending.iter().map(|m| m.name().to_string()).collect();
        return Err(anyhow::anyhow!(
            "There are pending migrations. Please run 'foodgram migrate up' first.\nPending: {}",
            pending_names.join(", ")
        ));
    }
    Ok(())
}

pub async fn apply_migrations(db: &DatabaseConnection) -> Result<()> {
    let pending = Migrator::get_pending_migrations(db).await?;
    if pending.is_empty() {
        return Ok(());
    }

    info!(count = pending.len(), "Applying database migrations");
    if let Err(e) = Migrator::up(db, None).await {
        return Err(anyhow::anyhow!("Failed to run database migrations: {}", e));
    }

    Ok(())
}
