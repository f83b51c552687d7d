use crate::config::Config;
use crate::database::connect_app_db;
use crate::database::migration::Migrator;
use anyhow::Result;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;

pub async fn execute_migrate_up(config: &Config) -> Result<()> {
    let db = connect_app_db(&config.database).await?;
    let applied = migrate_up(&db).await?;

    if applied.is_empty() {
        println!("Database is up to date.");
    } else {
        for name in &applied {
            println!("✓ Applied {name}");
        }
    }
    Ok(())
}

pub async fn execute_migrate_down(config: &Config) -> Result<()> {
    let db = connect_app_db(&config.database).await?;

    match migrate_down(&db).await? {
        Some(name) => println!("✓ Rolled back {name}"),
        None => println!("No applied migrations to roll back."),
    }
    Ok(())
}

pub async fn execute_migrate_status(config: &Config) -> Result<()> {
    let db = connect_app_db(&config.database).await?;

    for (name, applied) in migration_status(&db).await? {
        let marker = if applied { "applied" } else { "pending" };
        println!("{marker:>8}  {name}");
    }
    Ok(())
}

/// Applies every pending migration and returns their names.
pub async fn migrate_up(db: &DatabaseConnection) -> Result<Vec<String>> {
    let pending: Vec<String> = Migrator::get_pending_migrations(db)
        .await?
        .iter()
        .map(|m| m.name().to_string())
        .collect();

    if !pending.is_empty() {
        Migrator::up(db, None)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run database migrations: {e}"))?;
    }
    Ok(pending)
}

/// Rolls back the most recent migration, if any.
pub async fn migrate_down(db: &DatabaseConnection) -> Result<Option<String>> {
    let last = Migrator::get_applied_migrations(db)
        .await?
        .last()
        .map(|m| m.name().to_string());

    if last.is_some() {
        Migrator::down(db, Some(1))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to roll back migration: {e}"))?;
    }
    Ok(last)
}

pub async fn migration_status(db: &DatabaseConnection) -> Result<Vec<(String, bool)>> {
    let applied: Vec<String> = Migrator::get_applied_migrations(db)
        .await?
        .iter()
        .map(|m| m.name().to_string())
        .collect();

    Ok(Migrator::migrations()
        .iter()
        .map(|m| {
            let name = m.name().to_string();
            let is_applied = applied.contains(&name);
            (name, is_applied)
        })
        .collect())
}
