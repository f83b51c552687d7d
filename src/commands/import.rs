use crate::catalog::import::{
    ImportReport, IngredientRecord, TagRecord, import_ingredients, import_tags, read_records,
};
use crate::config::Config;
use crate::database::{check_migration_status, connect_app_db};
use anyhow::Result;
use std::path::Path;

pub async fn execute_import_ingredients(config: &Config, file: &Path) -> Result<()> {
    let records: Vec<IngredientRecord> = read_records(file)?;
    let db = connect_app_db(&config.database).await?;
    check_migration_status(&db).await?;

    let report = import_ingredients(&db, records).await?;
    print_report("ingredients", &report);
    Ok(())
}

pub async fn execute_import_tags(config: &Config, file: &Path) -> Result<()> {
    let records: Vec<TagRecord> = read_records(file)?;
    let db = connect_app_db(&config.database).await?;
    check_migration_status(&db).await?;

    let report = import_tags(&db, records).await?;
    print_report("tags", &report);
    Ok(())
}

fn print_report(kind: &str, report: &ImportReport) {
    println!(
        "✓ Imported {} {kind} ({} already present)",
        report.created, report.skipped
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::apply_migrations;
    use crate::database::entities::ingredients;
    use sea_orm::{EntityTrait, PaginatorTrait};

    #[tokio::test]
    async fn test_import_ingredients_from_file() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let db_path = temp_dir.path().join("app.db");
        let file = temp_dir.path().join("ingredients.json");
        std::fs::write(
            &file,
            r#"[{"name": "Salt", "measurement_unit": "g"}, {"name": "Milk", "measurement_unit": "ml"}]"#,
        )?;

        let config = Config {
            database: DatabaseConfig::sqlite(db_path.to_string_lossy()),
            ..Config::default()
        };
        let db = connect_app_db(&config.database).await?;

        assert!(execute_import_ingredients(&config, &file).await.is_err());

        apply_migrations(&db).await?;
        execute_import_ingredients(&config, &file).await?;
        execute_import_ingredients(&config, &file).await?;

        assert_eq!(ingredients::Entity::find().count(&db).await?, 2);

        Ok(())
    }
}
