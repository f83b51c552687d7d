use sea_orm_migration::prelude::*;

mod m20240101_000001_create_account_tables;
mod m20240102_000001_create_catalog_tables;
mod m20240103_000001_create_recipe_tables;
mod m20240104_000001_create_collection_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_account_tables::Migration),
            Box::new(m20240102_000001_create_catalog_tables::Migration),
            Box::new(m20240103_000001_create_recipe_tables::Migration),
            Box::new(m20240104_000001_create_collection_tables::Migration),
        ]
    }
}
