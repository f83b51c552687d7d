pub mod connection;
pub mod entities;
pub mod migration;

pub use connection::{apply_migrations, check_migration_status, connect_app_db};
