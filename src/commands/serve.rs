use crate::api::{self, AppState};
use crate::config::Config;
use crate::database::{apply_migrations, check_migration_status, connect_app_db};
use anyhow::{Context, Result};
use tracing::info;

pub async fn execute_serve(config: Config) -> Result<()> {
    let db = connect_app_db(&config.database).await?;

    if config.auto_migrate {
        apply_migrations(&db).await?;
    } else {
        check_migration_status(&db).await?;
    }

    std::fs::create_dir_all(&config.media.root).with_context(|| {
        format!(
            "Failed to create media directory: {}",
            config.media.root.display()
        )
    })?;
    info!(media_root = %config.media.root.display(), "Serving media files");

    api::serve(AppState::new(db, config)).await
}
