#[cfg(test)]
use crate::accounts::PasswordHasher;
#[cfg(test)]
use crate::accounts::tokens::obtain_token;
#[cfg(test)]
use crate::api::{AppState, router};
#[cfg(test)]
use crate::config::{Config, DatabaseConfig};
#[cfg(test)]
use crate::database::connection::{apply_migrations, connect_app_db};
#[cfg(test)]
use crate::database::entities::{ingredients, recipe_ingredients, recipe_tags, recipes, tags, users};
#[cfg(test)]
use crate::recipes::ImageStore;
#[cfg(test)]
use anyhow::Result;
#[cfg(test)]
use axum::http::HeaderValue;
#[cfg(test)]
use axum_test::TestServer;
#[cfg(test)]
use chrono::Utc;
#[cfg(test)]
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

#[cfg(test)]
pub const TEST_PASSWORD: &str = "kitchen-secret";

#[cfg(test)]
pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(1_000)
}

#[cfg(test)]
pub fn test_image_store() -> ImageStore {
    ImageStore::new("media", "/media")
}

#[cfg(test)]
pub async fn setup_test_db_connection() -> Result<DatabaseConnection> {
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("test.db");

    let db = connect_app_db(&DatabaseConfig::sqlite(db_path.to_string_lossy())).await?;
    apply_migrations(&db).await?;

    std::mem::forget(temp_dir);
    Ok(db)
}

/// A server over a fresh database with media written to a temporary directory.
#[cfg(test)]
pub async fn create_test_server() -> Result<(TestServer, AppState)> {
    let db = setup_test_db_connection().await?;
    let media_dir = tempfile::tempdir()?;

    let mut config = Config::default();
    config.media.root = media_dir.path().to_path_buf();
    config.security.password_iterations = 1_000;
    std::mem::forget(media_dir);

    let state = AppState::new(db, config);
    let server = TestServer::new(router(state.clone()))?;
    Ok((server, state))
}

#[cfg(test)]
pub fn token_header(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Token {token}")).expect("token is ASCII")
}

/// Creates a user and returns it with a ready `Authorization` header value.
#[cfg(test)]
pub async fn create_logged_in_user(
    db: &DatabaseConnection,
    username: &str,
) -> Result<(users::Model, HeaderValue)> {
    let user = create_user(db, username).await?;
    let token = obtain_token(db, user.id).await?;
    Ok((user, token_header(&token)))
}

#[cfg(test)]
pub async fn create_user(db: &DatabaseConnection, username: &str) -> Result<users::Model> {
    let user = users::ActiveModel {
        email: Set(format!("{username}@example.com")),
        username: Set(username.to_string()),
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        password: Set(test_hasher().hash(TEST_PASSWORD).await?),
        is_superuser: Set(false),
        date_joined: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(user)
}

#[cfg(test)]
pub async fn create_ingredient(
    db: &DatabaseConnection,
    name: &str,
    measurement_unit: &str,
) -> Result<ingredients::Model> {
    let ingredient = ingredients::ActiveModel {
        name: Set(name.to_string()),
        measurement_unit: Set(measurement_unit.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(ingredient)
}

#[cfg(test)]
pub async fn create_tag(
    db: &DatabaseConnection,
    name: &str,
    color: &str,
    slug: &str,
) -> Result<tags::Model> {
    let tag = tags::ActiveModel {
        name: Set(name.to_string()),
        color: Set(color.to_string()),
        slug: Set(slug.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(tag)
}

/// Inserts a bare recipe row with no associations and no image file.
#[cfg(test)]
pub async fn create_recipe_row(
    db: &DatabaseConnection,
    author_id: i32,
    name: &str,
) -> Result<recipes::Model> {
    let recipe = recipes::ActiveModel {
        author_id: Set(Some(author_id)),
        name: Set(name.to_string()),
        text: Set(format!("How to make {name}")),
        cooking_time: Set(10),
        image: Set("img/test.png".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(recipe)
}

#[cfg(test)]
pub async fn add_recipe_ingredient(
    db: &DatabaseConnection,
    recipe_id: i32,
    ingredient_id: i32,
    amount: i32,
) -> Result<()> {
    recipe_ingredients::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(ingredient_id),
        amount: Set(amount),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

#[cfg(test)]
pub async fn attach_tag(db: &DatabaseConnection, recipe_id: i32, tag_id: i32) -> Result<()> {
    recipe_tags::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(tag_id),
    }
    .insert(db)
    .await?;
    Ok(())
}
