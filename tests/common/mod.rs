use anyhow::Result;
use axum::http::HeaderValue;
use axum::http::header::AUTHORIZATION;
use axum_test::TestServer;
use foodgram::api::{AppState, router};
use foodgram::catalog::import::{IngredientRecord, TagRecord, import_ingredients, import_tags};
use foodgram::config::{Config, DatabaseConfig};
use foodgram::database::{apply_migrations, connect_app_db};
use serde::Serialize;
use serde_json::{Value, json};
use tempfile::TempDir;
use typed_builder::TypedBuilder;

pub const PASSWORD: &str = "Qwerty123!";

pub const TINY_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

#[macro_export]
macro_rules! assert_field_error {
    ($body:expr, $field:expr, $expected_substring:expr) => {
        let messages: Vec<String> = $body[$field]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        assert!(
            messages.iter().any(|m| m.contains($expected_substring)),
            "Field '{}' should have an error containing '{}', but body was: {}",
            $field,
            $expected_substring,
            $body
        );
    };
}

#[macro_export]
macro_rules! assert_contains_all {
    ($collection:expr, $expected_items:expr) => {
        for expected in $expected_items {
            assert!(
                $collection.contains(expected),
                "Collection should contain '{}', but only found: {:?}",
                expected,
                $collection
            );
        }
    };
}

/// A server over a fresh SQLite database with its own media directory.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_page_size(6).await
    }

    pub async fn with_page_size(page_size: u64) -> Result<Self> {
        let dir = tempfile::tempdir()?;

        let mut config = Config {
            database: DatabaseConfig::sqlite(dir.path().join("app.db").to_string_lossy()),
            ..Config::default()
        };
        config.media.root = dir.path().join("media");
        config.pagination.page_size = page_size;
        config.security.password_iterations = 1_000;

        let db = connect_app_db(&config.database).await?;
        apply_migrations(&db).await?;

        let state = AppState::new(db, config);
        let server = TestServer::new(router(state.clone()))?;
        Ok(Self {
            server,
            state,
            _dir: dir,
        })
    }

    /// Loads Flour (g), Sugar (g) and Milk (ml) with ids 1..=3, and Breakfast and Lunch tags with ids 1 and 2.
    pub async fn seed_catalog(&self) -> Result<()> {
        let ingredient = |name: &str, unit: &str| IngredientRecord {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        };
        import_ingredients(
            &self.state.db,
            vec![
                ingredient("Flour", "g"),
                ingredient("Sugar", "g"),
                ingredient("Milk", "ml"),
            ],
        )
        .await?;

        let tag = |name: &str, color: &str, slug: &str| TagRecord {
            name: name.to_string(),
            color: color.to_string(),
            slug: slug.to_string(),
        };
        import_tags(
            &self.state.db,
            vec![
                tag("Breakfast", "#E26C2D", "breakfast"),
                tag("Lunch", "#49B64E", "lunch"),
            ],
        )
        .await?;
        Ok(())
    }

    /// Registers `username` through the API and returns its user id and `Authorization` header.
    pub async fn sign_up(&self, username: &str) -> Result<(i64, HeaderValue)> {
        let email = format!("{username}@example.com");
        let response = self
            .server
            .post("/api/users")
            .json(&json!({
                "email": email,
                "username": username,
                "first_name": "Test",
                "last_name": "Cook",
                "password": PASSWORD,
            }))
            .await;
        let created: Value = response.json();
        let id = created["id"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("registration failed: {created}"))?;

        let response = self
            .server
            .post("/api/auth/token/login")
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await;
        let token: Value = response.json();
        let token = token["auth_token"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("login failed: {token}"))?;

        Ok((id, HeaderValue::from_str(&format!("Token {token}"))?))
    }

    pub async fn post_json(&self, path: &str, auth: &HeaderValue, body: &impl Serialize) -> (u16, Value) {
        let response = self
            .server
            .post(path)
            .add_header(AUTHORIZATION, auth.clone())
            .json(body)
            .await;
        let status = response.status_code().as_u16();
        let body = if response.text().is_empty() {
            Value::Null
        } else {
            response.json()
        };
        (status, body)
    }

    pub async fn create_recipe(&self, auth: &HeaderValue, recipe: &RecipePayload) -> Result<i64> {
        let (status, body) = self.post_json("/api/recipes", auth, recipe).await;
        anyhow::ensure!(status == 201, "recipe creation failed ({status}): {body}");
        body["id"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("recipe id missing: {body}"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientAmount {
    pub id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, TypedBuilder)]
pub struct RecipePayload {
    #[builder(setter(into))]
    pub name: String,
    #[builder(default = "Mix everything together.".to_string(), setter(into))]
    pub text: String,
    #[builder(default = 20)]
    pub cooking_time: i64,
    #[builder(default = TINY_PNG.to_string(), setter(into))]
    pub image: String,
    pub tags: Vec<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

pub fn amount(id: i64, amount: i64) -> IngredientAmount {
    IngredientAmount { id, amount }
}
