use super::auth::Admin;
use super::json::JsonBody;
use super::pagination::query_value;
use super::{AppError, AppState};
use crate::catalog::import::{ImportReport, IngredientRecord, import_ingredients};
use crate::catalog::ingredients::{get_ingredient, list_ingredients};
use crate::catalog::tags::{get_tag, list_tags};
use crate::catalog::{IngredientView, TagView};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use tracing::info;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(handle_list_ingredients))
        .route("/ingredients/import", post(handle_import_ingredients))
        .route("/ingredients/{id}", get(handle_get_ingredient))
        .route("/tags", get(handle_list_tags))
        .route("/tags/{id}", get(handle_get_tag))
}

async fn handle_list_ingredients(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<IngredientView>>, AppError> {
    let found = list_ingredients(&state.db, query_value(&params, "name")).await?;
    Ok(Json(found))
}

async fn handle_get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<IngredientView>, AppError> {
    Ok(Json(get_ingredient(&state.db, id).await?))
}

async fn handle_import_ingredients(
    State(state): State<AppState>,
    Admin(admin): Admin,
    JsonBody(records): JsonBody<Vec<IngredientRecord>>,
) -> Result<Json<ImportReport>, AppError> {
    info!(admin_id = admin.id, rows = records.len(), "Ingredient import requested");
    let report = import_ingredients(&state.db, records).await?;
    Ok(Json(report))
}

async fn handle_list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagView>>, AppError> {
    Ok(Json(list_tags(&state.db).await?))
}

async fn handle_get_tag(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TagView>, AppError> {
    Ok(Json(get_tag(&state.db, id).await?))
}

#[cfg(test)]
mod tests {
    use crate::database::entities::users;
    use crate::test_helpers::{create_ingredient, create_logged_in_user, create_test_server};
    use axum::http::{StatusCode, header::AUTHORIZATION};
    use sea_orm::{ActiveModelTrait, Set};
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_ingredient_search() -> anyhow::Result<()> {
        let (server, state) = create_test_server().await?;
        create_ingredient(&state.db, "Sugar", "g").await?;
        create_ingredient(&state.db, "Flour", "g").await?;

        let response = server.get("/api/ingredients").add_query_param("name", "su").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body, json!([{ "id": 1, "name": "Sugar", "measurement_unit": "g" }]));

        server
            .get("/api/ingredients/99")
            .await
            .assert_status(StatusCode::NOT_FOUND);

        Ok(())
    }

    #[tokio::test]
    async fn test_import_requires_superuser() -> anyhow::Result<()> {
        let (server, state) = create_test_server().await?;
        let (user, auth) = create_logged_in_user(&state.db, "cook").await?;
        let rows = json!([{ "name": "Salt", "measurement_unit": "g" }]);

        let response = server
            .post("/api/ingredients/import")
            .add_header(AUTHORIZATION, auth.clone())
            .json(&rows)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let mut admin: users::ActiveModel = user.into();
        admin.is_superuser = Set(true);
        admin.update(&state.db).await?;

        let response = server
            .post("/api/ingredients/import")
            .add_header(AUTHORIZATION, auth)
            .json(&rows)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body, json!({ "created": 1, "skipped": 0 }));

        Ok(())
    }
}
