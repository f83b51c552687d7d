use super::auth::{CurrentUser, Viewer, ensure_can_edit};
use super::json::JsonBody;
use super::pagination::{Paginated, page_request};
use super::{AppError, AppState};
use crate::recipes::shopping_list::{file_name, shopping_list_for};
use crate::recipes::validation::{RecipeWrite, validate_create, validate_update};
use crate::recipes::views::recipe_view;
use crate::recipes::writer::{create_recipe, delete_recipe, update_recipe};
use crate::recipes::{Collection, RecipeFilter, RecipeShort, RecipeView, find_recipe, list_recipes};
use anyhow::Context;
use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(handle_list).post(handle_create))
        .route("/recipes/download_shopping_cart", get(handle_download_shopping_cart))
        .route(
            "/recipes/{id}",
            get(handle_get).patch(handle_update).delete(handle_delete),
        )
        .route(
            "/recipes/{id}/favorite",
            post(handle_add_favorite).delete(handle_remove_favorite),
        )
        .route(
            "/recipes/{id}/shopping_cart",
            post(handle_add_to_cart).delete(handle_remove_from_cart),
        )
}

async fn handle_list(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Paginated<RecipeView>>, AppError> {
    let request = page_request(&params, &state.config.pagination)?;
    let filter = RecipeFilter::from_query(&params)?;

    let page = list_recipes(&state.db, &state.images, &filter, viewer.id(), request).await?;
    Ok(Json(Paginated::new(page, &uri)))
}

async fn handle_create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(request): JsonBody<RecipeWrite>,
) -> Result<(StatusCode, Json<RecipeView>), AppError> {
    let recipe = validate_create(&state.db, request).await?;
    let created = create_recipe(&state.db, &state.images, user.id, recipe).await?;

    let view = recipe_view(&state.db, &state.images, created, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn handle_get(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i32>,
) -> Result<Json<RecipeView>, AppError> {
    let recipe = find_recipe(&state.db, id).await?;
    let view = recipe_view(&state.db, &state.images, recipe, viewer.id()).await?;
    Ok(Json(view))
}

async fn handle_update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    JsonBody(request): JsonBody<RecipeWrite>,
) -> Result<Json<RecipeView>, AppError> {
    let recipe = find_recipe(&state.db, id).await?;
    ensure_can_edit(&user, &recipe)?;

    let changes = validate_update(&state.db, request).await?;
    let updated = update_recipe(&state.db, &state.images, recipe, changes).await?;

    let view = recipe_view(&state.db, &state.images, updated, Some(user.id)).await?;
    Ok(Json(view))
}

async fn handle_delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let recipe = find_recipe(&state.db, id).await?;
    ensure_can_edit(&user, &recipe)?;

    delete_recipe(&state.db, &state.images, recipe).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_to_collection(
    state: &AppState,
    collection: Collection,
    user_id: i32,
    recipe_id: i32,
) -> Result<(StatusCode, Json<RecipeShort>), AppError> {
    let recipe = find_recipe(&state.db, recipe_id).await?;
    collection.add(&state.db, user_id, recipe.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RecipeShort::new(&recipe, &state.images)),
    ))
}

async fn remove_from_collection(
    state: &AppState,
    collection: Collection,
    user_id: i32,
    recipe_id: i32,
) -> Result<StatusCode, AppError> {
    let recipe = find_recipe(&state.db, recipe_id).await?;
    collection.remove(&state.db, user_id, recipe.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_add_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeShort>), AppError> {
    add_to_collection(&state, Collection::Favorites, user.id, id).await
}

async fn handle_remove_favorite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    remove_from_collection(&state, Collection::Favorites, user.id, id).await
}

async fn handle_add_to_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<RecipeShort>), AppError> {
    add_to_collection(&state, Collection::ShoppingCart, user.id, id).await
}

async fn handle_remove_from_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    remove_from_collection(&state, Collection::ShoppingCart, user.id, id).await
}

async fn handle_download_shopping_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let list = shopping_list_for(&state.db, user.id).await?;

    let disposition = format!("attachment; filename=\"{}\"", file_name(&user.username));
    let disposition = HeaderValue::from_bytes(disposition.as_bytes())
        .context("Invalid Content-Disposition header")?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        list.render(),
    ))
}
