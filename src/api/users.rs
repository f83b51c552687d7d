use super::auth::{CurrentUser, Viewer};
use super::json::JsonBody;
use super::pagination::{Paginated, page_request, query_value};
use super::{AppError, AppState};
use crate::accounts::UserView;
use crate::accounts::subscriptions::{
    SubscriptionView, list_subscriptions, subscribe, unsubscribe,
};
use crate::accounts::users::{
    CreatedUser, RegisterRequest, SetPasswordRequest, find_user, list_users, register,
    set_password, user_view,
};
use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handle_list).post(handle_register))
        .route("/users/me", get(handle_me))
        .route("/users/set_password", post(handle_set_password))
        .route("/users/subscriptions", get(handle_subscriptions))
        .route("/users/{id}", get(handle_get))
        .route(
            "/users/{id}/subscribe",
            post(handle_subscribe).delete(handle_unsubscribe),
        )
}

/// `recipes_limit` truncates the recipes embedded in subscription views.
fn recipes_limit(params: &[(String, String)]) -> Option<u64> {
    query_value(params, "recipes_limit").and_then(|raw| raw.trim().parse().ok())
}

async fn handle_list(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Paginated<UserView>>, AppError> {
    let request = page_request(&params, &state.config.pagination)?;
    let page = list_users(&state.db, viewer.id(), request).await?;
    Ok(Json(Paginated::new(page, &uri)))
}

async fn handle_register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<CreatedUser>), AppError> {
    let created = register(&state.db, &state.hasher, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn handle_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(user_view(&state.db, &user, Some(user.id)).await?))
}

async fn handle_get(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i32>,
) -> Result<Json<UserView>, AppError> {
    let user = find_user(&state.db, id).await?;
    Ok(Json(user_view(&state.db, &user, viewer.id()).await?))
}

async fn handle_set_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(request): JsonBody<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    set_password(&state.db, &state.hasher, &user, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_subscriptions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Paginated<SubscriptionView>>, AppError> {
    let request = page_request(&params, &state.config.pagination)?;
    let page = list_subscriptions(
        &state.db,
        &state.images,
        user.id,
        request,
        recipes_limit(&params),
    )
    .await?;
    Ok(Json(Paginated::new(page, &uri)))
}

async fn handle_subscribe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<(StatusCode, Json<SubscriptionView>), AppError> {
    let view = subscribe(&state.db, &state.images, user.id, id, recipes_limit(&params)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn handle_unsubscribe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    unsubscribe(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
