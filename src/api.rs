use crate::accounts::PasswordHasher;
use crate::config::{Config, CorsConfig};
use crate::error::Error;
use crate::recipes::ImageStore;
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use sea_orm::{DatabaseConnection, DbErr};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

mod auth;
mod catalog;
mod json;
mod pagination;
mod recipes;
mod users;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub images: Arc<ImageStore>,
    pub hasher: PasswordHasher,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        Self {
            db,
            images: Arc::new(ImageStore::from_config(&config.media)),
            hasher: PasswordHasher::new(config.security.password_iterations),
            config: Arc::new(config),
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Service(Error),
    /// Unreadable request body, reported as `{"detail": ...}` with the given status.
    Request(StatusCode, String),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self::Service(err)
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        Self::Service(Error::Database(err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Service(Error::Internal(err))
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::Request(status, message) => return detail(status, &message),
            Self::Service(err) => err,
        };

        match err {
            Error::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            Error::Rejected(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": message })),
            )
                .into_response(),
            Error::DeleteFailed(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "detail": message, "code": "delete_error" })),
            )
                .into_response(),
            Error::NotFound(_) => detail(StatusCode::NOT_FOUND, "Not found."),
            Error::InvalidPage => detail(StatusCode::NOT_FOUND, "Invalid page."),
            Error::Unauthorized(message) => detail(StatusCode::UNAUTHORIZED, message),
            Error::Forbidden => detail(
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.",
            ),
            Error::Database(e) => {
                error!(error = %e, "Database error while handling request");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
            }
            Error::Internal(e) => {
                error!(error = ?e, "Internal error while handling request");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
            }
        }
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(auth::routes())
        .merge(catalog::routes())
        .merge(recipes::routes())
        .merge(users::routes());

    let media = ServeDir::new(state.images.root());

    Router::new()
        .nest("/api", api_routes)
        .nest_service(state.images.url_prefix(), media)
        .layer(DefaultBodyLimit::max(state.config.media.body_limit()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors))
        .with_state(state)
}

pub async fn serve(state: AppState) -> Result<()> {
    let address = state.config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    info!(address = %address, "Foodgram API listening");
    axum::serve(listener, router(state)).await?;

    Ok(())
}
