use super::json::JsonBody;
use super::{AppError, AppState};
use crate::accounts::tokens::{obtain_token, revoke_token, user_for_token};
use crate::accounts::users::{LoginRequest, authenticate};
use crate::database::entities::{recipes, users};
use crate::error::Error;
use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    routing::post,
};
use serde::Serialize;

const TOKEN_SCHEME: &str = "Token";

#[derive(Serialize)]
struct TokenResponse {
    auth_token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/token/login", post(handle_login))
        .route("/auth/token/logout", post(handle_logout))
}

/// The authenticated user; rejects anonymous requests with 401.
pub struct CurrentUser(pub users::Model);

/// The requesting user if a token was supplied.
pub struct Viewer(pub Option<users::Model>);

/// An authenticated superuser.
pub struct Admin(pub users::Model);

impl Viewer {
    pub fn id(&self) -> Option<i32> {
        self.0.as_ref().map(|user| user.id)
    }
}

/// Reads `Authorization: Token <key>`. Other schemes are ignored.
fn token_key(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| Error::Unauthorized("Invalid token header."))?;

    let mut parts = value.split_whitespace();
    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case(TOKEN_SCHEME) => {}
        _ => return Ok(None),
    }

    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(Some(key)),
        (None, _) => Err(Error::Unauthorized("Invalid token header. No credentials provided.").into()),
        (Some(_), Some(_)) => Err(Error::Unauthorized(
            "Invalid token header. Token string should not contain spaces.",
        )
        .into()),
    }
}

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<Option<users::Model>, AppError> {
    let Some(key) = token_key(&parts.headers)? else {
        return Ok(None);
    };

    match user_for_token(&state.db, key).await? {
        Some(user) => Ok(Some(user)),
        None => Err(Error::Unauthorized("Invalid token.").into()),
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_user(parts, state).await?))
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await? {
            Some(user) => Ok(Self(user)),
            None => Err(Error::Unauthorized("Authentication credentials were not provided.").into()),
        }
    }
}

impl FromRequestParts<AppState> for Admin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_superuser {
            return Err(Error::Forbidden.into());
        }
        Ok(Self(user))
    }
}

/// Recipes may be changed by their author or a superuser.
pub fn ensure_can_edit(user: &users::Model, recipe: &recipes::Model) -> Result<(), AppError> {
    if user.is_superuser || recipe.author_id == Some(user.id) {
        Ok(())
    } else {
        Err(Error::Forbidden.into())
    }
}

async fn handle_login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = authenticate(&state.db, &state.hasher, &request).await?;
    let auth_token = obtain_token(&state.db, user.id).await?;
    Ok(Json(TokenResponse { auth_token }))
}

async fn handle_logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AppError> {
    revoke_token(&state.db, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
