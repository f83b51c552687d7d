use super::passwords::{PasswordHasher, password_problems, verify_password};
use super::subscriptions::subscribed_author_ids;
use crate::database::entities::users;
use crate::error::{Error, REQUIRED_FIELD, Result, ValidationErrors, is_unique_violation};
use crate::pagination::{Page, PageRequest, fetch_page};
use chrono::Utc;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::info;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 150;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("Invalid regex pattern"));

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex pattern"));

const RESERVED_USERNAMES: &[&str] = &["me"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedUser {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub email: String,
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl From<users::Model> for CreatedUser {
    fn from(user: users::Model) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

impl UserView {
    pub fn new(user: &users::Model, is_subscribed: bool) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
        }
    }
}

struct NewUser {
    email: String,
    username: String,
    first_name: String,
    last_name: String,
    password: String,
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max_length: usize,
) -> Option<String> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        errors.add(field, REQUIRED_FIELD);
        return None;
    }
    if value.chars().count() > max_length {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_length} characters."),
        );
        return None;
    }
    Some(value.to_string())
}

fn validate_registration(request: &RegisterRequest) -> Result<NewUser> {
    let mut errors = ValidationErrors::new();

    let email = required_text(&mut errors, "email", request.email.as_deref(), MAX_EMAIL_LENGTH);
    if let Some(email) = &email
        && !EMAIL_PATTERN.is_match(email)
    {
        errors.add("email", "Enter a valid email address.");
    }

    let username = required_text(
        &mut errors,
        "username",
        request.username.as_deref(),
        MAX_NAME_LENGTH,
    );
    if let Some(username) = &username {
        if !USERNAME_PATTERN.is_match(username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        if RESERVED_USERNAMES.contains(&username.to_lowercase().as_str()) {
            errors.add("username", format!("Username '{username}' is not allowed."));
        }
    }

    let first_name = required_text(
        &mut errors,
        "first_name",
        request.first_name.as_deref(),
        MAX_NAME_LENGTH,
    );
    let last_name = required_text(
        &mut errors,
        "last_name",
        request.last_name.as_deref(),
        MAX_NAME_LENGTH,
    );

    let password = match request.password.as_deref() {
        None | Some("") => {
            errors.add("password", REQUIRED_FIELD);
            None
        }
        Some(password) => {
            for problem in password_problems(password) {
                errors.add("password", problem);
            }
            Some(password.to_string())
        }
    };

    match (email, username, first_name, last_name, password) {
        (Some(email), Some(username), Some(first_name), Some(last_name), Some(password))
            if errors.is_empty() =>
        {
            Ok(NewUser {
                email,
                username,
                first_name,
                last_name,
                password,
            })
        }
        _ => Err(Error::Validation(errors)),
    }
}

async fn ensure_unique<C: ConnectionTrait>(db: &C, user: &NewUser) -> Result<()> {
    let mut errors = ValidationErrors::new();

    let email_taken = users::Entity::find()
        .filter(users::Column::Email.eq(&user.email))
        .one(db)
        .await?
        .is_some();
    if email_taken {
        errors.add("email", "A user with that email already exists.");
    }

    let username_taken = users::Entity::find()
        .filter(users::Column::Username.eq(&user.username))
        .one(db)
        .await?
        .is_some();
    if username_taken {
        errors.add("username", "A user with that username already exists.");
    }

    errors.into_result()
}

async fn create_account<C: ConnectionTrait>(
    db: &C,
    hasher: &PasswordHasher,
    request: &RegisterRequest,
    is_superuser: bool,
) -> Result<users::Model> {
    let user = validate_registration(request)?;
    ensure_unique(db, &user).await?;

    let inserted = users::ActiveModel {
        email: Set(user.email),
        username: Set(user.username),
        first_name: Set(user.first_name),
        last_name: Set(user.last_name),
        password: Set(hasher.hash(&user.password).await?),
        is_superuser: Set(is_superuser),
        date_joined: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await;

    match inserted {
        Ok(user) => Ok(user),
        Err(e) if is_unique_violation(&e) => Err(Error::Rejected(
            "A user with that email or username already exists.".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn register<C: ConnectionTrait>(
    db: &C,
    hasher: &PasswordHasher,
    request: RegisterRequest,
) -> Result<CreatedUser> {
    let user = create_account(db, hasher, &request, false).await?;
    info!(user_id = user.id, username = %user.username, "Registered user");
    Ok(user.into())
}

pub async fn create_superuser<C: ConnectionTrait>(
    db: &C,
    hasher: &PasswordHasher,
    request: RegisterRequest,
) -> Result<users::Model> {
    let user = create_account(db, hasher, &request, true).await?;
    info!(user_id = user.id, username = %user.username, "Created administrator");
    Ok(user)
}

/// Checks the credentials and returns the matching user.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    hasher: &PasswordHasher,
    request: &LoginRequest,
) -> Result<users::Model> {
    let mut errors = ValidationErrors::new();
    let email = request.email.as_deref().map(str::trim).unwrap_or_default();
    let password = request.password.as_deref().unwrap_or_default();
    if email.is_empty() {
        errors.add("email", REQUIRED_FIELD);
    }
    if password.is_empty() {
        errors.add("password", REQUIRED_FIELD);
    }
    errors.into_result()?;

    let user = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(db)
        .await?;

    let verified = match user {
        Some(user) => verify_password(password, &user.password)
            .await?
            .then_some(user),
        None => {
            // Unknown emails cost as much as a wrong password.
            hasher.burn_verification(password).await?;
            None
        }
    };

    verified.ok_or_else(|| {
        Error::Validation(ValidationErrors::single(
            "non_field_errors",
            "Unable to log in with provided credentials.",
        ))
    })
}

pub async fn set_password<C: ConnectionTrait>(
    db: &C,
    hasher: &PasswordHasher,
    user: &users::Model,
    request: SetPasswordRequest,
) -> Result<()> {
    let mut errors = ValidationErrors::new();

    match request.current_password.as_deref() {
        None | Some("") => errors.add("current_password", REQUIRED_FIELD),
        Some(current) => {
            if !verify_password(current, &user.password).await? {
                errors.add("current_password", "Invalid password.");
            }
        }
    }

    let new_password = match request.new_password.as_deref() {
        None | Some("") => {
            errors.add("new_password", REQUIRED_FIELD);
            None
        }
        Some(password) => {
            for problem in password_problems(password) {
                errors.add("new_password", problem);
            }
            Some(password)
        }
    };

    errors.into_result()?;
    let Some(new_password) = new_password else {
        return Ok(());
    };

    let mut active: users::ActiveModel = user.clone().into();
    active.password = Set(hasher.hash(new_password).await?);
    active.update(db).await?;

    info!(user_id = user.id, "Password changed");
    Ok(())
}

pub async fn find_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<users::Model> {
    users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("user"))
}

pub async fn user_view<C: ConnectionTrait>(
    db: &C,
    user: &users::Model,
    viewer_id: Option<i32>,
) -> Result<UserView> {
    let subscribed = subscribed_author_ids(db, viewer_id, [user.id]).await?;
    Ok(UserView::new(user, subscribed.contains(&user.id)))
}

pub async fn list_users<C: ConnectionTrait>(
    db: &C,
    viewer_id: Option<i32>,
    request: PageRequest,
) -> Result<Page<UserView>> {
    let page = fetch_page(
        db,
        users::Entity::find().order_by_asc(users::Column::Id),
        request,
    )
    .await?;

    let subscribed =
        subscribed_author_ids(db, viewer_id, page.items.iter().map(|user| user.id)).await?;

    Ok(page.map(|user| {
        let is_subscribed = subscribed.contains(&user.id);
        UserView::new(&user, is_subscribed)
    }))
}
