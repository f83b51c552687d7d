use crate::accounts::PasswordHasher;
use crate::accounts::users::{RegisterRequest, create_superuser};
use crate::config::Config;
use crate::database::{check_migration_status, connect_app_db};
use anyhow::Result;
use inquire::{Password, Text};

pub async fn execute_create_admin(
    config: &Config,
    email: Option<&str>,
    username: Option<&str>,
) -> Result<()> {
    let db = connect_app_db(&config.database).await?;
    check_migration_status(&db).await?;

    let email = match email {
        Some(email) => email.to_string(),
        None => Text::new("Email:").prompt()?,
    };
    let username = match username {
        Some(username) => username.to_string(),
        None => Text::new("Username:").prompt()?,
    };
    let first_name = Text::new("First name:").with_default("Admin").prompt()?;
    let last_name = Text::new("Last name:").with_default("Admin").prompt()?;
    let password = Password::new("Password:").prompt()?;

    let hasher = PasswordHasher::new(config.security.password_iterations);
    let admin = create_superuser(
        &db,
        &hasher,
        RegisterRequest {
            email: Some(email),
            username: Some(username),
            first_name: Some(first_name),
            last_name: Some(last_name),
            password: Some(password),
        },
    )
    .await?;

    println!("✓ Administrator '{}' created", admin.username);
    Ok(())
}
