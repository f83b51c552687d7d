use crate::database::entities::{auth_tokens, users};
use crate::error::Result;
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use std::fmt::Write;

const KEY_BYTES: usize = 20;

pub fn generate_key() -> anyhow::Result<String> {
    let mut bytes = [0u8; KEY_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| anyhow::anyhow!("Failed to generate token key"))?;

    let mut key = String::with_capacity(KEY_BYTES * 2);
    for byte in bytes {
        write!(key, "{byte:02x}")?;
    }
    Ok(key)
}

/// Returns the user's token, creating one on first login.
pub async fn obtain_token<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<String> {
    if let Some(token) = auth_tokens::Entity::find()
        .filter(auth_tokens::Column::UserId.eq(user_id))
        .one(db)
        .await?
    {
        return Ok(token.key);
    }

    let token = auth_tokens::ActiveModel {
        key: Set(generate_key()?),
        user_id: Set(user_id),
        created: Set(Utc::now().naive_utc()),
    }
    .insert(db)
    .await?;

    Ok(token.key)
}

pub async fn revoke_token<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<()> {
    auth_tokens::Entity::delete_many()
        .filter(auth_tokens::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

pub async fn user_for_token<C: ConnectionTrait>(db: &C, key: &str) -> Result<Option<users::Model>> {
    let found = auth_tokens::Entity::find_by_id(key.to_string())
        .find_also_related(users::Entity)
        .one(db)
        .await?;

    Ok(found.and_then(|(_, user)| user))
}
