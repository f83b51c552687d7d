use crate::database::entities::tags;
use crate::error::{Error, Result};
use regex::Regex;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder};
use serde::Serialize;
use std::sync::LazyLock;

static COLOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").expect("Invalid regex pattern")
});

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("Invalid regex pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagView {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<tags::Model> for TagView {
    fn from(tag: tags::Model) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        }
    }
}

pub fn is_valid_color(color: &str) -> bool {
    COLOR_PATTERN.is_match(color)
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_PATTERN.is_match(slug)
}

pub async fn list_tags<C: ConnectionTrait>(db: &C) -> Result<Vec<TagView>> {
    let found = tags::Entity::find()
        .order_by_asc(tags::Column::Id)
        .all(db)
        .await?;
    Ok(found.into_iter().map(TagView::from).collect())
}

pub async fn get_tag<C: ConnectionTrait>(db: &C, id: i32) -> Result<TagView> {
    tags::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(TagView::from)
        .ok_or(Error::NotFound("tag"))
}
