use super::users::{UserView, find_user};
use crate::database::entities::{recipes, subscriptions, users};
use crate::error::{Error, Result, is_unique_violation};
use crate::pagination::{Page, PageRequest, fetch_page};
use crate::recipes::images::ImageStore;
use crate::recipes::views::RecipeShort;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: u64,
}

/// Returns which of `author_ids` the viewer follows. Anonymous viewers follow nobody.
pub async fn subscribed_author_ids<C: ConnectionTrait>(
    db: &C,
    viewer_id: Option<i32>,
    author_ids: impl IntoIterator<Item = i32>,
) -> Result<HashSet<i32>> {
    let Some(viewer_id) = viewer_id else {
        return Ok(HashSet::new());
    };
    let author_ids: Vec<i32> = author_ids.into_iter().collect();
    if author_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let edges = subscriptions::Entity::find()
        .filter(subscriptions::Column::UserId.eq(viewer_id))
        .filter(subscriptions::Column::AuthorId.is_in(author_ids))
        .all(db)
        .await?;

    Ok(edges.into_iter().map(|edge| edge.author_id).collect())
}

pub async fn subscribe<C: ConnectionTrait>(
    db: &C,
    images: &ImageStore,
    user_id: i32,
    author_id: i32,
    recipes_limit: Option<u64>,
) -> Result<SubscriptionView> {
    let author = find_user(db, author_id).await?;

    if user_id == author.id {
        return Err(Error::Rejected("You cannot subscribe to yourself".to_string()));
    }

    let existing = subscriptions::Entity::find()
        .filter(subscriptions::Column::UserId.eq(user_id))
        .filter(subscriptions::Column::AuthorId.eq(author.id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(already_subscribed());
    }

    let inserted = subscriptions::ActiveModel {
        user_id: Set(user_id),
        author_id: Set(author.id),
        ..Default::default()
    }
    .insert(db)
    .await;

    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Err(already_subscribed()),
        Err(e) => return Err(e.into()),
    }
    info!(user_id, author_id = author.id, "Subscribed");

    let mut views = subscription_views(db, images, vec![author], recipes_limit).await?;
    views.pop().ok_or(Error::NotFound("user"))
}

fn already_subscribed() -> Error {
    Error::Rejected("You are already subscribed to this author".to_string())
}

pub async fn unsubscribe<C: ConnectionTrait>(db: &C, user_id: i32, author_id: i32) -> Result<()> {
    let author = find_user(db, author_id).await?;

    let result = subscriptions::Entity::delete_many()
        .filter(subscriptions::Column::UserId.eq(user_id))
        .filter(subscriptions::Column::AuthorId.eq(author.id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::DeleteFailed(
            "You are not subscribed to this author".to_string(),
        ));
    }

    info!(user_id, author_id = author.id, "Unsubscribed");
    Ok(())
}

/// Authors the user follows, oldest account first.
pub async fn list_subscriptions<C: ConnectionTrait>(
    db: &C,
    images: &ImageStore,
    user_id: i32,
    request: PageRequest,
    recipes_limit: Option<u64>,
) -> Result<Page<SubscriptionView>> {
    let followed = Query::select()
        .column(subscriptions::Column::AuthorId)
        .from(subscriptions::Entity)
        .and_where(subscriptions::Column::UserId.eq(user_id))
        .to_owned();

    let page = fetch_page(
        db,
        users::Entity::find()
            .filter(users::Column::Id.in_subquery(followed))
            .order_by_asc(users::Column::Id),
        request,
    )
    .await?;

    let Page {
        count,
        request,
        items,
    } = page;
    let items = subscription_views(db, images, items, recipes_limit).await?;

    Ok(Page {
        count,
        request,
        items,
    })
}

/// Builds views for authors the viewer is known to follow.
async fn subscription_views<C: ConnectionTrait>(
    db: &C,
    images: &ImageStore,
    authors: Vec<users::Model>,
    recipes_limit: Option<u64>,
) -> Result<Vec<SubscriptionView>> {
    let author_ids: Vec<i32> = authors.iter().map(|author| author.id).collect();

    let mut by_author: HashMap<i32, Vec<recipes::Model>> = HashMap::new();
    if !author_ids.is_empty() {
        let authored = recipes::Entity::find()
            .filter(recipes::Column::AuthorId.is_in(author_ids))
            .order_by_desc(recipes::Column::Id)
            .all(db)
            .await?;
        for recipe in authored {
            if let Some(author_id) = recipe.author_id {
                by_author.entry(author_id).or_default().push(recipe);
            }
        }
    }

    Ok(authors
        .iter()
        .map(|author| {
            let authored = by_author.remove(&author.id).unwrap_or_default();
            let recipes_count = authored.len() as u64;
            let limit = recipes_limit.map_or(authored.len(), |limit| limit as usize);

            SubscriptionView {
                user: UserView::new(author, true),
                recipes: authored
                    .iter()
                    .take(limit)
                    .map(|recipe| RecipeShort::new(recipe, images))
                    .collect(),
                recipes_count,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_recipe_row, create_user, setup_test_db_connection, test_image_store};

    #[tokio::test]
    async fn test_subscribe_rules() -> anyhow::Result<()> {
        let db = setup_test_db_connection().await?;
        let images = test_image_store();
        let reader = create_user(&db, "reader").await?;
        let author = create_user(&db, "author").await?;

        let err = subscribe(&db, &images, reader.id, reader.id, None).await.unwrap_err();
        assert!(matches!(err, Error::Rejected(msg) if msg == "You cannot subscribe to yourself"));

        let view = subscribe(&db, &images, reader.id, author.id, None).await?;
        assert!(view.user.is_subscribed);
        assert_eq!(view.recipes_count, 0);

        let err = subscribe(&db, &images, reader.id, author.id, None).await.unwrap_err();
        assert!(
            matches!(err, Error::Rejected(msg) if msg == "You are already subscribed to this author")
        );

        let err = subscribe(&db, &images, reader.id, 999, None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        Ok(())
    }

    #[tokio::test]
    async fn test_unsubscribe_without_edge() -> anyhow::Result<()> {
        let db = setup_test_db_connection().await?;
        let images = test_image_store();
        let reader = create_user(&db, "reader").await?;
        let author = create_user(&db, "author").await?;

        let err = unsubscribe(&db, reader.id, author.id).await.unwrap_err();
        assert!(matches!(err, Error::DeleteFailed(_)));

        subscribe(&db, &images, reader.id, author.id, None).await?;
        unsubscribe(&db, reader.id, author.id).await?;

        let followed = subscribed_author_ids(&db, Some(reader.id), [author.id]).await?;
        assert!(followed.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_list_subscriptions_truncates_recipes() -> anyhow::Result<()> {
        let db = setup_test_db_connection().await?;
        let images = test_image_store();
        let reader = create_user(&db, "reader").await?;
        let author = create_user(&db, "author").await?;
        for name in ["Soup", "Salad", "Stew"] {
            create_recipe_row(&db, author.id, name).await?;
        }

        subscribe(&db, &images, reader.id, author.id, None).await?;
        let page =
            list_subscriptions(&db, &images, reader.id, PageRequest::first(6), Some(2)).await?;

        assert_eq!(page.count, 1);
        let view = &page.items[0];
        assert_eq!(view.user.username, "author");
        assert_eq!(view.recipes_count, 3);
        assert_eq!(view.recipes.len(), 2);
        assert_eq!(view.recipes[0].name, "Stew");

        Ok(())
    }
}
