pub mod collections;
pub mod filters;
pub mod images;
pub mod shopping_list;
pub mod validation;
pub mod views;
pub mod writer;

use crate::database::entities::recipes;
use crate::error::{Error, Result};
use crate::pagination::{Page, PageRequest, fetch_page};
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder};

pub use collections::Collection;
pub use filters::RecipeFilter;
pub use images::ImageStore;
pub use views::{RecipeShort, RecipeView};

pub async fn find_recipe<C: ConnectionTrait>(db: &C, recipe_id: i32) -> Result<recipes::Model> {
    recipes::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound("recipe"))
}

/// Newest recipes first.
pub async fn list_recipes<C: ConnectionTrait>(
    db: &C,
    images: &ImageStore,
    filter: &RecipeFilter,
    viewer_id: Option<i32>,
    request: PageRequest,
) -> Result<Page<RecipeView>> {
    let query = filter
        .apply(recipes::Entity::find(), viewer_id)
        .order_by_desc(recipes::Column::Id);

    let Page {
        count,
        request,
        items,
    } = fetch_page(db, query, request).await?;
    let items = views::build_recipe_views(db, images, items, viewer_id).await?;

    Ok(Page {
        count,
        request,
        items,
    })
}
