use super::collections::Collection;
use super::images::ImageStore;
use crate::accounts::UserView;
use crate::accounts::subscriptions::subscribed_author_ids;
use crate::catalog::TagView;
use crate::database::entities::{ingredients, recipe_ingredients, recipe_tags, recipes, tags, users};
use crate::error::{Error, Result};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeShort {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeShort {
    pub fn new(recipe: &recipes::Model, images: &ImageStore) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: images.url(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientAmountView {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeView {
    pub id: i32,
    pub tags: Vec<TagView>,
    pub author: Option<UserView>,
    pub ingredients: Vec<IngredientAmountView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Loads everything the recipe views need in a fixed number of queries,
/// whatever the number of recipes.
pub async fn build_recipe_views<C: ConnectionTrait>(
    db: &C,
    images: &ImageStore,
    recipes: Vec<recipes::Model>,
    viewer_id: Option<i32>,
) -> Result<Vec<RecipeView>> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }

    let recipe_ids: Vec<i32> = recipes.iter().map(|recipe| recipe.id).collect();
    let author_ids: Vec<i32> = recipes
        .iter()
        .filter_map(|recipe| recipe.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let authors: HashMap<i32, users::Model> = if author_ids.is_empty() {
        HashMap::new()
    } else {
        users::Entity::find()
            .filter(users::Column::Id.is_in(author_ids.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect()
    };
    let subscribed = subscribed_author_ids(db, viewer_id, author_ids).await?;

    let mut tags_by_recipe: HashMap<i32, Vec<TagView>> = HashMap::new();
    let tag_rows = recipe_tags::Entity::find()
        .filter(recipe_tags::Column::RecipeId.is_in(recipe_ids.clone()))
        .find_also_related(tags::Entity)
        .order_by_asc(recipe_tags::Column::TagId)
        .all(db)
        .await?;
    for (link, tag) in tag_rows {
        if let Some(tag) = tag {
            tags_by_recipe
                .entry(link.recipe_id)
                .or_default()
                .push(TagView::from(tag));
        }
    }

    let mut ingredients_by_recipe: HashMap<i32, Vec<IngredientAmountView>> = HashMap::new();
    let ingredient_rows = recipe_ingredients::Entity::find()
        .filter(recipe_ingredients::Column::RecipeId.is_in(recipe_ids.clone()))
        .find_also_related(ingredients::Entity)
        .order_by_asc(recipe_ingredients::Column::Id)
        .all(db)
        .await?;
    for (row, ingredient) in ingredient_rows {
        if let Some(ingredient) = ingredient {
            ingredients_by_recipe
                .entry(row.recipe_id)
                .or_default()
                .push(IngredientAmountView {
                    id: ingredient.id,
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount: row.amount,
                });
        }
    }

    let (favorited, in_cart) = match viewer_id {
        Some(viewer_id) => (
            Collection::Favorites
                .recipe_ids(db, viewer_id, &recipe_ids)
                .await?,
            Collection::ShoppingCart
                .recipe_ids(db, viewer_id, &recipe_ids)
                .await?,
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeView {
            id: recipe.id,
            tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
            author: recipe
                .author_id
                .and_then(|id| authors.get(&id))
                .map(|author| UserView::new(author, subscribed.contains(&author.id))),
            ingredients: ingredients_by_recipe.remove(&recipe.id).unwrap_or_default(),
            is_favorited: favorited.contains(&recipe.id),
            is_in_shopping_cart: in_cart.contains(&recipe.id),
            image: images.url(&recipe.image),
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        })
        .collect())
}

pub async fn recipe_view<C: ConnectionTrait>(
    db: &C,
    images: &ImageStore,
    recipe: recipes::Model,
    viewer_id: Option<i32>,
) -> Result<RecipeView> {
    let mut views = build_recipe_views(db, images, vec![recipe], viewer_id).await?;
    views.pop().ok_or(Error::NotFound("recipe"))
}
