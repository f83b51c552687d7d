use super::images::ImageStore;
use super::validation::{Associations, NewRecipe, RecipeChanges};
use crate::database::entities::{
    favorites, recipe_ingredients, recipe_tags, recipes, shopping_carts,
};
use crate::error::{Error, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use tracing::{debug, info};

/// Replaces the recipe's tag set and ingredient amounts with `associations`.
///
/// Run inside the transaction that writes the recipe row.
pub async fn replace_associations<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
    associations: &Associations,
) -> Result<()> {
    recipe_tags::Entity::delete_many()
        .filter(recipe_tags::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    recipe_ingredients::Entity::delete_many()
        .filter(recipe_ingredients::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;

    if !associations.tag_ids.is_empty() {
        recipe_tags::Entity::insert_many(associations.tag_ids.iter().map(|tag_id| {
            recipe_tags::ActiveModel {
                recipe_id: Set(recipe_id),
                tag_id: Set(*tag_id),
            }
        }))
        .exec_without_returning(db)
        .await?;
    }

    if !associations.ingredients.is_empty() {
        recipe_ingredients::Entity::insert_many(associations.ingredients.iter().map(
            |(ingredient_id, amount)| recipe_ingredients::ActiveModel {
                recipe_id: Set(recipe_id),
                ingredient_id: Set(*ingredient_id),
                amount: Set(*amount),
                ..Default::default()
            },
        ))
        .exec_without_returning(db)
        .await?;
    }

    debug!(
        recipe_id,
        tags = associations.tag_ids.len(),
        ingredients = associations.ingredients.len(),
        "Replaced recipe associations"
    );
    Ok(())
}

pub async fn create_recipe(
    db: &DatabaseConnection,
    images: &ImageStore,
    author_id: i32,
    recipe: NewRecipe,
) -> Result<recipes::Model> {
    let image = images.save(&recipe.image).await?;

    let result = async {
        let txn = db.begin().await?;
        let created = recipes::ActiveModel {
            author_id: Set(Some(author_id)),
            name: Set(recipe.name),
            text: Set(recipe.text),
            cooking_time: Set(recipe.cooking_time),
            image: Set(image.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        replace_associations(&txn, created.id, &recipe.associations).await?;
        txn.commit().await?;
        Ok::<_, Error>(created)
    }
    .await;

    match result {
        Ok(created) => {
            info!(recipe_id = created.id, author_id, "Created recipe");
            Ok(created)
        }
        Err(e) => {
            images.remove(&image).await;
            Err(e)
        }
    }
}

pub async fn update_recipe(
    db: &DatabaseConnection,
    images: &ImageStore,
    recipe: recipes::Model,
    changes: RecipeChanges,
) -> Result<recipes::Model> {
    let new_image = match &changes.image {
        Some(image) => Some(images.save(image).await?),
        None => None,
    };
    let old_image = recipe.image.clone();

    let result = async {
        let txn = db.begin().await?;

        let mut active: recipes::ActiveModel = recipe.clone().into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(text) = changes.text {
            active.text = Set(text);
        }
        if let Some(cooking_time) = changes.cooking_time {
            active.cooking_time = Set(cooking_time);
        }
        if let Some(image) = &new_image {
            active.image = Set(image.clone());
        }

        let updated = if active.is_changed() {
            active.update(&txn).await?
        } else {
            recipe
        };
        replace_associations(&txn, updated.id, &changes.associations).await?;
        txn.commit().await?;
        Ok::<_, Error>(updated)
    }
    .await;

    match result {
        Ok(updated) => {
            if new_image.is_some() {
                images.remove(&old_image).await;
            }
            info!(recipe_id = updated.id, "Updated recipe");
            Ok(updated)
        }
        Err(e) => {
            if let Some(image) = &new_image {
                images.remove(image).await;
            }
            Err(e)
        }
    }
}

/// Deletes the recipe with every row that references it, then its image.
pub async fn delete_recipe(
    db: &DatabaseConnection,
    images: &ImageStore,
    recipe: recipes::Model,
) -> Result<()> {
    let txn = db.begin().await?;

    recipe_tags::Entity::delete_many()
        .filter(recipe_tags::Column::RecipeId.eq(recipe.id))
        .exec(&txn)
        .await?;
    recipe_ingredients::Entity::delete_many()
        .filter(recipe_ingredients::Column::RecipeId.eq(recipe.id))
        .exec(&txn)
        .await?;
    favorites::Entity::delete_many()
        .filter(favorites::Column::RecipeId.eq(recipe.id))
        .exec(&txn)
        .await?;
    shopping_carts::Entity::delete_many()
        .filter(shopping_carts::Column::RecipeId.eq(recipe.id))
        .exec(&txn)
        .await?;
    recipes::Entity::delete_by_id(recipe.id).exec(&txn).await?;

    txn.commit().await?;

    images.remove(&recipe.image).await;
    info!(recipe_id = recipe.id, "Deleted recipe");
    Ok(())
}
