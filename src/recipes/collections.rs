use crate::database::entities::{favorites, shopping_carts};
use crate::error::{Error, Result, is_unique_violation};
use sea_orm::sea_query::{Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect,
};
use std::collections::HashSet;
use tracing::info;

/// A user-scoped set of recipes backed by a `(user_id, recipe_id)` join table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Favorites,
    ShoppingCart,
}

trait CollectionTable: EntityTrait {
    type Row: ActiveModelTrait<Entity = Self> + Send;

    const USER: Self::Column;
    const RECIPE: Self::Column;

    fn row(user_id: i32, recipe_id: i32) -> Self::Row;
}

impl CollectionTable for favorites::Entity {
    type Row = favorites::ActiveModel;

    const USER: favorites::Column = favorites::Column::UserId;
    const RECIPE: favorites::Column = favorites::Column::RecipeId;

    fn row(user_id: i32, recipe_id: i32) -> favorites::ActiveModel {
        favorites::ActiveModel {
            user_id: ActiveValue::Set(user_id),
            recipe_id: ActiveValue::Set(recipe_id),
            ..Default::default()
        }
    }
}

impl CollectionTable for shopping_carts::Entity {
    type Row = shopping_carts::ActiveModel;

    const USER: shopping_carts::Column = shopping_carts::Column::UserId;
    const RECIPE: shopping_carts::Column = shopping_carts::Column::RecipeId;

    fn row(user_id: i32, recipe_id: i32) -> shopping_carts::ActiveModel {
        shopping_carts::ActiveModel {
            user_id: ActiveValue::Set(user_id),
            recipe_id: ActiveValue::Set(recipe_id),
            ..Default::default()
        }
    }
}

async fn insert_row<E: CollectionTable, C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    recipe_id: i32,
) -> Result<bool>
where
    E::Model: Sync,
{
    let present = E::find()
        .filter(E::USER.eq(user_id))
        .filter(E::RECIPE.eq(recipe_id))
        .count(db)
        .await?;
    if present > 0 {
        return Ok(false);
    }

    match E::insert(E::row(user_id, recipe_id)).exec(db).await {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn delete_rows<E: CollectionTable, C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    recipe_id: i32,
) -> Result<u64> {
    let result = E::delete_many()
        .filter(E::USER.eq(user_id))
        .filter(E::RECIPE.eq(recipe_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

async fn member_ids<E: CollectionTable, C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    recipe_ids: &[i32],
) -> Result<HashSet<i32>> {
    let rows = E::find()
        .filter(E::USER.eq(user_id))
        .filter(E::RECIPE.is_in(recipe_ids.iter().copied()))
        .select_only()
        .column(E::RECIPE)
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(rows.into_iter().collect())
}

async fn count_rows<E: CollectionTable, C: ConnectionTrait>(db: &C, user_id: i32) -> Result<u64>
where
    E::Model: Sync,
{
    Ok(E::find().filter(E::USER.eq(user_id)).count(db).await?)
}

fn recipes_subquery<E: CollectionTable>(user_id: i32) -> SelectStatement {
    Query::select()
        .column(E::RECIPE)
        .from(E::default())
        .and_where(E::USER.eq(user_id))
        .to_owned()
}

impl Collection {
    fn label(self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::ShoppingCart => "the shopping cart",
        }
    }

    /// Adds the recipe, rejecting a recipe that is already present.
    pub async fn add<C: ConnectionTrait>(self, db: &C, user_id: i32, recipe_id: i32) -> Result<()> {
        let inserted = match self {
            Self::Favorites => insert_row::<favorites::Entity, _>(db, user_id, recipe_id).await?,
            Self::ShoppingCart => {
                insert_row::<shopping_carts::Entity, _>(db, user_id, recipe_id).await?
            }
        };

        if !inserted {
            return Err(Error::Rejected(format!(
                "Recipe is already in {}",
                self.label()
            )));
        }
        info!(user_id, recipe_id, collection = self.label(), "Added recipe");
        Ok(())
    }

    /// Removes the recipe; removing a recipe that is not present is an error.
    pub async fn remove<C: ConnectionTrait>(
        self,
        db: &C,
        user_id: i32,
        recipe_id: i32,
    ) -> Result<()> {
        let removed = match self {
            Self::Favorites => delete_rows::<favorites::Entity, _>(db, user_id, recipe_id).await?,
            Self::ShoppingCart => {
                delete_rows::<shopping_carts::Entity, _>(db, user_id, recipe_id).await?
            }
        };

        if removed == 0 {
            return Err(Error::DeleteFailed(format!(
                "Recipe is not in {}",
                self.label()
            )));
        }
        info!(user_id, recipe_id, collection = self.label(), "Removed recipe");
        Ok(())
    }

    /// Which of `recipe_ids` the user has in this collection.
    pub async fn recipe_ids<C: ConnectionTrait>(
        self,
        db: &C,
        user_id: i32,
        recipe_ids: &[i32],
    ) -> Result<HashSet<i32>> {
        if recipe_ids.is_empty() {
            return Ok(HashSet::new());
        }
        match self {
            Self::Favorites => member_ids::<favorites::Entity, _>(db, user_id, recipe_ids).await,
            Self::ShoppingCart => {
                member_ids::<shopping_carts::Entity, _>(db, user_id, recipe_ids).await
            }
        }
    }

    pub async fn count<C: ConnectionTrait>(self, db: &C, user_id: i32) -> Result<u64> {
        match self {
            Self::Favorites => count_rows::<favorites::Entity, _>(db, user_id).await,
            Self::ShoppingCart => count_rows::<shopping_carts::Entity, _>(db, user_id).await,
        }
    }

    /// `SELECT recipe_id` of the user's rows, for use with `in_subquery`.
    pub fn recipes_of(self, user_id: i32) -> SelectStatement {
        match self {
            Self::Favorites => recipes_subquery::<favorites::Entity>(user_id),
            Self::ShoppingCart => recipes_subquery::<shopping_carts::Entity>(user_id),
        }
    }
}
