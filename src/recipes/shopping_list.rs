use super::collections::Collection;
use crate::database::entities::{ingredients, recipe_ingredients};
use crate::error::{Error, Result};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use std::collections::BTreeMap;
use std::fmt::Write;

const HEADER: &str = "Shopping list:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Ingredient totals across every recipe in a cart, one entry per
/// (name, measurement unit) pair, ordered by name then unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    items: Vec<ShoppingListItem>,
}

impl ShoppingList {
    pub fn aggregate(rows: impl IntoIterator<Item = (String, String, i64)>) -> Self {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for (name, unit, amount) in rows {
            *totals.entry((name, unit)).or_default() += amount;
        }

        Self {
            items: totals
                .into_iter()
                .map(|((name, measurement_unit), amount)| ShoppingListItem {
                    name,
                    measurement_unit,
                    amount,
                })
                .collect(),
        }
    }

    pub fn items(&self) -> &[ShoppingListItem] {
        &self.items
    }

    pub fn render(&self) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for item in &self.items {
            // Writing into a String cannot fail.
            let _ = writeln!(
                out,
                "- {} ({}) - {}",
                item.name, item.measurement_unit, item.amount
            );
        }
        out
    }
}

pub fn file_name(username: &str) -> String {
    format!("{username}_cart.txt")
}

/// Aggregates the user's cart. An empty cart is reported as not found.
pub async fn shopping_list_for<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<ShoppingList> {
    if Collection::ShoppingCart.count(db, user_id).await? == 0 {
        return Err(Error::NotFound("shopping cart"));
    }

    let rows = recipe_ingredients::Entity::find()
        .filter(
            recipe_ingredients::Column::RecipeId
                .in_subquery(Collection::ShoppingCart.recipes_of(user_id)),
        )
        .find_also_related(ingredients::Entity)
        .all(db)
        .await?;

    Ok(ShoppingList::aggregate(rows.into_iter().filter_map(
        |(row, ingredient)| {
            ingredient.map(|ingredient| {
                (
                    ingredient.name,
                    ingredient.measurement_unit,
                    i64::from(row.amount),
                )
            })
        },
    )))
}
