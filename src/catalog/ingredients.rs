use crate::database::entities::ingredients;
use crate::error::{Error, Result};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientView {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<ingredients::Model> for IngredientView {
    fn from(ingredient: ingredients::Model) -> Self {
        Self {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Ingredients ordered by name, optionally restricted to a case-insensitive name prefix.
pub async fn list_ingredients<C: ConnectionTrait>(
    db: &C,
    name_prefix: Option<&str>,
) -> Result<Vec<IngredientView>> {
    let mut query = ingredients::Entity::find();

    if let Some(prefix) = name_prefix.map(str::trim).filter(|prefix| !prefix.is_empty()) {
        let pattern = format!("{}%", escape_like(&prefix.to_lowercase()));
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(ingredients::Column::Name)))
                .like(LikeExpr::new(pattern).escape('\\')),
        );
    }

    let found = query
        .order_by_asc(ingredients::Column::Name)
        .order_by_asc(ingredients::Column::MeasurementUnit)
        .all(db)
        .await?;

    Ok(found.into_iter().map(IngredientView::from).collect())
}

pub async fn get_ingredient<C: ConnectionTrait>(db: &C, id: i32) -> Result<IngredientView> {
    ingredients::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(IngredientView::from)
        .ok_or(Error::NotFound("ingredient"))
}
