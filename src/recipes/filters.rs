use super::collections::Collection;
use crate::database::entities::{recipe_tags, recipes, tags};
use crate::error::{Result, ValidationErrors};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{ColumnTrait, QueryFilter, Select};

/// Query-string filters for the recipe list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author_id: Option<i32>,
    /// Any recipe carrying at least one of these tag slugs matches.
    pub tag_slugs: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

fn parse_flag(errors: &mut ValidationErrors, field: &str, value: &str) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => true,
        "0" | "false" | "" => false,
        _ => {
            errors.add(field, "Select a valid choice.");
            false
        }
    }
}

impl RecipeFilter {
    /// Reads `author`, `tags` (repeatable), `is_favorited` and `is_in_shopping_cart`.
    /// Other parameters are ignored.
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self> {
        let mut filter = Self::default();
        let mut errors = ValidationErrors::new();

        for (key, value) in pairs {
            match key.as_str() {
                "author" => match value.trim().parse::<i32>() {
                    Ok(id) => filter.author_id = Some(id),
                    Err(_) => errors.add("author", "Enter a number."),
                },
                "tags" => {
                    let slug = value.trim();
                    if !slug.is_empty() && !filter.tag_slugs.iter().any(|s| s == slug) {
                        filter.tag_slugs.push(slug.to_string());
                    }
                }
                "is_favorited" => filter.is_favorited = parse_flag(&mut errors, key, value),
                "is_in_shopping_cart" => {
                    filter.is_in_shopping_cart = parse_flag(&mut errors, key, value)
                }
                _ => {}
            }
        }

        errors.into_result()?;
        Ok(filter)
    }

    /// Narrows the query. Collection flags only apply to an authenticated viewer.
    pub fn apply(
        &self,
        mut query: Select<recipes::Entity>,
        viewer_id: Option<i32>,
    ) -> Select<recipes::Entity> {
        if let Some(author_id) = self.author_id {
            query = query.filter(recipes::Column::AuthorId.eq(author_id));
        }

        if !self.tag_slugs.is_empty() {
            let tagged = Query::select()
                .column((recipe_tags::Entity, recipe_tags::Column::RecipeId))
                .from(recipe_tags::Entity)
                .inner_join(
                    tags::Entity,
                    Expr::col((tags::Entity, tags::Column::Id))
                        .equals((recipe_tags::Entity, recipe_tags::Column::TagId)),
                )
                .and_where(Expr::col((tags::Entity, tags::Column::Slug)).is_in(self.tag_slugs.clone()))
                .to_owned();
            query = query.filter(recipes::Column::Id.in_subquery(tagged));
        }

        if let Some(viewer_id) = viewer_id {
            if self.is_favorited {
                query = query.filter(
                    recipes::Column::Id.in_subquery(Collection::Favorites.recipes_of(viewer_id)),
                );
            }
            if self.is_in_shopping_cart {
                query = query.filter(
                    recipes::Column::Id
                        .in_subquery(Collection::ShoppingCart.recipes_of(viewer_id)),
                );
            }
        }

        query
    }
}
