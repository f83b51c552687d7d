use super::images::{DecodedImage, decode_image};
use crate::database::entities::{ingredients, tags};
use crate::error::{Error, REQUIRED_FIELD, Result, ValidationErrors};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Deserialize;
use std::collections::HashSet;

const MAX_NAME_LENGTH: usize = 200;
const MAX_SMALL_INT: i64 = 32_767;
const BLANK_FIELD: &str = "This field may not be blank.";

/// Request body for creating (`POST`) or updating (`PATCH`) a recipe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeWrite {
    pub ingredients: Option<Vec<IngredientAmountWrite>>,
    pub tags: Option<Vec<i64>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientAmountWrite {
    pub id: i64,
    pub amount: i64,
}

/// The full replacement set of a recipe's tags and ingredient amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Associations {
    pub tag_ids: Vec<i32>,
    /// `(ingredient_id, amount)` pairs.
    pub ingredients: Vec<(i32, i32)>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: DecodedImage,
    pub associations: Associations,
}

/// Absent fields are left unchanged; associations are always replaced.
#[derive(Debug, Clone)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<DecodedImage>,
    pub associations: Associations,
}

pub async fn validate_create<C: ConnectionTrait>(db: &C, request: RecipeWrite) -> Result<NewRecipe> {
    let mut errors = ValidationErrors::new();

    let associations =
        check_associations(db, &mut errors, request.tags.as_deref(), request.ingredients.as_deref())
            .await?;
    let name = check_name(&mut errors, request.name.as_deref(), true);
    let text = check_text(&mut errors, request.text.as_deref(), true);
    let cooking_time = check_cooking_time(&mut errors, request.cooking_time, true);
    let image = check_image(&mut errors, request.image.as_deref(), true);

    match (associations, name, text, cooking_time, image) {
        (Some(associations), Some(name), Some(text), Some(cooking_time), Some(image))
            if errors.is_empty() =>
        {
            Ok(NewRecipe {
                name,
                text,
                cooking_time,
                image,
                associations,
            })
        }
        _ => Err(Error::Validation(errors)),
    }
}

pub async fn validate_update<C: ConnectionTrait>(
    db: &C,
    request: RecipeWrite,
) -> Result<RecipeChanges> {
    let mut errors = ValidationErrors::new();

    let associations =
        check_associations(db, &mut errors, request.tags.as_deref(), request.ingredients.as_deref())
            .await?;
    let name = check_name(&mut errors, request.name.as_deref(), false);
    let text = check_text(&mut errors, request.text.as_deref(), false);
    let cooking_time = check_cooking_time(&mut errors, request.cooking_time, false);
    let image = check_image(&mut errors, request.image.as_deref(), false);

    match associations {
        Some(associations) if errors.is_empty() => Ok(RecipeChanges {
            name,
            text,
            cooking_time,
            image,
            associations,
        }),
        _ => Err(Error::Validation(errors)),
    }
}

fn check_name(errors: &mut ValidationErrors, name: Option<&str>, required: bool) -> Option<String> {
    let Some(name) = name else {
        if required {
            errors.add("name", REQUIRED_FIELD);
        }
        return None;
    };

    let name = name.trim();
    if name.is_empty() {
        errors.add("name", BLANK_FIELD);
        return None;
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            "name",
            format!("Ensure this field has no more than {MAX_NAME_LENGTH} characters."),
        );
        return None;
    }
    Some(name.to_string())
}

fn check_text(errors: &mut ValidationErrors, text: Option<&str>, required: bool) -> Option<String> {
    let Some(text) = text else {
        if required {
            errors.add("text", REQUIRED_FIELD);
        }
        return None;
    };

    let text = text.trim();
    if text.is_empty() {
        errors.add("text", BLANK_FIELD);
        return None;
    }
    Some(text.to_string())
}

fn check_cooking_time(
    errors: &mut ValidationErrors,
    cooking_time: Option<i64>,
    required: bool,
) -> Option<i32> {
    match cooking_time {
        None => {
            if required {
                errors.add("cooking_time", REQUIRED_FIELD);
            }
            None
        }
        Some(minutes) if minutes < 1 => {
            errors.add("cooking_time", "Cooking time must be at least 1 minute");
            None
        }
        Some(minutes) if minutes > MAX_SMALL_INT => {
            errors.add(
                "cooking_time",
                format!("Cooking time must be at most {MAX_SMALL_INT} minutes"),
            );
            None
        }
        Some(minutes) => i32::try_from(minutes).ok(),
    }
}

fn check_image(errors: &mut ValidationErrors, image: Option<&str>, required: bool) -> Option<DecodedImage> {
    let Some(image) = image else {
        if required {
            errors.add("image", REQUIRED_FIELD);
        }
        return None;
    };

    let decoded = decode_image(image);
    if decoded.is_none() {
        errors.add("image", "Upload a valid image.");
    }
    decoded
}

fn missing_object(id: i64) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

/// Checks every tag and ingredient entry, collecting all problems rather than
/// stopping at the first one.
async fn check_associations<C: ConnectionTrait>(
    db: &C,
    errors: &mut ValidationErrors,
    tags: Option<&[i64]>,
    ingredients: Option<&[IngredientAmountWrite]>,
) -> Result<Option<Associations>> {
    let tag_ids = check_tags(db, errors, tags).await?;
    let ingredients = check_ingredients(db, errors, ingredients).await?;

    Ok(match (tag_ids, ingredients) {
        (Some(tag_ids), Some(ingredients)) => Some(Associations {
            tag_ids,
            ingredients,
        }),
        _ => None,
    })
}

async fn check_tags<C: ConnectionTrait>(
    db: &C,
    errors: &mut ValidationErrors,
    requested: Option<&[i64]>,
) -> Result<Option<Vec<i32>>> {
    let Some(requested) = requested else {
        errors.add("tags", REQUIRED_FIELD);
        return Ok(None);
    };
    if requested.is_empty() {
        errors.add("tags", "At least one tag is required");
        return Ok(None);
    }

    let mut valid = true;
    let mut seen = HashSet::new();
    for id in requested {
        if !seen.insert(*id) {
            errors.add("tags", "Tags must be unique");
            valid = false;
        }
    }

    let ids: Vec<i32> = seen.iter().filter_map(|id| i32::try_from(*id).ok()).collect();
    let existing: HashSet<i32> = if ids.is_empty() {
        HashSet::new()
    } else {
        tags::Entity::find()
            .filter(tags::Column::Id.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|tag| tag.id)
            .collect()
    };

    for id in requested {
        let exists = i32::try_from(*id).is_ok_and(|id| existing.contains(&id));
        if !exists {
            errors.add("tags", missing_object(*id));
            valid = false;
        }
    }

    if !valid {
        return Ok(None);
    }
    Ok(Some(
        requested
            .iter()
            .filter_map(|id| i32::try_from(*id).ok())
            .collect(),
    ))
}

async fn check_ingredients<C: ConnectionTrait>(
    db: &C,
    errors: &mut ValidationErrors,
    requested: Option<&[IngredientAmountWrite]>,
) -> Result<Option<Vec<(i32, i32)>>> {
    let Some(requested) = requested else {
        errors.add("ingredients", REQUIRED_FIELD);
        return Ok(None);
    };
    if requested.is_empty() {
        errors.add("ingredients", "At least one ingredient is required");
        return Ok(None);
    }

    let mut valid = true;
    let mut seen = HashSet::new();
    for entry in requested {
        if !seen.insert(entry.id) {
            errors.add("ingredients", "Ingredients must not repeat");
            valid = false;
        }
        if entry.amount < 1 {
            errors.add("ingredients", "Amount must be at least 1");
            valid = false;
        } else if entry.amount > MAX_SMALL_INT {
            errors.add(
                "ingredients",
                format!("Amount must be at most {MAX_SMALL_INT}"),
            );
            valid = false;
        }
    }

    let ids: Vec<i32> = seen.iter().filter_map(|id| i32::try_from(*id).ok()).collect();
    let existing: HashSet<i32> = if ids.is_empty() {
        HashSet::new()
    } else {
        ingredients::Entity::find()
            .filter(ingredients::Column::Id.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|ingredient| ingredient.id)
            .collect()
    };

    for entry in requested {
        let exists = i32::try_from(entry.id).is_ok_and(|id| existing.contains(&id));
        if !exists {
            errors.add("ingredients", missing_object(entry.id));
            valid = false;
        }
    }

    if !valid {
        return Ok(None);
    }
    Ok(Some(
        requested
            .iter()
            .filter_map(|entry| {
                let id = i32::try_from(entry.id).ok()?;
                let amount = i32::try_from(entry.amount).ok()?;
                Some((id, amount))
            })
            .collect(),
    ))
}
