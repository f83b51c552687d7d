use super::tags::{is_valid_color, is_valid_slug};
use crate::database::entities::{ingredients, tags};
use crate::error::{Result, ValidationErrors};
use anyhow::Context;
use sea_orm::{DatabaseConnection, EntityTrait, Set, TransactionTrait};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

const MAX_NAME_LENGTH: usize = 200;
const INSERT_CHUNK_SIZE: usize = 400;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagRecord {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub skipped: usize,
}

/// Reads a JSON array of records from `path`.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    serde_json::from_str(&source)
        .with_context(|| format!("Invalid JSON in import file: {}", path.display()))
}

fn check_text(errors: &mut ValidationErrors, row: usize, field: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        errors.add("records", format!("Row {row}: {field} must not be blank."));
    } else if value.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            "records",
            format!("Row {row}: {field} must have at most {MAX_NAME_LENGTH} characters."),
        );
    }
}

/// Inserts ingredients that are not present yet, matched by name and unit.
///
/// Any invalid row rejects the whole file.
pub async fn import_ingredients(
    db: &DatabaseConnection,
    records: Vec<IngredientRecord>,
) -> Result<ImportReport> {
    let mut errors = ValidationErrors::new();
    for (index, record) in records.iter().enumerate() {
        check_text(&mut errors, index + 1, "name", &record.name);
        check_text(&mut errors, index + 1, "measurement_unit", &record.measurement_unit);
    }
    errors.into_result()?;

    let txn = db.begin().await?;

    let mut seen: HashSet<(String, String)> = ingredients::Entity::find()
        .all(&txn)
        .await?
        .into_iter()
        .map(|ingredient| (ingredient.name, ingredient.measurement_unit))
        .collect();

    let mut report = ImportReport::default();
    let mut pending = Vec::new();
    for record in records {
        let key = (
            record.name.trim().to_string(),
            record.measurement_unit.trim().to_string(),
        );
        if !seen.insert(key.clone()) {
            report.skipped += 1;
            continue;
        }
        pending.push(ingredients::ActiveModel {
            name: Set(key.0),
            measurement_unit: Set(key.1),
            ..Default::default()
        });
    }

    report.created = pending.len();
    for chunk in pending.chunks(INSERT_CHUNK_SIZE) {
        ingredients::Entity::insert_many(chunk.to_vec())
            .exec_without_returning(&txn)
            .await?;
    }

    txn.commit().await?;

    info!(
        created = report.created,
        skipped = report.skipped,
        "Imported ingredients"
    );
    Ok(report)
}

/// Inserts tags whose name, color and slug are all unused.
pub async fn import_tags(db: &DatabaseConnection, records: Vec<TagRecord>) -> Result<ImportReport> {
    let mut errors = ValidationErrors::new();
    for (index, record) in records.iter().enumerate() {
        let row = index + 1;
        check_text(&mut errors, row, "name", &record.name);
        if !is_valid_color(record.color.trim()) {
            errors.add("records", format!("Row {row}: color must be a hex color like #49B64E."));
        }
        if !is_valid_slug(record.slug.trim()) {
            errors.add(
                "records",
                format!("Row {row}: slug may contain only letters, numbers, hyphens and underscores."),
            );
        }
    }
    errors.into_result()?;

    let txn = db.begin().await?;

    let existing = tags::Entity::find().all(&txn).await?;
    let mut names: HashSet<String> = existing.iter().map(|tag| tag.name.clone()).collect();
    let mut colors: HashSet<String> = existing
        .iter()
        .map(|tag| tag.color.to_uppercase())
        .collect();
    let mut slugs: HashSet<String> = existing.into_iter().map(|tag| tag.slug).collect();

    let mut report = ImportReport::default();
    let mut pending = Vec::new();
    for record in records {
        let name = record.name.trim().to_string();
        let color = record.color.trim().to_string();
        let slug = record.slug.trim().to_string();

        if names.contains(&name) || colors.contains(&color.to_uppercase()) || slugs.contains(&slug)
        {
            report.skipped += 1;
            continue;
        }
        names.insert(name.clone());
        colors.insert(color.to_uppercase());
        slugs.insert(slug.clone());

        pending.push(tags::ActiveModel {
            name: Set(name),
            color: Set(color),
            slug: Set(slug),
            ..Default::default()
        });
    }

    report.created = pending.len();
    if !pending.is_empty() {
        tags::Entity::insert_many(pending)
            .exec_without_returning(&txn)
            .await?;
    }

    txn.commit().await?;

    info!(created = report.created, skipped = report.skipped, "Imported tags");
    Ok(report)
}
