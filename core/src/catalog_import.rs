use std::io::Read;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::db::Database;
use crate::models::{NewIngredient, normalize_notes, validate_category};

/// A single row parsed from an ingredient-catalog CSV.
#[derive(Debug, Clone)]
pub struct CatalogRow {
    pub name: String,
    pub category: String,
    pub notes: Option<String>,
}

/// Summary of what a catalog import would do / did.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogImportSummary {
    pub rows_parsed: usize,
    pub created: usize,
    pub skipped_existing: usize,
    pub skipped_invalid: usize,
    pub warnings: Vec<String>,
}

/// Parse an ingredient-catalog CSV from any reader.
///
/// Expected header: `Name,Category,Notes` (case-insensitive; Notes optional).
pub fn parse_catalog_csv<R: Read>(reader: R) -> Result<Vec<CatalogRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    let idx_name = col("Name").context("Missing required column: Name")?;
    let idx_category = col("Category").context("Missing required column: Category")?;
    let idx_notes = col("Notes");

    let mut rows = Vec::new();

    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;

        let name = record.get(idx_name).unwrap_or("").trim().to_string();
        if name.is_empty() {
            continue; // skip blank rows
        }

        let category = record.get(idx_category).unwrap_or("").trim().to_string();
        let notes = normalize_notes(idx_notes.and_then(|i| record.get(i)));

        rows.push(CatalogRow {
            name,
            category,
            notes,
        });
    }

    Ok(rows)
}

/// Import parsed catalog rows for one user.
///
/// Rows whose name already exists in the catalog (case-insensitive) are
/// skipped, as are rows naming an unknown category. When `dry_run` is true,
/// no data is written.
pub fn import_catalog(
    db: &Database,
    user_id: &str,
    rows: &[CatalogRow],
    dry_run: bool,
) -> Result<CatalogImportSummary> {
    if rows.is_empty() {
        bail!("No ingredient rows found in the CSV");
    }

    let mut created: usize = 0;
    let mut skipped_existing: usize = 0;
    let mut skipped_invalid: usize = 0;
    let mut warnings: Vec<String> = Vec::new();

    // Names seen this run, so duplicate rows inside one file collapse too
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

    for row in rows {
        let category = match validate_category(&row.category) {
            Ok(c) => c,
            Err(e) => {
                skipped_invalid += 1;
                let name = &row.name;
                warnings.push(format!("{name}: {e}"));
                continue;
            }
        };

        let key = row.name.to_lowercase();
        if seen.contains(&key) || db.get_ingredient_by_name(user_id, &row.name)?.is_some() {
            skipped_existing += 1;
            seen.insert(key);
            continue;
        }
        seen.insert(key);

        if !dry_run {
            db.insert_ingredient(
                user_id,
                &NewIngredient {
                    name: row.name.clone(),
                    category,
                    notes: row.notes.clone(),
                },
            )?;
        }
        created += 1;
    }

    Ok(CatalogImportSummary {
        rows_parsed: rows.len(),
        created,
        skipped_existing,
        skipped_invalid,
        warnings,
    })
}
