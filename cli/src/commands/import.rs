use std::path::Path;

use anyhow::{Context, Result};

use larder_core::models::UserContext;
use larder_core::service::PlannerService;

pub(crate) fn cmd_import_ingredients(
    svc: &PlannerService,
    user: &UserContext,
    file: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let csv_data = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let summary = svc.import_catalog_csv(user, &csv_data, dry_run)?;

    if !summary.warnings.is_empty() {
        eprintln!("Skipped rows:");
        for w in &summary.warnings {
            eprintln!("  {w}");
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let prefix = if dry_run { "Would import" } else { "Imported" };
    let created = summary.created;
    let parsed = summary.rows_parsed;
    let existing = summary.skipped_existing;
    let invalid = summary.skipped_invalid;
    println!("{prefix} {created} of {parsed} ingredients ({existing} already present, {invalid} invalid)");

    Ok(())
}
