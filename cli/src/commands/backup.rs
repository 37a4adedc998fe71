use std::path::Path;

use anyhow::{Context, Result};

use heft_core::db::Database;
use heft_core::models::BackupData;
use heft_core::service::TrackerService;

use super::helpers::confirm;

pub(crate) fn cmd_backup_export(
    svc: &TrackerService<Database>,
    file: &Path,
    json: bool,
) -> Result<()> {
    let backup = svc.export_backup()?;
    let contents = serde_json::to_string_pretty(&backup)?;
    std::fs::write(file, contents)
        .with_context(|| format!("Failed to write backup to {}", file.display()))?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "file": file.display().to_string(),
                "entries": backup.weights.len(),
            })
        );
    } else {
        println!(
            "Exported {} entries to {}",
            backup.weights.len(),
            file.display()
        );
    }

    Ok(())
}

pub(crate) fn cmd_backup_import(
    svc: &TrackerService<Database>,
    file: &Path,
    yes: bool,
    json: bool,
) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read backup from {}", file.display()))?;
    let backup: BackupData = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a valid heft backup", file.display()))?;

    // Restore replaces everything; make that explicit before proceeding.
    if !yes
        && !confirm(&format!(
            "Replace all current data with {} entries from {}?",
            backup.weights.len(),
            file.display()
        ))?
    {
        eprintln!("Aborted.");
        return Ok(());
    }

    let restored = svc.import_backup(&backup)?;

    if json {
        println!("{}", serde_json::json!({ "restored": restored }));
    } else {
        println!("Restored {restored} entries from {}", file.display());
    }

    Ok(())
}
