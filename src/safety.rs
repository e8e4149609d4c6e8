//! Guard for the stats report writer.
//!
//! The report is written next to the library database, so a typo in
//! `--stats-output` must never clobber the database itself.

use anyhow::{bail, Result};
use std::path::Path;

const DATABASE_EXTENSIONS: &[&str] = &["sqlite", "sqlite3", "db"];

/// Checks that `output` is safe to overwrite with a JSON report:
/// - it has a `.json` extension
/// - it is not the library database
/// - it is not an existing directory
pub fn validate_report_path(output: &Path, library: &Path) -> Result<()> {
    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if DATABASE_EXTENSIONS.contains(&extension.as_str()) {
        bail!(
            "Safety check failed: report '{}' looks like a database file",
            output.display()
        );
    }

    if extension != "json" {
        bail!(
            "Safety check failed: report '{}' must have a .json extension",
            output.display()
        );
    }

    if output == library {
        bail!(
            "Safety check failed: report '{}' cannot be the same as library '{}'",
            output.display(),
            library.display()
        );
    }

    if output.is_dir() {
        bail!(
            "Safety check failed: report '{}' is a directory",
            output.display()
        );
    }

    Ok(())
}
