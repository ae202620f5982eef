//! CLI handlers for the `cohort config` subcommand.

use std::path::Path;

use anyhow::{Result, anyhow};
use cohort_config::{Config, ShowFormat};

/// Show the resolved configuration with source annotations.
pub(crate) fn show_config(explicit: Option<&Path>, format: &str, section: Option<&str>) -> Result<()> {
    let resolved = Config::load(explicit)?;

    let show_format = match format {
        "json" => ShowFormat::Json,
        _ => ShowFormat::Toml,
    };

    let output = resolved
        .show(show_format, section)
        .map_err(|e| anyhow!("failed to format config: {e}"))?;

    println!("{output}");
    Ok(())
}

/// Validate the configuration, printing the files that were loaded.
pub(crate) fn validate_config(explicit: Option<&Path>) -> Result<()> {
    let resolved = Config::load(explicit)?;

    println!("Configuration is valid.");
    if !resolved.loaded_files.is_empty() {
        println!("\nLoaded files:");
        for path in &resolved.loaded_files {
            println!("  - {path}");
        }
    }
    Ok(())
}
