//! Config command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use plaintab_core::{ChromeBookmarksFile, Config};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let bookmarks_file = config
        .bookmarks_file
        .clone()
        .or_else(ChromeBookmarksFile::default_path);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "storage_file": config.storage_path(),
                    "bookmarks_file": bookmarks_file,
                    "favicon_service": config.favicon_service,
                    "refresh_debounce_ms": config.refresh_debounce_ms
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:            {}", config.data_dir.display());
            println!(
                "  bookmarks_file:      {}",
                bookmarks_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not found)".to_string())
            );
            println!("  favicon_service:     {}", config.favicon_service);
            println!("  refresh_debounce_ms: {}", config.refresh_debounce_ms);
            println!();
            println!("Config file: {}", effective_path.display());
            println!("Storage:     {}", config.storage_path().display());
        }
    }

    Ok(())
}

/// Print the config file location
pub fn path(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);

    match output.format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "path": path })),
        _ => println!("{}", path.display()),
    }
    Ok(())
}
