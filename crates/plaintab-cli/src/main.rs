//! plainTab CLI
//!
//! Command-line interface for plainTab - drives the new tab bookmark and
//! settings layer against a browser bookmarks file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use plaintab_core::{ChromeBookmarksFile, Config, JsonFileBackend, NewTab, NewTabOptions};

mod commands;
mod output;

use output::{Output, OutputFormat};

/// Log filter used when RUST_LOG is not set
const DEFAULT_LOG_FILTER: &str = "plaintab_core=warn,plaintab_cli=info";

#[derive(Parser)]
#[command(name = "plaintab")]
#[command(about = "plainTab - your bookmarks bar as a new tab page")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bookmarks on the bookmarks bar
    #[command(alias = "ls")]
    List,
    /// Edit a bookmark
    Update {
        /// Bookmark ID
        id: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New URL
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Delete a bookmark or folder
    #[command(alias = "rm")]
    Delete {
        /// Bookmark ID
        id: String,
    },
    /// Show or change page settings
    Settings {
        #[command(subcommand)]
        command: Option<SettingsCommands>,
    },
    /// Manage favicon overrides
    Favicon {
        #[command(subcommand)]
        command: FaviconCommands,
    },
    /// Print the bookmarks bar whenever it changes
    Watch,
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show all settings
    Show,
    /// Set one setting (e.g. `columns 8`, `titleColor #222222`)
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
    /// Restore the defaults
    Reset,
}

#[derive(Subcommand)]
enum FaviconCommands {
    /// Show the icon used for a URL
    Get {
        /// Bookmark URL
        url: String,
    },
    /// Override the icon for a URL
    Set {
        /// Bookmark URL
        url: String,
        /// Icon URL
        icon: String,
    },
    /// Remove the override for a URL
    #[command(alias = "rm")]
    Clear {
        /// Bookmark URL
        url: String,
    },
    /// List all overrides
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let result = run(Cli::parse()).await;
    if let Some(hint) = result.as_ref().err().and_then(recovery_hint) {
        eprintln!("Hint: {}", hint);
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands don't need a running page
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Path) => commands::config::path(config_path, &output),
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let host = Arc::new(ChromeBookmarksFile::new(bookmarks_path(&config)?));
    let backend = Arc::new(JsonFileBackend::new(config.storage_path()));

    let tab = NewTab::start(host.clone(), backend, NewTabOptions::from_config(&config))
        .await
        .context("Failed to load new tab state")?;

    let result = match cli.command {
        Commands::List => commands::bookmarks::list(&tab, &output),
        Commands::Update { id, title, url } => {
            commands::bookmarks::update(&tab, id, title, url, &output).await
        }
        Commands::Delete { id } => commands::bookmarks::delete(&tab, id, &output).await,
        Commands::Settings { command } => handle_settings_command(command, &tab, &output).await,
        Commands::Favicon { command } => handle_favicon_command(command, &tab, &output).await,
        Commands::Watch => commands::watch::run(&tab, &host, &output).await,
        Commands::Config { .. } => Ok(()), // Handled above
    };

    tab.shutdown().await;
    result
}

async fn handle_settings_command(
    command: Option<SettingsCommands>,
    tab: &NewTab,
    output: &Output,
) -> Result<()> {
    match command {
        Some(SettingsCommands::Show) | None => commands::settings::show(tab, output),
        Some(SettingsCommands::Set { key, value }) => {
            commands::settings::set(tab, key, value, output).await
        }
        Some(SettingsCommands::Reset) => commands::settings::reset(tab, output).await,
    }
}

async fn handle_favicon_command(
    command: FaviconCommands,
    tab: &NewTab,
    output: &Output,
) -> Result<()> {
    match command {
        FaviconCommands::Get { url } => commands::favicon::get(tab, url, output).await,
        FaviconCommands::Set { url, icon } => commands::favicon::set(tab, url, icon, output).await,
        FaviconCommands::Clear { url } => commands::favicon::clear(tab, url, output).await,
        FaviconCommands::List => commands::favicon::list(tab, output).await,
    }
}

/// Bookmarks file to read: configured, else the default Chrome profile's
fn bookmarks_path(config: &Config) -> Result<PathBuf> {
    config
        .bookmarks_file
        .clone()
        .or_else(ChromeBookmarksFile::default_path)
        .with_context(|| {
            format!(
                "No bookmarks file found. Set bookmarks_file in {} or PLAINTAB_BOOKMARKS_FILE.",
                Config::config_file_path().display()
            )
        })
}

/// Suggestion for storage failures the user can fix
fn recovery_hint(error: &anyhow::Error) -> Option<&'static str> {
    error.chain().find_map(|cause| match cause.downcast_ref::<plaintab_core::Error>() {
        Some(plaintab_core::Error::Persistence(storage)) => storage.recovery_suggestion(),
        _ => None,
    })
}

/// Log to stderr so command output on stdout stays clean
fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_update() {
        let cli = Cli::try_parse_from(["plaintab", "--json", "update", "42", "--title", "Docs"])
            .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Update { id, title, url } => {
                assert_eq!(id, "42");
                assert_eq!(title.as_deref(), Some("Docs"));
                assert!(url.is_none());
            }
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn test_parse_settings_set() {
        let cli = Cli::try_parse_from(["plaintab", "settings", "set", "titleColor", "#222222"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Settings {
                command: Some(SettingsCommands::Set { ref key, ref value })
            } if key == "titleColor" && value == "#222222"
        ));
    }

    #[test]
    fn test_recovery_hint_for_damaged_store() {
        let storage = plaintab_core::StorageError::InvalidFormat {
            path: PathBuf::from("storage.json"),
            details: "expected value".to_string(),
        };
        let error = anyhow::Error::new(plaintab_core::Error::from(storage))
            .context("Failed to set columns");
        assert!(recovery_hint(&error).unwrap().contains("damaged"));

        assert!(recovery_hint(&anyhow::anyhow!("Nothing to update")).is_none());
    }

    #[test]
    fn test_bookmarks_path_prefers_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            bookmarks_file: Some(temp_dir.path().join("Bookmarks")),
            ..Config::default()
        };
        assert_eq!(
            bookmarks_path(&config).unwrap(),
            temp_dir.path().join("Bookmarks")
        );
    }
}
