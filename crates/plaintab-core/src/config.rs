//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/plaintab/config.toml)
//! 3. Environment variables (PLAINTAB_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::favicon::DEFAULT_FAVICON_SERVICE;

/// Environment variable prefix
const ENV_PREFIX: &str = "PLAINTAB";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Directory holding the synced key-value store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Browser bookmarks file to mirror (defaults to the Chrome profile's)
    #[serde(default)]
    pub bookmarks_file: Option<PathBuf>,

    /// Base URL of the favicon service
    #[serde(default = "default_favicon_service")]
    pub favicon_service: String,

    /// Quiet period before refreshing after bookmark events (0 disables)
    #[serde(default)]
    pub refresh_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bookmarks_file: None,
            favicon_service: default_favicon_service(),
            refresh_debounce_ms: 0,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (PLAINTAB_DATA_DIR, PLAINTAB_BOOKMARKS_FILE, ...)
    /// 2. Config file (~/.config/plaintab/config.toml or PLAINTAB_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, using `path` instead of the default file when given
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_BOOKMARKS_FILE", ENV_PREFIX)) {
            self.bookmarks_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        if let Ok(val) = std::env::var(format!("{}_FAVICON_SERVICE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.favicon_service = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_REFRESH_DEBOUNCE_MS", ENV_PREFIX)) {
            match val.parse() {
                Ok(ms) => self.refresh_debounce_ms = ms,
                Err(_) => tracing::warn!("Ignoring invalid {}_REFRESH_DEBOUNCE_MS={}", ENV_PREFIX, val),
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with PLAINTAB_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plaintab")
            .join("config.toml")
    }

    /// Get the path to the key-value store file
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }

    /// Debounce window for bookmark refreshes
    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plaintab")
}

fn default_favicon_service() -> String {
    DEFAULT_FAVICON_SERVICE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "PLAINTAB_DATA_DIR",
        "PLAINTAB_BOOKMARKS_FILE",
        "PLAINTAB_FAVICON_SERVICE",
        "PLAINTAB_REFRESH_DEBOUNCE_MS",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.bookmarks_file.is_none());
        assert_eq!(config.favicon_service, DEFAULT_FAVICON_SERVICE);
        assert_eq!(config.refresh_debounce(), Duration::ZERO);
        assert!(config.data_dir.ends_with("plaintab"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config::default();
        assert!(config.storage_path().ends_with("storage.json"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("PLAINTAB_DATA_DIR", "/tmp/plaintab-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/plaintab-test"));
    }

    #[test]
    fn test_env_override_bookmarks_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("PLAINTAB_BOOKMARKS_FILE", "/profiles/Default/Bookmarks");
        config.apply_env_overrides();
        assert_eq!(
            config.bookmarks_file,
            Some(PathBuf::from("/profiles/Default/Bookmarks"))
        );

        // Empty string clears it
        env::set_var("PLAINTAB_BOOKMARKS_FILE", "");
        config.apply_env_overrides();
        assert!(config.bookmarks_file.is_none());
    }

    #[test]
    fn test_env_override_debounce() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();
        env::set_var("PLAINTAB_REFRESH_DEBOUNCE_MS", "250");
        config.apply_env_overrides();
        assert_eq!(config.refresh_debounce(), Duration::from_millis(250));

        env::set_var("PLAINTAB_REFRESH_DEBOUNCE_MS", "soon");
        config.apply_env_overrides();
        assert_eq!(config.refresh_debounce_ms, 250);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            favicon_service = "https://icons.example/"
            refresh_debounce_ms = 100
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.favicon_service, "https://icons.example/");
        assert_eq!(config.refresh_debounce_ms, 100);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            bookmarks_file: Some(temp_dir.path().join("Bookmarks")),
            refresh_debounce_ms: 50,
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.data_dir.exists());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("PLAINTAB_DATA_DIR", temp_dir.path().join("data"));

        let config = Config::load_from_path(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(config.bookmarks_file.is_none());
        assert_eq!(config.refresh_debounce_ms, 0);
    }
}
