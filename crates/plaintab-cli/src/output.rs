//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use plaintab_core::{BookmarkItem, FaviconOverrides, SettingKey, Settings};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print the bookmarks bar as shown on the page
    pub fn print_bookmarks(&self, items: &[BookmarkItem]) {
        match self.format {
            OutputFormat::Human => {
                if items.is_empty() {
                    println!("No bookmarks on the bookmarks bar.");
                    return;
                }
                for item in items {
                    println!(
                        "{:>6} | {} | {}",
                        item.id,
                        truncate(&item.title, 35),
                        truncate(&item.url, 45)
                    );
                }
                println!("\n{} bookmark(s)", items.len());
            }
            OutputFormat::Json => print_json(&items),
            OutputFormat::Quiet => {
                for item in items {
                    println!("{}", item.url);
                }
            }
        }
    }

    /// Print every setting with its current value
    pub fn print_settings(&self, settings: &Settings) {
        match self.format {
            OutputFormat::Human => {
                let fields = serde_json::to_value(settings).unwrap_or_default();
                println!("Settings:");
                for key in SettingKey::ALL {
                    let value = fields.get(key.as_str()).cloned().unwrap_or_default();
                    println!("  {:<20} {}", key.as_str(), value);
                }
            }
            OutputFormat::Json => print_json(settings),
            OutputFormat::Quiet => {}
        }
    }

    /// Print the icon shown for a url and where it comes from
    pub fn print_favicon(&self, url: &str, icon: Option<&str>, overridden: bool) {
        match self.format {
            OutputFormat::Human => match icon {
                Some(icon) if overridden => println!("{} (override)", icon),
                Some(icon) => println!("{} (derived)", icon),
                None => println!("No favicon for {}", url),
            },
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"url": url, "icon": icon, "override": overridden})
                );
            }
            OutputFormat::Quiet => {
                if let Some(icon) = icon {
                    println!("{}", icon);
                }
            }
        }
    }

    /// Print all favicon overrides
    pub fn print_favicons(&self, overrides: &FaviconOverrides) {
        match self.format {
            OutputFormat::Human => {
                if overrides.is_empty() {
                    println!("No favicon overrides.");
                    return;
                }
                for (url, icon) in overrides {
                    println!("{} -> {}", truncate(url, 45), icon);
                }
                println!("\n{} override(s)", overrides.len());
            }
            OutputFormat::Json => print_json(overrides),
            OutputFormat::Quiet => {
                for url in overrides.keys() {
                    println!("{}", url);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
