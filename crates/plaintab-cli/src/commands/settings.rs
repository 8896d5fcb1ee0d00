//! Settings command handlers

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use plaintab_core::{NewTab, SettingKey};

use crate::output::Output;

/// Show all settings
pub fn show(tab: &NewTab, output: &Output) -> Result<()> {
    output.print_settings(&tab.settings().current());
    Ok(())
}

/// Set one setting
///
/// The value is read as JSON when it parses (`8`, `true`, `"x"`), otherwise
/// as a plain string, so `#222222` needs no quoting.
pub async fn set(tab: &NewTab, key: String, value: String, output: &Output) -> Result<()> {
    let setting: SettingKey = key.parse().map_err(|e| {
        anyhow!(
            "{}\nValid settings: {}",
            e,
            SettingKey::ALL.map(|k| k.as_str()).join(", ")
        )
    })?;

    let updated = tab
        .settings()
        .update_one(setting, parse_value(&value))
        .await
        .with_context(|| format!("Failed to set {}", setting))?;

    output.success(&format!("Set {} = {}", setting, value));
    if output.is_json() {
        output.print_settings(&updated);
    }
    Ok(())
}

/// Restore all defaults
pub async fn reset(tab: &NewTab, output: &Output) -> Result<()> {
    tab.settings()
        .reset()
        .await
        .context("Failed to reset settings")?;

    output.success("Settings reset to defaults");
    Ok(())
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
