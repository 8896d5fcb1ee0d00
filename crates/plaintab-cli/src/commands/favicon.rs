//! Favicon command handlers

use anyhow::{Context, Result};

use plaintab_core::{resolve_favicon, NewTab};

use crate::output::Output;

/// Show the icon used for a bookmark url
pub async fn get(tab: &NewTab, url: String, output: &Output) -> Result<()> {
    let overrides = tab
        .favicons()
        .get_all()
        .await
        .context("Failed to read favicon overrides")?;

    let icon = resolve_favicon(&url, &overrides, &tab.options().favicon_service);
    output.print_favicon(&url, icon.as_deref(), overrides.contains_key(&url));
    Ok(())
}

/// Override the icon for a bookmark url
pub async fn set(tab: &NewTab, url: String, icon: String, output: &Output) -> Result<()> {
    tab.favicons()
        .set(&url, Some(icon.clone()))
        .await
        .with_context(|| format!("Failed to set favicon for {}", url))?;

    output.success(&format!("Favicon for {} set to {}", url, icon));
    Ok(())
}

/// Remove the override for a bookmark url
pub async fn clear(tab: &NewTab, url: String, output: &Output) -> Result<()> {
    tab.favicons()
        .set(&url, None)
        .await
        .with_context(|| format!("Failed to clear favicon for {}", url))?;

    output.success(&format!("Favicon override for {} cleared", url));
    Ok(())
}

/// List all overrides
pub async fn list(tab: &NewTab, output: &Output) -> Result<()> {
    let overrides = tab
        .favicons()
        .get_all()
        .await
        .context("Failed to read favicon overrides")?;

    output.print_favicons(&overrides);
    Ok(())
}
