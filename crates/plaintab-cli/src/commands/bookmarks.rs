//! Bookmark command handlers

use anyhow::{bail, Context, Result};

use plaintab_core::{BookmarkChanges, NewTab};

use crate::output::Output;

/// List the bookmarks bar as the page shows it
pub fn list(tab: &NewTab, output: &Output) -> Result<()> {
    output.print_bookmarks(&tab.display_bookmarks());
    Ok(())
}

/// Change a bookmark's title and/or url
pub async fn update(
    tab: &NewTab,
    id: String,
    title: Option<String>,
    url: Option<String>,
    output: &Output,
) -> Result<()> {
    let changes = BookmarkChanges { title, url };
    if changes.is_empty() {
        bail!("Nothing to update. Pass --title and/or --url.");
    }

    tab.source()
        .edit(&id, changes)
        .await
        .with_context(|| format!("Failed to update bookmark {}", id))?;

    output.success(&format!("Updated bookmark {}", id));
    Ok(())
}

/// Remove a bookmark or folder
pub async fn delete(tab: &NewTab, id: String, output: &Output) -> Result<()> {
    tab.source()
        .delete(&id)
        .await
        .with_context(|| format!("Failed to delete bookmark {}", id))?;

    output.success(&format!("Deleted bookmark {}", id));
    Ok(())
}
