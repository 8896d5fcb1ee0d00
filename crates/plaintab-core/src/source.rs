//! Bookmark source adapter
//!
//! Wraps a [`BookmarkHost`]: reads the bookmarks bar as a flat display list
//! and forwards edits, turning host errors into [`Error::HostRejection`].
//! Holds no state of its own, so a failed call leaves nothing to undo.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::flatten::flatten;
use crate::host::{BookmarkHost, HostError, BOOKMARKS_BAR_ID};
use crate::models::{BookmarkChanges, BookmarkItem};

/// Adapter over the host bookmark service
#[derive(Clone)]
pub struct BookmarkSource {
    host: Arc<dyn BookmarkHost>,
}

impl BookmarkSource {
    pub fn new(host: Arc<dyn BookmarkHost>) -> Self {
        Self { host }
    }

    /// The wrapped host
    pub fn host(&self) -> &Arc<dyn BookmarkHost> {
        &self.host
    }

    /// Fetch and flatten the bookmarks bar
    ///
    /// A missing bookmarks bar yields an empty list.
    pub async fn fetch_root(&self) -> Result<Vec<BookmarkItem>> {
        let children = match self.host.get_children(BOOKMARKS_BAR_ID).await {
            Ok(children) => children,
            Err(HostError::NotFound(_)) => {
                debug!("Bookmarks bar not found, showing no bookmarks");
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::host("fetch", BOOKMARKS_BAR_ID, e)),
        };

        let items = flatten(&children);
        debug!("Fetched {} bookmark(s) from bookmarks bar", items.len());
        Ok(items)
    }

    /// Set a bookmark's title and url
    pub async fn update(&self, id: &str, title: &str, url: &str) -> Result<()> {
        self.edit(id, BookmarkChanges::new(title, url)).await
    }

    /// Apply only the given changes to a bookmark
    pub async fn edit(&self, id: &str, changes: BookmarkChanges) -> Result<()> {
        self.host.update(id, changes).await.map_err(|e| {
            warn!("Host rejected update of bookmark {}: {}", id, e);
            Error::host("update", id, e)
        })
    }

    /// Remove a bookmark
    ///
    /// Folder ids are passed through; the host decides what removing a
    /// folder means.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.host.remove(id).await.map_err(|e| {
            warn!("Host rejected delete of bookmark {}: {}", id, e);
            Error::host("delete", id, e)
        })
    }
}
