//! Observable state for the rendering layer
//!
//! Three cells, each readable synchronously and subscribable:
//! - the flattened bookmarks bar
//! - the settings record
//! - the favicon override map
//!
//! Publishing replaces the whole value, so a subscriber always sees one
//! complete value and never a mix of two writes.

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{BookmarkItem, FaviconOverrides, Settings};

/// Shared handle to the published state
///
/// Clones publish to and read from the same cells.
#[derive(Clone)]
pub struct Publisher {
    bookmarks: Arc<watch::Sender<Vec<BookmarkItem>>>,
    settings: Arc<watch::Sender<Settings>>,
    favicons: Arc<watch::Sender<FaviconOverrides>>,
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher {
    /// Create cells holding an empty list, default settings and no overrides
    pub fn new() -> Self {
        let (bookmarks, _) = watch::channel(Vec::new());
        let (settings, _) = watch::channel(Settings::default());
        let (favicons, _) = watch::channel(FaviconOverrides::new());

        Self {
            bookmarks: Arc::new(bookmarks),
            settings: Arc::new(settings),
            favicons: Arc::new(favicons),
        }
    }

    // ==================== Bookmarks ====================

    pub fn bookmarks(&self) -> Vec<BookmarkItem> {
        self.bookmarks.borrow().clone()
    }

    pub fn subscribe_bookmarks(&self) -> watch::Receiver<Vec<BookmarkItem>> {
        self.bookmarks.subscribe()
    }

    pub fn publish_bookmarks(&self, items: Vec<BookmarkItem>) {
        self.bookmarks.send_replace(items);
    }

    // ==================== Settings ====================

    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    pub fn subscribe_settings(&self) -> watch::Receiver<Settings> {
        self.settings.subscribe()
    }

    pub fn publish_settings(&self, settings: Settings) {
        self.settings.send_replace(settings);
    }

    // ==================== Favicon overrides ====================

    pub fn favicons(&self) -> FaviconOverrides {
        self.favicons.borrow().clone()
    }

    pub fn subscribe_favicons(&self) -> watch::Receiver<FaviconOverrides> {
        self.favicons.subscribe()
    }

    pub fn publish_favicons(&self, overrides: FaviconOverrides) {
        self.favicons.send_replace(overrides);
    }
}
