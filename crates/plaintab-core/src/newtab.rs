//! New tab page context
//!
//! `NewTab` owns everything one open page needs: the published cells, the
//! settings and favicon override state, and the watcher keeping the
//! bookmark list current. Several instances may share one persistence
//! backend, as several open tabs share one synced store.
//!
//! ## Usage
//!
//! ```ignore
//! let tab = NewTab::start(host, backend, NewTabOptions::default()).await?;
//!
//! let mut bookmarks = tab.publisher().subscribe_bookmarks();
//! tab.settings().update_one(SettingKey::Columns, json!(8)).await?;
//!
//! tab.shutdown().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::favicon::{with_favicons, FaviconOverrideState, DEFAULT_FAVICON_SERVICE};
use crate::host::BookmarkHost;
use crate::models::BookmarkItem;
use crate::publisher::Publisher;
use crate::settings::SettingsState;
use crate::source::BookmarkSource;
use crate::storage::{KvStore, PersistenceBackend, FAVICONS_KEY, SETTINGS_KEY};
use crate::watcher::{ChangeWatcher, FullRefresh, RefreshStrategy};

/// Tunables for a [`NewTab`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewTabOptions {
    /// Base URL of the icon service used for derived favicons
    pub favicon_service: String,
    /// Quiet period before refreshing after bookmark events
    pub refresh_debounce: Duration,
}

impl Default for NewTabOptions {
    fn default() -> Self {
        Self {
            favicon_service: DEFAULT_FAVICON_SERVICE.to_string(),
            refresh_debounce: Duration::ZERO,
        }
    }
}

impl NewTabOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            favicon_service: config.favicon_service.clone(),
            refresh_debounce: config.refresh_debounce(),
        }
    }
}

/// One running new tab page
pub struct NewTab {
    instance_id: Uuid,
    options: NewTabOptions,
    source: BookmarkSource,
    publisher: Publisher,
    settings: SettingsState,
    favicons: FaviconOverrideState,
    watcher: ChangeWatcher,
}

impl NewTab {
    /// Load stored state, fetch the bookmarks bar and start watching
    ///
    /// Host events are subscribed to before the first fetch, so a change
    /// made while the page is starting still triggers a refresh. A failed
    /// first fetch is logged and leaves the list empty until the next
    /// event; failing to read stored settings or overrides is an error.
    pub async fn start(
        host: Arc<dyn BookmarkHost>,
        backend: Arc<dyn PersistenceBackend>,
        options: NewTabOptions,
    ) -> Result<Self> {
        let instance_id = Uuid::new_v4();
        let events = host.subscribe();

        let publisher = Publisher::new();
        let source = BookmarkSource::new(host);
        let settings =
            SettingsState::new(KvStore::new(Arc::clone(&backend), SETTINGS_KEY), publisher.clone());
        let favicons =
            FaviconOverrideState::spawn(KvStore::new(backend, FAVICONS_KEY), publisher.clone());

        if let Err(e) = settings.load().await {
            favicons.shutdown().await;
            return Err(e);
        }
        if let Err(e) = favicons.load().await {
            favicons.shutdown().await;
            return Err(e);
        }

        match source.fetch_root().await {
            Ok(items) => {
                debug!(instance = %instance_id, "Initial fetch found {} bookmark(s)", items.len());
                publisher.publish_bookmarks(items);
            }
            Err(e) => warn!(instance = %instance_id, "Initial bookmark fetch failed: {}", e),
        }

        let strategy: Arc<dyn RefreshStrategy> =
            Arc::new(FullRefresh::new(source.clone(), publisher.clone()));
        let watcher = ChangeWatcher::spawn(events, strategy, options.refresh_debounce);

        info!(instance = %instance_id, "New tab started");

        Ok(Self {
            instance_id,
            options,
            source,
            publisher,
            settings,
            favicons,
            watcher,
        })
    }

    /// Identifier of this page instance, for log correlation
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn options(&self) -> &NewTabOptions {
        &self.options
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn source(&self) -> &BookmarkSource {
        &self.source
    }

    pub fn settings(&self) -> &SettingsState {
        &self.settings
    }

    pub fn favicons(&self) -> &FaviconOverrideState {
        &self.favicons
    }

    /// Whether host events are still being watched
    pub fn is_watching(&self) -> bool {
        self.watcher.is_running()
    }

    /// Fetch the bookmarks bar now and publish it
    pub async fn refresh(&self) -> Result<Vec<BookmarkItem>> {
        let items = self.source.fetch_root().await?;
        self.publisher.publish_bookmarks(items.clone());
        Ok(items)
    }

    /// Published bookmarks with favicons filled in
    ///
    /// Favicons are left unset when the `showFavicons` setting is off.
    pub fn display_bookmarks(&self) -> Vec<BookmarkItem> {
        let items = self.publisher.bookmarks();
        if !self.publisher.settings().show_favicons {
            return items;
        }
        with_favicons(
            items,
            &self.publisher.favicons(),
            &self.options.favicon_service,
        )
    }

    /// Stop watching and drain pending favicon changes
    pub async fn shutdown(self) {
        let Self {
            instance_id,
            favicons,
            watcher,
            ..
        } = self;

        watcher.shutdown().await;
        favicons.shutdown().await;
        info!(instance = %instance_id, "New tab shut down");
    }
}
