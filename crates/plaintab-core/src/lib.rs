//! plainTab Core Library
//!
//! This crate provides the bookmark sync and reactive state layer behind
//! plainTab, a minimal new tab page showing the browser's bookmarks bar as
//! a grid of tiles.
//!
//! # Architecture
//!
//! - **Host**: the browser's bookmark tree is the source of truth; plainTab
//!   never keeps its own copy beyond the last flattened snapshot
//! - **Storage**: settings and favicon overrides live in a synced key-value
//!   store shared by every open page
//! - **Publisher**: observable cells the rendering layer reads and subscribes to
//!
//! # Quick Start
//!
//! ```text
//! let host = Arc::new(ChromeBookmarksFile::new(path));
//! let backend = Arc::new(JsonFileBackend::new(config.storage_path()));
//! let tab = NewTab::start(host, backend, NewTabOptions::from_config(&config)).await?;
//!
//! // Render and re-render on change
//! let mut bookmarks = tab.publisher().subscribe_bookmarks();
//! while bookmarks.changed().await.is_ok() {
//!     render(tab.display_bookmarks());
//! }
//! ```
//!
//! # Modules
//!
//! - `newtab`: page context tying everything together (main entry point)
//! - `flatten`: bookmark tree to display list
//! - `source`: bookmark host adapter
//! - `watcher`: host events to list refreshes
//! - `settings`: settings record state
//! - `favicon`: favicon derivation and override state
//! - `publisher`: observable published state
//! - `host`: bookmark host interface and implementations
//! - `storage`: persistence backends and typed key access
//! - `config`: application configuration

pub mod config;
pub mod error;
pub mod favicon;
pub mod flatten;
pub mod host;
pub mod models;
pub mod newtab;
pub mod publisher;
pub mod settings;
pub mod source;
pub mod storage;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
pub use favicon::{derive_favicon_url, resolve_favicon, with_favicons, FaviconOverrideState};
pub use flatten::flatten;
pub use host::{BookmarkEvent, BookmarkHost, ChromeBookmarksFile, HostError, MemoryBookmarkHost};
pub use models::{BookmarkChanges, BookmarkItem, BookmarkNode, FaviconOverrides, SettingKey, Settings};
pub use newtab::{NewTab, NewTabOptions};
pub use publisher::Publisher;
pub use settings::SettingsState;
pub use source::BookmarkSource;
pub use storage::{JsonFileBackend, MemoryBackend, PersistenceBackend, StorageError};
pub use watcher::{ChangeWatcher, FullRefresh, RefreshStrategy};
