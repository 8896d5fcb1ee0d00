//! Bookmark host interface
//!
//! The host owns the bookmark tree. plainTab reads children of the bookmarks
//! bar, asks the host to update or remove bookmarks, and listens for its
//! mutation events.
//!
//! ## Implementations
//!
//! - [`MemoryBookmarkHost`]: in-process tree, for embedding and tests
//! - [`ChromeBookmarksFile`]: a Chromium profile `Bookmarks` file

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::{BookmarkChanges, BookmarkNode};

pub mod chrome;
pub mod memory;

pub use chrome::{ChromeBookmarksFile, FileWatch};
pub use memory::MemoryBookmarkHost;

/// Id of the bookmarks bar folder, fixed by the host
pub const BOOKMARKS_BAR_ID: &str = "1";

/// Capacity of host event channels
pub(crate) const EVENT_CAPACITY: usize = 256;

/// Errors reported by a bookmark host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// No node has the given id
    #[error("No bookmark with id '{0}'")]
    NotFound(String),

    /// The url is not an absolute URL, or was set on a folder
    #[error("Invalid url '{0}'")]
    InvalidUrl(String),

    /// The node is a permanent folder and cannot be modified
    #[error("Bookmark '{0}' cannot be modified")]
    Forbidden(String),

    /// The host could not be reached or its data could not be read
    #[error("Bookmark host unavailable: {0}")]
    Unavailable(String),
}

/// A mutation notification from the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkEvent {
    Created { id: String },
    Removed { id: String },
    Changed { id: String },
    Moved { id: String },
}

impl BookmarkEvent {
    /// Id of the affected node
    pub fn id(&self) -> &str {
        match self {
            BookmarkEvent::Created { id }
            | BookmarkEvent::Removed { id }
            | BookmarkEvent::Changed { id }
            | BookmarkEvent::Moved { id } => id,
        }
    }

    /// Short name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            BookmarkEvent::Created { .. } => "created",
            BookmarkEvent::Removed { .. } => "removed",
            BookmarkEvent::Changed { .. } => "changed",
            BookmarkEvent::Moved { .. } => "moved",
        }
    }
}

impl fmt::Display for BookmarkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind(), self.id())
    }
}

/// The host bookmark service
///
/// `get_children` returns an owned snapshot; later host mutations never show
/// through a snapshot already returned.
#[async_trait]
pub trait BookmarkHost: Send + Sync {
    /// Direct children of the folder `id`, with their full subtrees
    async fn get_children(&self, id: &str) -> Result<Vec<BookmarkNode>, HostError>;

    /// Change a bookmark's title and/or url
    async fn update(&self, id: &str, changes: BookmarkChanges) -> Result<(), HostError>;

    /// Remove a bookmark or folder
    async fn remove(&self, id: &str) -> Result<(), HostError>;

    /// Subscribe to created/removed/changed/moved events anywhere in the tree
    fn subscribe(&self) -> broadcast::Receiver<BookmarkEvent>;
}

/// Check that a bookmark url is an absolute URL
pub(crate) fn validate_url(url: &str) -> Result<(), HostError> {
    url::Url::parse(url)
        .map(|_| ())
        .map_err(|_| HostError::InvalidUrl(url.to_string()))
}
