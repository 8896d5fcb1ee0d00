//! Chromium `Bookmarks` file host
//!
//! Reads and edits the JSON bookmarks file of a Chromium-family browser
//! profile. The file layout is:
//!
//! ```text
//! { "checksum": "...",
//!   "roots": { "bookmark_bar": { "id": "1", "type": "folder", "children": [...] },
//!              "other": { "id": "2", ... }, "synced": { "id": "3", ... } },
//!   "version": 1 }
//! ```
//!
//! Bookmarks have `"type": "url"` and a `url`; the title is `name`. Unknown
//! fields are preserved on rewrite. The checksum is dropped on rewrite
//! because it no longer matches.
//!
//! The browser gives no change notifications for the file. [`FileWatch`]
//! watches the profile directory instead and emits `Changed` for the
//! bookmarks bar whenever the file's modification time moves.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::Value;
use tokio::fs;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::{validate_url, BookmarkEvent, BookmarkHost, HostError, BOOKMARKS_BAR_ID, EVENT_CAPACITY};
use crate::models::{BookmarkChanges, BookmarkNode};
use crate::storage::file::atomic_write;

/// Bookmark host backed by a Chromium `Bookmarks` file
pub struct ChromeBookmarksFile {
    path: PathBuf,
    events: broadcast::Sender<BookmarkEvent>,
    /// Modification time of the file as last written or observed by us
    known_mtime: Arc<Mutex<Option<SystemTime>>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl ChromeBookmarksFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            path: path.into(),
            events,
            known_mtime: Arc::new(Mutex::new(None)),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Bookmarks file of the default Google Chrome profile, if a config
    /// directory is known for this platform
    pub fn default_path() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            dirs::data_local_dir().map(|dir| {
                dir.join("Google")
                    .join("Chrome")
                    .join("User Data")
                    .join("Default")
                    .join("Bookmarks")
            })
        } else if cfg!(target_os = "macos") {
            dirs::config_dir().map(|dir| {
                dir.join("Google")
                    .join("Chrome")
                    .join("Default")
                    .join("Bookmarks")
            })
        } else {
            dirs::config_dir().map(|dir| dir.join("google-chrome").join("Default").join("Bookmarks"))
        }
    }

    /// Path of the bookmarks file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start watching the file for changes made by someone else
    ///
    /// The parent directory is watched, so the file may be replaced by
    /// rename, removed, or not exist yet. Notifications stop when the
    /// returned [`FileWatch`] is dropped.
    pub fn watch_file(&self) -> Result<FileWatch, HostError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| HostError::Unavailable(format!("{:?} is not a file path", self.path)))?;

        // Only changes after this point are reported
        *self.known_mtime.lock().unwrap_or_else(|e| e.into_inner()) = modified_time(&self.path);

        let path = self.path.clone();
        let events = self.events.clone();
        let known_mtime = Arc::clone(&self.known_mtime);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if touches_file(&event, &file_name) {
                    check_modified(&path, &known_mtime, &events);
                }
            }
            Err(e) => warn!("Bookmarks file watch error: {}", e),
        })
        .map_err(|e| HostError::Unavailable(format!("cannot watch {:?}: {}", dir, e)))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| HostError::Unavailable(format!("cannot watch {:?}: {}", dir, e)))?;

        debug!("Watching {:?} for bookmark changes", self.path);
        Ok(FileWatch { _watcher: watcher })
    }

    async fn load(&self) -> Result<Value, HostError> {
        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                HostError::Unavailable(format!("bookmarks file {:?} not found", self.path))
            } else {
                HostError::Unavailable(format!("failed to read {:?}: {}", self.path, e))
            }
        })?;

        serde_json::from_str(&content)
            .map_err(|e| HostError::Unavailable(format!("invalid bookmarks file {:?}: {}", self.path, e)))
    }

    async fn store(&self, mut doc: Value) -> Result<(), HostError> {
        if let Some(obj) = doc.as_object_mut() {
            obj.remove("checksum");
        }

        let bytes = serde_json::to_vec_pretty(&doc)
            .map_err(|e| HostError::Unavailable(format!("failed to encode bookmarks: {}", e)))?;
        atomic_write(&self.path, &bytes)
            .await
            .map_err(|e| HostError::Unavailable(e.to_string()))?;

        // Our own write is not an external change
        let mtime = modified_time(&self.path);
        *self.known_mtime.lock().unwrap_or_else(|e| e.into_inner()) = mtime;
        Ok(())
    }

    fn emit(&self, event: BookmarkEvent) {
        debug!("Bookmark event: {}", event);
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl BookmarkHost for ChromeBookmarksFile {
    async fn get_children(&self, id: &str) -> Result<Vec<BookmarkNode>, HostError> {
        let mut doc = self.load().await?;
        let node = roots_mut(&mut doc)
            .into_iter()
            .find_map(|root| find_node_mut(root, id))
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;

        Ok(node
            .get("children")
            .and_then(Value::as_array)
            .map(|children| children.iter().map(node_from_json).collect())
            .unwrap_or_default())
    }

    async fn update(&self, id: &str, changes: BookmarkChanges) -> Result<(), HostError> {
        if let Some(ref url) = changes.url {
            validate_url(url)?;
        }

        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        {
            let mut roots = roots_mut(&mut doc);
            if roots.iter().any(|root| node_id(root) == Some(id)) {
                return Err(HostError::Forbidden(id.to_string()));
            }
            let node = roots
                .iter_mut()
                .find_map(|root| find_node_mut(root, id))
                .ok_or_else(|| HostError::NotFound(id.to_string()))?;

            let Some(obj) = node.as_object_mut() else {
                return Err(HostError::NotFound(id.to_string()));
            };
            if let Some(url) = changes.url {
                if obj.get("type").and_then(Value::as_str) != Some("url") {
                    return Err(HostError::InvalidUrl(url));
                }
                obj.insert("url".to_string(), Value::String(url));
            }
            if let Some(title) = changes.title {
                obj.insert("name".to_string(), Value::String(title));
            }
        }
        self.store(doc).await?;

        self.emit(BookmarkEvent::Changed { id: id.to_string() });
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), HostError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;
        {
            let mut roots = roots_mut(&mut doc);
            if roots.iter().any(|root| node_id(root) == Some(id)) {
                return Err(HostError::Forbidden(id.to_string()));
            }
            if !roots.iter_mut().any(|root| remove_node(root, id)) {
                return Err(HostError::NotFound(id.to_string()));
            }
        }
        self.store(doc).await?;

        self.emit(BookmarkEvent::Removed { id: id.to_string() });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BookmarkEvent> {
        self.events.subscribe()
    }
}

/// Keeps a bookmarks file watch alive
pub struct FileWatch {
    _watcher: RecommendedWatcher,
}

fn touches_file(event: &Event, file_name: &OsString) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

/// Emit `Changed` if the file's modification time differs from the last one seen
///
/// Appearing and disappearing both count as changes.
fn check_modified(
    path: &Path,
    known_mtime: &Mutex<Option<SystemTime>>,
    events: &broadcast::Sender<BookmarkEvent>,
) {
    let current = modified_time(path);
    let changed = {
        let mut known = known_mtime.lock().unwrap_or_else(|e| e.into_inner());
        let changed = *known != current;
        *known = current;
        changed
    };

    if changed {
        debug!("Bookmarks file {:?} changed on disk", path);
        let _ = events.send(BookmarkEvent::Changed {
            id: BOOKMARKS_BAR_ID.to_string(),
        });
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    match std::fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(time) => Some(time),
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Cannot stat bookmarks file {:?}: {}", path, e);
            }
            None
        }
    }
}

fn node_id(node: &Value) -> Option<&str> {
    node.get("id").and_then(Value::as_str)
}

/// Permanent folders under `roots`, in file order
fn roots_mut(doc: &mut Value) -> Vec<&mut Value> {
    doc.get_mut("roots")
        .and_then(Value::as_object_mut)
        .map(|roots| roots.values_mut().filter(|root| root.is_object()).collect())
        .unwrap_or_default()
}

fn find_node_mut<'a>(node: &'a mut Value, id: &str) -> Option<&'a mut Value> {
    if node_id(node) == Some(id) {
        return Some(node);
    }
    node.get_mut("children")
        .and_then(Value::as_array_mut)?
        .iter_mut()
        .find_map(|child| find_node_mut(child, id))
}

fn remove_node(node: &mut Value, id: &str) -> bool {
    let Some(children) = node.get_mut("children").and_then(Value::as_array_mut) else {
        return false;
    };
    if let Some(pos) = children.iter().position(|child| node_id(child) == Some(id)) {
        children.remove(pos);
        return true;
    }
    children.iter_mut().any(|child| remove_node(child, id))
}

fn node_from_json(value: &Value) -> BookmarkNode {
    let url = if value.get("type").and_then(Value::as_str) == Some("url") {
        value.get("url").and_then(Value::as_str).map(str::to_string)
    } else {
        None
    };

    BookmarkNode {
        id: node_id(value).unwrap_or_default().to_string(),
        title: value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        url,
        children: value
            .get("children")
            .and_then(Value::as_array)
            .map(|children| children.iter().map(node_from_json).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample() -> Value {
        json!({
            "checksum": "abc123",
            "roots": {
                "bookmark_bar": {
                    "id": "1", "name": "Bookmarks bar", "type": "folder",
                    "children": [
                        {"id": "5", "name": "Rust", "type": "url", "url": "https://rust-lang.org", "guid": "g5"},
                        {"id": "6", "name": "Dev", "type": "folder", "children": [
                            {"id": "7", "name": "", "type": "url", "url": "https://docs.rs"}
                        ]},
                        {"id": "8", "name": "Crates", "type": "url", "url": "https://crates.io"}
                    ]
                },
                "other": {"id": "2", "name": "Other bookmarks", "type": "folder", "children": [
                    {"id": "9", "name": "Elsewhere", "type": "url", "url": "https://else.com"}
                ]},
                "synced": {"id": "3", "name": "Mobile bookmarks", "type": "folder", "children": []}
            },
            "version": 1
        })
    }

    fn write_sample(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("Bookmarks");
        std::fs::write(&path, serde_json::to_string_pretty(&sample()).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_reads_bookmarks_bar() {
        let temp_dir = TempDir::new().unwrap();
        let host = ChromeBookmarksFile::new(write_sample(&temp_dir));

        let children = host.get_children(BOOKMARKS_BAR_ID).await.unwrap();
        let items = flatten(&children);

        let urls: Vec<_> = items.iter().map(|item| item.url.as_str()).collect();
        assert_eq!(urls, vec!["https://rust-lang.org", "https://docs.rs", "https://crates.io"]);
        assert_eq!(items[1].title, "https://docs.rs");
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let host = ChromeBookmarksFile::new(temp_dir.path().join("Bookmarks"));

        let err = host.get_children(BOOKMARKS_BAR_ID).await.unwrap_err();
        assert!(matches!(err, HostError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_update_rewrites_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_sample(&temp_dir);
        let host = ChromeBookmarksFile::new(&path);
        let mut events = host.subscribe();

        host.update("7", BookmarkChanges::new("Docs", "https://docs.rs/tokio"))
            .await
            .unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            BookmarkEvent::Changed { id: "7".to_string() }
        );

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(doc.get("checksum").is_none());
        let bar = &doc["roots"]["bookmark_bar"]["children"];
        assert_eq!(bar[1]["children"][0]["name"], "Docs");
        assert_eq!(bar[1]["children"][0]["url"], "https://docs.rs/tokio");
        // Unknown fields survive
        assert_eq!(bar[0]["guid"], "g5");
    }

    #[tokio::test]
    async fn test_update_rejections() {
        let temp_dir = TempDir::new().unwrap();
        let host = ChromeBookmarksFile::new(write_sample(&temp_dir));

        assert!(matches!(
            host.update("5", BookmarkChanges::new("x", "not a url")).await,
            Err(HostError::InvalidUrl(_))
        ));
        assert!(matches!(
            host.update("6", BookmarkChanges::new("x", "https://folder.com")).await,
            Err(HostError::InvalidUrl(_))
        ));
        assert!(matches!(
            host.update("404", BookmarkChanges::new("x", "https://x.com")).await,
            Err(HostError::NotFound(_))
        ));
        assert!(matches!(
            host.update("1", BookmarkChanges::default()).await,
            Err(HostError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let host = ChromeBookmarksFile::new(write_sample(&temp_dir));

        host.remove("6").await.unwrap();
        host.remove("9").await.unwrap();

        let bar = flatten(&host.get_children(BOOKMARKS_BAR_ID).await.unwrap());
        assert_eq!(bar.len(), 2);
        assert!(host.get_children("2").await.unwrap().is_empty());
        assert!(matches!(host.remove("6").await, Err(HostError::NotFound(_))));
        assert!(matches!(host.remove("3").await, Err(HostError::Forbidden(_))));
    }

    async fn next_event(events: &mut broadcast::Receiver<BookmarkEvent>) -> BookmarkEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("no bookmark event")
            .unwrap()
    }

    #[tokio::test]
    async fn test_watch_reports_external_change() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_sample(&temp_dir);
        let host = ChromeBookmarksFile::new(&path);
        let mut events = host.subscribe();
        let _watch = host.watch_file().unwrap();

        // Make sure the new mtime differs on filesystems with coarse timestamps
        let later = SystemTime::now() + Duration::from_secs(5);
        let mut doc = sample();
        doc["roots"]["bookmark_bar"]["children"]
            .as_array_mut()
            .unwrap()
            .clear();
        std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert_eq!(
            next_event(&mut events).await,
            BookmarkEvent::Changed { id: BOOKMARKS_BAR_ID.to_string() }
        );
        assert!(host.get_children(BOOKMARKS_BAR_ID).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watch_reports_file_appearing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Bookmarks");
        let host = ChromeBookmarksFile::new(&path);
        let mut events = host.subscribe();
        let _watch = host.watch_file().unwrap();

        // Other files in the profile directory are ignored
        std::fs::write(temp_dir.path().join("Preferences"), "{}").unwrap();
        assert!(
            tokio::time::timeout(Duration::from_millis(300), events.recv())
                .await
                .is_err()
        );

        write_sample(&temp_dir);
        assert_eq!(
            next_event(&mut events).await,
            BookmarkEvent::Changed { id: BOOKMARKS_BAR_ID.to_string() }
        );
        assert_eq!(host.get_children(BOOKMARKS_BAR_ID).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_watch_needs_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let host = ChromeBookmarksFile::new(temp_dir.path().join("missing").join("Bookmarks"));

        assert!(matches!(host.watch_file(), Err(HostError::Unavailable(_))));
    }
}
