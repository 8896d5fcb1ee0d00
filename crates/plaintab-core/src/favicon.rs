//! Favicon resolution and per-URL overrides
//!
//! A bookmark's icon is its override when one is stored, otherwise an icon
//! service URL derived from the bookmark's hostname.
//!
//! Overrides for all bookmarks are stored as one mapping under a single key.
//! Each change reads the whole mapping, edits one entry and writes it back.
//! Changes from this process go through one queue so they cannot overwrite
//! each other; writes from other instances sharing the store still race
//! (last write wins).

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{BookmarkItem, FaviconOverrides};
use crate::publisher::Publisher;
use crate::storage::KvStore;

/// Icon service used when no other is configured
pub const DEFAULT_FAVICON_SERVICE: &str = "https://icons.duckduckgo.com/ip3/";

const QUEUE_CAPACITY: usize = 64;

/// Icon service URL for a bookmark, using [`DEFAULT_FAVICON_SERVICE`]
///
/// Returns an empty string when `url` cannot be parsed or has no host.
pub fn derive_favicon_url(url: &str) -> String {
    derive_favicon_url_with(DEFAULT_FAVICON_SERVICE, url)
}

/// Icon service URL for a bookmark using the given service base
pub fn derive_favicon_url_with(service: &str, url: &str) -> String {
    let host = match url::Url::parse(url) {
        Ok(parsed) => parsed.host_str().map(str::to_string),
        Err(_) => None,
    };

    match host {
        Some(host) if !host.is_empty() => {
            format!("{}/{}.ico", service.trim_end_matches('/'), host)
        }
        _ => String::new(),
    }
}

/// Icon to show for a bookmark url: its override, else the derived URL
pub fn resolve_favicon(url: &str, overrides: &FaviconOverrides, service: &str) -> Option<String> {
    if let Some(icon) = overrides.get(url) {
        return Some(icon.clone());
    }
    let derived = derive_favicon_url_with(service, url);
    (!derived.is_empty()).then_some(derived)
}

/// Fill in `favicon` on each item
pub fn with_favicons(
    items: Vec<BookmarkItem>,
    overrides: &FaviconOverrides,
    service: &str,
) -> Vec<BookmarkItem> {
    items
        .into_iter()
        .map(|mut item| {
            item.favicon = resolve_favicon(&item.url, overrides, service);
            item
        })
        .collect()
}

enum Command {
    Set {
        url: String,
        icon: Option<String>,
        reply: oneshot::Sender<Result<FaviconOverrides>>,
    },
}

/// Owner of the favicon override mapping
pub struct FaviconOverrideState {
    store: KvStore,
    publisher: Publisher,
    commands: mpsc::Sender<Command>,
    worker: JoinHandle<()>,
}

impl FaviconOverrideState {
    /// Start the override queue
    pub fn spawn(store: KvStore, publisher: Publisher) -> Self {
        let (commands, rx) = mpsc::channel(QUEUE_CAPACITY);
        let worker = tokio::spawn(run_queue(store.clone(), publisher.clone(), rx));

        Self {
            store,
            publisher,
            commands,
            worker,
        }
    }

    /// Load the stored mapping and publish it
    pub async fn load(&self) -> Result<FaviconOverrides> {
        let overrides = read_overrides(&self.store).await?;
        debug!("Loaded {} favicon override(s)", overrides.len());
        self.publisher.publish_favicons(overrides.clone());
        Ok(overrides)
    }

    /// Stored override for exactly `url`
    pub async fn get(&self, url: &str) -> Result<Option<String>> {
        Ok(read_overrides(&self.store).await?.remove(url))
    }

    /// Full stored mapping
    pub async fn get_all(&self) -> Result<FaviconOverrides> {
        read_overrides(&self.store).await
    }

    /// Set the override for `url`, or delete it with `None`
    ///
    /// An empty icon string deletes as well. Returns the mapping as written.
    pub async fn set(&self, url: &str, icon: Option<String>) -> Result<FaviconOverrides> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Set {
                url: url.to_string(),
                icon,
                reply,
            })
            .await
            .map_err(|_| Error::OverrideQueueClosed)?;

        response.await.map_err(|_| Error::OverrideQueueClosed)?
    }

    /// Drain queued changes and stop the queue
    pub async fn shutdown(self) {
        let Self {
            commands, worker, ..
        } = self;
        drop(commands);
        if let Err(e) = worker.await {
            warn!("Favicon override queue ended abnormally: {}", e);
        }
    }
}

async fn run_queue(store: KvStore, publisher: Publisher, mut commands: mpsc::Receiver<Command>) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Set { url, icon, reply } => {
                let result = apply(&store, &url, icon).await;
                match result {
                    Ok(ref overrides) => publisher.publish_favicons(overrides.clone()),
                    Err(ref e) => warn!("Favicon override for {} not saved: {}", url, e),
                }
                // Caller may have gone away
                let _ = reply.send(result);
            }
        }
    }
    debug!("Favicon override queue stopped");
}

async fn apply(store: &KvStore, url: &str, icon: Option<String>) -> Result<FaviconOverrides> {
    let mut overrides = read_overrides(store).await?;

    match icon.filter(|icon| !icon.is_empty()) {
        Some(icon) => {
            overrides.insert(url.to_string(), icon);
        }
        None => {
            overrides.remove(url);
        }
    }

    store.set(&overrides).await?;
    Ok(overrides)
}

/// Read the stored mapping, dropping entries that are not a non-empty string
async fn read_overrides(store: &KvStore) -> Result<FaviconOverrides> {
    let stored = match store.get_raw().await? {
        None | Some(Value::Null) => return Ok(FaviconOverrides::new()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            warn!("Stored favicon overrides are not an object, ignoring them");
            return Ok(FaviconOverrides::new());
        }
    };

    Ok(stored
        .into_iter()
        .filter_map(|(url, icon)| match icon {
            Value::String(icon) if !icon.is_empty() => Some((url, icon)),
            Value::String(_) | Value::Null => None,
            other => {
                warn!("Ignoring stored favicon override for '{}': {}", url, other);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, FAVICONS_KEY};
    use serde_json::json;
    use std::sync::Arc;

    fn state_with(backend: &MemoryBackend) -> (FaviconOverrideState, Publisher) {
        let publisher = Publisher::new();
        let state = FaviconOverrideState::spawn(
            KvStore::new(Arc::new(backend.clone()), FAVICONS_KEY),
            publisher.clone(),
        );
        (state, publisher)
    }

    #[test]
    fn test_derive_from_hostname() {
        assert_eq!(
            derive_favicon_url("https://sub.example.com/page"),
            "https://icons.duckduckgo.com/ip3/sub.example.com.ico"
        );
        assert_eq!(
            derive_favicon_url("http://localhost:8080/x?y=1"),
            "https://icons.duckduckgo.com/ip3/localhost.ico"
        );
    }

    #[test]
    fn test_derive_unparseable_is_empty() {
        assert_eq!(derive_favicon_url("not a url"), "");
        assert_eq!(derive_favicon_url(""), "");
        assert_eq!(derive_favicon_url("mailto:someone@example.com"), "");
    }

    #[test]
    fn test_derive_with_custom_service() {
        assert_eq!(
            derive_favicon_url_with("https://icons.example/", "https://a.com"),
            "https://icons.example/a.com.ico"
        );
        assert_eq!(
            derive_favicon_url_with("https://icons.example", "https://a.com"),
            "https://icons.example/a.com.ico"
        );
    }

    #[test]
    fn test_resolve_prefers_override() {
        let mut overrides = FaviconOverrides::new();
        overrides.insert("https://a.com".to_string(), "https://x/icon.ico".to_string());

        assert_eq!(
            resolve_favicon("https://a.com", &overrides, DEFAULT_FAVICON_SERVICE).as_deref(),
            Some("https://x/icon.ico")
        );
        assert_eq!(
            resolve_favicon("https://b.com", &overrides, DEFAULT_FAVICON_SERVICE).as_deref(),
            Some("https://icons.duckduckgo.com/ip3/b.com.ico")
        );
        assert!(resolve_favicon("junk", &overrides, DEFAULT_FAVICON_SERVICE).is_none());
    }

    #[test]
    fn test_with_favicons() {
        let items = vec![
            BookmarkItem::new("1a", "A", "https://a.com"),
            BookmarkItem::new("1b", "B", "bad"),
        ];
        let items = with_favicons(items, &FaviconOverrides::new(), DEFAULT_FAVICON_SERVICE);
        assert_eq!(
            items[0].favicon.as_deref(),
            Some("https://icons.duckduckgo.com/ip3/a.com.ico")
        );
        assert!(items[1].favicon.is_none());
    }

    #[tokio::test]
    async fn test_set_get_and_clear() {
        let backend = MemoryBackend::new();
        let (state, publisher) = state_with(&backend);

        state
            .set("https://a.com", Some("https://x/icon.ico".to_string()))
            .await
            .unwrap();
        assert_eq!(
            state.get("https://a.com").await.unwrap().as_deref(),
            Some("https://x/icon.ico")
        );
        assert_eq!(publisher.favicons().len(), 1);

        state.set("https://a.com", None).await.unwrap();
        assert!(state.get("https://a.com").await.unwrap().is_none());
        assert!(publisher.favicons().is_empty());

        // Deleted, not stored as null
        assert_eq!(backend.snapshot(FAVICONS_KEY), Some(json!({})));

        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_lookup_is_exact() {
        let backend = MemoryBackend::with_value(
            FAVICONS_KEY,
            json!({"https://a.com": "https://x/icon.ico"}),
        );
        let (state, _) = state_with(&backend);

        assert!(state.get("https://a.com/").await.unwrap().is_none());
        assert!(state.get("https://A.com").await.unwrap().is_none());
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_entries_are_skipped() {
        let backend = MemoryBackend::with_value(
            FAVICONS_KEY,
            json!({
                "https://a.com": "https://x/icon.ico",
                "https://b.com": 5,
                "https://c.com": null,
                "https://d.com": ""
            }),
        );
        let (state, publisher) = state_with(&backend);

        state.load().await.unwrap();
        assert_eq!(publisher.favicons().len(), 1);
        assert!(state.get("https://b.com").await.unwrap().is_none());

        // A write keeps the good entry and drops the rest
        state
            .set("https://e.com", Some("https://x/e.ico".to_string()))
            .await
            .unwrap();
        assert_eq!(
            backend.snapshot(FAVICONS_KEY).unwrap(),
            json!({"https://a.com": "https://x/icon.ico", "https://e.com": "https://x/e.ico"})
        );
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_non_object_mapping_reads_empty() {
        let backend = MemoryBackend::with_value(FAVICONS_KEY, json!(["https://a.com"]));
        let (state, _) = state_with(&backend);

        assert!(state.get_all().await.unwrap().is_empty());
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_icon_deletes() {
        let backend = MemoryBackend::with_value(
            FAVICONS_KEY,
            json!({"https://a.com": "https://x/icon.ico"}),
        );
        let (state, _) = state_with(&backend);

        state.set("https://a.com", Some(String::new())).await.unwrap();
        assert!(state.get_all().await.unwrap().is_empty());
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_concurrent_sets_are_serialized() {
        let backend = MemoryBackend::new();
        let (state, publisher) = state_with(&backend);
        let state = Arc::new(state);

        let sets = (0..20).map(|i| {
            let state = Arc::clone(&state);
            async move {
                state
                    .set(&format!("https://site{}.com", i), Some(format!("https://icons/{}.ico", i)))
                    .await
            }
        });
        for result in spawn_all(sets).await {
            result.unwrap();
        }

        let all = state.get_all().await.unwrap();
        assert_eq!(all.len(), 20);
        assert_eq!(publisher.favicons(), all);
    }

    #[tokio::test]
    async fn test_load_publishes_and_skips_nulls() {
        let backend = MemoryBackend::with_value(
            FAVICONS_KEY,
            json!({"https://a.com": "https://x/a.ico", "https://b.com": null}),
        );
        let (state, publisher) = state_with(&backend);

        let loaded = state.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(publisher.favicons(), loaded);
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_write_does_not_publish() {
        let backend = MemoryBackend::new();
        let (state, publisher) = state_with(&backend);
        backend.fail_writes(Some("offline"));

        let err = state
            .set("https://a.com", Some("https://x/icon.ico".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_persistence_failure());
        assert!(publisher.favicons().is_empty());
        state.shutdown().await;
    }

    /// Run futures concurrently on spawned tasks and collect their results
    async fn spawn_all<F>(futures: impl Iterator<Item = F>) -> Vec<F::Output>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handles: Vec<_> = futures.map(tokio::spawn).collect();
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }
}
