//! Bookmark change watcher
//!
//! Listens to host mutation events and refreshes the published bookmark
//! list. Each event starts its own refresh task: refreshes may overlap, are
//! never cancelled, and whichever completes last is what stays published.
//! Every refresh publishes one whole fetch result.
//!
//! What a refresh does is behind [`RefreshStrategy`]. The default,
//! [`FullRefresh`], refetches and reflattens the whole bookmarks bar.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::host::BookmarkEvent;
use crate::publisher::Publisher;
use crate::source::BookmarkSource;

/// How the published bookmark list is brought up to date after an event
#[async_trait]
pub trait RefreshStrategy: Send + Sync {
    async fn refresh(&self, event: &BookmarkEvent) -> Result<()>;
}

/// Refetch the whole bookmarks bar on every event
pub struct FullRefresh {
    source: BookmarkSource,
    publisher: Publisher,
}

impl FullRefresh {
    pub fn new(source: BookmarkSource, publisher: Publisher) -> Self {
        Self { source, publisher }
    }
}

#[async_trait]
impl RefreshStrategy for FullRefresh {
    async fn refresh(&self, event: &BookmarkEvent) -> Result<()> {
        let items = self.source.fetch_root().await?;
        debug!("Refreshed {} bookmark(s) after {}", items.len(), event);
        self.publisher.publish_bookmarks(items);
        Ok(())
    }
}

/// Background task turning host events into refreshes
pub struct ChangeWatcher {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ChangeWatcher {
    /// Start watching `events`
    ///
    /// With a non-zero `debounce`, events arriving within that window of each
    /// other start a single refresh. Correctness does not depend on it.
    pub fn spawn(
        events: broadcast::Receiver<BookmarkEvent>,
        strategy: Arc<dyn RefreshStrategy>,
        debounce: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(watch_events(events, strategy, debounce, shutdown_rx));

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Whether the watcher task is still running
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop listening and wait for the task to end
    ///
    /// Refreshes still in flight are aborted.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            if e.is_panic() {
                warn!("Bookmark watcher panicked: {}", e);
            }
        }
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn watch_events(
    mut events: broadcast::Receiver<BookmarkEvent>,
    strategy: Arc<dyn RefreshStrategy>,
    debounce: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut refreshes = JoinSet::new();
    // Latest event still waiting for the quiet period to end
    let mut pending: Option<BookmarkEvent> = None;
    let quiet = tokio::time::sleep(debounce);
    tokio::pin!(quiet);

    loop {
        tokio::select! {
            received = events.recv() => {
                let event = match received {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed events still mean the tree changed
                        warn!("Bookmark watcher skipped {} event(s), refreshing", skipped);
                        BookmarkEvent::Changed { id: String::new() }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Bookmark host closed its event stream");
                        break;
                    }
                };

                if debounce.is_zero() {
                    spawn_refresh(&mut refreshes, &strategy, event);
                } else {
                    pending = Some(event);
                    quiet.as_mut().reset(Instant::now() + debounce);
                }
            }
            () = &mut quiet, if pending.is_some() => {
                if let Some(event) = pending.take() {
                    spawn_refresh(&mut refreshes, &strategy, event);
                }
            }
            Some(joined) = refreshes.join_next(), if !refreshes.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!("Bookmark refresh task panicked: {}", e);
                    }
                }
            }
            _ = &mut shutdown_rx => {
                debug!("Bookmark watcher shutting down");
                break;
            }
        }
    }

    refreshes.abort_all();
}

fn spawn_refresh(
    refreshes: &mut JoinSet<()>,
    strategy: &Arc<dyn RefreshStrategy>,
    event: BookmarkEvent,
) {
    let strategy = Arc::clone(strategy);
    refreshes.spawn(async move {
        if let Err(e) = strategy.refresh(&event).await {
            warn!("Bookmark refresh after {} failed: {}", event, e);
        }
    });
}
