//! In-process bookmark host
//!
//! Holds a bookmark tree in memory with the same permanent folders a browser
//! profile has ("1" bookmarks bar, "2" other bookmarks). Every mutation
//! broadcasts the matching [`BookmarkEvent`].

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use super::{validate_url, BookmarkEvent, BookmarkHost, HostError, BOOKMARKS_BAR_ID, EVENT_CAPACITY};
use crate::models::{BookmarkChanges, BookmarkNode};

/// Id of the "Other bookmarks" folder
pub const OTHER_BOOKMARKS_ID: &str = "2";

struct Tree {
    roots: Vec<BookmarkNode>,
    next_id: u64,
}

/// In-memory bookmark host
#[derive(Clone)]
pub struct MemoryBookmarkHost {
    tree: Arc<Mutex<Tree>>,
    events: broadcast::Sender<BookmarkEvent>,
}

impl Default for MemoryBookmarkHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBookmarkHost {
    /// Create a host with empty permanent folders
    pub fn new() -> Self {
        Self::with_bar(Vec::new())
    }

    /// Create a host whose bookmarks bar holds `children`
    ///
    /// Ids in `children` are kept as given; generated ids start above any
    /// numeric id already present.
    pub fn with_bar(children: Vec<BookmarkNode>) -> Self {
        let roots = vec![
            BookmarkNode::folder(BOOKMARKS_BAR_ID, "Bookmarks bar", children),
            BookmarkNode::folder(OTHER_BOOKMARKS_ID, "Other bookmarks", Vec::new()),
        ];
        let next_id = max_numeric_id(&roots) + 1;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            tree: Arc::new(Mutex::new(Tree { roots, next_id })),
            events,
        }
    }

    /// Create a bookmark (`url` set) or folder under `parent_id`
    ///
    /// Appends when `index` is `None` or past the end. Returns the new id.
    pub fn create(
        &self,
        parent_id: &str,
        title: &str,
        url: Option<&str>,
        index: Option<usize>,
    ) -> Result<String, HostError> {
        if let Some(url) = url {
            validate_url(url)?;
        }

        let id = {
            let mut tree = self.lock();
            let id = tree.next_id.to_string();

            let parent = find_mut(&mut tree.roots, parent_id)
                .ok_or_else(|| HostError::NotFound(parent_id.to_string()))?;
            let Some(children) = parent.children.as_mut() else {
                return Err(HostError::Forbidden(parent_id.to_string()));
            };

            let node = match url {
                Some(url) => BookmarkNode::bookmark(id.clone(), title, url),
                None => BookmarkNode::folder(id.clone(), title, Vec::new()),
            };
            let at = index.unwrap_or(children.len()).min(children.len());
            children.insert(at, node);

            tree.next_id += 1;
            id
        };

        self.emit(BookmarkEvent::Created { id: id.clone() });
        Ok(id)
    }

    /// Move a node under `parent_id`, at `index` or appended
    pub fn move_node(
        &self,
        id: &str,
        parent_id: &str,
        index: Option<usize>,
    ) -> Result<(), HostError> {
        {
            let mut tree = self.lock();
            if is_root(&tree.roots, id) {
                return Err(HostError::Forbidden(id.to_string()));
            }

            let node = find(&tree.roots, id).ok_or_else(|| HostError::NotFound(id.to_string()))?;
            if node.id == parent_id || find(std::slice::from_ref(node), parent_id).is_some() {
                return Err(HostError::Forbidden(id.to_string()));
            }
            match find(&tree.roots, parent_id) {
                Some(parent) if parent.children.is_some() => {}
                Some(_) => return Err(HostError::Forbidden(parent_id.to_string())),
                None => return Err(HostError::NotFound(parent_id.to_string())),
            }

            let node = detach(&mut tree.roots, id).ok_or_else(|| HostError::NotFound(id.to_string()))?;
            let children = find_mut(&mut tree.roots, parent_id)
                .and_then(|parent| parent.children.as_mut())
                .ok_or_else(|| HostError::NotFound(parent_id.to_string()))?;
            let at = index.unwrap_or(children.len()).min(children.len());
            children.insert(at, node);
        }

        self.emit(BookmarkEvent::Moved { id: id.to_string() });
        Ok(())
    }

    /// Clone of the full tree, permanent folders included
    pub fn snapshot(&self) -> Vec<BookmarkNode> {
        self.lock().roots.clone()
    }

    fn emit(&self, event: BookmarkEvent) {
        debug!("Bookmark event: {}", event);
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl BookmarkHost for MemoryBookmarkHost {
    async fn get_children(&self, id: &str) -> Result<Vec<BookmarkNode>, HostError> {
        let tree = self.lock();
        let node = find(&tree.roots, id).ok_or_else(|| HostError::NotFound(id.to_string()))?;
        Ok(node.children.clone().unwrap_or_default())
    }

    async fn update(&self, id: &str, changes: BookmarkChanges) -> Result<(), HostError> {
        if let Some(ref url) = changes.url {
            validate_url(url)?;
        }

        {
            let mut tree = self.lock();
            if is_root(&tree.roots, id) {
                return Err(HostError::Forbidden(id.to_string()));
            }
            let node =
                find_mut(&mut tree.roots, id).ok_or_else(|| HostError::NotFound(id.to_string()))?;

            if let Some(url) = changes.url {
                if !node.is_bookmark() {
                    return Err(HostError::InvalidUrl(url));
                }
                node.url = Some(url);
            }
            if let Some(title) = changes.title {
                node.title = title;
            }
        }

        self.emit(BookmarkEvent::Changed { id: id.to_string() });
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), HostError> {
        {
            let mut tree = self.lock();
            if is_root(&tree.roots, id) {
                return Err(HostError::Forbidden(id.to_string()));
            }
            detach(&mut tree.roots, id).ok_or_else(|| HostError::NotFound(id.to_string()))?;
        }

        self.emit(BookmarkEvent::Removed { id: id.to_string() });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BookmarkEvent> {
        self.events.subscribe()
    }
}

fn is_root(roots: &[BookmarkNode], id: &str) -> bool {
    roots.iter().any(|root| root.id == id)
}

fn find<'a>(nodes: &'a [BookmarkNode], id: &str) -> Option<&'a BookmarkNode> {
    for node in nodes {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = node.children.as_deref().and_then(|c| find(c, id)) {
            return Some(found);
        }
    }
    None
}

fn find_mut<'a>(nodes: &'a mut [BookmarkNode], id: &str) -> Option<&'a mut BookmarkNode> {
    for node in nodes.iter_mut() {
        if node.id == id {
            return Some(node);
        }
        if let Some(children) = node.children.as_mut() {
            if let Some(found) = find_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn detach(nodes: &mut Vec<BookmarkNode>, id: &str) -> Option<BookmarkNode> {
    if let Some(pos) = nodes.iter().position(|node| node.id == id) {
        return Some(nodes.remove(pos));
    }
    nodes
        .iter_mut()
        .filter_map(|node| node.children.as_mut())
        .find_map(|children| detach(children, id))
}

fn max_numeric_id(nodes: &[BookmarkNode]) -> u64 {
    nodes
        .iter()
        .map(|node| {
            let own = node.id.parse::<u64>().unwrap_or(0);
            let below = node.children.as_deref().map(max_numeric_id).unwrap_or(0);
            own.max(below)
        })
        .max()
        .unwrap_or(0)
}
