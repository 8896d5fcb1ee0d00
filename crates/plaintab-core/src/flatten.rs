//! Bookmark tree flattening
//!
//! Reduces a host bookmark tree to the ordered list of bookmarks shown on the
//! grid. Traversal is depth-first pre-order with sibling order preserved, so
//! a folder's bookmarks appear exactly where the folder sits in its parent.

use std::slice;

use crate::models::{BookmarkItem, BookmarkNode};

/// Flatten root-level siblings into display items
///
/// Every node carrying a non-empty url contributes one item. Children are
/// visited whether or not their parent carried a url. Nodes with neither
/// contribute nothing. Uses an explicit stack, so tree depth is bounded only by memory.
pub fn flatten(nodes: &[BookmarkNode]) -> Vec<BookmarkItem> {
    let mut items = Vec::new();
    let mut stack: Vec<slice::Iter<'_, BookmarkNode>> = vec![nodes.iter()];

    while let Some(siblings) = stack.last_mut() {
        let Some(node) = siblings.next() else {
            stack.pop();
            continue;
        };

        if let Some(url) = node.url.as_deref().filter(|url| !url.is_empty()) {
            items.push(BookmarkItem::new(node.id.clone(), &node.title, url.to_string()));
        }
        if let Some(ref children) = node.children {
            stack.push(children.iter());
        }
    }

    items
}
