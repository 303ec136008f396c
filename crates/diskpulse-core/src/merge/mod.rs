/// Merge engine — folds partial results into the persistent tree.
///
/// Both streamed size updates and lazily loaded subtrees are installed with
/// the same path-copying search: find the node whose normalised path matches,
/// replace it, and rebuild only the ancestors on the way back up. Every
/// subtree that does not contain the target is returned as the same `Arc`.
///
/// # Reference stability
///
/// A node that is found but whose data would not change is *not* replaced,
/// so a duplicate update leaves the whole tree pointer-identical. Callers use
/// [`Arc::ptr_eq`] on the root to decide whether anything needs redrawing.
use crate::model::{
    ensure_ordered, matches_key, normalize_path, order_siblings, Children, DirectoryEntry,
    NodeRef, SizeUpdate,
};
use std::sync::Arc;
use tracing::trace;

/// Result of searching one subtree.
#[derive(Debug)]
pub enum Rebuild {
    /// No node in this subtree has the target path.
    NotFound,
    /// The target is in this subtree but nothing changed.
    Unchanged,
    /// The target changed; this is the new subtree root.
    Replaced(NodeRef),
}

/// Depth-first search for `key`, applying `replace` to the match.
///
/// `replace` returns `None` when the matched node should stay as it is.
fn rebuild_at<F>(node: &NodeRef, key: &str, replace: &mut F) -> Rebuild
where
    F: FnMut(&DirectoryEntry) -> Option<DirectoryEntry>,
{
    if matches_key(&node.path, key) {
        return match replace(node.as_ref()) {
            Some(updated) => Rebuild::Replaced(Arc::new(updated)),
            None => Rebuild::Unchanged,
        };
    }

    let Some(children) = node.children.as_ref() else {
        return Rebuild::NotFound;
    };

    for (i, child) in children.iter().enumerate() {
        match rebuild_at(child, key, replace) {
            Rebuild::NotFound => continue,
            Rebuild::Unchanged => return Rebuild::Unchanged,
            Rebuild::Replaced(new_child) => {
                // Reuse every untouched sibling by reference.
                let mut siblings = children.to_vec();
                siblings[i] = new_child;
                let rebuilt = node.with_children(order_siblings(siblings));
                return Rebuild::Replaced(Arc::new(rebuilt));
            }
        }
    }

    Rebuild::NotFound
}

fn rebuild_root<F>(root: Option<&NodeRef>, path: &str, mut replace: F) -> Option<NodeRef>
where
    F: FnMut(&DirectoryEntry) -> Option<DirectoryEntry>,
{
    let root = root?;
    let key = normalize_path(path);
    match rebuild_at(root, &key, &mut replace) {
        Rebuild::Replaced(new_root) => Some(new_root),
        Rebuild::Unchanged => Some(Arc::clone(root)),
        Rebuild::NotFound => {
            trace!("No node for {path}; tree unchanged");
            Some(Arc::clone(root))
        }
    }
}

/// Apply one size update.
///
/// Returns `None` only when `root` is `None`. When no node matches (an event
/// from a superseded scan) the original root is returned unchanged. Only the
/// target's own `size` and `file_count` are written; its children, and any
/// values already resolved below it, are left alone.
pub fn apply_update(root: Option<&NodeRef>, update: &SizeUpdate) -> Option<NodeRef> {
    rebuild_root(root, &update.path, |node| resolve(node, update))
}

/// Like [`apply_update`], but reports whether the target was found.
///
/// One search serves both the lookup and the rebuild.
pub fn merge_update(root: &NodeRef, update: &SizeUpdate) -> Rebuild {
    let key = normalize_path(&update.path);
    rebuild_at(root, &key, &mut |node: &DirectoryEntry| resolve(node, update))
}

fn resolve(node: &DirectoryEntry, update: &SizeUpdate) -> Option<DirectoryEntry> {
    if node.size == Some(update.size) && node.file_count == update.file_count {
        None
    } else {
        Some(node.with_resolution(update.size, update.file_count))
    }
}

/// Install a freshly loaded one-level subtree at `loaded.path`.
///
/// The matched node keeps its identity fields and receives `loaded`'s
/// children in policy order. A resolved size already on the node survives
/// when `loaded` is still unresolved, so sizes never revert.
pub fn splice_subtree(root: Option<&NodeRef>, loaded: &DirectoryEntry) -> Option<NodeRef> {
    let children: Children = match loaded.children.as_ref() {
        Some(list) => ensure_ordered(list),
        None => Vec::<NodeRef>::new().into(),
    };

    rebuild_root(root, &loaded.path, |node| {
        let mut spliced = node.with_children(Arc::clone(&children));
        if let Some(size) = loaded.size {
            spliced.size = Some(size);
            spliced.file_count = loaded.file_count;
        }
        Some(spliced)
    })
}

/// Find the node at `path`, if any.
pub fn find<'a>(root: Option<&'a NodeRef>, path: &str) -> Option<&'a NodeRef> {
    fn walk<'a>(node: &'a NodeRef, key: &str) -> Option<&'a NodeRef> {
        if matches_key(&node.path, key) {
            return Some(node);
        }
        node.children().iter().find_map(|child| walk(child, key))
    }
    walk(root?, &normalize_path(path))
}
