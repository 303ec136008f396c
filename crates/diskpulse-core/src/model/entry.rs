/// A single node in the persistent directory tree.
///
/// Nodes are never mutated once they are shared. Every change produces a new
/// node layered over the old one, and untouched subtrees are reused through
/// `Arc` clones. Two trees can therefore be compared cheaply with
/// [`Arc::ptr_eq`]: a node that was not rebuilt is the very same allocation.
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handle to a node. This is what sibling lists and the session hold.
pub type NodeRef = Arc<DirectoryEntry>;

/// An ordered, shared sibling list.
///
/// The list itself is reference-counted so an ancestor that is rebuilt for
/// an unrelated reason can still hand out the same children allocation.
pub type Children = Arc<[NodeRef]>;

/// Whether a node is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// A file or directory with a lazily resolved aggregate size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// File or directory name only.
    pub name: CompactString,

    /// Absolute path as reported by the scanner. Unique within a tree once
    /// normalised with [`super::path_key::normalize_path`].
    pub path: String,

    pub kind: EntryKind,

    /// Aggregate size in bytes. `None` while the scanner is still computing
    /// it. Once resolved it never reverts to `None`.
    pub size: Option<u64>,

    /// Number of descendant files (1 for a plain file).
    pub file_count: u64,

    /// `None` = never expanded, `Some(empty)` = expanded with no children.
    pub children: Option<Children>,
}

impl DirectoryEntry {
    /// A plain file. Files always carry a resolved size.
    pub fn file(name: impl Into<CompactString>, path: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::File,
            size: Some(size),
            file_count: 1,
            children: None,
        }
    }

    /// A directory whose size has not been computed yet and whose children
    /// have not been loaded.
    pub fn directory(name: impl Into<CompactString>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::Directory,
            size: None,
            file_count: 0,
            children: None,
        }
    }

    /// Copy of this node carrying a resolved size and file count.
    /// Children are shared, not copied.
    pub fn with_resolution(&self, size: u64, file_count: u64) -> Self {
        Self {
            size: Some(size),
            file_count,
            ..self.clone()
        }
    }

    /// Copy of this node with a new children list.
    pub fn with_children(&self, children: Children) -> Self {
        Self {
            children: Some(children),
            ..self.clone()
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.size.is_some()
    }

    /// `true` once a children list (possibly empty) has been assigned.
    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    /// Direct children, or an empty slice if the node was never expanded.
    pub fn children(&self) -> &[NodeRef] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> NodeRef {
        Arc::new(self)
    }
}
