/// Lazy expansion bookkeeping.
///
/// Tracks which directories have an outstanding "load children" request and
/// which ones the user has opened. Neither set lives in the tree itself, so a
/// spinner appearing or a row collapsing never rebuilds a node.
///
/// Every request gets an [`ExpandTicket`]. Tickets carry the root generation
/// (bumped by [`ExpansionController::reset`] on every new analysis) and a
/// per-request sequence number, so a response that arrives after its root was
/// replaced is recognised as stale and dropped.
use crate::merge;
use crate::model::{normalize_path, NodeRef};
use std::collections::HashMap;
use tracing::debug;

/// Identifies one expansion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExpandTicket {
    pub generation: u64,
    pub seq: u64,
}

/// What [`ExpansionController::begin`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandRequest {
    /// A fetch must be issued with this ticket.
    Started(ExpandTicket),
    /// A fetch for this path is already outstanding.
    AlreadyLoading,
    /// Children are already in the tree; the path was simply re-opened.
    AlreadyLoaded,
    /// The node is a file.
    NotADirectory,
    /// No node with this path in the current tree.
    NotFound,
}

#[derive(Debug, Clone)]
struct Pending {
    path: String,
    seq: u64,
}

/// Loading and expanded path sets plus ticket issuance.
#[derive(Debug, Default)]
pub struct ExpansionController {
    generation: u64,
    next_seq: u64,
    /// Keyed by normalised path.
    loading: HashMap<String, Pending>,
    /// Keyed by normalised path; value is the path as the caller gave it.
    expanded: HashMap<String, String>,
}

impl ExpansionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything and start a new root generation.
    ///
    /// Any ticket issued before this call will be rejected by
    /// [`complete`](Self::complete).
    pub fn reset(&mut self) -> u64 {
        self.generation += 1;
        self.loading.clear();
        self.expanded.clear();
        self.generation
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Decide whether opening `path` needs a fetch.
    ///
    /// The path is marked expanded in every case except when it cannot be
    /// expanded at all.
    pub fn begin(&mut self, root: Option<&NodeRef>, path: &str) -> ExpandRequest {
        let Some(node) = merge::find(root, path) else {
            return ExpandRequest::NotFound;
        };
        if !node.is_dir() {
            return ExpandRequest::NotADirectory;
        }

        let key = normalize_path(path);
        self.expanded.insert(key.clone(), path.to_string());

        if node.is_expanded() {
            return ExpandRequest::AlreadyLoaded;
        }
        if self.loading.contains_key(&key) {
            return ExpandRequest::AlreadyLoading;
        }

        self.next_seq += 1;
        let ticket = ExpandTicket {
            generation: self.generation,
            seq: self.next_seq,
        };
        self.loading.insert(
            key,
            Pending {
                path: path.to_string(),
                seq: ticket.seq,
            },
        );
        debug!("Expansion of {path} started ({ticket:?})");
        ExpandRequest::Started(ticket)
    }

    /// Settle an outstanding request, successful or not.
    ///
    /// Returns `true` if `ticket` is the current request for `path`; the
    /// caller should then apply the response (or report the failure). Stale
    /// tickets return `false` and leave the loading set untouched.
    pub fn complete(&mut self, path: &str, ticket: ExpandTicket) -> bool {
        if ticket.generation != self.generation {
            debug!("Dropping expansion of {path} from superseded root ({ticket:?})");
            return false;
        }
        let key = normalize_path(path);
        match self.loading.get(&key) {
            Some(pending) if pending.seq == ticket.seq => {
                self.loading.remove(&key);
                true
            }
            _ => {
                debug!("Dropping expansion of {path}: ticket no longer current");
                false
            }
        }
    }

    /// Close a directory in the view. Loaded children stay in the tree.
    pub fn collapse(&mut self, path: &str) -> bool {
        self.expanded.remove(&normalize_path(path)).is_some()
    }

    /// Mark a path open without issuing a request (used for the root).
    pub fn mark_expanded(&mut self, path: &str) {
        self.expanded
            .insert(normalize_path(path), path.to_string());
    }

    pub fn is_loading(&self, path: &str) -> bool {
        self.loading.contains_key(&normalize_path(path))
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expanded.contains_key(&normalize_path(path))
    }

    /// Number of outstanding requests.
    pub fn loading_count(&self) -> usize {
        self.loading.len()
    }

    /// Paths with an outstanding request, sorted for stable display.
    pub fn loading_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.loading.values().map(|p| p.path.as_str()).collect();
        paths.sort_unstable();
        paths
    }

    /// Paths the user currently has open, sorted for stable display.
    pub fn expanded_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.expanded.values().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{order_siblings, DirectoryEntry};

    fn tree() -> NodeRef {
        let mut root = DirectoryEntry::directory("root", "/root");
        let mut loaded = DirectoryEntry::directory("loaded", "/root/loaded");
        loaded.children = Some(Vec::<NodeRef>::new().into());
        root.children = Some(order_siblings(vec![
            DirectoryEntry::directory("lazy", "/root/lazy").into_ref(),
            loaded.into_ref(),
            DirectoryEntry::file("f.txt", "/root/f.txt", 5).into_ref(),
        ]));
        root.into_ref()
    }

    fn started(req: ExpandRequest) -> ExpandTicket {
        match req {
            ExpandRequest::Started(t) => t,
            other => panic!("expected Started, got {other:?}"),
        }
    }

    #[test]
    fn begin_issues_ticket_and_marks_loading() {
        let root = tree();
        let mut ctl = ExpansionController::new();
        ctl.reset();
        let ticket = started(ctl.begin(Some(&root), "/root/lazy"));
        assert_eq!(ticket.generation, ctl.generation());
        assert!(ctl.is_loading("/ROOT/LAZY"));
        assert!(ctl.is_expanded("/root/lazy"));
        assert_eq!(ctl.loading_paths(), ["/root/lazy"]);
    }

    #[test]
    fn second_begin_while_loading_is_a_no_op() {
        let root = tree();
        let mut ctl = ExpansionController::new();
        started(ctl.begin(Some(&root), "/root/lazy"));
        assert_eq!(ctl.begin(Some(&root), r"\root\lazy"), ExpandRequest::AlreadyLoading);
        assert_eq!(ctl.loading_paths().len(), 1);
    }

    #[test]
    fn loaded_directories_need_no_request() {
        let root = tree();
        let mut ctl = ExpansionController::new();
        assert_eq!(ctl.begin(Some(&root), "/root/loaded"), ExpandRequest::AlreadyLoaded);
        assert!(ctl.is_expanded("/root/loaded"));
        assert!(!ctl.is_loading("/root/loaded"));
    }

    #[test]
    fn files_and_unknown_paths_are_rejected() {
        let root = tree();
        let mut ctl = ExpansionController::new();
        assert_eq!(ctl.begin(Some(&root), "/root/f.txt"), ExpandRequest::NotADirectory);
        assert_eq!(ctl.begin(Some(&root), "/root/nope"), ExpandRequest::NotFound);
        assert_eq!(ctl.begin(None, "/root"), ExpandRequest::NotFound);
        assert!(ctl.expanded_paths().is_empty());
    }

    #[test]
    fn complete_accepts_current_ticket_once() {
        let root = tree();
        let mut ctl = ExpansionController::new();
        let ticket = started(ctl.begin(Some(&root), "/root/lazy"));
        assert!(ctl.complete("/root/lazy", ticket));
        assert!(!ctl.is_loading("/root/lazy"));
        assert!(!ctl.complete("/root/lazy", ticket));
    }

    #[test]
    fn reset_invalidates_outstanding_tickets() {
        let root = tree();
        let mut ctl = ExpansionController::new();
        let ticket = started(ctl.begin(Some(&root), "/root/lazy"));
        ctl.reset();
        assert!(ctl.loading_paths().is_empty());
        assert!(ctl.expanded_paths().is_empty());
        assert!(!ctl.complete("/root/lazy", ticket));
    }

    /// A ticket from an older generation must not clear a newer request for
    /// the same path.
    #[test]
    fn stale_ticket_leaves_newer_request_pending() {
        let root = tree();
        let mut ctl = ExpansionController::new();
        let old = started(ctl.begin(Some(&root), "/root/lazy"));
        ctl.reset();
        let new = started(ctl.begin(Some(&root), "/root/lazy"));
        assert_ne!(old, new);
        assert!(!ctl.complete("/root/lazy", old));
        assert!(ctl.is_loading("/root/lazy"));
        assert!(ctl.complete("/root/lazy", new));
    }

    #[test]
    fn collapse_only_touches_view_state() {
        let root = tree();
        let mut ctl = ExpansionController::new();
        ctl.begin(Some(&root), "/root/loaded");
        assert!(ctl.collapse("/root/loaded"));
        assert!(!ctl.is_expanded("/root/loaded"));
        assert!(!ctl.collapse("/root/loaded"));
        assert_eq!(ctl.begin(Some(&root), "/root/loaded"), ExpandRequest::AlreadyLoaded);
    }
}
