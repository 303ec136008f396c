/// Session — the single owner of the directory tree.
///
/// Every source of change (the initial listing, streamed size updates,
/// finished expansions) arrives as a [`SessionMessage`] on one channel.
/// Mutations happen only inside [`Session::process_messages`], one message at
/// a time, so a reader between two calls always sees a fully installed tree
/// and no two mutations can race. The tree itself needs no lock.
///
/// Backend calls run on short-lived background threads. Each carries the
/// root generation (and, for expansions, a ticket) it was issued under; a
/// response for a superseded root is dropped when it is dequeued.
pub mod config;

pub use config::SessionConfig;

use crate::analysis::{breakdown, BreakdownSlice};
use crate::expansion::{ExpandRequest, ExpansionController};
use crate::merge::{self, Rebuild};
use crate::model::{ensure_ordered, normalize_path, DirectoryEntry, NodeRef, SizeUpdate};
use crate::scanner::progress::SessionMessage;
use crate::scanner::{ScanBackend, UpdateSink};
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Cap on retained expansion failures.
const MAX_EXPANSION_ERRORS: usize = 1_000;

/// Poll interval used by [`Session::wait_until_settled`].
const SETTLE_POLL: Duration = Duration::from_millis(20);

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing requested yet.
    Idle,
    /// Waiting for the root listing.
    Analyzing,
    /// A root is installed; updates may still be streaming in.
    Ready,
    /// The root listing failed. See [`Session::last_error`].
    Failed,
}

pub struct Session {
    backend: Arc<dyn ScanBackend>,
    config: SessionConfig,
    tx: Sender<SessionMessage>,
    rx: Receiver<SessionMessage>,

    // ── Tree ───────────────────────────────────────────
    phase: SessionPhase,
    root_path: Option<String>,
    root: Option<NodeRef>,
    /// Recomputed every time a different root is installed.
    breakdown: Vec<BreakdownSlice>,

    // ── Transient view state ───────────────────────────
    expansion: ExpansionController,
    /// Updates for paths not in the tree yet, held while a listing that may
    /// introduce them is outstanding. Keyed by normalised path.
    parked: HashMap<String, SizeUpdate>,
    /// Background calls whose response has not been dequeued yet.
    outstanding: usize,

    // ── Errors ─────────────────────────────────────────
    last_error: Option<String>,
    expansion_errors: Vec<(String, String)>,
}

impl Session {
    pub fn new(backend: Arc<dyn ScanBackend>, config: SessionConfig) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(config.channel_capacity);
        Self {
            backend,
            config,
            tx,
            rx,
            phase: SessionPhase::Idle,
            root_path: None,
            root: None,
            breakdown: Vec::new(),
            expansion: ExpansionController::new(),
            parked: HashMap::new(),
            outstanding: 0,
            last_error: None,
            expansion_errors: Vec::new(),
        }
    }

    /// Accept paths from a folder picker, a drop or the command line.
    ///
    /// Only the first non-empty path is analysed. Returns `false` (and does
    /// nothing) when there is no usable path.
    pub fn ingest_paths<I, P>(&mut self, paths: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let Some(first) = paths
            .into_iter()
            .find(|p| !p.as_ref().as_os_str().is_empty())
        else {
            debug!("Ingestion carried no usable path");
            return false;
        };
        self.start_analysis(first.as_ref());
        true
    }

    /// Discard the current tree and start analysing `path`.
    pub fn start_analysis(&mut self, path: &Path) {
        let path_str = path.to_string_lossy().into_owned();
        let generation = self.expansion.reset();

        self.phase = SessionPhase::Analyzing;
        self.root_path = Some(path_str.clone());
        self.root = None;
        self.breakdown.clear();
        self.parked.clear();
        self.last_error = None;
        self.expansion_errors.clear();

        info!("Analysing {path_str} (generation {generation})");

        let backend = Arc::clone(&self.backend);
        let sink = UpdateSink::new(self.tx.clone());
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("diskpulse-analyze".into())
            .spawn(move || {
                let result = backend.analyze_root(Path::new(&path_str), &sink);
                let msg = SessionMessage::Analyzed {
                    generation,
                    path: path_str,
                    result,
                };
                if tx.send(msg).is_err() {
                    debug!("Session dropped before analysis finished");
                }
            });

        match spawned {
            Ok(_) => self.outstanding += 1,
            Err(err) => self.fail_analysis(format!("cannot start analysis thread: {err}")),
        }
    }

    /// Open a directory, fetching its children if they were never loaded.
    pub fn expand(&mut self, path: &str) -> ExpandRequest {
        let request = self.expansion.begin(self.root.as_ref(), path);
        let ExpandRequest::Started(ticket) = request else {
            return request;
        };

        let backend = Arc::clone(&self.backend);
        let sink = UpdateSink::new(self.tx.clone());
        let tx = self.tx.clone();
        let thread_path = path.to_string();
        let spawned = thread::Builder::new()
            .name("diskpulse-expand".into())
            .spawn(move || {
                let result = backend.expand_directory(Path::new(&thread_path), &sink);
                let msg = SessionMessage::Expanded {
                    ticket,
                    path: thread_path,
                    result,
                };
                if tx.send(msg).is_err() {
                    debug!("Session dropped before expansion finished");
                }
            });

        match spawned {
            Ok(_) => self.outstanding += 1,
            Err(err) => {
                self.expansion.complete(path, ticket);
                self.record_expansion_error(path, format!("cannot start expansion thread: {err}"));
            }
        }
        request
    }

    /// Close a directory in the view. Its children stay loaded.
    pub fn collapse(&mut self, path: &str) -> bool {
        self.expansion.collapse(path)
    }

    /// Collapse an open directory or expand a closed one.
    ///
    /// Returns the expansion decision, or `None` if the path was collapsed.
    pub fn toggle_expand(&mut self, path: &str) -> Option<ExpandRequest> {
        if self.expansion.is_expanded(path) {
            self.collapse(path);
            None
        } else {
            Some(self.expand(path))
        }
    }

    /// Apply pending messages without blocking. Call once per frame.
    ///
    /// Handles at most `messages_per_pump` messages. Returns `true` if any
    /// message was handled.
    pub fn process_messages(&mut self) -> bool {
        self.drain(self.config.messages_per_pump) > 0
    }

    /// Wait up to `timeout` for the next message, then drain like
    /// [`process_messages`](Self::process_messages). The awaited message
    /// counts against the same budget.
    pub fn process_messages_timeout(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(msg) => {
                self.handle_message(msg);
                self.drain(self.config.messages_per_pump.saturating_sub(1));
                true
            }
            Err(_) => false,
        }
    }

    /// Handle up to `budget` queued messages. Returns how many were handled.
    fn drain(&mut self, budget: usize) -> usize {
        let mut handled = 0usize;
        while handled < budget {
            let msg = match self.rx.try_recv() {
                Ok(m) => m,
                Err(_) => break,
            };
            handled += 1;
            self.handle_message(msg);
        }
        handled
    }

    /// Pump until no background work remains and the channel is empty.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub fn wait_until_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let got = self.process_messages_timeout((deadline - now).min(SETTLE_POLL));
            if !got && !self.is_busy() && self.rx.is_empty() {
                return true;
            }
        }
    }

    /// `true` while a backend call is in flight or the backend reports
    /// background work.
    pub fn is_busy(&self) -> bool {
        self.outstanding > 0 || self.backend.is_busy()
    }

    /// Show `path` in the OS file manager. Failures are logged only.
    pub fn reveal(&self, path: &str) -> bool {
        match self.backend.reveal(Path::new(path)) {
            Ok(()) => true,
            Err(err) => {
                warn!("Cannot reveal {path}: {err}");
                false
            }
        }
    }

    fn handle_message(&mut self, msg: SessionMessage) {
        match msg {
            SessionMessage::Analyzed {
                generation,
                path,
                result,
            } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                if generation != self.expansion.generation() {
                    debug!("Discarding analysis of {path} from superseded generation {generation}");
                    return;
                }
                match result {
                    Ok(entry) => self.install_analysis(entry),
                    Err(err) => {
                        warn!("Analysis of {path} failed: {err}");
                        self.fail_analysis(err.to_string());
                    }
                }
            }
            SessionMessage::Expanded {
                ticket,
                path,
                result,
            } => {
                self.outstanding = self.outstanding.saturating_sub(1);
                if !self.expansion.complete(&path, ticket) {
                    return;
                }
                match result {
                    Ok(loaded) => {
                        debug!("Splicing {} children at {path}", loaded.children().len());
                        let spliced = merge::splice_subtree(self.root.as_ref(), &loaded);
                        self.install(spliced);
                        self.replay_parked();
                    }
                    Err(err) => {
                        warn!("Expanding {path} failed: {err}");
                        self.record_expansion_error(&path, err.to_string());
                    }
                }
            }
            SessionMessage::SizeUpdated(update) => self.apply_size_update(update),
        }
    }

    fn install_analysis(&mut self, mut entry: DirectoryEntry) {
        let children = match entry.children.as_ref() {
            Some(list) => ensure_ordered(list),
            None => Vec::<NodeRef>::new().into(),
        };
        entry.children = Some(children);

        info!("Root {} listed with {} entries", entry.path, entry.children().len());
        self.expansion.mark_expanded(&entry.path);
        self.phase = SessionPhase::Ready;
        self.install(Some(entry.into_ref()));
        self.replay_parked();
    }

    fn apply_size_update(&mut self, update: SizeUpdate) {
        let Some(root) = self.root.as_ref() else {
            self.park_or_drop(update);
            return;
        };
        match merge::merge_update(root, &update) {
            Rebuild::Replaced(new_root) => {
                self.install(Some(new_root));
            }
            Rebuild::Unchanged => {}
            Rebuild::NotFound => self.park_or_drop(update),
        }
    }

    /// Hold an update whose path is not in the tree while a listing that may
    /// introduce it is outstanding; drop it otherwise.
    fn park_or_drop(&mut self, update: SizeUpdate) {
        let key = normalize_path(&update.path);
        let room =
            self.parked.contains_key(&key) || self.parked.len() < self.config.max_parked_updates;
        if self.listing_outstanding() && room {
            trace!("Parking update for {} until its listing lands", update.path);
            self.parked.insert(key, update);
        } else {
            trace!("Ignoring update for unknown path {}", update.path);
        }
    }

    /// Retry parked updates against the freshly installed tree.
    fn replay_parked(&mut self) {
        if self.parked.is_empty() {
            return;
        }
        let parked = std::mem::take(&mut self.parked);
        trace!("Replaying {} parked updates", parked.len());
        for update in parked.into_values() {
            self.apply_size_update(update);
        }
    }

    fn listing_outstanding(&self) -> bool {
        self.phase == SessionPhase::Analyzing || self.expansion.loading_count() > 0
    }

    /// Swap in `new_root`. Returns `false` if it is the root already held.
    fn install(&mut self, new_root: Option<NodeRef>) -> bool {
        let unchanged = match (&self.root, &new_root) {
            (Some(old), Some(new)) => Arc::ptr_eq(old, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return false;
        }
        self.root = new_root;
        self.breakdown = breakdown(self.root.as_deref(), &self.config.breakdown);
        true
    }

    fn fail_analysis(&mut self, message: String) {
        self.phase = SessionPhase::Failed;
        self.root = None;
        self.breakdown.clear();
        self.parked.clear();
        self.last_error = Some(message);
    }

    fn record_expansion_error(&mut self, path: &str, message: String) {
        if self.expansion_errors.len() < MAX_EXPANSION_ERRORS {
            self.expansion_errors.push((path.to_string(), message));
        }
    }

    // ── Read access ─────────────────────────────────────

    pub fn root(&self) -> Option<&NodeRef> {
        self.root.as_ref()
    }

    pub fn root_path(&self) -> Option<&str> {
        self.root_path.as_deref()
    }

    pub fn find(&self, path: &str) -> Option<&NodeRef> {
        merge::find(self.root.as_ref(), path)
    }

    pub fn breakdown(&self) -> &[BreakdownSlice] {
        &self.breakdown
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.expansion.generation()
    }

    pub fn is_loading(&self, path: &str) -> bool {
        self.expansion.is_loading(path)
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        self.expansion.is_expanded(path)
    }

    pub fn loading_paths(&self) -> Vec<&str> {
        self.expansion.loading_paths()
    }

    pub fn expanded_paths(&self) -> Vec<&str> {
        self.expansion.expanded_paths()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// `(path, message)` for every failed expansion since the last analysis.
    pub fn expansion_errors(&self) -> &[(String, String)] {
        &self.expansion_errors
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
