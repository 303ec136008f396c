/// Filesystem backend — one-level listings plus background size workers.
///
/// Listing is done inline on the caller's thread and is cheap: a single
/// `read_dir` plus one `symlink_metadata` per entry. Files get their size
/// immediately; directories come back unresolved unless a previous
/// computation left their totals in the cache.
///
/// Recursive directory totals are computed on a dedicated rayon pool. Every
/// directory emits a [`SizeUpdate`] the moment its own total is known, so
/// deep leaves resolve first and the root resolves last. Results are cached
/// by normalised path, and an in-progress set keeps two requests for the same
/// directory from walking it twice.
use super::{ScanBackend, UpdateSink};
use crate::error::ScanError;
use crate::model::{normalize_path, order_siblings, DirectoryEntry, SizeUpdate};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `(size, file_count)` keyed by normalised path.
type SizeCache = Arc<Mutex<HashMap<String, (u64, u64)>>>;

/// Scanner backed by the local filesystem.
pub struct FsBackend {
    size_cache: SizeCache,
    in_progress: Arc<Mutex<HashSet<String>>>,
    pool: Arc<rayon::ThreadPool>,
}

impl FsBackend {
    /// Backend with one size worker per logical CPU.
    pub fn new() -> Result<Self, ScanError> {
        Self::with_threads(num_cpus::get())
    }

    pub fn with_threads(threads: usize) -> Result<Self, ScanError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("diskpulse-size-{i}"))
            .build()
            .map_err(|e| ScanError::Backend(format!("cannot start size workers: {e}")))?;

        Ok(Self {
            size_cache: Arc::new(Mutex::new(HashMap::new())),
            in_progress: Arc::new(Mutex::new(HashSet::new())),
            pool: Arc::new(pool),
        })
    }

    /// Cached `(size, file_count)` for `path`, if its computation finished.
    pub fn cached(&self, path: &Path) -> Option<(u64, u64)> {
        let key = normalize_path(&path.to_string_lossy());
        self.size_cache.lock().get(&key).copied()
    }

    /// Read one directory level into a node with resolved-or-pending children.
    fn list_level(&self, path: &Path) -> Result<DirectoryEntry, ScanError> {
        let path = clean_path(path);
        let meta = fs::metadata(&path).map_err(|source| ScanError::ReadDir {
            path: path.clone(),
            source,
        })?;
        if !meta.is_dir() {
            return Err(ScanError::NotADirectory(path));
        }
        let entries = fs::read_dir(&path).map_err(|source| ScanError::ReadDir {
            path: path.clone(),
            source,
        })?;

        let mut children = Vec::new();
        for entry in entries.flatten() {
            let entry_path = entry.path();
            let meta = match fs::symlink_metadata(&entry_path) {
                Ok(m) => m,
                Err(err) => {
                    debug!("Skipping {}: {err}", entry_path.display());
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let path_str = entry_path.to_string_lossy().into_owned();

            let node = if meta.is_dir() {
                let mut dir = DirectoryEntry::directory(name, path_str);
                if let Some((size, count)) = self.lookup(&dir.path) {
                    dir.size = Some(size);
                    dir.file_count = count;
                }
                dir
            } else {
                DirectoryEntry::file(name, path_str, meta.len())
            };
            children.push(node.into_ref());
        }

        let path_str = path.to_string_lossy().into_owned();
        let mut node = DirectoryEntry::directory(display_name(&path), path_str);
        if let Some((size, count)) = self.lookup(&node.path) {
            node.size = Some(size);
            node.file_count = count;
        }
        node.children = Some(order_siblings(children));
        Ok(node)
    }

    fn lookup(&self, path: &str) -> Option<(u64, u64)> {
        self.size_cache.lock().get(&normalize_path(path)).copied()
    }

    /// Mark `key` as being computed unless it is cached or already running.
    fn try_mark_in_progress(&self, key: &str) -> bool {
        if self.size_cache.lock().contains_key(key) {
            return false;
        }
        self.in_progress.lock().insert(key.to_string())
    }

    /// Start the recursive size computation for `path` in the background.
    fn schedule_sizes(&self, path: &str, sink: &UpdateSink) {
        let key = normalize_path(path);
        if !self.try_mark_in_progress(&key) {
            debug!("Size of {path} already known or being computed");
            return;
        }

        let cache = Arc::clone(&self.size_cache);
        let in_progress = Arc::clone(&self.in_progress);
        let sink = sink.clone();
        let root = PathBuf::from(path);
        self.pool.spawn(move || {
            let (size, files) = isolated(&root, &sink, || compute_dir_size(&root, &cache, &sink));
            debug!("Computed {}: {size} bytes in {files} files", root.display());
            in_progress.lock().remove(&key);
        });
    }
}

impl ScanBackend for FsBackend {
    fn analyze_root(&self, path: &Path, sink: &UpdateSink) -> Result<DirectoryEntry, ScanError> {
        let node = self.list_level(path)?;
        info!("Listed {} ({} entries)", node.path, node.children().len());
        self.schedule_sizes(&node.path, sink);
        Ok(node)
    }

    fn expand_directory(
        &self,
        path: &Path,
        sink: &UpdateSink,
    ) -> Result<DirectoryEntry, ScanError> {
        let node = self.list_level(path)?;
        self.schedule_sizes(&node.path, sink);
        Ok(node)
    }

    fn is_busy(&self) -> bool {
        !self.in_progress.lock().is_empty()
    }
}

/// Recursively total `path`, emitting one update per directory.
///
/// Unreadable directories count as empty. Symlinks are never followed.
fn compute_dir_size(path: &Path, cache: &SizeCache, sink: &UpdateSink) -> (u64, u64) {
    let path_str = path.to_string_lossy().into_owned();
    let key = normalize_path(&path_str);
    if let Some(&hit) = cache.lock().get(&key) {
        return hit;
    }

    let mut total_size = 0u64;
    let mut total_files = 0u64;
    let mut subdirs = Vec::new();

    match fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let entry_path = entry.path();
                let Ok(meta) = fs::symlink_metadata(&entry_path) else {
                    continue;
                };
                if meta.is_dir() {
                    subdirs.push(entry_path);
                } else {
                    total_size += meta.len();
                    total_files += 1;
                }
            }
        }
        Err(err) => debug!("Cannot read {path_str}: {err}"),
    }

    let (sub_size, sub_files) = subdirs
        .par_iter()
        .map(|dir| isolated(dir, sink, || compute_dir_size(dir, cache, sink)))
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
    total_size += sub_size;
    total_files += sub_files;

    cache.lock().insert(key, (total_size, total_files));
    sink.emit(SizeUpdate::new(path_str, total_size, total_files));

    (total_size, total_files)
}

/// Run `compute` for `dir`, resolving `dir` to zero if it panics.
///
/// A panic in one subtree must not take down its siblings or leave the
/// directory unresolved forever.
fn isolated<F>(dir: &Path, sink: &UpdateSink, compute: F) -> (u64, u64)
where
    F: FnOnce() -> (u64, u64),
{
    match panic::catch_unwind(AssertUnwindSafe(compute)) {
        Ok(totals) => totals,
        Err(_) => {
            warn!("Size computation for {} panicked; counting it as empty", dir.display());
            sink.emit(SizeUpdate::new(dir.to_string_lossy(), 0, 0));
            (0, 0)
        }
    }
}

/// Drop `.` components and trailing separators, keeping the path's spelling.
fn clean_path(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Display name for a listed directory: the last component, or the whole
/// path for roots such as `/` or `C:\`.
fn display_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}
