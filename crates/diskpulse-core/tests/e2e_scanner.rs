/// End-to-end tests for the filesystem backend.
///
/// These run `FsBackend` against a real temporary directory: one-level
/// listings on the calling thread, recursive totals on the size pool, and
/// the per-directory `SizeUpdate` stream on a real crossbeam channel.
use diskpulse_core::model::{same_path, SizeUpdate};
use diskpulse_core::scanner::progress::SessionMessage;
use diskpulse_core::scanner::{ScanBackend, UpdateSink, SESSION_CHANNEL_CAPACITY};
use diskpulse_core::error::ScanError;
use diskpulse_core::FsBackend;
use crossbeam_channel::Receiver;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Create a reproducible directory tree:
///
/// ```text
/// root/
///   alpha/
///     a.txt   (100 bytes)
///     b.rs    (200 bytes)
///   beta/
///     c.png   (300 bytes)
///   d.zip     (400 bytes)
/// ```
///
/// Total file bytes: 1 000.
fn build_test_tree(root: &Path) {
    let alpha = root.join("alpha");
    let beta = root.join("beta");
    fs::create_dir_all(&alpha).unwrap();
    fs::create_dir_all(&beta).unwrap();

    write_bytes(&alpha.join("a.txt"), 100);
    write_bytes(&alpha.join("b.rs"), 200);
    write_bytes(&beta.join("c.png"), 300);
    write_bytes(&root.join("d.zip"), 400);
}

fn write_bytes(path: &Path, n: usize) {
    let mut f = fs::File::create(path).unwrap();
    f.write_all(&vec![0u8; n]).unwrap();
}

fn backend_and_channel() -> (FsBackend, UpdateSink, Receiver<SessionMessage>) {
    let (tx, rx) = crossbeam_channel::bounded(SESSION_CHANNEL_CAPACITY);
    (FsBackend::with_threads(2).unwrap(), UpdateSink::new(tx), rx)
}

/// Collect size updates until the backend reports idle and the channel is
/// empty, or panic after a generous timeout.
fn drain_updates(backend: &FsBackend, rx: &Receiver<SessionMessage>) -> Vec<SizeUpdate> {
    let deadline = Instant::now() + Duration::from_secs(30);
    let mut updates = Vec::new();
    loop {
        assert!(
            Instant::now() < deadline,
            "size computation did not finish within 30 seconds"
        );
        match rx.recv_timeout(Duration::from_millis(10)) {
            Ok(SessionMessage::SizeUpdated(u)) => updates.push(u),
            Ok(other) => panic!("backend sent an unexpected message: {other:?}"),
            Err(_) if !backend.is_busy() && rx.is_empty() => return updates,
            Err(_) => {}
        }
    }
}

fn update_for<'a>(updates: &'a [SizeUpdate], path: &Path) -> &'a SizeUpdate {
    let path = path.to_string_lossy();
    updates
        .iter()
        .find(|u| same_path(&u.path, &path))
        .unwrap_or_else(|| panic!("no update for {path}"))
}

// ── Listing ──────────────────────────────────────────────────────────────────

/// A listing is one level deep: directories come back unresolved, files
/// resolved, directories first.
#[test]
fn analyze_root_lists_one_level() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    let (backend, sink, rx) = backend_and_channel();

    let root = backend.analyze_root(tmp.path(), &sink).unwrap();
    let names: Vec<&str> = root.children().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names.len(), 3);
    assert_eq!(names[2], "d.zip", "files sort after directories");

    for child in root.children() {
        if child.is_dir() {
            assert!(!child.is_expanded(), "{} must be lazy", child.name);
        } else {
            assert_eq!(child.size, Some(400));
            assert_eq!(child.file_count, 1);
        }
    }
    drain_updates(&backend, &rx);
}

#[test]
fn listing_a_missing_path_fails() {
    let tmp = TempDir::new().unwrap();
    let (backend, sink, _rx) = backend_and_channel();
    let err = backend
        .analyze_root(&tmp.path().join("nope"), &sink)
        .unwrap_err();
    assert!(matches!(err, ScanError::ReadDir { .. }), "got {err:?}");
}

#[test]
fn listing_a_file_fails() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    let (backend, sink, _rx) = backend_and_channel();
    let err = backend
        .expand_directory(&tmp.path().join("d.zip"), &sink)
        .unwrap_err();
    assert!(matches!(err, ScanError::NotADirectory(_)), "got {err:?}");
}

// ── Background sizes ─────────────────────────────────────────────────────────

/// Every directory under the analysed root gets exactly one update carrying
/// its recursive total.
#[test]
fn recursive_totals_arrive_per_directory() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    let (backend, sink, rx) = backend_and_channel();

    backend.analyze_root(tmp.path(), &sink).unwrap();
    let updates = drain_updates(&backend, &rx);
    assert_eq!(updates.len(), 3, "root, alpha and beta");

    let alpha = update_for(&updates, &tmp.path().join("alpha"));
    assert_eq!((alpha.size, alpha.file_count), (300, 2));
    let beta = update_for(&updates, &tmp.path().join("beta"));
    assert_eq!((beta.size, beta.file_count), (300, 1));
    let root = update_for(&updates, tmp.path());
    assert_eq!((root.size, root.file_count), (1_000, 4));

    assert_eq!(backend.cached(tmp.path()), Some((1_000, 4)));
}

/// The root total is emitted after the totals of its subdirectories.
#[test]
fn deepest_directories_resolve_first() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    let (backend, sink, rx) = backend_and_channel();

    backend.analyze_root(tmp.path(), &sink).unwrap();
    let updates = drain_updates(&backend, &rx);
    let last = updates.last().unwrap();
    assert!(same_path(&last.path, &tmp.path().to_string_lossy()));
}

/// Once totals are cached, a fresh listing reports directories resolved and
/// no new computation is started.
#[test]
fn cached_totals_resolve_later_listings() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    let (backend, sink, rx) = backend_and_channel();

    backend.analyze_root(tmp.path(), &sink).unwrap();
    drain_updates(&backend, &rx);

    let again = backend.analyze_root(tmp.path(), &sink).unwrap();
    assert_eq!(again.size, Some(1_000));
    let alpha = again
        .children()
        .iter()
        .find(|c| c.name == "alpha")
        .unwrap();
    assert_eq!(alpha.size, Some(300));
    assert_eq!(alpha.file_count, 2);

    assert!(!backend.is_busy());
    assert!(drain_updates(&backend, &rx).is_empty());
}

/// Expanding a subdirectory of an already computed root reuses the cache.
#[test]
fn expand_lists_children_of_subdirectory() {
    let tmp = TempDir::new().unwrap();
    build_test_tree(tmp.path());
    let (backend, sink, rx) = backend_and_channel();

    backend.analyze_root(tmp.path(), &sink).unwrap();
    drain_updates(&backend, &rx);

    let alpha = backend
        .expand_directory(&tmp.path().join("alpha"), &sink)
        .unwrap();
    assert_eq!(alpha.size, Some(300));
    let sizes: Vec<Option<u64>> = alpha.children().iter().map(|c| c.size).collect();
    assert_eq!(sizes, [Some(200), Some(100)]);
}
