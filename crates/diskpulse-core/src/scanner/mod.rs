/// Scanner module — the boundary between the engine and whatever walks the
/// filesystem.
///
/// The engine never touches the disk itself. It calls a [`ScanBackend`] for
/// one-level listings and receives aggregate sizes later through an
/// [`UpdateSink`]. [`fs::FsBackend`] is the bundled implementation; tests
/// substitute in-memory backends.
pub mod fs;
pub mod progress;

use crate::error::{RevealError, ScanError};
use crate::model::{DirectoryEntry, SizeUpdate};
use crossbeam_channel::Sender;
use progress::SessionMessage;
use std::path::Path;

/// Maximum number of messages that may queue up in a session channel.
///
/// The session drains the channel in bounded pumps. If it falls behind, size
/// workers stall briefly on `send` rather than consuming unbounded heap.
pub const SESSION_CHANNEL_CAPACITY: usize = 4_096;

/// Write end of the update event stream handed to a backend.
#[derive(Clone, Debug)]
pub struct UpdateSink {
    tx: Sender<SessionMessage>,
}

impl UpdateSink {
    pub fn new(tx: Sender<SessionMessage>) -> Self {
        Self { tx }
    }

    /// Publish one size update.
    ///
    /// Returns `false` once the receiving session is gone, so long-running
    /// workers can stop early.
    pub fn emit(&self, update: SizeUpdate) -> bool {
        self.tx.send(SessionMessage::SizeUpdated(update)).is_ok()
    }
}

/// External scanner calls used by the session.
///
/// Both listing calls run on a background thread owned by the session and
/// may block. They may start background work whose results arrive later
/// through `sink`.
pub trait ScanBackend: Send + Sync + 'static {
    /// List `path` one level deep. The returned node carries `children`.
    fn analyze_root(&self, path: &Path, sink: &UpdateSink) -> Result<DirectoryEntry, ScanError>;

    /// List an already known directory one level deep.
    fn expand_directory(
        &self,
        path: &Path,
        sink: &UpdateSink,
    ) -> Result<DirectoryEntry, ScanError>;

    /// `true` while background work started by this backend is still running.
    fn is_busy(&self) -> bool {
        false
    }

    /// Show `path` in the OS file manager.
    fn reveal(&self, path: &Path) -> Result<(), RevealError> {
        crate::platform::reveal_path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_reports_disconnect() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let sink = UpdateSink::new(tx);
        assert!(sink.emit(SizeUpdate::new("/a", 1, 1)));
        match rx.try_recv() {
            Ok(SessionMessage::SizeUpdated(u)) => assert_eq!(u.path, "/a"),
            other => panic!("unexpected message: {other:?}"),
        }
        drop(rx);
        assert!(!sink.emit(SizeUpdate::new("/a", 1, 1)));
    }
}
