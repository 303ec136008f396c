/// DiskPulse Core — the engine behind a progressive disk-usage view.
///
/// This crate holds the directory tree, the rules for keeping it ordered and
/// consistent while sizes stream in, lazy directory expansion, and the
/// breakdown that feeds the chart. It has no UI dependencies; frontends drive
/// a [`session::Session`] and render what it exposes.
///
/// # Modules
///
/// - [`model`] — Immutable tree nodes, path keys, sibling ordering.
/// - [`merge`] — Copy-on-write application of size updates and subtrees.
/// - [`expansion`] — Loading/expanded bookkeeping for lazy directories.
/// - [`analysis`] — Thresholded size breakdown of the root's children.
/// - [`scanner`] — Backend trait, session messages, filesystem backend.
/// - [`session`] — Single-consumer driver that owns the tree.
/// - [`platform`] — Reveal-in-file-manager pass-through.
pub mod analysis;
pub mod error;
pub mod expansion;
pub mod merge;
pub mod model;
pub mod platform;
pub mod scanner;
pub mod session;

pub use scanner::fs::FsBackend;
pub use session::{Session, SessionConfig, SessionPhase};
