/// Error types for the DiskPulse core.
///
/// Every failure here is local to the operation that raised it. None of them
/// tear down a session; the worst case (a failed root analysis) clears the
/// tree and leaves the session ready for the next request.
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the scanner calls (`analyze_root` / `expand_directory`).
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("scanner backend failed: {0}")]
    Backend(String),
}

/// Failures of the reveal-in-file-manager pass-through.
#[derive(Debug, Error)]
pub enum RevealError {
    #[error("failed to launch file manager for {path}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("revealing paths is not supported on this platform")]
    Unsupported,
}

/// Rejected configuration values.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("breakdown threshold {0} must be between 0 and 1")]
    ThresholdOutOfRange(f64),

    #[error("breakdown slice cap must be at least 1")]
    ZeroSliceCap,

    #[error("message budget per pump must be at least 1")]
    ZeroMessageBudget,
}
