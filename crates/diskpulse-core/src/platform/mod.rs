/// Platform-specific functionality — OS file-manager integration.

pub mod reveal;

pub use reveal::{reveal_command, reveal_path};
