/// Data model for the DiskPulse directory tree.
///
/// A persistent tree of `Arc`-shared nodes plus the ordering policy and path
/// keys every other component relies on.
pub mod entry;
pub mod ordering;
pub mod path_key;
pub mod size;
pub mod update;

pub use entry::{Children, DirectoryEntry, EntryKind, NodeRef};
pub use ordering::{compare_siblings, ensure_ordered, is_ordered, order_siblings};
pub use path_key::{matches_key, normalize_path, same_path};
pub use update::SizeUpdate;
