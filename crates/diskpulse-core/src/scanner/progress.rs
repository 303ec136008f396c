/// Messages sent from background threads to the session thread via a
/// crossbeam channel.
///
/// Everything that can change the tree travels through this one channel, so
/// the session applies mutations in exactly the order it receives them.
use crate::error::ScanError;
use crate::expansion::ExpandTicket;
use crate::model::{DirectoryEntry, SizeUpdate};

#[derive(Debug)]
pub enum SessionMessage {
    /// `analyze_root` returned for the analysis started in `generation`.
    Analyzed {
        generation: u64,
        path: String,
        result: Result<DirectoryEntry, ScanError>,
    },
    /// `expand_directory` returned for the request identified by `ticket`.
    Expanded {
        ticket: ExpandTicket,
        path: String,
        result: Result<DirectoryEntry, ScanError>,
    },
    /// A directory's aggregate size became known.
    SizeUpdated(SizeUpdate),
}
