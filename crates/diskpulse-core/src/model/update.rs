/// Partial result notifications streamed by the scanner.
use serde::{Deserialize, Serialize};

/// "The aggregate size of `path` is now known."
///
/// Delivered asynchronously, at least once, in no particular order. The
/// engine treats the last applied value for a path as authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeUpdate {
    pub path: String,
    pub size: u64,
    pub file_count: u64,
}

impl SizeUpdate {
    pub fn new(path: impl Into<String>, size: u64, file_count: u64) -> Self {
        Self {
            path: path.into(),
            size,
            file_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The wire payload uses the same field names the scanner emits.
    #[test]
    fn parses_wire_payload() {
        let raw = r#"{"path":"C:\\Users","size":2048,"file_count":7}"#;
        let update: SizeUpdate = serde_json::from_str(raw).unwrap();
        assert_eq!(update, SizeUpdate::new(r"C:\Users", 2048, 7));
    }
}
