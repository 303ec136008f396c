/// Root-level proportional breakdown.
///
/// Produces the dataset a pie/donut chart draws: one slice per large direct
/// child of the root, with everything small (or beyond the slice cap) folded
/// into a single "Other" slice. Slice values always add up to the sum of the
/// resolved child sizes, so percentages computed from them are exact.
use crate::error::ConfigError;
use crate::model::DirectoryEntry;
use serde::{Deserialize, Serialize};

/// Label of the catch-all slice.
pub const OTHER_LABEL: &str = "Other";

/// Bucketing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakdownConfig {
    /// Children smaller than `total * threshold_fraction` go to "Other".
    pub threshold_fraction: f64,
    /// Maximum number of named slices.
    pub max_slices: usize,
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        Self {
            threshold_fraction: 0.01,
            max_slices: 20,
        }
    }
}

impl BreakdownConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold_fraction) {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold_fraction));
        }
        if self.max_slices == 0 {
            return Err(ConfigError::ZeroSliceCap);
        }
        Ok(())
    }
}

/// One slice of the breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownSlice {
    pub label: String,
    pub value: u64,
    /// Path of the child this slice represents; `None` for "Other".
    pub path: Option<String>,
    /// Number of children folded into this slice (1 for a named slice).
    pub item_count: usize,
}

impl BreakdownSlice {
    pub fn is_other(&self) -> bool {
        self.path.is_none()
    }
}

/// Derive the breakdown for `root`'s direct children.
///
/// Only children with a resolved size take part. Returns an empty list when
/// there is no root, no resolved child, or the resolved total is zero.
pub fn breakdown(root: Option<&DirectoryEntry>, config: &BreakdownConfig) -> Vec<BreakdownSlice> {
    let Some(root) = root else {
        return Vec::new();
    };

    let mut sized: Vec<(&DirectoryEntry, u64)> = root
        .children()
        .iter()
        .filter_map(|child| child.size.map(|size| (child.as_ref(), size)))
        .collect();

    let total: u64 = sized.iter().map(|(_, size)| size).sum();
    if total == 0 {
        return Vec::new();
    }
    let threshold = total as f64 * config.threshold_fraction;

    // Stable: equal sizes keep their tree order.
    sized.sort_by(|a, b| b.1.cmp(&a.1));

    let mut slices = Vec::with_capacity(config.max_slices.min(sized.len()) + 1);
    let mut other_value = 0u64;
    let mut other_count = 0usize;

    for (entry, size) in sized {
        if size as f64 >= threshold && slices.len() < config.max_slices {
            slices.push(BreakdownSlice {
                label: entry.name.to_string(),
                value: size,
                path: Some(entry.path.clone()),
                item_count: 1,
            });
        } else {
            other_value += size;
            other_count += 1;
        }
    }

    if other_count > 0 {
        slices.push(BreakdownSlice {
            label: OTHER_LABEL.to_string(),
            value: other_value,
            path: None,
            item_count: other_count,
        });
    }

    slices
}
