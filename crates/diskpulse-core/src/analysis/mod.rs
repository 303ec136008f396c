/// Analysis modules — views derived from the current tree.

pub mod breakdown;

pub use breakdown::{breakdown, BreakdownConfig, BreakdownSlice, OTHER_LABEL};
