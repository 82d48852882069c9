//! Table defect detection and repair
//!
//! The read-only [`analyze`] pass produces a [`TableInfo`](crate::document::TableInfo)
//! per table. The mutating pass first performs the requested [`merge`]s and
//! then runs the [`pipeline`] stages on every surviving table.

pub mod analyze;
pub mod merge;
pub mod pipeline;

pub use analyze::{GapScan, analyze_tables, scan_gap_to_next_table};
pub use merge::{merge_flagged, merge_with_next};
pub use pipeline::{RepairStage, apply_repairs, repair_table};
