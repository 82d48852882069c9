//! Core data structures for table analysis and repair
//!
//! The document itself lives in an [`XmlTree`](super::tree::XmlTree); the
//! types here are views and reports derived from it during one session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::tree::NodeId;

/// Level key ("Mức 1", "Mức 2", ...) to grid column in a skill-result table
pub type LevelColumns = BTreeMap<u8, usize>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TextFormatting {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Size in points
    pub font_size: Option<f32>,
    /// Hex colour without the leading `#`
    pub color: Option<String>,
    pub font: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlignment {
    pub fn as_wml(self) -> &'static str {
        match self {
            TextAlignment::Left => "left",
            TextAlignment::Center => "center",
            TextAlignment::Right => "right",
            TextAlignment::Justify => "both",
        }
    }
}

/// Vertical merge marker on a table cell
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerticalMerge {
    /// First cell of a merged run
    Restart,
    /// Continues the merged cell from the row above
    Continue,
}

/// Meaning of a header column in a goal-plan table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GoalColumn {
    Ordinal,
    Domain,
    LongTerm,
    ShortTerm,
    Other,
}

/// Header layout of a goal-plan table, one entry per header cell
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GoalColumns {
    pub columns: Vec<GoalColumn>,
}

impl GoalColumns {
    pub fn has(&self, kind: GoalColumn) -> bool {
        self.columns.contains(&kind)
    }
}

/// Role a table plays in the document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TableRole {
    SkillResult(LevelColumns),
    GoalPlan(GoalColumns),
    Generic,
}

impl TableRole {
    pub fn label(&self) -> &'static str {
        match self {
            TableRole::SkillResult(_) => "skill results",
            TableRole::GoalPlan(_) => "goal plan",
            TableRole::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedTable {
    pub role: TableRole,
    /// Index of the header row among the table's rows
    pub header_row: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableIssue {
    MissingBorders,
    IncompleteBorders,
    MergeableWithNext,
}

impl fmt::Display for TableIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TableIssue::MissingBorders => "missing borders",
            TableIssue::IncompleteBorders => "incomplete borders",
            TableIssue::MergeableWithNext => "mergeable with next table",
        };
        f.write_str(text)
    }
}

/// Which repairs to apply to one table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RepairOptions {
    pub fix_borders: bool,
    pub autofit: bool,
    pub fix_spacing: bool,
    pub fix_align: bool,
    pub merge_next: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            fix_borders: true,
            autofit: true,
            fix_spacing: true,
            fix_align: true,
            merge_next: false,
        }
    }
}

/// Analysis result for one body-level table
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    #[serde(skip)]
    pub id: NodeId,
    pub index: usize,
    pub role: TableRole,
    pub preview: String,
    pub issues: Vec<TableIssue>,
    pub can_merge_next: bool,
    pub options: RepairOptions,
}

/// Read-only report produced by the analysis pass
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub tables: Vec<TableInfo>,
}

impl AnalysisReport {
    pub fn issue_count(&self) -> usize {
        self.tables.iter().map(|t| t.issues.len()).sum()
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tables.is_empty() {
            return writeln!(f, "No tables found.");
        }
        for info in &self.tables {
            writeln!(
                f,
                "Table {} [{}]: {}",
                info.index + 1,
                info.role.label(),
                info.preview
            )?;
            if info.issues.is_empty() {
                writeln!(f, "  ok")?;
            }
            for issue in &info.issues {
                writeln!(f, "  - {issue}")?;
            }
        }
        write!(
            f,
            "{} table(s), {} issue(s)",
            self.tables.len(),
            self.issue_count()
        )
    }
}

/// What a repair pass changed
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RepairSummary {
    pub tables_repaired: usize,
    pub merges: usize,
    pub gaps_normalized: usize,
    pub warnings: Vec<String>,
}
