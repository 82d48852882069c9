//! Structural defect detection
//!
//! The analysis pass is read-only: it walks the body-level tables, checks
//! their border definitions and the gap to the following table, and proposes
//! repair options for each one.

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::Config;
use crate::document::parsing::formatting::{cell_text, is_empty_paragraph};
use crate::document::parsing::table::classify_table;
use crate::document::query::{body_tables, row_cells, table_rows};
use crate::document::tree::{NodeId, XmlTree};
use crate::document::{AnalysisReport, TableInfo, TableIssue};

/// Sides a complete `w:tblBorders` must define, in schema order
pub const BORDER_SIDES: [&str; 6] = [
    "w:top",
    "w:left",
    "w:bottom",
    "w:right",
    "w:insideH",
    "w:insideV",
];

/// Newer documents spell the horizontal sides as start/end
const BORDER_SIDE_ALIASES: [(&str, &str); 2] = [("w:left", "w:start"), ("w:right", "w:end")];

const PREVIEW_GRAPHEMES: usize = 80;

/// What lies between a table and the next block-level table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapScan {
    /// Only empty paragraphs separate this table from `next`
    NextTable { next: NodeId, gaps: Vec<NodeId> },
    /// Text or another structural element comes first, or nothing follows
    Blocked,
}

/// Walk forward from `table` over empty paragraphs until the next table
pub fn scan_gap_to_next_table(tree: &XmlTree, table: NodeId) -> GapScan {
    let mut gaps = Vec::new();
    let mut current = table;
    while let Some(sibling) = tree.next_element_sibling(current) {
        if tree.is(sibling, "w:tbl") {
            return GapScan::NextTable {
                next: sibling,
                gaps,
            };
        }
        if !is_empty_paragraph(tree, sibling) {
            return GapScan::Blocked;
        }
        gaps.push(sibling);
        current = sibling;
    }
    GapScan::Blocked
}

/// Border defect of a table, if any
pub fn detect_border_issue(tree: &XmlTree, table: NodeId) -> Option<TableIssue> {
    let borders = tree
        .child(table, "w:tblPr")
        .and_then(|pr| tree.child(pr, "w:tblBorders"));
    let Some(borders) = borders else {
        return Some(TableIssue::MissingBorders);
    };

    let has_side = |side: &str| {
        tree.child(borders, side).is_some()
            || BORDER_SIDE_ALIASES
                .iter()
                .any(|(name, alias)| *name == side && tree.child(borders, alias).is_some())
    };
    if BORDER_SIDES.iter().all(|side| has_side(side)) {
        None
    } else {
        Some(TableIssue::IncompleteBorders)
    }
}

/// Whether the table can absorb the next one, given the gap limit
pub fn can_merge_next(tree: &XmlTree, table: NodeId, max_gap_paragraphs: usize) -> bool {
    match scan_gap_to_next_table(tree, table) {
        GapScan::NextTable { gaps, .. } => gaps.len() < max_gap_paragraphs,
        GapScan::Blocked => false,
    }
}

/// First row's cell texts, shortened for display
pub fn table_preview(tree: &XmlTree, table: NodeId) -> String {
    let Some(&first_row) = table_rows(tree, table).first() else {
        return String::from("(empty table)");
    };
    let text = row_cells(tree, first_row)
        .into_iter()
        .map(|cell| cell_text(tree, cell).split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(" | ");

    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() > PREVIEW_GRAPHEMES {
        format!("{}…", graphemes[..PREVIEW_GRAPHEMES - 1].concat())
    } else {
        text
    }
}

/// Inspect one table
pub fn analyze_table(tree: &XmlTree, table: NodeId, index: usize, config: &Config) -> TableInfo {
    let mut issues = Vec::new();

    let border_issue = detect_border_issue(tree, table);
    issues.extend(border_issue);

    let mergeable = can_merge_next(tree, table, config.repair.max_gap_paragraphs);
    if mergeable {
        issues.push(TableIssue::MergeableWithNext);
    }

    let role = classify_table(tree, table).role;
    debug!(index, role = role.label(), ?issues, "analyzed table");

    TableInfo {
        id: table,
        index,
        role,
        preview: table_preview(tree, table),
        options: config
            .defaults
            .options_for(border_issue.is_some(), mergeable),
        issues,
        can_merge_next: mergeable,
    }
}

/// Analyze every body-level table in document order
pub fn analyze_tables(tree: &XmlTree, config: &Config) -> AnalysisReport {
    let tables = body_tables(tree)
        .into_iter()
        .enumerate()
        .map(|(index, table)| analyze_table(tree, table, index, config))
        .collect();
    AnalysisReport { tables }
}
