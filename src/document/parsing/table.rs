//! Table classification
//!
//! A table's role is decided from its header row: skill-result tables open
//! with a "Kỹ năng" column followed by one column per assessment level,
//! goal-plan tables carry the domain / long-term / short-term goal headings.
//! Anything else is generic and left alone by the fill and synthesis passes.

use once_cell::sync::Lazy;
use regex::Regex;

use super::super::models::*;
use super::super::normalize::normalize_text;
use super::super::query::{cell_grid_columns, row_cells, table_rows};
use super::super::tree::{NodeId, XmlTree};
use super::formatting::cell_text;

/// Only the first rows are inspected for a header
const HEADER_SCAN_ROWS: usize = 5;

const SKILL_MARKER: &str = "ky nang";
const GOAL_MARKERS: [&str; 3] = ["linh vuc", "muc tieu dai han", "muc tieu ngan han"];

// Matched against normalized text, so "Mức độ 2" arrives as "muc do 2"
static LEVEL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"muc(?:\s+do)?\s*(\d+)").expect("level pattern"));

/// Classify a table by scanning its first rows for a header
pub fn classify_table(tree: &XmlTree, table: NodeId) -> ClassifiedTable {
    let rows = table_rows(tree, table);

    for (index, &row) in rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let cells = row_cells(tree, row);
        let Some(&first) = cells.first() else {
            continue;
        };

        let row_text = normalize_text(
            &cells
                .iter()
                .map(|&c| cell_text(tree, c))
                .collect::<Vec<_>>()
                .join(" "),
        );
        if GOAL_MARKERS.iter().all(|marker| row_text.contains(marker)) {
            return ClassifiedTable {
                role: TableRole::GoalPlan(goal_columns(tree, row)),
                header_row: Some(index),
            };
        }

        if normalize_text(&cell_text(tree, first)).contains(SKILL_MARKER) {
            return ClassifiedTable {
                role: TableRole::SkillResult(level_columns(tree, row)),
                header_row: Some(index),
            };
        }
    }

    ClassifiedTable {
        role: TableRole::Generic,
        header_row: None,
    }
}

/// Map each "Mức N" header cell after the first to its grid column
fn level_columns(tree: &XmlTree, header: NodeId) -> LevelColumns {
    let mut columns = LevelColumns::new();
    for (column, cell) in cell_grid_columns(tree, header).into_iter().skip(1) {
        if let Some(level) = parse_level_marker(&cell_text(tree, cell)) {
            columns.entry(level).or_insert(column);
        }
    }
    columns
}

/// Extract the level number from a header such as "Mức 2"
pub(crate) fn parse_level_marker(text: &str) -> Option<u8> {
    let normalized = normalize_text(text);
    let caps = LEVEL_PATTERN.captures(&normalized)?;
    let digits = caps.get(1)?.as_str();

    // Levels are single digits; "Mức 12" is a header typo for "Mức 1"
    let level = match digits.parse::<u32>().ok()? {
        value if value >= 10 => digits[..1].parse::<u8>().ok()?,
        value => value as u8,
    };
    Some(level)
}

fn goal_columns(tree: &XmlTree, header: NodeId) -> GoalColumns {
    let columns = row_cells(tree, header)
        .into_iter()
        .map(|cell| goal_column_kind(&normalize_text(&cell_text(tree, cell))))
        .collect();
    GoalColumns { columns }
}

fn goal_column_kind(text: &str) -> GoalColumn {
    if is_ordinal_marker(text) {
        GoalColumn::Ordinal
    } else if text.contains("linh vuc") {
        GoalColumn::Domain
    } else if text.contains("ngan han") {
        GoalColumn::ShortTerm
    } else if text.contains("dai han") {
        GoalColumn::LongTerm
    } else {
        GoalColumn::Other
    }
}

fn is_ordinal_marker(text: &str) -> bool {
    matches!(text, "stt" | "tt" | "no" | "no." | "#")
        || text.starts_with("stt")
        || text.starts_with("no.")
}
