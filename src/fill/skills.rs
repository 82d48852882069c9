use tracing::debug;

use crate::document::models::LevelColumns;
use crate::document::normalize::normalize_text;
use crate::document::parsing::formatting::{
    blank_run, build_paragraph, build_run, cell_text, paragraph_runs, set_run_text,
};
use crate::document::parsing::table::classify_table;
use crate::document::query::{
    cell_at_grid_column, cell_grid_columns, cell_paragraphs, grid_span, row_cells, table_rows,
};
use crate::document::tree::{NodeId, XmlTree};
use crate::extraction::SkillResult;

/// Write per-level results into the rows of a skill-result table
///
/// Each body row is matched to the first result whose normalized skill name
/// equals or prefixes the row's first cell. Returns the number of cells
/// written.
pub fn fill_skill_results(
    tree: &mut XmlTree,
    table: NodeId,
    columns: &LevelColumns,
    results: &[SkillResult],
    levels: &[u8],
) -> usize {
    let targets: Vec<(u8, usize)> = levels
        .iter()
        .filter_map(|level| columns.get(level).map(|&column| (*level, column)))
        .collect();
    let Some(widest) = targets.iter().map(|(_, column)| *column).max() else {
        debug!(?levels, "no selected level has a column in this table");
        return 0;
    };

    let names: Vec<(String, &SkillResult)> = results
        .iter()
        .map(|r| (normalize_text(&r.name), r))
        .filter(|(name, _)| !name.is_empty())
        .collect();

    let body_start = classify_table(tree, table).header_row.map_or(0, |h| h + 1);
    let mut written = 0;
    for row in table_rows(tree, table).into_iter().skip(body_start) {
        if row_width(tree, row) <= widest {
            debug!("row narrower than the level columns, skipped");
            continue;
        }
        let Some(&first) = row_cells(tree, row).first() else {
            continue;
        };
        let label = normalize_text(&cell_text(tree, first));
        if label.is_empty() {
            continue;
        }
        let Some((_, result)) = names
            .iter()
            .find(|(name, _)| label.starts_with(name.as_str()))
        else {
            continue;
        };

        for &(level, column) in &targets {
            let (Some(value), Some(cell)) = (
                result.values.get(&level),
                cell_at_grid_column(tree, row, column),
            ) else {
                continue;
            };
            write_cell_value(tree, cell, value);
            written += 1;
        }
    }
    written
}

fn row_width(tree: &XmlTree, row: NodeId) -> usize {
    cell_grid_columns(tree, row)
        .last()
        .map_or(0, |&(start, cell)| start + grid_span(tree, cell))
}

/// Put `value` in the first run of the first paragraph, emptying the rest
fn write_cell_value(tree: &mut XmlTree, cell: NodeId, value: &str) {
    let paragraphs = cell_paragraphs(tree, cell);
    let first = match paragraphs.first() {
        Some(&p) => p,
        None => {
            let p = build_paragraph(tree, None);
            tree.append_child(cell, p);
            p
        }
    };

    let runs = paragraph_runs(tree, first);
    match runs.split_first() {
        Some((&run, rest)) => {
            set_run_text(tree, run, value);
            for &other in rest {
                blank_run(tree, other);
            }
        }
        None => {
            let run = build_run(tree, value, None);
            tree.append_child(first, run);
        }
    }

    for &paragraph in paragraphs.iter().skip(1) {
        for run in paragraph_runs(tree, paragraph) {
            blank_run(tree, run);
        }
    }
}
