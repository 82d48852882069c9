//! Goal-plan table synthesis
//!
//! Locates the goal-plan table, drops every row below its header and writes
//! three rows per selected goal: one per derived short-term target. Domain
//! and ordinal cells merge vertically over the whole domain; the long-term
//! goal cell merges over its own three rows.

pub mod goals;
pub mod short_goal;

use tracing::info;

use crate::document::models::{GoalColumn, GoalColumns, TableRole, TextFormatting, VerticalMerge};
use crate::document::parsing::formatting::{build_paragraph, build_run};
use crate::document::parsing::table::classify_table;
use crate::document::query::{
    CELL_ORDER, CELL_PROPERTY_ORDER, body_tables, row_cells, set_vertical_merge, table_rows,
};
use crate::document::tree::{NodeId, XmlTree};
use crate::error::{DocError, DocResult};

pub use goals::{DomainGroup, Goal, GoalSelection};
pub use short_goal::split_short_goals;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisSummary {
    pub domains: usize,
    pub goals: usize,
    pub rows: usize,
}

/// Width and span copied from a header cell into generated cells
#[derive(Debug, Clone, Default)]
struct CellTemplate {
    width: Option<(String, String)>,
    grid_span: Option<String>,
}

struct GoalTable {
    table: NodeId,
    header_row: usize,
    columns: GoalColumns,
}

/// Rewrite the first goal-plan table from the selection
pub fn synthesize_goal_table(
    tree: &mut XmlTree,
    selection: &GoalSelection,
    smart_splitting: bool,
) -> DocResult<SynthesisSummary> {
    let groups = selection.group_by_domain();
    if groups.is_empty() {
        return Err(DocError::structure("goal selection contains no goals"));
    }

    let GoalTable {
        table,
        header_row,
        columns,
    } = find_goal_table(tree)
        .ok_or_else(|| DocError::structure("no goal-plan table found in document"))?;

    for (kind, heading) in [
        (GoalColumn::Domain, "Lĩnh vực"),
        (GoalColumn::LongTerm, "Mục tiêu dài hạn"),
        (GoalColumn::ShortTerm, "Mục tiêu ngắn hạn"),
    ] {
        if !columns.has(kind) {
            return Err(DocError::structure(format!(
                "goal-plan table has no \"{heading}\" column"
            )));
        }
    }

    let rows = table_rows(tree, table);
    let templates = row_cells(tree, rows[header_row])
        .into_iter()
        .map(|cell| cell_template(tree, cell))
        .collect::<Vec<_>>();
    for &row in &rows[header_row + 1..] {
        tree.detach(row);
    }

    let mut summary = SynthesisSummary {
        domains: groups.len(),
        ..Default::default()
    };
    for group in &groups {
        for (goal_index, goal) in group.goals.iter().enumerate() {
            let short_goals = if smart_splitting {
                split_short_goals(&goal.text)
            } else {
                [goal.text.clone(), goal.text.clone(), goal.text.clone()]
            };
            for (step, short_goal) in short_goals.iter().enumerate() {
                let position = RowPosition {
                    domain_start: goal_index == 0 && step == 0,
                    goal_start: step == 0,
                };
                let labels = RowLabels {
                    domain: group.number,
                    goal: goal_index + 1,
                    step: step + 1,
                };
                let row = build_goal_row(
                    tree,
                    &columns,
                    &templates,
                    group,
                    goal,
                    short_goal,
                    labels,
                    position,
                );
                tree.append_child(table, row);
                summary.rows += 1;
            }
            summary.goals += 1;
        }
    }

    info!(
        domains = summary.domains,
        goals = summary.goals,
        rows = summary.rows,
        "synthesized goal-plan table"
    );
    Ok(summary)
}

fn find_goal_table(tree: &XmlTree) -> Option<GoalTable> {
    body_tables(tree).into_iter().find_map(|table| {
        let classified = classify_table(tree, table);
        match (classified.role, classified.header_row) {
            (TableRole::GoalPlan(columns), Some(header_row)) => Some(GoalTable {
                table,
                header_row,
                columns,
            }),
            _ => None,
        }
    })
}

fn cell_template(tree: &XmlTree, cell: NodeId) -> CellTemplate {
    let Some(tc_pr) = tree.child(cell, "w:tcPr") else {
        return CellTemplate::default();
    };
    let width = tree.child(tc_pr, "w:tcW").map(|w| {
        (
            tree.attr(w, "w:w").unwrap_or("0").to_string(),
            tree.attr(w, "w:type").unwrap_or("dxa").to_string(),
        )
    });
    let grid_span = tree
        .child(tc_pr, "w:gridSpan")
        .and_then(|s| tree.attr(s, "w:val"))
        .map(str::to_string);
    CellTemplate { width, grid_span }
}

#[derive(Debug, Clone, Copy)]
struct RowPosition {
    domain_start: bool,
    goal_start: bool,
}

#[derive(Debug, Clone, Copy)]
struct RowLabels {
    domain: usize,
    goal: usize,
    step: usize,
}

#[allow(clippy::too_many_arguments)]
fn build_goal_row(
    tree: &mut XmlTree,
    columns: &GoalColumns,
    templates: &[CellTemplate],
    group: &DomainGroup<'_>,
    goal: &Goal,
    short_goal: &str,
    labels: RowLabels,
    position: RowPosition,
) -> NodeId {
    let has_ordinal = columns.has(GoalColumn::Ordinal);
    let row = tree.create_element("w:tr");
    let domain_merge = if position.domain_start {
        VerticalMerge::Restart
    } else {
        VerticalMerge::Continue
    };
    let goal_merge = if position.goal_start {
        VerticalMerge::Restart
    } else {
        VerticalMerge::Continue
    };

    for (index, kind) in columns.columns.iter().enumerate() {
        let template = templates.get(index).cloned().unwrap_or_default();
        let cell = build_cell(tree, &template);

        match kind {
            GoalColumn::Ordinal => {
                set_vertical_merge(tree, cell, Some(domain_merge));
                if position.domain_start {
                    write_cell_text(tree, cell, &[(labels.domain.to_string(), false)]);
                }
            }
            GoalColumn::Domain => {
                set_vertical_merge(tree, cell, Some(domain_merge));
                if position.domain_start {
                    let text = if has_ordinal {
                        group.name.to_string()
                    } else {
                        format!("{}. {}", labels.domain, group.name)
                    };
                    write_cell_text(tree, cell, &[(text, false)]);
                }
            }
            GoalColumn::LongTerm => {
                set_vertical_merge(tree, cell, Some(goal_merge));
                if position.goal_start {
                    let heading = format!("{}.{} {}", labels.domain, labels.goal, goal.text);
                    let mut parts = vec![(heading, false)];
                    let suffix = goal.suffix.as_deref().map(str::trim);
                    if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
                        let suffix = if suffix.starts_with('(') {
                            format!(" {suffix}")
                        } else {
                            format!(" ({suffix})")
                        };
                        parts.push((suffix, true));
                    }
                    write_cell_text(tree, cell, &parts);
                }
            }
            GoalColumn::ShortTerm => {
                let text = format!(
                    "{}.{}.{} {}",
                    labels.domain, labels.goal, labels.step, short_goal
                );
                write_cell_text(tree, cell, &[(text, false)]);
            }
            GoalColumn::Other => {}
        }

        tree.append_child(row, cell);
    }
    row
}

/// A detached `w:tc` with the template's width and span and one empty paragraph
fn build_cell(tree: &mut XmlTree, template: &CellTemplate) -> NodeId {
    let cell = tree.create_element("w:tc");
    if template.width.is_some() || template.grid_span.is_some() {
        let tc_pr = tree.ensure_child(cell, "w:tcPr", CELL_ORDER);
        if let Some((width, kind)) = &template.width {
            let tc_w = tree.create_element_with(
                "w:tcW",
                &[("w:w", width.as_str()), ("w:type", kind.as_str())],
            );
            tree.insert_ordered(tc_pr, tc_w, CELL_PROPERTY_ORDER);
        }
        if let Some(span) = &template.grid_span {
            let grid_span = tree.create_element_with("w:gridSpan", &[("w:val", span.as_str())]);
            tree.insert_ordered(tc_pr, grid_span, CELL_PROPERTY_ORDER);
        }
    }
    let paragraph = build_paragraph(tree, None);
    tree.append_child(cell, paragraph);
    cell
}

fn write_cell_text(tree: &mut XmlTree, cell: NodeId, parts: &[(String, bool)]) {
    let Some(paragraph) = tree.child(cell, "w:p") else {
        return;
    };
    let bold = TextFormatting {
        bold: true,
        ..Default::default()
    };
    for (text, is_bold) in parts {
        let run = build_run(tree, text, is_bold.then_some(&bold));
        tree.append_child(paragraph, run);
    }
}
