//! Option-gated repair stages
//!
//! Each stage mutates one table and its descendants. Stages always run in
//! the order borders → autofit → spacing → align; alignment reads the
//! autofit option to decide whether per-cell widths must be cleared.
//! A stage that finds a property subtree missing creates it.

use tracing::{debug, info, warn};

use crate::config::RepairSettings;
use crate::document::parsing::formatting::{
    build_paragraph, ensure_paragraph_properties, paragraph_text,
};
use crate::document::query::{
    CELL_ORDER, CELL_PROPERTY_ORDER, PARAGRAPH_PROPERTY_ORDER, TABLE_ORDER,
    TABLE_PROPERTY_ORDER, table_rows,
};
use crate::document::tree::{NodeId, XmlTree};
use crate::document::{RepairOptions, RepairSummary, TableInfo, TextAlignment};

use super::analyze::{BORDER_SIDES, GapScan, scan_gap_to_next_table};
use super::merge::merge_flagged;

const BULLET_MARKERS: [char; 3] = ['-', '+', '•'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStage {
    Borders,
    Autofit,
    Spacing,
    Align,
}

impl RepairStage {
    pub const ORDER: [RepairStage; 4] = [
        RepairStage::Borders,
        RepairStage::Autofit,
        RepairStage::Spacing,
        RepairStage::Align,
    ];

    pub fn enabled(self, options: &RepairOptions) -> bool {
        match self {
            RepairStage::Borders => options.fix_borders,
            RepairStage::Autofit => options.autofit,
            RepairStage::Spacing => options.fix_spacing,
            RepairStage::Align => options.fix_align,
        }
    }

    /// Run the stage; returns whether a table gap was normalized
    pub fn apply(
        self,
        tree: &mut XmlTree,
        table: NodeId,
        options: &RepairOptions,
        settings: &RepairSettings,
    ) -> bool {
        match self {
            RepairStage::Borders => {
                fix_borders(tree, table, settings);
                false
            }
            RepairStage::Autofit => {
                apply_autofit(tree, table, settings);
                false
            }
            RepairStage::Spacing => {
                set_cell_margins(tree, table, settings);
                !options.merge_next && normalize_gap_after(tree, table)
            }
            RepairStage::Align => {
                fix_alignment(tree, table, options, settings);
                false
            }
        }
    }
}

fn table_properties(tree: &mut XmlTree, table: NodeId) -> NodeId {
    if tree.child(table, "w:tblPr").is_none() {
        warn!("table has no w:tblPr, creating one");
    }
    tree.ensure_child(table, "w:tblPr", TABLE_ORDER)
}

/// Replace the border definition with six uniform thin single lines
pub fn fix_borders(tree: &mut XmlTree, table: NodeId, settings: &RepairSettings) {
    let tbl_pr = table_properties(tree, table);
    let size = settings.border_size.to_string();

    let borders = tree.create_element("w:tblBorders");
    for side in BORDER_SIDES {
        let edge = tree.create_element_with(
            side,
            &[
                ("w:val", "single"),
                ("w:sz", size.as_str()),
                ("w:space", "0"),
                ("w:color", settings.border_color.as_str()),
            ],
        );
        tree.append_child(borders, edge);
    }
    tree.replace_child(tbl_pr, borders, TABLE_PROPERTY_ORDER);
}

/// Percentage width, centred, with layout hints removed
pub fn apply_autofit(tree: &mut XmlTree, table: NodeId, settings: &RepairSettings) {
    let tbl_pr = table_properties(tree, table);

    // Percentages are written in fiftieths of a percent
    let width = (settings.table_width_pct * 50).to_string();
    let tbl_w = tree.create_element_with("w:tblW", &[("w:w", width.as_str()), ("w:type", "pct")]);
    tree.replace_child(tbl_pr, tbl_w, TABLE_PROPERTY_ORDER);

    let jc = tree.create_element_with("w:jc", &[("w:val", TextAlignment::Center.as_wml())]);
    tree.replace_child(tbl_pr, jc, TABLE_PROPERTY_ORDER);

    for layout in tree.children_named(tbl_pr, "w:tblLayout") {
        tree.detach(layout);
    }
}

/// Fixed interior cell margins
pub fn set_cell_margins(tree: &mut XmlTree, table: NodeId, settings: &RepairSettings) {
    let tbl_pr = table_properties(tree, table);
    let vertical = settings.cell_margin_vertical.to_string();
    let horizontal = settings.cell_margin_horizontal.to_string();

    let margins = tree.create_element("w:tblCellMar");
    for (side, value) in [
        ("w:top", &vertical),
        ("w:left", &horizontal),
        ("w:bottom", &vertical),
        ("w:right", &horizontal),
    ] {
        let edge = tree.create_element_with(side, &[("w:w", value.as_str()), ("w:type", "dxa")]);
        tree.append_child(margins, edge);
    }
    tree.replace_child(tbl_pr, margins, TABLE_PROPERTY_ORDER);
}

/// Leave exactly one empty paragraph between this table and the next
///
/// Does nothing when content or no table follows. Returns whether the gap
/// was changed.
pub fn normalize_gap_after(tree: &mut XmlTree, table: NodeId) -> bool {
    let GapScan::NextTable { gaps, .. } = scan_gap_to_next_table(tree, table) else {
        return false;
    };
    match gaps.len() {
        0 => {
            let spacer = build_paragraph(tree, None);
            tree.insert_after(table, spacer);
            true
        }
        1 => false,
        _ => {
            for extra in gaps.into_iter().skip(1) {
                tree.detach(extra);
            }
            true
        }
    }
}

fn is_bullet_text(text: &str) -> bool {
    text.trim_start().starts_with(BULLET_MARKERS)
}

/// Left-align every cell paragraph and hang bullet lines under their marker
pub fn fix_alignment(
    tree: &mut XmlTree,
    table: NodeId,
    options: &RepairOptions,
    settings: &RepairSettings,
) {
    let hanging = settings.hanging_indent.to_string();
    let spacing = settings.paragraph_spacing.to_string();
    let mut created_p_pr = 0;

    for paragraph in tree.descendants(table, "w:p") {
        let bullet = is_bullet_text(&paragraph_text(tree, paragraph));
        if tree.child(paragraph, "w:pPr").is_none() {
            created_p_pr += 1;
        }
        let p_pr = ensure_paragraph_properties(tree, paragraph);

        for ind in tree.children_named(p_pr, "w:ind") {
            tree.detach(ind);
        }
        if bullet {
            let ind = tree.create_element_with(
                "w:ind",
                &[("w:left", hanging.as_str()), ("w:hanging", hanging.as_str())],
            );
            tree.insert_ordered(p_pr, ind, PARAGRAPH_PROPERTY_ORDER);
        }

        let jc = tree.create_element_with("w:jc", &[("w:val", TextAlignment::Left.as_wml())]);
        tree.replace_child(p_pr, jc, PARAGRAPH_PROPERTY_ORDER);

        if options.fix_spacing {
            let spacing_el = tree.ensure_child(p_pr, "w:spacing", PARAGRAPH_PROPERTY_ORDER);
            tree.set_attr(spacing_el, "w:before", &spacing);
            tree.set_attr(spacing_el, "w:after", &spacing);
        }
    }

    let mut created_tc_pr = 0;
    if options.autofit {
        for cell in tree.descendants(table, "w:tc") {
            if tree.child(cell, "w:tcPr").is_none() {
                created_tc_pr += 1;
            }
            let tc_pr = tree.ensure_child(cell, "w:tcPr", CELL_ORDER);
            let width = tree.create_element_with("w:tcW", &[("w:w", "0"), ("w:type", "auto")]);
            tree.replace_child(tc_pr, width, CELL_PROPERTY_ORDER);
        }
    }

    if created_p_pr + created_tc_pr > 0 {
        warn!(
            paragraphs = created_p_pr,
            cells = created_tc_pr,
            "created missing paragraph and cell properties"
        );
    }
}

/// Run every enabled stage on one table; returns whether a gap was normalized
pub fn repair_table(
    tree: &mut XmlTree,
    table: NodeId,
    options: &RepairOptions,
    settings: &RepairSettings,
) -> bool {
    if !tree.is(table, "w:tbl") || table_rows(tree, table).is_empty() {
        warn!("skipping repair of a node that is not a table with rows");
        return false;
    }

    let mut gap_normalized = false;
    for stage in RepairStage::ORDER {
        if stage.enabled(options) {
            debug!(?stage, "applying repair stage");
            gap_normalized |= stage.apply(tree, table, options, settings);
        }
    }
    gap_normalized
}

/// Merge flagged tables, then repair every surviving table
pub fn apply_repairs(
    tree: &mut XmlTree,
    infos: &[TableInfo],
    settings: &RepairSettings,
) -> RepairSummary {
    let mut summary = RepairSummary {
        merges: merge_flagged(tree, infos),
        ..RepairSummary::default()
    };

    for info in infos {
        if !tree.is_attached(info.id) {
            debug!(table = info.index + 1, "absorbed by merge");
            continue;
        }
        if table_rows(tree, info.id).is_empty() {
            let message = format!("table {} has no rows, left unchanged", info.index + 1);
            warn!("{message}");
            summary.warnings.push(message);
            continue;
        }
        // merge_next is consumed by now; the gap after a survivor is its own
        let options = RepairOptions {
            merge_next: false,
            ..info.options
        };
        if repair_table(tree, info.id, &options, settings) {
            summary.gaps_normalized += 1;
        }
        summary.tables_repaired += 1;
    }

    info!(
        tables = summary.tables_repaired,
        merges = summary.merges,
        gaps = summary.gaps_normalized,
        "repair pass complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::query::body_tables;
    use crate::repair::analyze::detect_border_issue;

    fn doc(body: &str) -> XmlTree {
        XmlTree::parse(&format!("<w:document><w:body>{body}</w:body></w:document>")).unwrap()
    }

    fn simple_table(props: &str) -> String {
        format!(
            "<w:tbl>{props}<w:tr><w:tc><w:p><w:r><w:t>x</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"
        )
    }

    fn only(options: impl FnOnce(&mut RepairOptions)) -> RepairOptions {
        let mut opts = RepairOptions {
            fix_borders: false,
            autofit: false,
            fix_spacing: false,
            fix_align: false,
            merge_next: false,
        };
        options(&mut opts);
        opts
    }

    #[test]
    fn test_fix_borders_is_idempotent() {
        let mut tree = doc(&simple_table(
            r#"<w:tblPr><w:tblStyle w:val="Grid"/><w:tblBorders><w:top w:val="double"/></w:tblBorders><w:tblLook/></w:tblPr>"#,
        ));
        let table = body_tables(&tree)[0];
        let settings = RepairSettings::default();

        fix_borders(&mut tree, table, &settings);
        let once = tree.serialize();
        fix_borders(&mut tree, table, &settings);
        assert_eq!(tree.serialize(), once);
        assert_eq!(detect_border_issue(&tree, table), None);
        assert!(once.contains(
            r#"<w:tblStyle w:val="Grid"/><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#
        ));
        assert!(once.contains("</w:tblBorders><w:tblLook/>"));
    }

    #[test]
    fn test_missing_table_properties_are_created() {
        let mut tree = doc(&simple_table(""));
        let table = body_tables(&tree)[0];
        repair_table(&mut tree, table, &RepairOptions::default(), &RepairSettings::default());
        let out = tree.serialize();
        assert!(out.contains(
            r#"<w:tbl><w:tblPr><w:tblW w:w="4250" w:type="pct"/><w:jc w:val="center"/><w:tblBorders>"#
        ));
        assert!(out.contains(
            r#"<w:tblCellMar><w:top w:w="40" w:type="dxa"/><w:left w:w="108" w:type="dxa"/>"#
        ));
    }

    #[test]
    fn test_autofit_removes_layout() {
        let mut tree = doc(&simple_table(
            r#"<w:tblPr><w:tblW w:w="9000" w:type="dxa"/><w:tblLayout w:type="fixed"/></w:tblPr>"#,
        ));
        let table = body_tables(&tree)[0];
        apply_autofit(&mut tree, table, &RepairSettings::default());
        let out = tree.serialize();
        assert!(!out.contains("w:tblLayout"));
        assert!(out.contains(r#"<w:tblW w:w="4250" w:type="pct"/><w:jc w:val="center"/>"#));
    }

    #[test]
    fn test_gap_normalization() {
        for gap in [0, 1, 5] {
            let body = format!("{}{}{}", simple_table(""), "<w:p/>".repeat(gap), simple_table(""));
            let mut tree = doc(&body);
            let tables = body_tables(&tree);
            let opts = only(|o| o.fix_spacing = true);
            repair_table(&mut tree, tables[0], &opts, &RepairSettings::default());

            let GapScan::NextTable { next, gaps } = scan_gap_to_next_table(&tree, tables[0]) else {
                panic!("tables should stay adjacent");
            };
            assert_eq!(next, tables[1]);
            assert_eq!(gaps.len(), 1, "input gap of {gap}");
        }
    }

    #[test]
    fn test_gap_untouched_when_merge_requested() {
        let body = format!("{}<w:p/><w:p/>{}", simple_table(""), simple_table(""));
        let mut tree = doc(&body);
        let table = body_tables(&tree)[0];
        let opts = only(|o| {
            o.fix_spacing = true;
            o.merge_next = true;
        });
        assert!(!repair_table(&mut tree, table, &opts, &RepairSettings::default()));
        let GapScan::NextTable { gaps, .. } = scan_gap_to_next_table(&tree, table) else {
            panic!("expected next table");
        };
        assert_eq!(gaps.len(), 2);
    }

    #[test]
    fn test_alignment_hangs_bullets_only() {
        let body = r#"<w:tbl><w:tr><w:tc><w:tcPr><w:tcW w:w="3000" w:type="dxa"/></w:tcPr>
<w:p><w:pPr><w:ind w:left="720"/><w:jc w:val="both"/></w:pPr><w:r><w:t>- nói câu ngắn</w:t></w:r></w:p>
<w:p><w:r><w:t>Bình thường</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#;
        let mut tree = doc(body);
        let table = body_tables(&tree)[0];
        let opts = only(|o| {
            o.fix_align = true;
            o.fix_spacing = true;
            o.autofit = true;
        });
        fix_alignment(&mut tree, table, &opts, &RepairSettings::default());

        let paragraphs = tree.descendants(table, "w:p");
        let bullet = tree.serialize_node(paragraphs[0]);
        assert!(bullet.contains(
            r#"<w:spacing w:before="40" w:after="40"/><w:ind w:left="284" w:hanging="284"/><w:jc w:val="left"/>"#
        ));
        let plain = tree.serialize_node(paragraphs[1]);
        assert!(!plain.contains("w:ind"));
        assert!(plain.contains(r#"<w:jc w:val="left"/>"#));
        assert!(tree.serialize().contains(r#"<w:tcW w:w="0" w:type="auto"/>"#));
    }

    #[test]
    fn test_alignment_keeps_cell_widths_without_autofit() {
        let body =
            r#"<w:tbl><w:tr><w:tc><w:tcPr><w:tcW w:w="3000" w:type="dxa"/></w:tcPr><w:p/></w:tc></w:tr></w:tbl>"#;
        let mut tree = doc(body);
        let table = body_tables(&tree)[0];
        let opts = only(|o| o.fix_align = true);
        fix_alignment(&mut tree, table, &opts, &RepairSettings::default());
        let out = tree.serialize();
        assert!(out.contains(r#"<w:tcW w:w="3000" w:type="dxa"/>"#));
        assert!(!out.contains("w:spacing"));
    }

    #[test]
    fn test_table_without_rows_is_reported() {
        let mut tree = doc("<w:tbl><w:tblPr/></w:tbl><w:p/>");
        let table = body_tables(&tree)[0];
        let before = tree.serialize();
        let info = TableInfo {
            id: table,
            index: 0,
            role: crate::document::TableRole::Generic,
            preview: String::new(),
            issues: Vec::new(),
            can_merge_next: false,
            options: RepairOptions::default(),
        };

        let summary = apply_repairs(&mut tree, &[info], &RepairSettings::default());
        assert_eq!(summary.tables_repaired, 0);
        assert_eq!(summary.warnings, vec!["table 1 has no rows, left unchanged".to_string()]);
        assert_eq!(tree.serialize(), before);
    }

    #[test]
    fn test_non_table_is_a_no_op() {
        let mut tree = doc("<w:p/>");
        let body = crate::document::query::body(&tree).unwrap();
        let paragraph = tree.child(body, "w:p").unwrap();
        let before = tree.serialize();
        repair_table(&mut tree, paragraph, &RepairOptions::default(), &RepairSettings::default());
        assert_eq!(tree.serialize(), before);
    }
}
