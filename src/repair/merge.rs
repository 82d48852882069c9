//! Physical merging of adjacent tables
//!
//! Merging moves every row of the following table into the current one and
//! drops the empty paragraphs that separated them. Tables are addressed by
//! [`NodeId`], so earlier merges never invalidate later ones.

use tracing::{debug, warn};

use crate::document::models::VerticalMerge;
use crate::document::query::{row_cells, set_vertical_merge, table_rows, vertical_merge};
use crate::document::tree::{NodeId, XmlTree};
use crate::document::TableInfo;

use super::analyze::{GapScan, scan_gap_to_next_table};

/// Merge `table` with the next table if only empty paragraphs separate them
///
/// Returns `false` without touching the tree when content now sits between
/// the two tables or no table follows.
pub fn merge_with_next(tree: &mut XmlTree, table: NodeId) -> bool {
    let GapScan::NextTable { next, gaps } = scan_gap_to_next_table(tree, table) else {
        return false;
    };

    let rows = table_rows(tree, next);
    if let Some(&first) = rows.first() {
        // A chain cannot continue across the old table boundary
        for cell in row_cells(tree, first) {
            if vertical_merge(tree, cell) == Some(VerticalMerge::Continue) {
                set_vertical_merge(tree, cell, Some(VerticalMerge::Restart));
            }
        }
    }

    for row in rows {
        tree.append_child(table, row);
    }
    for gap in gaps {
        tree.detach(gap);
    }
    tree.detach(next);
    true
}

/// Apply every requested merge, from the last table to the first
///
/// Returns the number of merges performed.
pub fn merge_flagged(tree: &mut XmlTree, infos: &[TableInfo]) -> usize {
    let mut flagged: Vec<&TableInfo> = infos.iter().filter(|i| i.options.merge_next).collect();
    flagged.sort_by(|a, b| b.index.cmp(&a.index));

    let mut merges = 0;
    for info in flagged {
        if !tree.is_attached(info.id) {
            warn!(table = info.index + 1, "table no longer in document, merge skipped");
            continue;
        }
        if merge_with_next(tree, info.id) {
            debug!(table = info.index + 1, "merged with next table");
            merges += 1;
        } else {
            warn!(
                table = info.index + 1,
                "next table is no longer adjacent, merge skipped"
            );
        }
    }
    merges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::document::query::body_tables;
    use crate::repair::analyze::analyze_tables;

    fn table(rows: usize, tag: &str) -> String {
        let rows: String = (0..rows)
            .map(|i| format!("<w:tr><w:tc><w:p><w:r><w:t>{tag}{i}</w:t></w:r></w:p></w:tc></w:tr>"))
            .collect();
        format!("<w:tbl><w:tblPr/>{rows}</w:tbl>")
    }

    fn doc(body: &str) -> XmlTree {
        XmlTree::parse(&format!("<w:document><w:body>{body}</w:body></w:document>")).unwrap()
    }

    #[test]
    fn test_merge_conserves_rows_and_drops_gaps() {
        for gap in 0..5 {
            let body = format!("{}{}{}", table(2, "a"), "<w:p/>".repeat(gap), table(3, "b"));
            let mut tree = doc(&body);
            let first = body_tables(&tree)[0];

            assert!(merge_with_next(&mut tree, first));
            let tables = body_tables(&tree);
            assert_eq!(tables, vec![first]);
            assert_eq!(table_rows(&tree, first).len(), 5);
            assert!(tree.next_element_sibling(first).is_none(), "gap of {gap} left behind");
        }
    }

    #[test]
    fn test_merge_skips_when_content_intervenes() {
        let body = format!(
            "{}<w:p><w:r><w:t>note</w:t></w:r></w:p>{}",
            table(1, "a"),
            table(1, "b")
        );
        let mut tree = doc(&body);
        let before = tree.serialize();
        let first = body_tables(&tree)[0];
        assert!(!merge_with_next(&mut tree, first));
        assert_eq!(tree.serialize(), before);
    }

    #[test]
    fn test_continue_cells_restart_after_merge() {
        let second =
            r#"<w:tbl><w:tr><w:tc><w:tcPr><w:vMerge/></w:tcPr><w:p/></w:tc></w:tr></w:tbl>"#;
        let mut tree = doc(&format!("{}<w:p/>{second}", table(1, "a")));
        let first = body_tables(&tree)[0];
        assert!(merge_with_next(&mut tree, first));
        let moved = table_rows(&tree, first)[1];
        let cell = row_cells(&tree, moved)[0];
        assert_eq!(vertical_merge(&tree, cell), Some(VerticalMerge::Restart));
    }

    #[test]
    fn test_chain_of_merges_by_identity() {
        let body = format!(
            "{}<w:p/>{}<w:p/><w:p/>{}",
            table(1, "a"),
            table(2, "b"),
            table(3, "c")
        );
        let mut tree = doc(&body);
        let report = analyze_tables(&tree, &Config::default());
        assert!(report.tables[0].options.merge_next);
        assert!(report.tables[1].options.merge_next);

        assert_eq!(merge_flagged(&mut tree, &report.tables), 2);
        let tables = body_tables(&tree);
        assert_eq!(tables, vec![report.tables[0].id]);
        assert_eq!(table_rows(&tree, tables[0]).len(), 6);
    }
}
