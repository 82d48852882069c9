//! Navigation over WordprocessingML structures
//!
//! Tables, rows, cells and paragraphs are plain [`NodeId`]s; these helpers
//! know which element names make up each level and where property elements
//! must sit inside their containers.

use super::models::VerticalMerge;
use super::tree::{NodeId, XmlTree};

/// Element order inside `w:tblPr`
pub const TABLE_PROPERTY_ORDER: &[&str] = &[
    "w:tblStyle",
    "w:tblpPr",
    "w:tblOverlap",
    "w:bidiVisual",
    "w:tblStyleRowBandSize",
    "w:tblStyleColBandSize",
    "w:tblW",
    "w:jc",
    "w:tblCellSpacing",
    "w:tblInd",
    "w:tblBorders",
    "w:shd",
    "w:tblLayout",
    "w:tblCellMar",
    "w:tblLook",
    "w:tblCaption",
    "w:tblDescription",
    "w:tblPrChange",
];

/// Element order inside `w:tbl`
pub const TABLE_ORDER: &[&str] = &["w:tblPr", "w:tblGrid", "w:tr"];

/// Element order inside `w:tc`
pub const CELL_ORDER: &[&str] = &["w:tcPr", "w:p", "w:tbl"];

/// Element order inside `w:tcPr`
pub const CELL_PROPERTY_ORDER: &[&str] = &[
    "w:cnfStyle",
    "w:tcW",
    "w:gridSpan",
    "w:hMerge",
    "w:vMerge",
    "w:tcBorders",
    "w:shd",
    "w:noWrap",
    "w:tcMar",
    "w:textDirection",
    "w:tcFitText",
    "w:vAlign",
    "w:hideMark",
];

/// Element order inside `w:pPr`
pub const PARAGRAPH_PROPERTY_ORDER: &[&str] = &[
    "w:pStyle",
    "w:keepNext",
    "w:keepLines",
    "w:pageBreakBefore",
    "w:framePr",
    "w:widowControl",
    "w:numPr",
    "w:suppressLineNumbers",
    "w:pBdr",
    "w:shd",
    "w:tabs",
    "w:suppressAutoHyphens",
    "w:kinsoku",
    "w:wordWrap",
    "w:overflowPunct",
    "w:topLinePunct",
    "w:autoSpaceDE",
    "w:autoSpaceDN",
    "w:bidi",
    "w:adjustRightInd",
    "w:snapToGrid",
    "w:spacing",
    "w:ind",
    "w:contextualSpacing",
    "w:mirrorIndents",
    "w:suppressOverlap",
    "w:jc",
    "w:textDirection",
    "w:textAlignment",
    "w:textboxTightWrap",
    "w:outlineLvl",
    "w:divId",
    "w:cnfStyle",
    "w:rPr",
    "w:sectPr",
    "w:pPrChange",
];

/// Element order inside `w:rPr`
pub const RUN_PROPERTY_ORDER: &[&str] = &[
    "w:rStyle",
    "w:rFonts",
    "w:b",
    "w:bCs",
    "w:i",
    "w:iCs",
    "w:caps",
    "w:smallCaps",
    "w:strike",
    "w:dstrike",
    "w:outline",
    "w:shadow",
    "w:emboss",
    "w:imprint",
    "w:noProof",
    "w:snapToGrid",
    "w:vanish",
    "w:webHidden",
    "w:color",
    "w:spacing",
    "w:w",
    "w:kern",
    "w:position",
    "w:sz",
    "w:szCs",
    "w:highlight",
    "w:u",
    "w:effect",
    "w:bdr",
    "w:shd",
    "w:fitText",
    "w:vertAlign",
    "w:rtl",
    "w:cs",
    "w:em",
    "w:lang",
    "w:eastAsianLayout",
    "w:specVanish",
    "w:oMath",
];

/// Element order inside `w:p`
pub const PARAGRAPH_ORDER: &[&str] = &["w:pPr"];

/// Element order inside `w:r`
pub const RUN_ORDER: &[&str] = &["w:rPr"];

/// `w:body` of the main document
pub fn body(tree: &XmlTree) -> Option<NodeId> {
    let document = tree.document_element()?;
    tree.child(document, "w:body")
}

/// Tables that are direct children of the body, in document order
///
/// Tables nested inside cells are never classified, merged or repaired on
/// their own.
pub fn body_tables(tree: &XmlTree) -> Vec<NodeId> {
    body(tree)
        .map(|b| tree.children_named(b, "w:tbl"))
        .unwrap_or_default()
}

/// Every paragraph in the body, including those inside table cells
pub fn all_paragraphs(tree: &XmlTree) -> Vec<NodeId> {
    body(tree)
        .map(|b| tree.descendants(b, "w:p"))
        .unwrap_or_default()
}

pub fn table_rows(tree: &XmlTree, table: NodeId) -> Vec<NodeId> {
    tree.children_named(table, "w:tr")
}

pub fn row_cells(tree: &XmlTree, row: NodeId) -> Vec<NodeId> {
    tree.children_named(row, "w:tc")
}

pub fn cell_paragraphs(tree: &XmlTree, cell: NodeId) -> Vec<NodeId> {
    tree.children_named(cell, "w:p")
}

/// `w:val` of a property child such as `<w:jc w:val="center"/>`
pub fn property_val<'a>(tree: &'a XmlTree, props: NodeId, name: &str) -> Option<&'a str> {
    tree.child(props, name).and_then(|p| tree.attr(p, "w:val"))
}

pub fn grid_span(tree: &XmlTree, cell: NodeId) -> usize {
    tree.child(cell, "w:tcPr")
        .and_then(|pr| property_val(tree, pr, "w:gridSpan"))
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

/// Grid column at which each cell of a row starts
pub fn cell_grid_columns(tree: &XmlTree, row: NodeId) -> Vec<(usize, NodeId)> {
    let mut column = 0;
    row_cells(tree, row)
        .into_iter()
        .map(|cell| {
            let start = column;
            column += grid_span(tree, cell);
            (start, cell)
        })
        .collect()
}

/// Cell whose span covers the given grid column
pub fn cell_at_grid_column(tree: &XmlTree, row: NodeId, column: usize) -> Option<NodeId> {
    let mut start = 0;
    for cell in row_cells(tree, row) {
        let span = grid_span(tree, cell);
        if column >= start && column < start + span {
            return Some(cell);
        }
        start += span;
    }
    None
}

pub fn vertical_merge(tree: &XmlTree, cell: NodeId) -> Option<VerticalMerge> {
    let tc_pr = tree.child(cell, "w:tcPr")?;
    let v_merge = tree.child(tc_pr, "w:vMerge")?;
    match tree.attr(v_merge, "w:val") {
        Some("restart") => Some(VerticalMerge::Restart),
        _ => Some(VerticalMerge::Continue),
    }
}

pub fn set_vertical_merge(tree: &mut XmlTree, cell: NodeId, merge: Option<VerticalMerge>) {
    let tc_pr = tree.ensure_child(cell, "w:tcPr", CELL_ORDER);
    match merge {
        None => {
            for old in tree.children_named(tc_pr, "w:vMerge") {
                tree.detach(old);
            }
        }
        Some(kind) => {
            let v_merge = tree.ensure_child(tc_pr, "w:vMerge", CELL_PROPERTY_ORDER);
            match kind {
                VerticalMerge::Restart => tree.set_attr(v_merge, "w:val", "restart"),
                VerticalMerge::Continue => {
                    tree.remove_attr(v_merge, "w:val");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<w:document><w:body>
<w:tbl><w:tr><w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr><w:p/></w:tc><w:tc><w:tcPr><w:vMerge w:val="restart"/></w:tcPr><w:p/></w:tc></w:tr>
<w:tr><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc><w:tc><w:tcPr><w:vMerge/></w:tcPr><w:p/></w:tc></w:tr></w:tbl>
<w:p/></w:body></w:document>"#;

    #[test]
    fn test_grid_columns_follow_spans() {
        let tree = XmlTree::parse(DOC).unwrap();
        let table = body_tables(&tree)[0];
        let rows = table_rows(&tree, table);
        let starts: Vec<usize> = cell_grid_columns(&tree, rows[0])
            .into_iter()
            .map(|(c, _)| c)
            .collect();
        assert_eq!(starts, vec![0, 2]);
        let second_row_cells = row_cells(&tree, rows[1]);
        assert_eq!(cell_at_grid_column(&tree, rows[1], 2), Some(second_row_cells[2]));
        let first_row_cells = row_cells(&tree, rows[0]);
        assert_eq!(cell_at_grid_column(&tree, rows[0], 1), Some(first_row_cells[0]));
    }

    #[test]
    fn test_vertical_merge_read_write() {
        let mut tree = XmlTree::parse(DOC).unwrap();
        let table = body_tables(&tree)[0];
        let rows = table_rows(&tree, table);
        let top = row_cells(&tree, rows[0])[1];
        let bottom = row_cells(&tree, rows[1])[2];
        assert_eq!(vertical_merge(&tree, top), Some(VerticalMerge::Restart));
        assert_eq!(vertical_merge(&tree, bottom), Some(VerticalMerge::Continue));

        set_vertical_merge(&mut tree, bottom, Some(VerticalMerge::Restart));
        assert_eq!(vertical_merge(&tree, bottom), Some(VerticalMerge::Restart));
        set_vertical_merge(&mut tree, bottom, None);
        assert_eq!(vertical_merge(&tree, bottom), None);
    }

    #[test]
    fn test_all_paragraphs_includes_cells() {
        let tree = XmlTree::parse(DOC).unwrap();
        assert_eq!(all_paragraphs(&tree).len(), 6);
    }
}
