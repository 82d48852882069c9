//! Text extraction and run formatting
//!
//! This module reads text and formatting out of paragraph and run elements
//! and rewrites run text in place. A run is never split: callers replace the
//! text of one run and empty the others, leaving every `w:rPr` where it was.

use super::super::models::TextFormatting;
use super::super::query::{PARAGRAPH_ORDER, RUN_ORDER, RUN_PROPERTY_ORDER, cell_paragraphs};
use super::super::tree::{NodeId, XmlTree};

/// Containers whose paragraphs belong to a drawing, not to the host paragraph
const SKIPPED_CONTAINERS: &[&str] = &["w:txbxContent", "w:del", "w:moveFrom"];

/// Run content that is not text but still makes a paragraph non-empty
const OPAQUE_CONTENT: &[&str] = &["w:drawing", "w:pict", "w:object", "w:fldSimple"];

/// Extract plain text from a paragraph, handling tabs and breaks
pub(crate) fn paragraph_text(tree: &XmlTree, paragraph: NodeId) -> String {
    let mut text = String::new();
    collect_run_text(tree, paragraph, &mut text);
    text
}

/// Extract text from a single run
pub(crate) fn run_text(tree: &XmlTree, run: NodeId) -> String {
    let mut text = String::new();
    collect_run_text(tree, run, &mut text);
    text
}

fn collect_run_text(tree: &XmlTree, node: NodeId, text: &mut String) {
    for child in tree.element_children(node) {
        match tree.name(child) {
            Some("w:t") => text.push_str(&tree.text_content(child)),
            Some("w:tab") => text.push('\t'),
            Some("w:br") | Some("w:cr") => text.push('\n'),
            Some(name) if SKIPPED_CONTAINERS.contains(&name) => {}
            _ => collect_run_text(tree, child, text),
        }
    }
}

/// Text of every paragraph in a cell, joined with spaces
pub(crate) fn cell_text(tree: &XmlTree, cell: NodeId) -> String {
    cell_paragraphs(tree, cell)
        .into_iter()
        .map(|p| paragraph_text(tree, p))
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a paragraph is pure spacing: no visible text, no drawings, no
/// section break
pub(crate) fn is_empty_paragraph(tree: &XmlTree, paragraph: NodeId) -> bool {
    if !tree.is(paragraph, "w:p") {
        return false;
    }
    if !paragraph_text(tree, paragraph).trim().is_empty() {
        return false;
    }
    if let Some(p_pr) = tree.child(paragraph, "w:pPr")
        && tree.child(p_pr, "w:sectPr").is_some()
    {
        return false;
    }
    !OPAQUE_CONTENT
        .iter()
        .any(|name| !tree.descendants(paragraph, name).is_empty())
}

/// Runs of a paragraph in reading order, including runs wrapped in
/// hyperlinks, insertions and smart tags
pub(crate) fn paragraph_runs(tree: &XmlTree, paragraph: NodeId) -> Vec<NodeId> {
    let mut runs = Vec::new();
    collect_runs(tree, paragraph, &mut runs);
    runs
}

fn collect_runs(tree: &XmlTree, node: NodeId, runs: &mut Vec<NodeId>) {
    for child in tree.element_children(node) {
        match tree.name(child) {
            Some("w:r") => runs.push(child),
            Some("w:pPr") => {}
            Some(name) if SKIPPED_CONTAINERS.contains(&name) => {}
            _ => collect_runs(tree, child, runs),
        }
    }
}

/// Replace a run's text, keeping its `w:rPr`
///
/// The first `w:t` receives the text; any further text, tab or break
/// children are removed.
pub(crate) fn set_run_text(tree: &mut XmlTree, run: NodeId, text: &str) {
    let content: Vec<NodeId> = tree
        .element_children(run)
        .filter(|&c| matches!(tree.name(c), Some("w:t" | "w:tab" | "w:br" | "w:cr")))
        .collect();

    let target = match content.iter().copied().find(|&c| tree.is(c, "w:t")) {
        Some(t) => t,
        None => {
            let t = tree.create_element("w:t");
            tree.append_child(run, t);
            t
        }
    };
    for other in content {
        if other != target {
            tree.detach(other);
        }
    }

    tree.set_attr(target, "xml:space", "preserve");
    tree.set_text(target, text);
}

/// Empty a run's visible content without touching its formatting
pub(crate) fn blank_run(tree: &mut XmlTree, run: NodeId) {
    for child in tree.element_children(run).collect::<Vec<_>>() {
        match tree.name(child) {
            Some("w:t") => tree.set_text(child, ""),
            Some("w:tab" | "w:br" | "w:cr") => tree.detach(child),
            _ => {}
        }
    }
}

/// Read the direct formatting of a run
pub(crate) fn extract_run_formatting(tree: &XmlTree, run: NodeId) -> TextFormatting {
    let mut formatting = TextFormatting::default();
    let Some(r_pr) = tree.child(run, "w:rPr") else {
        return formatting;
    };

    let toggle = |name: &str| {
        tree.child(r_pr, name)
            .map(|el| !matches!(tree.attr(el, "w:val"), Some("0" | "false" | "off")))
            .unwrap_or(false)
    };
    formatting.bold = toggle("w:b");
    formatting.italic = toggle("w:i");
    formatting.underline = tree
        .child(r_pr, "w:u")
        .is_some_and(|u| tree.attr(u, "w:val") != Some("none"));

    // Half-points in the markup
    formatting.font_size = tree
        .child(r_pr, "w:sz")
        .and_then(|sz| tree.attr(sz, "w:val"))
        .and_then(|v| v.parse::<f32>().ok())
        .map(|half_points| half_points / 2.0);
    formatting.color = tree
        .child(r_pr, "w:color")
        .and_then(|c| tree.attr(c, "w:val"))
        .filter(|v| *v != "auto")
        .map(str::to_string);
    formatting.font = tree
        .child(r_pr, "w:rFonts")
        .and_then(|f| tree.attr(f, "w:ascii").or_else(|| tree.attr(f, "w:hAnsi")))
        .map(str::to_string);

    formatting
}

/// Build a detached `w:rPr` carrying the given formatting
pub(crate) fn build_run_properties(tree: &mut XmlTree, formatting: &TextFormatting) -> NodeId {
    let r_pr = tree.create_element("w:rPr");
    if let Some(font) = &formatting.font {
        let fonts = tree.create_element_with(
            "w:rFonts",
            &[("w:ascii", font.as_str()), ("w:hAnsi", font.as_str()), ("w:cs", font.as_str())],
        );
        tree.insert_ordered(r_pr, fonts, RUN_PROPERTY_ORDER);
    }
    if formatting.bold {
        let b = tree.create_element("w:b");
        tree.insert_ordered(r_pr, b, RUN_PROPERTY_ORDER);
    }
    if formatting.italic {
        let i = tree.create_element("w:i");
        tree.insert_ordered(r_pr, i, RUN_PROPERTY_ORDER);
    }
    if let Some(color) = &formatting.color {
        let c = tree.create_element_with("w:color", &[("w:val", color.as_str())]);
        tree.insert_ordered(r_pr, c, RUN_PROPERTY_ORDER);
    }
    if let Some(size) = formatting.font_size {
        let half_points = ((size * 2.0).round() as u32).to_string();
        let sz = tree.create_element_with("w:sz", &[("w:val", half_points.as_str())]);
        tree.insert_ordered(r_pr, sz, RUN_PROPERTY_ORDER);
        let sz_cs = tree.create_element_with("w:szCs", &[("w:val", half_points.as_str())]);
        tree.insert_ordered(r_pr, sz_cs, RUN_PROPERTY_ORDER);
    }
    if formatting.underline {
        let u = tree.create_element_with("w:u", &[("w:val", "single")]);
        tree.insert_ordered(r_pr, u, RUN_PROPERTY_ORDER);
    }
    r_pr
}

/// Build a detached run holding `text`
pub(crate) fn build_run(
    tree: &mut XmlTree,
    text: &str,
    formatting: Option<&TextFormatting>,
) -> NodeId {
    let run = tree.create_element("w:r");
    if let Some(formatting) = formatting.filter(|f| **f != TextFormatting::default()) {
        let r_pr = build_run_properties(tree, formatting);
        tree.insert_ordered(run, r_pr, RUN_ORDER);
    }
    set_run_text(tree, run, text);
    run
}

/// Build a detached paragraph, optionally holding one run of text
pub(crate) fn build_paragraph(tree: &mut XmlTree, text: Option<&str>) -> NodeId {
    let paragraph = tree.create_element("w:p");
    if let Some(text) = text {
        let run = build_run(tree, text, None);
        tree.append_child(paragraph, run);
    }
    paragraph
}

/// `w:pPr` of a paragraph, created if missing
pub(crate) fn ensure_paragraph_properties(tree: &mut XmlTree, paragraph: NodeId) -> NodeId {
    tree.ensure_child(paragraph, "w:pPr", PARAGRAPH_ORDER)
}
