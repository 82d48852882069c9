use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::FieldSettings;
use crate::document::models::TextFormatting;
use crate::document::normalize::contains_normalized;
use crate::document::parsing::formatting::{
    build_run, extract_run_formatting, paragraph_runs, paragraph_text,
};
use crate::document::query::all_paragraphs;
use crate::document::tree::XmlTree;

/// Render a percentage without a trailing `.0`
pub fn format_percent(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded}%")
}

/// Rewrite the completion-rate paragraph
///
/// The first paragraph containing the configured marker keeps its `w:pPr`
/// and gets fresh runs: the prefix, then one entry per selected level. When
/// `previous` is given, each entry reads `old% => new%`. Returns `false` if
/// no such paragraph exists.
pub fn rebuild_summary(
    tree: &mut XmlTree,
    percentages: &BTreeMap<u8, f64>,
    previous: Option<&BTreeMap<u8, f64>>,
    levels: &[u8],
    settings: &FieldSettings,
) -> bool {
    let paragraph = all_paragraphs(tree)
        .into_iter()
        .find(|&p| contains_normalized(&paragraph_text(tree, p), &settings.summary_marker));
    let Some(paragraph) = paragraph else {
        warn!(marker = %settings.summary_marker, "no summary paragraph found");
        return false;
    };

    // Keep the look of the existing text, minus emphasis
    let base = paragraph_runs(tree, paragraph)
        .first()
        .map(|&run| TextFormatting {
            bold: false,
            italic: false,
            underline: false,
            color: None,
            ..extract_run_formatting(tree, run)
        })
        .unwrap_or_default();
    let highlight = TextFormatting {
        bold: true,
        color: Some(settings.highlight_color.clone()),
        ..base.clone()
    };

    for child in tree.children(paragraph).to_vec() {
        if !tree.is(child, "w:pPr") {
            tree.detach(child);
        }
    }

    let mut parts: Vec<(String, &TextFormatting)> = vec![(settings.summary_prefix.clone(), &base)];
    let entries: Vec<(u8, f64)> = levels
        .iter()
        .filter_map(|level| percentages.get(level).map(|p| (*level, *p)))
        .collect();
    for (i, (level, value)) in entries.iter().enumerate() {
        let separator = if i == 0 { "" } else { "; " };
        parts.push((format!("{separator}{} {level}: ", settings.level_word), &base));
        let rendered = match previous.and_then(|prev| prev.get(level)) {
            Some(old) => format!("{} => {}", format_percent(*old), format_percent(*value)),
            None => format_percent(*value),
        };
        parts.push((rendered, &highlight));
    }

    for (text, formatting) in parts {
        let run = build_run(tree, &text, Some(formatting));
        tree.append_child(paragraph, run);
    }
    debug!(levels = entries.len(), "rebuilt summary paragraph");
    true
}
