use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use tracing::{debug, warn};

use crate::document::parsing::formatting::{
    blank_run, build_run, paragraph_runs, paragraph_text, set_run_text,
};
use crate::document::query::all_paragraphs;
use crate::document::tree::{NodeId, XmlTree};

/// Label → value pairs supplied by the caller
pub type FieldValues = BTreeMap<String, String>;

struct LabelPattern<'a> {
    label: &'a str,
    value: &'a str,
    pattern: Regex,
}

/// Fill every `label: ...` paragraph with its mapped value
///
/// Labels are tried in list order and each fills at most one paragraph. The
/// paragraph's first run receives `"<label>: <value>"`; every other run is
/// emptied but keeps its properties. Returns the labels that were filled.
pub fn fill_labels(tree: &mut XmlTree, values: &FieldValues, labels: &[String]) -> Vec<String> {
    let patterns: Vec<LabelPattern<'_>> = labels
        .iter()
        .filter_map(|label| {
            let value = values.get(label)?;
            let pattern = Regex::new(&format!(r"(?i)^\s*{}\s*:", regex::escape(label.trim())));
            match pattern {
                Ok(pattern) => Some(LabelPattern {
                    label: label.trim(),
                    value,
                    pattern,
                }),
                Err(err) => {
                    warn!(label = %label, %err, "label cannot be matched");
                    None
                }
            }
        })
        .collect();

    for key in values.keys() {
        if !labels.contains(key) {
            debug!(label = %key, "value has no configured label");
        }
    }

    let mut filled: HashSet<&str> = HashSet::new();
    for paragraph in all_paragraphs(tree) {
        if filled.len() == patterns.len() {
            break;
        }
        let text = paragraph_text(tree, paragraph);
        let hit = patterns
            .iter()
            .filter(|p| !filled.contains(p.label))
            .find(|p| p.pattern.is_match(&text));
        if let Some(hit) = hit {
            write_label(tree, paragraph, hit.label, hit.value);
            filled.insert(hit.label);
        }
    }

    patterns
        .iter()
        .filter(|p| filled.contains(p.label))
        .map(|p| p.label.to_string())
        .collect()
}

fn write_label(tree: &mut XmlTree, paragraph: NodeId, label: &str, value: &str) {
    let text = format!("{label}: {value}");
    let runs = paragraph_runs(tree, paragraph);
    match runs.split_first() {
        Some((&first, rest)) => {
            set_run_text(tree, first, &text);
            for &run in rest {
                blank_run(tree, run);
            }
        }
        None => {
            let run = build_run(tree, &text, None);
            tree.append_child(paragraph, run);
        }
    }
    debug!(label, "filled label");
}
