//! Field filling
//!
//! Three passes run in order over one tree: labelled paragraphs, the rows of
//! every skill-result table, and the completion-rate summary paragraph. Each
//! rewrites run text in place and never splits a run.

pub mod labels;
pub mod skills;
pub mod summary;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::FieldSettings;
use crate::document::models::TableRole;
use crate::document::parsing::table::classify_table;
use crate::document::query::body_tables;
use crate::document::tree::XmlTree;
use crate::extraction::ExtractionResult;

pub use labels::{FieldValues, fill_labels};
pub use skills::fill_skill_results;
pub use summary::{format_percent, rebuild_summary};

/// Everything one fill pass writes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillRequest {
    #[serde(default)]
    pub values: FieldValues,
    #[serde(default)]
    pub results: Option<ExtractionResult>,
    /// Levels to write; empty means every level the results carry
    #[serde(default)]
    pub levels: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FillSummary {
    pub labels_filled: Vec<String>,
    pub cells_written: usize,
    pub summary_rebuilt: bool,
}

pub fn fill_document(
    tree: &mut XmlTree,
    request: &FillRequest,
    settings: &FieldSettings,
) -> FillSummary {
    let mut values = request.values.clone();
    let mut labels = settings.labels.clone();
    if let Some(results) = &request.results
        && !results.summary.trim().is_empty()
    {
        values
            .entry(settings.narrative_label.clone())
            .or_insert_with(|| results.summary.trim().to_string());
        if !labels.contains(&settings.narrative_label) {
            labels.push(settings.narrative_label.clone());
        }
    }

    let mut summary = FillSummary {
        labels_filled: fill_labels(tree, &values, &labels),
        ..Default::default()
    };

    if let Some(results) = &request.results {
        let levels = if request.levels.is_empty() {
            results.levels()
        } else {
            request.levels.clone()
        };

        for table in body_tables(tree) {
            if let TableRole::SkillResult(columns) = classify_table(tree, table).role {
                summary.cells_written +=
                    fill_skill_results(tree, table, &columns, &results.skills, &levels);
            }
        }

        summary.summary_rebuilt = rebuild_summary(
            tree,
            &results.percentages,
            results.previous_percentages.as_ref(),
            &levels,
            settings,
        );
    }

    info!(
        labels = summary.labels_filled.len(),
        cells = summary.cells_written,
        summary = summary.summary_rebuilt,
        "filled document fields"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parsing::formatting::paragraph_text;
    use crate::document::query::all_paragraphs;

    const DOC: &str = "<w:document><w:body>\
        <w:p><w:r><w:t>Họ và tên học sinh: </w:t></w:r></w:p>\
        <w:p><w:r><w:t>Nhận xét chung:</w:t></w:r></w:p>\
        <w:tbl>\
        <w:tr><w:tc><w:p><w:r><w:t>Kỹ năng</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Mức 1</w:t></w:r></w:p></w:tc></w:tr>\
        <w:tr><w:tc><w:p><w:r><w:t>Chú ý</w:t></w:r></w:p></w:tc><w:tc><w:p/></w:tc></w:tr>\
        </w:tbl>\
        <w:p><w:r><w:t>Tỷ lệ hoàn thành:</w:t></w:r></w:p>\
        </w:body></w:document>";

    fn request(json: &str) -> FillRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_full_fill() {
        let mut tree = XmlTree::parse(DOC).unwrap();
        let request = request(
            r#"{
                "values": {"Họ và tên học sinh": "Nguyễn Văn A"},
                "results": {
                    "skills": [{"name": "Chú ý", "values": {"1": "Đạt"}}],
                    "percentages": {"1": 100.0},
                    "summary": "Trẻ tiến bộ rõ."
                }
            }"#,
        );
        let summary = fill_document(&mut tree, &request, &FieldSettings::default());
        assert_eq!(summary.cells_written, 1);
        assert!(summary.summary_rebuilt);
        assert_eq!(summary.labels_filled.len(), 2);

        let texts: Vec<String> = all_paragraphs(&tree)
            .into_iter()
            .map(|p| paragraph_text(&tree, p))
            .collect();
        assert_eq!(texts[0], "Họ và tên học sinh: Nguyễn Văn A");
        assert_eq!(texts[1], "Nhận xét chung: Trẻ tiến bộ rõ.");
        assert_eq!(texts[5], "Đạt");
        assert_eq!(texts[6], "Tỷ lệ hoàn thành: Mức 1: 100%");
    }

    #[test]
    fn test_caller_narrative_wins() {
        let mut tree = XmlTree::parse(DOC).unwrap();
        let request = request(
            r#"{
                "values": {"Nhận xét chung": "Viết tay"},
                "results": {"skills": [], "percentages": {}, "summary": "Tự động"}
            }"#,
        );
        fill_document(&mut tree, &request, &FieldSettings::default());
        let second = all_paragraphs(&tree)[1];
        assert_eq!(paragraph_text(&tree, second), "Nhận xét chung: Viết tay");
    }

    #[test]
    fn test_skill_levels_used_without_percentages() {
        let mut tree = XmlTree::parse(DOC).unwrap();
        let request = request(
            r#"{"results": {
                "skills": [{"name": "Chú ý", "values": {"1": "Đạt"}}],
                "percentages": {}
            }}"#,
        );
        let summary = fill_document(&mut tree, &request, &FieldSettings::default());
        assert_eq!(summary.cells_written, 1);
        let texts: Vec<String> = all_paragraphs(&tree)
            .into_iter()
            .map(|p| paragraph_text(&tree, p))
            .collect();
        assert_eq!(texts[5], "Đạt");
        assert_eq!(texts[6], "Tỷ lệ hoàn thành: ");
    }

    #[test]
    fn test_values_only() {
        let mut tree = XmlTree::parse(DOC).unwrap();
        let summary = fill_document(&mut tree, &FillRequest::default(), &FieldSettings::default());
        assert_eq!(summary, FillSummary::default());
    }
}
