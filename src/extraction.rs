//! Content-extraction collaborator
//!
//! Extraction itself (reading assessment sheets, scanned pages and so on)
//! lives outside this crate. What lives here is the result shape the fill
//! pass consumes, and the plumbing that reads several source files
//! concurrently while keeping their fragments in input order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::io::{DocxPackage, MAIN_DOCUMENT_PART};
use crate::document::parsing::formatting::paragraph_text;
use crate::document::query::all_paragraphs;
use crate::document::tree::XmlTree;
use crate::error::{DocError, DocResult};

/// Assessed values of one skill, keyed by level
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SkillResult {
    pub name: String,
    #[serde(default)]
    pub values: BTreeMap<u8, String>,
}

/// Structured output of the extraction collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub skills: Vec<SkillResult>,
    pub percentages: BTreeMap<u8, f64>,
    /// Percentages of the earlier column when two columns were requested
    #[serde(default)]
    pub previous_percentages: Option<BTreeMap<u8, f64>>,
    #[serde(default)]
    pub summary: String,
}

impl ExtractionResult {
    /// Parse a collaborator response
    ///
    /// Only the presence of the expected keys is checked; the values are
    /// taken as given.
    pub fn from_json(json: &str) -> DocResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        for key in ["skills", "percentages"] {
            if value.get(key).is_none() {
                return Err(DocError::external(format!(
                    "extraction result is missing \"{key}\""
                )));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn load(path: &Path) -> DocResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Every level carried by the percentages or by any skill's values
    pub fn levels(&self) -> Vec<u8> {
        let mut levels: BTreeSet<u8> = self.percentages.keys().copied().collect();
        for skill in &self.skills {
            levels.extend(skill.values.keys().copied());
        }
        levels.into_iter().collect()
    }
}

/// Reads one source file into a text fragment
#[async_trait]
pub trait SourceExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> DocResult<String>;
}

/// Extract every file concurrently and return the fragments in input order
///
/// `progress` receives 0 before any work starts, a growing percentage as
/// files complete, and 100 once all are done. The first failure aborts the
/// batch.
pub async fn extract_sources<E, F>(
    extractor: &E,
    files: &[PathBuf],
    progress: F,
) -> DocResult<Vec<String>>
where
    E: SourceExtractor + ?Sized,
    F: Fn(u8) + Send + Sync,
{
    progress(0);
    if files.is_empty() {
        progress(100);
        return Ok(Vec::new());
    }

    let total = files.len();
    let completed = AtomicUsize::new(0);
    let reported = AtomicUsize::new(0);
    let tasks = files.iter().map(|path| {
        let (completed, reported, progress) = (&completed, &reported, &progress);
        async move {
            let fragment = extractor.extract(path).await?;
            debug!(path = %path.display(), chars = fragment.len(), "extracted source");

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            let percent = done * 100 / total;
            if reported.fetch_max(percent, Ordering::SeqCst) < percent {
                progress(percent as u8);
            }
            Ok::<_, DocError>(fragment)
        }
    });

    let fragments = try_join_all(tasks).await?;
    if reported.load(Ordering::SeqCst) < 100 {
        progress(100);
    }
    Ok(fragments)
}

/// Built-in extractor: paragraph text of `.docx` files, plain `.txt` as is
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxTextExtractor;

#[async_trait]
impl SourceExtractor for DocxTextExtractor {
    async fn extract(&self, path: &Path) -> DocResult<String> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let data = tokio::fs::read(path).await?;
        match extension.as_str() {
            "docx" => {
                let package = DocxPackage::from_bytes(&data)?;
                let tree = XmlTree::parse_part(&package.main_document()?, MAIN_DOCUMENT_PART)?;
                let lines = all_paragraphs(&tree)
                    .into_iter()
                    .map(|p| paragraph_text(&tree, p))
                    .filter(|text| !text.trim().is_empty())
                    .collect::<Vec<_>>();
                Ok(lines.join("\n"))
            }
            "txt" => Ok(String::from_utf8_lossy(&data).into_owned()),
            other => Err(DocError::external(format!(
                "unsupported source file type: .{other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::io::test_support::package_with_document;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn test_from_json_requires_keys() {
        let result = ExtractionResult::from_json(
            r#"{"skills": [{"name": "Bắt chước", "values": {"1": "Đạt"}}], "percentages": {"1": 75.5}}"#,
        )
        .unwrap();
        assert_eq!(result.skills[0].values[&1], "Đạt");
        assert_eq!(result.levels(), vec![1]);
        assert!(result.previous_percentages.is_none());

        let skills_only = ExtractionResult::from_json(
            r#"{"skills": [{"name": "Chú ý", "values": {"2": "Đạt", "1": "Chưa đạt"}}], "percentages": {}}"#,
        )
        .unwrap();
        assert_eq!(skills_only.levels(), vec![1, 2]);

        let err = ExtractionResult::from_json(r#"{"skills": []}"#).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::External);
        assert!(err.to_string().contains("percentages"));

        let err = ExtractionResult::from_json("not json").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::External);
    }

    /// Finishes later files first to exercise reordering
    struct ReverseDelay;

    #[async_trait]
    impl SourceExtractor for ReverseDelay {
        async fn extract(&self, path: &Path) -> DocResult<String> {
            let name = path.to_string_lossy().to_string();
            let delay = 40 - name.len() as u64;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            if name.contains("bad") {
                return Err(DocError::external("unreadable"));
            }
            Ok(name)
        }
    }

    #[tokio::test]
    async fn test_fragments_keep_input_order() {
        let files: Vec<PathBuf> = ["a", "bb", "ccc"].iter().map(PathBuf::from).collect();
        let seen = Mutex::new(Vec::new());
        let fragments = extract_sources(&ReverseDelay, &files, |p| seen.lock().unwrap().push(p))
            .await
            .unwrap();
        assert_eq!(fragments, vec!["a", "bb", "ccc"]);

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
    }

    #[tokio::test]
    async fn test_first_failure_aborts_batch() {
        let files = vec![PathBuf::from("ok"), PathBuf::from("bad")];
        let err = extract_sources(&ReverseDelay, &files, |_| {}).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::External);
    }

    #[tokio::test]
    async fn test_docx_and_text_sources() {
        let dir = tempfile::tempdir().unwrap();
        let docx = dir.path().join("report.docx");
        std::fs::write(
            &docx,
            package_with_document(
                "<w:document><w:body><w:p><w:r><w:t>Kỹ năng</w:t></w:r></w:p><w:p/>\
                 <w:tbl><w:tr><w:tc><w:p><w:r><w:t>Mức 1</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body></w:document>",
            ),
        )
        .unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "ghi chú").unwrap();

        let fragments = extract_sources(&DocxTextExtractor, &[docx, txt], |_| {})
            .await
            .unwrap();
        assert_eq!(fragments, vec!["Kỹ năng\nMức 1".to_string(), "ghi chú".to_string()]);

        let pdf = dir.path().join("scan.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();
        assert!(DocxTextExtractor.extract(&pdf).await.is_err());
    }
}
