mod common;

use common::{docx, paragraph, table};
use docxmend::document::query::{all_paragraphs, body_tables, row_cells, table_rows};
use docxmend::{Config, DocumentSession, ExtractionResult, FieldValues, FillRequest};
use pretty_assertions::assert_eq;

fn template() -> String {
    [
        r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Họ và tên học sinh</w:t></w:r><w:r><w:t xml:space="preserve">: </w:t></w:r><w:r><w:t>cũ</w:t></w:r></w:p>"#.to_string(),
        paragraph("Ngày sinh: ..../..../...."),
        paragraph("Nhận xét chung:"),
        table(
            "",
            &[
                &["Kỹ năng", "Mức 1", "Mức 2"],
                &["Bắt chước vận động", "", ""],
                &["Chú ý chung", "", ""],
            ],
        ),
        paragraph("Tỷ lệ hoàn thành:"),
    ]
    .concat()
}

fn session() -> DocumentSession {
    DocumentSession::from_bytes(&docx(&template()), Config::default()).unwrap()
}

#[test]
fn test_label_rewrite_blanks_other_runs() {
    let mut session = session();
    let values: FieldValues = [("Họ và tên học sinh".to_string(), "Nguyễn Văn A".to_string())]
        .into_iter()
        .collect();
    let summary = session.fill(&FillRequest {
        values,
        ..Default::default()
    });
    assert_eq!(summary.labels_filled, vec!["Họ và tên học sinh".to_string()]);

    let tree = session.tree();
    let first = all_paragraphs(tree)[0];
    assert_eq!(tree.text_content(first), "Họ và tên học sinh: Nguyễn Văn A");
    let runs = tree.children_named(first, "w:r");
    assert_eq!(runs.len(), 3);
    assert_eq!(tree.text_content(runs[1]), "");
    assert_eq!(tree.text_content(runs[2]), "");
}

#[test]
fn test_results_fill_table_and_summary() {
    let results = ExtractionResult::from_json(
        r#"{
            "skills": [
                {"name": "Bắt chước", "values": {"1": "Đạt", "2": "Chưa đạt"}},
                {"name": "Chú ý", "values": {"2": "Đạt"}}
            ],
            "percentages": {"1": 50, "2": 66.67},
            "previous_percentages": {"2": 40},
            "summary": "Trẻ hợp tác tốt."
        }"#,
    )
    .unwrap();
    let mut session = session();
    let summary = session.fill(&FillRequest {
        results: Some(results),
        levels: vec![2],
        ..Default::default()
    });
    assert_eq!(summary.cells_written, 2);
    assert!(summary.summary_rebuilt);

    let tree = session.tree();
    let table = body_tables(tree)[0];
    let rows = table_rows(tree, table);
    let texts = |row: usize| -> Vec<String> {
        row_cells(tree, rows[row])
            .into_iter()
            .map(|c| tree.text_content(c))
            .collect()
    };
    assert_eq!(texts(1), vec!["Bắt chước vận động", "", "Chưa đạt"]);
    assert_eq!(texts(2), vec!["Chú ý chung", "", "Đạt"]);

    let paragraphs = all_paragraphs(tree);
    let last = *paragraphs.last().unwrap();
    assert_eq!(tree.text_content(last), "Tỷ lệ hoàn thành: Mức 2: 40% => 66.67%");
    assert_eq!(tree.text_content(paragraphs[2]), "Nhận xét chung: Trẻ hợp tác tốt.");
    assert_eq!(tree.text_content(paragraphs[1]), "Ngày sinh: ..../..../....");
}

#[test]
fn test_missing_keys_are_external_errors() {
    let err = ExtractionResult::from_json(r#"{"percentages": {}}"#).unwrap_err();
    assert_eq!(err.kind(), docxmend::ErrorKind::External);
}
