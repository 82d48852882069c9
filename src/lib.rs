//! docxmend: table repair and form filling for .docx planning documents
//!
//! This library opens Microsoft Word documents, detects structural defects in
//! their tables (missing borders, tables split by stray empty paragraphs),
//! repairs them, fills labelled fields and assessment tables from extracted
//! results, and synthesizes goal-plan tables from a goal selection.

pub mod config;
pub mod document;
pub mod error;
pub mod extraction;
pub mod fill;
pub mod repair;
pub mod synth;

// Re-export commonly used types
pub use config::Config;
pub use document::{AnalysisReport, DocumentSession, RepairOptions, TableInfo};
pub use error::{DocError, DocResult, ErrorKind};
pub use extraction::{DocxTextExtractor, ExtractionResult, SourceExtractor, extract_sources};
pub use fill::{FieldValues, FillRequest};
pub use synth::GoalSelection;
