//! Document package, XML tree and table model
//!
//! This module opens a `.docx` package, parses its main document part into
//! an editable tree and exposes the table-level views the repair, fill and
//! synthesis passes work on.

pub mod io;
pub mod models;
pub mod normalize;
pub(crate) mod parsing;
pub mod query;
pub mod session;
pub mod tree;

// Re-export all models
pub use models::*;

pub use io::{DocxPackage, MAIN_DOCUMENT_PART};
pub use parsing::table::classify_table;
pub use session::DocumentSession;
pub use tree::{NodeId, XmlTree};
