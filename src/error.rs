//! Error types shared by the document operations
//!
//! Only conditions the caller must act on become errors. Anything the
//! transform can resolve by itself (a missing property subtree, a merge whose
//! precondition no longer holds, a goal text without numbers) is logged and
//! handled in place.

use thiserror::Error;

/// Coarse classification of a [`DocError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document does not have the structure the operation needs
    Precondition,
    /// A collaborator outside the document tree failed or returned bad data
    External,
    /// Reading or writing the package failed
    Io,
}

#[derive(Debug, Error)]
pub enum DocError {
    #[error("Invalid .docx package: missing {0}\nThis file may be corrupted or is not a valid Word document.")]
    MissingPart(String),

    #[error("This appears to be an Excel file (.xlsx).\nOnly Word documents (.docx) can be processed.")]
    NotAWordDocument,

    #[error("Invalid file format. Expected .docx file, got .{0}")]
    WrongExtension(String),

    #[error("{0}")]
    Structure(String),

    #[error("external data error: {0}")]
    External(String),

    #[error("malformed XML in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocError::MissingPart(_)
            | DocError::NotAWordDocument
            | DocError::WrongExtension(_)
            | DocError::Structure(_) => ErrorKind::Precondition,
            DocError::External(_) => ErrorKind::External,
            DocError::Xml { .. } | DocError::Zip(_) | DocError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn structure(message: impl Into<String>) -> Self {
        DocError::Structure(message.into())
    }

    pub(crate) fn external(message: impl Into<String>) -> Self {
        DocError::External(message.into())
    }
}

impl From<serde_json::Error> for DocError {
    fn from(err: serde_json::Error) -> Self {
        DocError::External(format!("malformed extraction result: {err}"))
    }
}

pub type DocResult<T> = std::result::Result<T, DocError>;
