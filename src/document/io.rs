//! Package I/O and validation
//!
//! A `.docx` file is a zip container. Only the main document part is ever
//! parsed; every other entry is carried through byte-for-byte so headers,
//! footers, media and relationships survive a transform untouched.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DocError, DocResult};

/// Path of the main document part inside the package
pub const MAIN_DOCUMENT_PART: &str = "word/document.xml";

/// Media type of a WordprocessingML document
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
}

/// In-memory copy of a `.docx` package, entries kept in archive order
#[derive(Debug, Clone)]
pub struct DocxPackage {
    entries: Vec<PackageEntry>,
}

impl DocxPackage {
    /// Read a package from disk, rejecting anything that is not a `.docx`
    pub fn open(path: &Path) -> DocResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");
        if !extension.eq_ignore_ascii_case("docx") {
            return Err(DocError::WrongExtension(extension.to_string()));
        }

        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Read a package from memory
    pub fn from_bytes(data: &[u8]) -> DocResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;

        if archive.by_name(MAIN_DOCUMENT_PART).is_err() {
            if archive.by_name("xl/workbook.xml").is_ok() {
                return Err(DocError::NotAWordDocument);
            }
            return Err(DocError::MissingPart(MAIN_DOCUMENT_PART.to_string()));
        }

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            let compression = entry.compression();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            entries.push(PackageEntry {
                name,
                data,
                compression,
            });
        }

        Ok(Self { entries })
    }

    /// Names of all entries, in archive order
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Text of the main document part
    pub fn main_document(&self) -> DocResult<String> {
        let data = self
            .part(MAIN_DOCUMENT_PART)
            .ok_or_else(|| DocError::MissingPart(MAIN_DOCUMENT_PART.to_string()))?;
        String::from_utf8(data.to_vec()).map_err(|e| DocError::Xml {
            part: MAIN_DOCUMENT_PART.to_string(),
            message: format!("not valid UTF-8: {e}"),
        })
    }

    /// Swap in a new main document part, keeping its position in the archive
    pub fn replace_main_document(&mut self, xml: String) -> DocResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.name == MAIN_DOCUMENT_PART)
            .ok_or_else(|| DocError::MissingPart(MAIN_DOCUMENT_PART.to_string()))?;
        entry.data = xml.into_bytes();
        Ok(())
    }

    /// Re-zip the package
    ///
    /// Media files are stored, everything else is deflated, which is the
    /// layout Word itself produces.
    pub fn to_bytes(&self) -> DocResult<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = zip::write::SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated);
        let stored =
            zip::write::SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for entry in &self.entries {
            let options = if entry.name.starts_with("word/media/")
                || entry.compression == CompressionMethod::Stored
            {
                stored
            } else {
                deflated
            };
            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(&entry.data)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    pub fn save(&self, path: &Path) -> DocResult<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
