//! One transformation session over one document
//!
//! A session owns the package and its parsed main document. Every pass
//! mutates that tree in place; nothing reaches the disk until [`save`] is
//! called, so dropping a session abandons its changes.
//!
//! [`save`]: DocumentSession::save

use std::path::Path;

use tracing::debug;

use crate::config::Config;
use crate::error::DocResult;
use crate::fill::{FillRequest, FillSummary, fill_document};
use crate::repair::{analyze_tables, apply_repairs};
use crate::synth::{GoalSelection, SynthesisSummary, synthesize_goal_table};

use super::io::{DocxPackage, MAIN_DOCUMENT_PART};
use super::models::{AnalysisReport, RepairSummary, TableInfo};
use super::tree::XmlTree;

pub struct DocumentSession {
    package: DocxPackage,
    tree: XmlTree,
    config: Config,
}

impl DocumentSession {
    pub fn from_bytes(data: &[u8], config: Config) -> DocResult<Self> {
        Self::from_package(DocxPackage::from_bytes(data)?, config)
    }

    pub fn open(path: &Path, config: Config) -> DocResult<Self> {
        debug!(path = %path.display(), "opening document");
        Self::from_package(DocxPackage::open(path)?, config)
    }

    fn from_package(package: DocxPackage, config: Config) -> DocResult<Self> {
        let tree = XmlTree::parse_part(&package.main_document()?, MAIN_DOCUMENT_PART)?;
        Ok(Self {
            package,
            tree,
            config,
        })
    }

    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    /// Read-only inspection of every body-level table
    pub fn analyze(&self) -> AnalysisReport {
        analyze_tables(&self.tree, &self.config)
    }

    /// Merge and repair tables as described by `infos`
    ///
    /// `infos` must come from [`analyze`](Self::analyze) on this session;
    /// the options inside may have been edited since.
    pub fn repair(&mut self, infos: &[TableInfo]) -> RepairSummary {
        apply_repairs(&mut self.tree, infos, &self.config.repair)
    }

    pub fn fill(&mut self, request: &FillRequest) -> FillSummary {
        fill_document(&mut self.tree, request, &self.config.fields)
    }

    pub fn synthesize(
        &mut self,
        selection: &GoalSelection,
        smart_splitting: bool,
    ) -> DocResult<SynthesisSummary> {
        synthesize_goal_table(&mut self.tree, selection, smart_splitting)
    }

    /// The package with the current tree as its main document
    fn updated_package(&self) -> DocResult<DocxPackage> {
        let mut package = self.package.clone();
        package.replace_main_document(self.tree.serialize())?;
        Ok(package)
    }

    pub fn to_bytes(&self) -> DocResult<Vec<u8>> {
        self.updated_package()?.to_bytes()
    }

    pub fn save(&self, path: &Path) -> DocResult<()> {
        self.updated_package()?.save(path)?;
        debug!(path = %path.display(), "saved document");
        Ok(())
    }
}
