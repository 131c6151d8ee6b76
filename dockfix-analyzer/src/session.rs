use crate::error::AnalyzerError;
use crate::index::DefectIndex;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use dockfix_edit::Dockerfile;
use dockfix_types::defect::Defect;
use fs_err as fs;
use std::collections::BTreeSet;
use tracing::debug;

/// External static analyzer that reports defects for a file on disk.
pub trait Analyzer {
    fn analyze_file(&self, path: &Utf8Path) -> Result<Vec<Defect>, AnalyzerError>;
}

/// Analyzes successive versions of one document.
///
/// Each call writes the current lines to `<scratch_dir>/<file name>` and
/// invokes the analyzer on that copy, so the input file is never touched
/// before the run finishes.
pub struct AnalysisSession<'a> {
    analyzer: &'a dyn Analyzer,
    scratch_dir: Utf8PathBuf,
    ignored: BTreeSet<String>,
}

impl<'a> AnalysisSession<'a> {
    pub fn new(analyzer: &'a dyn Analyzer, scratch_dir: impl Into<Utf8PathBuf>, ignored: BTreeSet<String>) -> Self {
        Self {
            analyzer,
            scratch_dir: scratch_dir.into(),
            ignored,
        }
    }

    pub fn ignored(&self) -> &BTreeSet<String> {
        &self.ignored
    }

    /// Analyzes the document as it is now.
    ///
    /// `also_ignored` extends the session's ignore list for this call only.
    pub fn analyze(
        &self,
        doc: &Dockerfile,
        also_ignored: &BTreeSet<String>,
    ) -> Result<DefectIndex, AnalyzerError> {
        let target = self.scratch_path(doc);
        fs::create_dir_all(&self.scratch_dir)
            .with_context(|| format!("create {}", self.scratch_dir))?;
        fs::write(&target, doc.contents()).with_context(|| format!("write {}", target))?;

        let defects = self.analyzer.analyze_file(&target)?;
        debug!(path = %target, version = doc.version(), defects = defects.len(), "analyzed");

        let ignored: BTreeSet<String> = self.ignored.union(also_ignored).cloned().collect();
        DefectIndex::build(defects, &ignored, doc.version())
    }

    fn scratch_path(&self, doc: &Dockerfile) -> Utf8PathBuf {
        let name = doc.path().file_name().unwrap_or("Dockerfile");
        self.scratch_dir.join(name)
    }
}
