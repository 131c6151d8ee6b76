use dockfix_analyzer::{AnalysisSession, AnalyzerError, DefectIndex};
use dockfix_edit::Dockerfile;
use std::collections::BTreeSet;

/// Where the engine gets defect positions from.
///
/// `suppressed` holds codes that strategies asked to hide from later
/// analyses; implementations drop them like administratively ignored codes.
pub trait DefectSource {
    fn analyze(&self, doc: &Dockerfile, suppressed: &BTreeSet<String>) -> Result<DefectIndex, AnalyzerError>;
}

impl DefectSource for AnalysisSession<'_> {
    fn analyze(&self, doc: &Dockerfile, suppressed: &BTreeSet<String>) -> Result<DefectIndex, AnalyzerError> {
        AnalysisSession::analyze(self, doc, suppressed)
    }
}
