//! Analyzer integration for dockfix.
//!
//! Defect positions only ever come from here: the engine re-runs the analyzer
//! after any line-count change instead of tracking deltas itself.

pub mod error;
pub mod index;
pub mod load;
pub mod session;

pub use error::AnalyzerError;
pub use index::DefectIndex;
pub use load::parse_findings;
pub use session::{AnalysisSession, Analyzer};
