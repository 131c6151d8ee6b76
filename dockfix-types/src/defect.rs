use serde::{Deserialize, Serialize};

/// Codes that mean the analyzer could not read the input as a Dockerfile at all.
///
/// `DL1000` is a grammar failure, `DL3061` is an instruction-order violation
/// (the file does not start with `FROM`, `ARG` or a comment).
pub const FATAL_CODES: &[&str] = &["DL1000", "DL3061"];

pub fn is_fatal_code(code: &str) -> bool {
    FATAL_CODES.contains(&code)
}

/// One smell reported by the analyzer.
///
/// Defects are never patched in place. Every re-analysis produces a fresh set
/// because positions are recomputed from the current content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defect {
    /// 1-based line of the instruction the analyzer flagged.
    pub line: usize,
    pub code: String,
    #[serde(default)]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Defect {
    pub fn new(line: usize, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            line,
            code: code.into(),
            message: message.into(),
            level: None,
            column: None,
            file: None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        is_fatal_code(&self.code)
    }
}
