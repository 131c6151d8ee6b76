use dockfix_analyzer::AnalyzerError;
use dockfix_edit::EditError;
use thiserror::Error;

/// Why one strategy could not repair one defect. Never fatal to the run.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The text at the defect does not have the shape the fix expects.
    #[error("{code} at line {line}: expected {expected}")]
    PatternMismatch {
        code: &'static str,
        line: usize,
        expected: &'static str,
    },

    /// A registry or probe answer needed by the fix was missing.
    #[error("{code} at line {line}: {reason}")]
    Unresolved {
        code: &'static str,
        line: usize,
        reason: String,
    },

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl StrategyError {
    /// Mismatches and unresolved lookups are skips; the rest are failures.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            StrategyError::PatternMismatch { .. } | StrategyError::Unresolved { .. }
        )
    }
}

/// Failures that end a repair run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("analyzer rejected the file: {code} at line {line}: {message}")]
    Rejected {
        code: String,
        line: usize,
        message: String,
    },

    #[error("no fixpoint after {max_passes} passes")]
    PassLimitExceeded { max_passes: usize },

    #[error("analysis failed: {0}")]
    Analysis(AnalyzerError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

impl From<AnalyzerError> for EngineError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::Rejected {
                code,
                line,
                message,
            } => EngineError::Rejected {
                code,
                line,
                message,
            },
            other => EngineError::Analysis(other),
        }
    }
}
