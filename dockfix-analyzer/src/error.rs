use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The analyzer says the input is not a Dockerfile at all.
    #[error("analyzer rejected the file ({code} at line {line}: {message})")]
    Rejected {
        code: String,
        line: usize,
        message: String,
    },

    #[error("analyzer invocation failed: {message}")]
    Invocation { message: String },

    #[error("analyzer output is not valid JSON: {message}")]
    Output { message: String },

    #[error("runtime error: {0}")]
    Runtime(#[from] anyhow::Error),
}

impl AnalyzerError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, AnalyzerError::Rejected { .. })
    }
}
