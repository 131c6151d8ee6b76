use crate::error::AnalyzerError;
use dockfix_types::defect::Defect;

/// Parses hadolint `-f json` output.
///
/// Reading is tolerant: unknown fields are ignored and empty output means no
/// findings. Anything that is not a JSON array of records is an error.
pub fn parse_findings(raw: &str) -> Result<Vec<Defect>, AnalyzerError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(vec![]);
    }
    serde_json::from_str::<Vec<Defect>>(raw).map_err(|e| AnalyzerError::Output {
        message: e.to_string(),
    })
}
