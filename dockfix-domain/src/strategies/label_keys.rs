use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, command_at, leading_ws};
use crate::error::StrategyError;
use dockfix_edit::Dockerfile;
use dockfix_edit::text::dequote;

/// DL3048: label keys outside lowercase, dash and dot.
pub struct LabelKeys;

impl LabelKeys {
    const CODE: &'static str = "DL3048";

    /// `Build_Date`, `buildDate` and `build date` all become `build-date`.
    fn normalize_key(key: &str) -> String {
        let mut out = String::new();
        for c in dequote(key).chars() {
            if c.is_ascii_alphanumeric() {
                if c.is_ascii_uppercase() && out.ends_with(|p: char| p.is_ascii_lowercase()) {
                    out.push('-');
                }
                out.push(c);
            } else if !out.is_empty() && !out.ends_with(['-', '.']) {
                out.push(if c == '.' { '.' } else { '-' });
            }
        }
        out.trim_end_matches(['-', '.']).to_ascii_lowercase()
    }

    fn render_value(value: &str) -> String {
        let quoted = value.starts_with('"') || value.starts_with('\'');
        if quoted || (!value.is_empty() && !value.contains(char::is_whitespace)) {
            value.to_string()
        } else {
            format!("\"{}\"", value.replace('"', "\\\""))
        }
    }
}

impl Strategy for LabelKeys {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Use valid label keys",
            changes_layout: true,
            needs_registry: false,
            needs_probe: false,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        let cmd = command_at(doc, line, Self::CODE, &["LABEL"], "a LABEL instruction")?;

        let mut pairs = Vec::with_capacity(cmd.args.len() / 2);
        let mut changed = false;
        for pair in cmd.args.chunks(2) {
            let [key, value] = pair else {
                return Err(StrategyError::PatternMismatch {
                    code: Self::CODE,
                    line,
                    expected: "key=value pairs",
                });
            };
            let normalized = Self::normalize_key(key);
            if normalized.is_empty() {
                return Err(StrategyError::PatternMismatch {
                    code: Self::CODE,
                    line,
                    expected: "label keys containing letters or digits",
                });
            }
            changed |= normalized != *key;
            pairs.push(format!("{normalized}={}", Self::render_value(value)));
        }
        if !changed {
            return Ok(FixOutcome::Unchanged("label keys are already valid".into()));
        }

        let indent = leading_ws(doc.line(cmd.start_line).unwrap_or_default()).to_string();
        let last = pairs.len() - 1;
        let replacement: Vec<String> = pairs
            .iter()
            .enumerate()
            .map(|(i, pair)| {
                let lead = if i == 0 { format!("{indent}LABEL ") } else { format!("{indent}    ") };
                let more = if i < last { " \\" } else { "" };
                format!("{lead}{pair}{more}")
            })
            .collect();

        doc.replace_range(cmd.start_line, cmd.end_line, replacement)?;
        Ok(FixOutcome::Applied)
    }
}
