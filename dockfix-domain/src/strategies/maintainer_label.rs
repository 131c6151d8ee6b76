use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, command_at, leading_ws};
use crate::error::StrategyError;
use dockfix_edit::Dockerfile;
use dockfix_edit::text::dequote;
use regex::Regex;

/// DL4000: deprecated `MAINTAINER`.
///
/// Every `MAINTAINER` in the file is folded into one `LABEL maintainer=...`
/// at the position of the first one.
pub struct MaintainerLabel;

impl MaintainerLabel {
    const CODE: &'static str = "DL4000";
}

impl Strategy for MaintainerLabel {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Replace MAINTAINER with a maintainer label",
            changes_layout: true,
            needs_registry: false,
            needs_probe: false,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        command_at(doc, line, Self::CODE, &["MAINTAINER"], "a MAINTAINER instruction")?;

        // Two or more spaces separate several maintainers on one line.
        let separator = Regex::new(r"\s{2,}")?;
        let found: Vec<_> = doc
            .current_commands()?
            .values()
            .filter(|c| c.is("MAINTAINER"))
            .cloned()
            .collect();

        let mut names = Vec::new();
        for cmd in &found {
            // Raw lines, since parsed words lose the double-space separators.
            let raw = cmd
                .lines()
                .filter_map(|l| doc.line(l))
                .map(|t| t.trim_end().trim_end_matches('\\'))
                .collect::<Vec<_>>()
                .join(" ");
            let value = raw.trim_start().get("MAINTAINER".len()..).unwrap_or_default().trim();
            names.extend(
                separator
                    .split(value)
                    .map(|m| dequote(m.trim()).replace('"', "\\\""))
                    .filter(|m| !m.is_empty()),
            );
        }
        let Some(first) = found.first() else {
            return Ok(FixOutcome::Unchanged("no MAINTAINER left".into()));
        };

        for cmd in found.iter().skip(1).rev() {
            doc.replace_range(cmd.start_line, cmd.end_line, vec![])?;
        }
        let indent = leading_ws(doc.line(first.start_line).unwrap_or_default()).to_string();
        let label = format!("{indent}LABEL maintainer=\"{}\"", names.join(", "));
        doc.replace_range(first.start_line, first.end_line, vec![label])?;
        Ok(FixOutcome::Applied)
    }
}
