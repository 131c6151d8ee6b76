use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, command_at, replace_keyword};
use crate::error::StrategyError;
use dockfix_edit::Dockerfile;

/// DL3020: `ADD` used for plain files.
pub struct AddToCopy;

impl AddToCopy {
    const CODE: &'static str = "DL3020";
}

impl Strategy for AddToCopy {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Use COPY instead of ADD for files and folders",
            changes_layout: false,
            needs_registry: false,
            needs_probe: false,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        let cmd = command_at(doc, line, Self::CODE, &["ADD"], "an ADD instruction")?;
        let text = doc.line(cmd.start_line).unwrap_or_default();
        let replaced = replace_keyword(text, "ADD", "COPY").ok_or(StrategyError::PatternMismatch {
            code: Self::CODE,
            line,
            expected: "ADD at the start of the line",
        })?;
        doc.set_line(cmd.start_line, replaced)?;
        Ok(FixOutcome::Applied)
    }
}
