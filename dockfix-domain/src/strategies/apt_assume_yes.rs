use super::options::{OptionInsert, words};
use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, command_at};
use crate::error::StrategyError;
use dockfix_edit::Dockerfile;

/// DL3014: `apt-get install` without `-y`.
pub struct AptAssumeYes;

impl AptAssumeYes {
    const CODE: &'static str = "DL3014";

    fn assumes_yes(segment: &str) -> bool {
        words(segment).any(|w| {
            matches!(w, "-y" | "--yes" | "--assume-yes")
                || (w.starts_with('-') && !w.starts_with("--") && w.contains('y'))
        })
    }
}

impl Strategy for AptAssumeYes {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Use the -y switch with apt-get install",
            changes_layout: false,
            needs_registry: false,
            needs_probe: false,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        let cmd = command_at(doc, line, Self::CODE, &["RUN"], "a RUN instruction")?;
        OptionInsert {
            code: Self::CODE,
            tools: &["apt-get"],
            subcommand: Some("install"),
            option: "-y",
            expected: "apt-get install",
            present: Self::assumes_yes,
        }
        .apply(doc, &cmd)
    }
}
