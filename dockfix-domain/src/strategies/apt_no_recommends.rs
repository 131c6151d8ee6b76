use super::options::OptionInsert;
use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, command_at};
use crate::error::StrategyError;
use dockfix_edit::Dockerfile;

/// DL3015: `apt-get install` pulls recommended packages.
pub struct AptNoRecommends;

impl AptNoRecommends {
    const CODE: &'static str = "DL3015";
}

impl Strategy for AptNoRecommends {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Avoid additional packages by specifying --no-install-recommends",
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
            option: "--no-install-recommends",
            expected: "apt-get install",
            present: |segment| segment.contains("--no-install-recommends"),
        }
        .apply(doc, &cmd)
    }
}
