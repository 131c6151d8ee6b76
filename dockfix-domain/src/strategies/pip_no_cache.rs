use super::options::OptionInsert;
use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, command_at};
use crate::error::StrategyError;
use dockfix_edit::Dockerfile;

/// DL3042: `pip install` keeps its download cache in the image.
pub struct PipNoCache;

impl PipNoCache {
    const CODE: &'static str = "DL3042";
}

impl Strategy for PipNoCache {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Avoid the pip cache with --no-cache-dir",
            changes_layout: false,
            needs_registry: false,
            needs_probe: false,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        let cmd = command_at(doc, line, Self::CODE, &["RUN"], "a RUN instruction")?;
        OptionInsert {
            code: Self::CODE,
            tools: &["pip", "pip3"],
            subcommand: Some("install"),
            option: "--no-cache-dir",
            expected: "pip install",
            present: |segment| segment.contains("--no-cache-dir"),
        }
        .apply(doc, &cmd)
    }
}
