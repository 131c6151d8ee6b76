use super::options::{OptionInsert, words};
use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, command_at};
use crate::error::StrategyError;
use dockfix_edit::Dockerfile;

/// DL3047: `wget` without `--progress` floods the build log.
pub struct WgetProgress;

impl WgetProgress {
    const CODE: &'static str = "DL3047";

    fn quiet_or_progress(segment: &str) -> bool {
        segment.contains("--progress")
            || words(segment).any(|w| matches!(w, "-q" | "--quiet" | "-nv" | "--no-verbose"))
    }
}

impl Strategy for WgetProgress {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Pass --progress to wget to keep build logs small",
            changes_layout: false,
            needs_registry: false,
            needs_probe: false,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        let cmd = command_at(doc, line, Self::CODE, &["RUN"], "a RUN instruction")?;
        OptionInsert {
            code: Self::CODE,
            tools: &["wget"],
            subcommand: None,
            option: "--progress=dot:giga",
            expected: "a wget invocation",
            present: Self::quiet_or_progress,
        }
        .apply(doc, &cmd)
    }
}
