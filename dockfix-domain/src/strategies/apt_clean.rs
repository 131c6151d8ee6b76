use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, chain_line};
use crate::error::StrategyError;
use dockfix_edit::text::line_indent;
use dockfix_edit::{Command, Dockerfile};
use regex::Regex;

/// DL3009: apt lists left in the layer after `apt-get install`.
pub struct AptListsCleanup;

impl AptListsCleanup {
    const CODE: &'static str = "DL3009";

    fn installs(cmd: &Command) -> bool {
        cmd.is("RUN") && !cmd.json_form && {
            let text = cmd.text();
            text.contains("apt-get") && text.contains(" install ")
        }
    }

    /// The flagged command, or the last apt install in the file.
    fn target(doc: &Dockerfile, line: usize) -> Result<Option<Command>, StrategyError> {
        if let Some(cmd) = doc.command_containing(line)?
            && Self::installs(cmd)
        {
            return Ok(Some(cmd.clone()));
        }
        Ok(doc
            .current_commands()?
            .values()
            .filter(|c| Self::installs(c))
            .next_back()
            .cloned())
    }
}

impl Strategy for AptListsCleanup {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Delete the apt-get lists after installing something",
            changes_layout: true,
            needs_registry: false,
            needs_probe: false,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        let cmd = Self::target(doc, line)?.ok_or(StrategyError::PatternMismatch {
            code: Self::CODE,
            line,
            expected: "a RUN with apt-get install",
        })?;

        let text = cmd.text();
        let rm_lists = Regex::new(r"rm\s+-[a-zA-Z]+\s+/var/lib/apt/lists")?;
        let mut missing = Vec::new();
        if !text.contains("apt-get clean") {
            missing.push("apt-get clean");
        }
        if !rm_lists.is_match(&text) {
            missing.push("rm -rf /var/lib/apt/lists/*");
        }
        if missing.is_empty() {
            return Ok(FixOutcome::Unchanged("apt lists are already removed".into()));
        }

        let last = doc.line(cmd.end_line).unwrap_or_default().to_string();
        let indent = line_indent(&last);
        let trimmed = last.trim_start();

        // Continuations that lead with `&&` keep that style; so do one-line RUNs.
        let leading = cmd.start_line == cmd.end_line || trimmed.starts_with("&&");
        let mut replacement = Vec::with_capacity(missing.len() + 1);
        if leading {
            replacement.push(chain_line(&last, " \\"));
            for (i, step) in missing.iter().enumerate() {
                let more = if i + 1 < missing.len() { " \\" } else { "" };
                replacement.push(format!("{indent}&& {step}{more}"));
            }
        } else {
            replacement.push(chain_line(&last, " && \\"));
            for (i, step) in missing.iter().enumerate() {
                let more = if i + 1 < missing.len() { " && \\" } else { "" };
                replacement.push(format!("{indent}{step}{more}"));
            }
        }

        doc.replace_range(cmd.end_line, cmd.end_line, replacement)?;
        Ok(FixOutcome::Applied)
    }
}
