use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, command_at, leading_ws};
use crate::error::StrategyError;
use dockfix_edit::Dockerfile;

/// DL3025: shell-form `CMD`/`ENTRYPOINT`.
pub struct ExecForm;

/// Anything the shell would interpret; such commands keep a shell via `sh -c`.
const SHELL_SYNTAX: &[&str] = &["&&", "||", ";", "|", ">", "<", "$", "`", "*", "~"];

impl ExecForm {
    const CODE: &'static str = "DL3025";

    fn exec_args(command: &str) -> Option<Vec<String>> {
        if SHELL_SYNTAX.iter().any(|s| command.contains(s)) {
            return Some(vec!["/bin/sh".into(), "-c".into(), command.to_string()]);
        }
        shlex::split(command).filter(|args| !args.is_empty())
    }

    /// Collapses whitespace runs to one space, except inside quotes.
    fn squeeze(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut gap = false;
        for c in text.trim().chars() {
            if quote.is_none() && !escaped && c.is_whitespace() {
                gap = true;
                continue;
            }
            if gap {
                out.push(' ');
                gap = false;
            }
            out.push(c);
            match (quote, c) {
                _ if escaped => escaped = false,
                (Some('\''), '\'') => quote = None,
                (Some('\''), _) => {}
                (_, '\\') => escaped = true,
                (None, '"' | '\'') => quote = Some(c),
                (Some('"'), '"') => quote = None,
                _ => {}
            }
        }
        out
    }

    fn render(name: &str, args: &[String], line: usize) -> Result<String, StrategyError> {
        let items: Vec<String> = args
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<_, _>>()
            .map_err(|e| StrategyError::Unresolved {
                code: Self::CODE,
                line,
                reason: e.to_string(),
            })?;
        Ok(format!("{name} [{}]", items.join(", ")))
    }
}

impl Strategy for ExecForm {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Use JSON notation for CMD and ENTRYPOINT arguments",
            changes_layout: true,
            needs_registry: false,
            needs_probe: false,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        let cmd = command_at(doc, line, Self::CODE, &["CMD", "ENTRYPOINT"], "a CMD or ENTRYPOINT")?;
        if cmd.json_form {
            return Ok(FixOutcome::Unchanged("already in exec form".into()));
        }

        let command = Self::squeeze(&cmd.text());
        let args = Self::exec_args(&command).ok_or(StrategyError::PatternMismatch {
            code: Self::CODE,
            line,
            expected: "a command with balanced quotes",
        })?;

        let indent = leading_ws(doc.line(cmd.start_line).unwrap_or_default()).to_string();
        let rendered = Self::render(&cmd.name, &args, line)?;
        doc.replace_range(cmd.start_line, cmd.end_line, vec![format!("{indent}{rendered}")])?;
        Ok(FixOutcome::Applied)
    }
}
