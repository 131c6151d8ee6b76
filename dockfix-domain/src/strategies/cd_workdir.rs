use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, command_at};
use crate::error::StrategyError;
use dockfix_edit::text::is_comment;
use dockfix_edit::{Command, Dockerfile};
use regex::Regex;

/// DL3003: `RUN cd <dir>` instead of `WORKDIR`.
///
/// Only a leading `cd` is rewritten. Whatever the command chained after it
/// becomes a new `RUN` under the new working directory.
pub struct CdToWorkdir;

impl CdToWorkdir {
    const CODE: &'static str = "DL3003";
    const EXPECTED: &'static str = "RUN cd <dir> optionally followed by && or ;";

    fn mismatch(line: usize) -> StrategyError {
        StrategyError::PatternMismatch {
            code: Self::CODE,
            line,
            expected: Self::EXPECTED,
        }
    }

    /// Argument of the last `WORKDIR` in the same stage before `cmd`.
    fn previous_workdir(doc: &Dockerfile, cmd: &Command) -> Result<Option<String>, StrategyError> {
        let commands = doc.current_commands()?;
        Ok(commands
            .range(..cmd.start_line)
            .rev()
            .map(|(_, c)| c)
            .take_while(|c| !c.is("FROM"))
            .find(|c| c.is("WORKDIR"))
            .and_then(|c| c.args.first().cloned()))
    }
}

impl Strategy for CdToWorkdir {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Use WORKDIR to switch to a directory",
            changes_layout: true,
            needs_registry: false,
            needs_probe: false,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        let cmd = command_at(doc, line, Self::CODE, &["RUN"], Self::EXPECTED)?;
        if cmd.json_form || !cmd.flags.is_empty() {
            return Err(Self::mismatch(line));
        }

        let head = doc.line(cmd.start_line).unwrap_or_default().to_string();
        let re = Regex::new(r"^(\s*)(?i:run)\s+(?i:cd)\s+([^\s;&|]+)\s*(.*)$")?;
        let caps = re.captures(&head).ok_or_else(|| Self::mismatch(line))?;
        let indent = caps.get(1).map_or("", |m| m.as_str());
        let dir = caps.get(2).map_or("", |m| m.as_str());
        let rest = caps.get(3).map_or("", |m| m.as_str()).trim();

        // `Some(text)`: the chained tail starts on the cd line.
        // `None`: it starts on the next instruction line, after a separator.
        let (inline_tail, separator_seen) = if rest.is_empty() || rest == "\\" {
            (None, false)
        } else if let Some(after) = rest.strip_prefix("&&").or_else(|| rest.strip_prefix(';')) {
            let after = after.trim();
            if after.is_empty() || after == "\\" {
                (None, true)
            } else {
                (Some(after.to_string()), true)
            }
        } else {
            return Err(Self::mismatch(line));
        };

        let following: Vec<String> = (cmd.start_line + 1..=cmd.end_line)
            .filter_map(|l| doc.line(l).map(str::to_string))
            .collect();

        let mut tail: Vec<String> = Vec::new();
        match inline_tail {
            Some(first) => {
                tail.push(format!("{indent}RUN {first}"));
                tail.extend(following);
            }
            None if following.is_empty() => {}
            None => {
                let Some(idx) = following.iter().position(|l| !is_comment(l) && !l.trim().is_empty()) else {
                    return Err(Self::mismatch(line));
                };
                let mut first = following[idx].trim_start();
                if !separator_seen {
                    first = first
                        .strip_prefix("&&")
                        .or_else(|| first.strip_prefix(';'))
                        .ok_or_else(|| Self::mismatch(line))?
                        .trim_start();
                }
                if first.is_empty() || first == "\\" {
                    return Err(Self::mismatch(line));
                }
                tail.extend(following[..idx].iter().cloned());
                tail.push(format!("{indent}RUN {first}"));
                tail.extend(following[idx + 1..].iter().cloned());
            }
        }

        let duplicate = Self::previous_workdir(doc, &cmd)?.as_deref() == Some(dir);
        let mut replacement = Vec::with_capacity(tail.len() + 1);
        if !duplicate {
            replacement.push(format!("{indent}WORKDIR {dir}"));
        }
        replacement.extend(tail);

        doc.replace_range(cmd.start_line, cmd.end_line, replacement)?;
        Ok(FixOutcome::Applied)
    }
}
