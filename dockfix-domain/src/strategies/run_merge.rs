use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, chain_line, command_at, leading_ws};
use crate::error::StrategyError;
use dockfix_edit::{Command, Dockerfile};

/// DL3059: consecutive `RUN` instructions.
///
/// A group is a run of shell-form `RUN` instructions without flags that are
/// separated by nothing but blank lines. Comments and other instructions end
/// the group.
pub struct RunMerge;

impl RunMerge {
    const CODE: &'static str = "DL3059";

    fn mergeable(cmd: &Command) -> bool {
        cmd.is("RUN") && !cmd.json_form && cmd.flags.is_empty()
    }

    fn only_blank_between(doc: &Dockerfile, first: &Command, second: &Command) -> bool {
        (first.end_line + 1..second.start_line).all(|l| doc.line(l).is_some_and(|t| t.trim().is_empty()))
    }

    fn group(doc: &Dockerfile, anchor: &Command) -> Result<Vec<Command>, StrategyError> {
        let commands = doc.current_commands()?;

        let mut before: Vec<Command> = Vec::new();
        let mut next = anchor;
        for (_, cmd) in commands.range(..anchor.start_line).rev() {
            if !Self::mergeable(cmd) || !Self::only_blank_between(doc, cmd, next) {
                break;
            }
            before.push(cmd.clone());
            next = cmd;
        }
        before.reverse();

        let mut group = before;
        group.push(anchor.clone());
        let mut prev = anchor;
        for (_, cmd) in commands.range(anchor.start_line + 1..) {
            if !Self::mergeable(cmd) || !Self::only_blank_between(doc, prev, cmd) {
                break;
            }
            group.push(cmd.clone());
            prev = cmd;
        }
        Ok(group)
    }
}

impl Strategy for RunMerge {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Merge consecutive RUN instructions",
            changes_layout: true,
            needs_registry: false,
            needs_probe: false,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        let anchor = command_at(doc, line, Self::CODE, &["RUN"], "a RUN instruction")?;
        if !Self::mergeable(&anchor) {
            return Err(StrategyError::PatternMismatch {
                code: Self::CODE,
                line,
                expected: "a shell-form RUN without flags",
            });
        }

        let group = Self::group(doc, &anchor)?;
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            return Ok(FixOutcome::Unchanged("no RUN group".into()));
        };
        if group.len() < 2 {
            return Ok(FixOutcome::Unchanged("no adjacent RUN to merge with".into()));
        }
        let (span_start, span_end) = (first.start_line, last.end_line);

        let mut merged = Vec::new();
        for (i, cmd) in group.iter().enumerate() {
            let mut lines: Vec<String> = cmd
                .lines()
                .filter_map(|l| doc.line(l).map(str::to_string))
                .collect();
            if i > 0 {
                if let Some(head) = lines.first_mut() {
                    let indent = leading_ws(head);
                    let body = head[indent.len() + "RUN".len()..].trim_start();
                    *head = format!("{indent}    && {body}");
                }
            }
            if i + 1 < group.len() {
                if let Some(tail) = lines.last_mut() {
                    *tail = chain_line(tail, " \\");
                }
            }
            merged.extend(lines);
        }

        doc.replace_range(span_start, span_end, merged)?;
        Ok(FixOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::{StubResolver, doc};
    use pretty_assertions::assert_eq;

    fn fix(src: &str, line: usize) -> (Dockerfile, FixOutcome) {
        let mut d = doc(src);
        let ctx = StrategyContext {
            resolver: &StubResolver::default(),
        };
        let outcome = RunMerge.fix(&mut d, line, &ctx).unwrap();
        (d, outcome)
    }

    #[test]
    fn merges_group_across_blank_lines() {
        let (d, outcome) = fix("FROM x\nRUN apt-get update\n\nRUN make;\nRUN make install\n", 4);
        assert_eq!(outcome, FixOutcome::Applied);
        assert_eq!(
            d.contents(),
            "FROM x\nRUN apt-get update \\\n    && make \\\n    && make install\n"
        );
        assert!(d.is_dirty());
    }

    #[test]
    fn comment_breaks_the_group() {
        let (d, _) = fix("FROM x\nRUN a\n# build\nRUN b\nRUN c\n", 5);
        assert_eq!(d.contents(), "FROM x\nRUN a\n# build\nRUN b \\\n    && c\n");
    }

    #[test]
    fn run_with_flags_is_left_alone() {
        let (d, outcome) = fix("FROM x\nRUN --mount=type=cache,target=/c a\nRUN b\n", 3);
        assert!(matches!(outcome, FixOutcome::Unchanged(_)));
        assert_eq!(d.version(), 0);
    }

    #[test]
    fn multi_line_runs_keep_their_continuations() {
        let (d, _) = fix("FROM x\nRUN a \\\n    && b\nRUN c\n", 4);
        assert_eq!(d.contents(), "FROM x\nRUN a \\\n    && b \\\n    && c\n");
    }
}
