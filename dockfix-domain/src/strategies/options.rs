//! Inserting a command-line option after a tool invocation inside `RUN`.

use super::FixOutcome;
use crate::error::StrategyError;
use dockfix_edit::text::{continues, find_word, is_comment};
use dockfix_edit::{Command, Dockerfile};
use std::collections::BTreeMap;

/// Byte position right after `<tool> [..] <subcommand>` on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Site {
    pub line: usize,
    pub offset: usize,
}

/// Option to add to every matching invocation that lacks it.
pub(crate) struct OptionInsert {
    pub code: &'static str,
    pub tools: &'static [&'static str],
    pub subcommand: Option<&'static str>,
    pub option: &'static str,
    pub expected: &'static str,
    /// True when the invocation's segment already satisfies the rule.
    pub present: fn(&str) -> bool,
}

impl OptionInsert {
    pub(crate) fn apply(&self, doc: &mut Dockerfile, cmd: &Command) -> Result<FixOutcome, StrategyError> {
        let found = sites(doc, cmd, self.tools, self.subcommand);
        if found.is_empty() {
            return Err(StrategyError::PatternMismatch {
                code: self.code,
                line: cmd.start_line,
                expected: self.expected,
            });
        }

        let mut by_line: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for site in found {
            if !(self.present)(&segment_from(doc, cmd, site)) {
                by_line.entry(site.line).or_default().push(site.offset);
            }
        }
        if by_line.is_empty() {
            return Ok(FixOutcome::Unchanged(format!("already uses {}", self.option)));
        }

        for (line, mut offsets) in by_line {
            let mut text = doc.line(line).unwrap_or_default().to_string();
            offsets.sort_unstable_by(|a, b| b.cmp(a));
            for offset in offsets {
                text.insert_str(offset, &format!(" {}", self.option));
            }
            doc.set_line(line, text)?;
        }
        Ok(FixOutcome::Applied)
    }
}

/// Every `<tool> [..] <subcommand>` occurrence on the command's lines.
///
/// The subcommand must follow the tool within the same shell segment.
pub(crate) fn sites(doc: &Dockerfile, cmd: &Command, tools: &[&str], subcommand: Option<&str>) -> Vec<Site> {
    let mut out = Vec::new();
    for line in cmd.lines() {
        let Some(text) = doc.line(line) else { continue };
        if is_comment(text) {
            continue;
        }

        let mut from = 0;
        while from < text.len() {
            let Some((pos, tool)) = tools
                .iter()
                .filter_map(|t| find_word(text, t, from).map(|p| (p, *t)))
                .min_by_key(|(p, _)| *p)
            else {
                break;
            };
            let after_tool = pos + tool.len();
            from = after_tool;

            match subcommand {
                None => out.push(Site { line, offset: after_tool }),
                Some(sub) => {
                    if let Some(s) = find_word(text, sub, after_tool)
                        && !has_separator(&text[after_tool..s])
                    {
                        out.push(Site {
                            line,
                            offset: s + sub.len(),
                        });
                        from = s + sub.len();
                    }
                }
            }
        }
    }
    out
}

/// The rest of the shell segment starting at `site`, across continuations.
pub(crate) fn segment_from(doc: &Dockerfile, cmd: &Command, site: Site) -> String {
    let mut text = String::new();
    let mut line = site.line;
    let mut current = doc.line(line).and_then(|t| t.get(site.offset..)).unwrap_or_default();
    loop {
        text.push_str(current.trim_end().trim_end_matches('\\'));
        text.push(' ');
        if !continues(current) {
            break;
        }
        line += 1;
        while line <= cmd.end_line && doc.line(line).is_some_and(|t| is_comment(t) || t.trim().is_empty()) {
            line += 1;
        }
        match doc.line(line) {
            Some(next) if line <= cmd.end_line => current = next,
            _ => break,
        }
    }

    let end = ["&&", ";", "|"]
        .iter()
        .filter_map(|sep| text.find(sep))
        .min()
        .unwrap_or(text.len());
    text.truncate(end);
    text
}

fn has_separator(s: &str) -> bool {
    s.contains("&&") || s.contains(';') || s.contains('|')
}

/// Words of a segment, for flag checks.
pub(crate) fn words(segment: &str) -> impl Iterator<Item = &str> {
    segment.split_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::doc;

    #[test]
    fn finds_subcommand_sites_per_segment() {
        let d = doc("FROM x\nRUN apt-get update && apt-get install -q curl && apt-get install git\n");
        let cmd = d.command_containing(2).unwrap().unwrap().clone();
        let found = sites(&d, &cmd, &["apt-get"], Some("install"));
        assert_eq!(found.len(), 2);
        let text = d.line(2).unwrap();
        assert_eq!(&text[..found[0].offset], "RUN apt-get update && apt-get install");
    }

    #[test]
    fn segment_follows_continuations_and_stops_at_separator() {
        let d = doc("FROM x\nRUN apt-get install \\\n    # tools\n    -y curl \\\n    && rm -rf /tmp\n");
        let cmd = d.command_containing(2).unwrap().unwrap().clone();
        let site = sites(&d, &cmd, &["apt-get"], Some("install"))[0];
        let segment = segment_from(&d, &cmd, site);
        assert!(segment.contains("-y curl"));
        assert!(!segment.contains("rm"));
    }
}
