use super::options::sites;
use super::{FixOutcome, Strategy, StrategyContext, StrategyMeta, command_at};
use crate::error::StrategyError;
use dockfix_edit::parser::INSTRUCTIONS;
use dockfix_edit::text::{continues, is_comment};
use dockfix_edit::{Command, Dockerfile};
use dockfix_resolver::PinOutcome;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// DL3008: unpinned packages in `apt-get install`.
///
/// Each package is pinned to the newest stable version published before the
/// reference date, widened to a wildcard when the exact version no longer
/// installs in the base image.
pub struct AptPin;

/// Options whose value is the following word.
const VALUE_OPTIONS: &[&str] = &["-o", "-t", "-c", "--target-release", "--option", "--config-file"];

/// A package name as it appears in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PackageWord {
    line: usize,
    start: usize,
    name: String,
}

impl AptPin {
    const CODE: &'static str = "DL3008";

    fn unpinned_packages(doc: &Dockerfile, cmd: &Command, name: &Regex) -> (usize, Vec<PackageWord>) {
        let installs = sites(doc, cmd, &["apt-get"], Some("install"));
        let mut out = Vec::new();

        for site in &installs {
            let mut line = site.line;
            let mut offset = site.offset;
            let mut skip_next = false;
            let mut in_substitution = false;

            'scan: loop {
                let text = doc.line(line).unwrap_or_default();
                for (start, raw) in words_from(text, offset) {
                    let word = raw.trim_end_matches('\\');
                    if word.is_empty() {
                        continue;
                    }
                    if in_substitution {
                        in_substitution = !(word.ends_with('`') || word.ends_with(')'));
                        continue;
                    }
                    if word.contains(';') || word.contains('&') || word.contains('|') || INSTRUCTIONS.contains(&word) {
                        break 'scan;
                    }
                    if skip_next {
                        skip_next = false;
                        continue;
                    }
                    if word.starts_with('`') || word.starts_with("$(") {
                        in_substitution = !(word.len() > 1 && (word.ends_with('`') || word.ends_with(')')));
                        continue;
                    }
                    if VALUE_OPTIONS.contains(&word) {
                        skip_next = true;
                        continue;
                    }
                    if word.starts_with('-') || word.contains('=') || !name.is_match(word) {
                        continue;
                    }
                    out.push(PackageWord {
                        line,
                        start,
                        name: word.to_string(),
                    });
                }

                if !continues(text) {
                    break;
                }
                line += 1;
                while line <= cmd.end_line && doc.line(line).is_some_and(|t| is_comment(t) || t.trim().is_empty()) {
                    line += 1;
                }
                if line > cmd.end_line {
                    break;
                }
                offset = 0;
            }
        }
        (installs.len(), out)
    }
}

/// Whitespace-separated words of `text[from..]` with their byte offsets.
fn words_from(text: &str, from: usize) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < from) {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((s, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }
    out
}

impl Strategy for AptPin {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            code: Self::CODE,
            title: "Pin versions in apt-get install",
            changes_layout: false,
            needs_registry: true,
            needs_probe: true,
        }
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        let cmd = command_at(doc, line, Self::CODE, &["RUN"], "a RUN instruction")?;
        if cmd.json_form {
            return Err(StrategyError::PatternMismatch {
                code: Self::CODE,
                line,
                expected: "a shell-form RUN",
            });
        }
        let image = doc.base_image_of(cmd.start_line)?.ok_or(StrategyError::PatternMismatch {
            code: Self::CODE,
            line,
            expected: "a FROM before the RUN",
        })?;

        let name = Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9.+-]*$")?;
        let (installs, packages) = Self::unpinned_packages(doc, &cmd, &name);
        if installs == 0 {
            return Err(StrategyError::PatternMismatch {
                code: Self::CODE,
                line,
                expected: "apt-get install",
            });
        }
        if packages.is_empty() {
            return Ok(FixOutcome::Unchanged("every package is already pinned".into()));
        }

        let as_of = doc.reference_date();
        let mut edits: BTreeMap<usize, Vec<(usize, usize, String)>> = BTreeMap::new();
        let mut first_failure = None;
        for package in &packages {
            match ctx.resolver.graduated_pin(&image, &package.name, as_of) {
                PinOutcome::Pinned { reference, level } => {
                    debug!(package = %package.name, %reference, %level, "pinned");
                    edits
                        .entry(package.line)
                        .or_default()
                        .push((package.start, package.name.len(), reference));
                }
                PinOutcome::Unpinned { reason, .. } => {
                    warn!(package = %package.name, %image, %reason, "package left unpinned");
                    first_failure.get_or_insert(reason);
                }
            }
        }

        if edits.is_empty() {
            return Err(StrategyError::Unresolved {
                code: Self::CODE,
                line,
                reason: first_failure.map(|r| r.to_string()).unwrap_or_default(),
            });
        }

        for (l, mut line_edits) in edits {
            let mut text = doc.line(l).unwrap_or_default().to_string();
            line_edits.sort_unstable_by(|a, b| b.0.cmp(&a.0));
            for (start, len, reference) in line_edits {
                text.replace_range(start..start + len, &reference);
            }
            doc.set_line(l, text)?;
        }
        Ok(FixOutcome::Applied)
    }
}
