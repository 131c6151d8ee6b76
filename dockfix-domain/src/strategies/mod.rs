//! One repair per analyzer rule.

use crate::error::StrategyError;
use dockfix_edit::{Command, Dockerfile};
use dockfix_resolver::Resolve;
use serde::Serialize;

mod add_to_copy;
mod apt_assume_yes;
mod apt_clean;
mod apt_no_recommends;
mod apt_pin;
mod base_image_tag;
mod cd_workdir;
mod exec_form;
mod label_keys;
mod maintainer_label;
mod options;
mod pip_no_cache;
mod pipefail_shell;
mod run_merge;
mod wget_progress;

#[cfg(test)]
pub(crate) mod testing;

/// Static description of a strategy, used by `list-fixes` and `explain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrategyMeta {
    pub code: &'static str,
    pub title: &'static str,
    /// The fix may change the line count and force a re-analysis.
    pub changes_layout: bool,
    pub needs_registry: bool,
    pub needs_probe: bool,
}

/// What a strategy did with one defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    Applied,
    /// Applied, and `code` should not be reported by later analyses.
    AppliedSuppressing(String),
    /// Nothing to do; the reason is logged and recorded.
    Unchanged(String),
}

/// Collaborators a strategy may consult besides the document.
#[derive(Clone, Copy)]
pub struct StrategyContext<'a> {
    pub resolver: &'a dyn Resolve,
}

pub trait Strategy {
    fn meta(&self) -> StrategyMeta;

    /// Repairs the defect reported at `line`.
    ///
    /// The document's command map is current when this is called. A strategy
    /// must leave lines that still parse.
    fn fix(&self, doc: &mut Dockerfile, line: usize, ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError>;
}

pub fn builtin_strategies() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(cd_workdir::CdToWorkdir),
        Box::new(base_image_tag::BaseImageTag),
        Box::new(apt_pin::AptPin),
        Box::new(apt_clean::AptListsCleanup),
        Box::new(apt_assume_yes::AptAssumeYes),
        Box::new(apt_no_recommends::AptNoRecommends),
        Box::new(add_to_copy::AddToCopy),
        Box::new(exec_form::ExecForm),
        Box::new(pip_no_cache::PipNoCache),
        Box::new(wget_progress::WgetProgress),
        Box::new(label_keys::LabelKeys),
        Box::new(run_merge::RunMerge),
        Box::new(maintainer_label::MaintainerLabel),
        Box::new(pipefail_shell::PipefailShell),
    ]
}

/// The command spanning `line`, if it is one of `names`.
pub(crate) fn command_at(
    doc: &Dockerfile,
    line: usize,
    code: &'static str,
    names: &[&str],
    expected: &'static str,
) -> Result<Command, StrategyError> {
    doc.command_containing(line)?
        .filter(|c| names.iter().any(|n| c.is(n)))
        .cloned()
        .ok_or(StrategyError::PatternMismatch { code, line, expected })
}

/// Leading whitespace of `line`, verbatim.
pub(crate) fn leading_ws(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Replaces the instruction keyword at the start of `line`.
pub(crate) fn replace_keyword(line: &str, keyword: &str, replacement: &str) -> Option<String> {
    let indent = leading_ws(line);
    let rest = &line[indent.len()..];
    let head = rest.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    Some(format!("{indent}{replacement}{}", &rest[keyword.len()..]))
}

/// Strips a trailing `;` and appends `suffix`.
pub(crate) fn chain_line(line: &str, suffix: &str) -> String {
    let trimmed = line.trim_end();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    format!("{trimmed}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn builtin_codes_are_unique() {
        let codes: Vec<_> = builtin_strategies().iter().map(|s| s.meta().code).collect();
        let unique: BTreeSet<_> = codes.iter().collect();
        assert_eq!(codes.len(), unique.len());
        assert_eq!(codes.len(), 14);
    }

    #[test]
    fn keyword_replacement_keeps_indent_and_case_insensitive() {
        assert_eq!(replace_keyword("  add a /a", "ADD", "COPY").as_deref(), Some("  COPY a /a"));
        assert_eq!(replace_keyword("RUN x", "ADD", "COPY"), None);
    }

    #[test]
    fn chaining_drops_trailing_semicolon() {
        assert_eq!(chain_line("    make install;  ", " \\"), "    make install \\");
    }
}
