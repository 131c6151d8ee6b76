//! BDD harness (cucumber-rs).
//!
//! Test doubles shared by the scenarios: an analyzer that flags lines by
//! prefix and a probe that knows a fixed set of shells.

use anyhow::Context;
use camino::Utf8Path;
use dockfix_analyzer::{Analyzer, AnalyzerError};
use dockfix_resolver::{Probe, ProbeError, ProbeStep};
use dockfix_types::Defect;
use fs_err as fs;

#[derive(Debug, Clone)]
pub struct PrefixRule {
    pub code: String,
    pub prefix: String,
    /// The rule is satisfied when the previous line starts with this.
    pub unless_after: Option<String>,
}

/// Reports a code for every line whose trimmed text starts with a rule's prefix.
#[derive(Debug, Clone, Default)]
pub struct PrefixAnalyzer {
    pub rules: Vec<PrefixRule>,
}

impl PrefixAnalyzer {
    pub fn flag(&mut self, code: impl Into<String>, prefix: impl Into<String>) {
        self.rules.push(PrefixRule {
            code: code.into(),
            prefix: prefix.into(),
            unless_after: None,
        });
    }

    pub fn flag_unless_after(&mut self, code: impl Into<String>, prefix: impl Into<String>, guard: impl Into<String>) {
        self.rules.push(PrefixRule {
            code: code.into(),
            prefix: prefix.into(),
            unless_after: Some(guard.into()),
        });
    }
}

impl Analyzer for PrefixAnalyzer {
    fn analyze_file(&self, path: &Utf8Path) -> Result<Vec<Defect>, AnalyzerError> {
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
        let lines: Vec<&str> = text.lines().map(str::trim_start).collect();
        let mut out = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let previous = i.checked_sub(1).and_then(|p| lines.get(p)).copied().unwrap_or_default();
            for rule in &self.rules {
                let guarded = rule.unless_after.as_deref().is_some_and(|g| previous.starts_with(g));
                if line.starts_with(rule.prefix.as_str()) && !guarded {
                    out.push(Defect::new(i + 1, rule.code.as_str(), ""));
                }
            }
        }
        Ok(out)
    }
}

/// Accepts shell probes for `shells`, rejects package installs, and has no
/// os-release for any image.
#[derive(Debug, Clone, Default)]
pub struct ShellProbe {
    pub shells: Vec<String>,
}

impl Probe for ShellProbe {
    fn check(&self, image: &str, step: ProbeStep<'_>) -> Result<(), ProbeError> {
        match step {
            ProbeStep::Shell(shell) if self.shells.iter().any(|s| s == shell) => Ok(()),
            _ => Err(ProbeError::Rejected {
                message: format!("{step:?} fails in {image}"),
            }),
        }
    }

    fn os_release(&self, image: &str) -> Result<String, ProbeError> {
        Err(ProbeError::Rejected {
            message: format!("no os-release in {image}"),
        })
    }
}
