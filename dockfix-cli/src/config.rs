//! Configuration file loading for dockfix.
//!
//! Discovers `dockfix.toml` next to the Dockerfile, then in the working
//! directory, and merges it with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use dockfix_core::{RepairSettings, ToolSettings};
use dockfix_registry::ResolverConfig;
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "dockfix.toml";

/// Top-level configuration from dockfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DockfixConfig {
    pub policy: PolicyConfig,
    /// Registry endpoints, paging and retry.
    pub registry: ResolverConfig,
    /// External programs and their time limits.
    pub tools: ToolSettings,
    pub output: OutputConfig,
}

/// Policy section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Codes dropped from every analysis.
    pub ignore: Vec<String>,

    /// If non-empty, only these codes are repaired.
    pub rules: Vec<String>,

    pub max_passes: Option<usize>,

    /// Replace the input instead of writing `<path>-fixed`.
    pub overwrite: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub patch: bool,
    pub report: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            patch: true,
            report: true,
        }
    }
}

/// Discover the dockfix.toml config file.
///
/// The Dockerfile's directory wins over `cwd`. Returns `None` when neither has one.
pub fn discover_config(dockerfile: &Utf8Path, cwd: &Utf8Path) -> Option<Utf8PathBuf> {
    let beside = dockerfile
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or(cwd)
        .join(CONFIG_FILE_NAME);
    let candidates = [beside, cwd.join(CONFIG_FILE_NAME)];
    let found = candidates.into_iter().find(|c| c.is_file());
    match &found {
        Some(path) => debug!("found config file at {}", path),
        None => debug!("no {} next to {} or in {}", CONFIG_FILE_NAME, dockerfile, cwd),
    }
    found
}

/// Load and parse a dockfix.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<DockfixConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<DockfixConfig> {
    let config: DockfixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config, a discovered one, or the defaults.
///
/// An explicit path that does not exist is an error; discovery never is.
pub fn load_or_default(explicit: Option<&Utf8Path>, dockerfile: &Utf8Path, cwd: &Utf8Path) -> anyhow::Result<DockfixConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(dockerfile, cwd) {
        Some(path) => load_config(&path),
        None => Ok(DockfixConfig::default()),
    }
}

/// `fix` arguments that can override the config file.
#[derive(Debug, Clone, Default)]
pub struct FixOverrides {
    pub ignore: Vec<String>,
    pub rules: Vec<String>,
    pub max_passes: Option<usize>,
    pub overwrite: bool,
    pub no_patch: bool,
    pub no_report: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: DockfixConfig,
}

impl ConfigMerger {
    pub fn new(config: DockfixConfig) -> Self {
        Self { config }
    }

    /// Merge with `fix` arguments into pipeline settings.
    ///
    /// CLI code lists extend the config file lists. CLI flags can only turn
    /// behavior on (`--overwrite`) or off (`--no-patch`, `--no-report`).
    pub fn merge_fix_args(self, path: Utf8PathBuf, reference_date: NaiveDate, cli: &FixOverrides) -> RepairSettings {
        let DockfixConfig {
            policy,
            registry,
            tools,
            output,
        } = self.config;

        let mut settings = RepairSettings::new(path, reference_date);
        settings.ignore = union(policy.ignore, &cli.ignore);
        settings.rules = union(policy.rules, &cli.rules);
        if let Some(max) = cli.max_passes.or(policy.max_passes) {
            settings.max_passes = max;
        }
        settings.overwrite = cli.overwrite || policy.overwrite;
        settings.write_patch = output.patch && !cli.no_patch;
        settings.write_report = output.report && !cli.no_report;
        settings.retry = registry.retry.clone();
        settings.registry = registry;
        settings.tools = tools;
        settings
    }
}

fn union(mut base: Vec<String>, extra: &[String]) -> Vec<String> {
    for code in extra {
        if !base.contains(code) {
            base.push(code.clone());
        }
    }
    base
}
