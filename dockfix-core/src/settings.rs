//! Clap-free settings for the repair pipeline.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use dockfix_domain::DEFAULT_MAX_PASSES;
use dockfix_registry::ResolverConfig;
use dockfix_types::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tempfile::TempDir;

/// External programs and their time limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub hadolint: String,
    pub docker: String,
    pub analyzer_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    /// Where analyzed copies are written. A fresh temp dir per run when unset.
    pub scratch_dir: Option<Utf8PathBuf>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            hadolint: "hadolint".to_string(),
            docker: "docker".to_string(),
            analyzer_timeout_secs: 60,
            probe_timeout_secs: 600,
            scratch_dir: None,
        }
    }
}

impl ToolSettings {
    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer_timeout_secs.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs.max(1))
    }

    /// The configured directory, or a fresh temp dir that lives as long as the handle.
    pub fn scratch_dir(&self) -> anyhow::Result<ScratchDir> {
        if let Some(dir) = &self.scratch_dir {
            return Ok(ScratchDir::Configured(dir.clone()));
        }
        let dir = tempfile::Builder::new()
            .prefix("dockfix-")
            .tempdir()
            .context("create scratch dir")?;
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|p| anyhow::anyhow!("scratch dir is not UTF-8: {}", p.display()))?;
        Ok(ScratchDir::Temporary { path, _dir: dir })
    }
}

/// Where the analyzer's copies go during one run.
#[derive(Debug)]
pub enum ScratchDir {
    /// Left in place after the run.
    Configured(Utf8PathBuf),
    /// Deleted on drop.
    Temporary { path: Utf8PathBuf, _dir: TempDir },
}

impl ScratchDir {
    pub fn path(&self) -> &Utf8Path {
        match self {
            ScratchDir::Configured(path) | ScratchDir::Temporary { path, .. } => path,
        }
    }
}

/// Settings for one repair run.
#[derive(Debug, Clone)]
pub struct RepairSettings {
    pub path: Utf8PathBuf,
    /// Pins and tags never postdate this.
    pub reference_date: NaiveDate,
    pub overwrite: bool,

    // Policy
    /// Dropped from every analysis.
    pub ignore: Vec<String>,
    /// When non-empty, only these codes are repaired.
    pub rules: Vec<String>,
    pub max_passes: usize,

    // Output
    pub write_patch: bool,
    pub write_report: bool,

    pub tools: ToolSettings,
    pub registry: ResolverConfig,
    /// Retries for analyzer and probe invocations.
    pub retry: RetryPolicy,
}

impl RepairSettings {
    pub fn new(path: impl Into<Utf8PathBuf>, reference_date: NaiveDate) -> Self {
        Self {
            path: path.into(),
            reference_date,
            overwrite: false,
            ignore: Vec::new(),
            rules: Vec::new(),
            max_passes: DEFAULT_MAX_PASSES,
            write_patch: true,
            write_report: true,
            tools: ToolSettings::default(),
            registry: ResolverConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::for_input(&self.path, self.overwrite)
    }
}

/// Where a run writes its results, all derived from the input path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub repaired: Utf8PathBuf,
    pub patch: Utf8PathBuf,
    pub report_json: Utf8PathBuf,
    pub report_md: Utf8PathBuf,
}

impl ArtifactPaths {
    pub fn for_input(path: &Utf8Path, overwrite: bool) -> Self {
        let sibling = |suffix: &str| Utf8PathBuf::from(format!("{path}{suffix}"));
        Self {
            repaired: if overwrite { path.to_path_buf() } else { sibling("-fixed") },
            patch: sibling("-fix.diff"),
            report_json: sibling("-fix.json"),
            report_md: sibling("-fix.md"),
        }
    }
}
