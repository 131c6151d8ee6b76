//! The repair pipeline, extracted from the CLI.
//!
//! `run_repair` works entirely in memory apart from the analyzer's scratch
//! copies; persisting the outcome goes through [`WritePort`].

use crate::ports::WritePort;
use crate::settings::{ArtifactPaths, RepairSettings};
use anyhow::Context;
use chrono::Utc;
use dockfix_analyzer::{AnalysisSession, Analyzer};
use dockfix_domain::{EngineConfig, EngineError, RepairEngine};
use dockfix_edit::{Dockerfile, EditError, render_patch};
use dockfix_registry::HttpTransport;
use dockfix_render::render_report_md;
use dockfix_resolver::{Probe, VersionResolver};
use dockfix_types::report::{InputInfo, RepairReport, RunInfo, ToolInfo};
use fs_err as fs;
use std::collections::BTreeSet;
use tracing::info;

/// Error type for pipeline results. Exit code 2 = input rejected, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("not a Dockerfile: {0}")]
    NotABuildFile(String),

    #[error("analyzer rejected the file: {code} at line {line}: {message}")]
    Rejected {
        code: String,
        line: usize,
        message: String,
    },

    #[error("no fixpoint after {max_passes} passes")]
    PassLimit { max_passes: usize },

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::NotABuildFile(_) | ToolError::Rejected { .. } => 2,
            ToolError::PassLimit { .. } | ToolError::Internal(_) => 1,
        }
    }
}

impl From<EditError> for ToolError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::NotABuildFile(parse) => ToolError::NotABuildFile(parse.to_string()),
            EditError::Runtime(e) => ToolError::Internal(e),
            other => ToolError::Internal(other.into()),
        }
    }
}

impl From<EngineError> for ToolError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Rejected { code, line, message } => ToolError::Rejected { code, line, message },
            EngineError::PassLimitExceeded { max_passes } => ToolError::PassLimit { max_passes },
            EngineError::Edit(e) => e.into(),
            other => ToolError::Internal(other.into()),
        }
    }
}

/// Outcome of `run_repair`.
#[derive(Debug)]
pub struct RepairOutcome {
    pub report: RepairReport,
    pub original: String,
    pub repaired: String,
    pub patch: String,
    /// The first analysis found nothing; no artifact should be written.
    pub clean: bool,
    pub paths: ArtifactPaths,
}

impl RepairOutcome {
    pub fn changed(&self) -> bool {
        self.original != self.repaired
    }
}

/// Repairs the Dockerfile named by `settings` and returns the result.
///
/// Nothing is written next to the input; see [`write_repair_artifacts`].
pub fn run_repair(
    settings: &RepairSettings,
    analyzer: &dyn Analyzer,
    transport: &dyn HttpTransport,
    probe: &dyn Probe,
    tool: ToolInfo,
) -> Result<RepairOutcome, ToolError> {
    let started_at = Utc::now();
    let paths = settings.artifact_paths();

    let mut doc = Dockerfile::load(&settings.path, settings.reference_date)?;
    let original = doc.contents();

    let ignored: BTreeSet<String> = settings.ignore.iter().cloned().collect();
    let scratch = settings.tools.scratch_dir()?;
    let session = AnalysisSession::new(analyzer, scratch.path().to_path_buf(), ignored.clone());
    let resolver = VersionResolver::new(transport, probe, &settings.registry);
    let engine = RepairEngine::new(EngineConfig {
        max_passes: settings.max_passes,
        rules: settings.rules.iter().cloned().collect(),
        excluded: ignored,
    });

    let summary = engine.run(&mut doc, &session, &resolver)?;

    let repaired = doc.contents();
    let clean = summary.initial_defects == 0;
    let display = settings.path.file_name().unwrap_or(settings.path.as_str());
    let patch = render_patch(display, &original, &repaired);

    let run = RunInfo {
        started_at,
        ended_at: Some(Utc::now()),
    };
    let input = InputInfo {
        path: settings.path.clone(),
        reference_date: settings.reference_date,
        output_path: (!clean).then(|| paths.repaired.clone()),
    };
    let mut report = RepairReport::new(tool, run, input).with_results(summary.passes, summary.records);
    report.changed = original != repaired;

    info!(
        path = %settings.path,
        passes = report.passes,
        applied = report.counts.applied,
        changed = report.changed,
        clean,
        "repair complete"
    );

    Ok(RepairOutcome {
        report,
        original,
        repaired,
        patch,
        clean,
        paths,
    })
}

/// Writes the repaired file, the patch and the reports.
///
/// A clean input produces no files at all.
pub fn write_repair_artifacts(
    outcome: &RepairOutcome,
    settings: &RepairSettings,
    writer: &dyn WritePort,
) -> anyhow::Result<Vec<camino::Utf8PathBuf>> {
    let mut written = Vec::new();
    if outcome.clean {
        return Ok(written);
    }
    let paths = &outcome.paths;

    writer.write_file(&paths.repaired, outcome.repaired.as_bytes())?;
    written.push(paths.repaired.clone());

    if settings.write_patch {
        writer.write_file(&paths.patch, outcome.patch.as_bytes())?;
        written.push(paths.patch.clone());
    }

    if settings.write_report {
        let json = serde_json::to_string_pretty(&outcome.report).context("serialize report")?;
        writer.write_file(&paths.report_json, json.as_bytes())?;
        written.push(paths.report_json.clone());

        let md = render_report_md(&outcome.report);
        writer.write_file(&paths.report_md, md.as_bytes())?;
        written.push(paths.report_md.clone());
    }

    Ok(written)
}
