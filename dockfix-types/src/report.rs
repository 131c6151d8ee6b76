use camino::Utf8PathBuf;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    pub path: Utf8PathBuf,

    /// The date the file was last known to be correct; pins never postdate it.
    pub reference_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<Utf8PathBuf>,
}

/// What happened to one defect occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Applied,
    /// The strategy ran and found nothing to change.
    Unchanged,
    /// The expected pattern or registry data was missing.
    Skipped,
    /// The strategy errored or left the file unparseable and was rolled back.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixRecord {
    /// 1-based engine pass the attempt happened in.
    pub pass: usize,
    pub line: usize,
    pub code: String,
    pub status: FixStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairCounts {
    pub applied: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl RepairCounts {
    pub fn from_records(records: &[FixRecord]) -> Self {
        let mut counts = Self::default();
        for r in records {
            match r.status {
                FixStatus::Applied => counts.applied += 1,
                FixStatus::Unchanged => counts.unchanged += 1,
                FixStatus::Skipped => counts.skipped += 1,
                FixStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn attempted(&self) -> u64 {
        self.applied + self.unchanged + self.skipped + self.failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// The analyzer reported nothing.
    Clean,
    Pass,
    Warn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportVerdict {
    pub status: ReportStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

/// Report written next to a repaired Dockerfile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunInfo,
    pub input: InputInfo,
    pub verdict: ReportVerdict,

    #[serde(default)]
    pub passes: usize,

    #[serde(default)]
    pub counts: RepairCounts,

    /// True when the repaired content differs from the input.
    #[serde(default)]
    pub changed: bool,

    #[serde(default)]
    pub results: Vec<FixRecord>,
}

impl RepairReport {
    pub fn new(tool: ToolInfo, run: RunInfo, input: InputInfo) -> Self {
        Self {
            schema: crate::schema::DOCKFIX_REPORT_V1.to_string(),
            tool,
            run,
            input,
            verdict: ReportVerdict {
                status: ReportStatus::Clean,
                reasons: vec![],
            },
            passes: 0,
            counts: RepairCounts::default(),
            changed: false,
            results: vec![],
        }
    }

    /// Fills results, counts and verdict from the engine's records.
    pub fn with_results(mut self, passes: usize, results: Vec<FixRecord>) -> Self {
        self.counts = RepairCounts::from_records(&results);
        self.passes = passes;

        let mut reasons = Vec::new();
        if self.counts.skipped > 0 {
            reasons.push(format!("{} defect(s) skipped", self.counts.skipped));
        }
        if self.counts.failed > 0 {
            reasons.push(format!("{} defect(s) failed", self.counts.failed));
        }
        let status = if results.is_empty() {
            ReportStatus::Clean
        } else if reasons.is_empty() {
            ReportStatus::Pass
        } else {
            ReportStatus::Warn
        };

        self.verdict = ReportVerdict { status, reasons };
        self.results = results;
        self
    }
}
