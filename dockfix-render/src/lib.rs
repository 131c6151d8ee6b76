//! Rendering helpers (markdown) for human-readable artifacts.

use dockfix_types::report::{FixStatus, RepairReport, ReportStatus};

pub fn render_report_md(report: &RepairReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("# dockfix report: `{}`\n\n", report.input.path));
    out.push_str(&format!("- Verdict: `{}`\n", verdict_label(report.verdict.status)));
    out.push_str(&format!("- Reference date: {}\n", report.input.reference_date));
    if let Some(output) = &report.input.output_path {
        out.push_str(&format!("- Output: `{}`\n", output));
    }
    out.push_str(&format!("- Passes: {}\n", report.passes));
    out.push_str(&format!(
        "- Applied: {}\n- Unchanged: {}\n- Skipped: {}\n- Failed: {}\n",
        report.counts.applied, report.counts.unchanged, report.counts.skipped, report.counts.failed
    ));
    out.push_str(&format!("- Changed: {}\n", if report.changed { "yes" } else { "no" }));

    if !report.verdict.reasons.is_empty() {
        out.push_str("\n**Reasons**\n\n");
        for reason in &report.verdict.reasons {
            out.push_str(&format!("- {}\n", reason));
        }
    }

    out.push_str("\n## Results\n\n");
    if report.results.is_empty() {
        out.push_str("_No defects reported._\n");
        return out;
    }

    out.push_str("| Pass | Line | Code | Status | Message |\n");
    out.push_str("|---:|---:|---|---|---|\n");
    for r in &report.results {
        out.push_str(&format!(
            "| {} | {} | `{}` | {} | {} |\n",
            r.pass,
            r.line,
            r.code,
            status_label(r.status),
            r.message.as_deref().map(escape_cell).unwrap_or_default()
        ));
    }

    out
}

fn verdict_label(s: ReportStatus) -> &'static str {
    match s {
        ReportStatus::Clean => "clean",
        ReportStatus::Pass => "pass",
        ReportStatus::Warn => "warn",
    }
}

fn status_label(s: FixStatus) -> &'static str {
    match s {
        FixStatus::Applied => "applied",
        FixStatus::Unchanged => "unchanged",
        FixStatus::Skipped => "skipped",
        FixStatus::Failed => "failed",
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
