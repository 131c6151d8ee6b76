mod config;
mod explain;

use anyhow::Context;
use camino::Utf8PathBuf;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use config::{ConfigMerger, FixOverrides};
use dockfix_core::adapters::{DockerProbe, FsWritePort, HadolintAnalyzer};
use dockfix_core::{ToolError, run_repair, write_repair_artifacts};
use dockfix_domain::builtin_strategy_metas;
use dockfix_registry::UreqTransport;
use dockfix_types::report::ToolInfo;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Parser)]
#[command(
    name = "dockfix",
    version,
    about = "Repairs hadolint-reported Dockerfile smells, pinning versions as of a date."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Repair one Dockerfile and write the result next to it.
    Fix(FixArgs),
    /// List every hadolint code dockfix can repair.
    ListFixes(ListFixesArgs),
    /// Explain what the repair for one code does and what it needs.
    Explain(ExplainArgs),
}

#[derive(Debug, Parser)]
struct FixArgs {
    /// Dockerfile to repair.
    #[arg(long)]
    path: Utf8PathBuf,

    /// Date the file last built correctly (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    last_edit: Option<NaiveDate>,

    /// Replace the input instead of writing `<path>-fixed`.
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Hadolint code to drop from every analysis.
    #[arg(long)]
    ignore: Vec<String>,

    /// Only repair these codes.
    #[arg(long)]
    rule: Vec<String>,

    /// Give up after this many engine passes.
    #[arg(long)]
    max_passes: Option<usize>,

    /// Config file (default: dockfix.toml next to the Dockerfile or in the current directory).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Do not write `<path>-fix.diff`.
    #[arg(long, default_value_t = false)]
    no_patch: bool,

    /// Do not write `<path>-fix.json` and `<path>-fix.md`.
    #[arg(long, default_value_t = false)]
    no_report: bool,
}

#[derive(Debug, Parser)]
struct ExplainArgs {
    /// Hadolint code, e.g. DL3008.
    code: String,
}

#[derive(Debug, Parser)]
struct ListFixesArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Fix(args) => cmd_fix(args),
        Command::ListFixes(args) => cmd_list_fixes(args),
        Command::Explain(args) => cmd_explain(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = e.downcast_ref::<ToolError>().map(ToolError::exit_code).unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn cmd_fix(args: FixArgs) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("read current directory")?;
    let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|p| anyhow::anyhow!("non UTF-8 working directory {}", p.display()))?;

    let file_config = config::load_or_default(args.config.as_deref(), &args.path, &cwd).context("load dockfix.toml config")?;
    let reference_date = args.last_edit.unwrap_or_else(|| Utc::now().date_naive());
    let overrides = FixOverrides {
        ignore: args.ignore,
        rules: args.rule,
        max_passes: args.max_passes,
        overwrite: args.overwrite,
        no_patch: args.no_patch,
        no_report: args.no_report,
    };
    let settings = ConfigMerger::new(file_config).merge_fix_args(args.path, reference_date, &overrides);
    debug!(
        "merged config: ignore={:?}, rules={:?}, max_passes={}, overwrite={}",
        settings.ignore, settings.rules, settings.max_passes, settings.overwrite
    );

    let analyzer = HadolintAnalyzer::new(&settings.tools, settings.retry.clone());
    let probe = DockerProbe::new(&settings.tools, settings.retry.clone());
    let transport = UreqTransport::new(&settings.registry);

    let outcome = run_repair(&settings, &analyzer, &transport, &probe, tool_info())?;
    if outcome.clean {
        println!("{}: clean, nothing to repair", settings.path);
        return Ok(());
    }

    let written = write_repair_artifacts(&outcome, &settings, &FsWritePort)?;
    let counts = &outcome.report.counts;
    println!(
        "{}: {} applied, {} unchanged, {} skipped, {} failed in {} pass(es)",
        settings.path, counts.applied, counts.unchanged, counts.skipped, counts.failed, outcome.report.passes
    );
    for path in &written {
        println!("  wrote {}", path);
    }
    info!("wrote {} artifact(s) for {}", written.len(), settings.path);
    Ok(())
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "dockfix".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    }
}

fn cmd_explain(args: ExplainArgs) -> anyhow::Result<()> {
    use explain::{list_fix_codes, lookup_fix, requirements};

    let Some((meta, fix)) = lookup_fix(&args.code) else {
        let available = list_fix_codes().join(", ");
        anyhow::bail!("Unknown code: '{}'\n\nRepairable codes: {}", args.code, available);
    };

    println!("================================================================================");
    println!("{}: {}", meta.code, meta.title);
    println!("================================================================================");
    println!();
    println!("Changes line count: {}", if meta.changes_layout { "yes" } else { "no" });
    println!("Needs:              {}", requirements(&meta));
    println!();

    println!("RATIONALE");
    println!("--------------------------------------------------------------------------------");
    println!("{}", fix.rationale);
    println!();

    println!("REMEDIATION");
    println!("--------------------------------------------------------------------------------");
    println!("{}", fix.remediation);
    println!();

    Ok(())
}

fn cmd_list_fixes(args: ListFixesArgs) -> anyhow::Result<()> {
    let metas = builtin_strategy_metas();
    match args.format {
        OutputFormat::Text => {
            println!("Repairable codes:\n");
            println!("  {:<8} {:<8} TITLE", "CODE", "LAYOUT");
            println!("  {:<8} {:<8} -----", "----", "------");
            for meta in &metas {
                let layout = if meta.changes_layout { "dirty" } else { "inline" };
                println!("  {:<8} {:<8} {}", meta.code, layout, meta.title);
            }
            println!();
            println!("Use 'dockfix explain <code>' for details.");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&metas)?);
        }
    }
    Ok(())
}
