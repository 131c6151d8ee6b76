use camino::Utf8PathBuf;
use chrono::NaiveDate;
use cucumber::gherkin::Step;
use cucumber::{World, given, then, when};
use dockfix_bdd::{PrefixAnalyzer, ShellProbe};
use dockfix_core::adapters::FsWritePort;
use dockfix_core::{RepairOutcome, RepairSettings, run_repair, write_repair_artifacts};
use dockfix_registry::{HttpResponse, MemoryTransport, ResolverConfig};
use dockfix_types::report::{FixStatus, ToolInfo};
use fs_err as fs;
use tempfile::TempDir;

const HUB: &str = "http://hub.test";

#[derive(Debug, Default, World)]
pub struct DockfixWorld {
    temp: Option<TempDir>,
    dockerfile: Option<Utf8PathBuf>,
    analyzer: PrefixAnalyzer,
    probe: ShellProbe,
    routes: Vec<(String, HttpResponse)>,
    registry_down: bool,
    rules: Vec<String>,
    outcome: Option<RepairOutcome>,
    failure: Option<(i32, String)>,
    written: Vec<Utf8PathBuf>,
}

fn dockerfile(world: &DockfixWorld) -> &Utf8PathBuf {
    world.dockerfile.as_ref().expect("dockerfile set")
}

fn outcome(world: &DockfixWorld) -> &RepairOutcome {
    match (&world.outcome, &world.failure) {
        (Some(outcome), _) => outcome,
        (None, Some((code, message))) => panic!("repair failed with exit code {code}: {message}"),
        (None, None) => panic!("repair has not run"),
    }
}

/// Docstring text with the surrounding blank lines removed and a final newline.
fn docstring(step: &Step) -> String {
    let raw = step.docstring.as_deref().expect("step has a docstring");
    format!("{}\n", raw.trim_matches('\n'))
}

fn status_name(status: FixStatus) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .expect("status serializes to a string")
}

fn tags_url(image: &str) -> String {
    format!("{HUB}/v2/repositories/library/{image}/tags/?page_size=25&page=1&ordering=last_updated")
}

#[given("a Dockerfile:")]
async fn a_dockerfile(world: &mut DockfixWorld, step: &Step) {
    let td = tempfile::tempdir().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
    let path = root.join("Dockerfile");
    fs::write(&path, docstring(step)).unwrap();

    world.temp = Some(td);
    world.dockerfile = Some(path);
}

#[given(expr = "the analyzer reports {string} on lines starting with {string}")]
async fn analyzer_reports(world: &mut DockfixWorld, code: String, prefix: String) {
    world.analyzer.flag(code, prefix);
}

#[given(expr = "the analyzer reports {string} on lines starting with {string} unless after {string}")]
async fn analyzer_reports_unless_after(world: &mut DockfixWorld, code: String, prefix: String, guard: String) {
    world.analyzer.flag_unless_after(code, prefix, guard);
}

#[given(expr = "Docker Hub lists tag {string} for {string} with the digest of latest")]
async fn hub_lists_tag(world: &mut DockfixWorld, tag: String, image: String) {
    let digest = "sha256:5a1b7c";
    let body = serde_json::json!({
        "count": 3,
        "next": null,
        "results": [
            {
                "name": "mainline",
                "tag_last_pushed": "2022-05-20T10:00:00Z",
                "images": [{ "architecture": "amd64", "os": "linux", "digest": digest }]
            },
            {
                "name": tag,
                "tag_last_pushed": "2022-05-20T10:00:00Z",
                "images": [{ "architecture": "amd64", "os": "linux", "digest": digest }]
            },
            {
                "name": "latest",
                "tag_last_pushed": "2022-05-20T10:00:00Z",
                "images": [
                    { "architecture": "arm64", "os": "linux", "digest": "sha256:ffee01" },
                    { "architecture": "amd64", "os": "linux", "digest": digest }
                ]
            }
        ]
    });
    world.routes.push((tags_url(&image), HttpResponse::ok(body.to_string())));
}

#[given("the registry is unreachable")]
async fn registry_unreachable(world: &mut DockfixWorld) {
    world.registry_down = true;
}

#[given(expr = "the probe finds {string}")]
async fn probe_finds(world: &mut DockfixWorld, shell: String) {
    world.probe.shells.push(shell);
}

#[given(expr = "only rule {string} is selected")]
async fn only_rule(world: &mut DockfixWorld, code: String) {
    world.rules.push(code);
}

#[when(expr = "I repair it as of {string}")]
async fn repair_as_of(world: &mut DockfixWorld, date: String) {
    let reference_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").expect("YYYY-MM-DD date");
    let path = dockerfile(world).clone();
    let scratch = path.parent().expect("dockerfile has a parent").join("scratch");

    let mut settings = RepairSettings::new(path, reference_date);
    settings.rules = world.rules.clone();
    settings.tools.scratch_dir = Some(scratch);
    settings.registry = ResolverConfig {
        hub_url: HUB.to_string(),
        ..ResolverConfig::default()
    }
    .without_delays();
    settings.retry = settings.registry.retry.clone();

    let transport = if world.registry_down {
        MemoryTransport::new(|_| Ok(HttpResponse::status(503)))
    } else {
        MemoryTransport::routes(world.routes.clone())
    };
    let tool = ToolInfo {
        name: "dockfix".to_string(),
        version: None,
    };

    match run_repair(&settings, &world.analyzer, &transport, &world.probe, tool) {
        Ok(outcome) => {
            world.written = write_repair_artifacts(&outcome, &settings, &FsWritePort).expect("write artifacts");
            world.outcome = Some(outcome);
        }
        Err(err) => {
            world.failure = Some((err.exit_code(), err.to_string()));
        }
    }
}

#[then("the repaired Dockerfile is:")]
async fn repaired_dockerfile_is(world: &mut DockfixWorld, step: &Step) {
    let expected = docstring(step);
    let outcome = outcome(world);
    assert_eq!(outcome.repaired, expected);

    if outcome.changed() {
        let on_disk = fs::read_to_string(&outcome.paths.repaired).unwrap();
        assert_eq!(on_disk, expected);
    }
}

#[then(expr = "the report records {string} as {string}")]
async fn report_records(world: &mut DockfixWorld, code: String, status: String) {
    let report = &outcome(world).report;
    let statuses: Vec<String> = report
        .results
        .iter()
        .filter(|r| r.code == code)
        .map(|r| status_name(r.status))
        .collect();
    assert!(
        statuses.contains(&status),
        "expected {code} recorded as {status}, got {statuses:?}"
    );
}

#[then(expr = "the report verdict is {string}")]
async fn report_verdict(world: &mut DockfixWorld, expected: String) {
    let status = serde_json::to_value(outcome(world).report.verdict.status).unwrap();
    assert_eq!(status, serde_json::Value::String(expected));
}

#[then(expr = "the run took {int} pass")]
async fn run_took_passes(world: &mut DockfixWorld, passes: usize) {
    assert_eq!(outcome(world).report.passes, passes);
}

#[then("the run reports the file as clean")]
async fn run_is_clean(world: &mut DockfixWorld) {
    let outcome = outcome(world);
    assert!(outcome.clean, "expected a clean run, got {:?}", outcome.report.results);
    assert!(!outcome.changed());
}

#[then(expr = "the run fails with exit code {int}")]
async fn run_fails_with(world: &mut DockfixWorld, code: i32) {
    let (actual, message) = world.failure.as_ref().expect("repair should have failed");
    assert_eq!(*actual, code, "unexpected exit code for: {message}");
}

#[then("the artifacts are written next to the input")]
async fn artifacts_written(world: &mut DockfixWorld) {
    let path = dockerfile(world);
    for suffix in ["-fixed", "-fix.diff", "-fix.json", "-fix.md"] {
        let artifact = Utf8PathBuf::from(format!("{path}{suffix}"));
        assert!(artifact.is_file(), "missing {artifact}");
        assert!(world.written.contains(&artifact), "{artifact} not reported as written");
    }

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(format!("{path}-fix.json")).unwrap()).unwrap();
    assert_eq!(report["schema"], "dockfix.report.v1");
}

#[then("no artifacts are written")]
async fn no_artifacts(world: &mut DockfixWorld) {
    let path = dockerfile(world);
    assert!(world.written.is_empty());
    for suffix in ["-fixed", "-fix.diff", "-fix.json", "-fix.md"] {
        let artifact = format!("{path}{suffix}");
        assert!(!Utf8PathBuf::from(&artifact).exists(), "unexpected {artifact}");
    }
}

#[tokio::main]
async fn main() {
    let features_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("features");
    DockfixWorld::cucumber().run(features_path).await;
}
