//! Fixpoint loop behavior: fatal defects, resynchronization after layout
//! changes, rollback of broken repairs and the pass bound.

use chrono::NaiveDate;
use dockfix_analyzer::{AnalyzerError, DefectIndex};
use dockfix_domain::{
    DefectSource, EngineConfig, EngineError, FixOutcome, RepairEngine, Strategy, StrategyContext, StrategyError,
    StrategyMeta, StrategyRegistry, builtin_strategies,
};
use dockfix_edit::Dockerfile;
use dockfix_resolver::OfflineResolver;
use dockfix_types::Defect;
use dockfix_types::report::FixStatus;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use proptest::strategy::Strategy as _;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

fn doc(src: &str) -> Dockerfile {
    Dockerfile::from_contents("Dockerfile", src, NaiveDate::from_ymd_opt(2022, 6, 1).unwrap()).unwrap()
}

/// Defects computed from the current lines by a closure.
struct FnSource<F> {
    rule: F,
    calls: Cell<usize>,
    seen_suppressed: RefCell<Vec<BTreeSet<String>>>,
}

impl<F: Fn(&Dockerfile) -> Vec<Defect>> FnSource<F> {
    fn new(rule: F) -> Self {
        Self {
            rule,
            calls: Cell::new(0),
            seen_suppressed: RefCell::new(Vec::new()),
        }
    }
}

impl<F: Fn(&Dockerfile) -> Vec<Defect>> DefectSource for FnSource<F> {
    fn analyze(&self, doc: &Dockerfile, suppressed: &BTreeSet<String>) -> Result<DefectIndex, AnalyzerError> {
        self.calls.set(self.calls.get() + 1);
        self.seen_suppressed.borrow_mut().push(suppressed.clone());
        DefectIndex::build((self.rule)(doc), suppressed, doc.version())
    }
}

/// One defect per line whose text starts with `prefix`.
fn lines_starting_with(doc: &Dockerfile, prefix: &str, code: &str) -> Vec<Defect> {
    doc.lines()
        .iter()
        .enumerate()
        .filter(|(_, l)| l.trim_start().starts_with(prefix))
        .map(|(i, _)| Defect::new(i + 1, code, ""))
        .collect()
}

fn meta(code: &'static str) -> StrategyMeta {
    StrategyMeta {
        code,
        title: "test strategy",
        changes_layout: true,
        needs_registry: false,
        needs_probe: false,
    }
}

/// Claims success while inserting a line, so its defect never goes away.
struct AlwaysInsert;

impl Strategy for AlwaysInsert {
    fn meta(&self) -> StrategyMeta {
        meta("XX0001")
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        doc.insert_at(line + 1, "RUN again")?;
        Ok(FixOutcome::Applied)
    }
}

/// Leaves a line that no longer parses.
struct Garbler;

impl Strategy for Garbler {
    fn meta(&self) -> StrategyMeta {
        meta("XX0002")
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        doc.set_line(line, "FORM broken")?;
        Ok(FixOutcome::Applied)
    }
}

/// Inserts a comment and asks for its own code to be hidden afterwards.
struct Suppressor;

impl Strategy for Suppressor {
    fn meta(&self) -> StrategyMeta {
        meta("XX0003")
    }

    fn fix(&self, doc: &mut Dockerfile, line: usize, _ctx: &StrategyContext<'_>) -> Result<FixOutcome, StrategyError> {
        doc.insert_at(line, "# handled")?;
        Ok(FixOutcome::AppliedSuppressing("XX0003".into()))
    }
}

#[test]
fn fatal_defect_aborts_before_any_repair() {
    let mut d = doc("FROM x\nADD a /a\n");
    let source = FnSource::new(|_: &Dockerfile| vec![Defect::new(1, "DL1000", "parse error"), Defect::new(2, "DL3020", "")]);

    let err = RepairEngine::default().run(&mut d, &source, &OfflineResolver).unwrap_err();
    assert!(matches!(err, EngineError::Rejected { ref code, line: 1, .. } if code == "DL1000"));
    assert_eq!(d.contents(), "FROM x\nADD a /a\n");
    assert_eq!(d.version(), 0);
}

#[test]
fn pathological_strategy_hits_the_pass_bound() {
    let mut d = doc("FROM x\nRUN again\n");
    let source = FnSource::new(|d: &Dockerfile| lines_starting_with(d, "RUN again", "XX0001"));
    let engine = RepairEngine::with_registry(
        StrategyRegistry::with_strategies(vec![Box::new(AlwaysInsert)]),
        EngineConfig {
            max_passes: 5,
            ..EngineConfig::default()
        },
    );

    let err = engine.run(&mut d, &source, &OfflineResolver).unwrap_err();
    assert!(matches!(err, EngineError::PassLimitExceeded { max_passes: 5 }));
}

#[test]
fn layout_change_triggers_reanalysis_and_stops_the_pass() {
    let mut d = doc("FROM x\nRUN cd /src && make\nADD a /a\nADD b /b\n");
    let source = FnSource::new(|d: &Dockerfile| {
        let mut out = lines_starting_with(d, "RUN cd", "DL3003");
        out.extend(lines_starting_with(d, "ADD", "DL3020"));
        out
    });

    let summary = RepairEngine::default().run(&mut d, &source, &OfflineResolver).unwrap();
    assert_eq!(d.contents(), "FROM x\nWORKDIR /src\nRUN make\nCOPY a /a\nCOPY b /b\n");
    // initial analysis, resync after the WORKDIR insert; the ADD pass is clean
    assert_eq!(source.calls.get(), 2);
    assert_eq!(summary.passes, 2);

    let passes: Vec<(usize, &str)> = summary.records.iter().map(|r| (r.pass, r.code.as_str())).collect();
    assert_eq!(passes, vec![(1, "DL3003"), (2, "DL3020"), (2, "DL3020")]);
}

#[test]
fn defects_after_a_layout_change_on_the_same_line_are_retried() {
    let mut d = doc("FROM ubuntu:20.04\nRUN apt-get update && apt-get install -y curl\n");
    // Reported in hadolint's order: the line-adding DL3009 first.
    let source = FnSource::new(|d: &Dockerfile| {
        let text = d.contents();
        let mut out = Vec::new();
        if !text.contains("apt-get clean") {
            out.push(Defect::new(2, "DL3009", "delete the apt-get lists"));
        }
        if !text.contains("--no-install-recommends") {
            out.push(Defect::new(2, "DL3015", "avoid recommended packages"));
        }
        out
    });

    let summary = RepairEngine::default().run(&mut d, &source, &OfflineResolver).unwrap();
    assert!(d.contents().contains("install --no-install-recommends -y curl"), "{}", d.contents());
    assert!(d.contents().contains("&& rm -rf /var/lib/apt/lists/*"));

    let records: Vec<(usize, &str, FixStatus)> = summary
        .records
        .iter()
        .map(|r| (r.pass, r.code.as_str(), r.status))
        .collect();
    assert_eq!(
        records,
        vec![(1, "DL3009", FixStatus::Applied), (2, "DL3015", FixStatus::Applied)]
    );
    assert_eq!(summary.passes, 2);
}

#[test]
fn unparseable_result_is_rolled_back_and_recorded() {
    let mut d = doc("FROM x\nRUN make\n");
    let source = FnSource::new(|d: &Dockerfile| lines_starting_with(d, "RUN make", "XX0002"));
    let engine = RepairEngine::with_registry(
        StrategyRegistry::with_strategies(vec![Box::new(Garbler)]),
        EngineConfig::default(),
    );

    let summary = engine.run(&mut d, &source, &OfflineResolver).unwrap();
    assert_eq!(d.contents(), "FROM x\nRUN make\n");
    assert_eq!(summary.records.len(), 1);
    assert_eq!(summary.records[0].status, FixStatus::Failed);
}

#[test]
fn codes_without_strategy_or_outside_rules_are_skipped() {
    let mut d = doc("FROM x\nADD a /a\nMAINTAINER me\n");
    let source = FnSource::new(|d: &Dockerfile| {
        let mut out = lines_starting_with(d, "ADD", "DL3020");
        out.extend(lines_starting_with(d, "MAINTAINER", "DL4000"));
        out.extend(lines_starting_with(d, "FROM", "DL3007"));
        out
    });
    let engine = RepairEngine::new(EngineConfig {
        rules: BTreeSet::from(["DL3020".to_string()]),
        ..EngineConfig::default()
    });

    let summary = engine.run(&mut d, &source, &OfflineResolver).unwrap();
    assert_eq!(d.contents(), "FROM x\nCOPY a /a\nMAINTAINER me\n");
    let statuses: Vec<(&str, FixStatus)> = summary.records.iter().map(|r| (r.code.as_str(), r.status)).collect();
    assert_eq!(
        statuses,
        vec![
            ("DL3007", FixStatus::Skipped),
            ("DL3020", FixStatus::Applied),
            ("DL4000", FixStatus::Skipped),
        ]
    );
}

#[test]
fn suppressed_codes_reach_later_analyses() {
    let mut d = doc("FROM x\nRUN a | b\n");
    let source = FnSource::new(|d: &Dockerfile| lines_starting_with(d, "RUN a", "XX0003"));
    let engine = RepairEngine::with_registry(
        StrategyRegistry::with_strategies(vec![Box::new(Suppressor)]),
        EngineConfig::default(),
    );

    let summary = engine.run(&mut d, &source, &OfflineResolver).unwrap();
    assert_eq!(d.contents(), "FROM x\n# handled\nRUN a | b\n");
    assert_eq!(summary.passes, 1);
    let seen = source.seen_suppressed.borrow();
    assert!(seen[0].is_empty());
    assert!(seen[1].contains("XX0003"));
}

fn arb_instruction() -> impl proptest::strategy::Strategy<Value = String> {
    prop_oneof![
        Just("ADD src /dst".to_string()),
        Just("RUN cd /app && make".to_string()),
        Just("RUN cd /tmp".to_string()),
        Just("RUN make test".to_string()),
        Just("COPY a /a".to_string()),
        Just("MAINTAINER a@b.c".to_string()),
        Just(String::new()),
    ]
}

proptest! {
    /// The builtin strategies reach a fixpoint on any mix of these lines.
    #[test]
    fn builtin_strategies_terminate(body in prop::collection::vec(arb_instruction(), 0..10)) {
        let src = format!("FROM x\n{}\n", body.join("\n"));
        let mut d = doc(&src);
        let source = FnSource::new(|d: &Dockerfile| {
            let mut out = lines_starting_with(d, "ADD", "DL3020");
            out.extend(lines_starting_with(d, "RUN cd", "DL3003"));
            out.extend(lines_starting_with(d, "MAINTAINER", "DL4000"));
            out
        });
        let engine = RepairEngine::with_registry(
            StrategyRegistry::with_strategies(builtin_strategies()),
            EngineConfig::default(),
        );

        let summary = engine.run(&mut d, &source, &OfflineResolver);
        prop_assert!(summary.is_ok(), "{:?}", summary.err());
        let summary = summary.unwrap();
        // Every dirty pass consumes a `RUN cd` or `MAINTAINER` line.
        prop_assert!(summary.passes <= body.len() + 1);
        prop_assert!(dockfix_edit::parse_commands(d.lines()).is_ok());
    }
}
