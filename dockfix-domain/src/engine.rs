use crate::error::{EngineError, StrategyError};
use crate::ports::DefectSource;
use crate::registry::StrategyRegistry;
use crate::strategies::{FixOutcome, StrategyContext};
use dockfix_analyzer::DefectIndex;
use dockfix_edit::{Dockerfile, EditError, LineRef};
use dockfix_resolver::Resolve;
use dockfix_types::Defect;
use dockfix_types::report::{FixRecord, FixStatus};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_PASSES: usize = 50;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on fixing passes before the run is abandoned.
    pub max_passes: usize,
    /// When non-empty, only these codes are repaired.
    pub rules: BTreeSet<String>,
    /// Codes never repaired, even when a strategy exists.
    pub excluded: BTreeSet<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            rules: BTreeSet::new(),
            excluded: BTreeSet::new(),
        }
    }
}

impl EngineConfig {
    fn allows(&self, code: &str) -> bool {
        (self.rules.is_empty() || self.rules.contains(code)) && !self.excluded.contains(code)
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub passes: usize,
    pub records: Vec<FixRecord>,
    /// Defects reported by the first analysis.
    pub initial_defects: usize,
}

impl RepairSummary {
    pub fn applied(&self) -> usize {
        self.records.iter().filter(|r| r.status == FixStatus::Applied).count()
    }
}

enum EngineState {
    Scanning,
    Fixing(Vec<usize>),
    Resyncing,
    Done,
}

/// How one pass over the candidate lines ended.
enum PassEnd {
    Clean,
    Dirty,
}

/// What the run has already handled, carried across passes.
struct Progress<'a> {
    fixed: &'a mut BTreeSet<usize>,
    attempted: &'a mut BTreeSet<(usize, String)>,
    suppressed: &'a mut BTreeSet<String>,
}

/// The fixpoint loop: analyze, fix in line order, re-analyze after any
/// line-count change, until a pass leaves the layout alone.
pub struct RepairEngine {
    registry: StrategyRegistry,
    config: EngineConfig,
}

impl Default for RepairEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl RepairEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: StrategyRegistry::builtin(),
            config,
        }
    }

    pub fn with_registry(registry: StrategyRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Repairs `doc` in place.
    ///
    /// Only a rejected file, an analyzer failure or the pass bound end the
    /// run early; individual strategy failures are recorded and skipped.
    pub fn run(
        &self,
        doc: &mut Dockerfile,
        source: &dyn DefectSource,
        resolver: &dyn Resolve,
    ) -> Result<RepairSummary, EngineError> {
        let ctx = StrategyContext { resolver };
        let mut suppressed: BTreeSet<String> = BTreeSet::new();
        let mut index = source.analyze(doc, &suppressed)?;
        let mut fixed: BTreeSet<usize> = BTreeSet::new();
        let mut attempted: BTreeSet<(usize, String)> = BTreeSet::new();
        let mut summary = RepairSummary {
            initial_defects: index.len(),
            ..RepairSummary::default()
        };

        let mut state = EngineState::Scanning;
        loop {
            state = match state {
                EngineState::Scanning => {
                    let candidates: Vec<usize> = index.lines().filter(|l| !fixed.contains(l)).collect();
                    if candidates.is_empty() {
                        EngineState::Done
                    } else {
                        summary.passes += 1;
                        if summary.passes > self.config.max_passes {
                            return Err(EngineError::PassLimitExceeded {
                                max_passes: self.config.max_passes,
                            });
                        }
                        debug!(pass = summary.passes, lines = candidates.len(), "scanning");
                        EngineState::Fixing(candidates)
                    }
                }
                EngineState::Fixing(candidates) => {
                    let mut progress = Progress {
                        fixed: &mut fixed,
                        attempted: &mut attempted,
                        suppressed: &mut suppressed,
                    };
                    let end = self.fix_pass(doc, &index, &candidates, &ctx, &mut progress, &mut summary)?;
                    match end {
                        PassEnd::Dirty => EngineState::Resyncing,
                        PassEnd::Clean => EngineState::Done,
                    }
                }
                EngineState::Resyncing => {
                    index = source.analyze(doc, &suppressed)?;
                    doc.clear_dirty();
                    debug!(defects = index.len(), version = index.version(), "re-analyzed");
                    EngineState::Scanning
                }
                EngineState::Done => break,
            };
        }

        info!(
            passes = summary.passes,
            applied = summary.applied(),
            records = summary.records.len(),
            "repair finished"
        );
        Ok(summary)
    }

    fn fix_pass(
        &self,
        doc: &mut Dockerfile,
        index: &DefectIndex,
        candidates: &[usize],
        ctx: &StrategyContext<'_>,
        progress: &mut Progress<'_>,
        summary: &mut RepairSummary,
    ) -> Result<PassEnd, EngineError> {
        let pass = summary.passes;
        for &line in candidates {
            let mut deferred = false;
            for defect in index.at(line) {
                if progress.attempted.contains(&(line, defect.code.clone())) {
                    continue;
                }
                // Positions are stale once the layout moved; finish this line
                // after the resync instead of skipping what is left on it.
                if doc.is_dirty() {
                    debug!(code = %defect.code, line, "deferred to the next pass");
                    deferred = true;
                    break;
                }
                let record = self.fix_one(doc, index, defect, ctx, progress.suppressed)?;
                progress.attempted.insert((line, defect.code.clone()));
                summary.records.push(FixRecord { pass, ..record });
            }
            if !deferred {
                progress.fixed.insert(line);
            }

            // Every position after this one may have moved.
            if doc.is_dirty() {
                return Ok(PassEnd::Dirty);
            }
        }
        Ok(PassEnd::Clean)
    }

    fn fix_one(
        &self,
        doc: &mut Dockerfile,
        index: &DefectIndex,
        defect: &Defect,
        ctx: &StrategyContext<'_>,
        suppressed: &mut BTreeSet<String>,
    ) -> Result<FixRecord, EngineError> {
        let record = |status, message: Option<String>| FixRecord {
            pass: 0,
            line: defect.line,
            code: defect.code.clone(),
            status,
            message,
        };
        let skipped = |reason: String| {
            warn!(code = %defect.code, line = defect.line, %reason, "defect skipped");
            record(FixStatus::Skipped, Some(reason))
        };

        let Some(strategy) = self.registry.get(&defect.code) else {
            return Ok(skipped(format!("no repair for {}", defect.code)));
        };
        if !self.config.allows(&defect.code) {
            return Ok(skipped(format!("{} is not selected for repair", defect.code)));
        }

        let line = match doc.resolve(LineRef {
            line: defect.line,
            version: index.version(),
        }) {
            Ok(line) => line,
            Err(err @ (EditError::StaleLine { .. } | EditError::LineOutOfRange { .. })) => {
                return Ok(skipped(err.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let snapshot = doc.snapshot();
        let version_before = doc.version();
        let outcome = strategy.fix(doc, line, ctx).and_then(|outcome| {
            if doc.version() != version_before {
                doc.reparse()?;
            }
            Ok(outcome)
        });

        match outcome {
            Ok(FixOutcome::Applied) => {
                debug!(code = %defect.code, line, "strategy applied");
                Ok(record(FixStatus::Applied, None))
            }
            Ok(FixOutcome::AppliedSuppressing(code)) => {
                debug!(code = %defect.code, line, suppressing = %code, "strategy applied");
                let message = format!("{code} suppressed in later analyses");
                suppressed.insert(code);
                Ok(record(FixStatus::Applied, Some(message)))
            }
            Ok(FixOutcome::Unchanged(reason)) => {
                debug!(code = %defect.code, line, %reason, "nothing to change");
                Ok(record(FixStatus::Unchanged, Some(reason)))
            }
            Err(err) => {
                doc.restore(snapshot)?;
                if err.is_skip() {
                    Ok(skipped(err.to_string()))
                } else {
                    warn!(code = %defect.code, line, error = %err, "strategy failed, changes rolled back");
                    Ok(record(FixStatus::Failed, Some(describe(&err))))
                }
            }
        }
    }
}

fn describe(err: &StrategyError) -> String {
    match err {
        StrategyError::Edit(EditError::NotABuildFile(parse)) => format!("result no longer parses: {parse}"),
        other => other.to_string(),
    }
}
