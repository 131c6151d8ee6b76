//! Repair explanations for the `dockfix explain` command.
//!
//! Titles and capability flags come from the strategy registry; this module
//! only adds the prose.

use dockfix_domain::{StrategyMeta, builtin_strategy_metas};

#[derive(Debug, Clone)]
pub struct FixExplanation {
    pub code: &'static str,
    /// Why hadolint flags the pattern.
    pub rationale: &'static str,
    /// What dockfix writes instead, and what to do by hand when it cannot.
    pub remediation: &'static str,
}

pub static EXPLANATIONS: &[FixExplanation] = &[
    FixExplanation {
        code: "DL3003",
        rationale: "`cd` inside RUN only lasts for that instruction. Later instructions silently run in the \
                    old directory, and the intent is hidden inside a shell command.",
        remediation: "The `cd` becomes a WORKDIR instruction; anything chained after it with `&&` moves to a \
                      new RUN. A WORKDIR identical to the previous one is dropped.",
    },
    FixExplanation {
        code: "DL3006",
        rationale: "An untagged image means `latest`, which moves. The same Dockerfile builds against \
                    different bases over time.",
        remediation: "The concrete tag sharing a digest with `latest` is written into FROM. When none exists, \
                      the newest tag pushed before the reference date is used. Registry lookups that fail \
                      leave the line alone.",
    },
    FixExplanation {
        code: "DL3008",
        rationale: "Unpinned apt packages install whatever the archive has today, so a rebuild can pull an \
                    incompatible version.",
        remediation: "Each package gets the newest version published before the reference date. If that exact \
                      version no longer installs, progressively wider wildcards (`1.2.*`, `1.*`, `1:*`) are \
                      probed. Unknown distributions and retired archives are skipped.",
    },
    FixExplanation {
        code: "DL3009",
        rationale: "apt lists left in a layer add tens of megabytes to the image and are never used at runtime.",
        remediation: "`apt-get clean` and `rm -rf /var/lib/apt/lists/*` are chained after the install, with the \
                      same indentation and continuation style.",
    },
    FixExplanation {
        code: "DL3014",
        rationale: "Without `-y`, apt-get waits for confirmation and a non-interactive build aborts.",
        remediation: "`-y` is added right after `install`.",
    },
    FixExplanation {
        code: "DL3015",
        rationale: "Recommended packages are pulled in by default and bloat the image.",
        remediation: "`--no-install-recommends` is added right after `install`.",
    },
    FixExplanation {
        code: "DL3020",
        rationale: "ADD also fetches URLs and unpacks archives. For plain files COPY says exactly what happens.",
        remediation: "ADD is rewritten to COPY. Archives and URLs are not reported by hadolint and are kept.",
    },
    FixExplanation {
        code: "DL3025",
        rationale: "Shell-form CMD and ENTRYPOINT run under `/bin/sh -c`, so the process does not receive \
                    signals sent to the container.",
        remediation: "The arguments are rewritten as a JSON array. Commands relying on shell syntax are wrapped \
                      as `[\"/bin/sh\", \"-c\", \"...\"]` to keep their meaning.",
    },
    FixExplanation {
        code: "DL3042",
        rationale: "pip keeps a download cache that ends up in the layer.",
        remediation: "`--no-cache-dir` is added right after `pip install`.",
    },
    FixExplanation {
        code: "DL3047",
        rationale: "wget's default progress bar floods build logs with one line per update.",
        remediation: "`--progress=dot:giga` is added after `wget`.",
    },
    FixExplanation {
        code: "DL3048",
        rationale: "Label keys should be lowercase, dot or dash separated, so tools can query them reliably.",
        remediation: "Keys are lowercased, camel case is split with dashes and other separators are collapsed. \
                      The LABEL is rewritten one key per line.",
    },
    FixExplanation {
        code: "DL3059",
        rationale: "Every RUN creates a layer. Consecutive RUNs can share one.",
        remediation: "Consecutive shell-form RUN instructions are joined with `&&` across continuation lines.",
    },
    FixExplanation {
        code: "DL4000",
        rationale: "MAINTAINER is deprecated.",
        remediation: "All MAINTAINER instructions are replaced by a single `LABEL maintainer=\"...\"`.",
    },
    FixExplanation {
        code: "DL4006",
        rationale: "Without pipefail, `a | b` succeeds when `a` fails, hiding broken downloads and builds.",
        remediation: "A `SHELL [\"<shell>\", \"-o\", \"pipefail\", \"-c\"]` is inserted before the RUN, using bash \
                      or ash depending on the image, after a probe confirms the shell exists. When only \
                      `/bin/sh` is available the SHELL is still written and the code is no longer reported.",
    },
];

/// Finds the strategy metadata and prose for `query`, ignoring case.
pub fn lookup_fix(query: &str) -> Option<(StrategyMeta, &'static FixExplanation)> {
    let code = query.trim().to_ascii_uppercase();
    let meta = builtin_strategy_metas().into_iter().find(|m| m.code == code)?;
    let explanation = EXPLANATIONS.iter().find(|e| e.code == code)?;
    Some((meta, explanation))
}

/// List all codes with a repair.
pub fn list_fix_codes() -> Vec<&'static str> {
    builtin_strategy_metas().iter().map(|m| m.code).collect()
}

/// Human-readable summary of what a repair needs beyond the file itself.
pub fn requirements(meta: &StrategyMeta) -> &'static str {
    match (meta.needs_registry, meta.needs_probe) {
        (false, false) => "none (text rewrite only)",
        (true, false) => "registry access",
        (false, true) => "a container runtime for probes",
        (true, true) => "registry access and a container runtime for probes",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_strategy_is_explained() {
        for meta in builtin_strategy_metas() {
            assert!(
                EXPLANATIONS.iter().any(|e| e.code == meta.code),
                "{} has no explanation",
                meta.code
            );
        }
        assert_eq!(EXPLANATIONS.len(), list_fix_codes().len());
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let (meta, fix) = lookup_fix("dl3020").expect("should find dl3020");
        assert_eq!(meta.code, "DL3020");
        assert_eq!(fix.code, "DL3020");
    }

    #[test]
    fn test_lookup_unknown() {
        assert!(lookup_fix("DL3007").is_none());
        assert!(lookup_fix("").is_none());
    }

    #[test]
    fn test_requirements_follow_meta() {
        let (pin, _) = lookup_fix("DL3008").unwrap();
        assert_eq!(requirements(&pin), "registry access and a container runtime for probes");
        let (copy, _) = lookup_fix("DL3020").unwrap();
        assert_eq!(requirements(&copy), "none (text rewrite only)");
    }
}
