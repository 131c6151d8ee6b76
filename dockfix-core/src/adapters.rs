//! Default port implementations: filesystem writes, hadolint and docker.

use crate::ports::WritePort;
use crate::process::{ProcessError, ProcessOutput, run_with_timeout};
use crate::settings::ToolSettings;
use anyhow::Context;
use camino::Utf8Path;
use dockfix_analyzer::{Analyzer, AnalyzerError, parse_findings};
use dockfix_resolver::{Probe, ProbeError, ProbeStep};
use dockfix_types::Defect;
use dockfix_types::retry::{Attempt, RetryPolicy};
use fs_err as fs;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, warn};

/// Writes through `fs_err` so failures name the path.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))?;
        debug!(path = %path, bytes = contents.len(), "wrote file");
        Ok(())
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create {}", path))?;
        Ok(())
    }
}

/// Runs `hadolint --no-fail -f json <file>`.
#[derive(Debug, Clone)]
pub struct HadolintAnalyzer {
    program: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HadolintAnalyzer {
    pub fn new(tools: &ToolSettings, retry: RetryPolicy) -> Self {
        Self {
            program: tools.hadolint.clone(),
            timeout: tools.analyzer_timeout(),
            retry,
        }
    }

    fn invoke(&self, path: &Utf8Path) -> Result<ProcessOutput, Attempt<ProcessError>> {
        run_with_timeout(&self.program, &["--no-fail", "-f", "json", path.as_str()], None, self.timeout).map_err(
            |err| {
                if err.is_transient() {
                    Attempt::Transient(err)
                } else {
                    Attempt::Permanent(err)
                }
            },
        )
    }
}

impl Analyzer for HadolintAnalyzer {
    fn analyze_file(&self, path: &Utf8Path) -> Result<Vec<Defect>, AnalyzerError> {
        let output = self
            .retry
            .run(|attempt| {
                if attempt > 1 {
                    warn!(program = %self.program, attempt, "retrying analyzer");
                }
                self.invoke(path)
            })
            .map_err(|failure| AnalyzerError::Invocation {
                message: failure.into_inner().to_string(),
            })?;

        // Findings on stdout are authoritative even with a non-zero exit.
        if !output.status.success() && output.stdout.trim().is_empty() {
            return Err(AnalyzerError::Invocation {
                message: format!("{} exited with {}: {}", self.program, output.status, output.stderr_tail()),
            });
        }
        parse_findings(&output.stdout)
    }
}

/// Validates steps by building throwaway images with the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerProbe {
    docker: String,
    timeout: Duration,
    retry: RetryPolicy,
}

/// Daemon-side failures that say nothing about the build file itself.
const DAEMON_ERRORS: &[&str] = &[
    "Cannot connect to the Docker daemon",
    "error during connect",
    "toomanyrequests",
    "TLS handshake timeout",
];

impl DockerProbe {
    pub fn new(tools: &ToolSettings, retry: RetryPolicy) -> Self {
        Self {
            docker: tools.docker.clone(),
            timeout: tools.probe_timeout(),
            retry,
        }
    }

    /// Image tag derived from the probe file, so concurrent runs do not collide
    /// on different content.
    fn probe_tag(dockerfile: &str) -> String {
        let digest = Sha256::digest(dockerfile.as_bytes());
        format!("dockfix-probe-{}", &hex::encode(digest)[..16])
    }

    /// Runs docker, retrying only failures that are not about the input.
    fn docker(&self, args: &[&str], stdin: Option<&str>) -> Result<ProcessOutput, ProbeError> {
        self.retry
            .run(|attempt| {
                if attempt > 1 {
                    warn!(?args, attempt, "retrying docker");
                }
                match run_with_timeout(&self.docker, args, stdin, self.timeout) {
                    Ok(out) if !out.status.success() && is_daemon_error(&out.stderr) => {
                        Err(Attempt::Transient(out.stderr_tail().to_string()))
                    }
                    Ok(out) => Ok(out),
                    Err(err) if err.is_transient() => Err(Attempt::Transient(err.to_string())),
                    Err(err) => Err(Attempt::Permanent(err.to_string())),
                }
            })
            .map_err(|failure| ProbeError::Unavailable {
                message: failure.into_inner(),
            })
    }

    fn remove_image(&self, image: &str) {
        match run_with_timeout(&self.docker, &["rmi", "-f", image], None, self.timeout) {
            Ok(out) if out.status.success() => debug!(image, "removed probe image"),
            Ok(out) => warn!(image, stderr = out.stderr_tail(), "could not remove image"),
            Err(err) => warn!(image, error = %err, "could not remove image"),
        }
    }
}

fn is_daemon_error(stderr: &str) -> bool {
    DAEMON_ERRORS.iter().any(|needle| stderr.contains(needle))
}

impl Probe for DockerProbe {
    fn check(&self, image: &str, step: ProbeStep<'_>) -> Result<(), ProbeError> {
        let dockerfile = step.dockerfile(image);
        let tag = Self::probe_tag(&dockerfile);
        debug!(image, ?step, tag = %tag, "probing");

        let out = self.docker(&["build", "-q", "--rm", "--force-rm", "-t", &tag, "-"], Some(&dockerfile))?;
        if !out.status.success() {
            return Err(ProbeError::Rejected {
                message: out.stderr_tail().to_string(),
            });
        }
        self.remove_image(&tag);
        Ok(())
    }

    fn os_release(&self, image: &str) -> Result<String, ProbeError> {
        let present = self.docker(&["image", "inspect", image], None)?.status.success();
        let out = self.docker(&["run", "--rm", "--entrypoint", "cat", image, "/etc/os-release"], None)?;
        if !present {
            self.remove_image(image);
        }

        if !out.status.success() {
            return Err(ProbeError::Rejected {
                message: out.stderr_tail().to_string(),
            });
        }
        Ok(out.stdout)
    }
}
