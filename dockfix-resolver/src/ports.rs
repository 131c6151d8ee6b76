use thiserror::Error;

/// A single step validated by building a throwaway image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStep<'a> {
    /// The shell binary exists in the image.
    Shell(&'a str),
    /// `apt-get install` of this package reference succeeds.
    Install(&'a str),
}

impl ProbeStep<'_> {
    /// Build file used to validate the step on top of `image`.
    pub fn dockerfile(&self, image: &str) -> String {
        match self {
            ProbeStep::Shell(shell) => format!("FROM {image}\nRUN which {shell}\n"),
            ProbeStep::Install(package) => format!(
                "FROM {image}\nRUN apt-get update\nRUN yes | DEBIAN_FRONTEND=noninteractive apt-get install -yqq {package}\n"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The build ran and failed: the step does not work in this image.
    #[error("probe rejected: {message}")]
    Rejected { message: String },

    /// The probe could not run (no container runtime, timeout after retries).
    #[error("probe unavailable: {message}")]
    Unavailable { message: String },
}

/// Container capability used to validate repairs against a real image.
pub trait Probe {
    fn check(&self, image: &str, step: ProbeStep<'_>) -> Result<(), ProbeError>;

    /// Contents of `/etc/os-release` inside `image`.
    fn os_release(&self, image: &str) -> Result<String, ProbeError>;
}
