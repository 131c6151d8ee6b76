//! Error types for dockfix-edit.
//!
//! `NotABuildFile` is fatal to a whole run (exit code 2). Everything else is a
//! contract violation or I/O failure (exit code 1).

use crate::parser::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    /// The content cannot be split into Dockerfile instructions.
    #[error("not a Dockerfile: {0}")]
    NotABuildFile(#[from] ParseError),

    #[error("line {line} is out of range (document has {len} lines)")]
    LineOutOfRange { line: usize, len: usize },

    /// A line index was captured before a line-count-changing mutation.
    #[error("line {line} was captured at version {captured}, layout changed at version {layout}")]
    StaleLine {
        line: usize,
        captured: u64,
        layout: u64,
    },

    /// The command map was derived from an older version of the lines.
    #[error("command map parsed at version {parsed} but document is at version {current}")]
    StaleParse { parsed: u64, current: u64 },

    #[error("runtime error: {0}")]
    Runtime(#[from] anyhow::Error),
}

impl EditError {
    pub fn is_not_a_build_file(&self) -> bool {
        matches!(self, EditError::NotABuildFile(_))
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            EditError::NotABuildFile(_) => 2,
            _ => 1,
        }
    }
}

pub type EditResult<T> = Result<T, EditError>;
