//! Document model for dockfix.
//!
//! Responsibilities:
//! - Hold a Dockerfile as a versioned, 1-based line sequence.
//! - Derive the instruction map and re-derive it on demand.
//! - Render a unified diff between original and repaired content.

pub mod document;
pub mod error;
pub mod parser;
pub mod patch;
pub mod text;

pub use document::{Dockerfile, LineRef, Snapshot};
pub use error::{EditError, EditResult};
pub use parser::{Command, CommandMap, ParseError, is_instruction, parse_commands};
pub use patch::render_patch;
