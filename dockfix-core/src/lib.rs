//! Embeddable core library for dockfix.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking
//! into other host processes.
//!
//! # Ports
//!
//! - [`Analyzer`](dockfix_analyzer::Analyzer): report defects for a file
//! - [`HttpTransport`](dockfix_registry::HttpTransport): registry requests
//! - [`Probe`](dockfix_resolver::Probe): validate shells and pins in a container
//! - [`WritePort`](ports::WritePort): write the repaired file and artifacts
//!
//! The [`adapters`] module provides the hadolint, docker and filesystem
//! implementations.
//!
//! # Entry points
//!
//! - [`run_repair`](pipeline::run_repair): repair one Dockerfile in memory
//! - [`write_repair_artifacts`](pipeline::write_repair_artifacts): persist the outcome

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod process;
pub mod settings;

pub use pipeline::{RepairOutcome, ToolError, run_repair, write_repair_artifacts};
pub use settings::{ArtifactPaths, RepairSettings, ToolSettings};
