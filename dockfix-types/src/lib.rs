//! Shared DTOs for the dockfix workspace.
//!
//! # Design constraints
//! - Report types are serialized to disk next to the repaired Dockerfile.
//! - Analyzer wire types are read tolerantly: unknown fields are ignored.
//! - Prefer adding optional fields over changing semantics.

pub mod defect;
pub mod lookup;
pub mod report;
pub mod retry;

pub use defect::Defect;
pub use lookup::{DistroSeries, Lookup};
pub use retry::RetryPolicy;

/// Schema identifiers.
pub mod schema {
    pub const DOCKFIX_REPORT_V1: &str = "dockfix.report.v1";
}
