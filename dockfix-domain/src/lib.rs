//! Repair logic: which edit fixes which analyzer code, and the loop that
//! applies them until the file stops moving.
//!
//! This crate owns *what* gets changed. Reading defects and resolving
//! versions are reached through ports (`DefectSource`, `Resolve`) so the
//! engine runs the same against hadolint or an in-memory double.

pub mod engine;
pub mod error;
pub mod ports;
pub mod registry;
mod strategies;

pub use engine::{DEFAULT_MAX_PASSES, EngineConfig, RepairEngine, RepairSummary};
pub use error::{EngineError, StrategyError};
pub use ports::DefectSource;
pub use registry::{StrategyRegistry, builtin_strategy_metas};
pub use strategies::{FixOutcome, Strategy, StrategyContext, StrategyMeta, builtin_strategies};
