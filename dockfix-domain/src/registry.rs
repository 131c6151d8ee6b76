use crate::strategies::{Strategy, StrategyMeta, builtin_strategies};
use std::collections::BTreeMap;

/// Strategies keyed by the analyzer code they repair.
///
/// Filled once at startup. A code with no entry simply has no repair.
pub struct StrategyRegistry {
    by_code: BTreeMap<&'static str, Box<dyn Strategy>>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StrategyRegistry {
    pub fn builtin() -> Self {
        Self::with_strategies(builtin_strategies())
    }

    /// Later entries replace earlier ones with the same code.
    pub fn with_strategies(strategies: Vec<Box<dyn Strategy>>) -> Self {
        let by_code = strategies.into_iter().map(|s| (s.meta().code, s)).collect();
        Self { by_code }
    }

    pub fn get(&self, code: &str) -> Option<&dyn Strategy> {
        self.by_code.get(code).map(|s| &**s)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_code.keys().copied()
    }

    pub fn metas(&self) -> Vec<StrategyMeta> {
        self.by_code.values().map(|s| s.meta()).collect()
    }
}

/// Metadata of every built-in strategy, sorted by code.
pub fn builtin_strategy_metas() -> Vec<StrategyMeta> {
    StrategyRegistry::builtin().metas()
}
