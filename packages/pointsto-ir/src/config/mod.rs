//! Analysis configuration

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_CONTEXTS_PER_FUNCTION: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMode {
    FlowInsensitive,
    FlowSensitive,
    ContextSensitive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub mode: AnalysisMode,

    /// Enable the must-alias store kill in the flow-sensitive drivers
    pub strong_updates: bool,

    /// Context-creation bound per function; further incoming states are
    /// widened into the function's first context
    pub max_contexts_per_function: usize,

    /// Worklist iteration budget, 0 for unlimited
    pub max_iterations: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::FlowInsensitive,
            strong_updates: true,
            max_contexts_per_function: DEFAULT_MAX_CONTEXTS_PER_FUNCTION,
            max_iterations: 0,
        }
    }
}

impl AnalysisConfig {
    pub fn new(mode: AnalysisMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_strong_updates(mut self, enabled: bool) -> Self {
        self.strong_updates = enabled;
        self
    }

    pub fn with_max_contexts_per_function(mut self, bound: usize) -> Self {
        self.max_contexts_per_function = bound;
        self
    }

    pub fn with_max_iterations(mut self, budget: usize) -> Self {
        self.max_iterations = budget;
        self
    }
}
