pub mod context_sensitive;
pub mod flow_insensitive;
pub mod flow_sensitive;
pub mod interpreter;

pub use context_sensitive::{
    ContextId, ContextSensitiveAnalysis, ContextSensitiveResult, ContextStats, ContextTable,
};
pub use flow_insensitive::{FlowInsensitiveAnalysis, FlowInsensitiveResult, PassStats};
pub use flow_sensitive::{FlowSensitiveAnalysis, FlowSensitiveResult, WorklistStats};
pub use interpreter::Transfer;
