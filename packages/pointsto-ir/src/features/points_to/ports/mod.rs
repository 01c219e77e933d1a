//! Ports for the analysis drivers
//!
//! The core never inspects concrete IR. It consumes two collaborator traits
//! implemented by the instruction model adapter, and reports precision data
//! through an observer whose policy lives outside the drivers.

use crate::features::points_to::domain::{
    FuncId, InstId, PointeeSet, PointsToGraph, Statement, TokenId, TokenTable,
};

/// Call target of an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee {
    /// Direct call to a function defined in the module
    Resolved(FuncId),
    /// Indirect call or a target the module cannot resolve; treated as a
    /// conservative pass-through (no interprocedural edges)
    Unresolved,
    /// Not a call instruction
    NotACall,
}

/// Statement classification and call/return/global extraction over the
/// concrete IR. Token creation goes through the shared `TokenTable` so
/// identical locations always resolve to one id.
pub trait InstructionModel {
    /// Reduce one instruction to its pointer statement; `Statement::nop()`
    /// when the instruction is pointer-irrelevant.
    fn classify(&self, inst: InstId, tokens: &mut TokenTable) -> Statement;

    fn callee_of(&self, inst: InstId) -> Callee;

    fn is_call(&self, inst: InstId) -> bool {
        !matches!(self.callee_of(inst), Callee::NotACall)
    }

    /// Actual argument tokens at a call site, in positional order
    fn arguments_of(&self, inst: InstId, tokens: &mut TokenTable) -> Vec<TokenId>;

    /// Formal parameter tokens of a function, in positional order
    fn formals_of(&self, func: FuncId, tokens: &mut TokenTable) -> Vec<TokenId>;

    /// True for functions that never return a value; return binding is
    /// skipped for their call sites
    fn does_not_return(&self, func: FuncId) -> bool;

    /// Token carrying the function's return value, if it returns one
    fn return_token_of(&self, func: FuncId, tokens: &mut TokenTable) -> Option<TokenId>;

    /// Token receiving a call's result at the call site, if any
    fn result_token_of(&self, inst: InstId, tokens: &mut TokenTable) -> Option<TokenId>;

    /// Opaque/external/runtime-support functions, analyzed as no-ops
    fn skip(&self, func: FuncId) -> bool;

    /// Designated comparison pair for precision benchmarking, if this
    /// instruction registers one
    fn benchmark_pair(&self, inst: InstId, tokens: &mut TokenTable) -> Option<(TokenId, TokenId)>;

    /// Global seed graph, computed once before any instruction: every global
    /// points to its own cell, and address-of-global initializers add the
    /// corresponding cell-to-cell edge.
    fn global_graph(&self, tokens: &mut TokenTable) -> PointsToGraph;

    /// Formal-argument seed graph merged at a function's entry: each pointer
    /// formal may point to a synthetic cell of its own.
    fn argument_graph(&self, func: FuncId, tokens: &mut TokenTable) -> PointsToGraph;

    /// Human-readable rendering for the per-instruction dump
    fn describe(&self, inst: InstId) -> String;
}

/// Control-flow traversal primitives over the concrete IR
pub trait ControlFlow {
    fn functions(&self) -> Vec<FuncId>;
    fn function_name(&self, func: FuncId) -> &str;
    fn instructions(&self, func: FuncId) -> Vec<InstId>;
    fn entry(&self, func: FuncId) -> Option<InstId>;
    fn last(&self, func: FuncId) -> Option<InstId>;
    fn predecessors(&self, inst: InstId) -> Vec<InstId>;
    fn successors(&self, inst: InstId) -> Vec<InstId>;
    fn function_of(&self, inst: InstId) -> FuncId;
}

/// Receives `(pointees(a), pointees(b))` for registered comparison pairs
/// after each transfer; metric policy is external to the drivers.
pub trait PrecisionObserver {
    fn evaluate(&mut self, inst: InstId, a: &PointeeSet, b: &PointeeSet);
}

/// No-op observer for callers that do not benchmark
pub struct NullObserver;

impl PrecisionObserver for NullObserver {
    fn evaluate(&mut self, _inst: InstId, _a: &PointeeSet, _b: &PointeeSet) {}
}
