//! Context-sensitive driver
//!
//! Wraps the flow-sensitive transfer with a per-(function, incoming-graph)
//! memoization table: each distinct incoming state observed at a call site
//! gets its own analyzed copy of the callee. A context graph records which
//! (caller context, call site) pairs depend on a callee context so they can
//! be requeued when its result is republished.
//!
//! Context creation is bounded per function; past the bound the function's
//! first context becomes a collapse target and further incoming states are
//! widened into it.

use crate::config::AnalysisConfig;
use crate::features::points_to::domain::{
    FuncId, InstId, PointsToGraph, Statement, TokenTable,
};
use crate::features::points_to::infrastructure::interpreter;
use crate::features::points_to::ports::{Callee, ControlFlow, InstructionModel, PrecisionObserver};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

/// Opaque identifier for one analyzed copy of a function
pub type ContextId = u32;

#[derive(Debug, Clone)]
struct ContextEntry {
    func: FuncId,
    incoming: PointsToGraph,
    result: Option<PointsToGraph>,
}

/// Memoization table keyed by (function, incoming graph content)
#[derive(Debug, Default)]
pub struct ContextTable {
    entries: Vec<ContextEntry>,
    by_func: FxHashMap<FuncId, Vec<ContextId>>,
    /// callee context -> (caller context, call site) dependents
    callers: FxHashMap<ContextId, FxHashSet<(ContextId, InstId)>>,
}

impl ContextTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing context whose stored incoming graph equals `incoming`
    pub fn saved(&self, func: FuncId, incoming: &PointsToGraph) -> Option<ContextId> {
        self.by_func.get(&func)?.iter().copied().find(|&c| {
            self.entries[c as usize].incoming == *incoming
        })
    }

    pub fn create(&mut self, func: FuncId, incoming: PointsToGraph) -> ContextId {
        let id = self.entries.len() as ContextId;
        self.entries.push(ContextEntry {
            func,
            incoming,
            result: None,
        });
        self.by_func.entry(func).or_default().push(id);
        id
    }

    pub fn func(&self, ctx: ContextId) -> FuncId {
        self.entries[ctx as usize].func
    }

    pub fn contexts_of(&self, func: FuncId) -> &[ContextId] {
        self.by_func.get(&func).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn count(&self, func: FuncId) -> usize {
        self.contexts_of(func).len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Missing result is "not yet computed", never an error
    pub fn result(&self, ctx: ContextId) -> Option<&PointsToGraph> {
        self.entries[ctx as usize].result.as_ref()
    }

    /// Publish a context result; returns true when it differs from the
    /// previously published one.
    pub fn set_result(&mut self, ctx: ContextId, result: PointsToGraph) -> bool {
        let entry = &mut self.entries[ctx as usize];
        if entry.result.as_ref() == Some(&result) {
            return false;
        }
        entry.result = Some(result);
        true
    }

    pub fn record_caller(&mut self, callee_ctx: ContextId, caller_ctx: ContextId, site: InstId) {
        self.callers
            .entry(callee_ctx)
            .or_default()
            .insert((caller_ctx, site));
    }

    pub fn callers_of(&self, ctx: ContextId) -> impl Iterator<Item = (ContextId, InstId)> + '_ {
        self.callers.get(&ctx).into_iter().flatten().copied()
    }

    fn widen_into(&mut self, ctx: ContextId, incoming: &PointsToGraph) -> bool {
        self.entries[ctx as usize].incoming.merge(&[incoming])
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextStats {
    pub contexts_created: usize,
    pub cache_hits: usize,
    pub collapses: usize,
    pub iterations: usize,
    pub precision_violations: u32,
}

#[derive(Debug)]
pub struct ContextSensitiveResult {
    pub contexts: ContextTable,
    pub in_map: FxHashMap<(ContextId, InstId), PointsToGraph>,
    pub out_map: FxHashMap<(ContextId, InstId), PointsToGraph>,
    pub stats: ContextStats,
}

pub struct ContextSensitiveAnalysis<'a, M, C> {
    model: &'a M,
    cfg: &'a C,
    strong_updates: bool,
    max_iterations: usize,
    max_contexts_per_function: usize,
    contexts: ContextTable,
    in_map: FxHashMap<(ContextId, InstId), PointsToGraph>,
    out_map: FxHashMap<(ContextId, InstId), PointsToGraph>,
    worklist: Vec<(ContextId, InstId)>,
    global_graph: PointsToGraph,
    arg_graphs: FxHashMap<FuncId, PointsToGraph>,
    stats: ContextStats,
}

impl<'a, M: InstructionModel, C: ControlFlow> ContextSensitiveAnalysis<'a, M, C> {
    pub fn new(model: &'a M, cfg: &'a C, config: &AnalysisConfig) -> Self {
        Self {
            model,
            cfg,
            strong_updates: config.strong_updates,
            max_iterations: config.max_iterations,
            max_contexts_per_function: config.max_contexts_per_function,
            contexts: ContextTable::new(),
            in_map: FxHashMap::default(),
            out_map: FxHashMap::default(),
            worklist: Vec::new(),
            global_graph: PointsToGraph::new(),
            arg_graphs: FxHashMap::default(),
            stats: ContextStats::default(),
        }
    }

    pub fn run(
        mut self,
        tokens: &mut TokenTable,
        observer: &mut dyn PrecisionObserver,
    ) -> ContextSensitiveResult {
        self.global_graph = self.model.global_graph(tokens);

        // Every function starts with one root context under the bottom
        // incoming graph.
        for func in self.cfg.functions() {
            if self.model.skip(func) {
                continue;
            }
            let _ = self.spawn_context(func, PointsToGraph::new());
        }

        while let Some((ctx, inst)) = self.worklist.pop() {
            self.stats.iterations += 1;
            if self.max_iterations > 0 && self.stats.iterations > self.max_iterations {
                debug!(limit = self.max_iterations, "iteration budget exhausted");
                break;
            }
            let key = (ctx, inst);
            let old_out = self.out_map.get(&key).cloned().unwrap_or_default();
            self.transfer(ctx, inst, tokens, observer);
            if self.out_map.get(&key) != Some(&old_out) {
                for succ in self.cfg.successors(inst) {
                    self.worklist.push((ctx, succ));
                }
            }
        }

        debug!(
            contexts = self.contexts.len(),
            iterations = self.stats.iterations,
            "context-sensitive fixpoint reached"
        );
        ContextSensitiveResult {
            contexts: self.contexts,
            in_map: self.in_map,
            out_map: self.out_map,
            stats: self.stats,
        }
    }

    /// Create (or widen into) a context for `func` under `incoming` and
    /// queue its entry instruction.
    fn spawn_context(&mut self, func: FuncId, incoming: PointsToGraph) -> Option<ContextId> {
        let entry = self.cfg.entry(func)?;
        if self.contexts.count(func) >= self.max_contexts_per_function {
            // Collapse: widen the function's first context with the new
            // incoming state and re-run it.
            let target = self.contexts.contexts_of(func)[0];
            if self.contexts.widen_into(target, &incoming) {
                self.in_map
                    .entry((target, entry))
                    .or_default()
                    .merge(&[&incoming]);
                self.worklist.push((target, entry));
            }
            self.stats.collapses += 1;
            trace!(func, ctx = target, "context bound hit, collapsing");
            return Some(target);
        }
        let ctx = self.contexts.create(func, incoming.clone());
        self.stats.contexts_created += 1;
        self.in_map.insert((ctx, entry), incoming);
        self.worklist.push((ctx, entry));
        Some(ctx)
    }

    fn argument_graph(&mut self, func: FuncId, tokens: &mut TokenTable) -> PointsToGraph {
        if let Some(g) = self.arg_graphs.get(&func) {
            return g.clone();
        }
        let g = self.model.argument_graph(func, tokens);
        self.arg_graphs.insert(func, g.clone());
        g
    }

    fn transfer(
        &mut self,
        ctx: ContextId,
        inst: InstId,
        tokens: &mut TokenTable,
        observer: &mut dyn PrecisionObserver,
    ) {
        let func = self.cfg.function_of(inst);
        let key = (ctx, inst);

        let mut in_g = self.in_map.remove(&key).unwrap_or_default();
        if self.cfg.entry(func) == Some(inst) {
            let args = self.argument_graph(func, tokens);
            in_g.merge(&[&self.global_graph, &args]);
        }
        for pred in self.cfg.predecessors(inst) {
            if let Some(out) = self.out_map.get(&(ctx, pred)) {
                in_g.merge(&[out]);
            }
        }

        let mut out = in_g.clone();
        let stmt = self.model.classify(inst, tokens);
        let t = interpreter::apply(&stmt, &mut out, tokens, self.strong_updates);
        self.stats.precision_violations += t.precision_violations;

        if let Callee::Resolved(callee) = self.model.callee_of(inst) {
            if !self.model.skip(callee) && self.cfg.entry(callee).is_some() {
                self.handle_call(ctx, inst, callee, &mut in_g, &mut out, tokens);
            }
        }

        if self.cfg.last(func) == Some(inst) {
            if self.contexts.set_result(ctx, out.clone()) {
                let dependents: Vec<_> = self.contexts.callers_of(ctx).collect();
                for (caller_ctx, site) in dependents {
                    trace!(site, ctx, "requeueing caller after context result change");
                    self.worklist.push((caller_ctx, site));
                }
            }
        }

        if let Some((a, b)) = self.model.benchmark_pair(inst, tokens) {
            observer.evaluate(inst, &out.pointees(a), &out.pointees(b));
        }

        self.in_map.insert(key, in_g);
        self.out_map.insert(key, out);
    }

    fn handle_call(
        &mut self,
        ctx: ContextId,
        inst: InstId,
        callee: FuncId,
        in_g: &mut PointsToGraph,
        out: &mut PointsToGraph,
        tokens: &mut TokenTable,
    ) {
        // Bind formals against the caller-side state; the bound In graph is
        // the callee's incoming state and the memoization key.
        let formals = self.model.formals_of(callee, tokens);
        let actuals = self.model.arguments_of(inst, tokens);
        for (formal, actual) in formals.iter().zip(actuals.iter()) {
            let stmt = Statement::argument_bind(*formal, *actual);
            interpreter::apply(&stmt, in_g, tokens, false);
        }

        let callee_ctx = match self.contexts.saved(callee, in_g) {
            Some(saved) => {
                self.stats.cache_hits += 1;
                saved
            }
            None => match self.spawn_context(callee, in_g.clone()) {
                Some(c) => c,
                None => return,
            },
        };
        // Recorded on hits too, so a still-running context wakes this
        // caller when it publishes.
        self.contexts.record_caller(callee_ctx, ctx, inst);

        // Reuse the memoized result; bottom until the callee publishes.
        let result = self.contexts.result(callee_ctx).cloned().unwrap_or_default();
        if !self.model.does_not_return(callee) {
            if let (Some(result_tok), Some(ret_tok)) = (
                self.model.result_token_of(inst, tokens),
                self.model.return_token_of(callee, tokens),
            ) {
                out.extend(result_tok, result.pointees(ret_tok));
            }
        }
        // Only effects that escaped the callee flow back to the call site.
        let escaped = result.retain_edges(|s, p| {
            !tokens.is_local_to(s, callee) && !tokens.is_local_to(p, callee)
        });
        out.merge(&[&escaped]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_context_matches_on_graph_content() {
        let mut table = ContextTable::new();
        let mut g1 = PointsToGraph::new();
        g1.insert(1, 2);
        let g2 = g1.clone();
        let c1 = table.create(7, g1);
        assert_eq!(table.saved(7, &g2), Some(c1));
        assert_eq!(table.saved(8, &g2), None);
        assert_eq!(table.saved(7, &PointsToGraph::new()), None);
    }

    #[test]
    fn test_distinct_incoming_distinct_contexts() {
        let mut table = ContextTable::new();
        let mut g1 = PointsToGraph::new();
        g1.insert(1, 2);
        let mut g2 = PointsToGraph::new();
        g2.insert(1, 3);
        let c1 = table.create(7, g1);
        let c2 = table.create(7, g2);
        assert_ne!(c1, c2);
        assert_eq!(table.count(7), 2);
    }

    #[test]
    fn test_set_result_detects_change() {
        let mut table = ContextTable::new();
        let c = table.create(0, PointsToGraph::new());
        assert_eq!(table.result(c), None);
        let mut r = PointsToGraph::new();
        r.insert(1, 2);
        assert!(table.set_result(c, r.clone()));
        assert!(!table.set_result(c, r.clone()));
        r.insert(1, 3);
        assert!(table.set_result(c, r));
    }

    #[test]
    fn test_record_caller_dedupes() {
        let mut table = ContextTable::new();
        let callee = table.create(0, PointsToGraph::new());
        let caller = table.create(1, PointsToGraph::new());
        table.record_caller(callee, caller, 5);
        table.record_caller(callee, caller, 5);
        assert_eq!(table.callers_of(callee).count(), 1);
    }
}
