//! Flow-sensitive driver
//!
//! Per-instruction `In`/`Out` graphs computed to a fixpoint over a LIFO
//! worklist. Function entries are seeded with the global and formal-argument
//! graphs; calls bind arguments into the callee entry, pull return values
//! and escaped global edges back from the callee exit, and are reactivated
//! through the call graph whenever the callee's published result changes.

use crate::config::AnalysisConfig;
use crate::features::points_to::domain::{
    FuncId, InstId, PointsToGraph, Statement, TokenId, TokenTable,
};
use crate::features::points_to::infrastructure::interpreter;
use crate::features::points_to::ports::{Callee, ControlFlow, InstructionModel, PrecisionObserver};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

#[derive(Debug, Clone, Default)]
pub struct WorklistStats {
    pub iterations: usize,
    pub precision_violations: u32,
    pub call_sites: usize,
}

#[derive(Debug, Clone)]
pub struct FlowSensitiveResult {
    pub in_map: FxHashMap<InstId, PointsToGraph>,
    pub out_map: FxHashMap<InstId, PointsToGraph>,
    pub stats: WorklistStats,
}

impl FlowSensitiveResult {
    /// Pointees of `token` in the Out graph of `inst`
    pub fn pointees_at(&self, inst: InstId, token: TokenId) -> FxHashSet<TokenId> {
        self.out_map
            .get(&inst)
            .map(|g| g.pointees(token))
            .unwrap_or_default()
    }
}

pub struct FlowSensitiveAnalysis<'a, M, C> {
    model: &'a M,
    cfg: &'a C,
    strong_updates: bool,
    max_iterations: usize,
    in_map: FxHashMap<InstId, PointsToGraph>,
    out_map: FxHashMap<InstId, PointsToGraph>,
    worklist: Vec<InstId>,
    call_graph: FxHashMap<FuncId, FxHashSet<InstId>>,
    published: FxHashMap<FuncId, PointsToGraph>,
    global_graph: PointsToGraph,
    arg_graphs: FxHashMap<FuncId, PointsToGraph>,
    stats: WorklistStats,
}

impl<'a, M: InstructionModel, C: ControlFlow> FlowSensitiveAnalysis<'a, M, C> {
    pub fn new(model: &'a M, cfg: &'a C, config: &AnalysisConfig) -> Self {
        Self {
            model,
            cfg,
            strong_updates: config.strong_updates,
            max_iterations: config.max_iterations,
            in_map: FxHashMap::default(),
            out_map: FxHashMap::default(),
            worklist: Vec::new(),
            call_graph: FxHashMap::default(),
            published: FxHashMap::default(),
            global_graph: PointsToGraph::new(),
            arg_graphs: FxHashMap::default(),
            stats: WorklistStats::default(),
        }
    }

    pub fn run(
        mut self,
        tokens: &mut TokenTable,
        observer: &mut dyn PrecisionObserver,
    ) -> FlowSensitiveResult {
        self.global_graph = self.model.global_graph(tokens);
        for func in self.cfg.functions() {
            if self.model.skip(func) {
                continue;
            }
            if let Some(entry) = self.cfg.entry(func) {
                self.worklist.push(entry);
            }
        }

        while let Some(inst) = self.worklist.pop() {
            self.stats.iterations += 1;
            if self.max_iterations > 0 && self.stats.iterations > self.max_iterations {
                debug!(limit = self.max_iterations, "iteration budget exhausted");
                break;
            }
            let old_out = self.out_map.get(&inst).cloned().unwrap_or_default();
            self.transfer(inst, tokens, observer);
            if self.out_map.get(&inst) != Some(&old_out) {
                for succ in self.cfg.successors(inst) {
                    self.worklist.push(succ);
                }
            }
        }

        self.stats.call_sites = self.call_graph.values().map(|s| s.len()).sum();
        debug!(
            iterations = self.stats.iterations,
            program_points = self.out_map.len(),
            "flow-sensitive fixpoint reached"
        );
        FlowSensitiveResult {
            in_map: self.in_map,
            out_map: self.out_map,
            stats: self.stats,
        }
    }

    fn argument_graph(&mut self, func: FuncId, tokens: &mut TokenTable) -> PointsToGraph {
        if let Some(g) = self.arg_graphs.get(&func) {
            return g.clone();
        }
        let g = self.model.argument_graph(func, tokens);
        self.arg_graphs.insert(func, g.clone());
        g
    }

    fn transfer(&mut self, inst: InstId, tokens: &mut TokenTable, observer: &mut dyn PrecisionObserver) {
        let func = self.cfg.function_of(inst);

        // In = merge of predecessor Outs, plus the global/argument seed at
        // the function entry. The In graph accumulates across visits.
        let mut in_g = self.in_map.remove(&inst).unwrap_or_default();
        if self.cfg.entry(func) == Some(inst) {
            let args = self.argument_graph(func, tokens);
            in_g.merge(&[&self.global_graph, &args]);
        }
        for pred in self.cfg.predecessors(inst) {
            if let Some(out) = self.out_map.get(&pred) {
                in_g.merge(&[out]);
            }
        }

        let mut out = in_g.clone();
        let stmt = self.model.classify(inst, tokens);
        let t = interpreter::apply(&stmt, &mut out, tokens, self.strong_updates);
        self.stats.precision_violations += t.precision_violations;

        if let Callee::Resolved(callee) = self.model.callee_of(inst) {
            if !self.model.skip(callee) {
                self.handle_call(inst, callee, &mut in_g, &mut out, tokens);
            }
        }

        // Publishing point: the function's last instruction exposes its
        // result and wakes every recorded call site when it changed.
        if self.cfg.last(func) == Some(inst) {
            if self.published.get(&func) != Some(&out) {
                self.published.insert(func, out.clone());
                if let Some(sites) = self.call_graph.get(&func) {
                    for &site in sites {
                        trace!(site, func, "requeueing call site after exit change");
                        self.worklist.push(site);
                    }
                }
            }
        }

        if let Some((a, b)) = self.model.benchmark_pair(inst, tokens) {
            observer.evaluate(inst, &out.pointees(a), &out.pointees(b));
        }

        self.in_map.insert(inst, in_g);
        self.out_map.insert(inst, out);
    }

    fn handle_call(
        &mut self,
        inst: InstId,
        callee: FuncId,
        in_g: &mut PointsToGraph,
        out: &mut PointsToGraph,
        tokens: &mut TokenTable,
    ) {
        let entry = match self.cfg.entry(callee) {
            Some(e) => e,
            None => return,
        };
        self.call_graph.entry(callee).or_default().insert(inst);

        // Propagate the caller's state into the callee entry and bind
        // formals to actuals there.
        let formals = self.model.formals_of(callee, tokens);
        let actuals = self.model.arguments_of(inst, tokens);
        let self_entry = entry == inst;
        let mut entry_in = if self_entry {
            in_g.clone()
        } else {
            self.in_map.remove(&entry).unwrap_or_default()
        };
        let before = entry_in.clone();
        entry_in.merge(&[&*in_g]);
        for (formal, actual) in formals.iter().zip(actuals.iter()) {
            let stmt = Statement::argument_bind(*formal, *actual);
            interpreter::apply(&stmt, &mut entry_in, tokens, false);
        }
        let entry_changed = entry_in != before;
        if self_entry {
            *in_g = entry_in;
        } else {
            self.in_map.insert(entry, entry_in);
        }
        if entry_changed {
            self.worklist.push(entry);
        }

        // Return value and escaped global effects flow back from the
        // callee's current exit graph.
        let exit_out = self
            .cfg
            .last(callee)
            .and_then(|last| self.out_map.get(&last))
            .cloned();
        if let Some(exit_out) = exit_out {
            if !self.model.does_not_return(callee) {
                if let (Some(result), Some(ret)) = (
                    self.model.result_token_of(inst, tokens),
                    self.model.return_token_of(callee, tokens),
                ) {
                    out.extend(result, exit_out.pointees(ret));
                }
            }
            let escaped = exit_out.retain_edges(|s, p| {
                !tokens.is_local_to(s, callee) && !tokens.is_local_to(p, callee)
            });
            out.merge(&[&escaped]);
        }
    }
}
