//! Flow-insensitive driver
//!
//! One global graph, one pass over all instructions in program order, no
//! kill. The transfer is purely monotone-additive, so any processing order
//! yields the same result and no fixpoint loop is needed.

use crate::features::points_to::domain::{PointsToGraph, TokenTable};
use crate::features::points_to::infrastructure::interpreter;
use crate::features::points_to::ports::{ControlFlow, InstructionModel, PrecisionObserver};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct PassStats {
    pub instructions: usize,
    pub precision_violations: u32,
}

#[derive(Debug, Clone)]
pub struct FlowInsensitiveResult {
    pub graph: PointsToGraph,
    pub stats: PassStats,
}

pub struct FlowInsensitiveAnalysis<'a, M, C> {
    model: &'a M,
    cfg: &'a C,
}

impl<'a, M: InstructionModel, C: ControlFlow> FlowInsensitiveAnalysis<'a, M, C> {
    pub fn new(model: &'a M, cfg: &'a C) -> Self {
        Self { model, cfg }
    }

    pub fn run(
        &self,
        tokens: &mut TokenTable,
        observer: &mut dyn PrecisionObserver,
    ) -> FlowInsensitiveResult {
        let mut graph = self.model.global_graph(tokens);
        let mut stats = PassStats::default();

        // Every body is folded; skip() only gates interprocedural
        // propagation, and this pass has none.
        for func in self.cfg.functions() {
            for inst in self.cfg.instructions(func) {
                let stmt = self.model.classify(inst, tokens);
                let t = interpreter::apply(&stmt, &mut graph, tokens, false);
                stats.instructions += 1;
                stats.precision_violations += t.precision_violations;

                if let Some((a, b)) = self.model.benchmark_pair(inst, tokens) {
                    observer.evaluate(inst, &graph.pointees(a), &graph.pointees(b));
                }
            }
        }
        debug!(
            instructions = stats.instructions,
            edges = graph.edge_count(),
            "flow-insensitive pass complete"
        );
        FlowInsensitiveResult { graph, stats }
    }
}
