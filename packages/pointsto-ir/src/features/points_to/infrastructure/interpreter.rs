//! Statement interpreter
//!
//! Applies one classified statement to a points-to graph, producing the
//! successor graph in place. Strong updates (erase before insert) happen
//! only for stores through a must-alias singleton, and only when the caller
//! runs flow-sensitively. Precision shortfalls never abort: they are counted
//! and the affected lhs simply receives no new edge this cycle.

use crate::features::points_to::domain::{
    PointsToGraph, Statement, StatementKind, TokenTable,
};
use tracing::trace;

/// Outcome of one transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transfer {
    pub changed: bool,
    /// Field accesses whose base resolved to more than one candidate
    pub precision_violations: u32,
}

/// Apply `stmt` to `graph`. `strong_updates` enables the store kill under
/// the must-alias singleton condition.
pub fn apply(
    stmt: &Statement,
    graph: &mut PointsToGraph,
    tokens: &mut TokenTable,
    strong_updates: bool,
) -> Transfer {
    let mut out = Transfer::default();
    let (lhs, rhs) = match (stmt.lhs, stmt.rhs) {
        (Some(l), Some(r)) => (l, r),
        _ => return out,
    };

    match stmt.kind {
        StatementKind::Copy | StatementKind::ArgumentBind | StatementKind::ReturnBind => {
            let pts = graph.pointees(rhs);
            out.changed = graph.extend(lhs, pts);
        }
        StatementKind::AddressOf => {
            out.changed = graph.insert(lhs, rhs);
        }
        StatementKind::Load => {
            let targets = graph.pointees(rhs);
            let mut acc = Vec::new();
            for t in targets {
                acc.extend(graph.pointees(t));
            }
            out.changed = graph.extend(lhs, acc);
        }
        StatementKind::Store => {
            let targets = graph.pointees(lhs);
            // Snapshot before any kill: rhs may be one of the targets
            let incoming: Vec<_> = if tokens.is_mem(rhs) {
                // A fresh allocation site contributes its own identity
                vec![rhs]
            } else {
                graph.pointees(rhs).into_iter().collect()
            };
            if strong_updates && targets.len() == 1 {
                if let Some(&kill) = targets.iter().next() {
                    out.changed = graph.erase(kill);
                }
            }
            for t in targets {
                out.changed |= graph.extend(t, incoming.iter().copied());
            }
        }
        StatementKind::FieldAccess { offset } => {
            let base_pts = graph.pointees(rhs);
            match base_pts.len() {
                0 => {}
                1 => {
                    if let Some(&base) = base_pts.iter().next() {
                        let field = tokens.derive_field(base, offset);
                        out.changed = graph.insert(lhs, field);
                    }
                }
                n => {
                    // Conservative fallback: no derived token this cycle
                    trace!(candidates = n, "field base is not unique, skipping derivation");
                    out.precision_violations += 1;
                }
            }
        }
        StatementKind::Nop => {}
    }
    out
}
