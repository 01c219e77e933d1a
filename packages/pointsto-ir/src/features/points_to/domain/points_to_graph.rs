//! Points-to graph
//!
//! The dataflow value manipulated by every driver: a directed relation from
//! pointer tokens to sets of pointee tokens. The empty graph is lattice
//! bottom, union of edge sets is the join, and exact edge-set equality is
//! the fixpoint test. Empty pointee sets are never stored, so the derived
//! `PartialEq` compares edge sets exactly.

use super::token::{TokenId, TokenTable};
use rustc_hash::{FxHashMap, FxHashSet};

/// Pointee set for one pointer token
pub type PointeeSet = FxHashSet<TokenId>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointsToGraph {
    edges: FxHashMap<TokenId, PointeeSet>,
}

impl PointsToGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointees of `token`; empty set if unknown
    pub fn pointees(&self, token: TokenId) -> PointeeSet {
        self.edges.get(&token).cloned().unwrap_or_default()
    }

    /// Borrowed pointee set, if any edge exists
    pub fn pointee_set(&self, token: TokenId) -> Option<&PointeeSet> {
        self.edges.get(&token)
    }

    /// The single pointee if exactly one exists. `None` means "precision
    /// insufficient" to callers, never an error.
    pub fn unique_pointee(&self, token: TokenId) -> Option<TokenId> {
        match self.edges.get(&token) {
            Some(set) if set.len() == 1 => set.iter().next().copied(),
            _ => None,
        }
    }

    /// Add one edge; idempotent. Returns true if the graph changed.
    pub fn insert(&mut self, pointer: TokenId, pointee: TokenId) -> bool {
        self.edges.entry(pointer).or_default().insert(pointee)
    }

    /// Union a pointee set into `pointer`'s set. Returns true on change.
    pub fn extend(&mut self, pointer: TokenId, pointees: impl IntoIterator<Item = TokenId>) -> bool {
        let mut changed = false;
        let mut iter = pointees.into_iter().peekable();
        if iter.peek().is_none() {
            return false;
        }
        let set = self.edges.entry(pointer).or_default();
        for p in iter {
            changed |= set.insert(p);
        }
        changed
    }

    /// Remove all outgoing edges of `token` (strong-update kill).
    /// Returns true if any edge existed.
    pub fn erase(&mut self, token: TokenId) -> bool {
        self.edges.remove(&token).is_some()
    }

    /// Join: union the edge sets of all operands into self. Monotone,
    /// commutative, associative, idempotent.
    pub fn merge(&mut self, others: &[&PointsToGraph]) -> bool {
        let mut changed = false;
        for other in others {
            for (&ptr, set) in &other.edges {
                changed |= self.extend(ptr, set.iter().copied());
            }
        }
        changed
    }

    /// Keep only edges for which `keep(pointer, pointee)` holds
    pub fn retain_edges(&self, mut keep: impl FnMut(TokenId, TokenId) -> bool) -> PointsToGraph {
        let mut out = PointsToGraph::new();
        for (&ptr, set) in &self.edges {
            for &p in set {
                if keep(ptr, p) {
                    out.insert(ptr, p);
                }
            }
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (TokenId, &PointeeSet)> + '_ {
        self.edges.iter().map(|(&k, v)| (k, v))
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of (pointer, pointee) edges
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|s| s.len()).sum()
    }

    /// Deterministic textual dump: one sorted line per pointer
    pub fn render(&self, tokens: &TokenTable) -> String {
        let mut pointers: Vec<TokenId> = self.edges.keys().copied().collect();
        pointers.sort_by_key(|&p| tokens.display(p));
        let mut out = String::new();
        for ptr in pointers {
            let mut pts: Vec<String> = self.edges[&ptr].iter().map(|&t| tokens.display(t)).collect();
            pts.sort();
            out.push_str(&format!("  {} -> {{{}}}\n", tokens.display(ptr), pts.join(", ")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::points_to::domain::token::TokenKey;
    use proptest::prelude::*;

    fn graph_from(edges: &[(TokenId, TokenId)]) -> PointsToGraph {
        let mut g = PointsToGraph::new();
        for &(a, b) in edges {
            g.insert(a, b);
        }
        g
    }

    #[test]
    fn test_insert_idempotent() {
        let mut g = PointsToGraph::new();
        assert!(g.insert(1, 2));
        assert!(!g.insert(1, 2));
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_unique_pointee() {
        let mut g = PointsToGraph::new();
        assert_eq!(g.unique_pointee(1), None);
        g.insert(1, 2);
        assert_eq!(g.unique_pointee(1), Some(2));
        g.insert(1, 3);
        assert_eq!(g.unique_pointee(1), None);
    }

    #[test]
    fn test_erase_restores_equality_with_empty() {
        let mut g = PointsToGraph::new();
        g.insert(1, 2);
        assert!(g.erase(1));
        assert!(!g.erase(1));
        assert_eq!(g, PointsToGraph::new());
    }

    #[test]
    fn test_extend_with_empty_set_adds_nothing() {
        let mut g = PointsToGraph::new();
        assert!(!g.extend(1, std::iter::empty()));
        assert_eq!(g, PointsToGraph::new());
    }

    #[test]
    fn test_merge_unions_edges() {
        let a = graph_from(&[(1, 2), (3, 4)]);
        let b = graph_from(&[(1, 5)]);
        let mut m = PointsToGraph::new();
        m.merge(&[&a, &b]);
        assert_eq!(m.pointees(1), [2, 5].into_iter().collect());
        assert_eq!(m.pointees(3), [4].into_iter().collect());
    }

    #[test]
    fn test_retain_edges() {
        let g = graph_from(&[(1, 2), (3, 4)]);
        let kept = g.retain_edges(|p, _| p != 3);
        assert_eq!(kept, graph_from(&[(1, 2)]));
    }

    #[test]
    fn test_render_is_sorted() {
        let mut tokens = TokenTable::new();
        let a = tokens.canonicalize(TokenKey::variable("a", None));
        let b = tokens.canonicalize(TokenKey::variable("b", None));
        let c = tokens.canonicalize(TokenKey::variable("c", None));
        let g = graph_from(&[(b, c), (a, c), (a, b)]);
        assert_eq!(g.render(&tokens), "  a -> {b, c}\n  b -> {c}\n");
    }

    fn arb_graph() -> impl Strategy<Value = PointsToGraph> {
        prop::collection::vec((0u32..8, 0u32..8), 0..24).prop_map(|edges| graph_from(&edges))
    }

    proptest! {
        #[test]
        fn merge_idempotent(g in arb_graph()) {
            let mut m = g.clone();
            m.merge(&[&g, &g]);
            prop_assert_eq!(m, g);
        }

        #[test]
        fn merge_commutative(a in arb_graph(), b in arb_graph()) {
            let mut ab = a.clone();
            ab.merge(&[&b]);
            let mut ba = b.clone();
            ba.merge(&[&a]);
            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn merge_associative(a in arb_graph(), b in arb_graph(), c in arb_graph()) {
            let mut left = a.clone();
            left.merge(&[&b]);
            left.merge(&[&c]);
            let mut bc = b.clone();
            bc.merge(&[&c]);
            let mut right = a.clone();
            right.merge(&[&bc]);
            prop_assert_eq!(left, right);
        }
    }
}
