//! Precision benchmark
//!
//! Collects the pointee sets delivered for each registered `check a, b`
//! pair and classifies the pair per observation. The drivers feed it after
//! every transfer, so the verdict recorded for a pair reflects the last
//! state it was evaluated under.

use crate::features::points_to::domain::{InstId, PointeeSet};
use crate::features::points_to::ports::PrecisionObserver;
use rustc_hash::FxHashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasVerdict {
    /// Both sets non-empty and intersecting
    MayAlias,
    /// Both sets non-empty and disjoint
    NoAlias,
    /// At least one set empty; nothing can be concluded
    Unknown,
}

impl fmt::Display for AliasVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasVerdict::MayAlias => write!(f, "MayAlias"),
            AliasVerdict::NoAlias => write!(f, "NoAlias"),
            AliasVerdict::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PairObservation {
    pub a_size: usize,
    pub b_size: usize,
    pub verdict: AliasVerdict,
}

/// `PrecisionObserver` that keeps one observation per check instruction
#[derive(Debug, Default)]
pub struct PrecisionBenchmark {
    observations: FxHashMap<InstId, PairObservation>,
}

impl PrecisionBenchmark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observation(&self, inst: InstId) -> Option<&PairObservation> {
        self.observations.get(&inst)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    fn count(&self, verdict: AliasVerdict) -> usize {
        self.observations
            .values()
            .filter(|o| o.verdict == verdict)
            .count()
    }
}

impl PrecisionObserver for PrecisionBenchmark {
    fn evaluate(&mut self, inst: InstId, a: &PointeeSet, b: &PointeeSet) {
        let verdict = if a.is_empty() || b.is_empty() {
            AliasVerdict::Unknown
        } else if a.intersection(b).next().is_some() {
            AliasVerdict::MayAlias
        } else {
            AliasVerdict::NoAlias
        };
        self.observations.insert(
            inst,
            PairObservation {
                a_size: a.len(),
                b_size: b.len(),
                verdict,
            },
        );
    }
}

impl fmt::Display for PrecisionBenchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Precision benchmark: {} pairs", self.observations.len())?;
        let mut insts: Vec<InstId> = self.observations.keys().copied().collect();
        insts.sort_unstable();
        for inst in insts {
            let o = &self.observations[&inst];
            writeln!(
                f,
                "  inst {}: {} (|a| = {}, |b| = {})",
                inst, o.verdict, o.a_size, o.b_size
            )?;
        }
        write!(
            f,
            "  may-alias: {}, no-alias: {}, unknown: {}",
            self.count(AliasVerdict::MayAlias),
            self.count(AliasVerdict::NoAlias),
            self.count(AliasVerdict::Unknown)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[u32]) -> PointeeSet {
        items.iter().copied().collect()
    }

    #[test]
    fn test_verdicts() {
        let mut bench = PrecisionBenchmark::new();
        bench.evaluate(0, &set(&[1, 2]), &set(&[2, 3]));
        bench.evaluate(1, &set(&[1]), &set(&[2]));
        bench.evaluate(2, &set(&[]), &set(&[2]));
        assert_eq!(bench.observation(0).unwrap().verdict, AliasVerdict::MayAlias);
        assert_eq!(bench.observation(1).unwrap().verdict, AliasVerdict::NoAlias);
        assert_eq!(bench.observation(2).unwrap().verdict, AliasVerdict::Unknown);
    }

    #[test]
    fn test_reevaluation_keeps_last_observation() {
        let mut bench = PrecisionBenchmark::new();
        bench.evaluate(0, &set(&[1]), &set(&[2]));
        bench.evaluate(0, &set(&[1, 2]), &set(&[2]));
        assert_eq!(bench.len(), 1);
        assert_eq!(bench.observation(0).unwrap().verdict, AliasVerdict::MayAlias);
    }
}
