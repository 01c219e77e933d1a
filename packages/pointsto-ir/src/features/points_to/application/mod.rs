pub mod analyzer;
pub mod precision;

pub use analyzer::{AnalysisOutcome, AnalysisReport, ModuleAnalyzer};
pub use precision::{AliasVerdict, PrecisionBenchmark};
