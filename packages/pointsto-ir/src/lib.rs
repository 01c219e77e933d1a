/*
 * Pointsto IR - Whole-Program Points-To Analysis Engine
 *
 * Feature-First Hexagonal Architecture:
 * - config/      : Analysis mode and driver knobs
 * - features/    : Vertical slices (ir_model → points_to)
 *
 * Drivers (least to most precise):
 * - Flow-insensitive: one global graph, single pass
 * - Flow-sensitive: per-instruction In/Out graphs, worklist fixpoint
 * - Context-sensitive: flow-sensitive per (function, incoming graph) context
 */

#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::new_without_default)] // Default impl not always needed

pub mod config;
pub mod errors;
pub mod features;

pub use config::{AnalysisConfig, AnalysisMode};
pub use errors::AnalysisError;
pub use features::ir_model::domain::Module;
pub use features::ir_model::infrastructure::{parse_module, ModuleModel, ParseError};
pub use features::points_to::application::{
    AliasVerdict, AnalysisOutcome, AnalysisReport, ModuleAnalyzer, PrecisionBenchmark,
};
pub use features::points_to::domain::{
    FuncId, InstId, PointeeSet, PointsToGraph, Statement, StatementKind, TokenId, TokenKey,
    TokenTable,
};
pub use features::points_to::ports::{
    Callee, ControlFlow, InstructionModel, NullObserver, PrecisionObserver,
};
