//! Module analyzer facade
//!
//! Owns the parsed module, the token table, and the configuration; runs the
//! selected driver and renders the per-instruction dump. The dump format is
//! stable: In graph, the instruction, Out graph, then a separator line.

use crate::config::{AnalysisConfig, AnalysisMode};
use crate::errors::AnalysisError;
use crate::features::ir_model::infrastructure::{parse_module, ModuleModel};
use crate::features::points_to::application::precision::PrecisionBenchmark;
use crate::features::points_to::domain::{InstId, PointsToGraph, TokenId, TokenTable};
use crate::features::points_to::infrastructure::{
    ContextSensitiveAnalysis, ContextSensitiveResult, FlowInsensitiveAnalysis,
    FlowInsensitiveResult, FlowSensitiveAnalysis, FlowSensitiveResult,
};
use crate::features::points_to::ports::{ControlFlow, InstructionModel};
use std::fmt::Write as _;
use tracing::info;

#[derive(Debug)]
pub enum AnalysisOutcome {
    FlowInsensitive(FlowInsensitiveResult),
    FlowSensitive(FlowSensitiveResult),
    ContextSensitive(ContextSensitiveResult),
}

#[derive(Debug)]
pub struct AnalysisReport {
    pub outcome: AnalysisOutcome,
    pub benchmark: PrecisionBenchmark,
}

pub struct ModuleAnalyzer {
    model: ModuleModel,
    tokens: TokenTable,
    config: AnalysisConfig,
}

impl ModuleAnalyzer {
    pub fn from_source(source: &str, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let module = parse_module(source)?;
        Ok(Self {
            model: ModuleModel::new(module),
            tokens: TokenTable::new(),
            config,
        })
    }

    pub fn model(&self) -> &ModuleModel {
        &self.model
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    /// Interned token for a variable, usable against any result graph
    pub fn var(&self, func: Option<&str>, name: &str) -> Option<TokenId> {
        self.model.lookup_var(&self.tokens, func, name)
    }

    /// Interned token for a global's or formal's memory cell
    pub fn cell(&self, func: Option<&str>, name: &str) -> Option<TokenId> {
        self.model.lookup_cell(&self.tokens, func, name)
    }

    pub fn analyze(&mut self) -> AnalysisReport {
        let mut benchmark = PrecisionBenchmark::new();
        info!(mode = ?self.config.mode, "starting analysis");
        let outcome = match self.config.mode {
            AnalysisMode::FlowInsensitive => {
                let driver = FlowInsensitiveAnalysis::new(&self.model, &self.model);
                AnalysisOutcome::FlowInsensitive(driver.run(&mut self.tokens, &mut benchmark))
            }
            AnalysisMode::FlowSensitive => {
                let driver = FlowSensitiveAnalysis::new(&self.model, &self.model, &self.config);
                AnalysisOutcome::FlowSensitive(driver.run(&mut self.tokens, &mut benchmark))
            }
            AnalysisMode::ContextSensitive => {
                let driver = ContextSensitiveAnalysis::new(&self.model, &self.model, &self.config);
                AnalysisOutcome::ContextSensitive(driver.run(&mut self.tokens, &mut benchmark))
            }
        };
        AnalysisReport { outcome, benchmark }
    }

    pub fn render(&self, report: &AnalysisReport) -> String {
        let mut out = String::new();
        match &report.outcome {
            AnalysisOutcome::FlowInsensitive(result) => {
                out.push_str("Points-to graph:\n");
                out.push_str(&result.graph.render(&self.tokens));
            }
            AnalysisOutcome::FlowSensitive(result) => {
                for func in self.model.functions() {
                    if self.model.skip(func) {
                        continue;
                    }
                    for inst in self.model.instructions(func) {
                        self.render_point(
                            &mut out,
                            inst,
                            result.in_map.get(&inst),
                            result.out_map.get(&inst),
                        );
                    }
                }
            }
            AnalysisOutcome::ContextSensitive(result) => {
                for func in self.model.functions() {
                    if self.model.skip(func) {
                        continue;
                    }
                    for &ctx in result.contexts.contexts_of(func) {
                        let _ = writeln!(
                            out,
                            "Function {} in Context: {} =>",
                            self.model.function_name(func),
                            ctx
                        );
                        for inst in self.model.instructions(func) {
                            self.render_point(
                                &mut out,
                                inst,
                                result.in_map.get(&(ctx, inst)),
                                result.out_map.get(&(ctx, inst)),
                            );
                        }
                    }
                }
            }
        }
        let _ = write!(out, "{}", report.benchmark);
        out
    }

    fn render_point(
        &self,
        out: &mut String,
        inst: InstId,
        in_g: Option<&PointsToGraph>,
        out_g: Option<&PointsToGraph>,
    ) {
        let empty = PointsToGraph::new();
        out.push_str(&in_g.unwrap_or(&empty).render(&self.tokens));
        let _ = writeln!(out, "[Instruction] {}", self.model.describe(inst));
        out.push_str(&out_g.unwrap_or(&empty).render(&self.tokens));
        out.push_str("-----------\n");
    }
}
