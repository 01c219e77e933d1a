//! Points-to analysis CLI
//!
//! # Usage
//!
//! ```bash
//! # Flow-insensitive (no trailing precision args)
//! pta program.pta
//!
//! # Flow-sensitive (one trailing arg)
//! pta program.pta fs
//!
//! # Context-sensitive (two or more trailing args)
//! pta program.pta cs on
//! ```
//!
//! The mode is selected by the *count* of trailing arguments, not their
//! content. Exits 1 when no input file is given or the module fails to
//! parse.

use clap::Parser;
use pointsto_ir::{
    AnalysisConfig, AnalysisMode, AnalysisOutcome, ModuleAnalyzer,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pta")]
#[command(about = "Whole-program points-to analysis over text IR", long_about = None)]
struct Cli {
    /// IR input file
    input: Option<PathBuf>,

    /// Trailing arguments; their count selects the analysis mode
    #[arg(trailing_var_arg = true)]
    precision: Vec<String>,

    /// Emit run statistics as JSON on stderr
    #[arg(long)]
    json_stats: bool,

    /// Disable strong updates in the flow-sensitive drivers
    #[arg(long)]
    no_strong_updates: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let input = match cli.input {
        Some(path) => path,
        None => {
            error!("no input file given");
            return ExitCode::FAILURE;
        }
    };

    let mode = match cli.precision.len() {
        0 => AnalysisMode::FlowInsensitive,
        1 => AnalysisMode::FlowSensitive,
        _ => AnalysisMode::ContextSensitive,
    };
    let config = AnalysisConfig::new(mode).with_strong_updates(!cli.no_strong_updates);

    let source = match std::fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            error!(path = %input.display(), "failed to read input: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut analyzer = match ModuleAnalyzer::from_source(&source, config) {
        Ok(a) => a,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let report = analyzer.analyze();
    println!("{}", analyzer.render(&report));

    if cli.json_stats {
        let stats = match &report.outcome {
            AnalysisOutcome::FlowInsensitive(r) => serde_json::json!({
                "mode": "flow-insensitive",
                "instructions": r.stats.instructions,
                "precision_violations": r.stats.precision_violations,
            }),
            AnalysisOutcome::FlowSensitive(r) => serde_json::json!({
                "mode": "flow-sensitive",
                "iterations": r.stats.iterations,
                "call_sites": r.stats.call_sites,
                "precision_violations": r.stats.precision_violations,
            }),
            AnalysisOutcome::ContextSensitive(r) => serde_json::json!({
                "mode": "context-sensitive",
                "iterations": r.stats.iterations,
                "contexts_created": r.stats.contexts_created,
                "cache_hits": r.stats.cache_hits,
                "collapses": r.stats.collapses,
                "precision_violations": r.stats.precision_violations,
            }),
        };
        eprintln!("{stats}");
    }
    ExitCode::SUCCESS
}
