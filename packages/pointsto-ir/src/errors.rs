//! Crate-level error type

use crate::features::ir_model::infrastructure::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to parse module: {0}")]
    Parse(#[from] ParseError),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}
