//! Domain model: tokens, the points-to relation, classified statements

pub mod points_to_graph;
pub mod statement;
pub mod token;

pub use points_to_graph::{PointeeSet, PointsToGraph};
pub use statement::{Statement, StatementKind};
pub use token::{FuncId, InstId, TokenId, TokenKey, TokenTable};
