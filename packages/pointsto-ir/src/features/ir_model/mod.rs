//! IR model feature
//!
//! Domain: the parsed module shape. Infrastructure: the text-IR parser and
//! the adapter that exposes a module through the analysis ports.

pub mod domain;
pub mod infrastructure;
