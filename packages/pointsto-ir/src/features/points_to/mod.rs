//! Points-to analysis feature
//!
//! Domain: interned tokens, graph-valued lattice, classified statements.
//! Infrastructure: the statement interpreter and the three drivers.
//! Application: the module-level analyzer facade and the precision
//! benchmark observer.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;
