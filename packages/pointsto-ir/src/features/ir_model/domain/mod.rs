pub mod module;

pub use module::{Block, Function, Global, Instr, Module, Op};
