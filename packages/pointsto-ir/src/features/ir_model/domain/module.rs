//! Parsed module representation
//!
//! A module is globals plus functions; a function is labelled blocks of
//! numbered instructions. Instruction ids are dense and module-wide so the
//! drivers can key per-instruction state with plain maps.

use crate::features::points_to::domain::{FuncId, InstId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub name: String,
    /// `global p = &g` initializer target
    pub init_addr_of: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// `x = &y`
    AddressOf { lhs: String, rhs: String },
    /// `x = y`
    Copy { lhs: String, rhs: String },
    /// `x = *y`
    Load { lhs: String, rhs: String },
    /// `*x = y`
    Store { lhs: String, rhs: String },
    /// `x = alloc`
    Alloc { lhs: String },
    /// `x = &y.N`
    Field { lhs: String, base: String, offset: u32 },
    /// `[r =] call f(a, b)`
    Call {
        result: Option<String>,
        callee: String,
        args: Vec<String>,
    },
    /// `ret [x]`
    Ret { value: Option<String> },
    /// `br bb1 bb2 ...`
    Br { targets: Vec<String> },
    /// `check a, b`
    Check { a: String, b: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instr {
    pub id: InstId,
    /// 1-based source line, used for alloc-site naming and dumps
    pub line: u32,
    pub op: Op,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub label: String,
    pub instrs: Vec<Instr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub id: FuncId,
    pub name: String,
    pub params: Vec<String>,
    pub blocks: Vec<Block>,
    pub is_extern: bool,
}

impl Function {
    pub fn instructions(&self) -> impl Iterator<Item = &Instr> {
        self.blocks.iter().flat_map(|b| b.instrs.iter())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}
