//! Module adapter
//!
//! Implements the analysis ports over a parsed `Module`. Control flow is
//! precomputed once: intra-block order, branch targets, and fallthrough to
//! the lexically next block. Token identities follow one scheme everywhere:
//! globals own nothing (`owner: None`) and carry a seeded memory cell,
//! locals and formals are owned by their function, and each `alloc` gets a
//! memory token named by its source line.

use super::super::domain::{Instr, Module, Op};
use crate::features::points_to::domain::{
    FuncId, InstId, PointsToGraph, Statement, TokenId, TokenKey, TokenTable,
};
use crate::features::points_to::ports::{Callee, ControlFlow, InstructionModel};
use rustc_hash::{FxHashMap, FxHashSet};

const SKIP_PREFIXES: [&str; 3] = ["_ZN", "_Zn", "llvm"];

pub struct ModuleModel {
    module: Module,
    globals: FxHashSet<String>,
    by_name: FxHashMap<String, FuncId>,
    owner: FxHashMap<InstId, FuncId>,
    location: FxHashMap<InstId, (usize, usize, usize)>,
    preds: FxHashMap<InstId, Vec<InstId>>,
    succs: FxHashMap<InstId, Vec<InstId>>,
}

impl ModuleModel {
    pub fn new(module: Module) -> Self {
        let globals = module.globals.iter().map(|g| g.name.clone()).collect();
        let by_name = module
            .functions
            .iter()
            .map(|f| (f.name.clone(), f.id))
            .collect();

        let mut owner = FxHashMap::default();
        let mut location = FxHashMap::default();
        let mut succs: FxHashMap<InstId, Vec<InstId>> = FxHashMap::default();
        let mut preds: FxHashMap<InstId, Vec<InstId>> = FxHashMap::default();

        for (fi, func) in module.functions.iter().enumerate() {
            let labels: FxHashMap<&str, usize> = func
                .blocks
                .iter()
                .enumerate()
                .map(|(bi, b)| (b.label.as_str(), bi))
                .collect();
            // Entry of each block, resolving through empty blocks forward
            let block_entry: Vec<Option<InstId>> = (0..func.blocks.len())
                .map(|bi| {
                    func.blocks[bi..]
                        .iter()
                        .find_map(|b| b.instrs.first().map(|i| i.id))
                })
                .collect();

            for (bi, block) in func.blocks.iter().enumerate() {
                for (ii, instr) in block.instrs.iter().enumerate() {
                    owner.insert(instr.id, func.id);
                    location.insert(instr.id, (fi, bi, ii));
                    let next: Vec<InstId> = if let Some(follow) = block.instrs.get(ii + 1) {
                        vec![follow.id]
                    } else {
                        match &instr.op {
                            Op::Ret { .. } => Vec::new(),
                            Op::Br { targets } => targets
                                .iter()
                                .filter_map(|t| {
                                    labels.get(t.as_str()).and_then(|&b| block_entry[b])
                                })
                                .collect(),
                            _ => block_entry.get(bi + 1).copied().flatten().into_iter().collect(),
                        }
                    };
                    for &s in &next {
                        preds.entry(s).or_default().push(instr.id);
                    }
                    succs.insert(instr.id, next);
                }
            }
        }

        Self {
            module,
            globals,
            by_name,
            owner,
            location,
            preds,
            succs,
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    fn op_of(&self, inst: InstId) -> &Instr {
        let (fi, bi, ii) = self.location[&inst];
        &self.module.functions[fi].blocks[bi].instrs[ii]
    }

    fn is_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    /// Token for reading a name: globals are unowned, everything else
    /// belongs to the enclosing function.
    fn var_token(&self, name: &str, func: FuncId, tokens: &mut TokenTable) -> TokenId {
        if self.is_global(name) {
            tokens.canonicalize(TokenKey::variable(name, None))
        } else {
            tokens.canonicalize(TokenKey::variable(name, Some(func)))
        }
    }

    /// Token denoting the storage behind `&name`: the memory cell for a
    /// global, the variable itself for a local.
    fn place_token(&self, name: &str, func: FuncId, tokens: &mut TokenTable) -> TokenId {
        if self.is_global(name) {
            tokens.canonicalize(TokenKey::memory(name, None))
        } else {
            tokens.canonicalize(TokenKey::variable(name, Some(func)))
        }
    }

    /// Resolve an already-interned variable token, for post-analysis queries
    pub fn lookup_var(
        &self,
        tokens: &TokenTable,
        func: Option<&str>,
        name: &str,
    ) -> Option<TokenId> {
        let owner = match func {
            Some(f) => Some(*self.by_name.get(f)?),
            None => None,
        };
        tokens.lookup(&TokenKey::variable(name, owner))
    }

    /// Resolve the memory cell of a global or formal
    pub fn lookup_cell(
        &self,
        tokens: &TokenTable,
        func: Option<&str>,
        name: &str,
    ) -> Option<TokenId> {
        let owner = match func {
            Some(f) => Some(*self.by_name.get(f)?),
            None => None,
        };
        tokens.lookup(&TokenKey::memory(name, owner))
    }

    pub fn function_id(&self, name: &str) -> Option<FuncId> {
        self.by_name.get(name).copied()
    }
}

impl InstructionModel for ModuleModel {
    fn classify(&self, inst: InstId, tokens: &mut TokenTable) -> Statement {
        let func = self.owner[&inst];
        let instr = self.op_of(inst);
        match &instr.op {
            Op::AddressOf { lhs, rhs } => {
                let l = self.var_token(lhs, func, tokens);
                let r = self.place_token(rhs, func, tokens);
                Statement::address_of(l, r)
            }
            Op::Copy { lhs, rhs } => {
                let l = self.var_token(lhs, func, tokens);
                let r = self.var_token(rhs, func, tokens);
                Statement::copy(l, r)
            }
            Op::Load { lhs, rhs } => {
                let l = self.var_token(lhs, func, tokens);
                let r = self.var_token(rhs, func, tokens);
                Statement::load(l, r)
            }
            Op::Store { lhs, rhs } => {
                let l = self.var_token(lhs, func, tokens);
                let r = self.var_token(rhs, func, tokens);
                Statement::store(l, r)
            }
            Op::Alloc { lhs } => {
                let l = self.var_token(lhs, func, tokens);
                let site =
                    tokens.canonicalize(TokenKey::memory(format!("heap:{}", instr.line), Some(func)));
                Statement::address_of(l, site)
            }
            Op::Field { lhs, base, offset } => {
                let l = self.var_token(lhs, func, tokens);
                let b = self.var_token(base, func, tokens);
                Statement::field_access(l, b, *offset)
            }
            Op::Call { .. } | Op::Ret { .. } | Op::Br { .. } | Op::Check { .. } => Statement::nop(),
        }
    }

    fn callee_of(&self, inst: InstId) -> Callee {
        match &self.op_of(inst).op {
            Op::Call { callee, .. } => match self.by_name.get(callee.as_str()) {
                Some(&f) => Callee::Resolved(f),
                None => Callee::Unresolved,
            },
            _ => Callee::NotACall,
        }
    }

    fn arguments_of(&self, inst: InstId, tokens: &mut TokenTable) -> Vec<TokenId> {
        let func = self.owner[&inst];
        match &self.op_of(inst).op {
            Op::Call { args, .. } => args
                .iter()
                .map(|a| self.var_token(a, func, tokens))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn formals_of(&self, func: FuncId, tokens: &mut TokenTable) -> Vec<TokenId> {
        self.module.functions[func as usize]
            .params
            .iter()
            .map(|p| tokens.canonicalize(TokenKey::variable(p, Some(func))))
            .collect()
    }

    fn does_not_return(&self, func: FuncId) -> bool {
        !self.module.functions[func as usize]
            .instructions()
            .any(|i| matches!(i.op, Op::Ret { value: Some(_) }))
    }

    fn return_token_of(&self, func: FuncId, tokens: &mut TokenTable) -> Option<TokenId> {
        let mut ret = None;
        for instr in self.module.functions[func as usize].instructions() {
            if let Op::Ret { value: Some(v) } = &instr.op {
                ret = Some(self.var_token(v, func, tokens));
            }
        }
        ret
    }

    fn result_token_of(&self, inst: InstId, tokens: &mut TokenTable) -> Option<TokenId> {
        let func = self.owner[&inst];
        match &self.op_of(inst).op {
            Op::Call {
                result: Some(r), ..
            } => Some(self.var_token(r, func, tokens)),
            _ => None,
        }
    }

    fn skip(&self, func: FuncId) -> bool {
        let f = &self.module.functions[func as usize];
        f.is_extern || SKIP_PREFIXES.iter().any(|p| f.name.starts_with(p))
    }

    fn benchmark_pair(&self, inst: InstId, tokens: &mut TokenTable) -> Option<(TokenId, TokenId)> {
        let func = self.owner[&inst];
        match &self.op_of(inst).op {
            Op::Check { a, b } => Some((
                self.var_token(a, func, tokens),
                self.var_token(b, func, tokens),
            )),
            _ => None,
        }
    }

    fn global_graph(&self, tokens: &mut TokenTable) -> PointsToGraph {
        let mut graph = PointsToGraph::new();
        for global in &self.module.globals {
            let var = tokens.canonicalize(TokenKey::variable(&global.name, None));
            let cell = tokens.canonicalize(TokenKey::memory(&global.name, None));
            graph.insert(var, cell);
            if let Some(target) = &global.init_addr_of {
                let target_cell = tokens.canonicalize(TokenKey::memory(target, None));
                graph.insert(cell, target_cell);
            }
        }
        graph
    }

    fn argument_graph(&self, func: FuncId, tokens: &mut TokenTable) -> PointsToGraph {
        let mut graph = PointsToGraph::new();
        for param in &self.module.functions[func as usize].params {
            let formal = tokens.canonicalize(TokenKey::variable(param, Some(func)));
            let cell = tokens.canonicalize(TokenKey::memory(param, Some(func)));
            graph.insert(formal, cell);
        }
        graph
    }

    fn describe(&self, inst: InstId) -> String {
        let instr = self.op_of(inst);
        let text = match &instr.op {
            Op::AddressOf { lhs, rhs } => format!("{lhs} = &{rhs}"),
            Op::Copy { lhs, rhs } => format!("{lhs} = {rhs}"),
            Op::Load { lhs, rhs } => format!("{lhs} = *{rhs}"),
            Op::Store { lhs, rhs } => format!("*{lhs} = {rhs}"),
            Op::Alloc { lhs } => format!("{lhs} = alloc"),
            Op::Field { lhs, base, offset } => format!("{lhs} = &{base}.{offset}"),
            Op::Call {
                result,
                callee,
                args,
            } => {
                let args = args.join(", ");
                match result {
                    Some(r) => format!("{r} = call {callee}({args})"),
                    None => format!("call {callee}({args})"),
                }
            }
            Op::Ret { value: Some(v) } => format!("ret {v}"),
            Op::Ret { value: None } => "ret".to_string(),
            Op::Br { targets } => format!("br {}", targets.join(" ")),
            Op::Check { a, b } => format!("check {a}, {b}"),
        };
        format!("line {}: {}", instr.line, text)
    }
}

impl ControlFlow for ModuleModel {
    fn functions(&self) -> Vec<FuncId> {
        self.module.functions.iter().map(|f| f.id).collect()
    }

    fn function_name(&self, func: FuncId) -> &str {
        &self.module.functions[func as usize].name
    }

    fn instructions(&self, func: FuncId) -> Vec<InstId> {
        self.module.functions[func as usize]
            .instructions()
            .map(|i| i.id)
            .collect()
    }

    fn entry(&self, func: FuncId) -> Option<InstId> {
        self.module.functions[func as usize]
            .instructions()
            .next()
            .map(|i| i.id)
    }

    fn last(&self, func: FuncId) -> Option<InstId> {
        self.module.functions[func as usize]
            .instructions()
            .last()
            .map(|i| i.id)
    }

    fn predecessors(&self, inst: InstId) -> Vec<InstId> {
        self.preds.get(&inst).cloned().unwrap_or_default()
    }

    fn successors(&self, inst: InstId) -> Vec<InstId> {
        self.succs.get(&inst).cloned().unwrap_or_default()
    }

    fn function_of(&self, inst: InstId) -> FuncId {
        self.owner[&inst]
    }
}
