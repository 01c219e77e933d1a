//! Text IR parser
//!
//! Line-oriented format:
//!
//! ```text
//! global g
//! global p = &g
//! extern puts
//!
//! func main(a, b) {
//! entry:
//!     x = &g
//!     y = x
//!     z = *y
//!     *z = y
//!     h = alloc
//!     f = &h.0
//!     r = call id(x)
//!     check x, y
//!     br loop exit
//! exit:
//!     ret r
//! }
//! ```
//!
//! `#` starts a comment. A function body starts with an implicit block when
//! the first line is not a label. Instruction ids are assigned densely in
//! textual order across the whole module.

use super::super::domain::{Block, Function, Global, Instr, Module, Op};
use crate::features::points_to::domain::{FuncId, InstId};
use rustc_hash::FxHashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: unrecognized statement: {text}")]
    Unrecognized { line: u32, text: String },
    #[error("line {line}: malformed function header: {text}")]
    BadHeader { line: u32, text: String },
    #[error("line {line}: statement outside any function: {text}")]
    OutsideFunction { line: u32, text: String },
    #[error("line {line}: unterminated function `{name}`")]
    Unterminated { line: u32, name: String },
    #[error("line {line}: branch to unknown block `{target}` in `{func}`")]
    UnknownBlock {
        line: u32,
        target: String,
        func: String,
    },
    #[error("line {line}: duplicate definition of `{name}`")]
    Duplicate { line: u32, name: String },
    #[error("line {line}: field offset is not a number: {text}")]
    BadOffset { line: u32, text: String },
}

pub fn parse_module(source: &str) -> Result<Module, ParseError> {
    Parser::new(source).parse()
}

struct Parser<'s> {
    lines: Vec<(u32, &'s str)>,
    pos: usize,
    next_inst: InstId,
    names: FxHashSet<String>,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Self {
        let lines = source
            .lines()
            .enumerate()
            .map(|(i, l)| {
                let l = l.split('#').next().unwrap_or("").trim();
                (i as u32 + 1, l)
            })
            .filter(|(_, l)| !l.is_empty())
            .collect();
        Self {
            lines,
            pos: 0,
            next_inst: 0,
            names: FxHashSet::default(),
        }
    }

    fn parse(mut self) -> Result<Module, ParseError> {
        let mut module = Module::default();
        while self.pos < self.lines.len() {
            let (line, text) = self.lines[self.pos];
            if let Some(rest) = text.strip_prefix("global ") {
                module.globals.push(parse_global(line, rest.trim())?);
                self.claim(line, global_name(rest.trim()))?;
                self.pos += 1;
            } else if let Some(rest) = text.strip_prefix("extern ") {
                let name = rest.trim().to_string();
                self.claim(line, name.clone())?;
                module.functions.push(Function {
                    id: module.functions.len() as FuncId,
                    name,
                    params: Vec::new(),
                    blocks: Vec::new(),
                    is_extern: true,
                });
                self.pos += 1;
            } else if text.starts_with("func ") {
                let func = self.parse_function(module.functions.len() as FuncId)?;
                self.claim(line, func.name.clone())?;
                module.functions.push(func);
            } else {
                return Err(ParseError::OutsideFunction {
                    line,
                    text: text.to_string(),
                });
            }
        }
        validate_branches(&module)?;
        Ok(module)
    }

    fn claim(&mut self, line: u32, name: String) -> Result<(), ParseError> {
        if !self.names.insert(name.clone()) {
            return Err(ParseError::Duplicate { line, name });
        }
        Ok(())
    }

    fn parse_function(&mut self, id: FuncId) -> Result<Function, ParseError> {
        let (header_line, header) = self.lines[self.pos];
        let (name, params) = parse_header(header_line, header)?;
        self.pos += 1;

        let mut blocks: Vec<Block> = Vec::new();
        loop {
            let (line, text) = match self.lines.get(self.pos) {
                Some(&lt) => lt,
                None => {
                    return Err(ParseError::Unterminated {
                        line: header_line,
                        name,
                    })
                }
            };
            self.pos += 1;
            if text == "}" {
                break;
            }
            if let Some(label) = text.strip_suffix(':') {
                blocks.push(Block {
                    label: label.trim().to_string(),
                    instrs: Vec::new(),
                });
                continue;
            }
            let op = parse_op(line, text)?;
            if blocks.is_empty() {
                // Body without a leading label gets an implicit entry block
                blocks.push(Block {
                    label: "entry".to_string(),
                    instrs: Vec::new(),
                });
            }
            let inst = Instr {
                id: self.next_inst,
                line,
                op,
            };
            self.next_inst += 1;
            if let Some(block) = blocks.last_mut() {
                block.instrs.push(inst);
            }
        }
        Ok(Function {
            id,
            name,
            params,
            blocks,
            is_extern: false,
        })
    }
}

fn global_name(rest: &str) -> String {
    rest.split(['=', ' ']).next().unwrap_or("").trim().to_string()
}

fn parse_global(line: u32, rest: &str) -> Result<Global, ParseError> {
    match rest.split_once('=') {
        None => Ok(Global {
            name: rest.to_string(),
            init_addr_of: None,
        }),
        Some((name, init)) => {
            let init = init.trim();
            let target = init.strip_prefix('&').ok_or_else(|| ParseError::Unrecognized {
                line,
                text: rest.to_string(),
            })?;
            Ok(Global {
                name: name.trim().to_string(),
                init_addr_of: Some(target.trim().to_string()),
            })
        }
    }
}

fn parse_header(line: u32, text: &str) -> Result<(String, Vec<String>), ParseError> {
    let bad = || ParseError::BadHeader {
        line,
        text: text.to_string(),
    };
    let rest = text.strip_prefix("func ").ok_or_else(bad)?;
    let rest = rest.strip_suffix('{').ok_or_else(bad)?.trim();
    let open = rest.find('(').ok_or_else(bad)?;
    let close = rest.rfind(')').ok_or_else(bad)?;
    let name = rest[..open].trim().to_string();
    if name.is_empty() || close < open {
        return Err(bad());
    }
    let params = rest[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    Ok((name, params))
}

fn parse_op(line: u32, text: &str) -> Result<Op, ParseError> {
    let unrecognized = || ParseError::Unrecognized {
        line,
        text: text.to_string(),
    };

    // Keyword must stand alone: `retval = q` is a plain copy
    if text == "ret" {
        return Ok(Op::Ret { value: None });
    }
    if let Some(rest) = text.strip_prefix("ret ") {
        return Ok(Op::Ret {
            value: Some(rest.trim().to_string()),
        });
    }
    if let Some(rest) = text.strip_prefix("br ") {
        let targets: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
        if targets.is_empty() {
            return Err(unrecognized());
        }
        return Ok(Op::Br { targets });
    }
    if let Some(rest) = text.strip_prefix("check ") {
        let (a, b) = rest.split_once(',').ok_or_else(unrecognized)?;
        return Ok(Op::Check {
            a: a.trim().to_string(),
            b: b.trim().to_string(),
        });
    }
    if let Some(rest) = text.strip_prefix("call ") {
        return parse_call(line, None, rest.trim());
    }
    if let Some(rest) = text.strip_prefix('*') {
        // *x = y
        let (lhs, rhs) = rest.split_once('=').ok_or_else(unrecognized)?;
        return Ok(Op::Store {
            lhs: lhs.trim().to_string(),
            rhs: rhs.trim().to_string(),
        });
    }

    let (lhs, rhs) = text.split_once('=').ok_or_else(unrecognized)?;
    let lhs = lhs.trim().to_string();
    let rhs = rhs.trim();
    if lhs.is_empty() || rhs.is_empty() {
        return Err(unrecognized());
    }
    if rhs == "alloc" {
        return Ok(Op::Alloc { lhs });
    }
    if let Some(rest) = rhs.strip_prefix("call ") {
        return parse_call(line, Some(lhs), rest.trim());
    }
    if let Some(target) = rhs.strip_prefix('&') {
        // x = &y.N is a field access, x = &y a plain address-of
        if let Some((base, off)) = target.rsplit_once('.') {
            let offset = off.trim().parse::<u32>().map_err(|_| ParseError::BadOffset {
                line,
                text: text.to_string(),
            })?;
            return Ok(Op::Field {
                lhs,
                base: base.trim().to_string(),
                offset,
            });
        }
        return Ok(Op::AddressOf {
            lhs,
            rhs: target.trim().to_string(),
        });
    }
    if let Some(src) = rhs.strip_prefix('*') {
        return Ok(Op::Load {
            lhs,
            rhs: src.trim().to_string(),
        });
    }
    Ok(Op::Copy {
        lhs,
        rhs: rhs.to_string(),
    })
}

fn parse_call(line: u32, result: Option<String>, rest: &str) -> Result<Op, ParseError> {
    let bad = || ParseError::Unrecognized {
        line,
        text: rest.to_string(),
    };
    let open = rest.find('(').ok_or_else(bad)?;
    let close = rest.rfind(')').ok_or_else(bad)?;
    if close < open {
        return Err(bad());
    }
    let callee = rest[..open].trim().to_string();
    let args = rest[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Op::Call {
        result,
        callee,
        args,
    })
}

fn validate_branches(module: &Module) -> Result<(), ParseError> {
    for func in &module.functions {
        let labels: FxHashSet<&str> = func.blocks.iter().map(|b| b.label.as_str()).collect();
        for instr in func.instructions() {
            if let Op::Br { targets } = &instr.op {
                for target in targets {
                    if !labels.contains(target.as_str()) {
                        return Err(ParseError::UnknownBlock {
                            line: instr.line,
                            target: target.clone(),
                            func: func.name.clone(),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}
