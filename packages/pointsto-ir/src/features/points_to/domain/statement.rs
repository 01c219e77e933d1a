//! Classified pointer statements
//!
//! The instruction model reduces every concrete instruction to one of these
//! closed variants exactly once; the interpreter consumes them by exhaustive
//! match and never inspects concrete IR types.

use super::token::TokenId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// `p = q`
    Copy,
    /// `p = &q` (also heap allocation: `q` is a memory-flagged site)
    AddressOf,
    /// `p = *q`
    Load,
    /// `*p = q`
    Store,
    /// `p = &base->offset`
    FieldAccess { offset: u32 },
    /// `formal <- actual` at call entry
    ArgumentBind,
    /// `result <- callee return value` at call exit
    ReturnBind,
    /// Pointer-irrelevant instruction
    Nop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub lhs: Option<TokenId>,
    pub rhs: Option<TokenId>,
}

impl Statement {
    pub fn nop() -> Self {
        Self {
            kind: StatementKind::Nop,
            lhs: None,
            rhs: None,
        }
    }

    pub fn copy(lhs: TokenId, rhs: TokenId) -> Self {
        Self {
            kind: StatementKind::Copy,
            lhs: Some(lhs),
            rhs: Some(rhs),
        }
    }

    pub fn address_of(lhs: TokenId, rhs: TokenId) -> Self {
        Self {
            kind: StatementKind::AddressOf,
            lhs: Some(lhs),
            rhs: Some(rhs),
        }
    }

    pub fn load(lhs: TokenId, rhs: TokenId) -> Self {
        Self {
            kind: StatementKind::Load,
            lhs: Some(lhs),
            rhs: Some(rhs),
        }
    }

    pub fn store(lhs: TokenId, rhs: TokenId) -> Self {
        Self {
            kind: StatementKind::Store,
            lhs: Some(lhs),
            rhs: Some(rhs),
        }
    }

    pub fn field_access(lhs: TokenId, base: TokenId, offset: u32) -> Self {
        Self {
            kind: StatementKind::FieldAccess { offset },
            lhs: Some(lhs),
            rhs: Some(base),
        }
    }

    pub fn argument_bind(formal: TokenId, actual: TokenId) -> Self {
        Self {
            kind: StatementKind::ArgumentBind,
            lhs: Some(formal),
            rhs: Some(actual),
        }
    }

    pub fn return_bind(result: TokenId, ret: TokenId) -> Self {
        Self {
            kind: StatementKind::ReturnBind,
            lhs: Some(result),
            rhs: Some(ret),
        }
    }

    pub fn is_nop(&self) -> bool {
        self.kind == StatementKind::Nop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let s = Statement::field_access(1, 2, 3);
        assert_eq!(s.kind, StatementKind::FieldAccess { offset: 3 });
        assert_eq!(s.lhs, Some(1));
        assert_eq!(s.rhs, Some(2));
        assert!(Statement::nop().is_nop());
        assert!(!Statement::copy(0, 1).is_nop());
    }
}
