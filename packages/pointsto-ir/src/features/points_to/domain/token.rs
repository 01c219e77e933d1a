//! Token interning table
//!
//! A `Token` is the canonical identity of one abstract storage location:
//! a source variable, an allocation site, a formal parameter, or a derived
//! field cell. Structurally identical tokens intern to the same `TokenId`,
//! so equality and hashing are by id, never by deep comparison. Tokens are
//! never destroyed; the table lives for the whole analysis.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Interned token identifier
pub type TokenId = u32;

/// Function identifier (dense, assigned by the instruction model)
pub type FuncId = u32;

/// Instruction identifier (dense, assigned by the instruction model)
pub type InstId = u32;

/// Structural identity of a token before interning
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenKey {
    /// Base entity name (variable, allocation site, formal, return slot)
    pub entity: String,

    /// Owning function; `None` for globals and their memory cells
    pub owner: Option<FuncId>,

    /// Static field offset for field-derived tokens
    pub offset: Option<u32>,

    /// Memory flag: allocation-site / object-cell tokens whose "value" is
    /// their own identity rather than something they point to
    pub is_mem: bool,
}

impl TokenKey {
    /// A plain variable token
    pub fn variable(entity: impl Into<String>, owner: Option<FuncId>) -> Self {
        Self {
            entity: entity.into(),
            owner,
            offset: None,
            is_mem: false,
        }
    }

    /// A memory-flagged token (object cell, allocation site)
    pub fn memory(entity: impl Into<String>, owner: Option<FuncId>) -> Self {
        Self {
            entity: entity.into(),
            owner,
            offset: None,
            is_mem: true,
        }
    }

    /// Field-derived variant of this key
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Process-lifetime interning table for tokens
///
/// Growth is bounded by the number of distinct `(entity, offset)` pairs in
/// the program; stale field tokens are acceptable garbage.
#[derive(Debug, Default)]
pub struct TokenTable {
    interned: FxHashMap<TokenKey, TokenId>,
    tokens: Vec<TokenKey>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the unique interned id equal to `key`, creating it if absent.
    /// Repeated calls with structurally equal keys return the same id.
    pub fn canonicalize(&mut self, key: TokenKey) -> TokenId {
        if let Some(&id) = self.interned.get(&key) {
            return id;
        }
        let id = self.tokens.len() as TokenId;
        self.tokens.push(key.clone());
        self.interned.insert(key, id);
        id
    }

    /// Non-mutating lookup, mainly for queries after analysis
    pub fn lookup(&self, key: &TokenKey) -> Option<TokenId> {
        self.interned.get(key).copied()
    }

    /// Field-specific token for `(base, offset)`, created on first use.
    /// The derived token keeps the base's owner and memory flag.
    pub fn derive_field(&mut self, base: TokenId, offset: u32) -> TokenId {
        let key = self.tokens[base as usize].clone().with_offset(offset);
        self.canonicalize(key)
    }

    pub fn key(&self, id: TokenId) -> &TokenKey {
        &self.tokens[id as usize]
    }

    pub fn is_mem(&self, id: TokenId) -> bool {
        self.tokens[id as usize].is_mem
    }

    pub fn owner(&self, id: TokenId) -> Option<FuncId> {
        self.tokens[id as usize].owner
    }

    /// Locality test used by the interprocedural escape filter
    pub fn is_local_to(&self, id: TokenId, func: FuncId) -> bool {
        self.tokens[id as usize].owner == Some(func)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Printable form: entity, field offset suffix, memory marker
    pub fn display(&self, id: TokenId) -> String {
        let key = &self.tokens[id as usize];
        let mut s = key.entity.clone();
        if let Some(off) = key.offset {
            s.push_str(&format!(".{off}"));
        }
        if key.is_mem && !key.entity.contains(':') {
            s.push('\'');
        }
        s
    }
}

impl fmt::Display for TokenTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TokenTable {{ tokens: {} }}", self.tokens.len())
    }
}
