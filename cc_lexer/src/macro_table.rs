//! Macro definitions and the hide-set bookkeeping that stops a
//! self-referential macro from expanding forever. Grounded on xcc's
//! `PPMacroDef` (object-like vs. function-like, with a `tokens` replacement
//! list) and its `isMacroInUse`/`expansion_list` hide-set mechanism in
//! `lexer.h`: a macro that is currently being expanded is painted, and a
//! painted macro is rescanned as a plain identifier instead of expanding
//! again.

use hashbrown::HashMap;

use cc_arena::IdentHandle;
use cc_common::Location;

use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    ObjectLike,
    FunctionLike,
}

#[derive(Debug, Clone)]
pub struct MacroDef {
    pub kind: MacroKind,
    pub params: Vec<IdentHandle>,
    pub variadic: bool,
    pub replacement: Vec<Token>,
    pub defined_at: Location,
}

impl MacroDef {
    pub fn object_like(replacement: Vec<Token>, defined_at: Location) -> Self {
        Self { kind: MacroKind::ObjectLike, params: Vec::new(), variadic: false, replacement, defined_at }
    }

    pub fn function_like(params: Vec<IdentHandle>, variadic: bool, replacement: Vec<Token>, defined_at: Location) -> Self {
        Self { kind: MacroKind::FunctionLike, params, variadic, replacement, defined_at }
    }

    /// Two definitions are "identical" per §6.10.3p2 if they have the same
    /// kind, parameter list, and a token-for-token-equal replacement list
    /// (whitespace-separation aside). Used to permit a harmless re-`#define`.
    pub fn is_identical_to(&self, other: &MacroDef) -> bool {
        if self.kind != other.kind || self.params != other.params || self.variadic != other.variadic {
            return false;
        }
        if self.replacement.len() != other.replacement.len() {
            return false;
        }
        self.replacement.iter().zip(&other.replacement).all(|(a, b)| a.kind == b.kind)
    }
}

/// Table of active macro definitions plus the hide-set used while expanding.
/// The hide-set is a plain stack of currently-expanding names: xcc paints a
/// macro while it is "in use" and unpaints it once the expansion's tokens
/// have all been rescanned, which a stack models directly since expansions
/// nest but never interleave.
pub struct MacroTable {
    defs: HashMap<IdentHandle, MacroDef>,
    expanding: Vec<IdentHandle>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self { defs: HashMap::new(), expanding: Vec::new() }
    }

    pub fn define(&mut self, name: IdentHandle, def: MacroDef) -> Option<MacroDef> {
        self.defs.insert(name, def)
    }

    pub fn undef(&mut self, name: IdentHandle) -> Option<MacroDef> {
        self.defs.remove(&name)
    }

    pub fn is_defined(&self, name: IdentHandle) -> bool {
        self.defs.contains_key(&name)
    }

    pub fn get(&self, name: IdentHandle) -> Option<&MacroDef> {
        self.defs.get(&name)
    }

    /// True if `name` is currently being expanded somewhere on the
    /// expansion stack: a self-reference must be left as a plain identifier
    /// rather than re-expanded (prevents infinite recursion for e.g.
    /// `#define x x`).
    pub fn is_in_use(&self, name: IdentHandle) -> bool {
        self.expanding.contains(&name)
    }

    pub fn begin_expansion(&mut self, name: IdentHandle) {
        self.expanding.push(name);
    }

    pub fn end_expansion(&mut self, name: IdentHandle) {
        if let Some(pos) = self.expanding.iter().rposition(|n| *n == name) {
            self.expanding.remove(pos);
        }
    }
}

impl Default for MacroTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;
    use cc_arena::{Arena, Interner};

    #[test]
    fn define_and_lookup() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let name = interner.intern("FOO");
        let mut table = MacroTable::new();
        table.define(name, MacroDef::object_like(vec![Token::new(TokenKind::PpNumber("1".into()), Location::NONE)], Location::NONE));
        assert!(table.is_defined(name));
        assert_eq!(table.get(name).unwrap().replacement.len(), 1);
    }

    #[test]
    fn undef_removes_definition() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let name = interner.intern("FOO");
        let mut table = MacroTable::new();
        table.define(name, MacroDef::object_like(vec![], Location::NONE));
        table.undef(name);
        assert!(!table.is_defined(name));
    }

    #[test]
    fn self_referential_macro_is_painted_then_unpainted() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let name = interner.intern("FOO");
        let mut table = MacroTable::new();
        assert!(!table.is_in_use(name));
        table.begin_expansion(name);
        assert!(table.is_in_use(name));
        table.end_expansion(name);
        assert!(!table.is_in_use(name));
    }

    #[test]
    fn identical_redefinition_is_detected() {
        let tok = Token::new(TokenKind::PpNumber("1".into()), Location::NONE);
        let a = MacroDef::object_like(vec![tok.clone()], Location::NONE);
        let b = MacroDef::object_like(vec![tok], Location::NONE);
        assert!(a.is_identical_to(&b));
    }
}
