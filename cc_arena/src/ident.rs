//! The identifier interner.
//!
//! Grounded on xcc's `IdentifierTable` (`IdentifierTable.h`): a single
//! string-keyed hash table, seeded at construction with every C keyword, so
//! the lexer can tell "this spelling is a keyword" apart from "this spelling
//! is an ordinary identifier" with a single lookup instead of a second pass
//! of string comparisons.

use crate::arena::Arena;
use hashbrown::HashMap;

/// A stable handle to an interned spelling. Cheap to copy, compare, and use
/// as a hash key; never dereferenced directly except through [`Interner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentHandle(u32);

impl IdentHandle {
    /// Reserved for call sites that need a placeholder before a real
    /// identifier is known (error recovery).
    pub const INVALID: IdentHandle = IdentHandle(u32::MAX);
}

/// What kind of token a spelling resolves to, cached at intern time so
/// lookups don't re-run keyword matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Identifier,
    Keyword,
}

const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do",
    "double", "else", "enum", "extern", "float", "for", "goto", "if",
    "inline", "int", "long", "register", "restrict", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "typedef", "union",
    "unsigned", "void", "volatile", "while",
    "_Alignas", "_Alignof", "_Atomic", "_Bool", "_Complex", "_Generic",
    "_Imaginary", "_Noreturn", "_Static_assert", "_Thread_local", "_BitInt",
    "__attribute__", "__extension__", "__typeof__", "__real__", "__imag__",
    "__int128", "typeof", "nullptr",
];

/// Owns every interned spelling's backing storage (allocated out of an
/// [`Arena`]) and the handle table over it.
pub struct Interner<'arena> {
    arena: &'arena Arena,
    strings: Vec<&'arena str>,
    classes: Vec<TokenClass>,
    table: HashMap<&'arena str, IdentHandle>,
}

impl<'arena> Interner<'arena> {
    pub fn new(arena: &'arena Arena) -> Self {
        let mut interner = Self {
            arena,
            strings: Vec::with_capacity(8192),
            classes: Vec::with_capacity(8192),
            table: HashMap::with_capacity(8192),
        };
        for kw in KEYWORDS {
            let handle = interner.intern(kw);
            interner.classes[handle.0 as usize] = TokenClass::Keyword;
        }
        interner
    }

    /// Intern `text`, allocating it in the arena only the first time it is
    /// seen.
    pub fn intern(&mut self, text: &str) -> IdentHandle {
        if let Some(&handle) = self.table.get(text) {
            return handle;
        }
        let owned = self.arena.alloc_str(text);
        let handle = IdentHandle(self.strings.len() as u32);
        self.strings.push(owned);
        self.classes.push(TokenClass::Identifier);
        self.table.insert(owned, handle);
        handle
    }

    pub fn resolve(&self, handle: IdentHandle) -> &'arena str {
        self.strings[handle.0 as usize]
    }

    pub fn class_of(&self, handle: IdentHandle) -> TokenClass {
        self.classes[handle.0 as usize]
    }

    pub fn is_keyword(&self, handle: IdentHandle) -> bool {
        self.class_of(handle) == TokenClass::Keyword
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_spelling_returns_same_handle() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), "foo");
    }

    #[test]
    fn keywords_are_classified_at_construction() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let kw = interner.intern("while");
        let ident = interner.intern("while_count");
        assert!(interner.is_keyword(kw));
        assert!(!interner.is_keyword(ident));
    }

    #[test]
    fn distinct_spellings_get_distinct_handles() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let a = interner.intern("alpha");
        let b = interner.intern("beta");
        assert_ne!(a, b);
    }
}
