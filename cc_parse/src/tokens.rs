//! The parser's view of the token stream (§4.5): a [`Preprocessor`] plus a
//! one-token push-back queue, so the parser can look one token past the
//! current one, or un-consume the current token once a longer lookahead
//! resolves an ambiguity (e.g. `(identifier)` as a cast vs. a parenthesized
//! expression).

use cc_arena::Interner;
use cc_common::DiagnosticEngine;
use cc_lexer::token::Token;
use cc_lexer::Preprocessor;

pub struct TokenBuffer<'a, 'arena> {
    pp: Preprocessor<'a, 'arena>,
    current: Token,
    lookahead: Option<Token>,
}

impl<'a, 'arena> TokenBuffer<'a, 'arena> {
    pub fn new(mut pp: Preprocessor<'a, 'arena>) -> Self {
        let current = pp.next();
        Self { pp, current, lookahead: None }
    }

    pub fn peek(&self) -> &Token {
        &self.current
    }

    /// Look one token past `peek()`, fetching it from the preprocessor the
    /// first time it's asked for and caching it in the push-back slot.
    pub fn peek2(&mut self) -> &Token {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.pp.next());
        }
        self.lookahead.as_ref().unwrap()
    }

    /// Consume and return the current token, advancing to the next one.
    pub fn bump(&mut self) -> Token {
        let next = self.lookahead.take().unwrap_or_else(|| self.pp.next());
        std::mem::replace(&mut self.current, next)
    }

    /// Un-consume: `tok` becomes the new current token, and the previous
    /// current token is pushed into the one-slot lookahead queue.
    pub fn push_back(&mut self, tok: Token) {
        debug_assert!(self.lookahead.is_none(), "push-back queue only holds one token");
        let old_current = std::mem::replace(&mut self.current, tok);
        self.lookahead = Some(old_current);
    }

    pub fn interner(&self) -> &Interner<'arena> {
        self.pp.interner()
    }

    pub fn interner_mut(&mut self) -> &mut Interner<'arena> {
        self.pp.interner_mut()
    }

    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticEngine {
        self.pp.diagnostics_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_arena::Arena;
    use cc_common::DiagnosticEngine;
    use cc_source::{CompilerOptions, SourceManager};

    #[test]
    fn peek2_does_not_consume() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let mut mgr = SourceManager::new(CompilerOptions::default());
        mgr.add_main_string("t.c", "1 2 3");
        let mut diags = DiagnosticEngine::new(None);
        let mut buf = TokenBuffer::new(Preprocessor::new(&mut mgr, &mut interner, &mut diags));

        let first = format!("{:?}", buf.peek().kind);
        let _ = buf.peek2();
        assert_eq!(format!("{:?}", buf.peek().kind), first);
    }

    #[test]
    fn push_back_replays_the_same_token() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let mut mgr = SourceManager::new(CompilerOptions::default());
        mgr.add_main_string("t.c", "1 2");
        let mut diags = DiagnosticEngine::new(None);
        let mut buf = TokenBuffer::new(Preprocessor::new(&mut mgr, &mut interner, &mut diags));

        let tok = buf.bump();
        let replayed = format!("{:?}", tok.kind);
        buf.push_back(tok);
        assert_eq!(format!("{:?}", buf.peek().kind), replayed);
        let second = buf.bump();
        assert_eq!(format!("{:?}", second.kind), replayed);
    }
}
