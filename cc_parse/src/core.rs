//! The parser/Sema driver (§4.6): owns the token buffer, the scope stacks,
//! and the current function's [`IrBuilder`], and dispatches top-level
//! declarations. Mirrors xcc's `Parser` (`parser.cpp`): a single struct
//! threading lexer, `Sema`, and `JumpBuilder` state together rather than
//! separate passes over a free-standing AST.

use cc_arena::{Arena, IdentHandle};
use cc_common::{Diagnostic, DiagnosticEngine, Location, LocationResolver, Severity};
use cc_ir::{BlockScope, IrBuilder, LabelScope, Stmt, TagScope};
use cc_lexer::token::{Punct, TokenKind};
use cc_lexer::Preprocessor;
use cc_types::{IntegerKind, PrimitiveTag, Type, TypeTable};

use crate::tokens::TokenBuffer;

/// Tracks, in lockstep with [`BlockScope`]'s own push/pop, whether each
/// declared name has a fixed address (file scope, or an explicit
/// `static`/`extern` at block scope) — information `VarInfo` doesn't carry,
/// needed to choose between `ExprKind::GlobalRef` and `ExprKind::VariableRef`
/// when a later identifier reference resolves back to this declaration.
#[derive(Default)]
pub(crate) struct StorageScope {
    blocks: Vec<Vec<(IdentHandle, bool)>>,
}

impl StorageScope {
    pub fn push_block(&mut self) {
        self.blocks.push(Vec::new());
    }

    pub fn pop_block(&mut self) {
        self.blocks.pop();
    }

    pub fn declare(&mut self, name: IdentHandle, is_global: bool) {
        self.blocks.last_mut().expect("declare with no open block").push((name, is_global));
    }

    pub fn lookup(&self, name: IdentHandle) -> Option<bool> {
        for block in self.blocks.iter().rev() {
            if let Some((_, flag)) = block.iter().rev().find(|(n, _)| *n == name) {
                return Some(*flag);
            }
        }
        None
    }
}

/// A name bound by `typedef`, looked up the same innermost-first way as an
/// ordinary variable but kept in its own namespace (a `struct foo` tag and a
/// `typedef` named `foo` don't collide).
#[derive(Default)]
pub(crate) struct TypedefScope<'a> {
    blocks: Vec<Vec<(IdentHandle, &'a Type<'a>)>>,
}

impl<'a> TypedefScope<'a> {
    pub fn push_block(&mut self) {
        self.blocks.push(Vec::new());
    }

    pub fn pop_block(&mut self) {
        self.blocks.pop();
    }

    pub fn declare(&mut self, name: IdentHandle, ty: &'a Type<'a>) {
        self.blocks.last_mut().expect("declare with no open block").push((name, ty));
    }

    pub fn lookup(&self, name: IdentHandle) -> Option<&'a Type<'a>> {
        for block in self.blocks.iter().rev() {
            if let Some((_, ty)) = block.iter().rev().find(|(n, _)| *n == name) {
                return Some(*ty);
            }
        }
        None
    }
}

/// One `switch`'s still-open case/default targets, collected while its body
/// is parsed so the dispatch comparison chain can be emitted once the whole
/// body (and therefore every `case`/`default` label) has been seen.
pub(crate) struct SwitchCtx {
    pub cases: Vec<(i128, crate::stmt_parse::LabelId)>,
    pub default_label: Option<crate::stmt_parse::LabelId>,
}

/// State specific to the function body currently being parsed; torn down
/// when its closing `}` is reached.
pub(crate) struct FunctionContext<'a> {
    pub builder: IrBuilder<'a>,
    pub labels: LabelScope,
    pub return_type: &'a Type<'a>,
    pub name: IdentHandle,
    /// `break`'s target: the nearest enclosing loop's exit, or the nearest
    /// enclosing `switch`'s exit, whichever is innermost.
    pub break_targets: Vec<crate::stmt_parse::LabelId>,
    /// `continue`'s target: the nearest enclosing loop only — a `switch`
    /// never pushes one, so `continue` inside a `switch` inside a loop
    /// still reaches the loop.
    pub continue_targets: Vec<crate::stmt_parse::LabelId>,
    pub switch_stack: Vec<SwitchCtx>,
}

pub struct Parser<'a> {
    pub(crate) tokens: TokenBuffer<'a, 'a>,
    pub(crate) arena: &'a Arena,
    pub(crate) types: TypeTable<'a>,
    pub(crate) vars: BlockScope<'a>,
    pub(crate) tags: TagScope<'a>,
    pub(crate) storage: StorageScope,
    pub(crate) typedefs: TypedefScope<'a>,
    pub(crate) func: Option<FunctionContext<'a>>,
    pub(crate) items: Vec<&'a Stmt<'a>>,
    /// `&1`/`&0` sentinel int constants, the way xcc's `Parser` keeps
    /// `intzero`/`intone`/`cfalse` around instead of re-synthesizing the
    /// same tiny constant expression at every call site.
    pub(crate) int_ty: &'a Type<'a>,
    /// The result type of `sizeof`/pointer-difference: `unsigned long`,
    /// matching xcc's choice of `size_t`'s representation on its target.
    pub(crate) size_ty: &'a Type<'a>,
}

impl<'a> LocationResolver for Parser<'a> {
    fn decode(&self, _loc: Location) -> Option<cc_common::DecodedLocation> {
        None
    }
}

impl<'a> Parser<'a> {
    pub fn new(arena: &'a Arena, pp: Preprocessor<'a, 'a>) -> Self {
        let mut types = TypeTable::new(arena);
        let int_ty = types.primitive(cc_types::PrimitiveTag::integer(cc_types::IntegerKind::Int, true));
        let size_ty = types.primitive(PrimitiveTag::integer(IntegerKind::Long, false));
        let mut vars = BlockScope::new();
        let mut tags = TagScope::new();
        let mut storage = StorageScope::default();
        let mut typedefs = TypedefScope::default();
        vars.push_block();
        tags.push_block();
        storage.push_block();
        typedefs.push_block();
        Self {
            tokens: TokenBuffer::new(pp),
            arena,
            types,
            vars,
            tags,
            storage,
            typedefs,
            func: None,
            items: Vec::new(),
            int_ty,
            size_ty,
        }
    }

    /// Parse the whole translation unit, returning the top-level item chain
    /// (declarations and function definitions, in source order).
    pub fn parse_translation_unit(&mut self) -> &'a [&'a Stmt<'a>] {
        while !matches!(self.tokens.peek().kind, TokenKind::Eof) {
            crate::decl::parse_external_declaration(self);
        }
        self.arena.alloc_slice_fill_iter(std::mem::take(&mut self.items))
    }

    pub fn diags(&mut self) -> &mut DiagnosticEngine {
        self.tokens.diagnostics_mut()
    }

    pub fn resolve(&self, name: IdentHandle) -> &'a str {
        self.tokens.interner().resolve(name)
    }

    pub(crate) fn intern(&mut self, text: &str) -> IdentHandle {
        self.tokens.interner_mut().intern(text)
    }

    pub(crate) fn peek_is_punct(&self, p: Punct) -> bool {
        matches!(self.tokens.peek().kind, TokenKind::Punct(x) if x == p)
    }

    pub(crate) fn bump_if_punct(&mut self, p: Punct) -> bool {
        if self.peek_is_punct(p) {
            self.tokens.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn peek_keyword(&self) -> Option<&'a str> {
        match self.tokens.peek().kind {
            TokenKind::Identifier(h) if self.tokens.interner().is_keyword(h) => Some(self.tokens.interner().resolve(h)),
            _ => None,
        }
    }

    pub(crate) fn bump_if_keyword(&mut self, spelling: &str) -> bool {
        if self.peek_keyword() == Some(spelling) {
            self.tokens.bump();
            true
        } else {
            false
        }
    }

    /// The identifier at the current token, if it's a *non-keyword*
    /// identifier (a keyword spelling never names a declarator).
    pub(crate) fn peek_plain_ident(&self) -> Option<IdentHandle> {
        match self.tokens.peek().kind {
            TokenKind::Identifier(h) if !self.tokens.interner().is_keyword(h) => Some(h),
            _ => None,
        }
    }

    pub(crate) fn loc(&self) -> Location {
        self.tokens.peek().loc
    }

    pub(crate) fn expect_punct(&mut self, p: Punct, what: &'static str) {
        if !self.bump_if_punct(p) {
            let loc = self.loc();
            self.error(what, loc);
        }
    }

    pub(crate) fn warn(&mut self, template: &'static str, loc: Location) {
        self.tokens.diagnostics_mut().emit(Diagnostic::new(Severity::Warning, template, loc), &NoResolver);
    }

    pub(crate) fn error(&mut self, template: &'static str, loc: Location) {
        self.tokens.diagnostics_mut().emit(Diagnostic::new(Severity::ParseError, template, loc), &NoResolver);
    }

    /// Single-token resynchronization (§4.6's error-recovery strategy):
    /// discard tokens until a statement boundary (`;`, `}`) or a keyword
    /// that plausibly starts the next declaration/statement.
    pub(crate) fn recover_to_statement_boundary(&mut self) {
        loop {
            match self.tokens.peek().kind {
                TokenKind::Eof => return,
                TokenKind::Punct(Punct::Semicolon) => {
                    self.tokens.bump();
                    return;
                }
                TokenKind::Punct(Punct::RBrace) => return,
                _ => {
                    self.tokens.bump();
                }
            }
        }
    }

    pub(crate) fn push_scope(&mut self) {
        self.vars.push_block();
        self.tags.push_block();
        self.storage.push_block();
        self.typedefs.push_block();
    }

    pub(crate) fn pop_scope(&mut self) {
        self.vars.pop_block();
        self.tags.pop_block();
        self.storage.pop_block();
        self.typedefs.pop_block();
    }

    pub(crate) fn at_file_scope(&self) -> bool {
        self.func.is_none()
    }
}

/// No translation-unit-wide location table is wired up yet; diagnostics
/// carry a raw [`Location`] and nothing decodes it into file/line/column.
pub(crate) struct NoResolver;
impl LocationResolver for NoResolver {
    fn decode(&self, _loc: Location) -> Option<cc_common::DecodedLocation> {
        None
    }
}

/// Builds the one-token-of-lookahead-plus-pushback token source from a
/// freshly constructed preprocessor and hands the whole pipeline (source
/// manager through parser) to the caller as a single parse call, matching
/// how a driver crate would invoke this crate end to end.
pub fn parse_translation_unit<'a>(arena: &'a Arena, pp: Preprocessor<'a, 'a>) -> (Vec<&'a Stmt<'a>>, TypeTable<'a>) {
    let mut parser = Parser::new(arena, pp);
    let items = parser.parse_translation_unit();
    (items.to_vec(), parser.types)
}
