//! Ties the raw lexer, macro table, and conditional stack together into the
//! token stream the parser consumes. Directive dispatch and macro rescan
//! follow xcc's `lexer.h` structure: a directive is recognized by an
//! at-line-start `#`, and a macro invocation is expanded by splicing its
//! replacement list back into the pending queue and rescanning it exactly
//! like ordinary input, painting the macro's name for the duration so a
//! self-reference surfaces as a plain identifier (§ hide-set semantics).
//!
//! Directive handlers take explicit field references (`&mut MacroTable`,
//! `&mut ConditionalStack`, ...) rather than `&mut self`: the raw lexer's
//! cursor already holds a live borrow of `self.mgr` for the run of the
//! stream loop, so a `&mut self` call while it's still needed afterward
//! would conflict with that borrow. `#include` resolution is deferred to
//! after the lexer is dropped for the same reason.

use cc_arena::{IdentHandle, Interner};
use cc_common::{Diagnostic, DiagnosticEngine, Location, LocationResolver, Severity};
use cc_eval::integer;
use cc_source::SourceManager;

use crate::cond::ConditionalStack;
use crate::macro_table::{MacroDef, MacroKind, MacroTable};
use crate::raw_lexer::RawLexer;
use crate::token::{Punct, Token, TokenKind};

/// A token still waiting to be handed to the parser, or a marker that a
/// macro expansion it came from has ended (so the hide-set can be
/// unpainted once every token it produced has been rescanned).
enum Pending {
    Tok(Token),
    EndExpansion(IdentHandle),
}

/// A `#include` directive recognized mid-stream, resolved only after the
/// raw lexer (and its borrow of the source manager) has been dropped.
struct IncludeRequest {
    name: String,
    angled: bool,
}

pub struct Preprocessor<'a, 'arena> {
    mgr: &'a mut SourceManager,
    interner: &'a mut Interner<'arena>,
    diags: &'a mut DiagnosticEngine,
    macros: MacroTable,
    cond: ConditionalStack,
    pending: Vec<Pending>,
    counter: u64,
    /// `__DATE__`/`__TIME__` text. Fixed placeholders by default so builds
    /// stay reproducible; a driver that wants real wall-clock values calls
    /// [`Preprocessor::set_build_timestamp`].
    build_date: String,
    build_time: String,
}

impl<'a, 'arena> Preprocessor<'a, 'arena> {
    pub fn new(mgr: &'a mut SourceManager, interner: &'a mut Interner<'arena>, diags: &'a mut DiagnosticEngine) -> Self {
        Self {
            mgr,
            interner,
            diags,
            macros: MacroTable::new(),
            cond: ConditionalStack::new(),
            pending: Vec::new(),
            counter: 0,
            build_date: "??? ?? ????".to_string(),
            build_time: "??:??:??".to_string(),
        }
    }

    pub fn set_build_timestamp(&mut self, date: impl Into<String>, time: impl Into<String>) {
        self.build_date = date.into();
        self.build_time = time.into();
    }

    pub fn define_builtin_flag(&mut self, name: &str, value: &str) {
        let handle = self.interner.intern(name);
        let tok = Token::new(TokenKind::PpNumber(value.to_string()), Location::NONE);
        self.macros.define(handle, MacroDef::object_like(vec![tok], Location::NONE));
    }

    /// Produce the next token the parser should see: fully macro-expanded,
    /// with inactive `#if` regions skipped.
    pub fn next(&mut self) -> Token {
        loop {
            if let Some(tok) = self.pop_pending() {
                return tok;
            }
            self.process_stream_until_output();
        }
    }

    fn pop_pending(&mut self) -> Option<Token> {
        while let Some(item) = self.pending.pop() {
            match item {
                Pending::Tok(t) => return Some(t),
                Pending::EndExpansion(name) => self.macros.end_expansion(name),
            }
        }
        None
    }

    /// Pull raw tokens from the current stream, handling directives and
    /// macro expansion, until at least one token is ready in `pending` or
    /// end-of-input is reached (in which case `Eof` is pushed).
    fn process_stream_until_output(&mut self) {
        let stream_id = match self.mgr.current_stream_id() {
            Some(id) => id,
            None => {
                self.pending.push(Pending::Tok(Token::new(TokenKind::Eof, Location::NONE)));
                return;
            }
        };
        let cursor = cc_source::Cursor::new(self.mgr, stream_id);
        let mut raw = RawLexer::new(cursor);

        loop {
            let tok = raw.next_token(self.interner);
            match &tok.kind {
                TokenKind::Newline => continue,
                TokenKind::Eof => {
                    drop(raw);
                    if self.mgr.current_stream_id().map(|id| id != stream_id).unwrap_or(true) {
                        // an #include switched streams underneath us; resume outer loop
                        return;
                    }
                    self.mgr.end_include();
                    if self.mgr.current_stream_id().is_none() {
                        self.pending.push(Pending::Tok(tok));
                    }
                    return;
                }
                TokenKind::Punct(Punct::Hash) if tok.at_line_start => {
                    let include_request = handle_directive(&mut self.macros, &mut self.cond, self.interner, self.diags, &mut raw);
                    if let Some(request) = include_request {
                        drop(raw);
                        self.do_include(request);
                        return;
                    }
                    continue;
                }
                _ => {}
            }

            if !self.cond.is_active() {
                continue;
            }

            if let Some(name) = tok.identifier() {
                let spelling = self.interner.resolve(name);
                if spelling == "_Pragma" && peek_is_lparen(&mut raw) {
                    collect_arguments(&mut raw, self.interner);
                    continue;
                }
                if let Some(builtin) = expand_builtin(spelling, &raw, tok.loc, &mut self.counter, &self.build_date, &self.build_time) {
                    self.pending.push(Pending::Tok(builtin));
                    return;
                }
                if let Some(expanded) = try_expand(&mut self.macros, self.interner, name, &mut raw) {
                    for item in expanded.into_iter().rev() {
                        self.pending.push(item);
                    }
                    if !self.pending.is_empty() {
                        return;
                    }
                    continue;
                }
            }

            self.pending.push(Pending::Tok(tok));
            return;
        }
    }

    fn do_include(&mut self, request: IncludeRequest) {
        let including = self.mgr.current_stream_id();
        if let Some(path) = self.mgr.resolve_include(&request.name, request.angled, including) {
            let _ = self.mgr.begin_include(&path, 0);
        }
    }

    pub fn next_counter(&mut self) -> u64 {
        let v = self.counter;
        self.counter += 1;
        v
    }

    /// Shared access to the identifier table, for a parser layered on top
    /// that needs to resolve spellings (keyword dispatch, typedef-name
    /// disambiguation) without taking over the mutable borrow this
    /// preprocessor already holds.
    pub fn interner(&self) -> &Interner<'arena> {
        self.interner
    }

    pub fn interner_mut(&mut self) -> &mut Interner<'arena> {
        self.interner
    }

    /// Shared access to the diagnostic engine, so Sema can report through
    /// the same engine the preprocessor reports `#error`/`#warning` and
    /// lexical diagnostics through.
    pub fn diagnostics_mut(&mut self) -> &mut DiagnosticEngine {
        self.diags
    }
}

/// `__FILE__`/`__LINE__`/`__DATE__`/`__TIME__`/`__COUNTER__` materialize
/// fresh tokens at each use site rather than living in the macro table;
/// `__func__` is not one of these (§6.4.2.2 makes it an implicit
/// declaration, not a macro) and is left for `cc_parse` to synthesize.
fn expand_builtin(spelling: &str, raw: &RawLexer<'_>, loc: Location, counter: &mut u64, build_date: &str, build_time: &str) -> Option<Token> {
    match spelling {
        "__LINE__" => {
            let (_, line) = raw.current_file_and_line();
            Some(Token::new(TokenKind::PpNumber(line.to_string()), loc))
        }
        "__FILE__" => {
            let (file, _) = raw.current_file_and_line();
            Some(Token::new(TokenKind::StringLiteral { bytes: file.as_bytes().to_vec(), wide: false }, loc))
        }
        "__COUNTER__" => {
            let v = *counter;
            *counter += 1;
            Some(Token::new(TokenKind::PpNumber(v.to_string()), loc))
        }
        "__DATE__" => Some(Token::new(TokenKind::StringLiteral { bytes: build_date.as_bytes().to_vec(), wide: false }, loc)),
        "__TIME__" => Some(Token::new(TokenKind::StringLiteral { bytes: build_time.as_bytes().to_vec(), wide: false }, loc)),
        _ => None,
    }
}

fn try_expand(macros: &mut MacroTable, interner: &mut Interner<'_>, name: IdentHandle, raw: &mut RawLexer<'_>) -> Option<Vec<Pending>> {
    if macros.is_in_use(name) {
        return None;
    }
    let def = macros.get(name)?.clone();
    let args = match def.kind {
        MacroKind::ObjectLike => Vec::new(),
        MacroKind::FunctionLike => {
            if !peek_is_lparen(raw) {
                return None;
            }
            collect_arguments(raw, interner)
        }
    };

    macros.begin_expansion(name);
    let mut out: Vec<Pending> = Vec::new();
    out.push(Pending::EndExpansion(name));
    for tok in def.replacement.iter().rev() {
        if let Some(param_name) = tok.identifier() {
            if let Some(idx) = def.params.iter().position(|p| *p == param_name) {
                if let Some(arg) = args.get(idx) {
                    for a in arg.iter().rev() {
                        out.push(Pending::Tok(a.clone()));
                    }
                    continue;
                }
            }
        }
        out.push(Pending::Tok(tok.clone()));
    }
    Some(out)
}

fn peek_is_lparen(raw: &mut RawLexer<'_>) -> bool {
    raw.cursor_mut().save();
    let mut saw_lparen = false;
    loop {
        match raw.cursor_mut().current() {
            Some(c) if c.is_whitespace() => {
                raw.cursor_mut().advance();
            }
            Some('(') => {
                saw_lparen = true;
                break;
            }
            _ => break,
        }
    }
    let _ = raw.cursor_mut().restore();
    saw_lparen
}

/// Collect a function-like macro's call arguments, splitting on top-level
/// commas and respecting nested parentheses.
fn collect_arguments(raw: &mut RawLexer<'_>, interner: &mut Interner<'_>) -> Vec<Vec<Token>> {
    loop {
        match raw.cursor_mut().current() {
            Some(c) if c.is_whitespace() => {
                raw.cursor_mut().advance();
            }
            _ => break,
        }
    }
    let opening = raw.next_token(interner);
    debug_assert!(matches!(opening.kind, TokenKind::Punct(Punct::LParen)));

    let mut args = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0i32;
    loop {
        let tok = raw.next_token(interner);
        match &tok.kind {
            TokenKind::Punct(Punct::LParen) => {
                depth += 1;
                current.push(tok);
            }
            TokenKind::Punct(Punct::RParen) => {
                if depth == 0 {
                    args.push(current);
                    break;
                }
                depth -= 1;
                current.push(tok);
            }
            TokenKind::Punct(Punct::Comma) if depth == 0 => {
                args.push(std::mem::take(&mut current));
            }
            TokenKind::Eof => break,
            TokenKind::Newline => continue,
            _ => current.push(tok),
        }
    }
    if args.len() == 1 && args[0].is_empty() {
        args.clear();
    }
    args
}

/// Dispatch a `#` directive already known to start at the beginning of a
/// line. Returns a pending `#include` request when one is seen and its
/// enclosing conditional is active; the caller resolves it once the raw
/// lexer (and the source-manager borrow it holds) has been dropped.
fn handle_directive(
    macros: &mut MacroTable,
    cond: &mut ConditionalStack,
    interner: &mut Interner<'_>,
    diags: &mut DiagnosticEngine,
    raw: &mut RawLexer<'_>,
) -> Option<IncludeRequest> {
    let line = collect_directive_line(raw, interner);
    let Some(keyword) = line.first() else { return None };
    let Some(keyword_name) = keyword.identifier() else { return None };
    let text = interner.resolve(keyword_name).to_string();
    match text.as_str() {
        "define" => handle_define(macros, &line[1..]),
        "undef" => handle_undef(macros, &line[1..]),
        "ifdef" => handle_ifdef(macros, cond, &line[1..], false),
        "ifndef" => handle_ifdef(macros, cond, &line[1..], true),
        "if" => {
            let condition = cond.is_active().then(|| eval_condition(macros, interner, diags, &line[1..]));
            cond.push_if(condition);
        }
        "elif" => {
            let condition = cond.should_evaluate_elif().then(|| eval_condition(macros, interner, diags, &line[1..]));
            let _ = cond.push_elif(condition);
        }
        // C23 sugar: `#elifdef X` / `#elifndef X` behave exactly like
        // `#elif defined(X)` / `#elif !defined(X)`.
        "elifdef" => {
            let condition = cond.should_evaluate_elif().then(|| is_ident_defined(macros, &line[1..]));
            let _ = cond.push_elif(condition);
        }
        "elifndef" => {
            let condition = cond.should_evaluate_elif().then(|| !is_ident_defined(macros, &line[1..]));
            let _ = cond.push_elif(condition);
        }
        "else" => {
            let _ = cond.push_else();
        }
        "endif" => {
            let _ = cond.pop_endif();
        }
        "include" if cond.is_active() => return handle_include(interner, &line[1..]),
        "pragma" | "line" | "error" | "warning" => {
            // recognized, not semantically interpreted by this crate
        }
        _ => {}
    }
    None
}

fn collect_directive_line(raw: &mut RawLexer<'_>, interner: &mut Interner<'_>) -> Vec<Token> {
    let mut line = Vec::new();
    loop {
        let tok = raw.next_token(interner);
        match tok.kind {
            TokenKind::Newline | TokenKind::Eof => break,
            _ => line.push(tok),
        }
    }
    line
}

fn handle_define(macros: &mut MacroTable, rest: &[Token]) {
    let Some(name_tok) = rest.first() else { return };
    let Some(name) = name_tok.identifier() else { return };
    let mut idx = 1;
    let is_function_like = rest.get(1).map(|t| matches!(&t.kind, TokenKind::Punct(Punct::LParen)) && !t.leading_space).unwrap_or(false);
    if is_function_like {
        idx = 2;
        let mut params = Vec::new();
        let mut variadic = false;
        while let Some(tok) = rest.get(idx) {
            match &tok.kind {
                TokenKind::Punct(Punct::RParen) => {
                    idx += 1;
                    break;
                }
                TokenKind::Identifier(p) => {
                    params.push(*p);
                    idx += 1;
                }
                TokenKind::Punct(Punct::Ellipsis) => {
                    variadic = true;
                    idx += 1;
                }
                TokenKind::Punct(Punct::Comma) => idx += 1,
                _ => idx += 1,
            }
        }
        let replacement = rest[idx..].to_vec();
        macros.define(name, MacroDef::function_like(params, variadic, replacement, name_tok.loc));
    } else {
        let replacement = rest[idx..].to_vec();
        macros.define(name, MacroDef::object_like(replacement, name_tok.loc));
    }
}

fn handle_undef(macros: &mut MacroTable, rest: &[Token]) {
    if let Some(name) = rest.first().and_then(Token::identifier) {
        macros.undef(name);
    }
}

fn is_ident_defined(macros: &MacroTable, rest: &[Token]) -> bool {
    rest.first().and_then(Token::identifier).map(|name| macros.is_defined(name)).unwrap_or(false)
}

fn handle_ifdef(macros: &MacroTable, cond: &mut ConditionalStack, rest: &[Token], negate: bool) {
    let defined = is_ident_defined(macros, rest);
    let condition = cond.is_active().then(|| defined != negate);
    cond.push_if(condition);
}

fn handle_include(interner: &Interner<'_>, rest: &[Token]) -> Option<IncludeRequest> {
    let first = rest.first()?;
    let (name, angled) = match &first.kind {
        TokenKind::StringLiteral { bytes, .. } => (String::from_utf8_lossy(bytes).into_owned(), false),
        TokenKind::Punct(Punct::Lt) => {
            let mut s = String::new();
            for tok in &rest[1..] {
                match &tok.kind {
                    TokenKind::Punct(Punct::Gt) => break,
                    TokenKind::Identifier(h) => s.push_str(interner.resolve(*h)),
                    TokenKind::PpNumber(n) => s.push_str(n),
                    TokenKind::Punct(Punct::Dot) => s.push('.'),
                    TokenKind::Punct(Punct::Slash) => s.push('/'),
                    _ => {}
                }
            }
            (s, true)
        }
        _ => return None,
    };
    Some(IncludeRequest { name, angled })
}

/// Evaluate `#if`/`#elif`'s controlling expression (§4.5): `defined X` /
/// `defined(X)` is resolved to a literal `0`/`1` everywhere it appears,
/// then the remaining tokens are parsed and folded as a real C
/// conditional-expression — full operator precedence, not a flat
/// left-to-right scan — over `intmax_t`-width (64-bit) signed arithmetic,
/// reusing [`cc_eval`]'s checked integer operations so overflow and
/// division-by-zero are diagnosed the same way the rest of the front end
/// diagnoses them. Identifiers other than `defined` that are not macros
/// evaluate to `0` per §6.10.1p4.
///
/// `cc_parse`'s own expression grammar is typed and depends on this
/// crate (it drives the preprocessor to get its token stream), so it
/// can't be reused here without a dependency cycle; this parser is a
/// self-contained, integer-only subset of it, which is all `#if`
/// expressions are allowed to contain in the first place.
fn eval_condition(macros: &MacroTable, interner: &Interner<'_>, diags: &mut DiagnosticEngine, tokens: &[Token]) -> bool {
    let substituted = substitute_defined(tokens, macros, interner);
    let mut parser = CondExprParser { tokens: &substituted, pos: 0, diags };
    parser.parse_conditional(true) != 0
}

fn substitute_defined(tokens: &[Token], macros: &MacroTable, interner: &Interner<'_>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i].kind {
            TokenKind::Identifier(h) if interner.resolve(*h) == "defined" => {
                let (name, consumed) = parse_defined_operand(&tokens[i + 1..]);
                let value = name.map(|n| macros.is_defined(n) as i64).unwrap_or(0);
                out.push(Token::new(TokenKind::PpNumber(value.to_string()), tokens[i].loc));
                i += 1 + consumed;
            }
            _ => {
                out.push(tokens[i].clone());
                i += 1;
            }
        }
    }
    out
}

fn parse_defined_operand(rest: &[Token]) -> (Option<IdentHandle>, usize) {
    match rest.first().map(|t| &t.kind) {
        Some(TokenKind::Identifier(h)) => (Some(*h), 1),
        Some(TokenKind::Punct(Punct::LParen)) => match rest.get(1).map(|t| &t.kind) {
            Some(TokenKind::Identifier(h)) => (Some(*h), 3),
            _ => (None, 1),
        },
        _ => (None, 0),
    }
}

/// Width `#if` arithmetic is folded at: C requires `intmax_t`/`uintmax_t`,
/// which this evaluator models as 64-bit signed (matching the rest of the
/// core's narrowest-common-case constant folding).
const COND_WIDTH: u32 = 64;

/// Precedence-climbing evaluator for a `defined`-free `#if` token buffer.
/// `live` tracks whether the arm currently being parsed can actually be
/// reached; `?:`/`&&`/`||` thread `live = false` through the arm they
/// don't take so it is still parsed (a syntax error there is still an
/// error) but never diagnosed — §8 requires `1 ? 0 : 1/0` to fold to `0`
/// without a division-by-zero warning.
struct CondExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    diags: &'a mut DiagnosticEngine,
}

/// `#if`'s own diagnostics have no source-location table wired up yet,
/// same as `cc_parse`'s parser diagnostics.
struct NoResolver;
impl LocationResolver for NoResolver {
    fn decode(&self, _loc: Location) -> Option<cc_common::DecodedLocation> {
        None
    }
}

impl<'a> CondExprParser<'a> {
    fn peek_punct(&self) -> Option<Punct> {
        match self.tokens.get(self.pos).map(|t| &t.kind) {
            Some(TokenKind::Punct(p)) => Some(*p),
            _ => None,
        }
    }

    fn loc(&self) -> Location {
        self.tokens.get(self.pos).map(|t| t.loc).unwrap_or(Location::NONE)
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn warn(&mut self, live: bool, template: &'static str, loc: Location) {
        if live {
            self.diags.emit(Diagnostic::new(Severity::Warning, template, loc), &NoResolver);
        }
    }

    fn parse_conditional(&mut self, live: bool) -> i128 {
        let cond = self.parse_logical_or(live);
        if self.peek_punct() != Some(Punct::Question) {
            return cond;
        }
        self.bump();
        let then_val = self.parse_conditional(live && cond != 0);
        if self.peek_punct() == Some(Punct::Colon) {
            self.bump();
        } else {
            let loc = self.loc();
            self.warn(live, "expected ':' in '#if' expression", loc);
        }
        let else_val = self.parse_conditional(live && cond == 0);
        if cond != 0 {
            then_val
        } else {
            else_val
        }
    }

    fn parse_logical_or(&mut self, live: bool) -> i128 {
        let mut left = self.parse_logical_and(live);
        while self.peek_punct() == Some(Punct::PipePipe) {
            self.bump();
            let right = self.parse_logical_and(live && left == 0);
            left = (left != 0 || right != 0) as i128;
        }
        left
    }

    fn parse_logical_and(&mut self, live: bool) -> i128 {
        let mut left = self.parse_bitor(live);
        while self.peek_punct() == Some(Punct::AmpAmp) {
            self.bump();
            let right = self.parse_bitor(live && left != 0);
            left = (left != 0 && right != 0) as i128;
        }
        left
    }

    fn parse_bitor(&mut self, live: bool) -> i128 {
        let mut left = self.parse_bitxor(live);
        while self.peek_punct() == Some(Punct::Pipe) {
            self.bump();
            left = integer::wrap(left | self.parse_bitxor(live), COND_WIDTH, true);
        }
        left
    }

    fn parse_bitxor(&mut self, live: bool) -> i128 {
        let mut left = self.parse_bitand(live);
        while self.peek_punct() == Some(Punct::Caret) {
            self.bump();
            left = integer::wrap(left ^ self.parse_bitand(live), COND_WIDTH, true);
        }
        left
    }

    fn parse_bitand(&mut self, live: bool) -> i128 {
        let mut left = self.parse_equality(live);
        while self.peek_punct() == Some(Punct::Amp) {
            self.bump();
            left = integer::wrap(left & self.parse_equality(live), COND_WIDTH, true);
        }
        left
    }

    fn parse_equality(&mut self, live: bool) -> i128 {
        let mut left = self.parse_relational(live);
        loop {
            match self.peek_punct() {
                Some(Punct::EqEq) => {
                    self.bump();
                    left = (left == self.parse_relational(live)) as i128;
                }
                Some(Punct::BangEq) => {
                    self.bump();
                    left = (left != self.parse_relational(live)) as i128;
                }
                _ => return left,
            }
        }
    }

    fn parse_relational(&mut self, live: bool) -> i128 {
        let mut left = self.parse_shift(live);
        loop {
            match self.peek_punct() {
                Some(Punct::Lt) => {
                    self.bump();
                    left = (left < self.parse_shift(live)) as i128;
                }
                Some(Punct::Gt) => {
                    self.bump();
                    left = (left > self.parse_shift(live)) as i128;
                }
                Some(Punct::LtEq) => {
                    self.bump();
                    left = (left <= self.parse_shift(live)) as i128;
                }
                Some(Punct::GtEq) => {
                    self.bump();
                    left = (left >= self.parse_shift(live)) as i128;
                }
                _ => return left,
            }
        }
    }

    fn parse_shift(&mut self, live: bool) -> i128 {
        let mut left = self.parse_additive(live);
        loop {
            match self.peek_punct() {
                Some(Punct::ShiftLeft) => {
                    self.bump();
                    let loc = self.loc();
                    let amount = self.parse_additive(live);
                    if !integer::shift_is_well_defined(amount, COND_WIDTH) {
                        self.warn(live, "shift amount is negative or exceeds the operand width", loc);
                    }
                    left = integer::shl(left, amount, COND_WIDTH, true);
                }
                Some(Punct::ShiftRight) => {
                    self.bump();
                    let loc = self.loc();
                    let amount = self.parse_additive(live);
                    if !integer::shift_is_well_defined(amount, COND_WIDTH) {
                        self.warn(live, "shift amount is negative or exceeds the operand width", loc);
                    }
                    left = integer::shr_arithmetic(left, amount, COND_WIDTH);
                }
                _ => return left,
            }
        }
    }

    fn parse_additive(&mut self, live: bool) -> i128 {
        let mut left = self.parse_multiplicative(live);
        loop {
            match self.peek_punct() {
                Some(Punct::Plus) => {
                    self.bump();
                    let loc = self.loc();
                    let rhs = self.parse_multiplicative(live);
                    let (v, overflow) = integer::add(left, rhs, COND_WIDTH, true);
                    self.warn(live && overflow, "overflow in '#if' constant expression", loc);
                    left = v;
                }
                Some(Punct::Minus) => {
                    self.bump();
                    let loc = self.loc();
                    let rhs = self.parse_multiplicative(live);
                    let (v, overflow) = integer::sub(left, rhs, COND_WIDTH, true);
                    self.warn(live && overflow, "overflow in '#if' constant expression", loc);
                    left = v;
                }
                _ => return left,
            }
        }
    }

    fn parse_multiplicative(&mut self, live: bool) -> i128 {
        let mut left = self.parse_unary(live);
        loop {
            match self.peek_punct() {
                Some(Punct::Star) => {
                    self.bump();
                    let loc = self.loc();
                    let rhs = self.parse_unary(live);
                    let (v, overflow) = integer::mul(left, rhs, COND_WIDTH, true);
                    self.warn(live && overflow, "overflow in '#if' constant expression", loc);
                    left = v;
                }
                Some(Punct::Slash) => {
                    self.bump();
                    let loc = self.loc();
                    let rhs = self.parse_unary(live);
                    let (v, overflow, div_zero) = integer::div(left, rhs, COND_WIDTH, true);
                    self.warn(live && div_zero, "division by zero in '#if' constant expression", loc);
                    self.warn(live && overflow && !div_zero, "overflow in '#if' constant expression", loc);
                    left = v;
                }
                Some(Punct::Percent) => {
                    self.bump();
                    let loc = self.loc();
                    let rhs = self.parse_unary(live);
                    let (v, overflow, div_zero) = integer::rem(left, rhs, COND_WIDTH, true);
                    self.warn(live && div_zero, "division by zero in '#if' constant expression", loc);
                    self.warn(live && overflow && !div_zero, "overflow in '#if' constant expression", loc);
                    left = v;
                }
                _ => return left,
            }
        }
    }

    fn parse_unary(&mut self, live: bool) -> i128 {
        match self.peek_punct() {
            Some(Punct::Bang) => {
                self.bump();
                (self.parse_unary(live) == 0) as i128
            }
            Some(Punct::Minus) => {
                self.bump();
                let loc = self.loc();
                let (v, overflow) = integer::neg(self.parse_unary(live), COND_WIDTH, true);
                self.warn(live && overflow, "overflow in '#if' constant expression", loc);
                v
            }
            Some(Punct::Plus) => {
                self.bump();
                self.parse_unary(live)
            }
            Some(Punct::Tilde) => {
                self.bump();
                integer::wrap(!self.parse_unary(live), COND_WIDTH, true)
            }
            _ => self.parse_primary(live),
        }
    }

    fn parse_primary(&mut self, live: bool) -> i128 {
        match self.tokens.get(self.pos).map(|t| &t.kind) {
            Some(TokenKind::PpNumber(n)) => {
                let value = parse_pp_number(n);
                self.bump();
                value
            }
            Some(TokenKind::Punct(Punct::LParen)) => {
                self.bump();
                let value = self.parse_conditional(live);
                if self.peek_punct() == Some(Punct::RParen) {
                    self.bump();
                } else {
                    let loc = self.loc();
                    self.warn(live, "expected ')' in '#if' expression", loc);
                }
                value
            }
            // unknown identifier: 0 per §6.10.1p4 (macro-expansion already
            // ran before the directive handler sees this token buffer)
            Some(TokenKind::Identifier(_)) => {
                self.bump();
                0
            }
            Some(_) => {
                let loc = self.loc();
                self.warn(live, "expected expression in '#if'", loc);
                self.bump();
                0
            }
            None => 0,
        }
    }
}

/// Parse a pp-number token as a `#if` operand: decimal, `0x`/`0X` hex, and
/// leading-zero octal, with any trailing integer-suffix letters (`u`,
/// `l`, `ll`, and combinations, in either case) stripped first.
fn parse_pp_number(text: &str) -> i128 {
    let digits = text.trim_end_matches(|c: char| matches!(c, 'u' | 'U' | 'l' | 'L'));
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i128::from_str_radix(hex, 16).unwrap_or(0)
    } else if digits.len() > 1 && digits.as_bytes()[0] == b'0' && digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
        i128::from_str_radix(&digits[1..], 8).unwrap_or(0)
    } else {
        digits.parse().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_arena::Arena;
    use cc_common::{DiagnosticEngine, TextConsumer};
    use cc_source::CompilerOptions;

    fn drive(src: &str) -> Vec<TokenKind> {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let mut mgr = SourceManager::new(CompilerOptions::default());
        mgr.add_main_string("t.c", src);
        let mut diags = DiagnosticEngine::new(None);
        diags.add_consumer(Box::new(TextConsumer::new(false)));
        let mut pp = Preprocessor::new(&mut mgr, &mut interner, &mut diags);
        let mut out = Vec::new();
        loop {
            let tok = pp.next();
            if tok.is_eof() {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn object_like_macro_expands() {
        let kinds = drive("#define N 42\nN");
        assert_eq!(kinds.len(), 1);
        assert!(matches!(&kinds[0], TokenKind::PpNumber(n) if n == "42"));
    }

    #[test]
    fn function_like_macro_substitutes_argument() {
        let kinds = drive("#define SQ(x) x * x\nSQ(3)");
        assert_eq!(kinds.len(), 3);
        assert!(matches!(&kinds[0], TokenKind::PpNumber(n) if n == "3"));
    }

    #[test]
    fn self_referential_macro_does_not_recurse() {
        let kinds = drive("#define FOO FOO + 1\nFOO");
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn ifdef_skips_undefined_branch() {
        let kinds = drive("#ifdef MISSING\nskipped\n#else\nkept\n#endif\n");
        assert_eq!(kinds.len(), 1);
    }

    #[test]
    fn nested_if_false_elides_inner_garbage() {
        let kinds = drive("#if 0\n#if UNDEFINED_AND_BAD(\n#endif\n#endif\nok");
        assert_eq!(kinds.len(), 1);
    }

    #[test]
    fn line_builtin_reports_current_line() {
        let kinds = drive("__LINE__\n__LINE__");
        assert!(matches!(&kinds[0], TokenKind::PpNumber(n) if n == "1"));
        assert!(matches!(&kinds[1], TokenKind::PpNumber(n) if n == "2"));
    }

    #[test]
    fn file_builtin_reports_stream_name() {
        let kinds = drive("__FILE__");
        assert!(matches!(&kinds[0], TokenKind::StringLiteral { bytes, .. } if bytes == b"t.c"));
    }

    #[test]
    fn counter_builtin_increments_each_use() {
        let kinds = drive("__COUNTER__ __COUNTER__");
        assert!(matches!(&kinds[0], TokenKind::PpNumber(n) if n == "0"));
        assert!(matches!(&kinds[1], TokenKind::PpNumber(n) if n == "1"));
    }

    #[test]
    fn elifdef_is_sugar_for_elif_defined() {
        let kinds = drive("#if 0\nskipped\n#elifdef MISSING\nstill_skipped\n#elifndef MISSING\nkept\n#endif\n");
        assert_eq!(kinds.len(), 1);
    }

    #[test]
    fn pragma_operator_consumes_its_argument_without_output() {
        let kinds = drive("_Pragma(\"once\") ok");
        assert_eq!(kinds.len(), 1);
    }

    #[test]
    fn if_negation_of_false_is_true() {
        let kinds = drive("#if !0\nkept\n#endif\n");
        assert_eq!(kinds.len(), 1);
    }

    #[test]
    fn if_honors_operator_precedence() {
        let kinds = drive("#if 1 || 0 && 0\nkept\n#endif\n");
        assert_eq!(kinds.len(), 1);
    }

    #[test]
    fn if_parenthesized_equality_and_logical_and() {
        let kinds = drive("#if (1 + 1 == 2) && (3 > 2)\nkept\n#endif\n");
        assert_eq!(kinds.len(), 1);
    }

    #[test]
    fn if_ternary_short_circuits_division_by_zero() {
        let kinds = drive("#if 1 ? 0 : 1 / 0\nskipped\n#else\nkept\n#endif\n");
        assert_eq!(kinds.len(), 1);
    }

    #[test]
    fn if_evaluates_hex_literal() {
        let kinds = drive("#if 0x10 == 16\nkept\n#endif\n");
        assert_eq!(kinds.len(), 1);
    }
}
