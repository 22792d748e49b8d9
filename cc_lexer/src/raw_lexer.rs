//! Translation phase 3: decompose spliced source text into preprocessing
//! tokens, replacing comments with a single space. A character-by-character
//! scanning style generalized to C's pp-token grammar.

use cc_arena::Interner;
use cc_source::Cursor;

use crate::token::{Punct, Token, TokenKind};

/// A scanner over one stream's characters. The identifier interner is
/// threaded through per call rather than stored here, so a `RawLexer`
/// never holds a borrow of it longer than a single `next_token` — the
/// preprocessor needs its own access to the interner (to resolve directive
/// keywords) interleaved with lexing.
pub struct RawLexer<'a> {
    cursor: Cursor<'a>,
    at_line_start: bool,
}

impl<'a> RawLexer<'a> {
    pub fn new(cursor: Cursor<'a>) -> Self {
        Self { cursor, at_line_start: true }
    }

    pub fn cursor_mut(&mut self) -> &mut Cursor<'a> {
        &mut self.cursor
    }

    /// Current stream name and line number, for `__FILE__`/`__LINE__`.
    pub fn current_file_and_line(&self) -> (&str, u32) {
        self.cursor.current_file_and_line()
    }

    /// Skip whitespace and comments, replacing each comment with one space.
    /// Returns whether anything was skipped and whether a newline was
    /// crossed (which ends the current directive line, if any).
    fn skip_trivia(&mut self) -> (bool, bool) {
        let mut any = false;
        let mut newline = false;
        loop {
            match self.cursor.current() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.cursor.advance();
                    any = true;
                }
                Some('\n') => {
                    self.cursor.advance();
                    any = true;
                    newline = true;
                }
                Some('/') if self.cursor.peek(1) == Some('/') => {
                    self.cursor.advance_while(|c| c != '\n');
                    any = true;
                }
                Some('/') if self.cursor.peek(1) == Some('*') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    loop {
                        match self.cursor.current() {
                            None => break,
                            Some('*') if self.cursor.peek(1) == Some('/') => {
                                self.cursor.advance();
                                self.cursor.advance();
                                break;
                            }
                            Some(_) => {
                                self.cursor.advance();
                            }
                        }
                    }
                    any = true;
                }
                _ => break,
            }
        }
        (any, newline)
    }

    pub fn next_token(&mut self, interner: &mut Interner<'_>) -> Token {
        let (had_trivia, crossed_newline) = self.skip_trivia();
        if crossed_newline {
            self.at_line_start = true;
            return Token { kind: TokenKind::Newline, loc: self.cursor.here(), at_line_start: false, leading_space: had_trivia };
        }

        let loc = self.cursor.here();
        let at_start = self.at_line_start;
        self.at_line_start = false;

        let Some(ch) = self.cursor.current() else {
            return Token { kind: TokenKind::Eof, loc, at_line_start: at_start, leading_space: had_trivia };
        };

        let kind = if is_ident_start(ch) {
            self.lex_identifier(interner)
        } else if ch.is_ascii_digit() || (ch == '.' && self.cursor.peek(1).map(|c| c.is_ascii_digit()).unwrap_or(false)) {
            self.lex_pp_number()
        } else if ch == '"' {
            self.lex_string(false)
        } else if ch == '\'' {
            self.lex_char(false)
        } else if ch == 'L' && matches!(self.cursor.peek(1), Some('"')) {
            self.cursor.advance();
            self.lex_string(true)
        } else if ch == 'L' && matches!(self.cursor.peek(1), Some('\'')) {
            self.cursor.advance();
            self.lex_char(true)
        } else {
            self.lex_punct()
        };

        Token { kind, loc, at_line_start: at_start, leading_space: had_trivia }
    }

    fn lex_identifier(&mut self, interner: &mut Interner<'_>) -> TokenKind {
        let start = self.cursor.byte_position();
        self.cursor.advance_while(is_ident_continue);
        let text = self.cursor.slice_from(start).to_string();
        TokenKind::Identifier(interner.intern(&text))
    }

    fn lex_pp_number(&mut self) -> TokenKind {
        let start = self.cursor.byte_position();
        if self.cursor.current() == Some('.') {
            self.cursor.advance();
        }
        loop {
            match self.cursor.current() {
                Some(c) if c.is_ascii_digit() || c == '.' || is_ident_continue(c) => {
                    self.cursor.advance();
                }
                Some('+') | Some('-')
                    if matches!(self.cursor.slice_from(start).chars().last(), Some('e') | Some('E') | Some('p') | Some('P')) =>
                {
                    self.cursor.advance();
                }
                _ => break,
            }
        }
        TokenKind::PpNumber(self.cursor.slice_from(start).to_string())
    }

    fn lex_string(&mut self, wide: bool) -> TokenKind {
        self.cursor.advance();
        let mut bytes = Vec::new();
        loop {
            match self.cursor.current() {
                None | Some('\n') => break,
                Some('"') => {
                    self.cursor.advance();
                    break;
                }
                Some('\\') => {
                    self.cursor.advance();
                    if let Some(escaped) = self.cursor.advance() {
                        bytes.push(unescape(escaped) as u8);
                    }
                }
                Some(c) => {
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    self.cursor.advance();
                }
            }
        }
        TokenKind::StringLiteral { bytes, wide }
    }

    fn lex_char(&mut self, wide: bool) -> TokenKind {
        self.cursor.advance();
        let mut value = 0u32;
        if let Some(c) = self.cursor.current() {
            if c == '\\' {
                self.cursor.advance();
                if let Some(escaped) = self.cursor.advance() {
                    value = unescape(escaped) as u32;
                }
            } else {
                value = c as u32;
                self.cursor.advance();
            }
        }
        if self.cursor.current() == Some('\'') {
            self.cursor.advance();
        }
        TokenKind::CharConstant { value, wide }
    }

    fn lex_punct(&mut self) -> TokenKind {
        macro_rules! three {
            ($a:expr, $b:expr, $c:expr, $p:expr) => {
                if self.cursor.peek(0) == Some($a) && self.cursor.peek(1) == Some($b) && self.cursor.peek(2) == Some($c) {
                    self.cursor.advance();
                    self.cursor.advance();
                    self.cursor.advance();
                    return TokenKind::Punct($p);
                }
            };
        }
        macro_rules! two {
            ($a:expr, $b:expr, $p:expr) => {
                if self.cursor.peek(0) == Some($a) && self.cursor.peek(1) == Some($b) {
                    self.cursor.advance();
                    self.cursor.advance();
                    return TokenKind::Punct($p);
                }
            };
        }
        // Digraphs (§6.4.6p3): alternate spellings folded to their canonical
        // punctuator before any other multi-character match is attempted.
        if self.cursor.peek(0) == Some('%') && self.cursor.peek(1) == Some(':') && self.cursor.peek(2) == Some('%') && self.cursor.peek(3) == Some(':') {
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.advance();
            return TokenKind::Punct(Punct::HashHash);
        }
        two!('<', ':', Punct::LBracket);
        two!(':', '>', Punct::RBracket);
        two!('<', '%', Punct::LBrace);
        two!('%', '>', Punct::RBrace);
        two!('%', ':', Punct::Hash);

        three!('.', '.', '.', Punct::Ellipsis);
        two!('<', '<', Punct::ShiftLeft); // may be followed by '=' below
        two!('>', '>', Punct::ShiftRight);
        if self.cursor.peek(0) == Some('<') && self.cursor.peek(1) == Some('<') && self.cursor.peek(2) == Some('=') {
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.advance();
            return TokenKind::Punct(Punct::ShiftLeftEq);
        }
        if self.cursor.peek(0) == Some('>') && self.cursor.peek(1) == Some('>') && self.cursor.peek(2) == Some('=') {
            self.cursor.advance();
            self.cursor.advance();
            self.cursor.advance();
            return TokenKind::Punct(Punct::ShiftRightEq);
        }
        two!('-', '>', Punct::Arrow);
        two!('+', '+', Punct::PlusPlus);
        two!('-', '-', Punct::MinusMinus);
        two!('&', '&', Punct::AmpAmp);
        two!('|', '|', Punct::PipePipe);
        two!('<', '=', Punct::LtEq);
        two!('>', '=', Punct::GtEq);
        two!('=', '=', Punct::EqEq);
        two!('!', '=', Punct::BangEq);
        two!('*', '=', Punct::StarEq);
        two!('/', '=', Punct::SlashEq);
        two!('%', '=', Punct::PercentEq);
        two!('+', '=', Punct::PlusEq);
        two!('-', '=', Punct::MinusEq);
        two!('&', '=', Punct::AmpEq);
        two!('^', '=', Punct::CaretEq);
        two!('|', '=', Punct::PipeEq);
        two!('#', '#', Punct::HashHash);

        let ch = self.cursor.advance().unwrap_or('\0');
        TokenKind::Punct(match ch {
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            '{' => Punct::LBrace,
            '}' => Punct::RBrace,
            '.' => Punct::Dot,
            '&' => Punct::Amp,
            '*' => Punct::Star,
            '+' => Punct::Plus,
            '-' => Punct::Minus,
            '~' => Punct::Tilde,
            '!' => Punct::Bang,
            '/' => Punct::Slash,
            '%' => Punct::Percent,
            '<' => Punct::Lt,
            '>' => Punct::Gt,
            '^' => Punct::Caret,
            '|' => Punct::Pipe,
            '?' => Punct::Question,
            ':' => Punct::Colon,
            ';' => Punct::Semicolon,
            '=' => Punct::Eq,
            ',' => Punct::Comma,
            '#' => Punct::Hash,
            _ => Punct::Semicolon, // unrecognized byte; a diagnostic is raised by the caller
        })
    }
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        'a' => '\u{7}',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'v' => '\u{b}',
        other => other,
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_xid::UnicodeXID::is_xid_start(c)
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || unicode_xid::UnicodeXID::is_xid_continue(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_arena::Arena;
    use cc_source::{CompilerOptions, SourceManager};

    fn lex_all(src: &str) -> Vec<TokenKind> {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let id = mgr.add_main_string("t.c", src);
        let cursor = Cursor::new(&mut mgr, id);
        let mut lexer = RawLexer::new(cursor);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token(&mut interner);
            if tok.is_eof() {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn lexes_identifiers_and_punct() {
        let kinds = lex_all("int x = 1;");
        assert!(matches!(kinds[0], TokenKind::Identifier(_)));
        assert!(matches!(kinds[1], TokenKind::Identifier(_)));
        assert!(matches!(kinds[2], TokenKind::Punct(Punct::Eq)));
        assert!(matches!(kinds[3], TokenKind::PpNumber(_)));
        assert!(matches!(kinds[4], TokenKind::Punct(Punct::Semicolon)));
    }

    #[test]
    fn line_comment_becomes_nothing_and_crosses_newline() {
        let kinds = lex_all("x // comment\ny");
        assert!(matches!(kinds[0], TokenKind::Identifier(_)));
        assert!(matches!(kinds[1], TokenKind::Newline));
        assert!(matches!(kinds[2], TokenKind::Identifier(_)));
    }

    #[test]
    fn block_comment_is_elided() {
        let kinds = lex_all("x /* y */ z");
        assert_eq!(kinds.len(), 2);
    }

    #[test]
    fn shift_and_shift_assign_are_distinguished() {
        let kinds = lex_all("a << b <<= c");
        assert!(matches!(kinds[1], TokenKind::Punct(Punct::ShiftLeft)));
        assert!(matches!(kinds[3], TokenKind::Punct(Punct::ShiftLeftEq)));
    }

    #[test]
    fn digraphs_fold_to_canonical_punctuators() {
        let kinds = lex_all("a<:0:> %: x");
        assert!(matches!(kinds[1], TokenKind::Punct(Punct::LBracket)));
        assert!(matches!(kinds[3], TokenKind::Punct(Punct::RBracket)));
        assert!(matches!(kinds[4], TokenKind::Punct(Punct::Hash)));
    }
}
