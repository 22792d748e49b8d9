//! Preprocessing-token and token kinds. The same [`Token`] shape is used
//! before and after macro expansion; only the set of kinds that can reach
//! the parser differs (directives and placemarkers never escape the
//! preprocessor).

use cc_arena::IdentHandle;
use cc_common::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LBracket, RBracket, LParen, RParen, LBrace, RBrace,
    Dot, Arrow, Ellipsis,
    PlusPlus, MinusMinus,
    Amp, Star, Plus, Minus, Tilde, Bang,
    Slash, Percent,
    ShiftLeft, ShiftRight,
    Lt, Gt, LtEq, GtEq, EqEq, BangEq,
    Caret, Pipe, AmpAmp, PipePipe,
    Question, Colon, Semicolon,
    Eq, StarEq, SlashEq, PercentEq, PlusEq, MinusEq,
    ShiftLeftEq, ShiftRightEq, AmpEq, CaretEq, PipeEq,
    Comma, Hash, HashHash,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(IdentHandle),
    /// A not-yet-classified "pp-number" per the C grammar; the parser's
    /// literal support later commits it to an integer or float constant.
    PpNumber(String),
    StringLiteral { bytes: Vec<u8>, wide: bool },
    CharConstant { value: u32, wide: bool },
    Punct(Punct),
    Newline,
    Eof,
    /// Produced by `#` and `##` when an argument or concatenation result is
    /// empty; participates in further `##` pasting, then vanishes.
    Placemarker,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: Location,
    /// Set for the first token of a line, so the preprocessor knows a `#`
    /// there begins a directive rather than the punctuator.
    pub at_line_start: bool,
    /// Whitespace (of any kind, including none) preceded this token; needed
    /// to decide whether stringizing (`#`) must re-insert a separating
    /// space.
    pub leading_space: bool,
}

impl Token {
    pub fn new(kind: TokenKind, loc: Location) -> Self {
        Self { kind, loc, at_line_start: false, leading_space: false }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn identifier(&self) -> Option<IdentHandle> {
        match self.kind {
            TokenKind::Identifier(h) => Some(h),
            _ => None,
        }
    }
}
