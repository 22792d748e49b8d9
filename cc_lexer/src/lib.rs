//! Preprocessor and lexer (§4.5): turns spliced source text into the
//! macro-expanded token stream `cc_parse` consumes. [`raw_lexer`] handles
//! translation phase 3 (comment elision, pp-token decomposition);
//! [`macro_table`] and [`cond`] hold the `#define` table and the
//! conditional-inclusion stack; [`preprocessor`] drives all three plus
//! directive dispatch and hide-set-based macro rescan.

pub mod cond;
pub mod macro_table;
pub mod preprocessor;
pub mod raw_lexer;
pub mod token;

pub use cond::{CondError, ConditionalStack};
pub use macro_table::{MacroDef, MacroKind, MacroTable};
pub use preprocessor::Preprocessor;
pub use raw_lexer::RawLexer;
pub use token::{Punct, Token, TokenKind};
