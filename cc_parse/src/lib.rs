//! Recursive-descent parser and semantic analysis for C (§4): turns a
//! preprocessed token stream straight into [`cc_ir`]'s typed expression/
//! statement IR, the way xcc's `Parser`/`Sema` pair never builds a
//! free-standing untyped AST either.

mod core;
mod decl;
mod expr_parse;
mod stmt_parse;
mod tokens;
mod types_parse;

pub use core::{parse_translation_unit, Parser};
