//! Bump-pointer allocation and identifier interning shared by every stage
//! of the compiler.
//!
//! - [`Arena`]: a thin wrapper over [`bumpalo::Bump`] sized in 8 KiB blocks,
//!   the minimum block size xcc's own arena allocator uses (large enough to
//!   hold any single `Stmt`/`Expr`/`CType` node without a mid-allocation
//!   overflow). Types and AST/IR nodes are allocated here and referenced by
//!   `&'arena` borrow or by a small stable handle, never owned directly.
//! - [`ident`]: the identifier interner. Every spelling seen by the lexer is
//!   interned once; everything downstream compares [`IdentHandle`] values
//!   instead of strings.

pub mod arena;
pub mod ident;

pub use arena::Arena;
pub use ident::{IdentHandle, Interner, TokenClass};
