//! The typed expression/statement data model and the label-based IR
//! builder that the parser emits into directly as it recognizes control
//! flow (§4.6, §4.8) — no separate `if`/`while`/`for` AST survives past
//! parsing.

pub mod builder;
pub mod expr;
pub mod scope;
pub mod stmt;

pub use builder::IrBuilder;
pub use expr::{
    BinaryOp, BuiltinKind, CastOp, ConstantValue, Designator, Expr, ExprKind, IncDecOp,
    InitializerElement, SizeOfOperand, UnaryOp,
};
pub use scope::{BlockScope, LabelEntry, LabelScope, LabelState, TagScope, UsageFlags, VarInfo};
pub use stmt::{LabelId, Stmt, StmtKind, VarDeclEntry};
