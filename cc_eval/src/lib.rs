//! The constant expression evaluator (§4.7): folds a fully-typed
//! `cc_ir::Expr` into an integer, float, address, or null-pointer constant,
//! or reports that the expression is not constant at all. [`integer`] and
//! [`float`] hold the per-representation arithmetic; [`value`] holds the
//! result type; [`eval`] is the tree walk.

pub mod eval;
pub mod float;
pub mod integer;
pub mod value;

pub use eval::Evaluator;
pub use value::{AddressConstant, ConstValue, NotConstant};
