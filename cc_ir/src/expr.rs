//! Expression nodes (§3 "Expression"): a tagged node carrying its type and
//! origin location, with explicit, representation-specific opcodes instead
//! of a single overloaded `+`/`<`/cast node — the usual arithmetic
//! conversions and cast-kind selection already happened in Sema by the time
//! an `Expr` exists.

use cc_arena::IdentHandle;
use cc_common::Location;
use cc_types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    BitNot,
    LogicalNot,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    AddS,
    AddU,
    AddF,
    SubS,
    SubU,
    SubF,
    MulS,
    MulU,
    MulF,
    DivS,
    DivU,
    DivF,
    RemS,
    RemU,
    PtrAddInt,
    PtrSubInt,
    PtrDiff,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    ShrS,
    ShrU,
    LogicalAnd,
    LogicalOr,
    Comma,
    ComplexConstruct,
    CmpEqS,
    CmpEqF,
    CmpNeS,
    CmpNeF,
    CmpLtS,
    CmpLtU,
    CmpLtF,
    CmpLeS,
    CmpLeU,
    CmpLeF,
    CmpGtS,
    CmpGtU,
    CmpGtF,
    CmpGeS,
    CmpGeU,
    CmpGeF,
    AtomicRmwAdd,
    AtomicRmwSub,
    AtomicRmwAnd,
    AtomicRmwOr,
    AtomicRmwXor,
    AtomicRmwExchange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FpToSi,
    FpToUi,
    SiToFp,
    UiToFp,
    PtrToInt,
    IntToPtr,
    FpExt,
    FpTrunc,
    Bitcast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    PostInc,
    PostDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    VaStart,
    VaArg,
    VaEnd,
    VaCopy,
    ExpectCall,
    Alloca,
    Unreachable,
    Trap,
    Offsetof,
}

/// A fully-folded constant payload, carried on [`ExprKind::Constant`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstantValue {
    Int { value: i128, signed: bool },
    Float(f64),
}

#[derive(Debug, Clone, Copy)]
pub struct DesignatorField(pub IdentHandle);

#[derive(Debug, Clone, Copy)]
pub enum Designator {
    Field(IdentHandle),
    Index(u64),
}

#[derive(Debug)]
pub struct InitializerElement<'a> {
    pub designators: &'a [Designator],
    pub value: &'a Expr<'a>,
}

#[derive(Debug)]
pub enum SizeOfOperand<'a> {
    Type(&'a Type<'a>),
    Expr(&'a Expr<'a>),
}

#[derive(Debug)]
pub enum ExprKind<'a> {
    Constant(ConstantValue),
    /// References a variable by its index into the enclosing block scope's
    /// entry list (see [`crate::scope::BlockScope`]), not by name.
    VariableRef { scope_index: u32 },
    /// References a file-scope (`extern`/`static`) identifier by name
    /// rather than by block-scope index, so `&name` is recognizable as an
    /// address constant (§4.7) without consulting the scope stack.
    GlobalRef { name: IdentHandle },
    Unary { op: UnaryOp, operand: &'a Expr<'a> },
    Binary { op: BinaryOp, lhs: &'a Expr<'a>, rhs: &'a Expr<'a> },
    Cast { op: CastOp, operand: &'a Expr<'a> },
    Call { callee: &'a Expr<'a>, args: &'a [&'a Expr<'a>] },
    Subscript { base: &'a Expr<'a>, index: &'a Expr<'a> },
    Member { base: &'a Expr<'a>, field: IdentHandle, through_pointer: bool },
    ArrayToPointerDecay { array: &'a Expr<'a> },
    StringLiteral { bytes: &'a [u8] },
    InitializerList { elements: &'a [InitializerElement<'a>] },
    Condition { cond: &'a Expr<'a>, then_branch: &'a Expr<'a>, else_branch: &'a Expr<'a> },
    SizeOf { operand: SizeOfOperand<'a> },
    ComplexPart { real: bool, operand: &'a Expr<'a> },
    PostIncDec { op: IncDecOp, operand: &'a Expr<'a> },
    BlockAddress { label: crate::stmt::LabelId },
    BuiltinCall { builtin: BuiltinKind, args: &'a [&'a Expr<'a>] },
    /// Simple assignment. Kept distinct from [`BinaryOp`] rather than
    /// folded into it: unlike every `BinaryOp`, an assignment's left
    /// operand is evaluated for its address, not its value.
    /// `&operand`: the address of an lvalue. Distinct from `Unary` because
    /// its operand is evaluated as a location, never loaded.
    AddressOf { operand: &'a Expr<'a> },
    /// `*operand`: turns a pointer value into the lvalue it points to.
    Deref { operand: &'a Expr<'a> },
    Assign { target: &'a Expr<'a>, value: &'a Expr<'a> },
    /// `target op= value` (`+=`, `&=`, ...), kept distinct from a plain
    /// `Assign` of a `Binary` so a lowering pass can tell "read-modify-write
    /// of one lvalue" from "evaluate, then store" without re-deriving it.
    CompoundAssign { op: BinaryOp, target: &'a Expr<'a>, value: &'a Expr<'a> },
}

/// An expression node: its variant payload plus the type Sema assigned it
/// and the source location(s) it originated from.
#[derive(Debug)]
pub struct Expr<'a> {
    pub kind: ExprKind<'a>,
    pub ty: &'a Type<'a>,
    pub loc: Location,
}

impl<'a> Expr<'a> {
    pub fn new(kind: ExprKind<'a>, ty: &'a Type<'a>, loc: Location) -> Self {
        Self { kind, ty, loc }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ExprKind::Constant(_))
    }
}
