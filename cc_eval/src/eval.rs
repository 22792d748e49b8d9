//! The constant-expression evaluator (§4.7). Walks a `cc_ir::Expr` tree
//! bottom-up; grounded on xcc's `Evaluator::evali`/`casti` in
//! `evaluator.cpp`, generalized from "integers only, abort on anything
//! else" to the full §4.7 contract (integers, floats, address constants,
//! short-circuit `?:`/`&&`/`||`).
//!
//! A constant expression that hits a *defined* diagnosable condition
//! (overflow, division by zero, an out-of-range shift) still produces a
//! value — the diagnostic is a warning, not a failure — matching §4.7's
//! "produces a warning and a wrapped/undef result" wording throughout.
//! [`NotConstant`] is reserved for expressions that are not constant
//! expressions at all.

use cc_common::{Diagnostic, DiagnosticEngine, Location, LocationResolver, Severity};
use cc_ir::{BinaryOp, CastOp, ConstantValue, Expr, ExprKind, UnaryOp};
use cc_types::Type;

use crate::integer;
use crate::value::{AddressConstant, ConstValue, NotConstant};

pub struct Evaluator<'d> {
    diags: &'d mut DiagnosticEngine,
    /// Mirrors xcc's `withQuiet`: constant folding that merely *probes*
    /// whether an expression happens to be constant (e.g. to decide
    /// whether a branch is dead) shouldn't double-report diagnostics that
    /// the normal evaluation pass will also emit.
    quiet: bool,
}

impl<'d> Evaluator<'d> {
    pub fn new(diags: &'d mut DiagnosticEngine) -> Self {
        Self { diags, quiet: false }
    }

    pub fn quiet(diags: &'d mut DiagnosticEngine) -> Self {
        Self { diags, quiet: true }
    }

    fn warn(&mut self, template: &'static str, loc: Location, resolver: &dyn LocationResolver) {
        if self.quiet {
            return;
        }
        self.diags.emit(Diagnostic::new(Severity::Warning, template, loc), resolver);
    }

    fn error(&mut self, template: &'static str, loc: Location, resolver: &dyn LocationResolver) -> NotConstant {
        if !self.quiet {
            self.diags.emit(Diagnostic::new(Severity::EvalError, template, loc), resolver);
        }
        NotConstant::new(template)
    }

    pub fn eval<'a>(&mut self, expr: &Expr<'a>, resolver: &dyn LocationResolver) -> Result<ConstValue<'a>, NotConstant> {
        match &expr.kind {
            ExprKind::Constant(c) => Ok(constant_value(c, expr.ty)),

            ExprKind::StringLiteral { bytes } => Ok(ConstValue::Address(AddressConstant::StringLiteral(bytes))),

            ExprKind::GlobalRef { name } => Ok(ConstValue::Address(AddressConstant::Global { name: *name, offset: 0 })),

            ExprKind::BlockAddress { label } => Ok(ConstValue::Address(AddressConstant::Label(*label))),

            ExprKind::ArrayToPointerDecay { array } => self.eval(array, resolver),

            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, expr, resolver),

            ExprKind::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, expr, resolver),

            ExprKind::Cast { op, operand } => self.eval_cast(*op, operand, expr, resolver),

            ExprKind::Condition { cond, then_branch, else_branch } => {
                let c = self.eval(cond, resolver)?;
                if c.is_truthy() {
                    self.eval(then_branch, resolver)
                } else {
                    self.eval(else_branch, resolver)
                }
            }

            ExprKind::VariableRef { .. } => Err(self.error("reference to a non-constant variable in a constant expression", expr.loc, resolver)),

            ExprKind::AddressOf { operand } => match &operand.kind {
                ExprKind::GlobalRef { name } => Ok(ConstValue::Address(AddressConstant::Global { name: *name, offset: 0 })),
                _ => Err(self.error("operand of '&' is not an object with static storage duration", expr.loc, resolver)),
            },

            ExprKind::Call { .. }
            | ExprKind::Subscript { .. }
            | ExprKind::Member { .. }
            | ExprKind::InitializerList { .. }
            | ExprKind::PostIncDec { .. }
            | ExprKind::BuiltinCall { .. }
            | ExprKind::ComplexPart { .. }
            | ExprKind::Assign { .. }
            | ExprKind::CompoundAssign { .. }
            | ExprKind::Deref { .. }
            | ExprKind::SizeOf { .. } => Err(self.error("expression is not a constant expression", expr.loc, resolver)),
        }
    }

    fn eval_unary<'a>(&mut self, op: UnaryOp, operand: &Expr<'a>, expr: &Expr<'a>, resolver: &dyn LocationResolver) -> Result<ConstValue<'a>, NotConstant> {
        let v = self.eval(operand, resolver)?;
        match op {
            UnaryOp::Plus => Ok(v),
            UnaryOp::Neg => match v {
                ConstValue::Int { value, width, signed } => {
                    let (result, overflowed) = integer::neg(value, width, signed);
                    if overflowed {
                        self.warn("integer overflow in constant expression", expr.loc, resolver);
                    }
                    Ok(ConstValue::Int { value: result, width, signed })
                }
                ConstValue::Float(f) => Ok(ConstValue::Float(-f)),
                _ => Err(self.error("operand of unary '-' is not arithmetic", expr.loc, resolver)),
            },
            UnaryOp::BitNot => match v {
                ConstValue::Int { value, width, signed } => Ok(ConstValue::Int { value: integer::wrap(!value, width, signed), width, signed }),
                _ => Err(self.error("operand of '~' is not an integer", expr.loc, resolver)),
            },
            UnaryOp::LogicalNot => {
                let (width, signed) = int_meta(expr.ty).unwrap_or((32, true));
                Ok(ConstValue::Int { value: if v.is_truthy() { 0 } else { 1 }, width, signed })
            }
        }
    }

    fn eval_binary<'a>(&mut self, op: BinaryOp, lhs: &Expr<'a>, rhs: &Expr<'a>, expr: &Expr<'a>, resolver: &dyn LocationResolver) -> Result<ConstValue<'a>, NotConstant> {
        // §8 / SPEC_FULL: short-circuit explicitly, so e.g. `1 ? 0 : 1/0`
        // and `0 && 1/0` never evaluate (and never warn on) their dead side.
        if matches!(op, BinaryOp::LogicalAnd | BinaryOp::LogicalOr) {
            let l = self.eval(lhs, resolver)?;
            let (width, signed) = int_meta(expr.ty).unwrap_or((32, true));
            let decided = match op {
                BinaryOp::LogicalAnd if !l.is_truthy() => Some(false),
                BinaryOp::LogicalOr if l.is_truthy() => Some(true),
                _ => None,
            };
            if let Some(result) = decided {
                return Ok(ConstValue::Int { value: result as i128, width, signed });
            }
            let r = self.eval(rhs, resolver)?;
            return Ok(ConstValue::Int { value: r.is_truthy() as i128, width, signed });
        }

        if op == BinaryOp::Comma {
            self.eval(lhs, resolver)?;
            return self.eval(rhs, resolver);
        }

        if matches!(op, BinaryOp::PtrAddInt | BinaryOp::PtrSubInt) {
            return self.eval_pointer_arith(op, lhs, rhs, expr, resolver);
        }

        let l = self.eval(lhs, resolver)?;
        let r = self.eval(rhs, resolver)?;

        if let (Some(lf), Some(rf)) = (l.as_float(), r.as_float()) {
            return self.eval_float_binary(op, lf, rf, expr, resolver);
        }

        let (lv, width, signed) = l.as_int().ok_or_else(|| self.error("operand is not an integer constant", expr.loc, resolver))?;
        let (rv, _, _) = r.as_int().ok_or_else(|| self.error("operand is not an integer constant", expr.loc, resolver))?;

        let (cmp_width, cmp_signed) = int_meta(expr.ty).unwrap_or((32, true));
        let as_bool = |b: bool| ConstValue::Int { value: b as i128, width: cmp_width, signed: cmp_signed };

        match op {
            BinaryOp::AddS | BinaryOp::AddU => {
                let (value, overflowed) = integer::add(lv, rv, width, signed);
                if overflowed {
                    self.warn("integer overflow in constant expression", expr.loc, resolver);
                }
                Ok(ConstValue::Int { value, width, signed })
            }
            BinaryOp::SubS | BinaryOp::SubU => {
                let (value, overflowed) = integer::sub(lv, rv, width, signed);
                if overflowed {
                    self.warn("integer overflow in constant expression", expr.loc, resolver);
                }
                Ok(ConstValue::Int { value, width, signed })
            }
            BinaryOp::MulS | BinaryOp::MulU => {
                let (value, overflowed) = integer::mul(lv, rv, width, signed);
                if overflowed {
                    self.warn("integer overflow in constant expression", expr.loc, resolver);
                }
                Ok(ConstValue::Int { value, width, signed })
            }
            BinaryOp::DivS | BinaryOp::DivU => {
                let (value, overflowed, div_zero) = integer::div(lv, rv, width, signed);
                if div_zero {
                    self.warn("division by zero in constant expression", expr.loc, resolver);
                } else if overflowed {
                    self.warn("integer overflow in constant expression", expr.loc, resolver);
                }
                Ok(ConstValue::Int { value, width, signed })
            }
            BinaryOp::RemS | BinaryOp::RemU => {
                let (value, overflowed, div_zero) = integer::rem(lv, rv, width, signed);
                if div_zero {
                    self.warn("remainder by zero in constant expression", expr.loc, resolver);
                } else if overflowed {
                    self.warn("integer overflow in constant expression", expr.loc, resolver);
                }
                Ok(ConstValue::Int { value, width, signed })
            }
            BinaryOp::BitAnd => Ok(ConstValue::Int { value: integer::wrap(lv & rv, width, signed), width, signed }),
            BinaryOp::BitOr => Ok(ConstValue::Int { value: integer::wrap(lv | rv, width, signed), width, signed }),
            BinaryOp::BitXor => Ok(ConstValue::Int { value: integer::wrap(lv ^ rv, width, signed), width, signed }),
            BinaryOp::Shl => {
                if !integer::shift_is_well_defined(rv, width) {
                    self.warn("shift count is negative or ≥ the operand width", expr.loc, resolver);
                }
                Ok(ConstValue::Int { value: integer::shl(lv, rv, width, signed), width, signed })
            }
            BinaryOp::ShrS => {
                if !integer::shift_is_well_defined(rv, width) {
                    self.warn("shift count is negative or ≥ the operand width", expr.loc, resolver);
                }
                Ok(ConstValue::Int { value: integer::shr_arithmetic(lv, rv, width), width, signed })
            }
            BinaryOp::ShrU => {
                if !integer::shift_is_well_defined(rv, width) {
                    self.warn("shift count is negative or ≥ the operand width", expr.loc, resolver);
                }
                Ok(ConstValue::Int { value: integer::shr_unsigned(lv, rv, width), width, signed })
            }
            BinaryOp::CmpEqS | BinaryOp::CmpEqF => Ok(as_bool(lv == rv)),
            BinaryOp::CmpNeS | BinaryOp::CmpNeF => Ok(as_bool(lv != rv)),
            BinaryOp::CmpLtS => Ok(as_bool(lv < rv)),
            BinaryOp::CmpLtU => Ok(as_bool((lv as u128) < (rv as u128))),
            BinaryOp::CmpLeS => Ok(as_bool(lv <= rv)),
            BinaryOp::CmpLeU => Ok(as_bool((lv as u128) <= (rv as u128))),
            BinaryOp::CmpGtS => Ok(as_bool(lv > rv)),
            BinaryOp::CmpGtU => Ok(as_bool((lv as u128) > (rv as u128))),
            BinaryOp::CmpGeS => Ok(as_bool(lv >= rv)),
            BinaryOp::CmpGeU => Ok(as_bool((lv as u128) >= (rv as u128))),
            BinaryOp::PtrDiff | BinaryOp::ComplexConstruct | BinaryOp::AtomicRmwAdd | BinaryOp::AtomicRmwSub | BinaryOp::AtomicRmwAnd | BinaryOp::AtomicRmwOr | BinaryOp::AtomicRmwXor | BinaryOp::AtomicRmwExchange => {
                Err(self.error("operator is not valid in a constant expression", expr.loc, resolver))
            }
            BinaryOp::AddF | BinaryOp::SubF | BinaryOp::MulF | BinaryOp::DivF | BinaryOp::CmpLtF | BinaryOp::CmpLeF | BinaryOp::CmpGtF | BinaryOp::CmpGeF => {
                unreachable!("float operators are routed through eval_float_binary")
            }
            BinaryOp::PtrAddInt | BinaryOp::PtrSubInt | BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::Comma => {
                unreachable!("handled above")
            }
        }
    }

    fn eval_float_binary<'a>(&mut self, op: BinaryOp, lv: f64, rv: f64, expr: &Expr<'a>, resolver: &dyn LocationResolver) -> Result<ConstValue<'a>, NotConstant> {
        let (width, signed) = int_meta(expr.ty).unwrap_or((32, true));
        let as_bool = |b: bool| ConstValue::Int { value: b as i128, width, signed };
        match op {
            BinaryOp::AddF => Ok(ConstValue::Float(lv + rv)),
            BinaryOp::SubF => Ok(ConstValue::Float(lv - rv)),
            BinaryOp::MulF => Ok(ConstValue::Float(lv * rv)),
            BinaryOp::DivF => {
                if rv == 0.0 {
                    self.warn("floating-point division by zero in constant expression", expr.loc, resolver);
                }
                Ok(ConstValue::Float(lv / rv))
            }
            BinaryOp::CmpEqF => Ok(as_bool(crate::float::ordered_cmp(lv, rv) == Some(std::cmp::Ordering::Equal))),
            BinaryOp::CmpNeF => Ok(as_bool(crate::float::ordered_cmp(lv, rv) != Some(std::cmp::Ordering::Equal))),
            BinaryOp::CmpLtF => Ok(as_bool(crate::float::ordered_cmp(lv, rv) == Some(std::cmp::Ordering::Less))),
            BinaryOp::CmpLeF => Ok(as_bool(matches!(crate::float::ordered_cmp(lv, rv), Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)))),
            BinaryOp::CmpGtF => Ok(as_bool(crate::float::ordered_cmp(lv, rv) == Some(std::cmp::Ordering::Greater))),
            BinaryOp::CmpGeF => Ok(as_bool(matches!(crate::float::ordered_cmp(lv, rv), Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)))),
            _ => Err(self.error("operator is not valid between floating constants", expr.loc, resolver)),
        }
    }

    fn eval_pointer_arith<'a>(&mut self, op: BinaryOp, lhs: &Expr<'a>, rhs: &Expr<'a>, expr: &Expr<'a>, resolver: &dyn LocationResolver) -> Result<ConstValue<'a>, NotConstant> {
        let base = self.eval(lhs, resolver)?;
        let (offset, _, _) = self.eval(rhs, resolver)?.as_int().ok_or_else(|| self.error("pointer arithmetic offset is not an integer constant", expr.loc, resolver))?;
        let delta = if op == BinaryOp::PtrSubInt { -offset } else { offset };
        base.offset_by(delta as i64).ok_or_else(|| self.error("pointer arithmetic on a non-address constant", expr.loc, resolver))
    }

    fn eval_cast<'a>(&mut self, op: CastOp, operand: &Expr<'a>, expr: &Expr<'a>, resolver: &dyn LocationResolver) -> Result<ConstValue<'a>, NotConstant> {
        let v = self.eval(operand, resolver)?;
        match op {
            CastOp::Bitcast => Ok(v),
            CastOp::Trunc | CastOp::ZExt | CastOp::SExt => {
                let (value, src_width, _) = v.as_int().ok_or_else(|| self.error("cast operand is not an integer constant", expr.loc, resolver))?;
                let (dst_width, dst_signed) = int_meta(expr.ty).unwrap_or((src_width, true));
                let result = match op {
                    CastOp::Trunc => integer::wrap(value, dst_width, dst_signed),
                    CastOp::ZExt => integer::wrap(integer::wrap(value, src_width, false), dst_width, dst_signed),
                    CastOp::SExt => integer::wrap(integer::wrap(value, src_width, true), dst_width, dst_signed),
                    _ => unreachable!(),
                };
                Ok(ConstValue::Int { value: result, width: dst_width, signed: dst_signed })
            }
            CastOp::SiToFp | CastOp::UiToFp => {
                let (value, width, signed) = v.as_int().ok_or_else(|| self.error("cast operand is not an integer constant", expr.loc, resolver))?;
                let as_f = if signed { integer::wrap(value, width, true) as f64 } else { (integer::wrap(value, width, false) as u128) as f64 };
                Ok(ConstValue::Float(as_f))
            }
            CastOp::FpToSi | CastOp::FpToUi => {
                let f = v.as_float().ok_or_else(|| self.error("cast operand is not a floating constant", expr.loc, resolver))?;
                let (width, signed) = int_meta(expr.ty).unwrap_or((32, true));
                if !f.is_finite() || f >= 2f64.powi(width as i32) || f < -(2f64.powi(width as i32 - 1)) {
                    self.warn("floating-to-integer constant conversion is out of range", expr.loc, resolver);
                }
                Ok(ConstValue::Int { value: integer::wrap(f as i128, width, signed), width, signed })
            }
            CastOp::FpExt | CastOp::FpTrunc => {
                // Only `f64` is modeled internally regardless of the
                // source/destination float kind, so widening/narrowing
                // between `float`/`double`/`long double` is a no-op here.
                Ok(v)
            }
            CastOp::PtrToInt => match v {
                ConstValue::NullPointer => {
                    let (width, signed) = int_meta(expr.ty).unwrap_or((64, false));
                    Ok(ConstValue::Int { value: 0, width, signed })
                }
                ConstValue::Address(_) => Err(self.error("address constant has no defined integer value before linking", expr.loc, resolver)),
                _ => Err(self.error("cast operand is not a pointer constant", expr.loc, resolver)),
            },
            CastOp::IntToPtr => match v.as_int() {
                Some((0, _, _)) => Ok(ConstValue::NullPointer),
                Some(_) => Err(self.error("non-zero integer-to-pointer cast has no constant address", expr.loc, resolver)),
                None => Err(self.error("cast operand is not an integer constant", expr.loc, resolver)),
            },
        }
    }
}

fn constant_value<'a>(c: &ConstantValue, ty: &Type<'a>) -> ConstValue<'a> {
    match c {
        ConstantValue::Int { value, signed } => {
            let (width, _) = int_meta(ty).unwrap_or((32, *signed));
            ConstValue::Int { value: *value, width, signed: *signed }
        }
        ConstantValue::Float(f) => ConstValue::Float(*f),
    }
}

fn int_meta(ty: &Type) -> Option<(u32, bool)> {
    match ty {
        Type::Primitive(tag) if tag.is_integer() => Some((tag.bit_width(), tag.is_signed())),
        Type::BitInt(b) => int_meta(b.underlying).map(|(_, signed)| (b.width, signed)),
        Type::Enum(_) => Some((32, true)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_arena::Arena;
    use cc_common::DecodedLocation;
    use cc_ir::{BinaryOp, Expr, ExprKind};
    use cc_types::{IntegerKind, PrimitiveTag, TypeTable};

    struct NoLocations;
    impl LocationResolver for NoLocations {
        fn decode(&self, _loc: Location) -> Option<DecodedLocation> {
            None
        }
    }

    fn int_const<'a>(_arena: &'a Arena, types: &mut TypeTable<'a>, value: i128, signed: bool) -> Expr<'a> {
        let ty = types.primitive(PrimitiveTag::integer(IntegerKind::Int, signed));
        Expr::new(ExprKind::Constant(ConstantValue::Int { value, signed }), ty, Location::NONE)
    }

    #[test]
    fn folds_simple_addition() {
        let arena = Arena::new();
        let mut types = TypeTable::new(&arena);
        let lhs = int_const(&arena, &mut types, 2, true);
        let rhs = int_const(&arena, &mut types, 3, true);
        let ty = types.primitive(PrimitiveTag::integer(IntegerKind::Int, true));
        let add = Expr::new(ExprKind::Binary { op: BinaryOp::AddS, lhs: &lhs, rhs: &rhs }, ty, Location::NONE);

        let mut diags = DiagnosticEngine::new(None);
        let mut eval = Evaluator::new(&mut diags);
        let result = eval.eval(&add, &NoLocations).unwrap();
        assert_eq!(result, ConstValue::Int { value: 5, width: 32, signed: true });
    }

    #[test]
    fn division_by_zero_warns_but_is_still_constant() {
        let arena = Arena::new();
        let mut types = TypeTable::new(&arena);
        let lhs = int_const(&arena, &mut types, 10, true);
        let rhs = int_const(&arena, &mut types, 0, true);
        let ty = types.primitive(PrimitiveTag::integer(IntegerKind::Int, true));
        let div = Expr::new(ExprKind::Binary { op: BinaryOp::DivS, lhs: &lhs, rhs: &rhs }, ty, Location::NONE);

        let mut diags = DiagnosticEngine::new(None);
        let result = Evaluator::new(&mut diags).eval(&div, &NoLocations).unwrap();
        assert_eq!(result, ConstValue::Int { value: 0, width: 32, signed: true });
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn ternary_does_not_evaluate_dead_branch() {
        let arena = Arena::new();
        let mut types = TypeTable::new(&arena);
        let cond = int_const(&arena, &mut types, 1, true);
        let then_branch = int_const(&arena, &mut types, 0, true);
        let one = int_const(&arena, &mut types, 1, true);
        let zero = int_const(&arena, &mut types, 0, true);
        let int_ty = types.primitive(PrimitiveTag::integer(IntegerKind::Int, true));
        let poison_div = Expr::new(ExprKind::Binary { op: BinaryOp::DivS, lhs: &one, rhs: &zero }, int_ty, Location::NONE);
        let ternary = Expr::new(
            ExprKind::Condition { cond: &cond, then_branch: &then_branch, else_branch: &poison_div },
            int_ty,
            Location::NONE,
        );

        let mut diags = DiagnosticEngine::new(None);
        let mut eval = Evaluator::new(&mut diags);
        let result = eval.eval(&ternary, &NoLocations).unwrap();
        assert_eq!(result, ConstValue::Int { value: 0, width: 32, signed: true });
        assert_eq!(diags.warning_count(), 0);
    }

    #[test]
    fn logical_and_short_circuits_without_warning() {
        let arena = Arena::new();
        let mut types = TypeTable::new(&arena);
        let zero = int_const(&arena, &mut types, 0, true);
        let one = int_const(&arena, &mut types, 1, true);
        let int_ty = types.primitive(PrimitiveTag::integer(IntegerKind::Int, true));
        let poison_div = Expr::new(ExprKind::Binary { op: BinaryOp::DivS, lhs: &one, rhs: &zero }, int_ty, Location::NONE);
        let and_expr = Expr::new(ExprKind::Binary { op: BinaryOp::LogicalAnd, lhs: &zero, rhs: &poison_div }, int_ty, Location::NONE);

        let mut diags = DiagnosticEngine::new(None);
        let mut eval = Evaluator::new(&mut diags);
        let result = eval.eval(&and_expr, &NoLocations).unwrap();
        assert_eq!(result, ConstValue::Int { value: 0, width: 32, signed: true });
        assert_eq!(diags.warning_count(), 0);
    }

    #[test]
    fn shift_overflow_warns() {
        let arena = Arena::new();
        let mut types = TypeTable::new(&arena);
        let lhs = int_const(&arena, &mut types, 1, false);
        let rhs = int_const(&arena, &mut types, 64, false);
        let ty = types.primitive(PrimitiveTag::integer(IntegerKind::Int, false));
        let shl_expr = Expr::new(ExprKind::Binary { op: BinaryOp::Shl, lhs: &lhs, rhs: &rhs }, ty, Location::NONE);

        let mut diags = DiagnosticEngine::new(None);
        let mut eval = Evaluator::new(&mut diags);
        let result = eval.eval(&shl_expr, &NoLocations).unwrap();
        assert_eq!(result, ConstValue::Int { value: 0, width: 32, signed: false });
        assert_eq!(diags.warning_count(), 1);
    }
}
