//! Expression parsing and the Sema that goes with it (§4.7): precedence
//! climbing down to `primary-expression`, with the usual arithmetic
//! conversions selecting a representation-specific [`BinaryOp`]/[`CastOp`]
//! at every operator the way xcc's `Sema::binop`/`Sema::castto` do, rather
//! than carrying a single generic `+`/cast node into later stages.

use cc_arena::IdentHandle;
use cc_common::Location;
use cc_ir::{BinaryOp, CastOp, ConstantValue, Expr, ExprKind, IncDecOp, SizeOfOperand, UnaryOp};
use cc_lexer::token::{Punct, TokenKind};
use cc_types::{compatible, type_equal, ArraySize, FloatKind, IntegerKind, PrimitiveTag, Type};

use crate::core::{NoResolver, Parser};

/// `expression`: a comma-separated sequence of assignment-expressions,
/// evaluating left to right and yielding the last one's value.
pub(crate) fn parse_expr<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    let mut e = parse_assignment(parser);
    while parser.peek_is_punct(Punct::Comma) {
        let loc = parser.loc();
        parser.tokens.bump();
        let rhs = parse_assignment(parser);
        e = parser.arena.alloc(Expr::new(ExprKind::Binary { op: BinaryOp::Comma, lhs: e, rhs }, rhs.ty, loc));
    }
    e
}

fn compound_op_for_punct(p: Punct) -> Option<BinaryOpKind> {
    Some(match p {
        Punct::PlusEq => BinaryOpKind::Add,
        Punct::MinusEq => BinaryOpKind::Sub,
        Punct::StarEq => BinaryOpKind::Mul,
        Punct::SlashEq => BinaryOpKind::Div,
        Punct::PercentEq => BinaryOpKind::Rem,
        Punct::AmpEq => BinaryOpKind::BitAnd,
        Punct::PipeEq => BinaryOpKind::BitOr,
        Punct::CaretEq => BinaryOpKind::BitXor,
        Punct::ShiftLeftEq => BinaryOpKind::Shl,
        Punct::ShiftRightEq => BinaryOpKind::Shr,
        _ => return None,
    })
}

/// `assignment-expression`: `conditional-expression`, or
/// `unary-expression assignment-operator assignment-expression`
/// (right-associative).
pub(crate) fn parse_assignment<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    let lhs = parse_conditional(parser);
    let loc = parser.loc();
    if parser.bump_if_punct(Punct::Eq) {
        let rhs = parse_assignment(parser);
        let rhs = convert(parser, rhs, lhs.ty);
        return parser.arena.alloc(Expr::new(ExprKind::Assign { target: lhs, value: rhs }, lhs.ty, loc));
    }
    if let TokenKind::Punct(p) = parser.tokens.peek().kind {
        if let Some(kind) = compound_op_for_punct(p) {
            parser.tokens.bump();
            let rhs = parse_assignment(parser);
            let common = usual_arith(parser, lhs.ty, rhs.ty);
            let op = binary_op_for(kind, common);
            let rhs = convert(parser, rhs, common);
            return parser.arena.alloc(Expr::new(ExprKind::CompoundAssign { op, target: lhs, value: rhs }, lhs.ty, loc));
        }
    }
    lhs
}

/// `conditional-expression`: `logical-or-expression ('?' expression ':' conditional-expression)?`.
fn parse_conditional<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    let cond = parse_logical_or(parser);
    let loc = parser.loc();
    if !parser.bump_if_punct(Punct::Question) {
        return cond;
    }
    let then_branch = parse_expr(parser);
    parser.expect_punct(Punct::Colon, "expected ':' in conditional expression");
    let else_branch = parse_conditional(parser);
    let result_ty = usual_arith(parser, then_branch.ty, else_branch.ty);
    let then_branch = convert(parser, then_branch, result_ty);
    let else_branch = convert(parser, else_branch, result_ty);
    parser.arena.alloc(Expr::new(ExprKind::Condition { cond, then_branch, else_branch }, result_ty, loc))
}

macro_rules! left_assoc_level {
    ($name:ident, $next:ident, [$($punct:pat => $kind:expr),+ $(,)?]) => {
        fn $name<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
            let mut lhs = $next(parser);
            loop {
                let kind = match parser.tokens.peek().kind {
                    $(TokenKind::Punct($punct) => $kind,)+
                    _ => break,
                };
                let loc = parser.loc();
                parser.tokens.bump();
                let rhs = $next(parser);
                lhs = build_binary(parser, kind, lhs, rhs, loc);
            }
            lhs
        }
    };
}

#[derive(Clone, Copy)]
enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Builds a `Binary` node, applying the usual arithmetic conversions and
/// picking the representation-specific opcode — except `p - p`, which
/// yields `ptrdiff_t` via `PtrDiff` rather than going through the ordinary
/// common-type machinery at all.
fn build_binary<'a>(parser: &mut Parser<'a>, kind: BinaryOpKind, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>, loc: Location) -> &'a Expr<'a> {
    if matches!(kind, BinaryOpKind::Sub) && matches!(lhs.ty, Type::Pointer(_)) && matches!(rhs.ty, Type::Pointer(_)) {
        let result_ty = parser.size_ty;
        return parser.arena.alloc(Expr::new(ExprKind::Binary { op: BinaryOp::PtrDiff, lhs, rhs }, result_ty, loc));
    }
    let common = usual_arith(parser, lhs.ty, rhs.ty);
    let op = binary_op_for(kind, common);
    let result_ty = if is_comparison(kind) { parser.int_ty } else { common };
    let is_ptr_arith = matches!(op, BinaryOp::PtrAddInt | BinaryOp::PtrSubInt);
    let lhs = if is_ptr_arith { lhs } else { convert(parser, lhs, common) };
    let rhs = if is_ptr_arith { rhs } else { convert(parser, rhs, common) };
    parser.arena.alloc(Expr::new(ExprKind::Binary { op, lhs, rhs }, result_ty, loc))
}

fn is_comparison(kind: BinaryOpKind) -> bool {
    matches!(kind, BinaryOpKind::Eq | BinaryOpKind::Ne | BinaryOpKind::Lt | BinaryOpKind::Le | BinaryOpKind::Gt | BinaryOpKind::Ge)
}

left_assoc_level!(parse_equality_level, parse_relational_level, [Punct::EqEq => BinaryOpKind::Eq, Punct::BangEq => BinaryOpKind::Ne]);
left_assoc_level!(parse_relational_level, parse_shift_level, [
    Punct::Lt => BinaryOpKind::Lt, Punct::Gt => BinaryOpKind::Gt, Punct::LtEq => BinaryOpKind::Le, Punct::GtEq => BinaryOpKind::Ge,
]);
left_assoc_level!(parse_shift_level, parse_additive_level, [Punct::ShiftLeft => BinaryOpKind::Shl, Punct::ShiftRight => BinaryOpKind::Shr]);
left_assoc_level!(parse_additive_level, parse_multiplicative_level, [Punct::Plus => BinaryOpKind::Add, Punct::Minus => BinaryOpKind::Sub]);
left_assoc_level!(parse_multiplicative_level, parse_cast, [
    Punct::Star => BinaryOpKind::Mul, Punct::Slash => BinaryOpKind::Div, Punct::Percent => BinaryOpKind::Rem,
]);

fn parse_logical_or<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    let mut lhs = parse_logical_and(parser);
    while parser.peek_is_punct(Punct::PipePipe) {
        let loc = parser.loc();
        parser.tokens.bump();
        let rhs = parse_logical_and(parser);
        lhs = parser.arena.alloc(Expr::new(ExprKind::Binary { op: BinaryOp::LogicalOr, lhs, rhs }, parser.int_ty, loc));
    }
    lhs
}

fn parse_logical_and<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    let mut lhs = parse_bitor(parser);
    while parser.peek_is_punct(Punct::AmpAmp) {
        let loc = parser.loc();
        parser.tokens.bump();
        let rhs = parse_bitor(parser);
        lhs = parser.arena.alloc(Expr::new(ExprKind::Binary { op: BinaryOp::LogicalAnd, lhs, rhs }, parser.int_ty, loc));
    }
    lhs
}

fn parse_bitor<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    let mut lhs = parse_bitxor(parser);
    while parser.peek_is_punct(Punct::Pipe) {
        let loc = parser.loc();
        parser.tokens.bump();
        let rhs = parse_bitxor(parser);
        lhs = build_binary(parser, BinaryOpKind::BitOr, lhs, rhs, loc);
    }
    lhs
}

fn parse_bitxor<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    let mut lhs = parse_bitand(parser);
    while parser.peek_is_punct(Punct::Caret) {
        let loc = parser.loc();
        parser.tokens.bump();
        let rhs = parse_bitand(parser);
        lhs = build_binary(parser, BinaryOpKind::BitXor, lhs, rhs, loc);
    }
    lhs
}

fn parse_bitand<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    let mut lhs = parse_equality_level(parser);
    while parser.peek_is_punct(Punct::Amp) {
        let loc = parser.loc();
        parser.tokens.bump();
        let rhs = parse_equality_level(parser);
        lhs = build_binary(parser, BinaryOpKind::BitAnd, lhs, rhs, loc);
    }
    lhs
}

/// `cast-expression`: `'(' type-name ')' cast-expression`, or
/// `unary-expression`. Disambiguated from a parenthesized expression by
/// whether what follows `(` can start a `declaration-specifiers`.
fn parse_cast<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    if parser.peek_is_punct(Punct::LParen) && starts_type_name(parser) {
        let loc = parser.loc();
        parser.tokens.bump();
        let spec = crate::types_parse::parse_decl_specs(parser);
        let (ty, _) = crate::decl::parse_declarator(parser, spec.base);
        parser.expect_punct(Punct::RParen, "expected ')' to close cast");
        let operand = parse_cast(parser);
        return convert_at(parser, operand, ty, loc);
    }
    parse_unary(parser)
}

/// `unary-expression`: prefix `++`/`--` (desugared to a compound assignment
/// of 1, the way a post-increment already has no dedicated "pre" opcode in
/// the IR — see [`ExprKind::CompoundAssign`]), a unary operator applied to a
/// cast-expression, `sizeof`, or a plain postfix-expression.
fn parse_unary<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    let loc = parser.loc();

    if parser.bump_if_punct(Punct::PlusPlus) {
        let operand = parse_unary(parser);
        return build_pre_incdec(parser, BinaryOpKind::Add, operand, loc);
    }
    if parser.bump_if_punct(Punct::MinusMinus) {
        let operand = parse_unary(parser);
        return build_pre_incdec(parser, BinaryOpKind::Sub, operand, loc);
    }
    if parser.bump_if_punct(Punct::Amp) {
        let operand = parse_cast(parser);
        let ty = parser.types.pointer(operand.ty, 0);
        return parser.arena.alloc(Expr::new(ExprKind::AddressOf { operand }, ty, loc));
    }
    if parser.bump_if_punct(Punct::Star) {
        let operand = parse_cast(parser);
        let ty = pointee_type(parser, operand.ty, loc);
        return parser.arena.alloc(Expr::new(ExprKind::Deref { operand }, ty, loc));
    }
    if parser.bump_if_punct(Punct::Plus) {
        let operand = parse_cast(parser);
        let ty = promote_int(parser, operand.ty);
        let operand = convert(parser, operand, ty);
        return parser.arena.alloc(Expr::new(ExprKind::Unary { op: UnaryOp::Plus, operand }, ty, loc));
    }
    if parser.bump_if_punct(Punct::Minus) {
        let operand = parse_cast(parser);
        let ty = promote_int(parser, operand.ty);
        let operand = convert(parser, operand, ty);
        return parser.arena.alloc(Expr::new(ExprKind::Unary { op: UnaryOp::Neg, operand }, ty, loc));
    }
    if parser.bump_if_punct(Punct::Tilde) {
        let operand = parse_cast(parser);
        let ty = promote_int(parser, operand.ty);
        let operand = convert(parser, operand, ty);
        return parser.arena.alloc(Expr::new(ExprKind::Unary { op: UnaryOp::BitNot, operand }, ty, loc));
    }
    if parser.bump_if_punct(Punct::Bang) {
        let operand = parse_cast(parser);
        return parser.arena.alloc(Expr::new(ExprKind::Unary { op: UnaryOp::LogicalNot, operand }, parser.int_ty, loc));
    }
    if parser.bump_if_keyword("sizeof") {
        if parser.peek_is_punct(Punct::LParen) && starts_type_name(parser) {
            parser.tokens.bump();
            let spec = crate::types_parse::parse_decl_specs(parser);
            let (ty, _) = crate::decl::parse_declarator(parser, spec.base);
            parser.expect_punct(Punct::RParen, "expected ')' to close sizeof operand");
            let size_ty = parser.size_ty;
            return parser.arena.alloc(Expr::new(ExprKind::SizeOf { operand: SizeOfOperand::Type(ty) }, size_ty, loc));
        }
        let operand = parse_unary(parser);
        let size_ty = parser.size_ty;
        return parser.arena.alloc(Expr::new(ExprKind::SizeOf { operand: SizeOfOperand::Expr(operand) }, size_ty, loc));
    }

    parse_postfix(parser)
}

/// Builds the `target += 1` / `target -= 1` a prefix `++`/`--` desugars to.
fn build_pre_incdec<'a>(parser: &mut Parser<'a>, kind: BinaryOpKind, target: &'a Expr<'a>, loc: Location) -> &'a Expr<'a> {
    let int_ty = parser.int_ty;
    let common = usual_arith(parser, target.ty, int_ty);
    let op = binary_op_for(kind, common);
    let one = parser.arena.alloc(Expr::new(ExprKind::Constant(ConstantValue::Int { value: 1, signed: true }), int_ty, loc));
    let value = if matches!(op, BinaryOp::PtrAddInt | BinaryOp::PtrSubInt) { one } else { convert(parser, one, common) };
    parser.arena.alloc(Expr::new(ExprKind::CompoundAssign { op, target, value }, target.ty, loc))
}

/// The type an indirection (`*p`, `p[i]`, `p->field`) yields: a pointer's
/// pointee, or an array's element type when the array hasn't decayed.
fn pointee_type<'a>(parser: &mut Parser<'a>, ty: &'a Type<'a>, loc: Location) -> &'a Type<'a> {
    match ty {
        Type::Pointer(p) => p.pointee,
        Type::Array(a) => a.element,
        _ => {
            parser.error("indirection requires a pointer operand", loc);
            parser.int_ty
        }
    }
}

fn member_type<'a>(parser: &mut Parser<'a>, base_ty: &'a Type<'a>, field: IdentHandle, loc: Location) -> &'a Type<'a> {
    match base_ty {
        Type::Record(r) => {
            if let Some(def) = r.def {
                if let Some(f) = def.fields.iter().find(|f| f.name == Some(field)) {
                    return f.ty;
                }
            }
            parser.error("no member with this name", loc);
            parser.int_ty
        }
        _ => {
            parser.error("member reference base type is not a struct or union", loc);
            parser.int_ty
        }
    }
}

/// `postfix-expression`: array subscript, call, member access, and postfix
/// `++`/`--`, all left-associative and chained onto whatever came before.
fn parse_postfix<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    let mut e = parse_primary(parser);
    loop {
        let loc = parser.loc();
        if parser.bump_if_punct(Punct::LBracket) {
            let index = parse_expr(parser);
            parser.expect_punct(Punct::RBracket, "expected ']'");
            let elem_ty = pointee_type(parser, e.ty, loc);
            e = parser.arena.alloc(Expr::new(ExprKind::Subscript { base: e, index }, elem_ty, loc));
            continue;
        }
        if parser.bump_if_punct(Punct::LParen) {
            let mut args = Vec::new();
            if !parser.peek_is_punct(Punct::RParen) {
                loop {
                    args.push(parse_assignment(parser));
                    if !parser.bump_if_punct(Punct::Comma) {
                        break;
                    }
                }
            }
            parser.expect_punct(Punct::RParen, "expected ')' to close call arguments");
            let ret_ty = match e.ty {
                Type::Function(f) => f.return_type,
                Type::Pointer(p) => match p.pointee {
                    Type::Function(f) => f.return_type,
                    _ => parser.int_ty,
                },
                _ => parser.int_ty,
            };
            let args = parser.arena.alloc_slice_fill_iter(args);
            e = parser.arena.alloc(Expr::new(ExprKind::Call { callee: e, args }, ret_ty, loc));
            continue;
        }
        if parser.bump_if_punct(Punct::Dot) {
            let Some(field) = parser.peek_plain_ident() else {
                parser.error("expected field name after '.'", loc);
                break;
            };
            parser.tokens.bump();
            let field_ty = member_type(parser, e.ty, field, loc);
            e = parser.arena.alloc(Expr::new(ExprKind::Member { base: e, field, through_pointer: false }, field_ty, loc));
            continue;
        }
        if parser.bump_if_punct(Punct::Arrow) {
            let Some(field) = parser.peek_plain_ident() else {
                parser.error("expected field name after '->'", loc);
                break;
            };
            parser.tokens.bump();
            let base_record = pointee_type(parser, e.ty, loc);
            let field_ty = member_type(parser, base_record, field, loc);
            e = parser.arena.alloc(Expr::new(ExprKind::Member { base: e, field, through_pointer: true }, field_ty, loc));
            continue;
        }
        if parser.peek_is_punct(Punct::PlusPlus) || parser.peek_is_punct(Punct::MinusMinus) {
            let op = if parser.bump_if_punct(Punct::PlusPlus) {
                IncDecOp::PostInc
            } else {
                parser.tokens.bump();
                IncDecOp::PostDec
            };
            e = parser.arena.alloc(Expr::new(ExprKind::PostIncDec { op, operand: e }, e.ty, loc));
            continue;
        }
        break;
    }
    e
}

/// `primary-expression`: an identifier (resolved against the variable
/// scope), a constant, a string literal, or a parenthesized expression.
fn parse_primary<'a>(parser: &mut Parser<'a>) -> &'a Expr<'a> {
    let loc = parser.loc();
    if parser.peek_is_punct(Punct::LParen) {
        parser.tokens.bump();
        let e = parse_expr(parser);
        parser.expect_punct(Punct::RParen, "expected ')'");
        return e;
    }
    if parser.bump_if_keyword("_Generic") {
        return parse_generic_selection(parser, loc);
    }
    if parser.bump_if_keyword("nullptr") {
        // `nullptr`'s type is `nullptr_t` (§1 C23), not a pointer itself;
        // `convert_at`'s existing int-to-pointer cast already fires for it
        // since a nullptr_t tag, like every non-float primitive, reports
        // `is_integer()`.
        let ty = parser.types.primitive(PrimitiveTag::nullptr_t());
        return parser.arena.alloc(Expr::new(ExprKind::Constant(ConstantValue::Int { value: 0, signed: false }), ty, loc));
    }

    let tok = parser.tokens.bump();
    match tok.kind {
        TokenKind::Identifier(h) => {
            if let Some(is_global) = parser.storage.lookup(h) {
                let ty = parser.vars.lookup(h).map(|v| v.ty).unwrap_or(parser.int_ty);
                if is_global {
                    return parser.arena.alloc(Expr::new(ExprKind::GlobalRef { name: h }, ty, loc));
                }
                let index = parser.vars.lookup_index(h).unwrap_or(0);
                return parser.arena.alloc(Expr::new(ExprKind::VariableRef { scope_index: index }, ty, loc));
            }
            parser.error("use of undeclared identifier", loc);
            parser.arena.alloc(Expr::new(ExprKind::Constant(ConstantValue::Int { value: 0, signed: true }), parser.int_ty, loc))
        }
        TokenKind::PpNumber(text) => parse_numeric_constant(parser, &text, loc),
        TokenKind::CharConstant { value, wide } => {
            let kind = if wide { IntegerKind::Int } else { IntegerKind::Char };
            let ty = parser.types.primitive(PrimitiveTag::integer(kind, true));
            parser.arena.alloc(Expr::new(ExprKind::Constant(ConstantValue::Int { value: value as i128, signed: true }), ty, loc))
        }
        TokenKind::StringLiteral { bytes, wide } => {
            let elem_kind = if wide { IntegerKind::Int } else { IntegerKind::Char };
            let elem = parser.types.primitive(PrimitiveTag::integer(elem_kind, !wide));
            let ty = parser.types.array(elem, ArraySize::Constant(bytes.len() as u64 + 1));
            let bytes = parser.arena.alloc_slice_copy(&bytes);
            parser.arena.alloc(Expr::new(ExprKind::StringLiteral { bytes }, ty, loc))
        }
        _ => {
            parser.error("expected expression", loc);
            parser.arena.alloc(Expr::new(ExprKind::Constant(ConstantValue::Int { value: 0, signed: true }), parser.int_ty, loc))
        }
    }
}

/// `_Generic(assignment-expression, generic-assoc-list)` (§1, §8 scenario
/// 6): picks the association whose type is `compatible()` with the
/// controlling expression's type, falling back to `default` when present.
/// Every association is parsed — so a syntax error in an unselected arm is
/// still caught — but only the selected expression is kept; the rest are
/// parsed and discarded, the same "parsed but not emitted" treatment a
/// compile-time-constant `if`'s dead arm gets in `stmt_parse`.
fn parse_generic_selection<'a>(parser: &mut Parser<'a>, loc: Location) -> &'a Expr<'a> {
    parser.expect_punct(Punct::LParen, "expected '(' after '_Generic'");
    let control = parse_assignment(parser);
    let mut selected: Option<&'a Expr<'a>> = None;
    let mut default_assoc: Option<&'a Expr<'a>> = None;
    let mut saw_default = false;

    while parser.bump_if_punct(Punct::Comma) {
        if parser.bump_if_keyword("default") {
            parser.expect_punct(Punct::Colon, "expected ':' after 'default'");
            let expr = parse_assignment(parser);
            if saw_default {
                parser.error("duplicate 'default' association in '_Generic'", loc);
            }
            saw_default = true;
            default_assoc = Some(expr);
            continue;
        }
        let spec = crate::types_parse::parse_decl_specs(parser);
        let (ty, _) = crate::decl::parse_declarator(parser, spec.base);
        parser.expect_punct(Punct::Colon, "expected ':' after type name in '_Generic' association");
        let expr = parse_assignment(parser);
        if selected.is_none() && compatible(control.ty, ty) {
            selected = Some(expr);
        }
    }
    parser.expect_punct(Punct::RParen, "expected ')' to close '_Generic'");

    match selected.or(default_assoc) {
        Some(expr) => expr,
        None => {
            parser.error("'_Generic' selector of type not compatible with any association and no 'default' association", loc);
            parser.arena.alloc(Expr::new(ExprKind::Constant(ConstantValue::Int { value: 0, signed: true }), parser.int_ty, loc))
        }
    }
}

/// Splits a pp-number's suffix from its digits and folds it into an integer
/// or floating constant, following §4.7's "first type that fits" rule for
/// an unsuffixed decimal integer constant (simplified: widens through
/// `int`/`long`/`long long` without xcc's separate octal/hex-only unsigned
/// step).
fn parse_numeric_constant<'a>(parser: &mut Parser<'a>, text: &str, loc: Location) -> &'a Expr<'a> {
    let lower = text.to_ascii_lowercase();
    let is_hex = lower.starts_with("0x");
    let has_dot = text.contains('.');
    let has_exponent = if is_hex { lower.contains('p') } else { lower.contains('e') };

    if has_dot || has_exponent {
        let mut end = text.len();
        let mut kind = FloatKind::Double;
        if lower.ends_with('f') {
            kind = FloatKind::Float;
            end -= 1;
        } else if lower.ends_with('l') {
            kind = FloatKind::LongDouble;
            end -= 1;
        }
        let value: f64 = text[..end].parse().unwrap_or_else(|_| {
            parser.error("invalid floating constant", loc);
            0.0
        });
        let ty = parser.types.primitive(PrimitiveTag::float(kind));
        return parser.arena.alloc(Expr::new(ExprKind::Constant(ConstantValue::Float(value)), ty, loc));
    }

    let mut end = text.len();
    let mut unsigned = false;
    let mut long_count = 0u32;
    while end > 0 {
        match text.as_bytes()[end - 1] {
            b'u' | b'U' => {
                unsigned = true;
                end -= 1;
            }
            b'l' | b'L' => {
                long_count += 1;
                end -= 1;
            }
            _ => break,
        }
    }
    let digits = &text[..end];
    let value: i128 = if is_hex {
        i128::from_str_radix(&digits[2..], 16).unwrap_or(0)
    } else if digits.len() > 1 && digits.as_bytes()[0] == b'0' {
        i128::from_str_radix(&digits[1..], 8).unwrap_or(0)
    } else {
        digits.parse().unwrap_or_else(|_| {
            parser.error("invalid integer constant", loc);
            0
        })
    };

    let mut kind = match long_count {
        0 => IntegerKind::Int,
        1 => IntegerKind::Long,
        _ => IntegerKind::LongLong,
    };
    let mut signed = !unsigned;
    loop {
        let bits = kind.bit_width();
        let fits =
            if signed { value >= -(1i128 << (bits - 1)) && value < (1i128 << (bits - 1)) } else { value >= 0 && value < (1i128 << bits) };
        if fits || kind == IntegerKind::LongLong {
            break;
        }
        kind = if kind == IntegerKind::Int { IntegerKind::Long } else { IntegerKind::LongLong };
    }
    if signed && value >= (1i128 << (kind.bit_width() - 1)) {
        // An unsuffixed decimal constant too large for any signed type
        // still fits the same-width unsigned type; a hex/octal constant
        // is allowed to do this per §4.7, a decimal one is technically a
        // constraint violation we don't currently diagnose separately.
        signed = false;
    }
    let ty = parser.types.primitive(PrimitiveTag::integer(kind, signed));
    parser.arena.alloc(Expr::new(ExprKind::Constant(ConstantValue::Int { value, signed }), ty, loc))
}

fn is_type_start_keyword(s: &str) -> bool {
    matches!(
        s,
        "void" | "char"
            | "short"
            | "int"
            | "long"
            | "float"
            | "double"
            | "signed"
            | "unsigned"
            | "_Bool"
            | "bool"
            | "_Complex"
            | "_Imaginary"
            | "__int128"
            | "_BitInt"
            | "typeof"
            | "__typeof__"
            | "struct"
            | "union"
            | "enum"
            | "const"
            | "volatile"
            | "restrict"
            | "__restrict"
            | "_Atomic"
            | "typedef"
            | "extern"
            | "static"
            | "_Thread_local"
            | "thread_local"
            | "auto"
            | "register"
            | "inline"
            | "_Noreturn"
            | "noreturn"
            | "_Alignas"
            | "alignas"
            | "__signed"
            | "__signed__"
    )
}

fn classify_ident_starts_type<'a>(parser: &Parser<'a>, handle: IdentHandle) -> bool {
    if parser.tokens.interner().is_keyword(handle) {
        return is_type_start_keyword(parser.resolve(handle));
    }
    parser.typedefs.lookup(handle).is_some()
}

/// Whether the token after an as-yet-unconsumed `(` can start a
/// `declaration-specifiers` — used to tell a cast from a parenthesized
/// expression without backtracking the whole grammar.
fn starts_type_name<'a>(parser: &mut Parser<'a>) -> bool {
    let handle = match parser.tokens.peek2().kind {
        TokenKind::Identifier(h) => h,
        _ => return false,
    };
    classify_ident_starts_type(parser, handle)
}

/// Same check as [`starts_type_name`], but for when the `(` has already
/// been consumed (`_Alignas(`'s operand, `typeof(`'s operand).
pub(crate) fn current_starts_type_name<'a>(parser: &mut Parser<'a>) -> bool {
    let handle = match parser.tokens.peek().kind {
        TokenKind::Identifier(h) => h,
        _ => return false,
    };
    classify_ident_starts_type(parser, handle)
}

/// `_Alignas(' type-name ')'` or `_Alignas(' constant-expression ')'`: the
/// caller has already consumed the `(`.
pub(crate) fn parse_alignas_operand<'a>(parser: &mut Parser<'a>) -> u32 {
    if current_starts_type_name(parser) {
        let spec = crate::types_parse::parse_decl_specs(parser);
        let (ty, _) = crate::decl::parse_declarator(parser, spec.base);
        return alignment_of(ty);
    }
    parse_constant_u32(parser)
}

fn alignment_of(ty: &Type) -> u32 {
    match ty {
        Type::Primitive(p) => {
            if p.align_log2() > 0 {
                1 << p.align_log2()
            } else {
                (p.bit_width() / 8).max(1)
            }
        }
        Type::Pointer(_) => 8,
        Type::Array(a) => alignment_of(a.element),
        _ => 8,
    }
}

/// Parses a `constant-expression` (grammatically a `conditional-expression`
/// — no assignment or comma at the top level) and folds it with the
/// constant evaluator, reporting a diagnostic and yielding `0` if it isn't
/// actually constant.
pub(crate) fn parse_constant_u32<'a>(parser: &mut Parser<'a>) -> u32 {
    let expr = parse_conditional(parser);
    fold_to_i128(parser, expr) as u32
}

pub(crate) fn parse_constant_i64<'a>(parser: &mut Parser<'a>) -> i64 {
    let expr = parse_conditional(parser);
    fold_to_i128(parser, expr) as i64
}

fn fold_to_i128<'a>(parser: &mut Parser<'a>, expr: &'a Expr<'a>) -> i128 {
    let loc = expr.loc;
    let result = {
        let mut evaluator = cc_eval::Evaluator::new(parser.diags());
        evaluator.eval(expr, &NoResolver)
    };
    match result {
        Ok(cc_eval::ConstValue::Int { value, .. }) => value,
        Ok(cc_eval::ConstValue::Float(f)) => f as i128,
        Ok(cc_eval::ConstValue::Address(_)) => {
            parser.error("address constant is not valid here; an integer constant expression is required", loc);
            0
        }
        Err(_) => {
            parser.error("expression is not an integer constant expression", loc);
            0
        }
    }
}

/// Inserts whatever `CastOp` turns `expr`'s type into `target`, or returns
/// `expr` unchanged when the types already agree or no conversion applies
/// (e.g. `void` targets, used when an expression-statement discards its
/// value).
pub(crate) fn convert<'a>(parser: &mut Parser<'a>, expr: &'a Expr<'a>, target: &'a Type<'a>) -> &'a Expr<'a> {
    let loc = expr.loc;
    convert_at(parser, expr, target, loc)
}

pub(crate) fn convert_at<'a>(parser: &mut Parser<'a>, expr: &'a Expr<'a>, target: &'a Type<'a>, loc: Location) -> &'a Expr<'a> {
    if type_equal(expr.ty, target) {
        return expr;
    }
    match cast_op_for(expr.ty, target) {
        Some(op) => parser.arena.alloc(Expr::new(ExprKind::Cast { op, operand: expr }, target, loc)),
        None => expr,
    }
}

fn cast_op_for(from: &Type, to: &Type) -> Option<CastOp> {
    match (from, to) {
        (Type::Primitive(f), Type::Primitive(t)) => {
            if f.is_integer() && t.is_integer() {
                if t.bit_width() < f.bit_width() {
                    Some(CastOp::Trunc)
                } else if t.bit_width() > f.bit_width() {
                    Some(if f.is_signed() { CastOp::SExt } else { CastOp::ZExt })
                } else {
                    None
                }
            } else if f.is_float() && t.is_integer() {
                Some(if t.is_signed() { CastOp::FpToSi } else { CastOp::FpToUi })
            } else if f.is_integer() && t.is_float() {
                Some(if f.is_signed() { CastOp::SiToFp } else { CastOp::UiToFp })
            } else if f.is_float() && t.is_float() {
                if t.bit_width() > f.bit_width() {
                    Some(CastOp::FpExt)
                } else if t.bit_width() < f.bit_width() {
                    Some(CastOp::FpTrunc)
                } else {
                    None
                }
            } else {
                None
            }
        }
        (Type::Pointer(_), Type::Primitive(t)) if t.is_integer() => Some(CastOp::PtrToInt),
        (Type::Primitive(f), Type::Pointer(_)) if f.is_integer() => Some(CastOp::IntToPtr),
        (Type::Pointer(_), Type::Pointer(_)) => Some(CastOp::Bitcast),
        (Type::Array(_), Type::Pointer(_)) => Some(CastOp::Bitcast),
        _ => None,
    }
}

/// Narrower-than-`int` integer types (and enums) promote to `int`;
/// everything else, including every floating type, passes through —
/// xcc's `Sema::integer_promote`, minus the "unsigned int" branch that
/// never triggers because no C integer rank below `int` has `int`'s width.
fn promote_int<'a>(parser: &mut Parser<'a>, ty: &'a Type<'a>) -> &'a Type<'a> {
    match ty {
        Type::Primitive(p) if p.is_integer() && p.bit_width() < 32 => parser.types.primitive(PrimitiveTag::integer(IntegerKind::Int, true)),
        Type::Enum(_) => parser.types.primitive(PrimitiveTag::integer(IntegerKind::Int, true)),
        _ => ty,
    }
}

/// The usual arithmetic conversions (§4.7): pointers short-circuit (the
/// caller is doing pointer arithmetic, not ordinary binary math), then
/// floats win over integers by width, then same-signedness picks the wider
/// type and different-signedness follows the standard's three-way rule.
fn usual_arith<'a>(parser: &mut Parser<'a>, lty: &'a Type<'a>, rty: &'a Type<'a>) -> &'a Type<'a> {
    if matches!(lty, Type::Pointer(_)) {
        return lty;
    }
    if matches!(rty, Type::Pointer(_)) {
        return rty;
    }
    let lty = promote_int(parser, lty);
    let rty = promote_int(parser, rty);
    let (Type::Primitive(lp), Type::Primitive(rp)) = (lty, rty) else {
        return lty;
    };

    if lp.is_float() || rp.is_float() {
        let kind = match (lp.is_float(), rp.is_float()) {
            (true, true) => {
                if lp.float_kind().bit_width() >= rp.float_kind().bit_width() {
                    lp.float_kind()
                } else {
                    rp.float_kind()
                }
            }
            (true, false) => lp.float_kind(),
            (false, true) => rp.float_kind(),
            (false, false) => unreachable!(),
        };
        return parser.types.primitive(PrimitiveTag::float(kind));
    }

    if lp.is_signed() == rp.is_signed() {
        return if lp.bit_width() >= rp.bit_width() { lty } else { rty };
    }
    let (signed_ty, signed_p, unsigned_ty, unsigned_p) = if lp.is_signed() { (lty, lp, rty, rp) } else { (rty, rp, lty, lp) };
    if unsigned_p.bit_width() >= signed_p.bit_width() {
        return unsigned_ty;
    }
    if signed_p.bit_width() > unsigned_p.bit_width() {
        return signed_ty;
    }
    parser.types.primitive(PrimitiveTag::integer(signed_p.integer_kind(), false))
}

/// Picks the representation-specific opcode for an abstract operator kind
/// over the already-computed common type.
fn binary_op_for(kind: BinaryOpKind, ty: &Type) -> BinaryOp {
    let is_float = matches!(ty, Type::Primitive(p) if p.is_float());
    let is_ptr = matches!(ty, Type::Pointer(_));
    let signed = match ty {
        Type::Primitive(p) => p.is_signed(),
        _ => true,
    };
    use BinaryOpKind::*;
    match kind {
        Add => {
            if is_ptr {
                BinaryOp::PtrAddInt
            } else if is_float {
                BinaryOp::AddF
            } else if signed {
                BinaryOp::AddS
            } else {
                BinaryOp::AddU
            }
        }
        Sub => {
            if is_ptr {
                BinaryOp::PtrSubInt
            } else if is_float {
                BinaryOp::SubF
            } else if signed {
                BinaryOp::SubS
            } else {
                BinaryOp::SubU
            }
        }
        Mul => {
            if is_float {
                BinaryOp::MulF
            } else if signed {
                BinaryOp::MulS
            } else {
                BinaryOp::MulU
            }
        }
        Div => {
            if is_float {
                BinaryOp::DivF
            } else if signed {
                BinaryOp::DivS
            } else {
                BinaryOp::DivU
            }
        }
        Rem => {
            if signed {
                BinaryOp::RemS
            } else {
                BinaryOp::RemU
            }
        }
        BitAnd => BinaryOp::BitAnd,
        BitOr => BinaryOp::BitOr,
        BitXor => BinaryOp::BitXor,
        Shl => BinaryOp::Shl,
        Shr => {
            if signed {
                BinaryOp::ShrS
            } else {
                BinaryOp::ShrU
            }
        }
        Eq => {
            if is_float {
                BinaryOp::CmpEqF
            } else {
                BinaryOp::CmpEqS
            }
        }
        Ne => {
            if is_float {
                BinaryOp::CmpNeF
            } else {
                BinaryOp::CmpNeS
            }
        }
        Lt => {
            if is_float {
                BinaryOp::CmpLtF
            } else if signed {
                BinaryOp::CmpLtS
            } else {
                BinaryOp::CmpLtU
            }
        }
        Le => {
            if is_float {
                BinaryOp::CmpLeF
            } else if signed {
                BinaryOp::CmpLeS
            } else {
                BinaryOp::CmpLeU
            }
        }
        Gt => {
            if is_float {
                BinaryOp::CmpGtF
            } else if signed {
                BinaryOp::CmpGtS
            } else {
                BinaryOp::CmpGtU
            }
        }
        Ge => {
            if is_float {
                BinaryOp::CmpGeF
            } else if signed {
                BinaryOp::CmpGeS
            } else {
                BinaryOp::CmpGeU
            }
        }
    }
}

/// Builds `control == value` for a `switch` case comparison, in `control`'s
/// own type (case constants are never wider than the controlling
/// expression once promoted).
pub(crate) fn build_case_eq<'a>(parser: &mut Parser<'a>, control: &'a Expr<'a>, value: i128, loc: Location) -> &'a Expr<'a> {
    let signed = match control.ty {
        Type::Primitive(p) => p.is_signed(),
        _ => true,
    };
    let const_expr = parser.arena.alloc(Expr::new(ExprKind::Constant(ConstantValue::Int { value, signed }), control.ty, loc));
    build_binary(parser, BinaryOpKind::Eq, control, const_expr, loc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_arena::Arena;
    use cc_common::DiagnosticEngine;
    use cc_lexer::Preprocessor;
    use cc_source::{CompilerOptions, SourceManager};

    fn parse_one_expr<'a>(arena: &'a Arena, mgr: &'a mut SourceManager, diags: &'a mut DiagnosticEngine, src: &'static str) -> &'a Expr<'a> {
        let mut interner = cc_arena::Interner::new(arena);
        mgr.add_main_string("t.c", src);
        let pp = Preprocessor::new(mgr, &mut interner, diags);
        let mut parser = Parser::new(arena, pp);
        parse_expr(&mut parser)
    }

    #[test]
    fn integer_addition_picks_signed_add() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let e = parse_one_expr(&arena, &mut mgr, &mut diags, "1 + 2");
        match &e.kind {
            ExprKind::Binary { op: BinaryOp::AddS, .. } => {}
            other => panic!("expected AddS, got {other:?}"),
        }
    }

    #[test]
    fn unsigned_suffix_is_respected() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let e = parse_one_expr(&arena, &mut mgr, &mut diags, "1u");
        match &e.ty {
            Type::Primitive(p) => assert!(!p.is_signed()),
            other => panic!("expected a primitive type, got {other:?}"),
        }
    }

    #[test]
    fn ternary_picks_the_wider_common_type() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let e = parse_one_expr(&arena, &mut mgr, &mut diags, "1 ? 1L : 2");
        match &e.ty {
            Type::Primitive(p) => assert_eq!(p.integer_kind(), IntegerKind::Long),
            other => panic!("expected long, got {other:?}"),
        }
    }

    #[test]
    fn generic_selection_picks_the_matching_association() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let e = parse_one_expr(&arena, &mut mgr, &mut diags, "_Generic((int)0, int: 1, long: 2, default: 3)");
        match &e.kind {
            ExprKind::Constant(ConstantValue::Int { value, .. }) => assert_eq!(*value, 1),
            other => panic!("expected the int association's constant, got {other:?}"),
        }
    }

    #[test]
    fn nullptr_has_nullptr_t_type() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let e = parse_one_expr(&arena, &mut mgr, &mut diags, "nullptr");
        match &e.ty {
            Type::Primitive(p) => assert_eq!(p.kind(), cc_types::PrimitiveKind::NullptrT),
            other => panic!("expected nullptr_t, got {other:?}"),
        }
    }

    #[test]
    fn nullptr_converts_to_a_pointer_type_via_an_int_to_ptr_cast() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let e = parse_one_expr(&arena, &mut mgr, &mut diags, "(int *)nullptr");
        match &e.kind {
            ExprKind::Cast { op: CastOp::IntToPtr, .. } => {}
            other => panic!("expected an IntToPtr cast, got {other:?}"),
        }
    }
}
