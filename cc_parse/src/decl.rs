//! Declarators (§4.6): pointer chains, array/function suffixes, and the
//! external-declaration dispatch (a global variable, a prototype, or a
//! function definition, distinguished by what follows the declarator).

use cc_arena::IdentHandle;
use cc_common::Location;
use cc_ir::{Designator, InitializerElement, StmtKind, UsageFlags, VarDeclEntry, VarInfo};
use cc_lexer::token::{Punct, TokenKind};
use cc_types::{ArraySize, Param, RecordDef, RecordTagKind, Type};

use crate::core::Parser;
use crate::types_parse::{parse_decl_specs, StorageClass};

/// How a declarator transforms whatever type the enclosing context hands
/// it into the final type — built inside-out as the grammar is recognized,
/// then applied once the base specifier type is known. This is the
/// standard technique for parenthesized declarators (`int (*f)(int)`),
/// where what's "inside" the parens must wrap *around* the suffixes that
/// appear *outside* them.
type Build<'a> = Box<dyn FnOnce(&mut Parser<'a>, &'a Type<'a>) -> &'a Type<'a>>;

fn identity_build<'a>() -> Build<'a> {
    Box::new(|_parser, ty| ty)
}

/// `pointer? direct-declarator`. Returns the completed type and the
/// identifier named, if any (absent for an abstract declarator, e.g. inside
/// a cast or `sizeof`).
pub(crate) fn parse_declarator<'a>(parser: &mut Parser<'a>, base: &'a Type<'a>) -> (&'a Type<'a>, Option<IdentHandle>) {
    let (name, build) = parse_declarator_build(parser);
    (build(parser, base), name)
}

fn parse_declarator_build<'a>(parser: &mut Parser<'a>) -> (Option<IdentHandle>, Build<'a>) {
    let ptr_build = parse_pointer_chain(parser);
    let (name, direct_build) = parse_direct_declarator_build(parser);
    let build: Build<'a> = Box::new(move |parser, base| {
        let pointee = ptr_build(parser, base);
        direct_build(parser, pointee)
    });
    (name, build)
}

fn parse_pointer_chain<'a>(parser: &mut Parser<'a>) -> Build<'a> {
    if !parser.peek_is_punct(Punct::Star) {
        return identity_build();
    }
    parser.tokens.bump();
    let mut qualifiers = 0u64;
    loop {
        match parser.peek_keyword() {
            Some("const") => {
                qualifiers |= cc_types::tag::qual::CONST;
                parser.tokens.bump();
            }
            Some("volatile") => {
                qualifiers |= cc_types::tag::qual::VOLATILE;
                parser.tokens.bump();
            }
            Some("restrict") | Some("__restrict") => {
                qualifiers |= cc_types::tag::qual::RESTRICT;
                parser.tokens.bump();
            }
            _ => break,
        }
    }
    let rest = parse_pointer_chain(parser);
    Box::new(move |parser, base| {
        let pointee = rest(parser, base);
        parser.types.pointer(pointee, qualifiers)
    })
}

fn parse_direct_declarator_build<'a>(parser: &mut Parser<'a>) -> (Option<IdentHandle>, Build<'a>) {
    if parser.bump_if_punct(Punct::LParen) {
        let (name, inner_build) = parse_declarator_build(parser);
        parser.expect_punct(Punct::RParen, "expected ')' to close declarator");
        let suffix_build = parse_declarator_suffixes_build(parser);
        let build: Build<'a> = Box::new(move |parser, base| {
            let wrapped = suffix_build(parser, base);
            inner_build(parser, wrapped)
        });
        return (name, build);
    }
    let name = if let Some(n) = parser.peek_plain_ident() {
        parser.tokens.bump();
        Some(n)
    } else {
        None
    };
    (name, parse_declarator_suffixes_build(parser))
}

/// Array and function suffixes, applied left to right the way C's grammar
/// builds the type "outside in": `int a[3][4]` is an array of 3 arrays of 4
/// ints.
fn parse_declarator_suffixes_build<'a>(parser: &mut Parser<'a>) -> Build<'a> {
    if parser.bump_if_punct(Punct::LBracket) {
        let size = if parser.peek_is_punct(Punct::RBracket) {
            ArraySize::Unsized
        } else {
            ArraySize::Constant(crate::expr_parse::parse_constant_u32(parser) as u64)
        };
        parser.expect_punct(Punct::RBracket, "expected ']'");
        let rest = parse_declarator_suffixes_build(parser);
        return Box::new(move |parser, base| {
            let element = rest(parser, base);
            parser.types.array(element, size)
        });
    }
    if parser.bump_if_punct(Punct::LParen) {
        let mut params = Vec::new();
        let mut variadic = false;
        if !parser.peek_is_punct(Punct::RParen) {
            loop {
                if parser.peek_keyword() == Some("void") && matches!(parser.tokens.peek2().kind, TokenKind::Punct(Punct::RParen)) {
                    parser.tokens.bump();
                    break;
                }
                if parser.bump_if_punct(Punct::Ellipsis) {
                    variadic = true;
                    break;
                }
                let spec = parse_decl_specs(parser);
                let (param_ty, param_name) = parse_declarator(parser, spec.base);
                params.push(Param { name: param_name, ty: param_ty });
                if !parser.bump_if_punct(Punct::Comma) {
                    break;
                }
            }
        }
        parser.expect_punct(Punct::RParen, "expected ')' to close parameter list");
        let rest = parse_declarator_suffixes_build(parser);
        return Box::new(move |parser, base| {
            let return_type = rest(parser, base);
            let params = parser.arena.alloc_slice_fill_iter(params);
            parser.types.function(return_type, params, variadic)
        });
    }
    identity_build()
}

/// Parses one external declaration: either a function definition (a
/// declarator followed by `{`) or one or more declarators with optional
/// initializers, ended by `;`.
pub(crate) fn parse_external_declaration<'a>(parser: &mut Parser<'a>) {
    if parser.peek_is_punct(Punct::Semicolon) {
        parser.tokens.bump();
        return;
    }

    let spec = parse_decl_specs(parser);
    if parser.bump_if_punct(Punct::Semicolon) {
        // A bare `struct foo { ... };` with no declarator: the tag
        // declaration is the whole point, nothing further to do.
        return;
    }

    let (ty, name) = parse_declarator(parser, spec.base);
    let Some(name) = name else {
        let loc = parser.loc();
        parser.error("expected a declarator name", loc);
        parser.recover_to_statement_boundary();
        return;
    };

    if spec.storage == StorageClass::Typedef {
        parser.typedefs.declare(name, ty);
        finish_declarator_list(parser, spec.base, spec.storage);
        return;
    }

    if ty.is_function() && parser.peek_is_punct(Punct::LBrace) {
        // Bind the name before parsing the body so a recursive call inside
        // it resolves, matching the scope rules for any other declarator.
        let loc = parser.loc();
        parser.vars.declare(name, VarInfo { ty, loc, constant_value: None, usage: UsageFlags::default() });
        parser.storage.declare(name, true);
        crate::stmt_parse::parse_function_body(parser, name, ty);
        return;
    }

    let init = parse_optional_initializer(parser, ty);
    register_declarator(parser, name, ty, spec.storage, init);
    finish_declarator_list(parser, spec.base, spec.storage);
}

/// After the first declarator in a `declaration-specifiers init-declarator-list`
/// has been consumed (possibly as a typedef or a plain declaration), handle
/// any further comma-separated declarators sharing the same specifiers.
fn finish_declarator_list<'a>(parser: &mut Parser<'a>, base: &'a Type<'a>, storage: StorageClass) {
    while parser.bump_if_punct(Punct::Comma) {
        let (ty, name) = parse_declarator(parser, base);
        if let Some(name) = name {
            if storage == StorageClass::Typedef {
                parser.typedefs.declare(name, ty);
            } else {
                let init = parse_optional_initializer(parser, ty);
                register_declarator(parser, name, ty, storage, init);
            }
        }
    }
    let loc = parser.loc();
    if !parser.bump_if_punct(Punct::Semicolon) {
        parser.error("expected ';' after declaration", loc);
        parser.recover_to_statement_boundary();
    }
}

/// `= initializer`, if present. An `initializer` is either an
/// assignment-expression or a (possibly nested) brace-enclosed,
/// comma-separated list of initializers; C99 designated initializers
/// (`[2] = x`, `.field = y`) are recognized but their semantic
/// cross-checking against the target type is left to a later pass.
fn parse_optional_initializer<'a>(parser: &mut Parser<'a>, ty: &'a Type<'a>) -> Option<&'a cc_ir::Expr<'a>> {
    if !parser.bump_if_punct(Punct::Eq) {
        return None;
    }
    Some(parse_initializer(parser, ty))
}

fn parse_initializer<'a>(parser: &mut Parser<'a>, ty: &'a Type<'a>) -> &'a cc_ir::Expr<'a> {
    if !parser.peek_is_punct(Punct::LBrace) {
        return crate::expr_parse::parse_assignment(parser);
    }
    parser.tokens.bump();
    let loc = parser.loc();
    let mut raw: Vec<(Vec<Designator>, &'a cc_ir::Expr<'a>)> = Vec::new();
    while !parser.peek_is_punct(Punct::RBrace) && !matches!(parser.tokens.peek().kind, TokenKind::Eof) {
        let mut designators = Vec::new();
        loop {
            if parser.bump_if_punct(Punct::LBracket) {
                let idx = crate::expr_parse::parse_constant_u32(parser);
                parser.expect_punct(Punct::RBracket, "expected ']'");
                designators.push(Designator::Index(idx as u64));
            } else if parser.bump_if_punct(Punct::Dot) {
                if let Some(field) = parser.peek_plain_ident() {
                    parser.tokens.bump();
                    designators.push(Designator::Field(field));
                }
            } else {
                break;
            }
        }
        if !designators.is_empty() {
            parser.expect_punct(Punct::Eq, "expected '=' after designator");
        }
        let value = parse_initializer(parser, ty);
        raw.push((designators, value));
        if !parser.bump_if_punct(Punct::Comma) {
            break;
        }
    }
    parser.expect_punct(Punct::RBrace, "expected '}' to close initializer list");

    let elements = match ty {
        Type::Record(rec) if rec.tag_kind == RecordTagKind::Struct => match rec.def {
            Some(def) => normalize_struct_initializer(parser, def, raw, loc),
            None => raw_to_elements(parser, raw),
        },
        _ => raw_to_elements(parser, raw),
    };
    let elements = parser.arena.alloc_slice_fill_iter(elements);
    parser.arena.alloc(cc_ir::Expr::new(cc_ir::ExprKind::InitializerList { elements }, ty, loc))
}

/// Source-order elements with no reordering, for aggregates this pass
/// doesn't normalize (unions, arrays, incomplete records): designators are
/// kept as parsed.
fn raw_to_elements<'a>(parser: &mut Parser<'a>, raw: Vec<(Vec<Designator>, &'a cc_ir::Expr<'a>)>) -> Vec<InitializerElement<'a>> {
    raw.into_iter()
        .map(|(designators, value)| InitializerElement { designators: parser.arena.alloc_slice_fill_iter(designators), value })
        .collect()
}

/// Reorders a struct's braced initializer into declaration order and
/// zero-fills any field no source element touched (§8 scenario 4: `{ .b =
/// 2, .a = 1 }` on `struct S { int a, b, c; }` must emit `a=1, b=2, c=0` in
/// that field order, not source order). A `.field` designator moves the
/// "current field" cursor to that field; an undesignated element fills
/// whichever field follows the previous one, matching C's designated-
/// initializer cursor rule.
fn normalize_struct_initializer<'a>(
    parser: &mut Parser<'a>,
    def: &'a RecordDef<'a>,
    raw: Vec<(Vec<Designator>, &'a cc_ir::Expr<'a>)>,
    loc: Location,
) -> Vec<InitializerElement<'a>> {
    let mut slots: Vec<Option<&'a cc_ir::Expr<'a>>> = vec![None; def.fields.len()];
    let mut cursor = 0usize;
    for (designators, value) in raw {
        let mut idx = cursor;
        for d in &designators {
            if let Designator::Field(name) = d {
                match def.fields.iter().position(|f| f.name == Some(*name)) {
                    Some(found) => idx = found,
                    None => parser.error("field designator does not name a member of this type", loc),
                }
            }
        }
        if idx < slots.len() {
            slots[idx] = Some(value);
        }
        cursor = idx + 1;
    }
    slots
        .into_iter()
        .zip(def.fields.iter())
        .map(|(value, field)| {
            let value = value.unwrap_or_else(|| zero_initializer_value(parser, field.ty, loc));
            InitializerElement { designators: &[], value }
        })
        .collect()
}

/// A zero value for a field no initializer element targets: `0`/`0.0` for
/// scalars, a recursively all-zero `InitializerList` for a nested struct
/// with a known definition, otherwise an integer `0` sentinel (covers
/// pointers, enums, bit-fields, and any type this pass doesn't recurse
/// into further).
fn zero_initializer_value<'a>(parser: &mut Parser<'a>, ty: &'a Type<'a>, loc: Location) -> &'a cc_ir::Expr<'a> {
    if let Type::Primitive(p) = ty {
        if p.is_float() {
            return parser.arena.alloc(cc_ir::Expr::new(cc_ir::ExprKind::Constant(cc_ir::ConstantValue::Float(0.0)), ty, loc));
        }
    }
    if let Type::Record(rec) = ty {
        if rec.tag_kind == RecordTagKind::Struct {
            if let Some(def) = rec.def {
                let elements: Vec<InitializerElement<'a>> = def
                    .fields
                    .iter()
                    .map(|field| InitializerElement { designators: &[], value: zero_initializer_value(parser, field.ty, loc) })
                    .collect();
                let elements = parser.arena.alloc_slice_fill_iter(elements);
                return parser.arena.alloc(cc_ir::Expr::new(cc_ir::ExprKind::InitializerList { elements }, ty, loc));
            }
        }
    }
    parser.arena.alloc(cc_ir::Expr::new(cc_ir::ExprKind::Constant(cc_ir::ConstantValue::Int { value: 0, signed: true }), ty, loc))
}

/// Binds `name` in the variable scope and emits a `VarDecl` IR node when
/// we're inside a function body (file-scope declarations are recorded for
/// the symbol table only; they have no executable position).
pub(crate) fn register_declarator<'a>(
    parser: &mut Parser<'a>,
    name: IdentHandle,
    ty: &'a Type<'a>,
    storage: StorageClass,
    initializer: Option<&'a cc_ir::Expr<'a>>,
) {
    let loc = parser.loc();
    let is_global = parser.at_file_scope() || matches!(storage, StorageClass::Static | StorageClass::Extern | StorageClass::ThreadLocal);
    parser.vars.declare(name, VarInfo { ty, loc, constant_value: None, usage: Default::default() });
    parser.storage.declare(name, is_global);

    if let Some(func) = parser.func.as_mut() {
        let entry = VarDeclEntry { name, ty, initializer };
        let entries = parser.arena.alloc_slice_fill_iter(std::iter::once(entry));
        func.builder.insert_stmt(StmtKind::VarDecl { entries }, loc);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn smoke() {
        // Declarator parsing is exercised end to end in `stmt_parse`'s
        // tests, which drive a full `Parser` over small translation units.
    }
}
