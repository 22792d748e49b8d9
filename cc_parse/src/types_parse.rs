//! Declaration specifiers (§4.6): storage class, qualifiers, and the basic
//! type-specifier combination rules, ported from xcc's `merge_types()`
//! (`parser.cpp`) onto [`cc_types::PrimitiveTag`] instead of a bespoke
//! enum-of-combinations.

use cc_arena::IdentHandle;
use cc_types::tag::qual;
use cc_types::{BitIntType, FloatKind, IntegerKind, PrimitiveTag, Type};

use crate::core::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    None,
    Typedef,
    Extern,
    Static,
    ThreadLocal,
    Auto,
    Register,
}

/// Running tally of basic-type-specifier keywords seen so far, counted the
/// way `merge_types()` counts `l`/`s`/`f`/`d`/`i`/`c`/`v`/`su` before
/// resolving them into a single [`PrimitiveTag`].
#[derive(Default)]
struct BasicSpecTally {
    long: u32,
    short: u32,
    float: u32,
    double: u32,
    int: u32,
    char: u32,
    void: u32,
    bool_: u32,
    signed: u32,
    unsigned: u32,
    complex: u32,
    imaginary: u32,
    int128: u32,
    /// Set by `_BitInt(N)` (§1 C23): bypasses the rest of the tally
    /// entirely, since a bit-precise integer's width comes from a
    /// parenthesized constant expression rather than a combination of
    /// `long`/`short`/`char`/`int`.
    bitint_width: Option<u32>,
}

impl BasicSpecTally {
    fn total(&self) -> u32 {
        self.long + self.short + self.float + self.double + self.int + self.char + self.void + self.bool_ + self.int128
    }
}

/// The accumulated result of parsing a `declaration-specifiers` list: a
/// resolved base type plus the storage class and any `typedef`/tag bindings
/// made along the way.
pub struct DeclSpec<'a> {
    pub base: &'a Type<'a>,
    pub storage: StorageClass,
    pub inline: bool,
    pub noreturn: bool,
    pub align: Option<u32>,
}

/// Resolves a finished tally into a `PrimitiveTag`, following xcc's
/// `merge_types` priority order (double, then short, then long, then char,
/// then int) and rejecting combinations it rejects (too many `long`s,
/// `float` combined with anything else, etc).
fn resolve_basic_tag(parser: &mut Parser, tally: &BasicSpecTally, loc: cc_common::Location) -> PrimitiveTag {
    let su = tally.signed + tally.unsigned;
    let signed = tally.unsigned == 0;

    if su >= 2 {
        parser.error("cannot combine 'signed' and 'unsigned'", loc);
    }
    if tally.char > 1 {
        parser.error("duplicate 'char' declaration specifier", loc);
    }
    if tally.int > 1 {
        parser.error("duplicate 'int' declaration specifier", loc);
    }
    if tally.float > 0 && tally.total() > tally.float {
        parser.error("'float' cannot be combined with another type specifier", loc);
    }
    if tally.void > 0 && tally.total() > tally.void {
        parser.error("'void' cannot be combined with another type specifier", loc);
    }
    if tally.long >= 3 {
        parser.error("too many 'long's; 'long long' is the maximum", loc);
    }
    if tally.short >= 2 {
        parser.error("duplicate 'short' declaration specifier", loc);
    }
    if tally.double > 1 {
        parser.error("duplicate 'double' declaration specifier", loc);
    }

    let mut tag = if tally.bool_ > 0 {
        PrimitiveTag::integer(IntegerKind::Bool, false)
    } else if tally.double > 0 {
        if tally.long == 1 {
            PrimitiveTag::float(FloatKind::LongDouble)
        } else {
            if tally.long > 1 || tally.short > 0 || tally.char > 0 || tally.int > 0 {
                parser.error("invalid combination with 'double'", loc);
            }
            PrimitiveTag::float(FloatKind::Double)
        }
    } else if tally.float > 0 {
        PrimitiveTag::float(FloatKind::Float)
    } else if tally.int128 > 0 {
        if tally.int128 + su != tally.total() {
            parser.error("invalid combination with '__int128'", loc);
        }
        PrimitiveTag::integer(IntegerKind::Int128, signed)
    } else if tally.short > 0 {
        if tally.short + tally.int + su != tally.total() {
            parser.error("invalid combination with 'short'", loc);
        }
        PrimitiveTag::integer(IntegerKind::Short, signed)
    } else if tally.long > 0 {
        if tally.long + tally.int + su != tally.total() {
            parser.error("invalid combination with 'long'", loc);
        }
        let kind = if tally.long >= 2 { IntegerKind::LongLong } else { IntegerKind::Long };
        PrimitiveTag::integer(kind, signed)
    } else if tally.char > 0 {
        if tally.char + su != tally.total() {
            parser.error("invalid combination with 'char'", loc);
        }
        PrimitiveTag::integer(IntegerKind::Char, signed)
    } else if tally.void > 0 {
        PrimitiveTag::void()
    } else {
        // Bare `int`, bare `signed`/`unsigned`, or nothing at all (implicit
        // `int`, a pre-C23 extension xcc still accepts with a warning).
        if tally.total() == 0 && su == 0 {
            parser.warn("type specifier missing; defaults to 'int'", loc);
        }
        PrimitiveTag::integer(IntegerKind::Int, signed)
    };

    if tally.complex > 0 {
        if !tag.is_float() {
            parser.error("'_Complex' requires a floating-point type", loc);
        }
        tag = tag.with_qual(qual::COMPLEX);
    }
    if tally.imaginary > 0 {
        if !tag.is_float() {
            parser.error("'_Imaginary' requires a floating-point type", loc);
        }
        tag = tag.with_qual(qual::IMAGINARY);
    }
    tag
}

/// Parses a `declaration-specifiers` sequence: storage-class keywords,
/// qualifiers, `_Alignas`, and the basic/tag/typedef type specifiers, in
/// any order (as the grammar permits).
pub fn parse_decl_specs<'a>(parser: &mut Parser<'a>) -> DeclSpec<'a> {
    let mut tally = BasicSpecTally::default();
    let mut qualifiers: u64 = 0;
    let mut storage = StorageClass::None;
    let mut inline = false;
    let mut noreturn = false;
    let mut align = None;
    let mut tag_type: Option<&'a Type<'a>> = None;
    let mut typedef_type: Option<&'a Type<'a>> = None;
    let loc = parser.loc();

    loop {
        let Some(kw) = parser.peek_keyword() else { break };
        match kw {
            "typedef" => {
                storage = StorageClass::Typedef;
                parser.tokens.bump();
            }
            "extern" => {
                storage = StorageClass::Extern;
                parser.tokens.bump();
            }
            "static" => {
                storage = StorageClass::Static;
                parser.tokens.bump();
            }
            "_Thread_local" | "thread_local" => {
                storage = StorageClass::ThreadLocal;
                parser.tokens.bump();
            }
            "auto" => {
                storage = StorageClass::Auto;
                parser.tokens.bump();
            }
            "register" => {
                storage = StorageClass::Register;
                parser.tokens.bump();
            }
            "inline" => {
                inline = true;
                parser.tokens.bump();
            }
            "_Noreturn" | "noreturn" => {
                noreturn = true;
                parser.tokens.bump();
            }
            "const" => {
                qualifiers |= qual::CONST;
                parser.tokens.bump();
            }
            "volatile" => {
                qualifiers |= qual::VOLATILE;
                parser.tokens.bump();
            }
            "restrict" | "__restrict" => {
                qualifiers |= qual::RESTRICT;
                parser.tokens.bump();
            }
            "_Atomic" => {
                qualifiers |= qual::ATOMIC;
                parser.tokens.bump();
            }
            "_Alignas" | "alignas" => {
                parser.tokens.bump();
                parser.expect_punct(cc_lexer::token::Punct::LParen, "expected '(' after 'alignas'");
                // A full implementation evaluates either a type-name or a
                // constant-expression here; constant folding is handled by
                // `crate::expr_parse` once the operand grammar is wired up.
                align = Some(crate::expr_parse::parse_alignas_operand(parser));
                parser.expect_punct(cc_lexer::token::Punct::RParen, "expected ')'");
            }
            "long" => {
                tally.long += 1;
                parser.tokens.bump();
            }
            "short" => {
                tally.short += 1;
                parser.tokens.bump();
            }
            "float" => {
                tally.float += 1;
                parser.tokens.bump();
            }
            "double" => {
                tally.double += 1;
                parser.tokens.bump();
            }
            "int" => {
                tally.int += 1;
                parser.tokens.bump();
            }
            "char" => {
                tally.char += 1;
                parser.tokens.bump();
            }
            "void" => {
                tally.void += 1;
                parser.tokens.bump();
            }
            "_Bool" | "bool" => {
                tally.bool_ += 1;
                parser.tokens.bump();
            }
            "signed" | "__signed" | "__signed__" => {
                tally.signed += 1;
                parser.tokens.bump();
            }
            "unsigned" => {
                tally.unsigned += 1;
                parser.tokens.bump();
            }
            "_Complex" => {
                tally.complex += 1;
                parser.tokens.bump();
            }
            "_Imaginary" => {
                tally.imaginary += 1;
                parser.tokens.bump();
            }
            "__int128" => {
                tally.int128 += 1;
                parser.tokens.bump();
            }
            "_BitInt" => {
                parser.tokens.bump();
                parser.expect_punct(cc_lexer::token::Punct::LParen, "expected '(' after '_BitInt'");
                tally.bitint_width = Some(crate::expr_parse::parse_constant_u32(parser));
                parser.expect_punct(cc_lexer::token::Punct::RParen, "expected ')'");
            }
            "typeof" | "__typeof__" => {
                tag_type = Some(parse_typeof_specifier(parser));
            }
            "struct" | "union" => {
                tag_type = Some(parse_record_specifier(parser, kw == "struct"));
            }
            "enum" => {
                tag_type = Some(parse_enum_specifier(parser));
            }
            _ => {
                // Not a keyword this grammar recognizes as part of
                // `declaration-specifiers`; if it's a typedef name and we
                // haven't settled on a basic type yet, consume it as the
                // type specifier. Otherwise we're done.
                if tag_type.is_none() && typedef_type.is_none() && tally.total() == 0 {
                    if let Some(name) = parser.peek_plain_ident() {
                        if let Some(ty) = parser.typedefs.lookup(name) {
                            typedef_type = Some(ty);
                            parser.tokens.bump();
                            continue;
                        }
                    }
                }
                break;
            }
        }
    }

    let base = if let Some(ty) = tag_type.or(typedef_type) {
        ty
    } else if let Some(width) = tally.bitint_width {
        let signed = tally.unsigned == 0;
        let underlying = parser.types.primitive(PrimitiveTag::integer(IntegerKind::Int, signed));
        parser.arena.alloc(Type::BitInt(BitIntType { underlying, width }))
    } else {
        let tag = resolve_basic_tag(parser, &tally, loc).with_qual(qualifiers);
        parser.types.primitive(tag)
    };

    DeclSpec { base, storage, inline, noreturn, align }
}

/// `typeof-specifier` (§1 C23): `typeof(expression)` yields the expression's
/// already-resolved type; `typeof(type-name)` yields that type-name's type
/// directly. Either way the result replaces the whole basic-type-specifier
/// combination, the same as a `struct`/`union`/`enum` tag does.
fn parse_typeof_specifier<'a>(parser: &mut Parser<'a>) -> &'a Type<'a> {
    parser.tokens.bump(); // `typeof` / `__typeof__`
    parser.expect_punct(cc_lexer::token::Punct::LParen, "expected '(' after 'typeof'");
    let ty = if crate::expr_parse::current_starts_type_name(parser) {
        let spec = parse_decl_specs(parser);
        let (ty, _) = crate::decl::parse_declarator(parser, spec.base);
        ty
    } else {
        crate::expr_parse::parse_expr(parser).ty
    };
    parser.expect_punct(cc_lexer::token::Punct::RParen, "expected ')' to close 'typeof'");
    ty
}

/// `struct-or-union-specifier`: `struct foo { ... }`, `struct foo;`, or a
/// bare `struct foo` tag reference. Field layout (padding/size/alignment)
/// is left to a later lowering stage; this just records field order, name,
/// and type as xcc's own parser does before layout runs.
fn parse_record_specifier<'a>(parser: &mut Parser<'a>, is_struct: bool) -> &'a Type<'a> {
    use cc_types::{Field, RecordDef, RecordTagKind, RecordType, Type as CT};

    parser.tokens.bump(); // `struct` / `union`
    let tag_kind = if is_struct { RecordTagKind::Struct } else { RecordTagKind::Union };
    let name = parser.peek_plain_ident();
    if name.is_some() {
        parser.tokens.bump();
    }

    if !parser.bump_if_punct(cc_lexer::token::Punct::LBrace) {
        // Reference to a previously (or not yet) declared tag.
        if let Some(n) = name {
            if let Some(existing) = parser.tags.lookup(n) {
                return existing;
            }
        }
        let ty = parser.arena.alloc(CT::Record(RecordType { tag_kind, name, def: None }));
        if let Some(n) = name {
            parser.tags.declare(n, ty);
        }
        return ty;
    }

    let mut fields = Vec::new();
    while !parser.peek_is_punct(cc_lexer::token::Punct::RBrace) && !matches!(parser.tokens.peek().kind, cc_lexer::token::TokenKind::Eof) {
        let spec = parse_decl_specs(parser);
        loop {
            let (field_ty, field_name) = crate::decl::parse_declarator(parser, spec.base);
            let bit_width = if parser.bump_if_punct(cc_lexer::token::Punct::Colon) {
                Some(crate::expr_parse::parse_constant_u32(parser))
            } else {
                None
            };
            fields.push(Field { name: field_name, ty: field_ty, bit_width });
            if !parser.bump_if_punct(cc_lexer::token::Punct::Comma) {
                break;
            }
        }
        let semi_loc = parser.loc();
        if !parser.bump_if_punct(cc_lexer::token::Punct::Semicolon) {
            parser.error("expected ';' after struct member", semi_loc);
        }
    }
    parser.expect_punct(cc_lexer::token::Punct::RBrace, "expected '}' to close struct/union body");

    let def = parser.arena.alloc(RecordDef { fields });
    let ty = parser.arena.alloc(CT::Record(RecordType { tag_kind, name, def: Some(def) }));
    if let Some(n) = name {
        parser.tags.declare(n, ty);
    }
    ty
}

/// `enum-specifier`: evaluates each enumerator with the constant evaluator
/// (§4.7), defaulting to "previous value + 1" exactly as the standard
/// requires.
fn parse_enum_specifier<'a>(parser: &mut Parser<'a>) -> &'a Type<'a> {
    use cc_types::{EnumType, Type as CT};

    parser.tokens.bump(); // `enum`
    let name = parser.peek_plain_ident();
    if name.is_some() {
        parser.tokens.bump();
    }

    if !parser.bump_if_punct(cc_lexer::token::Punct::LBrace) {
        if let Some(n) = name {
            if let Some(existing) = parser.tags.lookup(n) {
                return existing;
            }
        }
        let ty = parser.arena.alloc(CT::Enum(EnumType { name, variants: None }));
        if let Some(n) = name {
            parser.tags.declare(n, ty);
        }
        return ty;
    }

    let mut variants: Vec<(IdentHandle, i64)> = Vec::new();
    let mut next_value: i64 = 0;
    while let Some(member) = parser.peek_plain_ident() {
        parser.tokens.bump();
        if parser.bump_if_punct(cc_lexer::token::Punct::Eq) {
            next_value = crate::expr_parse::parse_constant_i64(parser);
        }
        variants.push((member, next_value));
        next_value += 1;

        let int_ty = parser.int_ty;
        parser.vars.declare(
            member,
            cc_ir::VarInfo {
                ty: int_ty,
                loc: parser.loc(),
                constant_value: Some(next_value as i128 - 1),
                usage: cc_ir::UsageFlags::default(),
            },
        );
        parser.storage.declare(member, parser.at_file_scope());

        if !parser.bump_if_punct(cc_lexer::token::Punct::Comma) {
            break;
        }
    }
    parser.expect_punct(cc_lexer::token::Punct::RBrace, "expected '}' to close enum body");

    let variants = parser.arena.alloc_slice_fill_iter(variants);
    let ty = parser.arena.alloc(CT::Enum(EnumType { name, variants: Some(variants) }));
    if let Some(n) = name {
        parser.tags.declare(n, ty);
    }
    ty
}

/// Whether the *current* token can start a `declaration-specifiers`, used by
/// statement parsing to tell a declaration apart from an expression
/// statement without backtracking.
pub(crate) fn at_decl_specifier_start<'a>(parser: &mut Parser<'a>) -> bool {
    match parser.peek_keyword() {
        Some(kw) => matches!(
            kw,
            "typedef"
                | "extern"
                | "static"
                | "_Thread_local"
                | "thread_local"
                | "auto"
                | "register"
                | "inline"
                | "_Noreturn"
                | "noreturn"
                | "const"
                | "volatile"
                | "restrict"
                | "__restrict"
                | "_Atomic"
                | "_Alignas"
                | "alignas"
                | "long"
                | "short"
                | "float"
                | "double"
                | "int"
                | "char"
                | "void"
                | "_Bool"
                | "bool"
                | "signed"
                | "__signed"
                | "__signed__"
                | "unsigned"
                | "_Complex"
                | "_Imaginary"
                | "__int128"
                | "_BitInt"
                | "typeof"
                | "__typeof__"
                | "struct"
                | "union"
                | "enum"
        ),
        None => match parser.peek_plain_ident() {
            Some(name) => parser.typedefs.lookup(name).is_some(),
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_arena::{Arena, Interner};
    use cc_common::DiagnosticEngine;
    use cc_lexer::Preprocessor;
    use cc_source::{CompilerOptions, SourceManager};

    #[test]
    fn basic_tally_defaults_to_signed_int() {
        let tally = BasicSpecTally::default();
        assert_eq!(tally.total(), 0);
    }

    #[test]
    fn long_long_is_two_longs() {
        let mut tally = BasicSpecTally::default();
        tally.long = 2;
        assert_eq!(tally.total(), 2);
    }

    fn parse_one_decl_spec<'a>(arena: &'a Arena, mgr: &'a mut SourceManager, diags: &'a mut DiagnosticEngine, src: &'static str) -> DeclSpec<'a> {
        let mut interner = Interner::new(arena);
        mgr.add_main_string("t.c", src);
        let pp = Preprocessor::new(mgr, &mut interner, diags);
        let mut parser = Parser::new(arena, pp);
        parse_decl_specs(&mut parser)
    }

    #[test]
    fn complex_double_sets_the_complex_qualifier() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let spec = parse_one_decl_spec(&arena, &mut mgr, &mut diags, "_Complex double");
        match spec.base {
            Type::Primitive(p) => {
                assert!(p.has_qual(qual::COMPLEX));
                assert_eq!(p.float_kind(), FloatKind::Double);
            }
            other => panic!("expected a primitive double, got {other:?}"),
        }
    }

    #[test]
    fn plain_double_does_not_set_the_complex_qualifier() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let spec = parse_one_decl_spec(&arena, &mut mgr, &mut diags, "double");
        match spec.base {
            Type::Primitive(p) => assert!(!p.has_qual(qual::COMPLEX)),
            other => panic!("expected a primitive double, got {other:?}"),
        }
    }

    #[test]
    fn int128_resolves_to_the_128_bit_integer_kind() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let spec = parse_one_decl_spec(&arena, &mut mgr, &mut diags, "unsigned __int128");
        match spec.base {
            Type::Primitive(p) => {
                assert_eq!(p.integer_kind(), IntegerKind::Int128);
                assert!(!p.is_signed());
            }
            other => panic!("expected a primitive __int128, got {other:?}"),
        }
    }

    #[test]
    fn bitint_parses_its_width_operand() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let spec = parse_one_decl_spec(&arena, &mut mgr, &mut diags, "_BitInt(17)");
        match spec.base {
            Type::BitInt(b) => assert_eq!(b.width, 17),
            other => panic!("expected a bit-precise integer, got {other:?}"),
        }
    }

    #[test]
    fn typeof_resolves_to_the_operand_expressions_type() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let spec = parse_one_decl_spec(&arena, &mut mgr, &mut diags, "typeof(1L)");
        match spec.base {
            Type::Primitive(p) => assert_eq!(p.integer_kind(), IntegerKind::Long),
            other => panic!("expected a primitive long, got {other:?}"),
        }
    }

    #[test]
    fn typeof_of_a_type_name_resolves_to_that_type() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let spec = parse_one_decl_spec(&arena, &mut mgr, &mut diags, "typeof(unsigned int)");
        match spec.base {
            Type::Primitive(p) => {
                assert_eq!(p.integer_kind(), IntegerKind::Int);
                assert!(!p.is_signed());
            }
            other => panic!("expected a primitive unsigned int, got {other:?}"),
        }
    }
}
