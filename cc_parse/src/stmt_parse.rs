//! Statement parsing (§4.8): each statement is emitted straight into the
//! current function's [`IrBuilder`] as it's recognized, the way xcc's
//! `Parser::stmt` drives its own `JumpBuilder` rather than building a
//! separate statement tree. `if`/`while`/`do`/`for` lower directly to
//! `CondBranch`/`Goto`/labels; `switch` collects its `case`/`default` labels
//! while the body is parsed and emits the dispatch comparison chain once the
//! whole body — and therefore every label — has been seen.

pub(crate) use cc_ir::LabelId;

use cc_arena::IdentHandle;
use cc_ir::{Expr, IrBuilder, LabelScope, Stmt, StmtKind, UsageFlags, VarInfo};
use cc_lexer::token::{Punct, TokenKind};
use cc_types::{Param, Type};

use crate::core::{FunctionContext, NoResolver, Parser, SwitchCtx};

/// A function's `{ ... }`, the declarator having already named it and
/// resolved its type. Parameters are bound in their own scope (6.2.1),
/// enclosing the compound statement's own block scope.
pub(crate) fn parse_function_body<'a>(parser: &mut Parser<'a>, name: IdentHandle, ty: &'a Type<'a>) {
    let Type::Function(fn_ty) = ty else {
        let loc = parser.loc();
        parser.error("function definition does not have a function type", loc);
        parser.recover_to_statement_boundary();
        return;
    };
    let return_type = fn_ty.return_type;
    let params: Vec<(Option<IdentHandle>, &'a Type<'a>)> = fn_ty.params.iter().map(|p: &Param<'a>| (p.name, p.ty)).collect();

    parser.func = Some(FunctionContext {
        builder: IrBuilder::new(parser.arena),
        labels: LabelScope::new(),
        return_type,
        name,
        break_targets: Vec::new(),
        continue_targets: Vec::new(),
        switch_stack: Vec::new(),
    });

    parser.push_scope();
    for (pname, pty) in params {
        if let Some(pname) = pname {
            let loc = parser.loc();
            parser.vars.declare(pname, VarInfo { ty: pty, loc, constant_value: None, usage: UsageFlags::default() });
            parser.storage.declare(pname, false);
        }
    }
    parse_compound_stmt(parser);
    parser.pop_scope();

    let func = parser.func.take().expect("parse_function_body always sets parser.func before parsing the body");
    for _unresolved_label in func.builder.finish_function(&func.labels) {
        let loc = parser.loc();
        parser.error("use of undeclared label", loc);
    }

    let body = func.builder.head();
    let loc = parser.loc();
    let stmt = parser.arena.alloc(Stmt::new(StmtKind::FunctionDef { name, ty, body: Some(body) }, loc));
    parser.items.push(stmt);
}

/// Borrows the current function's builder; every statement-parsing function
/// below only runs while `parser.func` is `Some`, so this never panics in
/// practice.
fn builder<'p, 'a>(parser: &'p Parser<'a>) -> &'p IrBuilder<'a> {
    &parser.func.as_ref().expect("statement parsing requires an active function body").builder
}

/// Probes whether `cond` is a compile-time-constant integer expression
/// (§4.6: a constant `if`/`while` condition suppresses its dead arm
/// entirely), without reporting it as an error when it isn't — most
/// conditions aren't constant, and that's not a diagnosable condition here.
fn fold_condition<'a>(parser: &mut Parser<'a>, cond: &'a Expr<'a>) -> Option<bool> {
    let mut evaluator = cc_eval::Evaluator::quiet(parser.diags());
    evaluator.eval(cond, &NoResolver).ok().map(|v| v.is_truthy())
}

/// Parses a statement so it's fully checked (syntax, scoping, types) but
/// contributes nothing to the emitted function body. Used for the arm a
/// compile-time-constant condition never takes (§4.6). Swaps in a scratch
/// `IrBuilder` for the duration so every statement kind is suppressed
/// uniformly — not just the ones that go through `insert_stmt`'s
/// reachability check, but `return`/`break`/`continue`/nested branches too
/// — then discards it and restores the real one.
///
/// A `goto` reaching *into* a dead arm from live code is not resolved
/// correctly by this (the label is recorded in the function's shared
/// `LabelScope` but the statement node that defines it lives in the
/// discarded scratch builder); jumping into code inside a provably-dead
/// branch is exotic enough not to be worth the bookkeeping here.
fn parse_suppressed_branch<'a>(parser: &mut Parser<'a>) {
    let scratch = IrBuilder::new(parser.arena);
    let Some(func) = parser.func.as_mut() else { return };
    let real = std::mem::replace(&mut func.builder, scratch);
    parse_statement(parser);
    if let Some(func) = parser.func.as_mut() {
        func.builder = real;
    }
}

fn push_loop<'a>(parser: &mut Parser<'a>, break_label: LabelId, continue_label: LabelId) {
    if let Some(func) = parser.func.as_mut() {
        func.break_targets.push(break_label);
        func.continue_targets.push(continue_label);
    }
}

fn pop_loop<'a>(parser: &mut Parser<'a>) {
    if let Some(func) = parser.func.as_mut() {
        func.break_targets.pop();
        func.continue_targets.pop();
    }
}

fn push_break_target<'a>(parser: &mut Parser<'a>, label: LabelId) {
    if let Some(func) = parser.func.as_mut() {
        func.break_targets.push(label);
    }
}

fn pop_break_target<'a>(parser: &mut Parser<'a>) {
    if let Some(func) = parser.func.as_mut() {
        func.break_targets.pop();
    }
}

fn define_label<'a>(parser: &mut Parser<'a>, name: IdentHandle) {
    let loc = parser.loc();
    if let Some(func) = parser.func.as_mut() {
        let entry = func.labels.entry(name, || func.builder.create_label());
        let label = entry.label;
        entry.state = cc_ir::LabelState::Declared;
        func.builder.insert_label(label, loc);
    }
}

fn parse_compound_stmt<'a>(parser: &mut Parser<'a>) {
    parser.expect_punct(Punct::LBrace, "expected '{'");
    parser.push_scope();
    while !parser.peek_is_punct(Punct::RBrace) && !matches!(parser.tokens.peek().kind, TokenKind::Eof) {
        parse_statement(parser);
    }
    parser.pop_scope();
    parser.expect_punct(Punct::RBrace, "expected '}' to close compound statement");
}

/// `statement`: dispatches on the leading keyword/punctuator, falling
/// through to a declaration or an expression-statement when none apply.
fn parse_statement<'a>(parser: &mut Parser<'a>) {
    if parser.peek_is_punct(Punct::LBrace) {
        parse_compound_stmt(parser);
        return;
    }
    if parser.bump_if_punct(Punct::Semicolon) {
        return;
    }
    if parser.bump_if_keyword("if") {
        parse_if(parser);
        return;
    }
    if parser.bump_if_keyword("while") {
        parse_while(parser);
        return;
    }
    if parser.bump_if_keyword("do") {
        parse_do_while(parser);
        return;
    }
    if parser.bump_if_keyword("for") {
        parse_for(parser);
        return;
    }
    if parser.bump_if_keyword("switch") {
        parse_switch(parser);
        return;
    }
    if parser.bump_if_keyword("return") {
        parse_return(parser);
        return;
    }
    if parser.bump_if_keyword("break") {
        parse_break(parser);
        return;
    }
    if parser.bump_if_keyword("continue") {
        parse_continue(parser);
        return;
    }
    if parser.bump_if_keyword("goto") {
        parse_goto(parser);
        return;
    }
    if parser.bump_if_keyword("case") {
        parse_case(parser);
        return;
    }
    if parser.bump_if_keyword("default") {
        parse_default(parser);
        return;
    }
    if let Some(name) = parser.peek_plain_ident() {
        if matches!(parser.tokens.peek2().kind, TokenKind::Punct(Punct::Colon)) {
            parser.tokens.bump();
            parser.tokens.bump();
            define_label(parser, name);
            parse_statement(parser);
            return;
        }
    }
    if crate::types_parse::at_decl_specifier_start(parser) {
        crate::decl::parse_external_declaration(parser);
        return;
    }
    parse_expression_statement(parser);
}

fn parse_expression_statement<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    let expr = crate::expr_parse::parse_expr(parser);
    parser.expect_punct(Punct::Semicolon, "expected ';' after expression statement");
    let unreachable = parser.func.as_ref().map(|f| !f.builder.is_reachable()).unwrap_or(false);
    if unreachable {
        parser.warn("unreachable code", loc);
    }
    if let Some(func) = parser.func.as_ref() {
        func.builder.insert_stmt(StmtKind::Expression { expr }, loc);
    }
}

fn parse_if<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    parser.expect_punct(Punct::LParen, "expected '(' after 'if'");
    let cond = crate::expr_parse::parse_expr(parser);
    parser.expect_punct(Punct::RParen, "expected ')' after if condition");

    match fold_condition(parser, cond) {
        Some(true) => {
            parse_statement(parser);
            if parser.bump_if_keyword("else") {
                parse_suppressed_branch(parser);
            }
        }
        Some(false) => {
            parse_suppressed_branch(parser);
            if parser.bump_if_keyword("else") {
                parse_statement(parser);
            }
        }
        None => {
            let then_label = builder(parser).create_label();
            let else_label = builder(parser).create_label();
            builder(parser).insert_condbr(cond, then_label, else_label, loc);
            builder(parser).insert_label(then_label, loc);
            parse_statement(parser);

            if parser.bump_if_keyword("else") {
                let end_label = builder(parser).create_label();
                builder(parser).insert_br(end_label, loc);
                builder(parser).insert_label(else_label, loc);
                parse_statement(parser);
                builder(parser).insert_label(end_label, loc);
            } else {
                builder(parser).insert_label(else_label, loc);
            }
        }
    }
}

fn parse_while<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    parser.expect_punct(Punct::LParen, "expected '(' after 'while'");
    let head_label = builder(parser).create_label();
    builder(parser).insert_label(head_label, loc);
    let cond = crate::expr_parse::parse_expr(parser);
    parser.expect_punct(Punct::RParen, "expected ')' after while condition");

    if fold_condition(parser, cond) == Some(false) {
        // The loop never runs at all; its body is still parsed (to catch
        // syntax/scope errors) but contributes nothing to the function.
        let end_label = builder(parser).create_label();
        push_loop(parser, end_label, head_label);
        parse_suppressed_branch(parser);
        pop_loop(parser);
        builder(parser).insert_label(end_label, loc);
        return;
    }

    let body_label = builder(parser).create_label();
    let end_label = builder(parser).create_label();
    builder(parser).insert_condbr(cond, body_label, end_label, loc);
    builder(parser).insert_label(body_label, loc);

    push_loop(parser, end_label, head_label);
    parse_statement(parser);
    pop_loop(parser);

    builder(parser).insert_br(head_label, loc);
    builder(parser).insert_label(end_label, loc);
}

fn parse_do_while<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    let body_label = builder(parser).create_label();
    let cond_label = builder(parser).create_label();
    let end_label = builder(parser).create_label();

    builder(parser).insert_label(body_label, loc);
    push_loop(parser, end_label, cond_label);
    parse_statement(parser);
    pop_loop(parser);

    if !parser.bump_if_keyword("while") {
        let loc = parser.loc();
        parser.error("expected 'while' after 'do' body", loc);
    }
    builder(parser).insert_label(cond_label, loc);
    parser.expect_punct(Punct::LParen, "expected '(' after 'while'");
    let cond = crate::expr_parse::parse_expr(parser);
    parser.expect_punct(Punct::RParen, "expected ')' after do/while condition");
    parser.expect_punct(Punct::Semicolon, "expected ';' after do/while statement");
    builder(parser).insert_condbr(cond, body_label, end_label, loc);
    builder(parser).insert_label(end_label, loc);
}

/// `for (init-clause; condition; step) body` — the step clause is parsed in
/// its written position but emitted *after* the body, so `continue` (which
/// jumps to `step_label`) runs it before re-testing the condition, matching
/// the standard pre-tested-loop-with-increment lowering.
fn parse_for<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    parser.expect_punct(Punct::LParen, "expected '(' after 'for'");
    parser.push_scope();

    if parser.bump_if_punct(Punct::Semicolon) {
        // empty init-clause
    } else if crate::types_parse::at_decl_specifier_start(parser) {
        crate::decl::parse_external_declaration(parser);
    } else {
        let init_loc = parser.loc();
        let e = crate::expr_parse::parse_expr(parser);
        if let Some(func) = parser.func.as_ref() {
            func.builder.insert_stmt(StmtKind::Expression { expr: e }, init_loc);
        }
        parser.expect_punct(Punct::Semicolon, "expected ';' after for-loop initializer");
    }

    let head_label = builder(parser).create_label();
    let body_label = builder(parser).create_label();
    let step_label = builder(parser).create_label();
    let end_label = builder(parser).create_label();

    builder(parser).insert_label(head_label, loc);
    if !parser.peek_is_punct(Punct::Semicolon) {
        let cond = crate::expr_parse::parse_expr(parser);
        builder(parser).insert_condbr(cond, body_label, end_label, loc);
    } else {
        builder(parser).insert_br(body_label, loc);
    }
    parser.expect_punct(Punct::Semicolon, "expected ';' after for-loop condition");

    let step_expr = if !parser.peek_is_punct(Punct::RParen) { Some(crate::expr_parse::parse_expr(parser)) } else { None };
    parser.expect_punct(Punct::RParen, "expected ')' after for-loop clauses");

    builder(parser).insert_label(body_label, loc);
    push_loop(parser, end_label, step_label);
    parse_statement(parser);
    pop_loop(parser);

    builder(parser).insert_label(step_label, loc);
    if let Some(e) = step_expr {
        if let Some(func) = parser.func.as_ref() {
            func.builder.insert_stmt(StmtKind::Expression { expr: e }, loc);
        }
    }
    builder(parser).insert_br(head_label, loc);
    builder(parser).insert_label(end_label, loc);
    parser.pop_scope();
}

/// `switch (expr) body`: jumps straight past the body to a dispatch chain of
/// equality comparisons built from whatever `case`/`default` labels the body
/// recorded into `func.switch_stack` as they were encountered. This covers
/// the overwhelmingly common shape where every `case`/`default` is a direct
/// (possibly deeply-nested-in-braces-only) label inside the switch body;
/// Duff's-device-style labels inside other statements' substructure are not
/// specially supported beyond that.
fn parse_switch<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    parser.expect_punct(Punct::LParen, "expected '(' after 'switch'");
    let control = crate::expr_parse::parse_expr(parser);
    parser.expect_punct(Punct::RParen, "expected ')' after switch expression");

    let dispatch_label = builder(parser).create_label();
    let end_label = builder(parser).create_label();
    builder(parser).insert_br(dispatch_label, loc);

    if let Some(func) = parser.func.as_mut() {
        func.switch_stack.push(SwitchCtx { cases: Vec::new(), default_label: None });
    }
    push_break_target(parser, end_label);
    parse_statement(parser);
    pop_break_target(parser);
    let (cases, default_label) =
        if let Some(func) = parser.func.as_mut() { func.switch_stack.pop().map(|c| (c.cases, c.default_label)).unwrap_or_default() } else { Default::default() };

    builder(parser).insert_br(end_label, loc);
    builder(parser).insert_label(dispatch_label, loc);
    for (value, label) in cases {
        let cmp = crate::expr_parse::build_case_eq(parser, control, value, loc);
        let next_test = builder(parser).create_label();
        builder(parser).insert_condbr(cmp, label, next_test, loc);
        builder(parser).insert_label(next_test, loc);
    }
    match default_label {
        Some(label) => {
            builder(parser).insert_br(label, loc);
        }
        None => {
            builder(parser).insert_br(end_label, loc);
        }
    }
    builder(parser).insert_label(end_label, loc);
}

fn parse_case<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    let value = crate::expr_parse::parse_constant_i64(parser) as i128;
    parser.expect_punct(Punct::Colon, "expected ':' after case value");
    let label = builder(parser).create_label();

    let in_switch = parser.func.as_ref().map(|f| !f.switch_stack.is_empty()).unwrap_or(false);
    if in_switch {
        if let Some(func) = parser.func.as_mut() {
            if let Some(ctx) = func.switch_stack.last_mut() {
                ctx.cases.push((value, label));
            }
        }
    } else {
        parser.error("'case' label not within a switch statement", loc);
    }

    builder(parser).insert_label(label, loc);
    parse_statement(parser);
}

fn parse_default<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    parser.expect_punct(Punct::Colon, "expected ':' after 'default'");
    let label = builder(parser).create_label();

    let in_switch = parser.func.as_ref().map(|f| !f.switch_stack.is_empty()).unwrap_or(false);
    if in_switch {
        if let Some(func) = parser.func.as_mut() {
            if let Some(ctx) = func.switch_stack.last_mut() {
                ctx.default_label = Some(label);
            }
        }
    } else {
        parser.error("'default' label not within a switch statement", loc);
    }

    builder(parser).insert_label(label, loc);
    parse_statement(parser);
}

fn parse_return<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    let value: Option<&'a Expr<'a>> = if parser.peek_is_punct(Punct::Semicolon) {
        None
    } else {
        let return_ty = parser.func.as_ref().map(|f| f.return_type);
        let e = crate::expr_parse::parse_expr(parser);
        Some(match return_ty {
            Some(ty) => crate::expr_parse::convert(parser, e, ty),
            None => e,
        })
    };
    parser.expect_punct(Punct::Semicolon, "expected ';' after return statement");
    if let Some(func) = parser.func.as_ref() {
        func.builder.insert_return(value, loc);
    }
}

fn parse_break<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    parser.expect_punct(Punct::Semicolon, "expected ';' after break");
    let target = parser.func.as_ref().and_then(|f| f.break_targets.last().copied());
    match target {
        Some(label) => {
            if let Some(func) = parser.func.as_ref() {
                func.builder.insert_br(label, loc);
            }
        }
        None => parser.error("'break' statement not in loop or switch statement", loc),
    }
}

fn parse_continue<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    parser.expect_punct(Punct::Semicolon, "expected ';' after continue");
    let target = parser.func.as_ref().and_then(|f| f.continue_targets.last().copied());
    match target {
        Some(label) => {
            if let Some(func) = parser.func.as_ref() {
                func.builder.insert_br(label, loc);
            }
        }
        None => parser.error("'continue' statement not in loop statement", loc),
    }
}

fn parse_goto<'a>(parser: &mut Parser<'a>) {
    let loc = parser.loc();
    let Some(name) = parser.peek_plain_ident() else {
        parser.error("expected label name after 'goto'", loc);
        parser.recover_to_statement_boundary();
        return;
    };
    parser.tokens.bump();
    parser.expect_punct(Punct::Semicolon, "expected ';' after goto");
    if let Some(func) = parser.func.as_mut() {
        let entry = func.labels.entry(name, || func.builder.create_label());
        let label = entry.label;
        if entry.state == cc_ir::LabelState::Undefined {
            entry.state = cc_ir::LabelState::ForwardReferenced;
        }
        func.builder.insert_br(label, loc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_arena::{Arena, Interner};
    use cc_common::DiagnosticEngine;
    use cc_ir::{ConstantValue, ExprKind};
    use cc_lexer::Preprocessor;
    use cc_source::{CompilerOptions, SourceManager};

    fn parse_one_function<'a>(arena: &'a Arena, mgr: &'a mut SourceManager, diags: &'a mut DiagnosticEngine, src: &'static str) -> &'a [&'a Stmt<'a>] {
        let mut interner = Interner::new(arena);
        mgr.add_main_string("t.c", src);
        let pp = Preprocessor::new(mgr, &mut interner, diags);
        let mut parser = Parser::new(arena, pp);
        parser.parse_translation_unit()
    }

    #[test]
    fn if_else_lowers_to_two_labels_and_a_condbr() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let items = parse_one_function(&arena, &mut mgr, &mut diags, "int f(int x) { if (x) { return 1; } else { return 0; } }");
        assert_eq!(items.len(), 1);
        match &items[0].kind {
            StmtKind::FunctionDef { body: Some(body), .. } => {
                let mut saw_condbr = false;
                let mut node = body.next.get();
                while let Some(s) = node {
                    if matches!(s.kind, StmtKind::CondBranch { .. }) {
                        saw_condbr = true;
                    }
                    node = s.next.get();
                }
                assert!(saw_condbr);
            }
            other => panic!("expected a function definition, got {other:?}"),
        }
    }

    #[test]
    fn while_loop_jumps_back_to_its_head() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let items = parse_one_function(&arena, &mut mgr, &mut diags, "int f(int x) { while (x) { x = x - 1; } return x; }");
        match &items[0].kind {
            StmtKind::FunctionDef { body: Some(body), .. } => {
                let mut gotos = 0;
                let mut node = body.next.get();
                while let Some(s) = node {
                    if matches!(s.kind, StmtKind::Goto { .. }) {
                        gotos += 1;
                    }
                    node = s.next.get();
                }
                assert_eq!(gotos, 1);
            }
            other => panic!("expected a function definition, got {other:?}"),
        }
    }

    #[test]
    fn goto_to_a_later_label_resolves_without_a_diagnostic() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let items = parse_one_function(&arena, &mut mgr, &mut diags, "int f(void) { goto done; return 1; done: return 0; }");
        assert_eq!(items.len(), 1);
        assert!(!diags.has_errors());
    }

    #[test]
    fn constant_false_if_elides_the_then_arm() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let items = parse_one_function(&arena, &mut mgr, &mut diags, "int f(void) { if (0) { return 1; } return 2; }");
        match &items[0].kind {
            StmtKind::FunctionDef { body: Some(body), .. } => {
                let mut returns = Vec::new();
                let mut node = body.next.get();
                while let Some(s) = node {
                    if let StmtKind::Return { value: Some(v) } = &s.kind {
                        if let ExprKind::Constant(ConstantValue::Int { value, .. }) = v.kind {
                            returns.push(value);
                        }
                    }
                    assert!(!matches!(s.kind, StmtKind::CondBranch { .. }));
                    node = s.next.get();
                }
                assert_eq!(returns, vec![2]);
            }
            other => panic!("expected a function definition, got {other:?}"),
        }
    }

    #[test]
    fn constant_false_while_still_parses_its_body_but_emits_no_backedge() {
        let arena = Arena::new();
        let mut mgr = SourceManager::new(CompilerOptions::default());
        let mut diags = DiagnosticEngine::new(None);
        let items = parse_one_function(&arena, &mut mgr, &mut diags, "int f(void) { while (0) { return 1; } return 2; }");
        match &items[0].kind {
            StmtKind::FunctionDef { body: Some(body), .. } => {
                let mut gotos = 0;
                let mut node = body.next.get();
                while let Some(s) = node {
                    if matches!(s.kind, StmtKind::Goto { .. }) {
                        gotos += 1;
                    }
                    node = s.next.get();
                }
                assert_eq!(gotos, 0);
            }
            other => panic!("expected a function definition, got {other:?}"),
        }
        assert!(!diags.has_errors());
    }
}
