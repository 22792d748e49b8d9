//! The IR builder (§4.8): appends statements to the current function's
//! chain, tracking the `sreachable` flag that drives the "unreachable
//! statement" warning and the unresolved-forward-label fix-up at function
//! close (§9: labels are integers, resolved by a fix-up pass, never
//! back-patched by pointer).

use std::cell::Cell;

use cc_arena::{Arena, IdentHandle};
use cc_common::Location;

use crate::expr::Expr;
use crate::scope::LabelScope;
use crate::stmt::{LabelId, Stmt, StmtKind};

pub struct IrBuilder<'a> {
    arena: &'a Arena,
    head: &'a Stmt<'a>,
    tail: Cell<&'a Stmt<'a>>,
    reachable: Cell<bool>,
    next_label: Cell<u32>,
}

impl<'a> IrBuilder<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        let head = arena.alloc(Stmt::new(StmtKind::HeadSentinel, Location::NONE));
        Self { arena, head, tail: Cell::new(head), reachable: Cell::new(true), next_label: Cell::new(0) }
    }

    pub fn head(&self) -> &'a Stmt<'a> {
        self.head
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.get()
    }

    fn append(&self, kind: StmtKind<'a>, loc: Location) -> &'a Stmt<'a> {
        let node = self.arena.alloc(Stmt::new(kind, loc));
        self.tail.get().next.set(Some(node));
        self.tail.set(node);
        node
    }

    /// Append `kind` after the current insertion point. If the point is
    /// unreachable, the statement is dropped unless it has no observable
    /// target omitted entirely here: callers that need unreachable-but-kept
    /// statements (e.g. a declaration whose storage must still exist) call
    /// [`IrBuilder::force_insert`] instead.
    pub fn insert_stmt(&self, kind: StmtKind<'a>, loc: Location) -> Option<&'a Stmt<'a>> {
        if !self.reachable.get() {
            return None;
        }
        Some(self.append(kind, loc))
    }

    pub fn force_insert(&self, kind: StmtKind<'a>, loc: Location) -> &'a Stmt<'a> {
        self.append(kind, loc)
    }

    /// Mark `label` as defined at the current position; makes the
    /// insertion point reachable again regardless of its prior state.
    pub fn insert_label(&self, label: LabelId, loc: Location) -> &'a Stmt<'a> {
        let marker = self.arena.alloc(Stmt::new(StmtKind::Compound { body: None }, loc));
        let node = self.append(StmtKind::Labeled { label, inner: marker }, loc);
        self.reachable.set(true);
        node
    }

    pub fn insert_br(&self, target: LabelId, loc: Location) -> &'a Stmt<'a> {
        let node = self.append(StmtKind::Goto { target }, loc);
        self.reachable.set(false);
        node
    }

    pub fn insert_condbr(&self, test: &'a Expr<'a>, true_label: LabelId, false_label: LabelId, loc: Location) -> &'a Stmt<'a> {
        let node = self.append(StmtKind::CondBranch { test, true_label, false_label }, loc);
        self.reachable.set(false);
        node
    }

    pub fn insert_return(&self, value: Option<&'a Expr<'a>>, loc: Location) -> &'a Stmt<'a> {
        let node = self.append(StmtKind::Return { value }, loc);
        self.reachable.set(false);
        node
    }

    /// Allocate a fresh label index, scoped to the function currently being
    /// built.
    pub fn create_label(&self) -> LabelId {
        let id = self.next_label.get();
        self.next_label.set(id + 1);
        LabelId(id)
    }

    /// Resolve forward label references at function close. Returns the
    /// names of labels still undefined.
    pub fn finish_function(&self, labels: &LabelScope) -> Vec<IdentHandle> {
        labels
            .unresolved()
            .map(|(name, _)| *name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condbr_makes_insertion_point_unreachable() {
        let arena = Arena::new();
        let builder = IrBuilder::new(&arena);
        let cond_ty = arena.alloc(cc_types::Type::Primitive(cc_types::PrimitiveTag::integer(cc_types::IntegerKind::Int, true)));
        let test_expr = arena.alloc(Expr::new(crate::expr::ExprKind::Constant(crate::expr::ConstantValue::Int { value: 1, signed: true }), cond_ty, Location::NONE));
        let t = builder.create_label();
        let f = builder.create_label();
        builder.insert_condbr(test_expr, t, f, Location::NONE);
        assert!(!builder.is_reachable());
        assert!(builder.insert_stmt(StmtKind::HeadSentinel, Location::NONE).is_none());
    }

    #[test]
    fn label_restores_reachability() {
        let arena = Arena::new();
        let builder = IrBuilder::new(&arena);
        builder.insert_br(LabelId(0), Location::NONE);
        assert!(!builder.is_reachable());
        builder.insert_label(LabelId(0), Location::NONE);
        assert!(builder.is_reachable());
    }

    #[test]
    fn statements_chain_in_order() {
        let arena = Arena::new();
        let builder = IrBuilder::new(&arena);
        let ty = arena.alloc(cc_types::Type::Primitive(cc_types::PrimitiveTag::void()));
        let a = builder.insert_stmt(StmtKind::DeclarationOnly { ty }, Location::NONE).unwrap();
        let b = builder.insert_stmt(StmtKind::DeclarationOnly { ty }, Location::NONE).unwrap();
        assert!(std::ptr::eq(builder.head().next.get().unwrap(), a));
        assert!(std::ptr::eq(a.next.get().unwrap(), b));
    }
}
