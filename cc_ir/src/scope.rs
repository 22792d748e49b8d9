//! Scope state (§3 "Scope state"): block scopes and tag scopes share the
//! same stack discipline over separate namespaces; label scope is flat and
//! per-function.

use cc_arena::IdentHandle;
use cc_common::Location;
use cc_types::Type;
use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct UsageFlags {
    pub used: bool,
    pub assigned: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct VarInfo<'a> {
    pub ty: &'a Type<'a>,
    pub loc: Location,
    pub constant_value: Option<i128>,
    pub usage: UsageFlags,
}

/// A stack of blocks, each an ordered list of `(handle, info)`. Lookup walks
/// from the innermost block outward, matching ordinary C block-scope
/// shadowing.
#[derive(Default)]
pub struct BlockScope<'a> {
    blocks: Vec<Vec<(IdentHandle, VarInfo<'a>)>>,
}

impl<'a> BlockScope<'a> {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn push_block(&mut self) {
        self.blocks.push(Vec::new());
    }

    pub fn pop_block(&mut self) -> Vec<(IdentHandle, VarInfo<'a>)> {
        self.blocks.pop().expect("pop_block without matching push_block")
    }

    /// Declare `name` in the innermost block, returning its scope index
    /// (used by `ExprKind::VariableRef`).
    pub fn declare(&mut self, name: IdentHandle, info: VarInfo<'a>) -> u32 {
        let block = self.blocks.last_mut().expect("declare with no open block");
        let index = block.len() as u32;
        block.push((name, info));
        index
    }

    /// Innermost-first lookup across the whole block stack.
    pub fn lookup(&self, name: IdentHandle) -> Option<&VarInfo<'a>> {
        for block in self.blocks.iter().rev() {
            if let Some((_, info)) = block.iter().rev().find(|(n, _)| *n == name) {
                return Some(info);
            }
        }
        None
    }

    /// The index `declare` returned for `name`'s innermost binding, for
    /// building an `ExprKind::VariableRef`.
    pub fn lookup_index(&self, name: IdentHandle) -> Option<u32> {
        for block in self.blocks.iter().rev() {
            if let Some(idx) = block.iter().rposition(|(n, _)| *n == name) {
                return Some(idx as u32);
            }
        }
        None
    }

    pub fn depth(&self) -> usize {
        self.blocks.len()
    }
}

/// Same stack discipline as [`BlockScope`], but for struct/union/enum tags
/// (a separate namespace from ordinary identifiers).
#[derive(Default)]
pub struct TagScope<'a> {
    blocks: Vec<Vec<(IdentHandle, &'a Type<'a>)>>,
}

impl<'a> TagScope<'a> {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn push_block(&mut self) {
        self.blocks.push(Vec::new());
    }

    pub fn pop_block(&mut self) -> Vec<(IdentHandle, &'a Type<'a>)> {
        self.blocks.pop().expect("pop_block without matching push_block")
    }

    pub fn declare(&mut self, tag: IdentHandle, ty: &'a Type<'a>) {
        self.blocks.last_mut().expect("declare with no open block").push((tag, ty));
    }

    pub fn lookup(&self, tag: IdentHandle) -> Option<&'a Type<'a>> {
        for block in self.blocks.iter().rev() {
            if let Some((_, ty)) = block.iter().rev().find(|(n, _)| *n == tag) {
                return Some(*ty);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelState {
    Undefined,
    ForwardReferenced,
    Declared,
    Ok,
}

#[derive(Debug, Clone, Copy)]
pub struct LabelEntry {
    pub label: crate::stmt::LabelId,
    pub state: LabelState,
}

/// Per-function flat map from identifier to label state, entered on the
/// function body's `{` and left on the matching `}`; unresolved forward
/// references are reported at close (§4.6).
#[derive(Default)]
pub struct LabelScope {
    labels: HashMap<IdentHandle, LabelEntry>,
}

impl LabelScope {
    pub fn new() -> Self {
        Self { labels: HashMap::new() }
    }

    pub fn entry(&mut self, name: IdentHandle, allocate: impl FnOnce() -> crate::stmt::LabelId) -> &mut LabelEntry {
        self.labels.entry(name).or_insert_with(|| LabelEntry { label: allocate(), state: LabelState::Undefined })
    }

    pub fn get(&self, name: IdentHandle) -> Option<&LabelEntry> {
        self.labels.get(&name)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = (&IdentHandle, &LabelEntry)> {
        self.labels.iter().filter(|(_, e)| e.state == LabelState::Undefined || e.state == LabelState::ForwardReferenced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_arena::{Arena, Interner};
    use cc_types::{PrimitiveTag, TypeTable};

    #[test]
    fn block_scope_shadowing_finds_innermost() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let mut types = TypeTable::new(&arena);
        let int_ty = types.primitive(PrimitiveTag::integer(cc_types::IntegerKind::Int, true));
        let name = interner.intern("x");

        let mut scope = BlockScope::new();
        scope.push_block();
        scope.declare(name, VarInfo { ty: int_ty, loc: Location::NONE, constant_value: None, usage: UsageFlags::default() });
        scope.push_block();
        scope.declare(name, VarInfo { ty: int_ty, loc: Location::NONE, constant_value: Some(5), usage: UsageFlags::default() });

        assert_eq!(scope.lookup(name).unwrap().constant_value, Some(5));
        scope.pop_block();
        assert_eq!(scope.lookup(name).unwrap().constant_value, None);
        scope.pop_block();
        assert!(scope.lookup(name).is_none());
    }

    /// Two scopes built from the same sequence of pushes/declares must pop
    /// identical snapshots; pretty_assertions spells out the offending
    /// `(handle, info)` entry instead of a bare `left != right`.
    #[test]
    fn popped_block_snapshot_is_stable_across_equivalent_builds() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let mut types = TypeTable::new(&arena);
        let int_ty = types.primitive(PrimitiveTag::integer(cc_types::IntegerKind::Int, true));
        let x = interner.intern("x");
        let y = interner.intern("y");

        let build = || {
            let mut scope = BlockScope::new();
            scope.push_block();
            scope.declare(x, VarInfo { ty: int_ty, loc: Location::NONE, constant_value: None, usage: UsageFlags::default() });
            scope.declare(y, VarInfo { ty: int_ty, loc: Location::NONE, constant_value: Some(7), usage: UsageFlags::default() });
            scope.pop_block()
        };
        let snapshot_a = build();
        let snapshot_b = build();
        pretty_assertions::assert_eq!(format!("{snapshot_a:?}"), format!("{snapshot_b:?}"));
    }

    #[test]
    fn label_scope_tracks_forward_references() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let name = interner.intern("done");
        let mut labels = LabelScope::new();
        let mut next = 0u32;
        {
            let entry = labels.entry(name, || {
                let id = crate::stmt::LabelId(next);
                next += 1;
                id
            });
            entry.state = LabelState::ForwardReferenced;
        }
        assert_eq!(labels.unresolved().count(), 1);
        labels.entry(name, || unreachable!()).state = LabelState::Ok;
        assert_eq!(labels.unresolved().count(), 0);
    }
}
