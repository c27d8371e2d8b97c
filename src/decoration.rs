//! Tree decoration side-table.
//!
//! Each pass augments a sparse per-node record keyed by [`NodeId`] instead of
//! mutating the (otherwise read-only) parse tree. Fields are write-once in
//! practice: a later pass never overwrites a field an earlier pass set. In
//! debug builds, setters assert that invariant rather than silently
//! clobbering it.

use std::collections::HashMap;

use crate::ast::NodeId;
use crate::ir::InstructionList;
use crate::symtab::ScopeId;
use crate::types::TypeId;

#[derive(Debug, Default, Clone)]
pub struct NodeDecoration {
    pub scope: Option<ScopeId>,
    pub ty: Option<TypeId>,
    pub is_lvalue: Option<bool>,
    pub addr: Option<String>,
    pub offset: Option<String>,
    pub code: Option<InstructionList>,
}

#[derive(Debug, Default)]
pub struct TreeDecoration {
    entries: HashMap<NodeId, NodeDecoration>,
}

impl TreeDecoration {
    pub fn new() -> Self {
        TreeDecoration::default()
    }

    fn slot(&mut self, node: NodeId) -> &mut NodeDecoration {
        self.entries.entry(node).or_default()
    }

    pub fn set_scope(&mut self, node: NodeId, scope: ScopeId) {
        let slot = self.slot(node);
        debug_assert!(slot.scope.is_none(), "scope decoration written twice for {node:?}");
        slot.scope = Some(scope);
    }

    pub fn scope(&self, node: NodeId) -> Option<ScopeId> {
        self.entries.get(&node).and_then(|d| d.scope)
    }

    pub fn set_type(&mut self, node: NodeId, ty: TypeId) {
        let slot = self.slot(node);
        debug_assert!(slot.ty.is_none(), "type decoration written twice for {node:?}");
        slot.ty = Some(ty);
    }

    pub fn ty(&self, node: NodeId) -> Option<TypeId> {
        self.entries.get(&node).and_then(|d| d.ty)
    }

    pub fn set_lvalue(&mut self, node: NodeId, is_lvalue: bool) {
        let slot = self.slot(node);
        debug_assert!(
            slot.is_lvalue.is_none(),
            "isLValue decoration written twice for {node:?}"
        );
        slot.is_lvalue = Some(is_lvalue);
    }

    pub fn is_lvalue(&self, node: NodeId) -> Option<bool> {
        self.entries.get(&node).and_then(|d| d.is_lvalue)
    }

    pub fn set_addr(&mut self, node: NodeId, addr: impl Into<String>) {
        let slot = self.slot(node);
        debug_assert!(slot.addr.is_none(), "addr decoration written twice for {node:?}");
        slot.addr = Some(addr.into());
    }

    pub fn addr(&self, node: NodeId) -> Option<&str> {
        self.entries.get(&node).and_then(|d| d.addr.as_deref())
    }

    pub fn set_offset(&mut self, node: NodeId, offset: impl Into<String>) {
        let slot = self.slot(node);
        debug_assert!(
            slot.offset.is_none(),
            "offset decoration written twice for {node:?}"
        );
        slot.offset = Some(offset.into());
    }

    pub fn offset(&self, node: NodeId) -> Option<&str> {
        self.entries.get(&node).and_then(|d| d.offset.as_deref())
    }

    pub fn set_code(&mut self, node: NodeId, code: InstructionList) {
        let slot = self.slot(node);
        debug_assert!(slot.code.is_none(), "code decoration written twice for {node:?}");
        slot.code = Some(code);
    }

    pub fn code(&self, node: NodeId) -> InstructionList {
        self.entries
            .get(&node)
            .and_then(|d| d.code.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Builder, ExprKind};

    #[test]
    fn write_once_fields_round_trip() {
        let mut b = Builder::new();
        let e = b.int_lit(1, crate::ast::Span::new(1, 1));
        let mut dec = TreeDecoration::new();
        let mut types = crate::types::TypeInterner::new();
        let int = types.basic(crate::types::BasicType::Int);
        dec.set_type(e.id, int);
        dec.set_lvalue(e.id, false);
        assert_eq!(dec.ty(e.id), Some(int));
        assert_eq!(dec.is_lvalue(e.id), Some(false));
        assert!(matches!(e.kind, ExprKind::IntLit(1)));
    }

    #[test]
    #[should_panic(expected = "written twice")]
    fn double_write_panics_in_debug() {
        let mut b = Builder::new();
        let e = b.int_lit(1, crate::ast::Span::new(1, 1));
        let mut dec = TreeDecoration::new();
        dec.set_addr(e.id, "x");
        dec.set_addr(e.id, "y");
    }
}
