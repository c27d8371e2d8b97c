//! Symbol table: nested scopes with a scope stack.
//!
//! `$global$` is always the bottom of the stack. Each function push adds a
//! new scope holding its parameters (and, as `SymbolPass` walks the body,
//! its locals); that scope is popped on function exit. Scopes are never
//! freed once popped. `TypePass` and `CodegenPass` re-enter a function's
//! scope by id via [`SymbolTable::push_this_scope`], so the arena has
//! program-long lifetime.

use std::collections::HashMap;

use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    LocalVar { name: String, ty: TypeId },
    Parameter { name: String, ty: TypeId },
    Function { name: String, signature: TypeId },
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::LocalVar { name, .. } => name,
            Symbol::Parameter { name, .. } => name,
            Symbol::Function { name, .. } => name,
        }
    }

    pub fn ty(&self) -> TypeId {
        match self {
            Symbol::LocalVar { ty, .. } => *ty,
            Symbol::Parameter { ty, .. } => *ty,
            Symbol::Function { signature, .. } => *signature,
        }
    }
}

#[derive(Debug, Default)]
struct Scope {
    name: String,
    symbols: HashMap<String, Symbol>,
    /// Set when this scope is a function body scope, so
    /// [`SymbolTable::current_function_ty`] can answer "what function am I
    /// inside" for return-type checking.
    owner_function: Option<Symbol>,
}

#[derive(Debug)]
pub struct SymbolTable {
    arena: Vec<Scope>,
    stack: Vec<ScopeId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            arena: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.arena[id.0 as usize]
    }

    fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.arena[id.0 as usize]
    }

    fn top(&self) -> ScopeId {
        *self.stack.last().expect("scope stack must not be empty")
    }

    /// Creates a brand new scope and pushes it on top of the stack.
    pub fn push_new_scope(&mut self, name: impl Into<String>) -> ScopeId {
        let id = ScopeId(self.arena.len() as u32);
        self.arena.push(Scope {
            name: name.into(),
            symbols: HashMap::new(),
            owner_function: None,
        });
        self.stack.push(id);
        id
    }

    /// Re-activates a previously built scope (by id), used by passes that
    /// run after `SymbolPass` to re-enter a function's scope.
    pub fn push_this_scope(&mut self, id: ScopeId) {
        self.stack.push(id);
    }

    /// The id of `$global$`, always the first scope `SymbolPass` ever
    /// pushes. Later passes re-enter it before re-entering a function's body
    /// scope, so calls to sibling functions resolve the same way they did
    /// while `SymbolPass` built the table.
    pub fn global_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn pop_scope(&mut self) {
        self.stack.pop().expect("popScope with empty scope stack");
    }

    /// Marks the scope currently on top as the body scope of `function`,
    /// so `currentFunctionTy` can find it later.
    pub fn mark_current_as_function(&mut self, function: Symbol) {
        let top = self.top();
        self.scope_mut(top).owner_function = Some(function);
    }

    pub fn add_local_var(&mut self, name: impl Into<String>, ty: TypeId) {
        let name = name.into();
        let top = self.top();
        self.scope_mut(top)
            .symbols
            .insert(name.clone(), Symbol::LocalVar { name, ty });
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, ty: TypeId) {
        let name = name.into();
        let top = self.top();
        self.scope_mut(top)
            .symbols
            .insert(name.clone(), Symbol::Parameter { name, ty });
    }

    /// Inserts a function symbol into the scope currently on top, the
    /// *enclosing* scope, since `SymbolPass` calls this before pushing the
    /// function's own body scope, so recursive references resolve.
    pub fn add_function(&mut self, name: impl Into<String>, signature: TypeId) {
        let name = name.into();
        let top = self.top();
        self.scope_mut(top).symbols.insert(
            name.clone(),
            Symbol::Function { name, signature },
        );
    }

    pub fn get_type(&self, ident: &str) -> Option<TypeId> {
        self.find_in_stack(ident).map(|(_, sym)| sym.ty())
    }

    fn find_in_stack(&self, ident: &str) -> Option<(usize, &Symbol)> {
        for (depth, scope_id) in self.stack.iter().rev().enumerate() {
            if let Some(sym) = self.scope(*scope_id).symbols.get(ident) {
                return Some((depth, sym));
            }
        }
        None
    }

    /// Depth from the top of the stack at which `ident` resolves, or `-1`
    /// if it is not found in any active scope.
    pub fn find_in_stack_depth(&self, ident: &str) -> i64 {
        match self.find_in_stack(ident) {
            Some((depth, _)) => depth as i64,
            None => -1,
        }
    }

    pub fn find_in_current_scope(&self, ident: &str) -> bool {
        self.scope(self.top()).symbols.contains_key(ident)
    }

    /// The `Function` symbol owning the scope currently on top, used to
    /// validate `return` statements against the enclosing function's
    /// declared return type.
    pub fn current_function_ty(&self) -> Option<&Symbol> {
        self.scope(self.top()).owner_function.as_ref()
    }

    /// True iff `$global$` (scope 0, the first scope ever pushed) declares
    /// `main` as a zero-arity, `Void`-returning function.
    pub fn main_is_properly_declared(&self, types: &crate::types::TypeInterner) -> bool {
        let Some(global) = self.arena.first() else {
            return false;
        };
        match global.symbols.get("main") {
            Some(Symbol::Function { signature, .. }) => {
                types.func_arity(*signature) == Some(0)
                    && types.func_return(*signature).is_some_and(|r| types.is_void(r))
            }
            _ => false,
        }
    }

    #[cfg(test)]
    fn global_scope_name(&self) -> &str {
        &self.arena[0].name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BasicType, TypeInterner};

    #[test]
    fn global_scope_is_named_and_at_the_bottom() {
        let mut symtab = SymbolTable::new();
        symtab.push_new_scope("$global$");
        assert_eq!(symtab.global_scope_name(), "$global$");
    }

    #[test]
    fn function_is_visible_in_enclosing_scope_before_its_body_scope_is_pushed() {
        let mut types = TypeInterner::new();
        let mut symtab = SymbolTable::new();
        symtab.push_new_scope("$global$");

        let void = types.void();
        let sig = types.function(vec![], void);
        symtab.add_function("main", sig);
        assert_eq!(symtab.find_in_stack_depth("main"), 0);

        symtab.push_new_scope("main");
        // still resolvable from inside the new scope (recursive calls)
        assert_eq!(symtab.find_in_stack_depth("main"), 1);
        symtab.pop_scope();
    }

    #[test]
    fn parameters_shadow_in_current_scope_only() {
        let mut types = TypeInterner::new();
        let mut symtab = SymbolTable::new();
        symtab.push_new_scope("$global$");
        let int = types.basic(BasicType::Int);
        symtab.add_local_var("x", int);
        symtab.push_new_scope("f");
        assert!(!symtab.find_in_current_scope("x"));
        assert_eq!(symtab.find_in_stack_depth("x"), 1);
        symtab.add_parameter("x", int);
        assert!(symtab.find_in_current_scope("x"));
        assert_eq!(symtab.find_in_stack_depth("x"), 0);
    }

    #[test]
    fn push_this_scope_reactivates_by_id() {
        let mut types = TypeInterner::new();
        let mut symtab = SymbolTable::new();
        let global = symtab.push_new_scope("$global$");
        let int = types.basic(BasicType::Int);
        let body = symtab.push_new_scope("f");
        symtab.add_parameter("p", int);
        symtab.pop_scope();
        symtab.pop_scope();
        // not reachable: stack emptied by both pops, start over by re-entering
        symtab.push_this_scope(global);
        symtab.push_this_scope(body);
        assert!(symtab.find_in_current_scope("p"));
    }

    #[test]
    fn main_must_be_zero_arity_void() {
        let mut types = TypeInterner::new();
        let mut symtab = SymbolTable::new();
        symtab.push_new_scope("$global$");
        assert!(!symtab.main_is_properly_declared(&types));

        let void = types.void();
        let int = types.basic(BasicType::Int);
        let wrong_arity = types.function(vec![int], void);
        symtab.add_function("main", wrong_arity);
        assert!(!symtab.main_is_properly_declared(&types));
    }
}
