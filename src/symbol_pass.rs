//! SymbolPass: tree walk #1.
//!
//! Populates the [`SymbolTable`] from the parse tree and decorates every
//! function node with the [`ScopeId`] of its body scope. Never looks inside
//! expression bodies for identifier resolution; that's `TypePass`'s job,
//! once it can re-enter each function's scope via the decoration this pass
//! leaves behind.

use crate::ast::{BasicTypeTok, Function, Program, TypeKind, TypeNode};
use crate::config::CompilerConfig;
use crate::decoration::TreeDecoration;
use crate::errors::{ErrorKind, ErrorReporter};
use crate::symtab::{Symbol, SymbolTable};
use crate::types::{BasicType, TypeId, TypeInterner};

fn basic_to_types_basic(tok: BasicTypeTok) -> BasicType {
    match tok {
        BasicTypeTok::Int => BasicType::Int,
        BasicTypeTok::Bool => BasicType::Bool,
        BasicTypeTok::Float => BasicType::Float,
        BasicTypeTok::Char => BasicType::Char,
    }
}

/// Interns the type named by a `type`/`basic_type` node and decorates it,
/// matching `SymbolsListener::exitType`/`exitBasic_type`. Array declarations
/// wider than `config.max_array_len()` (when set) are reported but still
/// interned at their declared size, so later passes see a consistent type.
fn resolve_type_node(
    node: &TypeNode,
    types: &mut TypeInterner,
    dec: &mut TreeDecoration,
    config: &CompilerConfig,
    errors: &mut ErrorReporter,
) -> TypeId {
    let ty = match &node.kind {
        TypeKind::Basic(b) => types.basic(basic_to_types_basic(*b)),
        TypeKind::Array { size, elem } => {
            if let Some(max) = config.max_array_len() {
                if *size > max {
                    errors.report(ErrorKind::ArrayTooLarge { max }, node.span);
                }
            }
            types.array(*size, basic_to_types_basic(*elem))
        }
    };
    dec.set_type(node.id, ty);
    ty
}

pub struct SymbolPass<'a> {
    types: &'a mut TypeInterner,
    symbols: &'a mut SymbolTable,
    dec: &'a mut TreeDecoration,
    errors: &'a mut ErrorReporter,
    config: &'a CompilerConfig,
}

impl<'a> SymbolPass<'a> {
    pub fn new(
        types: &'a mut TypeInterner,
        symbols: &'a mut SymbolTable,
        dec: &'a mut TreeDecoration,
        errors: &'a mut ErrorReporter,
        config: &'a CompilerConfig,
    ) -> Self {
        SymbolPass {
            types,
            symbols,
            dec,
            errors,
            config,
        }
    }

    pub fn run(&mut self, program: &Program) {
        let _span = tracing::debug_span!("symbol_pass").entered();
        self.symbols.push_new_scope("$global$");
        for function in &program.functions {
            self.visit_function(function);
        }
        self.symbols.pop_scope();
    }

    fn visit_function(&mut self, function: &Function) {
        tracing::debug!(name = %function.name, "symbol_pass: function");

        let already_declared = self.symbols.find_in_current_scope(&function.name);
        if already_declared {
            self.errors.report(
                ErrorKind::DeclaredIdent {
                    ident: function.name.clone(),
                },
                function.name_span,
            );
        }

        let param_tys: Vec<TypeId> = function
            .params
            .iter()
            .map(|p| resolve_type_node(&p.ty, self.types, self.dec, self.config, self.errors))
            .collect();
        let ret_ty = match &function.ret {
            Some(ty_node) => resolve_type_node(ty_node, self.types, self.dec, self.config, self.errors),
            None => self.types.void(),
        };
        let signature = self.types.function(param_tys.clone(), ret_ty);

        // Still declare the fresh signature into the enclosing scope so the
        // body below can be checked and cascade fewer diagnostics, even on
        // collision; `add_function` just overwrites the colliding entry.
        if !already_declared {
            self.symbols.add_function(function.name.clone(), signature);
        }

        let scope = self.symbols.push_new_scope(function.name.clone());
        self.dec.set_scope(function.id, scope);
        self.symbols.mark_current_as_function(Symbol::Function {
            name: function.name.clone(),
            signature,
        });

        for (param, ty) in function.params.iter().zip(param_tys) {
            self.symbols.add_parameter(param.name.clone(), ty);
        }

        self.visit_decls_and_record_scope(function);
        self.symbols.pop_scope();
    }

    fn visit_decls_and_record_scope(&mut self, function: &Function) {
        for decl in &function.decls {
            let ty = resolve_type_node(&decl.ty, self.types, self.dec, self.config, self.errors);
            for (name, span) in &decl.names {
                if self.symbols.find_in_current_scope(name) {
                    self.errors.report(
                        ErrorKind::DeclaredIdent {
                            ident: name.clone(),
                        },
                        *span,
                    );
                } else {
                    self.symbols.add_local_var(name.clone(), ty);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BasicTypeTok, Builder, Span};

    fn build_simple_main() -> (Program, Builder) {
        let mut b = Builder::new();
        let s = Span::new(1, 1);
        let ret_stmt = b.return_stmt(s, None);
        let f = b.function("main", s, s, vec![], None, vec![], vec![ret_stmt]);
        (
            Program {
                functions: vec![f],
            },
            b,
        )
    }

    #[test]
    fn main_declared_with_correct_signature() {
        let (program, _b) = build_simple_main();
        let mut types = TypeInterner::new();
        let mut symbols = SymbolTable::new();
        let mut dec = TreeDecoration::new();
        let mut errors = ErrorReporter::new();

        let config = CompilerConfig::default();

        SymbolPass::new(&mut types, &mut symbols, &mut dec, &mut errors, &config).run(&program);

        assert_eq!(errors.num_errors(), 0);
        assert!(symbols.main_is_properly_declared(&types));
        assert_eq!(dec.scope(program.functions[0].id).is_some(), true);
    }

    #[test]
    fn duplicate_function_name_reports_declared_ident() {
        let mut b = Builder::new();
        let s = Span::new(2, 5);
        let f1 = b.function("f", s, s, vec![], None, vec![], vec![b.return_stmt(s, None)]);
        let f2 = b.function("f", s, s, vec![], None, vec![], vec![b.return_stmt(s, None)]);
        let main = b.function(
            "main",
            Span::new(1, 1),
            Span::new(1, 1),
            vec![],
            None,
            vec![],
            vec![b.return_stmt(Span::new(1, 1), None)],
        );
        let program = Program {
            functions: vec![f1, f2, main],
        };

        let mut types = TypeInterner::new();
        let mut symbols = SymbolTable::new();
        let mut dec = TreeDecoration::new();
        let mut errors = ErrorReporter::new();
        let config = CompilerConfig::default();
        SymbolPass::new(&mut types, &mut symbols, &mut dec, &mut errors, &config).run(&program);

        assert_eq!(errors.num_errors(), 1);
        assert!(matches!(
            errors.errors()[0].kind,
            ErrorKind::DeclaredIdent { .. }
        ));
    }

    #[test]
    fn variable_decl_duplicate_in_same_scope_reports_declared_ident() {
        let mut b = Builder::new();
        let s = Span::new(3, 3);
        let int_ty = b.basic_type(BasicTypeTok::Int, s);
        let int_ty2 = b.basic_type(BasicTypeTok::Int, s);
        let decl1 = b.var_decl(vec![("x", s)], int_ty);
        let decl2 = b.var_decl(vec![("x", s)], int_ty2);
        let f = b.function(
            "main",
            Span::new(1, 1),
            Span::new(1, 1),
            vec![],
            None,
            vec![decl1, decl2],
            vec![b.return_stmt(Span::new(1, 1), None)],
        );
        let program = Program { functions: vec![f] };

        let mut types = TypeInterner::new();
        let mut symbols = SymbolTable::new();
        let mut dec = TreeDecoration::new();
        let mut errors = ErrorReporter::new();
        let config = CompilerConfig::default();
        SymbolPass::new(&mut types, &mut symbols, &mut dec, &mut errors, &config).run(&program);

        assert_eq!(errors.num_errors(), 1);
        assert!(matches!(
            errors.errors()[0].kind,
            ErrorKind::DeclaredIdent { .. }
        ));
    }

    #[test]
    fn array_type_is_interned_with_declared_size_and_element() {
        let mut b = Builder::new();
        let s = Span::new(4, 4);
        let arr_ty = b.array_type(10, BasicTypeTok::Int, s);
        let arr_id = arr_ty.id;
        let decl = b.var_decl(vec![("a", s)], arr_ty);
        let f = b.function(
            "main",
            Span::new(1, 1),
            Span::new(1, 1),
            vec![],
            None,
            vec![decl],
            vec![b.return_stmt(Span::new(1, 1), None)],
        );
        let program = Program { functions: vec![f] };

        let mut types = TypeInterner::new();
        let mut symbols = SymbolTable::new();
        let mut dec = TreeDecoration::new();
        let mut errors = ErrorReporter::new();
        let config = CompilerConfig::default();
        SymbolPass::new(&mut types, &mut symbols, &mut dec, &mut errors, &config).run(&program);

        let ty = dec.ty(arr_id).unwrap();
        assert!(types.is_array(ty));
        assert_eq!(types.array_len(ty), Some(10));
    }
}
