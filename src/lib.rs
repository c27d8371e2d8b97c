//! `aslc`: semantic analysis and three-address code generation for ASL.
//!
//! A parser is assumed to have already produced a well-formed [`ast::Program`];
//! this crate's job starts there and ends at an [`ir::Program`] ready for a
//! separate backend. [`compile`] runs the three passes in the only order
//! that's meaningful: `SymbolPass` builds the scope tree, `TypePass` decorates
//! every expression with a type and checks it, and `CodeGen` lowers the
//! decorated tree to instructions. Codegen never runs over a program with
//! outstanding semantic errors.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod decoration;
pub mod diagnostics;
pub mod errors;
pub mod ir;
pub mod symbol_pass;
pub mod symtab;
pub mod type_pass;
pub mod types;

use ast::{Program, Span};
use codegen::CodeGen;
use config::CompilerConfig;
use decoration::TreeDecoration;
use errors::{CompileError, ErrorKind, ErrorReporter};
use symbol_pass::SymbolPass;
use symtab::SymbolTable;
use type_pass::TypePass;
use types::TypeInterner;

/// The outcome of [`compile`]: either a lowered program, or the accumulated
/// diagnostics that prevented one from being emitted.
#[derive(Debug)]
pub struct CompileResult {
    pub program: Option<ir::Program>,
    pub errors: Vec<CompileError>,
}

impl CompileResult {
    pub fn is_success(&self) -> bool {
        self.program.is_some()
    }
}

/// Runs `SymbolPass`, `TypePass`, and `CodeGen` over `program` in order.
///
/// `main`'s declaration is checked against `config.strict_main_check()`
/// after `TypePass`, since only `SymbolPass` has populated `$global$` by
/// then and the check doesn't depend on anything `TypePass` decorates.
/// Codegen is skipped entirely when any pass reported an error. Its
/// `Result` return only covers internal invariant violations, never
/// user-facing semantic mistakes, so it must never see an ill-typed tree.
pub fn compile(program: &Program, config: &CompilerConfig) -> CompileResult {
    let _span = tracing::info_span!("compile").entered();

    let mut types = TypeInterner::new();
    let mut symbols = SymbolTable::new();
    let mut dec = TreeDecoration::new();
    let mut errors = ErrorReporter::new();

    SymbolPass::new(&mut types, &mut symbols, &mut dec, &mut errors, config).run(program);
    TypePass::new(&mut types, &mut symbols, &mut dec, &mut errors).run(program);

    if config.strict_main_check() && !symbols.main_is_properly_declared(&types) {
        errors.report(ErrorKind::NoMainProperlyDeclared, Span::default());
    }

    if errors.num_errors() > 0 {
        tracing::warn!(count = errors.num_errors(), "compilation failed");
        return CompileResult {
            program: None,
            errors: errors.errors().to_vec(),
        };
    }

    let ir = CodeGen::new(&types, &mut symbols, &mut dec)
        .run(program)
        .expect("codegen invariant violated on a program TypePass reported as error-free");

    CompileResult {
        program: Some(ir),
        errors: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{BasicTypeTok, Builder};

    #[test]
    fn well_typed_program_with_main_compiles() {
        let mut b = Builder::new();
        let s = Span::new(1, 1);
        let ret_stmt = b.return_stmt(s, None);
        let main = b.function("main", s, s, vec![], None, vec![], vec![ret_stmt]);
        let program = Program {
            functions: vec![main],
        };

        let result = compile(&program, &CompilerConfig::default());
        assert!(result.is_success());
        assert_eq!(result.program.unwrap().subroutines.len(), 1);
    }

    #[test]
    fn missing_main_reports_error_under_strict_check() {
        let mut b = Builder::new();
        let s = Span::new(1, 1);
        let ret_stmt = b.return_stmt(s, None);
        let f = b.function("helper", s, s, vec![], None, vec![], vec![ret_stmt]);
        let program = Program { functions: vec![f] };

        let result = compile(&program, &CompilerConfig::default());
        assert!(!result.is_success());
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::NoMainProperlyDeclared)));
    }

    #[test]
    fn missing_main_allowed_when_strict_check_disabled() {
        let mut b = Builder::new();
        let s = Span::new(1, 1);
        let ret_stmt = b.return_stmt(s, None);
        let f = b.function("helper", s, s, vec![], None, vec![], vec![ret_stmt]);
        let program = Program { functions: vec![f] };

        let config = CompilerConfig::new().with_strict_main_check(false);
        let result = compile(&program, &config);
        assert!(result.is_success());
    }

    #[test]
    fn semantic_error_suppresses_codegen() {
        let mut b = Builder::new();
        let s = Span::new(1, 1);
        let int_ty = b.basic_type(BasicTypeTok::Int, s);
        let decl = b.var_decl(vec![("x", s)], int_ty);
        let lhs = b.left_var("x", s);
        let rhs = b.bool_lit(true, s);
        let assign = b.assign(lhs, rhs, s);
        let ret_stmt = b.return_stmt(s, None);
        let main = b.function("main", s, s, vec![], None, vec![decl], vec![assign, ret_stmt]);
        let program = Program {
            functions: vec![main],
        };

        let result = compile(&program, &CompilerConfig::default());
        assert!(!result.is_success());
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::IncompatibleAssignment)));
    }

    #[test]
    fn array_exceeding_configured_max_is_reported() {
        let mut b = Builder::new();
        let s = Span::new(1, 1);
        let arr_ty = b.array_type(100, BasicTypeTok::Int, s);
        let decl = b.var_decl(vec![("a", s)], arr_ty);
        let ret_stmt = b.return_stmt(s, None);
        let main = b.function("main", s, s, vec![], None, vec![decl], vec![ret_stmt]);
        let program = Program {
            functions: vec![main],
        };

        let config = CompilerConfig::new().with_max_array_len(10);
        let result = compile(&program, &config);
        assert!(!result.is_success());
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e.kind, ErrorKind::ArrayTooLarge { max: 10 })));
    }
}
