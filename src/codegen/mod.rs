//! CodegenPass: tree walk #3.
//!
//! Runs last, after `TypePass` has decorated every expression and
//! left-expression with a `TypeId`. Lowers the parse tree into the
//! three-address instruction IR, re-entering each function's scope
//! the same way `TypePass` does so call targets resolve identically.

mod control_flow;
mod error;
mod program;
mod state;
mod statements;

pub use error::CodeGenError;

use crate::ast::Program as AstProgram;
use crate::decoration::TreeDecoration;
use crate::ir::Program as IrProgram;
use crate::symtab::SymbolTable;
use crate::types::TypeInterner;

#[cfg(test)]
use crate::config::CompilerConfig;

pub struct CodeGen<'a> {
    pub(crate) types: &'a TypeInterner,
    pub(crate) symbols: &'a mut SymbolTable,
    pub(crate) dec: &'a mut TreeDecoration,
}

impl<'a> CodeGen<'a> {
    pub fn new(
        types: &'a TypeInterner,
        symbols: &'a mut SymbolTable,
        dec: &'a mut TreeDecoration,
    ) -> Self {
        CodeGen { types, symbols, dec }
    }

    pub fn run(&mut self, program: &AstProgram) -> Result<IrProgram, CodeGenError> {
        let _span = tracing::debug_span!("codegen_pass").entered();
        program::lower_program(self, program)
    }
}
