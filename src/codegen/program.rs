//! Subroutine and program assembly.

use crate::ast::{Function, Program as AstProgram};
use crate::ir::{Instr, Program as IrProgram, Subroutine};

use super::error::CodeGenError;
use super::state::FunctionState;
use super::statements::lower_stmt;
use super::CodeGen;

pub(super) fn lower_program(
    cg: &mut CodeGen<'_>,
    program: &AstProgram,
) -> Result<IrProgram, CodeGenError> {
    let mut ir_program = IrProgram::new();
    for function in &program.functions {
        ir_program.subroutines.push(lower_function(cg, function)?);
    }
    Ok(ir_program)
}

fn lower_function(cg: &mut CodeGen<'_>, function: &Function) -> Result<Subroutine, CodeGenError> {
    tracing::debug!(name = %function.name, "codegen: function");
    let scope = cg
        .dec
        .scope(function.id)
        .ok_or(CodeGenError::MissingScopeDecoration(function.id))?;
    cg.symbols.push_this_scope(cg.symbols.global_scope());
    cg.symbols.push_this_scope(scope);

    let ret_ty = match &function.ret {
        Some(ty_node) => cg
            .dec
            .ty(ty_node.id)
            .ok_or(CodeGenError::MissingTypeDecoration(ty_node.id))?,
        None => cg.types.void(),
    };
    let has_result = !cg.types.is_void(ret_ty);

    let mut subr = Subroutine::new(function.name.clone());
    if has_result {
        subr.params.push("_result".to_string());
    }
    for param in &function.params {
        subr.params.push(param.name.clone());
    }
    for decl in &function.decls {
        let decl_ty = cg
            .dec
            .ty(decl.ty.id)
            .ok_or(CodeGenError::MissingTypeDecoration(decl.ty.id))?;
        let stride = cg.types.size_of(decl_ty);
        for (name, _) in &decl.names {
            subr.locals.push((name.clone(), stride));
        }
    }

    let mut state = FunctionState::new();
    for stmt in &function.body {
        let stmt_code = lower_stmt(stmt, cg.types, &*cg.symbols, cg.dec, &mut state)?;
        subr.code = std::mem::take(&mut subr.code).then(stmt_code);
    }
    // Every subroutine ends with an explicit `RETURN`, even when the source
    // already wrote a terminal `return`; the trailing one is unreachable
    // but keeps emission uniform.
    subr.code.push(Instr::Return);

    cg.symbols.pop_scope();
    cg.symbols.pop_scope();
    Ok(subr)
}
