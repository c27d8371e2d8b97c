//! `if`/`while` lowering.
//!
//! `while`'s guard is lowered once, directly after the loop label, and the
//! loop body jumps back to that label, so the guard's instructions run
//! again on every iteration rather than being duplicated in the instruction
//! stream.

use crate::ast::{Expr, Stmt};
use crate::decoration::TreeDecoration;
use crate::ir::{Instr, InstructionList};
use crate::symtab::SymbolTable;
use crate::types::TypeInterner;

use super::error::CodeGenError;
use super::state::FunctionState;
use super::statements::{lower_expr, lower_stmt};

pub(super) fn lower_if(
    cond: &Expr,
    then_branch: &[Stmt],
    else_branch: Option<&[Stmt]>,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<InstructionList, CodeGenError> {
    let (cond_code, cond_addr) = lower_expr(cond, types, symbols, dec, state)?;
    let id = state.new_label_id();
    let endif_label = format!("endif{id}");
    let mut code = cond_code;

    match else_branch {
        None => {
            code.push(Instr::FJump(cond_addr, endif_label.clone()));
            for s in then_branch {
                code = code.then(lower_stmt(s, types, symbols, dec, state)?);
            }
            code.push(Instr::Label(endif_label));
        }
        Some(else_branch) => {
            let else_label = format!("if{id}_else");
            code.push(Instr::FJump(cond_addr, else_label.clone()));
            for s in then_branch {
                code = code.then(lower_stmt(s, types, symbols, dec, state)?);
            }
            code.push(Instr::UJump(endif_label.clone()));
            code.push(Instr::Label(else_label));
            for s in else_branch {
                code = code.then(lower_stmt(s, types, symbols, dec, state)?);
            }
            code.push(Instr::Label(endif_label));
        }
    }
    Ok(code)
}

pub(super) fn lower_while(
    cond: &Expr,
    body: &[Stmt],
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<InstructionList, CodeGenError> {
    let id = state.new_label_id();
    let loop_label = format!("loop{id}");
    let endwhile_label = format!("endwhile{id}");

    let mut code = InstructionList::single(Instr::Label(loop_label.clone()));
    let (cond_code, cond_addr) = lower_expr(cond, types, symbols, dec, state)?;
    code = code.then(cond_code);
    code.push(Instr::FJump(cond_addr, endwhile_label.clone()));
    for s in body {
        code = code.then(lower_stmt(s, types, symbols, dec, state)?);
    }
    code.push(Instr::UJump(loop_label));
    code.push(Instr::Label(endwhile_label));
    Ok(code)
}
