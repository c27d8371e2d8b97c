//! Expression and statement lowering.
//!
//! Every lowering function decorates the node it lowers with the
//! instructions needed to evaluate it (`code`) and the operand that holds
//! its value (`addr`), then returns both so the caller can concatenate them
//! into its own larger instruction list.

use crate::ast::{
    ArithOp, BoolOp, Expr, ExprKind, LeftExpr, LeftExprKind, RelOp, Stmt, StmtKind, UnaryOp,
};
use crate::ast::NodeId;
use crate::decoration::TreeDecoration;
use crate::ir::{Instr, InstructionList};
use crate::symtab::SymbolTable;
use crate::types::{TypeId, TypeInterner};

use super::control_flow::{lower_if, lower_while};
use super::error::CodeGenError;
use super::state::FunctionState;

fn type_of(dec: &TreeDecoration, node: NodeId) -> Result<TypeId, CodeGenError> {
    dec.ty(node).ok_or(CodeGenError::MissingTypeDecoration(node))
}

enum LValueTarget {
    Var(String),
    Index { base: String, offset: String },
}

// ---- expressions ----

pub(super) fn lower_expr(
    expr: &Expr,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<(InstructionList, String), CodeGenError> {
    let (code, addr) = match &expr.kind {
        ExprKind::IntLit(v) => {
            let t = state.new_temp();
            (InstructionList::single(Instr::ILoad(t.clone(), v.to_string())), t)
        }
        ExprKind::FloatLit(v) => {
            let t = state.new_temp();
            (InstructionList::single(Instr::FLoad(t.clone(), v.to_string())), t)
        }
        ExprKind::BoolLit(v) => {
            let t = state.new_temp();
            let lit = if *v { "1" } else { "0" };
            (InstructionList::single(Instr::ILoad(t.clone(), lit.to_string())), t)
        }
        ExprKind::CharLit(v) => {
            let t = state.new_temp();
            (InstructionList::single(Instr::ChLoad(t.clone(), v.to_string())), t)
        }
        ExprKind::Ident(name) => (InstructionList::new(), name.clone()),
        ExprKind::Paren(inner) => lower_expr(inner, types, symbols, dec, state)?,
        ExprKind::Unary { op, operand, .. } => lower_unary(*op, operand, types, symbols, dec, state)?,
        ExprKind::Arith { op, lhs, rhs, .. } => lower_arith(*op, lhs, rhs, types, symbols, dec, state)?,
        ExprKind::Rel { op, lhs, rhs, .. } => lower_rel(*op, lhs, rhs, types, symbols, dec, state)?,
        ExprKind::Bool { op, lhs, rhs, .. } => lower_bool(*op, lhs, rhs, types, symbols, dec, state)?,
        ExprKind::Call { name, args, .. } => {
            let (code, result) = lower_call(name, args, types, symbols, dec, state)?;
            let addr = result.expect("type_pass only allows non-void calls as expressions");
            (code, addr)
        }
        ExprKind::Index { name, index, .. } => lower_index_read(name, index, types, symbols, dec, state)?,
    };
    dec.set_code(expr.id, code.clone());
    dec.set_addr(expr.id, addr.clone());
    Ok((code, addr))
}

fn lower_unary(
    op: UnaryOp,
    operand: &Expr,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<(InstructionList, String), CodeGenError> {
    let (mut code, addr) = lower_expr(operand, types, symbols, dec, state)?;
    let operand_ty = type_of(dec, operand.id)?;
    match op {
        UnaryOp::Plus => Ok((code, addr)),
        UnaryOp::Minus => {
            let t = state.new_temp();
            if types.is_float(operand_ty) {
                code.push(Instr::FNeg(t.clone(), addr));
            } else {
                code.push(Instr::Neg(t.clone(), addr));
            }
            Ok((code, t))
        }
        UnaryOp::Not => {
            let t = state.new_temp();
            code.push(Instr::Not(t.clone(), addr));
            Ok((code, t))
        }
    }
}

/// Inserts a `FLOAT` coercion on whichever side is `Int` when the operation
/// is being carried out in `Float`, the same coercion applied at call sites
/// for arguments, generalized to binary operators.
fn coerce_pair(
    code: &mut InstructionList,
    state: &mut FunctionState,
    types: &TypeInterner,
    lty: TypeId,
    laddr: String,
    rty: TypeId,
    raddr: String,
    want_float: bool,
) -> (String, String) {
    if !want_float {
        return (laddr, raddr);
    }
    let laddr = if types.is_int(lty) {
        let t = state.new_temp();
        code.push(Instr::Float(t.clone(), laddr));
        t
    } else {
        laddr
    };
    let raddr = if types.is_int(rty) {
        let t = state.new_temp();
        code.push(Instr::Float(t.clone(), raddr));
        t
    } else {
        raddr
    };
    (laddr, raddr)
}

fn lower_arith(
    op: ArithOp,
    lhs: &Expr,
    rhs: &Expr,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<(InstructionList, String), CodeGenError> {
    let (lcode, laddr) = lower_expr(lhs, types, symbols, dec, state)?;
    let (rcode, raddr) = lower_expr(rhs, types, symbols, dec, state)?;
    let mut code = lcode.then(rcode);
    let lty = type_of(dec, lhs.id)?;
    let rty = type_of(dec, rhs.id)?;
    let want_float = types.is_float(lty) || types.is_float(rty);
    let (laddr, raddr) = coerce_pair(&mut code, state, types, lty, laddr, rty, raddr, want_float);

    let t = state.new_temp();
    let instr = match (want_float, op) {
        (false, ArithOp::Add) => Instr::Add(t.clone(), laddr, raddr),
        (false, ArithOp::Sub) => Instr::Sub(t.clone(), laddr, raddr),
        (false, ArithOp::Mul) => Instr::Mul(t.clone(), laddr, raddr),
        (false, ArithOp::Div) => Instr::Div(t.clone(), laddr, raddr),
        (true, ArithOp::Add) => Instr::FAdd(t.clone(), laddr, raddr),
        (true, ArithOp::Sub) => Instr::FSub(t.clone(), laddr, raddr),
        (true, ArithOp::Mul) => Instr::FMul(t.clone(), laddr, raddr),
        (true, ArithOp::Div) => Instr::FDiv(t.clone(), laddr, raddr),
    };
    code.push(instr);
    Ok((code, t))
}

enum RelBase {
    Eq,
    Lt,
    Le,
}

fn lower_rel(
    op: RelOp,
    lhs: &Expr,
    rhs: &Expr,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<(InstructionList, String), CodeGenError> {
    let (lcode, laddr) = lower_expr(lhs, types, symbols, dec, state)?;
    let (rcode, raddr) = lower_expr(rhs, types, symbols, dec, state)?;
    let mut code = lcode.then(rcode);
    let lty = type_of(dec, lhs.id)?;
    let rty = type_of(dec, rhs.id)?;
    let numeric = types.is_numeric(lty) && types.is_numeric(rty);
    let want_float = numeric && (types.is_float(lty) || types.is_float(rty));
    let (laddr, raddr) = if numeric {
        coerce_pair(&mut code, state, types, lty, laddr, rty, raddr, want_float)
    } else {
        (laddr, raddr)
    };

    // Only `Eq`/`Lt`/`Le` exist as instructions; `Ne` negates `Eq` and
    // `Gt`/`Ge` swap operands into `Lt`/`Le`.
    let (base, swap) = match op {
        RelOp::Eq | RelOp::Ne => (RelBase::Eq, false),
        RelOp::Lt => (RelBase::Lt, false),
        RelOp::Gt => (RelBase::Lt, true),
        RelOp::Le => (RelBase::Le, false),
        RelOp::Ge => (RelBase::Le, true),
    };
    let (a, b) = if swap { (raddr, laddr) } else { (laddr, raddr) };

    let t = state.new_temp();
    let instr = match (want_float, base) {
        (false, RelBase::Eq) => Instr::Eq(t.clone(), a, b),
        (true, RelBase::Eq) => Instr::FEq(t.clone(), a, b),
        (false, RelBase::Lt) => Instr::Lt(t.clone(), a, b),
        (true, RelBase::Lt) => Instr::FLt(t.clone(), a, b),
        (false, RelBase::Le) => Instr::Le(t.clone(), a, b),
        (true, RelBase::Le) => Instr::FLe(t.clone(), a, b),
    };
    code.push(instr);

    if matches!(op, RelOp::Ne) {
        let negated = state.new_temp();
        code.push(Instr::Not(negated.clone(), t));
        Ok((code, negated))
    } else {
        Ok((code, t))
    }
}

fn lower_bool(
    op: BoolOp,
    lhs: &Expr,
    rhs: &Expr,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<(InstructionList, String), CodeGenError> {
    let (lcode, laddr) = lower_expr(lhs, types, symbols, dec, state)?;
    let (rcode, raddr) = lower_expr(rhs, types, symbols, dec, state)?;
    let mut code = lcode.then(rcode);
    let t = state.new_temp();
    let instr = match op {
        BoolOp::And => Instr::And(t.clone(), laddr, raddr),
        BoolOp::Or => Instr::Or(t.clone(), laddr, raddr),
    };
    code.push(instr);
    Ok((code, t))
}

fn lower_index_read(
    name: &str,
    index: &Expr,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<(InstructionList, String), CodeGenError> {
    let (mut code, index_addr) = lower_expr(index, types, symbols, dec, state)?;
    let stride = state.new_temp();
    code.push(Instr::ILoad(stride.clone(), "1".to_string()));
    let offset = state.new_temp();
    code.push(Instr::Mul(offset.clone(), stride, index_addr));
    let dst = state.new_temp();
    code.push(Instr::LoadX {
        dst: dst.clone(),
        base: name.to_string(),
        offset,
    });
    Ok((code, dst))
}

/// Lowers the push/pop parameter-stack calling convention: a slot is
/// reserved first when the callee returns non-`Void`, arguments are
/// pushed left to right (arrays passed by address via `ALOAD`, `Int`
/// arguments widened to `Float` when the parameter is `Float`), then popped
/// back off after the call, with the reserved result slot popped last.
pub(super) fn lower_call(
    name: &str,
    args: &[Expr],
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<(InstructionList, Option<String>), CodeGenError> {
    let sig = symbols
        .get_type(name)
        .expect("call target resolved by type_pass");
    let ret = types.func_return(sig).unwrap_or_else(|| types.void());
    let has_result = !types.is_void(ret);

    let mut code = InstructionList::new();
    if has_result {
        code.push(Instr::Push(state.new_temp()));
    }

    for (i, arg) in args.iter().enumerate() {
        let (arg_code, mut arg_addr) = lower_expr(arg, types, symbols, dec, state)?;
        code = code.then(arg_code);
        let arg_ty = type_of(dec, arg.id)?;
        if let Some(param_ty) = types.func_param(sig, i) {
            if types.is_array(arg_ty) {
                let addr_temp = state.new_temp();
                code.push(Instr::ALoad(addr_temp.clone(), arg_addr));
                arg_addr = addr_temp;
            } else if types.is_float(param_ty) && types.is_int(arg_ty) {
                let coerced = state.new_temp();
                code.push(Instr::Float(coerced.clone(), arg_addr));
                arg_addr = coerced;
            }
        }
        code.push(Instr::Push(arg_addr));
    }

    code.push(Instr::Call(name.to_string()));
    for _ in 0..args.len() {
        code.push(Instr::Pop(state.new_temp()));
    }

    let result = if has_result {
        let result_temp = state.new_temp();
        code.push(Instr::Pop(result_temp.clone()));
        Some(result_temp)
    } else {
        None
    };

    Ok((code, result))
}

// ---- left-expressions ----

fn lower_left_expr(
    left: &LeftExpr,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<(InstructionList, LValueTarget), CodeGenError> {
    let (code, target) = match &left.kind {
        LeftExprKind::Var(name) => (InstructionList::new(), LValueTarget::Var(name.clone())),
        LeftExprKind::Index { name, index } => {
            let (mut code, index_addr) = lower_expr(index, types, symbols, dec, state)?;
            let stride = state.new_temp();
            code.push(Instr::ILoad(stride.clone(), "1".to_string()));
            let offset = state.new_temp();
            code.push(Instr::Mul(offset.clone(), stride, index_addr));
            dec.set_offset(left.id, offset.clone());
            (
                code,
                LValueTarget::Index {
                    base: name.clone(),
                    offset,
                },
            )
        }
    };
    let addr = match &target {
        LValueTarget::Var(name) => name.clone(),
        LValueTarget::Index { base, .. } => base.clone(),
    };
    dec.set_code(left.id, code.clone());
    dec.set_addr(left.id, addr);
    Ok((code, target))
}

// ---- statements ----

pub(super) fn lower_stmt(
    stmt: &Stmt,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<InstructionList, CodeGenError> {
    match &stmt.kind {
        StmtKind::Assign { lhs, rhs, .. } => lower_assign(lhs, rhs, types, symbols, dec, state),
        StmtKind::If { cond, then_branch, else_branch } => lower_if(
            cond,
            then_branch,
            else_branch.as_deref(),
            types,
            symbols,
            dec,
            state,
        ),
        StmtKind::While { cond, body } => lower_while(cond, body, types, symbols, dec, state),
        StmtKind::Read { target } => lower_read(target, types, symbols, dec, state),
        StmtKind::WriteExpr(expr) => lower_write_expr(expr, types, symbols, dec, state),
        StmtKind::WriteString { text, .. } => Ok(lower_write_string(text, state)),
        StmtKind::Call { name, args, .. } => {
            let (code, _) = lower_call(name, args, types, symbols, dec, state)?;
            Ok(code)
        }
        StmtKind::Return { value, .. } => lower_return(value.as_ref(), types, symbols, dec, state),
    }
}

fn lower_assign(
    lhs: &LeftExpr,
    rhs: &Expr,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<InstructionList, CodeGenError> {
    let (lcode, target) = lower_left_expr(lhs, types, symbols, dec, state)?;
    let (rcode, mut raddr) = lower_expr(rhs, types, symbols, dec, state)?;
    let mut code = lcode.then(rcode);

    let lhs_ty = type_of(dec, lhs.id)?;
    let rhs_ty = type_of(dec, rhs.id)?;
    if types.is_float(lhs_ty) && types.is_int(rhs_ty) {
        let t = state.new_temp();
        code.push(Instr::Float(t.clone(), raddr));
        raddr = t;
    }

    match target {
        LValueTarget::Var(name) => code.push(Instr::Load(name, raddr)),
        LValueTarget::Index { base, offset } => code.push(Instr::XLoad {
            base,
            offset,
            src: raddr,
        }),
    }
    Ok(code)
}

fn read_instr_for(ty: TypeId, types: &TypeInterner, dst: String) -> Instr {
    if types.is_float(ty) {
        Instr::ReadF(dst)
    } else if types.is_char(ty) {
        Instr::ReadC(dst)
    } else {
        Instr::ReadI(dst)
    }
}

fn lower_read(
    target: &LeftExpr,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<InstructionList, CodeGenError> {
    let (mut code, lv) = lower_left_expr(target, types, symbols, dec, state)?;
    let ty = type_of(dec, target.id)?;
    match lv {
        LValueTarget::Var(name) => code.push(read_instr_for(ty, types, name)),
        LValueTarget::Index { base, offset } => {
            let tmp = state.new_temp();
            code.push(read_instr_for(ty, types, tmp.clone()));
            code.push(Instr::XLoad {
                base,
                offset,
                src: tmp,
            });
        }
    }
    Ok(code)
}

fn lower_write_expr(
    expr: &Expr,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<InstructionList, CodeGenError> {
    let (mut code, addr) = lower_expr(expr, types, symbols, dec, state)?;
    let ty = type_of(dec, expr.id)?;
    let instr = if types.is_float(ty) {
        Instr::WriteF(addr)
    } else if types.is_char(ty) {
        Instr::WriteC(addr)
    } else {
        Instr::WriteI(addr)
    };
    code.push(instr);
    Ok(code)
}

/// Decodes a raw string-literal token (quotes included, per
/// [`crate::ast::StmtKind::WriteString`]) into `WRITELN` for `\n` and a
/// `CHLOAD`+`WRITEC` pair per character otherwise.
fn lower_write_string(text: &str, state: &mut FunctionState) -> InstructionList {
    let mut code = InstructionList::new();
    let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or("");
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => code.push(Instr::WriteLn),
                Some(escaped) => push_char_write(&mut code, state, escaped),
                None => {}
            }
        } else {
            push_char_write(&mut code, state, c);
        }
    }
    code
}

fn push_char_write(code: &mut InstructionList, state: &mut FunctionState, ch: char) {
    let t = state.new_temp();
    code.push(Instr::ChLoad(t.clone(), ch.to_string()));
    code.push(Instr::WriteC(t));
}

fn lower_return(
    value: Option<&Expr>,
    types: &TypeInterner,
    symbols: &SymbolTable,
    dec: &mut TreeDecoration,
    state: &mut FunctionState,
) -> Result<InstructionList, CodeGenError> {
    match value {
        None => Ok(InstructionList::single(Instr::Return)),
        Some(expr) => {
            let (mut code, mut addr) = lower_expr(expr, types, symbols, dec, state)?;
            let current_fn_ty = symbols
                .current_function_ty()
                .expect("return statement outside a function body")
                .ty();
            let ret_ty = types.func_return(current_fn_ty).unwrap_or_else(|| types.void());
            let expr_ty = type_of(dec, expr.id)?;
            if types.is_float(ret_ty) && types.is_int(expr_ty) {
                let t = state.new_temp();
                code.push(Instr::Float(t.clone(), addr));
                addr = t;
            }
            let result_load = if types.is_float(ret_ty) {
                Instr::FLoad("_result".to_string(), addr)
            } else if types.is_char(ret_ty) {
                Instr::ChLoad("_result".to_string(), addr)
            } else {
                Instr::ILoad("_result".to_string(), addr)
            };
            code.push(result_load);
            code.push(Instr::Return);
            Ok(code)
        }
    }
}
