//! TypePass: tree walk #2.
//!
//! Runs after `SymbolPass` has populated every scope. Re-enters each
//! function's body scope via the [`crate::symtab::ScopeId`] `SymbolPass`
//! left in the decoration, then assigns a [`TypeId`] to every expression and
//! an `isLValue` flag to every left-expression, reporting a `CompileError`
//! for each rule violation. A node that already provoked an error is
//! decorated with `types.error()` so its parents don't cascade more
//! diagnostics from the same root cause.

use crate::ast::{
    ArithOp, BoolOp, Expr, ExprKind, Function, LeftExpr, LeftExprKind, Program, RelOp, Span, Stmt,
    StmtKind, UnaryOp,
};
use crate::decoration::TreeDecoration;
use crate::errors::{ErrorKind, ErrorReporter};
use crate::symtab::SymbolTable;
use crate::types::{BasicType, CompareOp, TypeId, TypeInterner};

#[cfg(test)]
use crate::config::CompilerConfig;

pub struct TypePass<'a> {
    types: &'a mut TypeInterner,
    symbols: &'a mut SymbolTable,
    dec: &'a mut TreeDecoration,
    errors: &'a mut ErrorReporter,
}

impl<'a> TypePass<'a> {
    pub fn new(
        types: &'a mut TypeInterner,
        symbols: &'a mut SymbolTable,
        dec: &'a mut TreeDecoration,
        errors: &'a mut ErrorReporter,
    ) -> Self {
        TypePass {
            types,
            symbols,
            dec,
            errors,
        }
    }

    pub fn run(&mut self, program: &Program) {
        let _span = tracing::debug_span!("type_pass").entered();
        for function in &program.functions {
            self.visit_function(function);
        }
    }

    fn visit_function(&mut self, function: &Function) {
        tracing::debug!(name = %function.name, "type_pass: function");
        let scope = self
            .dec
            .scope(function.id)
            .expect("symbol_pass must decorate every function with its scope");
        self.symbols.push_this_scope(self.symbols.global_scope());
        self.symbols.push_this_scope(scope);
        for stmt in &function.body {
            self.visit_stmt(stmt);
        }
        self.symbols.pop_scope();
        self.symbols.pop_scope();
    }

    // ---- expressions ----

    fn visit_expr(&mut self, expr: &Expr) -> TypeId {
        let ty = match &expr.kind {
            ExprKind::IntLit(_) => self.types.basic(BasicType::Int),
            ExprKind::FloatLit(_) => self.types.basic(BasicType::Float),
            ExprKind::BoolLit(_) => self.types.basic(BasicType::Bool),
            ExprKind::CharLit(_) => self.types.basic(BasicType::Char),
            ExprKind::Ident(name) => self.visit_ident_atom(name, expr),
            ExprKind::Paren(inner) => self.visit_expr(inner),
            ExprKind::Unary { op, operand, op_span } => self.visit_unary(*op, operand, *op_span),
            ExprKind::Arith { op, lhs, rhs, op_span } => self.visit_arith(*op, lhs, rhs, *op_span),
            ExprKind::Rel { op, lhs, rhs, op_span } => self.visit_rel(*op, lhs, rhs, *op_span),
            ExprKind::Bool { op, lhs, rhs, op_span } => self.visit_bool(*op, lhs, rhs, *op_span),
            ExprKind::Call { name, name_span, args } => {
                self.visit_call_expr(name, *name_span, args, expr.span)
            }
            ExprKind::Index { name, name_span, index } => {
                self.visit_index_expr(name, *name_span, index)
            }
        };
        self.dec.set_type(expr.id, ty);
        ty
    }

    fn visit_ident_atom(&mut self, name: &str, expr: &Expr) -> TypeId {
        match self.symbols.get_type(name) {
            Some(ty) => ty,
            None => {
                self.errors.report(
                    ErrorKind::UndeclaredIdent {
                        ident: name.to_string(),
                    },
                    expr.span,
                );
                self.types.error()
            }
        }
    }

    fn visit_unary(&mut self, op: UnaryOp, operand: &Expr, op_span: Span) -> TypeId {
        let operand_ty = self.visit_expr(operand);
        if self.types.is_error(operand_ty) {
            return self.types.error();
        }
        match op {
            UnaryOp::Plus | UnaryOp::Minus => {
                if self.types.is_numeric(operand_ty) {
                    operand_ty
                } else {
                    self.report_incompatible_operator(op_unary_name(op), op_span)
                }
            }
            UnaryOp::Not => {
                if self.types.is_bool(operand_ty) {
                    operand_ty
                } else {
                    self.report_incompatible_operator("not", op_span)
                }
            }
        }
    }

    fn visit_arith(
        &mut self,
        op: ArithOp,
        lhs: &Expr,
        rhs: &Expr,
        op_span: Span,
    ) -> TypeId {
        let lhs_ty = self.visit_expr(lhs);
        let rhs_ty = self.visit_expr(rhs);
        if self.types.is_error(lhs_ty) || self.types.is_error(rhs_ty) {
            return self.types.error();
        }
        if self.types.is_numeric(lhs_ty) && self.types.is_numeric(rhs_ty) {
            if self.types.is_float(lhs_ty) || self.types.is_float(rhs_ty) {
                self.types.basic(BasicType::Float)
            } else {
                self.types.basic(BasicType::Int)
            }
        } else {
            self.report_incompatible_operator(arith_op_name(op), op_span)
        }
    }

    fn visit_rel(&mut self, op: RelOp, lhs: &Expr, rhs: &Expr, op_span: Span) -> TypeId {
        let lhs_ty = self.visit_expr(lhs);
        let rhs_ty = self.visit_expr(rhs);
        if self.types.is_error(lhs_ty) || self.types.is_error(rhs_ty) {
            return self.types.error();
        }
        let cmp_kind = match op {
            RelOp::Eq | RelOp::Ne => CompareOp::Equality,
            RelOp::Lt | RelOp::Le | RelOp::Gt | RelOp::Ge => CompareOp::Ordering,
        };
        if self.types.comparable(lhs_ty, rhs_ty, cmp_kind) {
            self.types.basic(BasicType::Bool)
        } else {
            self.report_incompatible_operator(rel_op_name(op), op_span)
        }
    }

    fn visit_bool(&mut self, op: BoolOp, lhs: &Expr, rhs: &Expr, op_span: Span) -> TypeId {
        let lhs_ty = self.visit_expr(lhs);
        let rhs_ty = self.visit_expr(rhs);
        if self.types.is_error(lhs_ty) || self.types.is_error(rhs_ty) {
            return self.types.error();
        }
        if self.types.is_bool(lhs_ty) && self.types.is_bool(rhs_ty) {
            lhs_ty
        } else {
            let name = match op {
                BoolOp::And => "and",
                BoolOp::Or => "or",
            };
            self.report_incompatible_operator(name, op_span)
        }
    }

    fn visit_call_expr(
        &mut self,
        name: &str,
        name_span: Span,
        args: &[Expr],
        call_span: Span,
    ) -> TypeId {
        let arg_tys: Vec<TypeId> = args.iter().map(|a| self.visit_expr(a)).collect();
        let Some(sig) = self.symbols.get_type(name) else {
            self.errors.report(
                ErrorKind::UndeclaredIdent {
                    ident: name.to_string(),
                },
                name_span,
            );
            return self.types.error();
        };
        if !self.types.is_function(sig) {
            self.errors.report(
                ErrorKind::IsNotCallable {
                    ident: name.to_string(),
                },
                name_span,
            );
            return self.types.error();
        }
        let ret = self.types.func_return(sig).unwrap();
        if self.types.is_void(ret) {
            self.errors.report(
                ErrorKind::IsNotFunction {
                    ident: name.to_string(),
                },
                call_span,
            );
            return self.types.error();
        }
        self.check_call_arguments(name, name_span, sig, &arg_tys);
        ret
    }

    fn check_call_arguments(
        &mut self,
        name: &str,
        name_span: Span,
        sig: TypeId,
        arg_tys: &[TypeId],
    ) {
        let arity = self.types.func_arity(sig).unwrap_or(0);
        if arity != arg_tys.len() {
            self.errors.report(
                ErrorKind::NumberOfParameters {
                    ident: name.to_string(),
                },
                name_span,
            );
            return;
        }
        for (i, arg_ty) in arg_tys.iter().enumerate() {
            if self.types.is_error(*arg_ty) {
                continue;
            }
            let param_ty = self.types.func_param(sig, i).unwrap();
            if !self.types.copyable(param_ty, *arg_ty) {
                self.errors.report(
                    ErrorKind::IncompatibleParameter {
                        n: i + 1,
                        ident: name.to_string(),
                    },
                    name_span,
                );
            }
        }
    }

    fn visit_index_expr(&mut self, name: &str, name_span: Span, index: &Expr) -> TypeId {
        let index_ty = self.visit_expr(index);
        let Some(base_ty) = self.symbols.get_type(name) else {
            self.errors.report(
                ErrorKind::UndeclaredIdent {
                    ident: name.to_string(),
                },
                name_span,
            );
            return self.types.error();
        };
        if !self.types.is_array(base_ty) {
            self.errors.report(ErrorKind::NonArrayInArrayAccess, name_span);
            return self.types.error();
        }
        if !self.types.is_error(index_ty) && !self.types.is_int(index_ty) {
            self.errors
                .report(ErrorKind::NonIntegerIndexInArrayAccess, index.span);
        }
        self.types.array_elem(base_ty).unwrap()
    }

    fn report_incompatible_operator(&mut self, op: &str, span: Span) -> TypeId {
        self.errors.report(
            ErrorKind::IncompatibleOperator { op: op.to_string() },
            span,
        );
        self.types.error()
    }

    // ---- left-expressions ----

    fn visit_left_expr(&mut self, left: &LeftExpr) -> TypeId {
        let (ty, is_lvalue) = match &left.kind {
            LeftExprKind::Var(name) => match self.symbols.get_type(name) {
                Some(ty) => (ty, !self.types.is_function(ty)),
                None => {
                    self.errors.report(
                        ErrorKind::UndeclaredIdent {
                            ident: name.clone(),
                        },
                        left.span,
                    );
                    (self.types.error(), false)
                }
            },
            LeftExprKind::Index { name, index } => {
                let ty = self.visit_index_expr(name, left.span, index);
                (ty, !self.types.is_error(ty))
            }
        };
        self.dec.set_type(left.id, ty);
        self.dec.set_lvalue(left.id, is_lvalue);
        ty
    }

    // ---- statements ----

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assign { lhs, rhs, assign_span } => self.visit_assign(lhs, rhs, *assign_span),
            StmtKind::If { cond, then_branch, else_branch } => {
                self.check_boolean_guard(cond, "if");
                for s in then_branch {
                    self.visit_stmt(s);
                }
                if let Some(else_branch) = else_branch {
                    for s in else_branch {
                        self.visit_stmt(s);
                    }
                }
            }
            StmtKind::While { cond, body } => {
                self.check_boolean_guard(cond, "while");
                for s in body {
                    self.visit_stmt(s);
                }
            }
            StmtKind::Read { target } => {
                let ty = self.visit_left_expr(target);
                if !self.dec.is_lvalue(target.id).unwrap_or(false) {
                    self.errors.report(
                        ErrorKind::NonReferenceableExpression {
                            context: "read".to_string(),
                        },
                        target.span,
                    );
                } else if !self.types.is_error(ty) && !self.types.is_primitive(ty) {
                    self.errors.report(
                        ErrorKind::ReadWriteRequireBasic {
                            context: "read".to_string(),
                        },
                        target.span,
                    );
                }
            }
            StmtKind::WriteExpr(expr) => {
                let ty = self.visit_expr(expr);
                if !self.types.is_error(ty) && !self.types.is_primitive(ty) {
                    self.errors.report(
                        ErrorKind::ReadWriteRequireBasic {
                            context: "write".to_string(),
                        },
                        expr.span,
                    );
                }
            }
            StmtKind::WriteString { .. } => {}
            StmtKind::Call { name, name_span, args } => self.visit_call_stmt(name, *name_span, args),
            StmtKind::Return { value, span } => self.visit_return(value.as_ref(), *span),
        }
    }

    fn visit_assign(&mut self, lhs: &LeftExpr, rhs: &Expr, assign_span: Span) {
        let lhs_ty = self.visit_left_expr(lhs);
        let rhs_ty = self.visit_expr(rhs);
        if !self.types.is_error(lhs_ty) && !self.dec.is_lvalue(lhs.id).unwrap_or(false) {
            self.errors
                .report(ErrorKind::NonReferenceableLeftExpr, lhs.span);
            return;
        }
        if self.types.is_error(lhs_ty) || self.types.is_error(rhs_ty) {
            return;
        }
        if !self.types.copyable(lhs_ty, rhs_ty) {
            self.errors
                .report(ErrorKind::IncompatibleAssignment, assign_span);
        }
    }

    fn check_boolean_guard(&mut self, cond: &Expr, instr: &str) {
        let ty = self.visit_expr(cond);
        if !self.types.is_error(ty) && !self.types.is_bool(ty) {
            self.errors.report(
                ErrorKind::BooleanRequired {
                    instr: instr.to_string(),
                },
                cond.span,
            );
        }
    }

    fn visit_call_stmt(&mut self, name: &str, name_span: Span, args: &[Expr]) {
        let arg_tys: Vec<TypeId> = args.iter().map(|a| self.visit_expr(a)).collect();
        let Some(sig) = self.symbols.get_type(name) else {
            self.errors.report(
                ErrorKind::UndeclaredIdent {
                    ident: name.to_string(),
                },
                name_span,
            );
            return;
        };
        if !self.types.is_function(sig) {
            self.errors.report(
                ErrorKind::IsNotCallable {
                    ident: name.to_string(),
                },
                name_span,
            );
            return;
        }
        self.check_call_arguments(name, name_span, sig, &arg_tys);
    }

    fn visit_return(&mut self, value: Option<&Expr>, span: Span) {
        let current = self
            .symbols
            .current_function_ty()
            .expect("return statement outside a function body")
            .ty();
        let declared_ret = self.types.func_return(current).unwrap_or_else(|| self.types.void());

        match value {
            None => {
                if !self.types.is_void(declared_ret) {
                    self.errors.report(ErrorKind::IncompatibleReturn, span);
                }
            }
            Some(expr) => {
                let ty = self.visit_expr(expr);
                if self.types.is_void(declared_ret) {
                    self.errors.report(ErrorKind::IncompatibleReturn, span);
                } else if !self.types.is_error(ty) && !self.types.copyable(declared_ret, ty) {
                    self.errors.report(ErrorKind::IncompatibleReturn, span);
                }
            }
        }
    }
}

fn op_unary_name(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Plus => "+",
        UnaryOp::Minus => "-",
        UnaryOp::Not => "not",
    }
}

fn arith_op_name(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
    }
}

fn rel_op_name(op: RelOp) -> &'static str {
    match op {
        RelOp::Eq => "==",
        RelOp::Ne => "!=",
        RelOp::Lt => "<",
        RelOp::Le => "<=",
        RelOp::Gt => ">",
        RelOp::Ge => ">=",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BasicTypeTok, Builder};
    use crate::symbol_pass::SymbolPass;

    fn analyze(program: &Program) -> (TypeInterner, ErrorReporter, TreeDecoration) {
        let mut types = TypeInterner::new();
        let mut symbols = SymbolTable::new();
        let mut dec = TreeDecoration::new();
        let mut errors = ErrorReporter::new();
        let config = CompilerConfig::default();
        SymbolPass::new(&mut types, &mut symbols, &mut dec, &mut errors, &config).run(program);
        TypePass::new(&mut types, &mut symbols, &mut dec, &mut errors).run(program);
        (types, errors, dec)
    }

    #[test]
    fn assignment_widens_int_to_float() {
        let mut b = Builder::new();
        let s = Span::new(1, 1);
        let float_ty = b.basic_type(BasicTypeTok::Float, s);
        let decl = b.var_decl(vec![("f", s)], float_ty);
        let lhs = b.left_var("f", s);
        let rhs = b.int_lit(3, s);
        let assign = b.assign(lhs, rhs, s);
        let f = b.function("main", s, s, vec![], None, vec![decl], vec![assign]);
        let program = Program { functions: vec![f] };

        let (_, errors, _) = analyze(&program);
        assert_eq!(errors.num_errors(), 0);
    }

    #[test]
    fn assignment_incompatible_types_reported() {
        let mut b = Builder::new();
        let s = Span::new(1, 1);
        let bool_ty = b.basic_type(BasicTypeTok::Bool, s);
        let decl = b.var_decl(vec![("flag", s)], bool_ty);
        let lhs = b.left_var("flag", s);
        let rhs = b.int_lit(3, s);
        let assign = b.assign(lhs, rhs, s);
        let f = b.function("main", s, s, vec![], None, vec![decl], vec![assign]);
        let program = Program { functions: vec![f] };

        let (_, errors, _) = analyze(&program);
        assert_eq!(errors.num_errors(), 1);
        assert!(matches!(
            errors.errors()[0].kind,
            ErrorKind::IncompatibleAssignment
        ));
    }

    #[test]
    fn if_requires_boolean_guard() {
        let mut b = Builder::new();
        let s = Span::new(2, 2);
        let cond = b.int_lit(1, s);
        let if_stmt = b.if_stmt(s, cond, vec![], None);
        let f = b.function("main", s, s, vec![], None, vec![], vec![if_stmt]);
        let program = Program { functions: vec![f] };

        let (_, errors, _) = analyze(&program);
        assert_eq!(errors.num_errors(), 1);
        assert!(matches!(
            errors.errors()[0].kind,
            ErrorKind::BooleanRequired { .. }
        ));
    }

    #[test]
    fn call_with_wrong_arity_reports_number_of_parameters() {
        let mut b = Builder::new();
        let s = Span::new(1, 1);
        let int_ty = b.basic_type(BasicTypeTok::Int, s);
        let param = b.param("x", int_ty);
        let callee_ret = b.basic_type(BasicTypeTok::Int, s);
        let ret_stmt = b.return_stmt(s, Some(b.ident("x", s)));
        let callee = b.function("f", s, s, vec![param], Some(callee_ret), vec![], vec![ret_stmt]);

        let call = b.call_stmt("f", s, vec![]);
        let main = b.function("main", s, s, vec![], None, vec![], vec![call]);
        let program = Program {
            functions: vec![callee, main],
        };

        let (_, errors, _) = analyze(&program);
        assert_eq!(errors.num_errors(), 1);
        assert!(matches!(
            errors.errors()[0].kind,
            ErrorKind::NumberOfParameters { .. }
        ));
    }

    #[test]
    fn array_index_must_be_int() {
        let mut b = Builder::new();
        let s = Span::new(1, 1);
        let arr_ty = b.array_type(10, BasicTypeTok::Int, s);
        let decl = b.var_decl(vec![("a", s)], arr_ty);
        let bad_index = b.bool_lit(true, s);
        let idx_expr = b.index_expr("a", s, bad_index);
        let write = b.write_expr_stmt(idx_expr);
        let f = b.function("main", s, s, vec![], None, vec![decl], vec![write]);
        let program = Program { functions: vec![f] };

        let (_, errors, _) = analyze(&program);
        assert_eq!(errors.num_errors(), 1);
        assert!(matches!(
            errors.errors()[0].kind,
            ErrorKind::NonIntegerIndexInArrayAccess
        ));
    }

    #[test]
    fn undeclared_identifier_decorates_error_type_and_suppresses_cascades() {
        let mut b = Builder::new();
        let s = Span::new(1, 1);
        let rhs = b.ident("missing", s);
        let lhs = b.left_var("missing2", s);
        let assign = b.assign(lhs, rhs, s);
        let f = b.function("main", s, s, vec![], None, vec![], vec![assign]);
        let program = Program { functions: vec![f] };

        let (types, errors, dec) = analyze(&program);
        // two undeclared idents, no cascade from IncompatibleAssignment
        assert_eq!(errors.num_errors(), 2);
        assert!(errors
            .errors()
            .iter()
            .all(|e| matches!(e.kind, ErrorKind::UndeclaredIdent { .. })));
        let rhs_id = match &program.functions[0].body[0].kind {
            StmtKind::Assign { rhs, .. } => rhs.id,
            _ => unreachable!(),
        };
        assert!(types.is_error(dec.ty(rhs_id).unwrap()));
    }
}
