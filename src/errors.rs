//! Semantic error taxonomy and the `ErrorReporter` that accumulates them.
//!
//! Every variant below corresponds to one diagnostic a pass can raise.
//!
//! No `thiserror`: the hand-rolled `Display` plus `std::error::Error`
//! pattern here follows `codegen/error.rs`, the same way this
//! crate's own code-generation errors are implemented.

use std::fmt;

use crate::ast::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    DeclaredIdent { ident: String },
    UndeclaredIdent { ident: String },
    IncompatibleAssignment,
    NonReferenceableLeftExpr,
    IncompatibleOperator { op: String },
    NonArrayInArrayAccess,
    NonIntegerIndexInArrayAccess,
    BooleanRequired { instr: String },
    IsNotCallable { ident: String },
    IsNotFunction { ident: String },
    NumberOfParameters { ident: String },
    IncompatibleParameter { n: usize, ident: String },
    NonReferenceableExpression { context: String },
    IncompatibleReturn,
    ReadWriteRequireBasic { context: String },
    NoMainProperlyDeclared,
    ArrayTooLarge { max: u32 },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::DeclaredIdent { ident } => {
                write!(f, "Identifier '{ident}' already declared")
            }
            ErrorKind::UndeclaredIdent { ident } => {
                write!(f, "Identifier '{ident}' is undeclared")
            }
            ErrorKind::IncompatibleAssignment => write!(f, "Assignment with incompatible types"),
            ErrorKind::NonReferenceableLeftExpr => {
                write!(f, "Left expression of assignment is not referenceable")
            }
            ErrorKind::IncompatibleOperator { op } => {
                write!(f, "Operator '{op}' with incompatible types")
            }
            ErrorKind::NonArrayInArrayAccess => write!(f, "Array access to a non array operand"),
            ErrorKind::NonIntegerIndexInArrayAccess => {
                write!(f, "Array access with non integer index")
            }
            ErrorKind::BooleanRequired { instr } => {
                write!(f, "Instruction '{instr}' requires a boolean condition")
            }
            ErrorKind::IsNotCallable { ident } => {
                write!(f, "Identifier '{ident}' is not a callable function")
            }
            ErrorKind::IsNotFunction { ident } => {
                write!(f, "Identifier '{ident}' is a void returning function")
            }
            ErrorKind::NumberOfParameters { ident } => write!(
                f,
                "The number of parameters in the call to '{ident}' does not match"
            ),
            ErrorKind::IncompatibleParameter { n, ident } => write!(
                f,
                "Parameter #{n} with incompatible types in call to '{ident}'"
            ),
            ErrorKind::NonReferenceableExpression { context } => {
                write!(f, "Referenceable expression required in '{context}'")
            }
            ErrorKind::IncompatibleReturn => write!(f, "Return with incompatible type"),
            ErrorKind::ReadWriteRequireBasic { context } => {
                write!(f, "Basic type required in '{context}'")
            }
            ErrorKind::NoMainProperlyDeclared => {
                write!(f, "There is no 'main' function properly declared")
            }
            ErrorKind::ArrayTooLarge { max } => {
                write!(f, "Array declaration exceeds the maximum allowed length of {max}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}:{} error: {}.", self.line, self.column, self.kind)
    }
}

impl std::error::Error for CompileError {}

/// Accumulates semantic errors without aborting analysis. A node that
/// provoked an error is decorated with the `Error` type so its parents
/// don't cascade more diagnostics from the same root cause.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    errors: Vec<CompileError>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        ErrorReporter::default()
    }

    pub fn report(&mut self, kind: ErrorKind, span: Span) {
        tracing::warn!(line = span.line, column = span.column, %kind, "semantic error");
        self.errors.push(CompileError {
            kind,
            line: span.line,
            column: span.column,
        });
    }

    pub fn num_errors(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    /// Prints each accumulated error to stdout, one per line, matching
    /// `SemErrors::printErrorLoc` + the per-variant message in the original
    /// implementation.
    pub fn print(&self) {
        for err in &self.errors {
            println!("{err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_format_matches_line_column_contract() {
        let mut reporter = ErrorReporter::new();
        reporter.report(
            ErrorKind::DeclaredIdent {
                ident: "x".to_string(),
            },
            Span::new(3, 7),
        );
        assert_eq!(
            reporter.errors()[0].to_string(),
            "Line 3:7 error: Identifier 'x' already declared."
        );
    }

    #[test]
    fn num_errors_tracks_every_report() {
        let mut reporter = ErrorReporter::new();
        assert_eq!(reporter.num_errors(), 0);
        reporter.report(ErrorKind::IncompatibleAssignment, Span::new(1, 1));
        reporter.report(ErrorKind::IncompatibleReturn, Span::new(2, 1));
        assert_eq!(reporter.num_errors(), 2);
    }
}
