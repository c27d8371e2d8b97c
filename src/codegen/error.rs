//! Internal invariant violations for [`super::CodeGen`].
//!
//! `CodegenPass` runs after `TypePass` has decorated every node it touches;
//! these variants only fire if that invariant is broken (a node reaches
//! codegen without the decoration an earlier pass should have left), not for
//! anything a source program can trigger. Semantic mistakes in the source
//! are reported by [`crate::errors::ErrorReporter`] and gate codegen off
//! entirely before this module ever runs.

use std::fmt;

use crate::ast::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeGenError {
    MissingTypeDecoration(NodeId),
    MissingScopeDecoration(NodeId),
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeGenError::MissingTypeDecoration(node) => {
                write!(f, "node {node:?} reached codegen without a type decoration")
            }
            CodeGenError::MissingScopeDecoration(node) => {
                write!(f, "node {node:?} reached codegen without a scope decoration")
            }
        }
    }
}

impl std::error::Error for CodeGenError {}
