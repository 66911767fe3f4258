//! Resolved intermediate representation (HIR).
//!
//! HIR is what the resolver hands to code generation: identifiers are
//! replaced by slot indices, type names by [`ValType`]s, and each block
//! has its value expression split off from its statements.

use crate::ast::{BinaryOp, UnaryOp};
use crate::span::Span;
use crate::types::ValType;

/// Index of a parameter or local within its function. Parameters
/// occupy `0..params.len()`, `let` locals follow.
pub type Slot = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HirProgram {
    pub functions: Vec<HirFunction>,
}

/// A named storage location in a function (parameter or local).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HirLocal {
    pub name: String,
    pub ty: ValType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HirFunction {
    pub name: String,
    pub exported: bool,
    pub params: Vec<HirLocal>,
    /// `let` locals in slot order, starting at slot `params.len()`.
    pub locals: Vec<HirLocal>,
    pub result: ValType,
    pub body: HirBlock,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HirBlock {
    pub stmts: Vec<HirStmt>,
    /// Expression left on the stack when the block falls through.
    pub value: Option<HirExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HirStmt {
    /// Evaluated for effect; any result is discarded.
    Expr(HirExpr),
    Return(HirExpr),
    Let { slot: Slot, init: HirExpr },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HirExpr {
    pub kind: HirExprKind,
    /// `None` for expressions producing no value (assignments).
    /// Statements consult it before dropping.
    pub ty: Option<ValType>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HirExprKind {
    Const(i32),
    Local(Slot),
    Binary {
        op: BinaryOp,
        lhs: Box<HirExpr>,
        rhs: Box<HirExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<HirExpr>,
    },
    /// Store `value` into `slot`. With `op`, the slot's current value is
    /// combined with `value` first.
    Assign {
        slot: Slot,
        op: Option<BinaryOp>,
        value: Box<HirExpr>,
    },
}
