//! Name and type resolution: AST to HIR.
//!
//! Each function gets a fresh [`ScopeStack`]: one frame for its
//! parameters and one for its body. Parameters take slots in list order,
//! `let` bindings take the next free slot when declared. A `let` may
//! shadow any earlier binding; the shadowing binding is visible only
//! after its initializer.

use std::collections::HashSet;

use crate::ast::{Block, Expr, ExprKind, FunctionDecl, Program, Stmt, TypeName};
use crate::error::CoreError;
use crate::hir::{HirBlock, HirExpr, HirExprKind, HirFunction, HirLocal, HirProgram, HirStmt, Slot};
use crate::scope::ScopeStack;
use crate::span::Span;
use crate::types::ValType;

pub fn resolve(program: &Program) -> Result<HirProgram, CoreError> {
    let mut seen = HashSet::new();
    for function in &program.functions {
        if !seen.insert(function.name.name.as_str()) {
            return Err(CoreError::DuplicateFunction {
                name: function.name.name.clone(),
                position: function.name.span.start,
            });
        }
    }

    let functions = program
        .functions
        .iter()
        .map(|function| FunctionResolver::new().resolve(function))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HirProgram { functions })
}

fn resolve_type(ty: &TypeName) -> Result<ValType, CoreError> {
    ValType::from_name(&ty.name).ok_or_else(|| CoreError::UnknownType {
        name: ty.name.clone(),
        position: ty.span.start,
    })
}

fn check_type(
    expected: ValType,
    found: Option<ValType>,
    span: Span,
) -> Result<(), CoreError> {
    if found == Some(expected) {
        Ok(())
    } else {
        Err(CoreError::TypeMismatch {
            expected: expected.to_string(),
            found: describe(found),
            position: span.start,
        })
    }
}

fn describe(ty: Option<ValType>) -> String {
    match ty {
        Some(ty) => ty.to_string(),
        None => "no value".to_string(),
    }
}

struct FunctionResolver {
    scope: ScopeStack,
    params: Vec<HirLocal>,
    locals: Vec<HirLocal>,
}

impl FunctionResolver {
    fn new() -> Self {
        FunctionResolver {
            scope: ScopeStack::new(),
            params: Vec::new(),
            locals: Vec::new(),
        }
    }

    fn next_slot(&self) -> Slot {
        (self.params.len() + self.locals.len()) as Slot
    }

    fn resolve(mut self, function: &FunctionDecl) -> Result<HirFunction, CoreError> {
        let result = resolve_type(&function.result)?;

        self.scope.push();
        for param in &function.params {
            let ty = resolve_type(&param.ty)?;
            let slot = self.next_slot();
            if self.scope.bind(&param.name.name, slot).is_some() {
                return Err(CoreError::DuplicateBinding {
                    name: param.name.name.clone(),
                    position: param.name.span.start,
                });
            }
            self.params.push(HirLocal {
                name: param.name.name.clone(),
                ty,
            });
        }

        let body = self.resolve_block(&function.body, result)?;
        self.scope.pop();
        debug_assert_eq!(self.scope.depth(), 0, "unbalanced scope frames");

        let returns = body
            .stmts
            .iter()
            .any(|stmt| matches!(stmt, HirStmt::Return(_)));
        if body.value.is_none() && !returns {
            return Err(CoreError::MissingReturn {
                function: function.name.name.clone(),
                position: function.body.span.end.saturating_sub(1),
            });
        }

        Ok(HirFunction {
            name: function.name.name.clone(),
            exported: function.exported,
            params: self.params,
            locals: self.locals,
            result,
            body,
            span: function.span,
        })
    }

    /// `result` is the enclosing function's return type; returned and
    /// block-value expressions are checked against it.
    fn resolve_block(&mut self, block: &Block, result: ValType) -> Result<HirBlock, CoreError> {
        self.scope.push();

        let value_index = block.value().map(|_| block.stmts.len() - 1);
        let mut stmts = Vec::with_capacity(block.stmts.len());
        let mut value = None;

        for (index, stmt) in block.stmts.iter().enumerate() {
            match stmt {
                Stmt::Expr { expr, .. } if Some(index) == value_index => {
                    let expr = self.resolve_expr(expr)?;
                    check_type(result, expr.ty, expr.span)?;
                    value = Some(expr);
                }
                Stmt::Expr { expr, .. } => {
                    stmts.push(HirStmt::Expr(self.resolve_expr(expr)?));
                }
                Stmt::Return { expr, .. } => {
                    let expr = self.resolve_expr(expr)?;
                    check_type(result, expr.ty, expr.span)?;
                    stmts.push(HirStmt::Return(expr));
                }
                Stmt::Let { name, ty, init } => {
                    let init = self.resolve_expr(init)?;
                    let ty = match ty {
                        Some(declared) => {
                            let declared = resolve_type(declared)?;
                            check_type(declared, init.ty, init.span)?;
                            declared
                        }
                        None => init.ty.ok_or_else(|| CoreError::TypeMismatch {
                            expected: "a value".to_string(),
                            found: describe(None),
                            position: init.span.start,
                        })?,
                    };
                    let slot = self.next_slot();
                    self.locals.push(HirLocal {
                        name: name.name.clone(),
                        ty,
                    });
                    self.scope.bind(&name.name, slot);
                    stmts.push(HirStmt::Let { slot, init });
                }
            }
        }

        self.scope.pop();
        Ok(HirBlock { stmts, value })
    }

    fn resolve_expr(&self, expr: &Expr) -> Result<HirExpr, CoreError> {
        let (kind, ty) = match &expr.kind {
            ExprKind::IntLiteral(value) => (HirExprKind::Const(*value), Some(ValType::I32)),
            ExprKind::Identifier(name) => {
                let slot = self.lookup(name, expr.span)?;
                (HirExprKind::Local(slot), Some(self.slot_type(slot)))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.resolve_expr(lhs)?;
                let rhs = self.resolve_expr(rhs)?;
                let ty = lhs.ty;
                match ty {
                    Some(ty) => check_type(ty, rhs.ty, rhs.span)?,
                    None => {
                        return Err(CoreError::TypeMismatch {
                            expected: "a value".to_string(),
                            found: describe(None),
                            position: lhs.span.start,
                        });
                    }
                }
                (
                    HirExprKind::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    ty,
                )
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.resolve_expr(operand)?;
                let ty = operand.ty;
                (
                    HirExprKind::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    ty,
                )
            }
            ExprKind::Assign { op, target, value } => {
                let slot = self.lookup(&target.name, target.span)?;
                let value = self.resolve_expr(value)?;
                check_type(self.slot_type(slot), value.ty, value.span)?;
                (
                    HirExprKind::Assign {
                        slot,
                        op: op.binary(),
                        value: Box::new(value),
                    },
                    None,
                )
            }
        };
        Ok(HirExpr {
            kind,
            ty,
            span: expr.span,
        })
    }

    fn lookup(&self, name: &str, span: Span) -> Result<Slot, CoreError> {
        self.scope
            .lookup(name)
            .ok_or_else(|| CoreError::UndefinedIdentifier {
                name: name.to_string(),
                position: span.start,
            })
    }

    fn slot_type(&self, slot: Slot) -> ValType {
        let index = slot as usize;
        match self.params.get(index) {
            Some(param) => param.ty,
            None => self.locals[index - self.params.len()].ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::parser::parse;

    fn resolve_source(source: &str) -> Result<HirProgram, CoreError> {
        resolve(&parse(source).expect("parse"))
    }

    #[test]
    fn binds_parameters_to_positional_slots() {
        let program = resolve_source("fn f(a: i32, b: i32): i32 { b - a }").expect("resolve");
        let function = &program.functions[0];
        assert_eq!(function.params.len(), 2);
        let Some(HirExpr {
            kind: HirExprKind::Binary { lhs, rhs, .. },
            ..
        }) = &function.body.value
        else {
            panic!("expected binary block value");
        };
        assert_eq!(lhs.kind, HirExprKind::Local(1));
        assert_eq!(rhs.kind, HirExprKind::Local(0));
    }

    #[test]
    fn rejects_undefined_identifier() {
        let err = resolve_source("export fn main(): i32 { return x; }").unwrap_err();
        assert_eq!(
            err,
            CoreError::UndefinedIdentifier {
                name: "x".to_string(),
                position: 31,
            }
        );
    }

    #[test]
    fn parameters_are_not_visible_in_other_functions() {
        let err = resolve_source("fn f(a: i32): i32 { a } fn g(): i32 { a }").unwrap_err();
        assert!(matches!(err, CoreError::UndefinedIdentifier { ref name, .. } if name == "a"));
    }

    #[test]
    fn requires_value_or_return() {
        let err = resolve_source("fn f(): i32 { 1; }").unwrap_err();
        assert!(matches!(err, CoreError::MissingReturn { ref function, .. } if function == "f"));

        let err = resolve_source("fn f(): i32 { }").unwrap_err();
        assert!(matches!(err, CoreError::MissingReturn { .. }));

        resolve_source("fn f(): i32 { return 1; }").expect("explicit return");
        resolve_source("fn f(): i32 { 1 }").expect("block value");
    }

    #[test]
    fn splits_block_value_from_statements() {
        let program = resolve_source("fn f(): i32 { 1; 2 }").expect("resolve");
        let body = &program.functions[0].body;
        assert_eq!(body.stmts.len(), 1);
        assert!(matches!(
            body.value,
            Some(HirExpr {
                kind: HirExprKind::Const(2),
                ..
            })
        ));
    }

    #[test]
    fn let_bindings_take_slots_after_parameters() {
        let program =
            resolve_source("fn f(a: i32): i32 { let b = a; let c: i32 = b; c }").expect("resolve");
        let function = &program.functions[0];
        assert_eq!(function.locals.len(), 2);
        assert_eq!(function.locals[0].name, "b");
        assert!(matches!(function.body.stmts[0], HirStmt::Let { slot: 1, .. }));
        assert!(matches!(function.body.stmts[1], HirStmt::Let { slot: 2, .. }));
        assert!(matches!(
            function.body.value,
            Some(HirExpr {
                kind: HirExprKind::Local(2),
                ..
            })
        ));
    }

    #[test]
    fn shadowing_let_sees_previous_binding_in_initializer() {
        let program = resolve_source("fn f(x: i32): i32 { let x = x + 1; x }").expect("resolve");
        let function = &program.functions[0];
        let HirStmt::Let { slot, init } = &function.body.stmts[0] else {
            panic!("expected let");
        };
        assert_eq!(*slot, 1);
        let HirExprKind::Binary { lhs, .. } = &init.kind else {
            panic!("expected binary initializer");
        };
        assert_eq!(lhs.kind, HirExprKind::Local(0));
        assert!(matches!(
            function.body.value,
            Some(HirExpr {
                kind: HirExprKind::Local(1),
                ..
            })
        ));
    }

    #[test]
    fn let_is_not_visible_in_its_own_initializer() {
        let err = resolve_source("fn f(): i32 { let y = y; y }").unwrap_err();
        assert!(matches!(err, CoreError::UndefinedIdentifier { ref name, .. } if name == "y"));
    }

    #[test]
    fn rejects_duplicate_parameters() {
        let err = resolve_source("fn f(a: i32, a: i32): i32 { a }").unwrap_err();
        assert!(matches!(err, CoreError::DuplicateBinding { ref name, position: 13 } if name == "a"));
    }

    #[test]
    fn rejects_duplicate_functions() {
        let err = resolve_source("fn f(): i32 { 1 } fn f(): i32 { 2 }").unwrap_err();
        assert!(matches!(err, CoreError::DuplicateFunction { ref name, .. } if name == "f"));
    }

    #[test]
    fn rejects_unknown_types() {
        let err = resolve_source("fn f(): f64 { 1 }").unwrap_err();
        assert!(matches!(err, CoreError::UnknownType { ref name, .. } if name == "f64"));

        let err = resolve_source("fn f(a: bool): i32 { 1 }").unwrap_err();
        assert!(matches!(err, CoreError::UnknownType { ref name, .. } if name == "bool"));

        let err = resolve_source("fn f(): i32 { let a: u8 = 1; a }").unwrap_err();
        assert!(matches!(err, CoreError::UnknownType { ref name, .. } if name == "u8"));
    }

    #[test]
    fn assignment_targets_existing_slot() {
        let program =
            resolve_source("fn f(a: i32): i32 { let b = 1; a = 2; b += a; b }").expect("resolve");
        let stmts = &program.functions[0].body.stmts;
        let HirStmt::Expr(set) = &stmts[1] else {
            panic!("expected expression statement");
        };
        assert_eq!(set.ty, None);
        assert!(matches!(set.kind, HirExprKind::Assign { slot: 0, op: None, .. }));

        let HirStmt::Expr(add) = &stmts[2] else {
            panic!("expected expression statement");
        };
        assert!(matches!(
            add.kind,
            HirExprKind::Assign {
                slot: 1,
                op: Some(BinaryOp::Add),
                ..
            }
        ));
    }

    #[test]
    fn assignment_after_shadowing_targets_newest_binding() {
        let program = resolve_source("fn f(x: i32): i32 { let x = 1; x *= 3; x }").expect("resolve");
        let HirStmt::Expr(assign) = &program.functions[0].body.stmts[1] else {
            panic!("expected expression statement");
        };
        assert!(matches!(assign.kind, HirExprKind::Assign { slot: 1, .. }));
    }

    #[test]
    fn rejects_assignment_to_undefined_name() {
        let err = resolve_source("fn f(): i32 { y = 1; 0 }").unwrap_err();
        assert_eq!(
            err,
            CoreError::UndefinedIdentifier {
                name: "y".to_string(),
                position: 14,
            }
        );

        let err = resolve_source("fn f(): i32 { y -= 1; 0 }").unwrap_err();
        assert!(matches!(err, CoreError::UndefinedIdentifier { ref name, .. } if name == "y"));
    }

    #[test]
    fn assignment_has_no_value() {
        let err = resolve_source("fn f(x: i32): i32 { x = 1 }").unwrap_err();
        assert!(matches!(
            err,
            CoreError::TypeMismatch { ref expected, ref found, position: 20 }
                if expected == "i32" && found == "no value"
        ));

        let err = resolve_source("fn f(x: i32): i32 { return x += 1; }").unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));

        let err = resolve_source("fn f(x: i32): i32 { let y = x = 1; y }").unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { ref expected, .. } if expected == "a value"));

        let err = resolve_source("fn f(x: i32, y: i32): i32 { x = y = 1; x }").unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { position: 32, .. }));
    }
}
