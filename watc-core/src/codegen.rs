//! Code generation: HIR to the stack-machine [`Module`] model.
//!
//! Expressions are lowered post-order, so operands are pushed left to
//! right before their operator. A block value is left on the stack and
//! returned by falling off the end of the function body.

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::CoreError;
use crate::hir::{HirBlock, HirExpr, HirExprKind, HirFunction, HirLocal, HirProgram, HirStmt};
use crate::types::ValType;
use crate::wasm::{Function, Instruction, LocalDecl, Module};

pub fn generate(program: &HirProgram) -> Result<Module, CoreError> {
    let functions = program
        .functions
        .iter()
        .map(generate_function)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Module { functions })
}

fn generate_function(function: &HirFunction) -> Result<Function, CoreError> {
    let mut builder = FunctionBuilder::default();
    builder.emit_block(&function.body)?;

    Ok(Function {
        name: function.name.clone(),
        exported: function.exported,
        params: function.params.iter().map(local_decl).collect(),
        result: function.result,
        locals: function.locals.iter().map(local_decl).collect(),
        body: builder.instructions,
    })
}

fn local_decl(local: &HirLocal) -> LocalDecl {
    LocalDecl {
        name: local.name.clone(),
        ty: local.ty,
    }
}

#[derive(Default)]
struct FunctionBuilder {
    instructions: Vec<Instruction>,
}

impl FunctionBuilder {
    fn instruction(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    fn emit_block(&mut self, block: &HirBlock) -> Result<(), CoreError> {
        for stmt in &block.stmts {
            self.emit_stmt(stmt)?;
        }
        if let Some(value) = &block.value {
            self.emit_expr(value)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &HirStmt) -> Result<(), CoreError> {
        match stmt {
            HirStmt::Expr(expr) => {
                self.emit_expr(expr)?;
                if expr.ty.is_some() {
                    self.instruction(Instruction::Drop);
                }
            }
            HirStmt::Return(expr) => {
                self.emit_expr(expr)?;
                self.instruction(Instruction::Return);
            }
            HirStmt::Let { slot, init } => {
                self.emit_expr(init)?;
                self.instruction(Instruction::LocalSet(*slot));
            }
        }
        Ok(())
    }

    fn emit_expr(&mut self, expr: &HirExpr) -> Result<(), CoreError> {
        match &expr.kind {
            HirExprKind::Const(value) => self.instruction(Instruction::I32Const(*value)),
            HirExprKind::Local(slot) => self.instruction(Instruction::LocalGet(*slot)),
            HirExprKind::Binary { op, lhs, rhs } => {
                if lhs.ty != rhs.ty {
                    return Err(CoreError::codegen(format!(
                        "operands of {op:?} have different types ({:?} and {:?})",
                        lhs.ty, rhs.ty
                    )));
                }
                let instruction = binary_instruction(*op, lhs.ty)?;
                self.emit_expr(lhs)?;
                self.emit_expr(rhs)?;
                self.instruction(instruction);
            }
            HirExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                // 0 - operand
                let zero = zero_of(operand.ty)?;
                let sub = binary_instruction(BinaryOp::Sub, operand.ty)?;
                self.instruction(zero);
                self.emit_expr(operand)?;
                self.instruction(sub);
            }
            HirExprKind::Assign { slot, op, value } => match op {
                Some(op) => {
                    let instruction = binary_instruction(*op, value.ty)?;
                    self.instruction(Instruction::LocalGet(*slot));
                    self.emit_expr(value)?;
                    self.instruction(instruction);
                    self.instruction(Instruction::LocalSet(*slot));
                }
                None => {
                    self.emit_expr(value)?;
                    self.instruction(Instruction::LocalSet(*slot));
                }
            },
        }
        Ok(())
    }
}

fn binary_instruction(op: BinaryOp, ty: Option<ValType>) -> Result<Instruction, CoreError> {
    match (ty, op) {
        (Some(ValType::I32), BinaryOp::Add) => Ok(Instruction::I32Add),
        (Some(ValType::I32), BinaryOp::Sub) => Ok(Instruction::I32Sub),
        (Some(ValType::I32), BinaryOp::Mul) => Ok(Instruction::I32Mul),
        (Some(ValType::I32), BinaryOp::Div) => Ok(Instruction::I32DivS),
        (None, _) => Err(CoreError::codegen(format!(
            "operator {op:?} applied to an expression without a value"
        ))),
    }
}

fn zero_of(ty: Option<ValType>) -> Result<Instruction, CoreError> {
    match ty {
        Some(ValType::I32) => Ok(Instruction::I32Const(0)),
        None => Err(CoreError::codegen(
            "negation applied to an expression without a value",
        )),
    }
}
