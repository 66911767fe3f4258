//! In-memory model of the generated WebAssembly module.
//!
//! This is the code generator's output and the emitter's input. It is
//! deliberately close to the text format: one [`Instruction`] per line
//! of a function body.

use core::fmt;

use crate::types::ValType;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Module {
    pub functions: Vec<Function>,
}

impl Module {
    /// Exported functions, in declaration order.
    pub fn exports(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|function| function.exported)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDecl {
    pub name: String,
    pub ty: ValType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub exported: bool,
    /// Parameters, slots `0..params.len()`.
    pub params: Vec<LocalDecl>,
    pub result: ValType,
    /// Additional locals, slots `params.len()..`.
    pub locals: Vec<LocalDecl>,
    pub body: Vec<Instruction>,
}

impl Function {
    /// Parameters plus locals.
    pub fn slot_count(&self) -> usize {
        self.params.len() + self.locals.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    I32Const(i32),
    LocalGet(u32),
    LocalSet(u32),
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    Drop,
    Return,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::I32Const(value) => write!(f, "i32.const {value}"),
            Instruction::LocalGet(slot) => write!(f, "local.get {slot}"),
            Instruction::LocalSet(slot) => write!(f, "local.set {slot}"),
            Instruction::I32Add => f.write_str("i32.add"),
            Instruction::I32Sub => f.write_str("i32.sub"),
            Instruction::I32Mul => f.write_str("i32.mul"),
            Instruction::I32DivS => f.write_str("i32.div_s"),
            Instruction::Drop => f.write_str("drop"),
            Instruction::Return => f.write_str("return"),
        }
    }
}
