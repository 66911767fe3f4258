//! Value types of the language.
//!
//! Only `i32` exists today. Everything that needs a type carries a
//! [`ValType`] so new numeric types slot in without reshaping the AST,
//! HIR or module representation.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValType {
    I32,
}

impl ValType {
    /// Look up a source-level type name.
    pub fn from_name(name: &str) -> Option<ValType> {
        match name {
            "i32" => Some(ValType::I32),
            _ => None,
        }
    }

    /// Name of the type in WAT (`i32`, ...).
    pub fn wat_name(self) -> &'static str {
        match self {
            ValType::I32 => "i32",
        }
    }
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wat_name())
    }
}
