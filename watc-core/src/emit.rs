//! Serialization of a [`Module`] into WebAssembly text format.
//!
//! Instructions address locals by index. Declarations carry a `$name`
//! only for the first use of that name within a function, so shadowed
//! `let` bindings never produce duplicate identifiers.

use std::collections::HashSet;

use crate::wasm::{Function, LocalDecl, Module};

const INDENT: &str = "  ";

pub fn emit(module: &Module) -> String {
    let mut out = String::from("(module\n");
    for function in &module.functions {
        emit_function(&mut out, function);
    }
    for function in module.exports() {
        out.push_str(&format!(
            "{INDENT}(export \"{name}\" (func ${name}))\n",
            name = function.name
        ));
    }
    out.push_str(")\n");
    out
}

fn emit_function(out: &mut String, function: &Function) {
    let mut names = HashSet::new();

    out.push_str(&format!("{INDENT}(func ${}", function.name));
    for param in &function.params {
        declare(out, "param", param, &mut names);
    }
    out.push_str(&format!(" (result {})", function.result));
    for local in &function.locals {
        declare(out, "local", local, &mut names);
    }
    out.push('\n');

    for instruction in &function.body {
        out.push_str(&format!("{INDENT}{INDENT}{instruction}\n"));
    }
    out.push_str(&format!("{INDENT})\n"));
}

fn declare<'a>(out: &mut String, keyword: &str, decl: &'a LocalDecl, names: &mut HashSet<&'a str>) {
    if names.insert(decl.name.as_str()) {
        out.push_str(&format!(" ({keyword} ${} {})", decl.name, decl.ty));
    } else {
        out.push_str(&format!(" ({keyword} {})", decl.ty));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValType;
    use crate::wasm::Instruction;

    fn decl(name: &str) -> LocalDecl {
        LocalDecl {
            name: name.to_string(),
            ty: ValType::I32,
        }
    }

    #[test]
    fn emits_functions_then_exports() {
        let module = Module {
            functions: vec![
                Function {
                    name: "helper".to_string(),
                    exported: false,
                    params: vec![decl("a")],
                    result: ValType::I32,
                    locals: Vec::new(),
                    body: vec![Instruction::LocalGet(0)],
                },
                Function {
                    name: "main".to_string(),
                    exported: true,
                    params: Vec::new(),
                    result: ValType::I32,
                    locals: Vec::new(),
                    body: vec![Instruction::I32Const(7), Instruction::Return],
                },
            ],
        };
        let expected = "\
(module
  (func $helper (param $a i32) (result i32)
    local.get 0
  )
  (func $main (result i32)
    i32.const 7
    return
  )
  (export \"main\" (func $main))
)
";
        assert_eq!(emit(&module), expected);
    }

    #[test]
    fn shadowed_names_are_declared_once() {
        let module = Module {
            functions: vec![Function {
                name: "f".to_string(),
                exported: false,
                params: vec![decl("x")],
                result: ValType::I32,
                locals: vec![decl("x"), decl("y"), decl("x")],
                body: vec![Instruction::LocalGet(3)],
            }],
        };
        let text = emit(&module);
        assert!(text.contains(
            "(func $f (param $x i32) (result i32) (local i32) (local $y i32) (local i32)"
        ));
    }

    #[test]
    fn empty_module() {
        assert_eq!(emit(&Module::default()), "(module\n)\n");
    }
}
