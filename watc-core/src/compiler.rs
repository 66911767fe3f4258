use crate::codegen::generate;
use crate::emit::emit;
use crate::error::CoreError;
use crate::parser::parse;
use crate::resolver::resolve;
use crate::wasm::Module;

/// Compile `source` to WAT module text.
///
/// Each call is independent; nothing is shared between invocations.
pub fn compile(source: &str) -> Result<String, CoreError> {
    let module = compile_module(source)?;
    Ok(emit(&module))
}

/// Run every stage except emission.
pub fn compile_module(source: &str) -> Result<Module, CoreError> {
    let program = parse(source)?;
    let program = resolve(&program)?;
    generate(&program)
}
