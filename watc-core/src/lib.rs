//! Core compiler pipeline for watc.
//!
//! Translates the watc source language into WebAssembly text format:
//!
//!   source text
//!     -> lexer     (lazy tokens)
//!     -> parser    (AST)
//!     -> resolver  (slots + types, HIR)
//!     -> codegen   (stack-machine module model)
//!     -> emit      (WAT text)
//!
//! The crate performs no I/O. Assembling the text into a binary and
//! running it are left to callers such as `watc-cli`.

// ---------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------

pub mod error;
pub mod span;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod ast;
pub mod lexer;
pub mod parser;

// ---------------------------------------------------------------------
// Semantic layers: types, scopes, resolution, HIR
// ---------------------------------------------------------------------

pub mod hir;
pub mod resolver;
pub mod scope;
pub mod types;

// ---------------------------------------------------------------------
// Back-end: code generation, emission and the compiler driver
// ---------------------------------------------------------------------

pub mod codegen;
pub mod compiler;
pub mod emit;
pub mod wasm;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use codegen::generate;
pub use compiler::{compile, compile_module};
pub use emit::emit;
pub use error::{CoreError, Stage};
pub use lexer::tokenize;
pub use parser::{parse, parse_tokens};
pub use resolver::resolve;
