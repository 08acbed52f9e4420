//! SCSS-to-CSS compilation pipeline.
//!
//! This crate provides:
//! - A one-pass lexer and recursive-descent parser producing a typed AST
//! - A semantic processor resolving variables, mixins, functions, and
//!   nested-selector flattening
//! - A code generator with pretty and minified output
//! - An orchestrating engine whose `compile()` never raises: failures
//!   are reported inside a structured [`CompilationResult`]
//! - A worker actor for off-thread compilation with request/response
//!   correlation by id
//!
//! Every compile call owns its own registries and stacks; the only
//! shared state is the immutable builtin function registry, which makes
//! concurrent compilations safe by construction.

pub mod ast;
pub mod codegen;
pub mod engine;
pub mod error;
pub mod functions;
pub mod imports;
pub mod lexer;
pub mod parser;
pub mod processor;
pub mod scope;
pub mod value;
pub mod worker;

pub use engine::{
    CompilationResult, CompileState, Compiler, CompilerOptions, PerformanceMetrics, compile,
};
pub use error::{CompilerError, ErrorKind, Result};
pub use imports::{ImportResolver, MemoryImportResolver};
pub use worker::{CompileRequest, CompileResponse, CompileWorker};
