// bolt-vm - Compiler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: transforms Bolt S-expressions to prototypes.
//!
//! The compiler operates in two phases:
//! 1. Analysis: validate forms, resolve symbols, assign registers
//! 2. Code generation: emit register bytecode, one prototype per lambda

pub mod analysis;
pub mod ast;
pub mod codegen;
pub mod scope;
pub mod types;

use bolt_parser::SExpr;

use crate::prototype::Program;

pub use analysis::{AnalyzedProgram, SemanticAnalyzer};
pub use ast::{Atom, AtomicNode, Callee, Define, IfExpr, Lambda, Node, ProcCall, Resolution};
pub use codegen::Compiler;
pub use scope::{Binding, BindingKind, Scope, ScopeId, ScopeTable};
pub use types::{CompileError, CompileOptions, Keyword, Result, MAX_REGISTERS};

/// Analyze and compile a sequence of top-level forms.
pub fn compile(forms: &[SExpr], options: CompileOptions) -> Result<Program> {
    let analyzed = SemanticAnalyzer::new().verify(forms)?;
    Compiler::new(options).compile(&analyzed)
}
