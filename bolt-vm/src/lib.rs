// bolt-vm - Semantic analyzer, bytecode compiler and virtual machine for Bolt
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Register bytecode compiler and virtual machine for Bolt.
//!
//! Source forms from `bolt-parser` are analyzed and compiled into a
//! [`Program`] of prototypes, which the [`Vm`] then executes.

pub mod compiler;
pub mod disasm;
pub mod heap;
pub mod instruction;
pub mod native;
pub mod prototype;
pub mod value;
pub mod vm;

pub use compiler::{compile, AnalyzedProgram, CompileError, CompileOptions, Compiler, SemanticAnalyzer};
pub use disasm::{disassemble, disassemble_program};
pub use heap::{Heap, HeapObject, HeapRef};
pub use instruction::{Instruction, Opcode};
pub use native::Primitive;
pub use prototype::{Program, Prototype};
pub use value::{BoltValue, Closure, NativeFn, NativeFunction};
pub use vm::{Interrupt, RuntimeError, Vm, VmConfig};
