// bolt-vm - Runtime interrupts
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors for the VM.
//!
//! An [`Interrupt`] halts the run loop immediately. The VM wraps it in a
//! [`RuntimeError`] carrying the machine state at the faulting instruction.

use std::fmt;

use bolt_parser::Span;
use thiserror::Error;

use crate::value::BoltValue;

/// Number of arguments a callee accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, argc: usize) -> bool {
        match self {
            Arity::Exactly(n) => argc == n,
            Arity::AtLeast(n) => argc >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// A fatal condition raised during execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Interrupt {
    #[error("Stack overflow")]
    StackOverflow,
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Incompatible types for {operation}: {operands}")]
    IncompatibleTypes {
        operation: &'static str,
        operands: String,
    },
    #[error("Unsupported opcode {0:#04x}")]
    UnsupportedOpcode(u8),
    #[error("Value is not callable: {0}")]
    NotCallable(&'static str),
    #[error("Wrong number of arguments: expected {expected}, got {got}")]
    ArityMismatch { expected: Arity, got: usize },
    #[error("Register r{0} read before it was written")]
    UninitializedRegister(u16),
    #[error("Instruction pointer {0} is outside the prototype")]
    IpOutOfBounds(usize),
    #[error("No prototype with index {0}")]
    InvalidPrototype(usize),
    #[error("No constant with index {0}")]
    InvalidConstant(u16),
    #[error("No primitive with id {0}")]
    UnknownPrimitive(u16),
    #[error("Reference to a reclaimed heap object")]
    DanglingReference,
    #[error("Heap exhausted")]
    HeapExhausted,
}

impl Interrupt {
    /// `IncompatibleTypes` for a binary operation.
    pub fn incompatible(operation: &'static str, a: &BoltValue, b: &BoltValue) -> Self {
        Interrupt::IncompatibleTypes {
            operation,
            operands: format!("{} and {}", a.type_name(), b.type_name()),
        }
    }

    /// `IncompatibleTypes` for a unary operation.
    pub fn incompatible_unary(operation: &'static str, a: &BoltValue) -> Self {
        Interrupt::IncompatibleTypes {
            operation,
            operands: a.type_name().to_string(),
        }
    }
}

/// An interrupt together with the VM state it was raised in.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{interrupt} (prototype {prototype}, ip {ip}, fp {fp}{})", describe_span(.span))]
pub struct RuntimeError {
    pub interrupt: Interrupt,
    /// Offset of the faulting instruction.
    pub ip: usize,
    pub fp: usize,
    pub prototype: usize,
    /// Source position of the faulting instruction, when known.
    pub span: Option<Span>,
}

fn describe_span(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!(", at {}", span),
        None => String::new(),
    }
}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
