// bolt-vm - Function prototypes
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Compiled function templates and the program that owns them.

use bolt_parser::Span;

use crate::instruction::Instruction;
use crate::value::BoltValue;

/// A compiled function: code, constants and register metadata.
#[derive(Debug, Clone, Default)]
pub struct Prototype {
    /// Number of parameters, held in registers `0..arity`.
    pub arity: usize,

    /// Number of variables defined in the body, held after the parameters.
    pub n_locals: usize,

    /// Constant pool. Append-only, deduplicated.
    pub constants: Vec<BoltValue>,

    /// The instructions.
    pub code: Vec<Instruction>,

    /// Debug info: source position of each instruction.
    /// Same length as `code`.
    pub lines: Vec<Span>,

    /// Register high-water mark during compilation. Equals
    /// `arity + n_locals` once compilation has finished.
    pub next_reg: usize,

    /// Peak of `next_reg`; sizes the register window of a call frame.
    pub register_count: usize,
}

impl Prototype {
    /// A prototype with its named registers reserved.
    pub fn new(arity: usize, n_locals: usize) -> Self {
        let named = arity + n_locals;
        Self {
            arity,
            n_locals,
            next_reg: named,
            register_count: named,
            ..Self::default()
        }
    }

    /// Number of registers reserved for parameters and locals.
    pub fn named_registers(&self) -> usize {
        self.arity + self.n_locals
    }

    /// Append an instruction and return its offset.
    pub fn emit(&mut self, instruction: Instruction, span: Span) -> usize {
        self.code.push(instruction);
        self.lines.push(span);
        self.code.len() - 1
    }

    /// Add a constant to the pool and return its index.
    ///
    /// Returns `None` if the pool is full (> u16::MAX entries).
    pub fn add_constant(&mut self, value: BoltValue) -> Option<u16> {
        if let Some(i) = self.constants.iter().position(|c| c.same_constant(&value)) {
            return u16::try_from(i).ok();
        }
        let index = u16::try_from(self.constants.len()).ok()?;
        self.constants.push(value);
        Some(index)
    }

    /// Point the jump at `offset` to the next instruction to be emitted.
    ///
    /// Returns `None` if the distance does not fit in 16 bits or `offset`
    /// is not an instruction.
    pub fn patch_jump(&mut self, offset: usize) -> Option<()> {
        let distance = u16::try_from(self.code.len().checked_sub(offset + 1)?).ok()?;
        let slot = self.code.get_mut(offset)?;
        *slot = slot.with_imm16(distance);
        Some(())
    }

    /// Source position of the instruction at `offset`.
    pub fn span_at(&self, offset: usize) -> Option<Span> {
        self.lines.get(offset).copied()
    }
}

/// The output of the compiler.
///
/// Prototype 0 is the implicit top-level procedure; nested lambdas follow in
/// the order the compiler reaches them.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub prototypes: Vec<Prototype>,
}

impl Program {
    pub fn new(prototypes: Vec<Prototype>) -> Self {
        Self { prototypes }
    }

    /// The top-level prototype.
    pub fn entry(&self) -> Option<&Prototype> {
        self.prototypes.first()
    }

    pub fn get(&self, index: usize) -> Option<&Prototype> {
        self.prototypes.get(index)
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }
}
