// bolt-vm - Arithmetic and comparison
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Arithmetic opcode handlers: add, sub, mul, div, eq, ne, bt, lt, bte, lte.
//!
//! The value-level operations are shared with the native primitives.

use std::cmp::Ordering;

use crate::instruction::{Instruction, Opcode};
use crate::value::BoltValue;
use crate::vm::{Interrupt, Vm};

/// Apply a numeric operation under the promotion rule: two integers stay
/// integers, any float operand promotes both sides to float.
fn binary_num_op<FI, FF>(
    a: &BoltValue,
    b: &BoltValue,
    name: &'static str,
    int_op: FI,
    float_op: FF,
) -> Result<BoltValue, Interrupt>
where
    FI: Fn(i64, i64) -> Result<i64, Interrupt>,
    FF: Fn(f64, f64) -> f64,
{
    match (a, b) {
        (BoltValue::Integer(x), BoltValue::Integer(y)) => Ok(BoltValue::Integer(int_op(*x, *y)?)),
        _ => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => Ok(BoltValue::Float(float_op(x, y))),
            _ => Err(Interrupt::incompatible(name, a, b)),
        },
    }
}

pub(crate) fn add(a: &BoltValue, b: &BoltValue) -> Result<BoltValue, Interrupt> {
    binary_num_op(a, b, "+", |x, y| Ok(x.wrapping_add(y)), |x, y| x + y)
}

pub(crate) fn sub(a: &BoltValue, b: &BoltValue) -> Result<BoltValue, Interrupt> {
    binary_num_op(a, b, "-", |x, y| Ok(x.wrapping_sub(y)), |x, y| x - y)
}

pub(crate) fn mul(a: &BoltValue, b: &BoltValue) -> Result<BoltValue, Interrupt> {
    binary_num_op(a, b, "*", |x, y| Ok(x.wrapping_mul(y)), |x, y| x * y)
}

/// Integer division truncates; dividing an integer by zero interrupts.
pub(crate) fn div(a: &BoltValue, b: &BoltValue) -> Result<BoltValue, Interrupt> {
    binary_num_op(
        a,
        b,
        "/",
        |x, y| {
            if y == 0 {
                Err(Interrupt::DivisionByZero)
            } else {
                Ok(x.wrapping_div(y))
            }
        },
        |x, y| x / y,
    )
}

pub(crate) fn negate(a: &BoltValue) -> Result<BoltValue, Interrupt> {
    match a {
        BoltValue::Integer(n) => Ok(BoltValue::Integer(n.wrapping_neg())),
        BoltValue::Float(n) => Ok(BoltValue::Float(-n)),
        _ => Err(Interrupt::incompatible_unary("-", a)),
    }
}

/// Numeric ordering: signed for integers, IEEE-754 total order otherwise.
pub(crate) fn compare(
    a: &BoltValue,
    b: &BoltValue,
    name: &'static str,
) -> Result<Ordering, Interrupt> {
    match (a, b) {
        (BoltValue::Integer(x), BoltValue::Integer(y)) => Ok(x.cmp(y)),
        _ => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => Ok(x.total_cmp(&y)),
            _ => Err(Interrupt::incompatible(name, a, b)),
        },
    }
}

/// The six relational operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relation {
    Eq,
    Ne,
    Lt,
    Lte,
    Bt,
    Bte,
}

impl Relation {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Relation::Eq => "=",
            Relation::Ne => "!=",
            Relation::Lt => "<",
            Relation::Lte => "<=",
            Relation::Bt => ">",
            Relation::Bte => ">=",
        }
    }

    /// Whether `a <op> b` holds.
    pub(crate) fn holds(self, a: &BoltValue, b: &BoltValue) -> Result<bool, Interrupt> {
        let name = self.name();
        Ok(match self {
            Relation::Eq => a.equals(b)?,
            Relation::Ne => !a.equals(b)?,
            Relation::Lt => compare(a, b, name)?.is_lt(),
            Relation::Lte => compare(a, b, name)?.is_le(),
            Relation::Bt => compare(a, b, name)?.is_gt(),
            Relation::Bte => compare(a, b, name)?.is_ge(),
        })
    }
}

impl Vm {
    /// Execute a three-register arithmetic or comparison opcode.
    pub(crate) fn execute_arithmetic(&mut self, op: Opcode, instr: Instruction) -> Result<(), Interrupt> {
        let a = self.register(instr.rt())?;
        let b = self.register(instr.rs())?;
        let result = match op {
            Opcode::Add => add(&a, &b)?,
            Opcode::Sub => sub(&a, &b)?,
            Opcode::Mul => mul(&a, &b)?,
            Opcode::Div => div(&a, &b)?,
            Opcode::Eq => BoltValue::Boolean(Relation::Eq.holds(&a, &b)?),
            Opcode::Ne => BoltValue::Boolean(Relation::Ne.holds(&a, &b)?),
            Opcode::Lt => BoltValue::Boolean(Relation::Lt.holds(&a, &b)?),
            Opcode::Lte => BoltValue::Boolean(Relation::Lte.holds(&a, &b)?),
            Opcode::Bt => BoltValue::Boolean(Relation::Bt.holds(&a, &b)?),
            Opcode::Bte => BoltValue::Boolean(Relation::Bte.holds(&a, &b)?),
            _ => return Err(Interrupt::UnsupportedOpcode(op as u8)),
        };
        self.set_register(instr.rd(), result)
    }
}
