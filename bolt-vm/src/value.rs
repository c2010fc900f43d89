// bolt-vm - Runtime values
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime values.
//!
//! Integers, floats and booleans are plain data. Cons cells and closures live
//! in the VM heap and are referred to by generational handles; a value never
//! owns the object it points at.

use std::fmt;

use bolt_parser::Symbol;

use crate::heap::HeapRef;
use crate::native::Primitive;
use crate::vm::{Interrupt, Vm};

/// Signature of a native primitive. Arguments are read with
/// [`Vm::native_args`] and the result is written to register 0.
pub type NativeFn = fn(&mut Vm) -> Result<(), Interrupt>;

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Symbol(Symbol),
    Cons(HeapRef),
    Closure(HeapRef),
}

impl BoltValue {
    /// Short name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            BoltValue::Integer(_) => "integer",
            BoltValue::Float(_) => "float",
            BoltValue::Boolean(_) => "boolean",
            BoltValue::Symbol(_) => "symbol",
            BoltValue::Cons(_) => "cons",
            BoltValue::Closure(_) => "closure",
        }
    }

    /// Only `#f` is false.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, BoltValue::Boolean(false))
    }

    /// The heap object this value refers to, if any.
    pub fn heap_ref(&self) -> Option<HeapRef> {
        match self {
            BoltValue::Cons(r) | BoltValue::Closure(r) => Some(*r),
            _ => None,
        }
    }

    /// Numeric view used by the promotion rule.
    pub(crate) fn as_float(&self) -> Option<f64> {
        match self {
            BoltValue::Integer(n) => Some(*n as f64),
            BoltValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Language-level equality.
    ///
    /// Integers compare as integers; if either side is a float both are
    /// promoted and compared under IEEE-754 total order. Booleans compare by
    /// value and closures by identity. Every other pairing, including any
    /// cons or symbol operand, is an `IncompatibleTypes` interrupt.
    pub fn equals(&self, other: &BoltValue) -> Result<bool, Interrupt> {
        match (self, other) {
            (BoltValue::Integer(a), BoltValue::Integer(b)) => Ok(a == b),
            (BoltValue::Boolean(a), BoltValue::Boolean(b)) => Ok(a == b),
            (BoltValue::Closure(a), BoltValue::Closure(b)) => Ok(a == b),
            (BoltValue::Float(_), BoltValue::Integer(_) | BoltValue::Float(_))
            | (BoltValue::Integer(_), BoltValue::Float(_)) => {
                let (a, b) = (self.as_float(), other.as_float());
                Ok(matches!((a, b), (Some(a), Some(b)) if a.total_cmp(&b).is_eq()))
            }
            _ => Err(Interrupt::incompatible("=", self, other)),
        }
    }

    /// Constant-pool identity: same variant and same bits.
    pub fn same_constant(&self, other: &BoltValue) -> bool {
        match (self, other) {
            (BoltValue::Integer(a), BoltValue::Integer(b)) => a == b,
            (BoltValue::Float(a), BoltValue::Float(b)) => a.to_bits() == b.to_bits(),
            (BoltValue::Boolean(a), BoltValue::Boolean(b)) => a == b,
            (BoltValue::Symbol(a), BoltValue::Symbol(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for BoltValue {
    fn from(n: i64) -> Self {
        BoltValue::Integer(n)
    }
}

impl From<f64> for BoltValue {
    fn from(n: f64) -> Self {
        BoltValue::Float(n)
    }
}

impl From<bool> for BoltValue {
    fn from(b: bool) -> Self {
        BoltValue::Boolean(b)
    }
}

/// Formats a float with at least one decimal place.
pub(crate) fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

/// A native primitive bound to its implementation.
#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub primitive: Primitive,
    pub function: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.primitive.name())
    }
}

/// The only callable value.
#[derive(Debug, Clone, Copy)]
pub enum Closure {
    /// A host function implementing a primitive operator.
    Native(NativeFunction),
    /// A compiled procedure: index of its prototype in the loaded program.
    Virtual(usize),
}
