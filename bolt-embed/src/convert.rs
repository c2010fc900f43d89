// bolt-embed - Type conversion traits
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Conversion from Bolt values to Rust types.
//!
//! | Bolt type | Rust type |
//! |-----------|-----------|
//! | integer   | `i64`, `f64` |
//! | float     | `f64` |
//! | boolean   | `bool` |
//! | anything  | `BoltValue` |
//!
//! Cons cells and closures are heap handles and only mean something next to
//! the VM that produced them; use [`Engine::eval_to_string`] to print them.
//!
//! [`Engine::eval_to_string`]: crate::Engine::eval_to_string

use bolt_vm::BoltValue;

use crate::error::{Error, Result};

/// Convert a `BoltValue` into a Rust type.
pub trait FromBoltValue: Sized {
    fn from_bolt_value(value: &BoltValue) -> Result<Self>;
}

impl FromBoltValue for BoltValue {
    fn from_bolt_value(value: &BoltValue) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromBoltValue for i64 {
    fn from_bolt_value(value: &BoltValue) -> Result<Self> {
        match value {
            BoltValue::Integer(n) => Ok(*n),
            other => Err(Error::conversion("integer", other.type_name())),
        }
    }
}

impl FromBoltValue for f64 {
    fn from_bolt_value(value: &BoltValue) -> Result<Self> {
        match value {
            BoltValue::Float(n) => Ok(*n),
            BoltValue::Integer(n) => Ok(*n as f64),
            other => Err(Error::conversion("number", other.type_name())),
        }
    }
}

impl FromBoltValue for bool {
    fn from_bolt_value(value: &BoltValue) -> Result<Self> {
        match value {
            BoltValue::Boolean(b) => Ok(*b),
            other => Err(Error::conversion("boolean", other.type_name())),
        }
    }
}
