// bolt-embed - Embedding API for Bolt
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # bolt-embed
//!
//! A high-level API for running Bolt code from Rust.
//!
//! ## Quick Start
//!
//! ```rust
//! use bolt_embed::Engine;
//!
//! let mut engine = Engine::new();
//!
//! let sum: i64 = engine.eval_as("(+ 1 2 3)").unwrap();
//! assert_eq!(sum, 6);
//!
//! let pair = engine.eval_to_string("(cons 1 (cons 2.5 #t))").unwrap();
//! assert_eq!(pair, "(1 . (2.5 . #t))");
//! ```
//!
//! ## Listing bytecode
//!
//! ```rust
//! use bolt_embed::Engine;
//!
//! let engine = Engine::new();
//! let listing = engine.disassemble("(+ 1 2)").unwrap();
//! assert!(listing.starts_with("prototype 0"));
//! ```

mod convert;
mod engine;
mod error;

pub use convert::FromBoltValue;
pub use engine::{Engine, EngineConfig};
pub use error::{Error, Result};

pub use bolt_parser::ParseError;
pub use bolt_vm::{BoltValue, CompileError, Interrupt, Program, RuntimeError};
