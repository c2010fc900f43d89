// bolt-parser - Lexer and parser for the Bolt language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # bolt-parser
//!
//! Lexer and parser for Bolt, a small Lisp.
//! Produces a position-tagged `SExpr` tree from source code strings.

pub mod lexer;
pub mod parser;
pub mod sexpr;
pub mod symbol;

pub use lexer::{Lexer, LexerError, Token};
pub use parser::{ParseError, Parser};
pub use sexpr::{SExpr, SExprKind, Span};
pub use symbol::Symbol;
