// bolt-embed - Error type
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Errors surfaced by the embedding API.

use std::path::PathBuf;

use bolt_parser::ParseError;
use bolt_vm::{CompileError, RuntimeError};
use thiserror::Error;

/// Any failure between source text and a Rust value.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("Type error: expected {expected}, got {got}")]
    Conversion {
        expected: &'static str,
        got: &'static str,
    },
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn conversion(expected: &'static str, got: &'static str) -> Self {
        Error::Conversion { expected, got }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
