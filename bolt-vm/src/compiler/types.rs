// bolt-vm - Compiler types
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared types for the analyzer and the code generator.

use bolt_parser::Span;
use thiserror::Error;

/// Number of addressable registers per prototype. Register indices are
/// `0..MAX_REGISTERS`.
pub const MAX_REGISTERS: usize = 255;

/// Error during analysis or code generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A special form or application with the wrong shape.
    #[error("Malformed form at {span}: {message}: {form}")]
    MalformedForm {
        form: String,
        message: String,
        span: Span,
    },
    #[error("Undefined symbol '{name}' at {span}")]
    UndefinedSymbol { name: String, span: Span },
    /// More than [`MAX_REGISTERS`] live values in one function.
    #[error("Too many live values in one function at {span}")]
    RegisterExhaustion { span: Span },
    #[error("Unsupported form '{form}' at {span}")]
    UnsupportedForm { form: String, span: Span },
    /// A nested lambda referring to a variable of an enclosing lambda.
    #[error("Cannot capture '{name}' (bound at {bound_at}) from an enclosing lambda at {span}")]
    CaptureNotSupported {
        name: String,
        bound_at: Span,
        span: Span,
    },
    #[error("Too many constants in one function at {span}")]
    TooManyConstants { span: Span },
    #[error("Jump distance does not fit in 16 bits at {span}")]
    JumpOutOfRange { span: Span },
    #[error("Too many lambdas in one program at {span}")]
    TooManyPrototypes { span: Span },
}

impl CompileError {
    /// Source position of the offending construct.
    pub fn span(&self) -> Span {
        match self {
            CompileError::MalformedForm { span, .. }
            | CompileError::UndefinedSymbol { span, .. }
            | CompileError::RegisterExhaustion { span }
            | CompileError::UnsupportedForm { span, .. }
            | CompileError::CaptureNotSupported { span, .. }
            | CompileError::TooManyConstants { span }
            | CompileError::JumpOutOfRange { span }
            | CompileError::TooManyPrototypes { span } => *span,
        }
    }

    pub(crate) fn malformed(form: impl ToString, message: &str, span: Span) -> Self {
        CompileError::MalformedForm {
            form: form.to_string(),
            message: message.to_string(),
            span,
        }
    }
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// Reserved words. None of them can be bound or used as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Lambda,
    Define,
    Let,
    Begin,
    Cond,
    And,
    Or,
    Set,
    Quote,
}

impl Keyword {
    pub const ALL: [Keyword; 10] = [
        Keyword::If,
        Keyword::Lambda,
        Keyword::Define,
        Keyword::Let,
        Keyword::Begin,
        Keyword::Cond,
        Keyword::And,
        Keyword::Or,
        Keyword::Set,
        Keyword::Quote,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Lambda => "lambda",
            Keyword::Define => "define",
            Keyword::Let => "let",
            Keyword::Begin => "begin",
            Keyword::Cond => "cond",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Set => "set!",
            Keyword::Quote => "quote",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// Code generation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileOptions {
    /// Lower two-argument arithmetic and comparison calls to the
    /// three-register opcodes instead of `call_native`.
    pub inline_primitives: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_round_trip_by_name() {
        for keyword in Keyword::ALL {
            assert_eq!(Keyword::from_name(keyword.name()), Some(keyword));
        }
        assert_eq!(Keyword::from_name("set!"), Some(Keyword::Set));
        assert_eq!(Keyword::from_name("car"), None);
    }

    #[test]
    fn error_carries_span() {
        let err = CompileError::UndefinedSymbol {
            name: "foo".into(),
            span: Span::new(3, 7),
        };
        assert_eq!(err.span(), Span::new(3, 7));
        assert_eq!(err.to_string(), "Undefined symbol 'foo' at 3:7");
    }
}
