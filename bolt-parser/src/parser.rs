// bolt-parser - Parser for Bolt
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Recursive descent parser for Bolt source code.
//!
//! Converts tokens into `SExpr` nodes, each tagged with the position of its
//! first token.

use thiserror::Error;

use crate::lexer::{Lexer, LexerError, Token};
use crate::sexpr::{SExpr, Span};

/// Parser error with position information.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error at {line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<LexerError> for ParseError {
    fn from(e: LexerError) -> Self {
        ParseError {
            message: e.message,
            line: e.line,
            column: e.column,
        }
    }
}

/// The parser converts tokens into `SExpr` trees.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    span: Span,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source code.
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        let span = start_span(&lexer);
        Ok(Parser {
            lexer,
            current,
            span,
        })
    }

    /// Parse a single form from the source.
    /// Returns None if at end of input.
    pub fn parse(&mut self) -> Result<Option<SExpr>, ParseError> {
        if matches!(self.current, Token::Eof) {
            return Ok(None);
        }
        let form = self.parse_form()?;
        Ok(Some(form))
    }

    /// Parse all forms from the source.
    pub fn parse_all(&mut self) -> Result<Vec<SExpr>, ParseError> {
        let mut forms = Vec::new();
        while let Some(form) = self.parse()? {
            forms.push(form);
        }
        Ok(forms)
    }

    /// Parse a string and return the first form.
    pub fn parse_str(source: &str) -> Result<Option<SExpr>, ParseError> {
        let mut parser = Parser::new(source)?;
        parser.parse()
    }

    /// Parse a string and return all forms.
    pub fn parse_all_str(source: &str) -> Result<Vec<SExpr>, ParseError> {
        let mut parser = Parser::new(source)?;
        parser.parse_all()
    }

    // ========================================================================
    // Internal parsing methods
    // ========================================================================

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        self.span = start_span(&self.lexer);
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            line: self.span.line,
            column: self.span.column,
        }
    }

    fn parse_form(&mut self) -> Result<SExpr, ParseError> {
        let span = self.span;
        match &self.current {
            Token::Int(n) => {
                let n = *n;
                self.advance()?;
                Ok(SExpr::int(n, span))
            }
            Token::Float(n) => {
                let n = *n;
                self.advance()?;
                Ok(SExpr::float(n, span))
            }
            Token::Bool(b) => {
                let b = *b;
                self.advance()?;
                Ok(SExpr::bool(b, span))
            }
            Token::String(s) => {
                let s = s.clone();
                self.advance()?;
                Ok(SExpr::string(s, span))
            }
            Token::Symbol(s) => {
                let s = s.clone();
                self.advance()?;
                Ok(SExpr::symbol(&s, span))
            }
            Token::LParen => self.parse_list(),
            Token::RParen => Err(self.error("Unexpected ')'".to_string())),
            Token::Eof => Err(self.error("Unexpected end of input".to_string())),
        }
    }

    fn parse_list(&mut self) -> Result<SExpr, ParseError> {
        let open = self.span;
        self.advance()?; // consume (
        let mut elements = Vec::new();

        while !matches!(self.current, Token::RParen | Token::Eof) {
            elements.push(self.parse_form()?);
        }

        if matches!(self.current, Token::Eof) {
            return Err(ParseError {
                message: "Unterminated list".to_string(),
                line: open.line,
                column: open.column,
            });
        }
        self.advance()?; // consume )
        Ok(SExpr::list(elements, open))
    }
}

fn start_span(lexer: &Lexer<'_>) -> Span {
    let (line, column) = lexer.token_start();
    Span::new(line, column)
}

// ============================================================================
// Tests
// ============================================================================
