// bolt-parser - Lexer for Bolt
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexer (tokeniser) for Bolt source code.
//!
//! Converts a source string into a stream of tokens.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Symbol(String),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Int(n) => write!(f, "{}", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::Bool(true) => write!(f, "#t"),
            Token::Bool(false) => write!(f, "#f"),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Symbol(s) => write!(f, "{}", s),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// Lexer error with position information.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Lexer error at {line}:{column}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// The lexer converts source code into tokens.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    token_start: (usize, usize),
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
            token_start: (1, 1),
        }
    }

    /// Get the next token from the source.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace_and_comments();
        self.token_start = (self.line, self.column);

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match c {
            '(' => {
                self.advance();
                Ok(Token::LParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RParen)
            }
            '#' => self.read_boolean(),
            '"' => self.read_string(),
            '-' | '+' => self.read_number_or_symbol(),
            '0'..='9' => self.read_number(String::new()),
            '\'' => Err(self.error("Quote syntax is not supported".to_string())),
            _ if is_symbol_char(c) => self.read_symbol(String::new()),
            _ => Err(self.error(format!("Unexpected character: '{}'", c))),
        }
    }

    /// Collect all tokens into a vector.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if matches!(token, Token::Eof) {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Get the current line number (1-indexed).
    pub fn line(&self) -> usize {
        self.line
    }

    /// Get the current column number (1-indexed).
    pub fn column(&self) -> usize {
        self.column
    }

    /// Line and column where the most recent token began.
    pub fn token_start(&self) -> (usize, usize) {
        self.token_start
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if let Some(ch) = c {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }

    fn error(&self, message: String) -> LexerError {
        LexerError {
            message,
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == ',' => {
                    self.advance();
                }
                Some(';') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_boolean(&mut self) -> Result<Token, LexerError> {
        self.advance(); // consume #

        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_symbol_char(c) {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }

        match name.as_str() {
            "t" | "true" => Ok(Token::Bool(true)),
            "f" | "false" => Ok(Token::Bool(false)),
            "" => Err(self.error("Unexpected end of input after #".to_string())),
            other => Err(self.error(format!("Not a valid boolean: #{}", other))),
        }
    }

    fn read_string(&mut self) -> Result<Token, LexerError> {
        self.advance(); // consume opening "
        let mut s = String::new();

        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('\\') => s.push('\\'),
                    Some('"') => s.push('"'),
                    Some(c) => return Err(self.error(format!("Unknown escape sequence: \\{}", c))),
                    None => return Err(self.error("Unterminated string escape".to_string())),
                },
                Some(c) => s.push(c),
                None => return Err(self.error("Unterminated string".to_string())),
            }
        }

        Ok(Token::String(s))
    }

    fn read_number_or_symbol(&mut self) -> Result<Token, LexerError> {
        let mut prefix = String::new();
        if let Some(sign) = self.advance() {
            prefix.push(sign);
        }

        match self.peek() {
            Some(c) if c.is_ascii_digit() => self.read_number(prefix),
            _ => self.read_symbol(prefix),
        }
    }

    fn read_number(&mut self, mut text: String) -> Result<Token, LexerError> {
        while let Some(c) = self.peek() {
            if is_symbol_char(c) {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        self.parse_number(&text)
    }

    fn parse_number(&self, text: &str) -> Result<Token, LexerError> {
        let digits = text.trim_start_matches(['-', '+']);
        let is_float = digits.contains('.');
        let well_formed = !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
            && digits.matches('.').count() <= 1
            && !digits.ends_with('.');
        if !well_formed {
            return Err(self.error(format!("Invalid number: {}", text)));
        }

        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| self.error(format!("Invalid float: {}", text)))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| self.error(format!("Integer out of range: {}", text)))
        }
    }

    fn read_symbol(&mut self, mut name: String) -> Result<Token, LexerError> {
        while let Some(c) = self.peek() {
            if is_symbol_char(c) {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Ok(Token::Symbol(name))
    }
}

/// Characters that may appear inside a symbol or number.
fn is_symbol_char(c: char) -> bool {
    !(c.is_whitespace() || matches!(c, '(' | ')' | '"' | ';' | '\'' | ','))
}

// ============================================================================
// Tests
// ============================================================================
