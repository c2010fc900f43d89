// bolt-parser - S-expression tree
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The S-expression tree produced by the parser.

use std::fmt;

use crate::symbol::Symbol;

/// Source position of a node (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The payload of an S-expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum SExprKind {
    Int(i64),
    Float(f64),
    Bool(bool),
    Symbol(Symbol),
    Str(String),
    List(Vec<SExpr>),
}

/// An S-expression node with the position of its first token.
#[derive(Debug, Clone, PartialEq)]
pub struct SExpr {
    pub kind: SExprKind,
    pub span: Span,
}

impl SExpr {
    pub fn new(kind: SExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn int(n: i64, span: Span) -> Self {
        Self::new(SExprKind::Int(n), span)
    }

    pub fn float(n: f64, span: Span) -> Self {
        Self::new(SExprKind::Float(n), span)
    }

    pub fn bool(b: bool, span: Span) -> Self {
        Self::new(SExprKind::Bool(b), span)
    }

    pub fn symbol(name: &str, span: Span) -> Self {
        Self::new(SExprKind::Symbol(Symbol::new(name)), span)
    }

    pub fn string(s: impl Into<String>, span: Span) -> Self {
        Self::new(SExprKind::Str(s.into()), span)
    }

    pub fn list(items: Vec<SExpr>, span: Span) -> Self {
        Self::new(SExprKind::List(items), span)
    }

    /// The symbol, if this node is one.
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match &self.kind {
            SExprKind::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    /// The elements, if this node is a list.
    pub fn as_list(&self) -> Option<&[SExpr]> {
        match &self.kind {
            SExprKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, SExprKind::List(_))
    }

    /// Short name of the node type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            SExprKind::Int(_) => "integer",
            SExprKind::Float(_) => "float",
            SExprKind::Bool(_) => "boolean",
            SExprKind::Symbol(_) => "symbol",
            SExprKind::Str(_) => "string",
            SExprKind::List(_) => "list",
        }
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SExprKind::Int(n) => write!(f, "{}", n),
            SExprKind::Float(n) => {
                if n.is_finite() && n.fract() == 0.0 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            SExprKind::Bool(true) => write!(f, "#t"),
            SExprKind::Bool(false) => write!(f, "#f"),
            SExprKind::Symbol(sym) => write!(f, "{}", sym),
            SExprKind::Str(s) => write!(f, "{:?}", s),
            SExprKind::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_source_shape() {
        let span = Span::new(1, 1);
        let expr = SExpr::list(
            vec![
                SExpr::symbol("if", span),
                SExpr::bool(true, span),
                SExpr::float(2.0, span),
                SExpr::string("hi", span),
            ],
            span,
        );
        assert_eq!(expr.to_string(), "(if #t 2.0 \"hi\")");
    }

    #[test]
    fn accessors() {
        let span = Span::new(3, 7);
        let sym = SExpr::symbol("x", span);
        assert_eq!(sym.as_symbol().map(|s| s.name()), Some("x"));
        assert!(sym.as_list().is_none());
        assert_eq!(sym.type_name(), "symbol");
        assert_eq!(span.to_string(), "3:7");
    }
}
