// bolt-vm - Analyzed syntax tree
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Typed AST produced by the semantic analyzer.
//!
//! Every node records the scope it was analyzed in. Variable references are
//! already resolved to a register, a top-level register or a primitive.

use bolt_parser::{Span, Symbol};

use crate::native::Primitive;
use crate::value::BoltValue;

use super::scope::ScopeId;

/// Where a variable reference reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A register of the current function.
    Local(u8),
    /// A register of the top-level frame, read from a nested lambda.
    Global(u8),
    /// A native primitive used as a value.
    Native(Primitive),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Literal(BoltValue),
    /// A string literal. Strings have no runtime representation.
    Str(String),
    Variable { name: Symbol, resolution: Resolution },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtomicNode {
    pub atom: Atom,
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Define {
    pub name: Symbol,
    pub register: u8,
    pub value: Box<Node>,
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub condition: Box<Node>,
    pub then_branch: Box<Node>,
    pub else_branch: Box<Node>,
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<Symbol>,
    pub body: Vec<Node>,
    /// The scope the lambda's parameters and locals live in.
    pub scope: ScopeId,
    pub span: Span,
}

impl Lambda {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// What a call site invokes.
#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    /// A primitive named directly in operator position.
    Native(Primitive),
    /// Any expression evaluating to a closure.
    Procedure(Box<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcCall {
    pub callee: Callee,
    pub args: Vec<Node>,
    pub scope: ScopeId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Atomic(AtomicNode),
    Define(Define),
    If(IfExpr),
    Lambda(Lambda),
    Call(ProcCall),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Atomic(n) => n.span,
            Node::Define(n) => n.span,
            Node::If(n) => n.span,
            Node::Lambda(n) => n.span,
            Node::Call(n) => n.span,
        }
    }

    /// Scope the node was analyzed in; for a lambda, the scope it opens.
    pub fn scope(&self) -> ScopeId {
        match self {
            Node::Atomic(n) => n.scope,
            Node::Define(n) => n.scope,
            Node::If(n) => n.scope,
            Node::Lambda(n) => n.scope,
            Node::Call(n) => n.scope,
        }
    }
}
