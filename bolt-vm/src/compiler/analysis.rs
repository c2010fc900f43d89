// bolt-vm - Semantic analysis
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Semantic analysis pass: form validation, scope resolution and register
//! assignment.
//!
//! This pass walks the S-expression tree to:
//! 1. Check the shape of `define`, `lambda` and `if`
//! 2. Give every bound variable a register in its scope
//! 3. Resolve every symbol to a register, a top-level register or a primitive
//!
//! The output is an [`AnalyzedProgram`]: the implicit top-level lambda and
//! the scope table built along the way.

use bolt_parser::{SExpr, SExprKind, Span, Symbol};
use tracing::trace;

use crate::native::Primitive;
use crate::value::BoltValue;

use super::ast::{Atom, AtomicNode, Callee, Define, IfExpr, Lambda, Node, ProcCall, Resolution};
use super::scope::{BindingKind, ScopeId, ScopeTable};
use super::types::{CompileError, Keyword, Result};

/// Output of [`SemanticAnalyzer::verify`].
#[derive(Debug, Clone)]
pub struct AnalyzedProgram {
    /// The implicit top-level procedure.
    pub root: Lambda,
    pub scopes: ScopeTable,
}

/// Builds the typed AST from a sequence of top-level forms.
#[derive(Debug)]
pub struct SemanticAnalyzer {
    scopes: ScopeTable,
    current: ScopeId,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            scopes: ScopeTable::new(),
            current: ScopeId::GLOBAL,
        }
    }

    /// Analyze a program. The first error aborts the analysis.
    pub fn verify(mut self, forms: &[SExpr]) -> Result<AnalyzedProgram> {
        let span = forms.first().map_or(Span::new(1, 1), |form| form.span);
        let body = self.verify_body(forms)?;
        Ok(AnalyzedProgram {
            root: Lambda {
                params: Vec::new(),
                body,
                scope: ScopeId::GLOBAL,
                span,
            },
            scopes: self.scopes,
        })
    }

    /// A body is a sequence of definitions and expressions.
    fn verify_body(&mut self, forms: &[SExpr]) -> Result<Vec<Node>> {
        forms
            .iter()
            .map(|form| match special_form(form) {
                Some((Keyword::Define, items)) => self.verify_define(items, form.span),
                _ => self.verify_expr(form),
            })
            .collect()
    }

    fn verify_expr(&mut self, form: &SExpr) -> Result<Node> {
        let span = form.span;
        match &form.kind {
            SExprKind::Int(n) => Ok(self.literal(BoltValue::Integer(*n), span)),
            SExprKind::Float(n) => Ok(self.literal(BoltValue::Float(*n), span)),
            SExprKind::Bool(b) => Ok(self.literal(BoltValue::Boolean(*b), span)),
            SExprKind::Str(s) => Ok(Node::Atomic(AtomicNode {
                atom: Atom::Str(s.clone()),
                scope: self.current,
                span,
            })),
            SExprKind::Symbol(sym) => self.verify_symbol(sym, span),
            SExprKind::List(items) => {
                if items.is_empty() {
                    return Err(CompileError::malformed(form, "empty application", span));
                }
                match special_form(form) {
                    Some((Keyword::Lambda, items)) => self.verify_lambda(items, span),
                    Some((Keyword::If, items)) => self.verify_if(items, span),
                    Some((Keyword::Define, _)) => Err(CompileError::malformed(
                        form,
                        "define is only allowed at the top of a body",
                        span,
                    )),
                    Some((keyword, _)) => Err(CompileError::UnsupportedForm {
                        form: keyword.name().to_string(),
                        span,
                    }),
                    None => self.verify_proc_call(items, span),
                }
            }
        }
    }

    fn literal(&self, value: BoltValue, span: Span) -> Node {
        Node::Atomic(AtomicNode {
            atom: Atom::Literal(value),
            scope: self.current,
            span,
        })
    }

    /// A variable reference.
    fn verify_symbol(&self, sym: &Symbol, span: Span) -> Result<Node> {
        if Keyword::from_name(sym.name()).is_some() {
            return Err(CompileError::malformed(sym, "keyword used as a value", span));
        }
        let resolution = self.resolve(sym, span)?;
        Ok(Node::Atomic(AtomicNode {
            atom: Atom::Variable {
                name: sym.clone(),
                resolution,
            },
            scope: self.current,
            span,
        }))
    }

    /// Resolve a name, innermost scope first, then the primitives.
    fn resolve(&self, sym: &Symbol, span: Span) -> Result<Resolution> {
        if let Some((found, binding)) = self.scopes.lookup(self.current, sym) {
            return if found == self.current {
                Ok(Resolution::Local(binding.register))
            } else if found == ScopeId::GLOBAL {
                Ok(Resolution::Global(binding.register))
            } else {
                Err(CompileError::CaptureNotSupported {
                    name: sym.name().to_string(),
                    bound_at: binding.defined_at,
                    span,
                })
            };
        }
        Primitive::from_name(sym.name())
            .map(Resolution::Native)
            .ok_or_else(|| CompileError::UndefinedSymbol {
                name: sym.name().to_string(),
                span,
            })
    }

    /// `(define name expr)`
    fn verify_define(&mut self, items: &[SExpr], span: Span) -> Result<Node> {
        let [_, name, value] = items else {
            return Err(CompileError::malformed(
                list_text(items),
                "expected (define name expr)",
                span,
            ));
        };
        let name = self.binding_name(name)?;
        // Bound before the value is analyzed so the value can refer to it.
        let register = self
            .scopes
            .declare(self.current, &name, BindingKind::Variable, span)?;
        trace!(name = name.name(), register, scope = self.current.0, "define");
        let value = self.verify_expr(value)?;
        Ok(Node::Define(Define {
            name,
            register,
            value: Box::new(value),
            scope: self.current,
            span,
        }))
    }

    /// `(lambda (params...) body...)`
    fn verify_lambda(&mut self, items: &[SExpr], span: Span) -> Result<Node> {
        if items.len() < 3 {
            return Err(CompileError::malformed(
                list_text(items),
                "expected (lambda (params...) body...)",
                span,
            ));
        }
        let param_list = items[1].as_list().ok_or_else(|| {
            CompileError::malformed(&items[1], "parameter list must be a list", items[1].span)
        })?;

        let mut params: Vec<Symbol> = Vec::with_capacity(param_list.len());
        for param in param_list {
            let name = self.binding_name(param)?;
            if params.contains(&name) {
                return Err(CompileError::malformed(
                    param,
                    "duplicate parameter",
                    param.span,
                ));
            }
            params.push(name);
        }

        let scope = self.scopes.push_scope(self.current);
        for (param, form) in params.iter().zip(param_list) {
            self.scopes
                .declare(scope, param, BindingKind::Parameter, form.span)?;
        }
        trace!(scope = scope.0, parent = self.current.0, arity = params.len(), "enter lambda");

        let enclosing = self.current;
        self.current = scope;
        let body = self.verify_body(&items[2..]);
        self.current = enclosing;
        trace!(scope = scope.0, "leave lambda");

        Ok(Node::Lambda(Lambda {
            params,
            body: body?,
            scope,
            span,
        }))
    }

    /// `(if condition then else)`
    fn verify_if(&mut self, items: &[SExpr], span: Span) -> Result<Node> {
        let [_, condition, then_branch, else_branch] = items else {
            return Err(CompileError::malformed(
                list_text(items),
                "expected (if condition then else)",
                span,
            ));
        };
        Ok(Node::If(IfExpr {
            condition: Box::new(self.verify_expr(condition)?),
            then_branch: Box::new(self.verify_expr(then_branch)?),
            else_branch: Box::new(self.verify_expr(else_branch)?),
            scope: self.current,
            span,
        }))
    }

    /// An application of a primitive or a procedure.
    fn verify_proc_call(&mut self, items: &[SExpr], span: Span) -> Result<Node> {
        let (head, args) = items
            .split_first()
            .ok_or_else(|| CompileError::malformed("()", "empty application", span))?;

        let callee = match &head.kind {
            SExprKind::Symbol(sym) => match self.verify_symbol(sym, head.span)? {
                Node::Atomic(AtomicNode {
                    atom:
                        Atom::Variable {
                            resolution: Resolution::Native(primitive),
                            ..
                        },
                    ..
                }) => Callee::Native(primitive),
                node => Callee::Procedure(Box::new(node)),
            },
            SExprKind::List(_) => Callee::Procedure(Box::new(self.verify_expr(head)?)),
            _ => {
                return Err(CompileError::malformed(
                    head,
                    "operator is not a procedure",
                    head.span,
                ))
            }
        };

        let args = args
            .iter()
            .map(|arg| self.verify_expr(arg))
            .collect::<Result<Vec<_>>>()?;
        Ok(Node::Call(ProcCall {
            callee,
            args,
            scope: self.current,
            span,
        }))
    }

    /// A symbol that may be bound by `define` or `lambda`.
    fn binding_name(&self, form: &SExpr) -> Result<Symbol> {
        let sym = form
            .as_symbol()
            .ok_or_else(|| CompileError::malformed(form, "expected a symbol", form.span))?;
        if Keyword::from_name(sym.name()).is_some() {
            return Err(CompileError::malformed(
                sym,
                "keywords cannot be bound",
                form.span,
            ));
        }
        Ok(sym.clone())
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// The keyword heading a list form, and the form's items.
fn special_form(form: &SExpr) -> Option<(Keyword, &[SExpr])> {
    let items = form.as_list()?;
    let keyword = Keyword::from_name(items.first()?.as_symbol()?.name())?;
    Some((keyword, items))
}

fn list_text(items: &[SExpr]) -> String {
    let parts: Vec<String> = items.iter().map(|item| item.to_string()).collect();
    format!("({})", parts.join(" "))
}
