// bolt-vm - Scope table
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexical scopes, one per lambda plus the global scope.
//!
//! Scopes live in an arena and refer to their parent by [`ScopeId`]. The
//! analyzer builds the table; the code generator reads register counts from
//! it.

use std::collections::HashMap;

use bolt_parser::{Span, Symbol};

use super::types::{CompileError, Result, MAX_REGISTERS};

/// Index of a scope in a [`ScopeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

impl ScopeId {
    /// The top-level scope.
    pub const GLOBAL: ScopeId = ScopeId(0);
}

/// How a name entered its scope. Primitives and keywords never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Parameter,
    Variable,
}

/// A name bound in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub register: u8,
    pub kind: BindingKind,
    /// Where the name was first bound.
    pub defined_at: Span,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub bindings: HashMap<Symbol, Binding>,
    /// Next free register; registers are handed out in declaration order.
    pub next_register: usize,
    /// Number of parameters.
    pub arity: usize,
}

#[derive(Debug, Clone)]
pub struct ScopeTable {
    scopes: Vec<Scope>,
}

impl ScopeTable {
    /// A table holding only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Open a child scope of `parent`.
    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Bind `name` in scope `id` and return its register.
    ///
    /// Binding a name that is already bound in the same scope reuses its
    /// register.
    pub fn declare(&mut self, id: ScopeId, name: &Symbol, kind: BindingKind, span: Span) -> Result<u8> {
        let scope = self
            .scopes
            .get_mut(id.0)
            .ok_or(CompileError::RegisterExhaustion { span })?;
        if let Some(binding) = scope.bindings.get(name) {
            return Ok(binding.register);
        }
        if scope.next_register >= MAX_REGISTERS {
            return Err(CompileError::RegisterExhaustion { span });
        }
        let register = scope.next_register as u8;
        scope.next_register += 1;
        if kind == BindingKind::Parameter {
            scope.arity += 1;
        }
        scope.bindings.insert(
            name.clone(),
            Binding {
                register,
                kind,
                defined_at: span,
            },
        );
        Ok(register)
    }

    /// Find the innermost binding of `name`, starting at `from`.
    pub fn lookup(&self, from: ScopeId, name: &Symbol) -> Option<(ScopeId, &Binding)> {
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let scope = self.get(id)?;
            if let Some(binding) = scope.bindings.get(name) {
                return Some((id, binding));
            }
            cursor = scope.parent;
        }
        None
    }

    /// Number of registers taken by variables defined in the body.
    pub fn n_locals(&self, id: ScopeId) -> usize {
        self.get(id)
            .map_or(0, |scope| scope.next_register - scope.arity)
    }

    pub fn arity(&self, id: ScopeId) -> usize {
        self.get(id).map_or(0, |scope| scope.arity)
    }
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Symbol {
        Symbol::new(name)
    }

    #[test]
    fn registers_in_declaration_order() {
        let mut table = ScopeTable::new();
        let span = Span::new(1, 1);
        let f = table.push_scope(ScopeId::GLOBAL);
        assert_eq!(table.declare(f, &sym("a"), BindingKind::Parameter, span), Ok(0));
        assert_eq!(table.declare(f, &sym("b"), BindingKind::Parameter, span), Ok(1));
        assert_eq!(table.declare(f, &sym("c"), BindingKind::Variable, span), Ok(2));
        assert_eq!(table.arity(f), 2);
        assert_eq!(table.n_locals(f), 1);
    }

    #[test]
    fn redefinition_reuses_register() {
        let mut table = ScopeTable::new();
        let span = Span::new(1, 1);
        let g = ScopeId::GLOBAL;
        assert_eq!(table.declare(g, &sym("x"), BindingKind::Variable, span), Ok(0));
        assert_eq!(table.declare(g, &sym("y"), BindingKind::Variable, span), Ok(1));
        assert_eq!(table.declare(g, &sym("x"), BindingKind::Variable, span), Ok(0));
        assert_eq!(table.n_locals(g), 2);
    }

    #[test]
    fn lookup_walks_outward() {
        let mut table = ScopeTable::new();
        let span = Span::new(1, 1);
        table
            .declare(ScopeId::GLOBAL, &sym("x"), BindingKind::Variable, span)
            .unwrap();
        let inner = table.push_scope(ScopeId::GLOBAL);
        table
            .declare(inner, &sym("y"), BindingKind::Parameter, span)
            .unwrap();

        let (found, binding) = table.lookup(inner, &sym("x")).unwrap();
        assert_eq!(found, ScopeId::GLOBAL);
        assert_eq!(binding.register, 0);
        assert_eq!(table.lookup(inner, &sym("y")).unwrap().0, inner);
        assert!(table.lookup(ScopeId::GLOBAL, &sym("y")).is_none());
    }

    #[test]
    fn register_exhaustion() {
        let mut table = ScopeTable::new();
        let span = Span::new(4, 2);
        for i in 0..MAX_REGISTERS {
            table
                .declare(ScopeId::GLOBAL, &sym(&format!("v{}", i)), BindingKind::Variable, span)
                .unwrap();
        }
        assert_eq!(
            table.declare(ScopeId::GLOBAL, &sym("one-more"), BindingKind::Variable, span),
            Err(CompileError::RegisterExhaustion { span })
        );
    }
}
