// bolt-parser - Interned symbols
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Interned identifiers.
//!
//! Every symbol with the same name shares one `Arc<str>` held by a global
//! interner, so equality and hashing are pointer operations. Interned names
//! are never freed: the set of identifiers in a program is bounded by its
//! source text.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock};

/// An interned identifier.
#[derive(Clone)]
pub struct Symbol {
    name: Arc<str>,
}

static SYMBOL_INTERNER: OnceLock<Mutex<HashMap<Box<str>, Arc<str>>>> = OnceLock::new();

fn intern(name: &str) -> Arc<str> {
    let table = SYMBOL_INTERNER.get_or_init(|| Mutex::new(HashMap::new()));
    // A poisoned lock still guards a consistent map: entries are inserted whole.
    let mut table = table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(existing) = table.get(name) {
        return Arc::clone(existing);
    }
    let interned: Arc<str> = Arc::from(name);
    table.insert(Box::from(name), Arc::clone(&interned));
    interned
}

impl Symbol {
    /// Intern `name` and return its symbol.
    pub fn new(name: &str) -> Self {
        Symbol { name: intern(name) }
    }

    /// The symbol's text.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.name)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.name, &other.name)
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.name).cast::<u8>().hash(state);
    }
}
