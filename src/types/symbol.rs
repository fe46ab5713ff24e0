//! Symbol interning: strings are interned once and referred to everywhere
//! else by a small `i64` id, so symbol columns compare and hash as plain
//! integers.

use std::collections::HashMap;
use std::sync::RwLock;

pub type SymbolId = i64;

/// NULL sentinel for symbol columns (shared with I64/TIMESTAMP).
pub const SYMBOL_NULL: SymbolId = i64::MIN;

#[derive(Default)]
struct SymbolTableInner {
    strings: Vec<String>,
    ids: HashMap<String, SymbolId>,
}

/// A collaborator object shared by `Arc` between VMs that need to agree on
/// symbol ids, rather than a process-global table.
pub struct SymbolTable {
    inner: RwLock<SymbolTableInner>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            inner: RwLock::new(SymbolTableInner::default()),
        }
    }

    /// Intern `s`, returning its id (allocating a new one if not seen yet).
    pub fn intern(&self, s: &str) -> SymbolId {
        if let Some(&id) = self.inner.read().unwrap().ids.get(s) {
            return id;
        }
        let mut inner = self.inner.write().unwrap();
        if let Some(&id) = inner.ids.get(s) {
            return id;
        }
        let id = inner.strings.len() as SymbolId;
        inner.strings.push(s.to_string());
        inner.ids.insert(s.to_string(), id);
        id
    }

    /// Resolve a previously interned id back to its string.
    pub fn get(&self, id: SymbolId) -> Option<String> {
        if id == SYMBOL_NULL || id < 0 {
            return None;
        }
        self.inner.read().unwrap().strings.get(id as usize).cloned()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_stable() {
        let t = SymbolTable::new();
        let a = t.intern("foo");
        let b = t.intern("foo");
        let c = t.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(t.get(a).as_deref(), Some("foo"));
    }

    #[test]
    fn unresolved_symbol_is_none() {
        let t = SymbolTable::new();
        assert_eq!(t.get(999), None);
        assert_eq!(t.get(SYMBOL_NULL), None);
    }
}
