//! Lexical environments.
//!
//! An [`Env`] is one scope record with a link to its parent. Variables live
//! in [`Cell`]s shared by reference, so closures and pointers that captured
//! a variable observe every later write to it. A scope stays alive for as
//! long as any closure, pointer or VM frame holds it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use golite_ir::Name;
use rustc_hash::FxHashMap;

use crate::Value;

/// A variable slot.
pub type Cell = Rc<RefCell<Value>>;

/// Allocate a fresh variable slot.
#[inline]
pub fn new_cell(value: Value) -> Cell {
    Rc::new(RefCell::new(value))
}

struct Scope {
    vars: RefCell<FxHashMap<Name, Cell>>,
    parent: Option<Env>,
}

/// Shared handle to a scope.
#[derive(Clone)]
pub struct Env(Rc<Scope>);

impl Env {
    /// Create an empty scope with no parent.
    pub fn root() -> Self {
        Env(Rc::new(Scope {
            vars: RefCell::new(FxHashMap::default()),
            parent: None,
        }))
    }

    /// Create an empty scope nested in `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Env(Rc::new(Scope {
            vars: RefCell::new(FxHashMap::default()),
            parent: Some(self.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Env> {
        self.0.parent.as_ref()
    }

    /// Bind `name` to a fresh cell in this scope.
    ///
    /// An existing binding of the same name in this scope is replaced; cells
    /// already captured from it keep their old value.
    pub fn define(&self, name: Name, value: Value) {
        self.0.vars.borrow_mut().insert(name, new_cell(value));
    }

    /// Bind `name` to an existing cell in this scope.
    pub fn define_cell(&self, name: Name, cell: Cell) {
        self.0.vars.borrow_mut().insert(name, cell);
    }

    /// Find the cell for `name`, innermost scope first.
    pub fn lookup(&self, name: Name) -> Option<Cell> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(cell) = env.0.vars.borrow().get(&name) {
                return Some(Rc::clone(cell));
            }
            scope = env.parent();
        }
        None
    }

    /// Current value of `name`.
    pub fn get(&self, name: Name) -> Option<Value> {
        self.lookup(name).map(|cell| cell.borrow().clone())
    }

    /// Whether `name` is bound in this scope itself.
    pub fn contains_local(&self, name: Name) -> bool {
        self.0.vars.borrow().contains_key(&name)
    }

    /// Names bound in this scope itself.
    pub fn local_names(&self) -> Vec<Name> {
        self.0.vars.borrow().keys().copied().collect()
    }

    /// Whether both handles refer to the same scope.
    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of scopes from here to the root, inclusive.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut scope = self.parent();
        while let Some(env) = scope {
            depth += 1;
            scope = env.parent();
        }
        depth
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("vars", &self.0.vars.borrow().len())
            .field("depth", &self.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests;
