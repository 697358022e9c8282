//! String interning for identifiers and string literals.
//!
//! Every phase of one interpreter refers to identifiers by [`Name`]. Interned
//! text is leaked, so [`StringInterner::lookup`] hands out `&'static str`
//! without holding the lock past the call.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::Name;

/// Names the lexer, compiler and prelude always need.
const PREDECLARED: &[&str] = &[
    "_", "main", "init", "iota", "nil", "true", "false", "int", "uint", "float64", "string",
    "bool", "byte", "rune", "error", "any", "len", "cap", "append", "copy", "delete", "make",
    "new", "panic", "recover", "print", "println",
];

/// The interner ran out of `Name` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternError {
    pub count: usize,
}

impl fmt::Display for InternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "string interner is full ({} strings)", self.count)
    }
}

impl std::error::Error for InternError {}

#[derive(Default)]
struct Table {
    slots: FxHashMap<&'static str, Name>,
    strings: Vec<&'static str>,
}

/// Maps strings to [`Name`]s and back.
pub struct StringInterner {
    table: RwLock<Table>,
}

impl StringInterner {
    /// An interner holding the empty string and the predeclared identifiers.
    pub fn new() -> Self {
        let mut table = Table::default();
        table.slots.insert("", Name::EMPTY);
        table.strings.push("");
        let interner = StringInterner {
            table: RwLock::new(table),
        };
        for name in PREDECLARED {
            interner.intern(name);
        }
        interner
    }

    pub fn try_intern(&self, s: &str) -> Result<Name, InternError> {
        if let Some(&name) = self.table.read().slots.get(s) {
            return Ok(name);
        }

        let mut table = self.table.write();
        // Another handle may have won the race between the two locks.
        if let Some(&name) = table.slots.get(s) {
            return Ok(name);
        }
        let count = table.strings.len();
        let index = u32::try_from(count).map_err(|_| InternError { count })?;
        let name = Name::from_index(index);
        let text: &'static str = Box::leak(s.to_owned().into_boxed_str());
        table.strings.push(text);
        table.slots.insert(text, name);
        Ok(name)
    }

    /// Intern `s`.
    ///
    /// # Panics
    /// Panics once more than `u32::MAX` distinct strings were interned.
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Text of `name`; the empty string for a name from another interner.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.table
            .read()
            .strings
            .get(name.index())
            .copied()
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.table.read().strings.len()
    }

    /// Whether only the empty string is interned.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared interner handed to every phase of one interpreter.
///
/// The lexer, compiler and VM of a single interpreter must agree on the
/// same interner, since a `Name` is an index into it.
#[derive(Clone)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    pub fn new() -> Self {
        SharedInterner(Arc::new(StringInterner::new()))
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for SharedInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedInterner({} strings)", self.len())
    }
}

#[cfg(test)]
mod tests;
