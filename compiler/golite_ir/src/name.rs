//! Interned identifiers.

use std::fmt;

/// An identifier or string literal interned in a
/// [`StringInterner`](crate::StringInterner).
///
/// Comparing two names compares their interner slots, so names from
/// different interners must never be mixed.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// The empty string, present in every interner.
    pub const EMPTY: Name = Name(0);

    #[inline]
    pub(crate) const fn from_index(index: u32) -> Self {
        Name(index)
    }

    /// Slot of this name in its interner.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_slot_zero() {
        assert_eq!(Name::default(), Name::EMPTY);
        assert_eq!(Name::EMPTY.index(), 0);
        assert_eq!(format!("{:?}", Name::from_index(7)), "Name#7");
    }
}
