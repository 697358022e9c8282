use super::*;

#[test]
fn test_intern_roundtrip() {
    let interner = StringInterner::new();
    let name = interner.intern("counter");
    assert_eq!(interner.lookup(name), "counter");
}

#[test]
fn test_intern_is_idempotent() {
    let interner = StringInterner::new();
    let before = interner.len();
    let a = interner.intern("fresh_identifier");
    let b = interner.intern("fresh_identifier");
    assert_eq!(a, b);
    assert_eq!(interner.len(), before + 1);
}

#[test]
fn test_empty_string_is_pre_interned() {
    let interner = StringInterner::new();
    assert_eq!(interner.intern(""), Name::EMPTY);
    assert_eq!(interner.lookup(Name::EMPTY), "");
}

#[test]
fn test_predeclared_names_are_present() {
    let interner = StringInterner::new();
    let before = interner.len();
    interner.intern("println");
    interner.intern("iota");
    assert_eq!(interner.len(), before);
}

#[test]
fn test_shared_interner_shares_storage() {
    let shared = SharedInterner::new();
    let clone = shared.clone();
    let name = shared.intern("shared");
    assert_eq!(clone.lookup(name), "shared");
}

#[test]
fn test_unknown_name_looks_up_empty() {
    let interner = StringInterner::new();
    let stray = Name::from_index(u32::MAX);
    assert_eq!(interner.lookup(stray), "");
    assert!(!interner.is_empty());
    assert!(format!("{:?}", SharedInterner::new()).starts_with("SharedInterner("));
}
