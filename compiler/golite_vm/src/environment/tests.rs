use golite_ir::StringInterner;

use super::*;

#[test]
fn test_lookup_walks_to_parent() {
    let interner = StringInterner::new();
    let x = interner.intern("x");
    let root = Env::root();
    root.define(x, Value::Int(1));
    let inner = root.child().child();
    assert!(matches!(inner.get(x), Some(Value::Int(1))));
    assert_eq!(inner.depth(), 3);
}

#[test]
fn test_shadowing_never_overwrites_outer() {
    let interner = StringInterner::new();
    let x = interner.intern("x");
    let root = Env::root();
    root.define(x, Value::Int(1));
    let inner = root.child();
    inner.define(x, Value::Int(2));
    assert!(matches!(inner.get(x), Some(Value::Int(2))));
    assert!(matches!(root.get(x), Some(Value::Int(1))));
}

#[test]
fn test_cells_are_shared() {
    let interner = StringInterner::new();
    let x = interner.intern("x");
    let root = Env::root();
    root.define(x, Value::Int(1));
    let captured = root.lookup(x);
    let Some(cell) = root.lookup(x) else {
        panic!("x is defined");
    };
    *cell.borrow_mut() = Value::Int(7);
    assert!(matches!(captured.map(|c| c.borrow().clone()), Some(Value::Int(7))));
}

#[test]
fn test_redefine_gives_fresh_cell() {
    let interner = StringInterner::new();
    let i = interner.intern("i");
    let env = Env::root();
    env.define(i, Value::Int(0));
    let first = env.lookup(i);
    env.define(i, Value::Int(1));
    assert!(matches!(first.map(|c| c.borrow().clone()), Some(Value::Int(0))));
    assert!(matches!(env.get(i), Some(Value::Int(1))));
    assert!(env.contains_local(i));
    assert!(!env.child().contains_local(i));
}
