use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::*;
use crate::print_handler::{buffer_handler, silent_handler};
use crate::types::TypeDesc;

fn call(builtin: Builtin, args: Vec<Value>) -> EvalResult {
    builtin.call(&args, &silent_handler())
}

fn call_err(builtin: Builtin, args: Vec<Value>) -> String {
    match call(builtin, args) {
        Ok(v) => panic!("expected {} to fail, got {v:?}", builtin.name()),
        Err(e) => e.to_string(),
    }
}

fn ints(value: &Value) -> Vec<i64> {
    match value {
        Value::List(list) => list.borrow().items.iter().filter_map(Value::as_int).collect(),
        other => panic!("expected list, got {other:?}"),
    }
}

fn int_type() -> Rc<TypeDesc> {
    TypeDesc::named("int", TypeKind::Int)
}

#[test]
fn test_println_joins_with_spaces() {
    let out = buffer_handler();
    let args = vec![Value::from("a"), Value::Int(1), Value::Bool(true), Value::Nil];
    assert!(Builtin::Println.call(&args, &out).is_ok());
    assert!(Builtin::Print.call(&[Value::Float(2.5)], &out).is_ok());
    assert_eq!(out.get_output(), "a 1 true <nil>\n2.5");
}

#[test]
fn test_len_of_each_kind() {
    assert!(matches!(call(Builtin::Len, vec![Value::from("héllo")]), Ok(Value::Int(6))));
    assert!(matches!(call(Builtin::Len, vec![Value::Nil]), Ok(Value::Int(0))));
    assert!(matches!(
        call(Builtin::Cap, vec![Value::list(vec![Value::Int(1)])]),
        Ok(Value::Int(1))
    ));
    assert_eq!(call_err(Builtin::Len, vec![Value::Int(3)]), "invalid argument type for len: int");
    assert_eq!(call_err(Builtin::Len, vec![]), "len expects 1 argument(s)");
}

#[test]
fn test_append_returns_new_list() {
    let original = Value::list(vec![Value::Int(1)]);
    let appended = match call(Builtin::Append, vec![original.clone(), Value::Int(2)]) {
        Ok(v) => v,
        Err(e) => panic!("{e}"),
    };
    assert_eq!(ints(&original), vec![1]);
    assert_eq!(ints(&appended), vec![1, 2]);

    let from_nil = call(Builtin::Append, vec![Value::Nil, Value::Int(7)]);
    assert_eq!(from_nil.map(|v| ints(&v)).ok(), Some(vec![7]));

    let frozen = Value::tuple(vec![Value::Int(1)]);
    assert_eq!(
        call_err(Builtin::Append, vec![frozen, Value::Int(2)]),
        "cannot modify immutable list"
    );
    assert_eq!(
        call_err(Builtin::Append, vec![Value::Int(1)]),
        "invalid argument type for append: int"
    );
}

#[test]
fn test_copy_copies_the_shorter_length() {
    let dst = Value::list(vec![Value::Int(0), Value::Int(0), Value::Int(0)]);
    let src = Value::list(vec![Value::Int(4), Value::Int(5)]);
    assert!(matches!(call(Builtin::Copy, vec![dst.clone(), src]), Ok(Value::Int(2))));
    assert_eq!(ints(&dst), vec![4, 5, 0]);

    let bytes = Value::list(vec![Value::Uint(0)]);
    assert!(matches!(
        call(Builtin::Copy, vec![bytes.clone(), Value::from("hi")]),
        Ok(Value::Int(1))
    ));
    assert!(matches!(
        &bytes,
        Value::List(l) if matches!(l.borrow().items[0], Value::Uint(104))
    ));
}

#[test]
fn test_delete_and_nil_map() {
    let mut map = MapValue::new(None, None);
    assert!(map.insert(Value::from("a"), Value::Int(1)).is_ok());
    let map = Value::map(map);
    assert!(call(Builtin::Delete, vec![map.clone(), Value::from("a")]).is_ok());
    assert!(matches!(call(Builtin::Len, vec![map]), Ok(Value::Int(0))));
    assert!(call(Builtin::Delete, vec![Value::Nil, Value::from("a")]).is_ok());
    assert_eq!(
        call_err(Builtin::Delete, vec![Value::Int(1), Value::Int(1)]),
        "invalid argument type for delete: int"
    );
}

#[test]
fn test_make_zero_fills_slices() {
    let slice = TypeDesc::new(TypeKind::List {
        elem: int_type(),
        len: None,
    });
    let made = call(Builtin::Make, vec![Value::Type(Rc::clone(&slice)), Value::Int(3)]);
    assert_eq!(made.map(|v| ints(&v)).ok(), Some(vec![0, 0, 0]));
    assert_eq!(
        call_err(Builtin::Make, vec![Value::Type(Rc::clone(&slice)), Value::Int(-1)]),
        "make: negative length"
    );
    assert_eq!(
        call_err(Builtin::Make, vec![Value::Type(Rc::clone(&slice)), Value::Int(i64::MAX)]),
        "make: len out of range"
    );
    assert_eq!(
        call_err(Builtin::Make, vec![Value::Type(slice), Value::Uint(u64::MAX)]),
        "make: len out of range"
    );
    let chan = TypeDesc::new(TypeKind::Chan(int_type()));
    assert_eq!(
        call_err(Builtin::Make, vec![Value::Type(chan)]),
        "channels are not supported"
    );
    assert_eq!(
        call_err(Builtin::Make, vec![Value::Int(1)]),
        "invalid argument type for make: int"
    );
}

#[test]
fn test_new_points_at_zero_value() {
    let ptr = call(Builtin::New, vec![Value::Type(int_type())]);
    let Ok(Value::Pointer(ptr)) = ptr else {
        panic!("expected pointer, got {ptr:?}");
    };
    assert!(matches!(ptr.get(), Ok(Value::Int(0))));
}

#[test]
fn test_complex_parts() {
    let c = call(Builtin::Complex, vec![Value::Int(1), Value::Float(2.0)]);
    let Ok(c) = c else {
        panic!("complex failed");
    };
    assert_eq!(c.to_string(), "(1+2i)");
    assert!(matches!(call(Builtin::Imag, vec![c.clone()]), Ok(Value::Float(f)) if f == 2.0));
    assert!(matches!(call(Builtin::Real, vec![c]), Ok(Value::Float(f)) if f == 1.0));
}

#[test]
fn test_min_and_max() {
    assert!(matches!(
        call(Builtin::Min, vec![Value::Int(3), Value::Int(1), Value::Int(2)]),
        Ok(Value::Int(1))
    ));
    assert!(matches!(
        call(Builtin::Max, vec![Value::Int(3), Value::Float(4.5)]),
        Ok(Value::Float(f)) if f == 4.5
    ));
    let max = call(Builtin::Max, vec![Value::from("b"), Value::from("a")]);
    assert_eq!(max.ok().and_then(|v| v.as_str().map(str::to_owned)).as_deref(), Some("b"));
    assert_eq!(
        call_err(Builtin::Min, vec![Value::Bool(true)]),
        "invalid argument type for min: bool"
    );
}

#[test]
fn test_close_is_unsupported() {
    assert_eq!(call_err(Builtin::Close, vec![Value::Nil]), "channels are not supported");
}
