use pretty_assertions::assert_eq;
use proptest::prelude::*;

use golite_ir::StringInterner;

use super::*;
use crate::environment::new_cell;
use crate::types::{StructLayout, TypeKind};

fn point(interner: &StringInterner, x: i64, y: i64) -> Value {
    let int = TypeDesc::named("int", TypeKind::Int);
    let names: Rc<[_]> = Rc::from([interner.intern("X"), interner.intern("Y")]);
    let layout = StructLayout::new(names, vec![Rc::clone(&int), int], interner);
    let ty = TypeDesc::named("Point", TypeKind::Struct(Rc::new(layout)));
    Value::Struct(Box::new(StructValue {
        ty,
        fields: vec![Value::Int(x), Value::Int(y)],
    }))
}

fn string_map(pairs: &[(&str, i64)]) -> Value {
    let mut map = MapValue::new(None, None);
    for (k, v) in pairs {
        if let Err(e) = map.insert(Value::from(*k), Value::Int(*v)) {
            panic!("{e}");
        }
    }
    Value::map(map)
}

#[test]
fn test_scalars_format_like_go() {
    let cases = [
        (Value::Nil, "<nil>"),
        (Value::Bool(true), "true"),
        (Value::Int(-3), "-3"),
        (Value::Uint(7), "7"),
        (Value::Float(2.5), "2.5"),
        (Value::Float(3.0), "3"),
        (Value::Complex(Complex::new(1.0, 2.0)), "(1+2i)"),
        (Value::Complex(Complex::new(0.5, -1.0)), "(0.5-1i)"),
        (Value::from("hi"), "hi"),
    ];
    for (value, expected) in cases {
        assert_eq!(value.to_string(), expected);
    }
}

#[test]
fn test_floats_switch_to_exponent_form() {
    assert_eq!(format_float(123_456.0), "123456");
    assert_eq!(format_float(1_000_000.0), "1e+06");
    assert_eq!(format_float(1.5e21), "1.5e+21");
    assert_eq!(format_float(0.0001), "0.0001");
    assert_eq!(format_float(0.000_012_5), "1.25e-05");
    assert_eq!(format_float(-0.0), "-0");
    assert_eq!(format_float(f64::INFINITY), "+Inf");
    assert_eq!(format_float(f64::NAN), "NaN");
}

#[test]
fn test_containers_format_like_go() {
    let interner = StringInterner::new();
    let nested = Value::list(vec![
        Value::Int(1),
        Value::list(vec![Value::Int(2), Value::Int(3)]),
    ]);
    assert_eq!(nested.to_string(), "[1 [2 3]]");
    assert_eq!(string_map(&[("b", 2), ("a", 1)]).to_string(), "map[a:1 b:2]");
    assert_eq!(point(&interner, 1, 2).to_string(), "{1 2}");

    let ptr = Value::Pointer(Pointer::Cell(new_cell(point(&interner, 1, 2))));
    assert_eq!(ptr.to_string(), "&{1 2}");
    // Only the outermost pointer shows its target.
    let inner = Value::list(vec![ptr]).to_string();
    assert!(inner.starts_with("[0x"), "{inner}");
}

#[test]
fn test_self_referencing_list_terminates() {
    let list = Value::list(vec![]);
    if let Value::List(l) = &list {
        l.borrow_mut().items.push(list.clone());
    }
    assert!(list.to_string().contains("..."));
    // Break the cycle so the test does not leak.
    if let Value::List(l) = &list {
        l.borrow_mut().items.clear();
    }
}

#[test]
fn test_map_keys_normalise() {
    assert!(matches!(
        (MapKey::from_value(&Value::Float(0.0)), MapKey::from_value(&Value::Float(-0.0))),
        (Ok(a), Ok(b)) if a == b
    ));

    let int = TypeDesc::named("int", TypeKind::Int);
    let mut map = MapValue::new(Some(int), None);
    assert!(map.insert(Value::Float(1.0), Value::from("one")).is_ok());
    let found = map.get(&Value::Int(1)).ok().flatten();
    assert_eq!(found.map(|v| v.to_string()), Some("one".to_owned()));

    let err = MapKey::from_value(&Value::list(vec![]));
    assert_eq!(
        err.map_err(|e| e.to_string()).err().as_deref(),
        Some("invalid map key type []interface {}")
    );
}

#[test]
fn test_sorted_entries_order_by_key() {
    let mut map = MapValue::new(None, None);
    for i in [3, -1, 2] {
        assert!(map.insert(Value::Int(i), Value::Int(i * 10)).is_ok());
    }
    let keys: Vec<i64> = map
        .sorted_entries()
        .iter()
        .filter_map(|(k, _)| k.as_int())
        .collect();
    assert_eq!(keys, vec![-1, 2, 3]);
}

#[test]
fn test_pointer_locations() {
    let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
    let Value::List(items) = &list else {
        unreachable!()
    };
    let elem = Pointer::Elem(Rc::clone(items), 1);
    assert!(elem.set(Value::Int(20)).is_ok());
    assert_eq!(list.to_string(), "[1 20]");
    assert!(elem.ptr_eq(&Pointer::Elem(Rc::clone(items), 1)));
    assert!(!elem.ptr_eq(&Pointer::Elem(Rc::clone(items), 0)));

    let out_of_range = Pointer::Elem(Rc::clone(items), 5);
    assert_eq!(
        out_of_range.get().map_err(|e| e.to_string()).err().as_deref(),
        Some("index out of range [5] with length 2")
    );

    let Value::List(frozen) = Value::tuple(vec![Value::Int(1)]) else {
        unreachable!()
    };
    let err = Pointer::Elem(frozen, 0).set(Value::Int(2));
    assert_eq!(
        err.map_err(|e| e.to_string()).err().as_deref(),
        Some("cannot modify immutable list")
    );
}

#[test]
fn test_map_entry_pointer_inserts_on_write() {
    let map = string_map(&[]);
    let Value::Map(inner) = &map else {
        unreachable!()
    };
    let key = Value::from("k");
    let id = MapKey::from_value(&key).unwrap_or(MapKey::Nil);
    let entry = Pointer::Entry(Rc::clone(inner), id, Rc::new(key));
    assert!(matches!(entry.get(), Ok(Value::Nil)));
    assert_eq!(inner.borrow().len(), 0);
    assert!(entry.update(|v| {
        *v = Value::Int(5);
        Ok(())
    })
    .is_ok());
    assert_eq!(map.to_string(), "map[k:5]");
}

#[test]
fn test_nil_map_reads_zero_and_rejects_writes() {
    let int = TypeDesc::named("int", TypeKind::Int);
    let map = Value::map(MapValue::nil(None, Some(int)));
    let Value::Map(inner) = &map else {
        unreachable!()
    };
    let key = Value::from("k");
    let id = MapKey::from_value(&key).unwrap_or(MapKey::Nil);
    let entry = Pointer::Entry(Rc::clone(inner), id, Rc::new(key));
    assert!(matches!(entry.get(), Ok(Value::Int(0))));
    assert_eq!(
        entry.set(Value::Int(1)).map_err(|e| e.to_string()).err().as_deref(),
        Some("assignment to entry in nil map")
    );
    assert!(map.is_nil());
    assert_eq!(map.to_string(), "map[]");
}

#[test]
fn test_field_pointer_writes_through_parent() {
    let interner = StringInterner::new();
    let cell = new_cell(point(&interner, 1, 2));
    let field = Pointer::Field(Rc::new(Pointer::Cell(cell.clone())), 0);
    assert!(field.set(Value::Int(9)).is_ok());
    assert_eq!(cell.borrow().to_string(), "{9 2}");
    assert!(matches!(field.get(), Ok(Value::Int(9))));

    let dangling = Pointer::Field(Rc::new(Pointer::Cell(new_cell(Value::Nil))), 0);
    assert!(dangling.get().is_err());
}

#[test]
fn test_nested_field_pointer_updates_in_place() {
    let interner = StringInterner::new();
    let inner = point(&interner, 1, 2);
    let Value::Struct(inner_value) = &inner else {
        panic!("expected a struct");
    };
    let names: Rc<[_]> = Rc::from([interner.intern("Pos")]);
    let layout = StructLayout::new(names, vec![Rc::clone(&inner_value.ty)], &interner);
    let ty = TypeDesc::named("Body", TypeKind::Struct(Rc::new(layout)));
    let cell = new_cell(Value::Struct(Box::new(StructValue {
        ty,
        fields: vec![inner.clone()],
    })));

    let pos = Rc::new(Pointer::Field(Rc::new(Pointer::Cell(cell.clone())), 0));
    let y = Pointer::Field(pos, 1);
    let doubled = y.update(|v| {
        let n = v.as_int().unwrap_or(0) * 2;
        *v = Value::Int(n);
        Ok(n)
    });
    assert!(matches!(doubled, Ok(4)));
    assert!(y.set(Value::Int(7)).is_ok());
    assert_eq!(cell.borrow().to_string(), "{{1 7}}");
}

#[test]
fn test_assign_over_keeps_numeric_kind() {
    assert!(matches!(
        Value::assign_over(&Value::Float(1.5), Value::Int(2)),
        Value::Float(f) if f == 2.0
    ));
    assert!(matches!(Value::assign_over(&Value::Uint(1), Value::Int(2)), Value::Uint(2)));
    assert!(matches!(Value::assign_over(&Value::Int(1), Value::from("s")), Value::Str(_)));
}

#[test]
fn test_type_names() {
    let interner = StringInterner::new();
    assert_eq!(Value::Nil.type_name(), "nil");
    assert_eq!(Value::list(vec![]).type_name(), "[]interface {}");
    assert_eq!(point(&interner, 0, 0).type_name(), "Point");
    let ptr = Value::Pointer(Pointer::Cell(new_cell(Value::Int(1))));
    assert_eq!(ptr.type_name(), "*int");
}

proptest! {
    #[test]
    fn test_format_float_round_trips(x in any::<f64>()) {
        prop_assume!(x.is_finite());
        let text = format_float(x);
        let parsed: f64 = match text.parse() {
            Ok(v) => v,
            Err(e) => panic!("{text}: {e}"),
        };
        prop_assert_eq!(parsed.to_bits(), x.to_bits());
    }

    #[test]
    fn test_int_keys_sort_numerically(
        mut keys in proptest::collection::vec(any::<i64>(), 0..20)
    ) {
        let mut map = MapValue::new(None, None);
        for k in &keys {
            prop_assert!(map.insert(Value::Int(*k), Value::Nil).is_ok());
        }
        keys.sort_unstable();
        keys.dedup();
        let sorted: Vec<i64> = map
            .sorted_entries()
            .iter()
            .filter_map(|(k, _)| k.as_int())
            .collect();
        prop_assert_eq!(sorted, keys);
    }
}
