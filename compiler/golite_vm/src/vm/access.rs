//! Indexing, member selection, composite literals and range iteration.

use std::rc::Rc;

use golite_ir::Name;

use super::Vm;
use crate::environment::new_cell;
use crate::errors::{
    index_out_of_bounds, invalid_argument_type, invalid_composite, invalid_indirect,
    nil_dereference, nil_map_write, not_indexable, slice_out_of_bounds, undefined_member,
    EvalError, EvalResult,
};
use crate::interop::{External, NativeFunc};
use crate::types::{TypeDesc, TypeKind};
use crate::value::{BoundMethod, ListRef, MapKey, MapRef, MapValue, Pointer, StructValue, Value};

/// Bound on pointer chains followed by member selection.
const MAX_DEREF: usize = 16;

/// Integer index into a sequence of length `len`.
fn position(key: &Value, len: usize) -> EvalResult<usize> {
    let index = match key {
        Value::Int(i) => *i,
        Value::Uint(u) => i64::try_from(*u).unwrap_or(i64::MAX),
        other => return Err(invalid_argument_type("index", other.type_name())),
    };
    match usize::try_from(index) {
        Ok(i) if i < len => Ok(i),
        _ => Err(index_out_of_bounds(index, len)),
    }
}

/// `base[key]`
pub(super) fn index(base: &Value, key: &Value) -> EvalResult {
    match base {
        Value::List(list) => {
            let list = list.borrow();
            let i = position(key, list.items.len())?;
            Ok(list.items[i].clone())
        }
        Value::Str(s) => {
            let i = position(key, s.len())?;
            Ok(Value::Uint(u64::from(s.as_bytes()[i])))
        }
        Value::Map(map) => {
            let map = map.borrow();
            Ok(map.get(key)?.unwrap_or_else(|| map.zero_elem()))
        }
        // Pointer to an array.
        Value::Pointer(ptr) => index(&ptr.get()?, key),
        Value::Nil => match key {
            Value::Int(_) | Value::Uint(_) => position(key, 0).map(|_| Value::Nil),
            _ => Ok(Value::Nil),
        },
        other => Err(not_indexable(other.type_name())),
    }
}

/// `v, ok := m[key]`
pub(super) fn index_ok(base: &Value, key: &Value) -> EvalResult<(Value, bool)> {
    match base {
        Value::Map(map) => {
            let map = map.borrow();
            Ok(match map.get(key)? {
                Some(value) => (value, true),
                None => (map.zero_elem(), false),
            })
        }
        Value::Nil => Ok((Value::Nil, false)),
        other => Err(invalid_argument_type("comma-ok index", other.type_name())),
    }
}

/// Optional slice bound, defaulting to `default`.
fn bound(value: Option<&Value>, default: usize) -> EvalResult<i64> {
    match value {
        None => Ok(i64::try_from(default).unwrap_or(i64::MAX)),
        Some(v) => v
            .as_int()
            .ok_or_else(|| invalid_argument_type("slice index", v.type_name())),
    }
}

/// Checked `low..high` within `len`.
fn range(low: Option<&Value>, high: Option<&Value>, len: usize) -> EvalResult<(usize, usize)> {
    let lo = bound(low, 0)?;
    let hi = bound(high, len)?;
    match (usize::try_from(lo), usize::try_from(hi)) {
        (Ok(l), Ok(h)) if l <= h && h <= len => Ok((l, h)),
        _ => Err(slice_out_of_bounds(lo, hi, len)),
    }
}

/// `base[low:high]` as a new list or string.
pub(super) fn slice(base: &Value, low: Option<&Value>, high: Option<&Value>) -> EvalResult {
    match base {
        Value::List(list) => {
            let list = list.borrow();
            let (lo, hi) = range(low, high, list.items.len())?;
            Ok(Value::typed_list(list.items[lo..hi].to_vec(), list.elem.clone()))
        }
        Value::Str(s) => {
            let (lo, hi) = range(low, high, s.len())?;
            Ok(Value::string(String::from_utf8_lossy(&s.as_bytes()[lo..hi]).into_owned()))
        }
        Value::Pointer(ptr) => slice(&ptr.get()?, low, high),
        Value::Nil => range(low, high, 0).map(|_| Value::Nil),
        other => Err(invalid_argument_type("slice", other.type_name())),
    }
}

/// `&base[key]`
pub(super) fn index_addr(base: &Value, key: Value) -> EvalResult<Pointer> {
    match base {
        Value::List(list) => {
            let len = list.borrow().items.len();
            let i = position(&key, len)?;
            Ok(Pointer::Elem(Rc::clone(list), i))
        }
        Value::Map(map) => {
            let key = map.borrow().coerce_key(key);
            let id = MapKey::from_value(&key)?;
            Ok(Pointer::Entry(Rc::clone(map), id, Rc::new(key)))
        }
        Value::Pointer(ptr) => index_addr(&ptr.get()?, key),
        Value::Str(_) => Err(EvalError::host("cannot assign to string index")),
        Value::Nil => Err(nil_map_write()),
        other => Err(not_indexable(other.type_name())),
    }
}

/// `*ptr`
pub(super) fn deref(ptr: &Value) -> EvalResult {
    match ptr {
        Value::Pointer(p) => p.get(),
        Value::Nil => Err(nil_dereference()),
        other => Err(invalid_indirect(other.type_name())),
    }
}

/// `*ptr = value`
pub(super) fn store(ptr: &Value, value: Value) -> EvalResult<()> {
    match ptr {
        Value::Pointer(p) => p.set(value),
        Value::Nil => Err(nil_dereference()),
        other => Err(invalid_indirect(other.type_name())),
    }
}

/// Follow pointers from `value`, returning the last pointer seen and the
/// value it refers to.
fn walk_pointers(mut value: Value) -> EvalResult<(Option<Pointer>, Value)> {
    let mut last = None;
    for _ in 0..MAX_DEREF {
        let Value::Pointer(ptr) = value else {
            return Ok((last, value));
        };
        value = ptr.get()?;
        last = Some(ptr);
    }
    Ok((last, value))
}

fn bind(recv: Value, method: Value) -> Value {
    Value::BoundMethod(Rc::new(BoundMethod { recv, method }))
}

/// A host method as a callable bound to its receiver.
fn host_method(ext: &External, name: &str) -> Value {
    let receiver = ext.clone();
    let method: Rc<str> = Rc::from(name);
    let label = format!("{}.{name}", ext.type_name());
    Value::Native(Rc::new(NativeFunc::new(label, move |args| {
        receiver.call_method(&method, args)
    })))
}

impl Vm {
    /// `base.name`: a field, a method value, a host member, a method
    /// expression on a type, or an entry of a module map.
    pub(super) fn select(&self, base: Value, name: Name) -> EvalResult {
        let label = self.config.interner.lookup(name);
        let (ptr, value) = walk_pointers(base)?;
        match value {
            Value::Struct(s) => {
                if let Some(i) = s.field_index(name) {
                    return Ok(s.fields[i].clone());
                }
                let Some(method) = s.ty.method(name) else {
                    return Err(undefined_member(label, s.ty.to_string()));
                };
                let recv = match (method.pointer, ptr) {
                    (true, Some(ptr)) => Value::Pointer(ptr),
                    (true, None) => Value::Pointer(Pointer::Cell(new_cell(Value::Struct(s)))),
                    (false, _) => Value::Struct(s),
                };
                Ok(bind(recv, method.func))
            }
            Value::External(ext) => {
                if ext.has_field(label) {
                    ext.get_field(label)
                } else if ext.has_method(label) {
                    Ok(host_method(&ext, label))
                } else {
                    Err(undefined_member(label, ext.type_name()))
                }
            }
            Value::Type(ty) => match ty.method(name) {
                Some(method) => Ok(method.func),
                None => Err(undefined_member(label, ty.to_string())),
            },
            Value::Map(map) => {
                let map = map.borrow();
                map.get(&Value::string(label))?
                    .ok_or_else(|| undefined_member(label, "map"))
            }
            Value::Nil => Err(nil_dereference()),
            other => Err(undefined_member(label, other.type_name())),
        }
    }

    /// `&base.name` for an assignment to a field.
    pub(super) fn field_addr(&self, base: Value, name: Name) -> EvalResult<Pointer> {
        let label = self.config.interner.lookup(name);
        let (ptr, value) = walk_pointers(base)?;
        match value {
            Value::Struct(s) => {
                let Some(i) = s.field_index(name) else {
                    return Err(undefined_member(label, s.ty.to_string()));
                };
                // A non-addressable struct gets a temporary home.
                let parent = match ptr {
                    Some(ptr) => ptr,
                    None => Pointer::Cell(new_cell(Value::Struct(s))),
                };
                Ok(Pointer::Field(Rc::new(parent), i))
            }
            Value::External(ext) if ext.has_field(label) => {
                Ok(Pointer::HostField(ext, Rc::from(label)))
            }
            Value::External(ext) => Err(undefined_member(label, ext.type_name())),
            Value::Map(map) => {
                let key = Value::string(label);
                let id = map.borrow().key_of(&key)?;
                Ok(Pointer::Entry(map, id, Rc::new(key)))
            }
            Value::Nil => Err(nil_dereference()),
            other => Err(undefined_member(label, other.type_name())),
        }
    }

    /// Build a composite literal of type `ty`.
    pub(super) fn composite(
        &self,
        ty: &Rc<TypeDesc>,
        values: Vec<Value>,
        keyed: bool,
    ) -> EvalResult {
        let mut elements: Vec<(Option<Value>, Value)> = Vec::with_capacity(values.len());
        let mut values = values.into_iter();
        while let Some(first) = values.next() {
            if keyed {
                let value = values.next().unwrap_or_default();
                elements.push((Some(first), value));
            } else {
                elements.push((None, first));
            }
        }

        let kind = ty.kind().clone();
        match kind {
            TypeKind::List { elem, len } => list_literal(ty, &elem, len, elements),
            TypeKind::Map { key, elem } => {
                let mut map = MapValue::new(Some(key), Some(elem));
                for (key, value) in elements {
                    map.insert(key.unwrap_or_default(), value)?;
                }
                Ok(Value::map(map))
            }
            TypeKind::Struct(layout) => {
                let mut fields: Vec<Value> = layout.types.iter().map(TypeDesc::zero).collect();
                if keyed {
                    for (key, value) in elements {
                        let Some(Value::Str(label)) = key else {
                            return Err(invalid_composite(
                                ty.to_string(),
                                "mixture of field:value and value elements",
                            ));
                        };
                        let Some(i) = layout.position(&label) else {
                            return Err(undefined_member(&label, ty.to_string()));
                        };
                        fields[i] = layout.types[i].coerce(value);
                    }
                } else if !elements.is_empty() {
                    if elements.len() != layout.len() {
                        let reason = if elements.len() < layout.len() {
                            "too few values"
                        } else {
                            "too many values"
                        };
                        return Err(invalid_composite(ty.to_string(), reason));
                    }
                    for (i, (_, value)) in elements.into_iter().enumerate() {
                        fields[i] = layout.types[i].coerce(value);
                    }
                }
                Ok(Value::Struct(Box::new(StructValue {
                    ty: Rc::clone(ty),
                    fields,
                })))
            }
            TypeKind::External(info) => {
                let value = info
                    .construct()
                    .ok_or_else(|| invalid_composite(ty.to_string(), "no constructor"))?;
                if let Value::External(ext) = &value {
                    for (key, field) in elements {
                        let Some(Value::Str(label)) = key else {
                            return Err(invalid_composite(
                                ty.to_string(),
                                "host types take field:value elements",
                            ));
                        };
                        ext.set_field(&label, field)?;
                    }
                }
                Ok(value)
            }
            _ => Err(invalid_composite(ty.to_string(), "not a composite type")),
        }
    }
}

/// Slice or array literal; a `nil` key means the index after the previous
/// element.
fn list_literal(
    ty: &Rc<TypeDesc>,
    elem: &Rc<TypeDesc>,
    len: Option<usize>,
    elements: Vec<(Option<Value>, Value)>,
) -> EvalResult {
    let mut items: Vec<Value> = Vec::with_capacity(len.unwrap_or(elements.len()));
    let mut next = 0usize;
    for (key, value) in elements {
        let at = match key {
            None | Some(Value::Nil) => next,
            Some(key) => match key.as_int().map(usize::try_from) {
                Some(Ok(i)) => i,
                _ => {
                    return Err(invalid_composite(
                        ty.to_string(),
                        "index must be a non-negative integer",
                    ))
                }
            },
        };
        if let Some(len) = len {
            if at >= len {
                return Err(index_out_of_bounds(i64::try_from(at).unwrap_or(i64::MAX), len));
            }
        }
        if items.len() <= at {
            items.resize_with(at + 1, || elem.zero());
        }
        items[at] = elem.coerce(value);
        next = at + 1;
    }
    if let Some(len) = len {
        if items.len() < len {
            items.resize_with(len, || elem.zero());
        }
    }
    Ok(Value::typed_list(items, Some(Rc::clone(elem))))
}

#[cold]
fn cannot_range(value: &Value) -> EvalError {
    EvalError::host(format!("cannot range over {}", value.type_name()))
}

/// State of one `for range` loop.
pub(super) enum RangeIter {
    /// The length is fixed when the loop starts.
    List { list: ListRef, len: usize, pos: usize },
    /// Keys are snapshotted in order; entries deleted during the loop are
    /// skipped.
    Map {
        map: MapRef,
        keys: Vec<(MapKey, Value)>,
        pos: usize,
    },
    /// Byte offset and rune of each character.
    Str { text: Rc<str>, pos: usize },
    Count { n: u64, pos: u64, unsigned: bool },
}

impl RangeIter {
    pub(super) fn new(iterable: Value) -> EvalResult<RangeIter> {
        Ok(match iterable {
            Value::List(list) => {
                let len = list.borrow().items.len();
                RangeIter::List { list, len, pos: 0 }
            }
            Value::Map(map) => {
                let keys = map
                    .borrow()
                    .sorted_entries()
                    .into_iter()
                    .map(|(key, _)| MapKey::from_value(&key).map(|id| (id, key)))
                    .collect::<EvalResult<_>>()?;
                RangeIter::Map { map, keys, pos: 0 }
            }
            Value::Str(text) => RangeIter::Str { text, pos: 0 },
            Value::Int(n) => RangeIter::Count {
                n: u64::try_from(n).unwrap_or(0),
                pos: 0,
                unsigned: false,
            },
            Value::Uint(n) => RangeIter::Count {
                n,
                pos: 0,
                unsigned: true,
            },
            Value::Nil => RangeIter::Count {
                n: 0,
                pos: 0,
                unsigned: false,
            },
            Value::Pointer(ptr) => match ptr.get()? {
                list @ Value::List(_) => RangeIter::new(list)?,
                other => return Err(cannot_range(&other)),
            },
            other => return Err(cannot_range(&other)),
        })
    }

    /// Next key and value, or `None` when exhausted.
    pub(super) fn next(&mut self) -> Option<(Value, Value)> {
        match self {
            RangeIter::List { list, len, pos } => {
                if *pos >= *len {
                    return None;
                }
                let item = list.borrow().items.get(*pos).cloned()?;
                let key = Value::Int(i64::try_from(*pos).unwrap_or(i64::MAX));
                *pos += 1;
                Some((key, item))
            }
            RangeIter::Map { map, keys, pos } => {
                while let Some((id, key)) = keys.get(*pos) {
                    *pos += 1;
                    if let Some(value) = map.borrow().get_by_id(id) {
                        return Some((key.clone(), value.clone()));
                    }
                }
                None
            }
            RangeIter::Str { text, pos } => {
                let c = text.get(*pos..)?.chars().next()?;
                let key = Value::Int(i64::try_from(*pos).unwrap_or(i64::MAX));
                *pos += c.len_utf8();
                Some((key, Value::Int(i64::from(u32::from(c)))))
            }
            RangeIter::Count { n, pos, unsigned } => {
                if *pos >= *n {
                    return None;
                }
                let key = if *unsigned {
                    Value::Uint(*pos)
                } else {
                    Value::Int(i64::try_from(*pos).unwrap_or(i64::MAX))
                };
                *pos += 1;
                Some((key.clone(), key))
            }
        }
    }
}
