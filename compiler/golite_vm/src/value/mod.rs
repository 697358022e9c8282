//! Runtime values.
//!
//! [`Value`] is a closed sum over every kind a script can observe. Scalars
//! and strings are immutable and cheap to clone. Lists and maps are shared
//! references (`Rc<RefCell<_>>`), so assignment aliases them as in Go;
//! structs are owned and copied on assignment.

mod format;
mod pointer;

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use golite_compile::Function;
use rustc_hash::FxHashMap;

use crate::builtins::Builtin;
use crate::errors::{invalid_map_key, nil_map_write, EvalResult};
use crate::interop::{External, NativeFunc};
use crate::types::TypeDesc;
use crate::Env;

pub use format::format_float;
pub use pointer::Pointer;

/// `complex128`
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const fn new(re: f64, im: f64) -> Self {
        Complex { re, im }
    }

    #[must_use]
    pub fn add(self, other: Complex) -> Complex {
        Complex::new(self.re + other.re, self.im + other.im)
    }

    #[must_use]
    pub fn sub(self, other: Complex) -> Complex {
        Complex::new(self.re - other.re, self.im - other.im)
    }

    #[must_use]
    pub fn mul(self, other: Complex) -> Complex {
        Complex::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    #[must_use]
    pub fn div(self, other: Complex) -> Complex {
        let denom = other.re * other.re + other.im * other.im;
        Complex::new(
            (self.re * other.re + self.im * other.im) / denom,
            (self.im * other.re - self.re * other.im) / denom,
        )
    }
}

pub type ListRef = Rc<RefCell<ListValue>>;
pub type MapRef = Rc<RefCell<MapValue>>;

/// Backing store of a slice or array.
#[derive(Clone, Debug, Default)]
pub struct ListValue {
    pub items: Vec<Value>,
    /// Cleared for lists the engine hands out read-only, such as multiple
    /// return values.
    pub mutable: bool,
    /// Element type, when the list was built from a typed literal or `make`.
    pub elem: Option<Rc<TypeDesc>>,
}

impl ListValue {
    pub fn new(items: Vec<Value>, elem: Option<Rc<TypeDesc>>) -> Self {
        ListValue {
            items,
            mutable: true,
            elem,
        }
    }

    /// Apply the element type's implicit numeric conversion.
    pub fn coerce(&self, value: Value) -> Value {
        match &self.elem {
            Some(elem) => elem.coerce(value),
            None => value,
        }
    }
}

/// Hashable identity of a map key.
///
/// Keys compare by scalar or string value; pointers and host values by
/// identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(u64),
    Complex(u64, u64),
    Str(Rc<str>),
    Ref(usize, usize),
    Struct(Vec<MapKey>),
}

impl MapKey {
    pub fn from_value(value: &Value) -> EvalResult<MapKey> {
        Ok(match value {
            Value::Nil => MapKey::Nil,
            Value::Bool(b) => MapKey::Bool(*b),
            Value::Int(i) => MapKey::Int(*i),
            Value::Uint(u) => MapKey::Uint(*u),
            // -0.0 and 0.0 are the same key.
            Value::Float(f) => MapKey::Float((*f + 0.0).to_bits()),
            Value::Complex(c) => MapKey::Complex((c.re + 0.0).to_bits(), (c.im + 0.0).to_bits()),
            Value::Str(s) => MapKey::Str(Rc::clone(s)),
            Value::Pointer(p) => {
                let (base, offset) = p.address();
                MapKey::Ref(base, offset)
            }
            Value::Type(t) => MapKey::Ref(Rc::as_ptr(t) as usize, 0),
            Value::External(e) => MapKey::Ref(e.address(), 0),
            Value::Struct(s) => MapKey::Struct(
                s.fields
                    .iter()
                    .map(MapKey::from_value)
                    .collect::<EvalResult<_>>()?,
            ),
            other => return Err(invalid_map_key(other.type_name())),
        })
    }
}

/// Map contents: key identity to the original key and its value.
#[derive(Clone, Debug, Default)]
pub struct MapValue {
    entries: FxHashMap<MapKey, (Value, Value)>,
    pub key: Option<Rc<TypeDesc>>,
    pub elem: Option<Rc<TypeDesc>>,
    nil: bool,
}

impl MapValue {
    pub fn new(key: Option<Rc<TypeDesc>>, elem: Option<Rc<TypeDesc>>) -> Self {
        MapValue {
            entries: FxHashMap::default(),
            key,
            elem,
            nil: false,
        }
    }

    /// Zero value of a map type: empty, equal to `nil` and read-only.
    pub fn nil(key: Option<Rc<TypeDesc>>, elem: Option<Rc<TypeDesc>>) -> Self {
        MapValue {
            nil: true,
            ..MapValue::new(key, elem)
        }
    }

    pub fn is_nil(&self) -> bool {
        self.nil
    }

    /// Apply the key type's implicit numeric conversion.
    pub fn coerce_key(&self, key: Value) -> Value {
        match &self.key {
            Some(ty) => ty.coerce(key),
            None => key,
        }
    }

    /// Identity of `key` after conversion to the map's key type.
    pub fn key_of(&self, key: &Value) -> EvalResult<MapKey> {
        MapKey::from_value(&self.coerce_key(key.clone()))
    }

    pub fn get(&self, key: &Value) -> EvalResult<Option<Value>> {
        let id = self.key_of(key)?;
        Ok(self.entries.get(&id).map(|(_, v)| v.clone()))
    }

    pub fn get_by_id(&self, id: &MapKey) -> Option<&Value> {
        self.entries.get(id).map(|(_, v)| v)
    }

    pub fn get_mut_by_id(&mut self, id: &MapKey) -> Option<&mut Value> {
        self.entries.get_mut(id).map(|(_, v)| v)
    }

    pub fn insert(&mut self, key: Value, value: Value) -> EvalResult<()> {
        let key = self.coerce_key(key);
        let id = MapKey::from_value(&key)?;
        self.insert_by_id(id, key, value)
    }

    pub fn insert_by_id(&mut self, id: MapKey, key: Value, value: Value) -> EvalResult<()> {
        if self.nil {
            return Err(nil_map_write());
        }
        let value = self.coerce_elem(value);
        self.entries.insert(id, (key, value));
        Ok(())
    }

    pub fn remove(&mut self, key: &Value) -> EvalResult<()> {
        let id = self.key_of(key)?;
        self.entries.remove(&id);
        Ok(())
    }

    pub fn coerce_elem(&self, value: Value) -> Value {
        match &self.elem {
            Some(ty) => ty.coerce(value),
            None => value,
        }
    }

    /// Zero value of the element type.
    pub fn zero_elem(&self) -> Value {
        self.elem.as_ref().map_or(Value::Nil, |ty| ty.zero())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of all entries in unspecified order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.entries.values().cloned().collect()
    }

    /// Snapshot of all entries ordered by key.
    pub fn sorted_entries(&self) -> Vec<(Value, Value)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| key_order(&(a.1).0, &(b.1).0).then_with(|| a.0.cmp(b.0)));
        entries.into_iter().map(|(_, kv)| kv.clone()).collect()
    }
}

/// Natural order of two map keys of the same kind.
fn key_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Uint(x), Value::Uint(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// A struct value: its type and one slot per field.
#[derive(Clone, Debug)]
pub struct StructValue {
    pub ty: Rc<TypeDesc>,
    pub fields: Vec<Value>,
}

impl StructValue {
    /// Index of field `name`.
    pub fn field_index(&self, name: golite_ir::Name) -> Option<usize> {
        self.ty.struct_layout().and_then(|layout| layout.index_of(name))
    }
}

/// A function body paired with the environment it was created in.
pub struct Closure {
    pub func: Rc<Function>,
    pub env: Env,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.func.params.len())
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

/// Method value: a receiver bound to a method.
#[derive(Debug)]
pub struct BoundMethod {
    pub recv: Value,
    pub method: Value,
}

/// Runtime value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Complex(Complex),
    Str(Rc<str>),
    List(ListRef),
    Map(MapRef),
    Struct(Box<StructValue>),
    Pointer(Pointer),
    Closure(Rc<Closure>),
    BoundMethod(Rc<BoundMethod>),
    Builtin(Builtin),
    Native(Rc<NativeFunc>),
    Type(Rc<TypeDesc>),
    External(External),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::Str(s.into())
    }

    /// A fresh mutable list with no element type.
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(ListValue::new(items, None))))
    }

    pub fn typed_list(items: Vec<Value>, elem: Option<Rc<TypeDesc>>) -> Value {
        Value::List(Rc::new(RefCell::new(ListValue::new(items, elem))))
    }

    /// An immutable list, used to carry multiple results.
    pub fn tuple(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(ListValue {
            items,
            mutable: false,
            elem: None,
        })))
    }

    pub fn map(map: MapValue) -> Value {
        Value::Map(Rc::new(RefCell::new(map)))
    }

    pub fn is_nil(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Map(map) => map.borrow().is_nil(),
            _ => false,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Closure(_)
                | Value::BoundMethod(_)
                | Value::Builtin(_)
                | Value::Native(_)
                | Value::Type(_)
        )
    }

    /// Go truthiness is only defined for booleans.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value of an `Int` or `Uint`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Uint(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the value's dynamic type, as used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "nil".to_owned(),
            Value::Bool(_) => "bool".to_owned(),
            Value::Int(_) => "int".to_owned(),
            Value::Uint(_) => "uint".to_owned(),
            Value::Float(_) => "float64".to_owned(),
            Value::Complex(_) => "complex128".to_owned(),
            Value::Str(_) => "string".to_owned(),
            Value::List(list) => match &list.borrow().elem {
                Some(elem) => format!("[]{elem}"),
                None => "[]interface {}".to_owned(),
            },
            Value::Map(map) => {
                let map = map.borrow();
                match (&map.key, &map.elem) {
                    (Some(k), Some(v)) => format!("map[{k}]{v}"),
                    _ => "map[interface {}]interface {}".to_owned(),
                }
            }
            Value::Struct(s) => s.ty.to_string(),
            Value::Pointer(p) => match p.get() {
                Ok(target) => format!("*{}", target.type_name()),
                Err(_) => "pointer".to_owned(),
            },
            Value::Closure(_) | Value::BoundMethod(_) | Value::Builtin(_) | Value::Native(_) => {
                "func".to_owned()
            }
            Value::Type(_) => "type".to_owned(),
            Value::External(e) => e.type_name().to_owned(),
        }
    }

    /// Value to store over `old`, keeping the numeric kind of a variable
    /// initialised with a float, unsigned or complex value.
    pub fn assign_over(old: &Value, new: Value) -> Value {
        match (old, new) {
            (Value::Float(_), Value::Int(i)) => Value::Float(i as f64),
            (Value::Uint(_), Value::Int(i)) => Value::Uint(i as u64),
            (Value::Complex(_), Value::Int(i)) => Value::Complex(Complex::new(i as f64, 0.0)),
            (Value::Complex(_), Value::Float(f)) => Value::Complex(Complex::new(f, 0.0)),
            (_, new) => new,
        }
    }

    /// Type descriptor of a type value.
    pub fn as_type(&self) -> Option<&Rc<TypeDesc>> {
        match self {
            Value::Type(t) => Some(t),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

#[cfg(test)]
mod tests;
