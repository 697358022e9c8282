//! Type descriptors.
//!
//! Types are first-class values at run time. A [`TypeDesc`] describes a
//! predeclared type, a composite built by `MakeType`, a named type declared
//! in the script, or a host type registered through [`HostType`].
//!
//! Named types are created incomplete and completed once their underlying
//! type is known, so a type can refer to itself through a pointer, slice or
//! map.
//!
//! [`HostType`]: crate::HostType

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use golite_compile::NumKind;
use golite_ir::{Name, StringInterner};
use rustc_hash::FxHashMap;

use crate::errors::{invalid_argument_type, EvalResult};
use crate::interop::HostTypeInfo;
use crate::value::{Complex, MapValue, StructValue, Value};

/// Bound on nested zero-value construction (`type T struct { a [2]T }`).
const MAX_ZERO_DEPTH: usize = 64;

/// A method attached to a named type.
#[derive(Clone, Debug)]
pub struct Method {
    /// Closure taking the receiver as its first parameter.
    pub func: Value,
    /// Declared with a pointer receiver.
    pub pointer: bool,
}

/// Field layout of a struct type.
#[derive(Debug)]
pub struct StructLayout {
    pub names: Rc<[Name]>,
    pub types: Vec<Rc<TypeDesc>>,
    labels: Vec<&'static str>,
    index: FxHashMap<Name, usize>,
}

impl StructLayout {
    pub fn new(names: Rc<[Name]>, types: Vec<Rc<TypeDesc>>, interner: &StringInterner) -> Self {
        let labels = names.iter().map(|n| interner.lookup(*n)).collect();
        let index = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        StructLayout {
            names,
            types,
            labels,
            index,
        }
    }

    pub fn index_of(&self, name: Name) -> Option<usize> {
        self.index.get(&name).copied()
    }

    /// Index of the field spelled `label`.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| *l == label)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Structure of a type.
#[derive(Clone, Debug)]
pub enum TypeKind {
    /// A named type whose underlying type has not been set yet.
    Incomplete,
    Bool,
    Int,
    Uint,
    Float,
    Complex,
    String,
    /// Method names required; empty for `any`.
    Interface {
        methods: Rc<[Name]>,
        labels: Rc<[&'static str]>,
    },
    /// Slice, or array when `len` is known.
    List {
        elem: Rc<TypeDesc>,
        len: Option<usize>,
    },
    Map {
        key: Rc<TypeDesc>,
        elem: Rc<TypeDesc>,
    },
    Pointer(Rc<TypeDesc>),
    Func,
    Chan(Rc<TypeDesc>),
    Struct(Rc<StructLayout>),
    External(Rc<HostTypeInfo>),
}

/// Runtime type descriptor.
pub struct TypeDesc {
    name: Option<Rc<str>>,
    kind: RefCell<TypeKind>,
    methods: RefCell<FxHashMap<Name, Method>>,
}

impl TypeDesc {
    /// An unnamed type.
    pub fn new(kind: TypeKind) -> Rc<Self> {
        Rc::new(TypeDesc {
            name: None,
            kind: RefCell::new(kind),
            methods: RefCell::new(FxHashMap::default()),
        })
    }

    pub fn named(name: impl Into<Rc<str>>, kind: TypeKind) -> Rc<Self> {
        Rc::new(TypeDesc {
            name: Some(name.into()),
            kind: RefCell::new(kind),
            methods: RefCell::new(FxHashMap::default()),
        })
    }

    /// A named type to be completed by [`set_underlying`](Self::set_underlying).
    pub fn declared(name: impl Into<Rc<str>>) -> Rc<Self> {
        TypeDesc::named(name, TypeKind::Incomplete)
    }

    /// Complete a declared type with the structure of `underlying`.
    ///
    /// Methods of `underlying` are not inherited.
    pub fn set_underlying(&self, underlying: &TypeDesc) {
        let kind = underlying.kind().clone();
        *self.kind.borrow_mut() = kind;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> Ref<'_, TypeKind> {
        self.kind.borrow()
    }

    pub fn method(&self, name: Name) -> Option<Method> {
        self.methods.borrow().get(&name).cloned()
    }

    pub fn define_method(&self, name: Name, method: Method) {
        self.methods.borrow_mut().insert(name, method);
    }

    /// Whether a value of this type has all of `names` in its method set.
    fn has_methods(&self, names: &[Name], include_pointer: bool) -> bool {
        let methods = self.methods.borrow();
        names.iter().all(|n| {
            methods
                .get(n)
                .is_some_and(|m| include_pointer || !m.pointer)
        })
    }

    pub fn struct_layout(&self) -> Option<Rc<StructLayout>> {
        match &*self.kind() {
            TypeKind::Struct(layout) => Some(Rc::clone(layout)),
            _ => None,
        }
    }

    pub fn host_info(&self) -> Option<Rc<HostTypeInfo>> {
        match &*self.kind() {
            TypeKind::External(info) => Some(Rc::clone(info)),
            _ => None,
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(*self.kind(), TypeKind::Interface { .. })
    }

    pub fn num_kind(&self) -> Option<NumKind> {
        match *self.kind() {
            TypeKind::Int => Some(NumKind::Int),
            TypeKind::Uint => Some(NumKind::Uint),
            TypeKind::Float => Some(NumKind::Float),
            TypeKind::Complex => Some(NumKind::Complex),
            _ => None,
        }
    }

    /// Zero value of the type.
    pub fn zero(self: &Rc<Self>) -> Value {
        self.zero_at(0)
    }

    fn zero_at(self: &Rc<Self>, depth: usize) -> Value {
        if depth > MAX_ZERO_DEPTH {
            return Value::Nil;
        }
        match &*self.kind() {
            TypeKind::Bool => Value::Bool(false),
            TypeKind::Int => Value::Int(0),
            TypeKind::Uint => Value::Uint(0),
            TypeKind::Float => Value::Float(0.0),
            TypeKind::Complex => Value::Complex(Complex::default()),
            TypeKind::String => Value::string(""),
            TypeKind::List {
                elem,
                len: Some(len),
            } => {
                let items = (0..*len).map(|_| elem.zero_at(depth + 1)).collect();
                Value::typed_list(items, Some(Rc::clone(elem)))
            }
            TypeKind::Struct(layout) => Value::Struct(Box::new(StructValue {
                ty: Rc::clone(self),
                fields: layout.types.iter().map(|t| t.zero_at(depth + 1)).collect(),
            })),
            TypeKind::Map { key, elem } => {
                Value::map(MapValue::nil(Some(Rc::clone(key)), Some(Rc::clone(elem))))
            }
            TypeKind::External(info) => info.construct().unwrap_or(Value::Nil),
            TypeKind::Incomplete
            | TypeKind::Interface { .. }
            | TypeKind::List { len: None, .. }
            | TypeKind::Pointer(_)
            | TypeKind::Func
            | TypeKind::Chan(_) => Value::Nil,
        }
    }

    /// Implicit conversion of an untyped numeric value to this type, used
    /// for typed declarations, parameters, results and container elements.
    pub fn coerce(&self, value: Value) -> Value {
        match self.num_kind() {
            Some(kind) => coerce_num(value, kind),
            None => value,
        }
    }

    /// Explicit conversion `T(value)`.
    pub fn convert(self: &Rc<Self>, value: Value) -> EvalResult {
        let fail = |value: &Value| invalid_argument_type(&self.to_string(), value.type_name());
        let kind = self.kind().clone();
        let converted = match (&kind, value) {
            (TypeKind::Bool, Value::Bool(b)) => Value::Bool(b),
            (TypeKind::Bool, Value::Str(s)) => Value::Bool(!s.is_empty()),
            (TypeKind::Bool, Value::Int(i)) => Value::Bool(i != 0),
            (TypeKind::Bool, Value::Uint(u)) => Value::Bool(u != 0),
            (TypeKind::Bool, Value::Float(f)) => Value::Bool(f != 0.0),
            (TypeKind::Bool, Value::Nil) => Value::Bool(false),

            (TypeKind::Int, Value::Int(i)) => self.truncate(Value::Int(i)),
            (TypeKind::Int, Value::Uint(u)) => self.truncate(Value::Int(u as i64)),
            (TypeKind::Int, Value::Float(f)) => self.truncate(Value::Int(f as i64)),
            (TypeKind::Uint, Value::Int(i)) => self.truncate(Value::Uint(i as u64)),
            (TypeKind::Uint, Value::Uint(u)) => self.truncate(Value::Uint(u)),
            (TypeKind::Uint, Value::Float(f)) => self.truncate(Value::Uint(f as u64)),
            (TypeKind::Float, Value::Int(i)) => self.truncate(Value::Float(i as f64)),
            (TypeKind::Float, Value::Uint(u)) => self.truncate(Value::Float(u as f64)),
            (TypeKind::Float, Value::Float(f)) => self.truncate(Value::Float(f)),
            (TypeKind::Complex, Value::Complex(c)) => Value::Complex(c),
            (TypeKind::Complex, v @ (Value::Int(_) | Value::Uint(_) | Value::Float(_))) => {
                coerce_num(v, NumKind::Complex)
            }

            (TypeKind::String, Value::Str(s)) => Value::Str(s),
            (TypeKind::String, Value::Int(i)) => Value::string(rune_string(i)),
            (TypeKind::String, Value::Uint(u)) => {
                Value::string(rune_string(i64::try_from(u).unwrap_or(-1)))
            }
            (TypeKind::String, Value::Nil) => Value::string(""),
            (TypeKind::String, Value::List(list)) => {
                let mut bytes = Vec::new();
                for item in &list.borrow().items {
                    match item {
                        Value::Uint(b) => bytes.push(u8::try_from(*b).unwrap_or(u8::MAX)),
                        Value::Int(r) => bytes.extend_from_slice(rune_string(*r).as_bytes()),
                        other => return Err(fail(other)),
                    }
                }
                Value::string(String::from_utf8_lossy(&bytes).into_owned())
            }

            (TypeKind::List { elem, .. }, Value::Str(s)) => match elem.num_kind() {
                Some(NumKind::Uint) => Value::typed_list(
                    s.bytes().map(|b| Value::Uint(u64::from(b))).collect(),
                    Some(Rc::clone(elem)),
                ),
                Some(NumKind::Int) => Value::typed_list(
                    s.chars().map(|c| Value::Int(i64::from(u32::from(c)))).collect(),
                    Some(Rc::clone(elem)),
                ),
                _ => return Err(fail(&Value::Str(s))),
            },
            (TypeKind::List { elem, .. }, Value::List(list)) => {
                let items = list.borrow().items.clone();
                Value::typed_list(items, Some(Rc::clone(elem)))
            }

            (TypeKind::Struct(layout), Value::Struct(s)) if s.fields.len() == layout.len() => {
                Value::Struct(Box::new(StructValue {
                    ty: Rc::clone(self),
                    fields: s.fields,
                }))
            }

            (TypeKind::Interface { .. }, v) => v,
            (TypeKind::Map { .. }, Value::Nil) => self.zero(),
            (TypeKind::List { .. } | TypeKind::Pointer(_), Value::Nil) => Value::Nil,
            (TypeKind::Map { .. }, v @ Value::Map(_)) => v,
            (TypeKind::Pointer(_), v @ Value::Pointer(_)) => v,
            (TypeKind::Func, v) if v.is_callable() || v.is_nil() => v,
            (TypeKind::External(info), Value::External(e)) if e.is_instance_of(info) => {
                Value::External(e)
            }
            (_, other) => return Err(fail(&other)),
        };
        Ok(converted)
    }

    /// Wrap a converted value to the width of a sized numeric type.
    fn truncate(&self, value: Value) -> Value {
        let Some(name) = self.name() else {
            return value;
        };
        match (name, value) {
            ("int8", Value::Int(i)) => Value::Int(i64::from(i as i8)),
            ("int16", Value::Int(i)) => Value::Int(i64::from(i as i16)),
            ("int32" | "rune", Value::Int(i)) => Value::Int(i64::from(i as i32)),
            ("uint8" | "byte", Value::Uint(u)) => Value::Uint(u64::from(u as u8)),
            ("uint16", Value::Uint(u)) => Value::Uint(u64::from(u as u16)),
            ("uint32", Value::Uint(u)) => Value::Uint(u64::from(u as u32)),
            ("float32", Value::Float(f)) => Value::Float(f64::from(f as f32)),
            (_, value) => value,
        }
    }

    /// Whether `value` has this type, for type assertions.
    pub fn matches(&self, value: &Value, interner: &StringInterner) -> bool {
        match (&*self.kind(), value) {
            (TypeKind::Interface { methods, .. }, value) => {
                !value.is_nil() && implements(value, methods, interner)
            }
            (TypeKind::Bool, Value::Bool(_))
            | (TypeKind::Int, Value::Int(_))
            | (TypeKind::Uint, Value::Uint(_))
            | (TypeKind::Float, Value::Float(_))
            | (TypeKind::Complex, Value::Complex(_))
            | (TypeKind::String, Value::Str(_))
            | (TypeKind::List { .. }, Value::List(_))
            | (TypeKind::Map { .. }, Value::Map(_)) => true,
            (TypeKind::Struct(layout), Value::Struct(s)) => {
                if self.name.is_some() {
                    std::ptr::eq(self, Rc::as_ptr(&s.ty))
                } else {
                    s.ty.name.is_none()
                        && s.ty.struct_layout().is_some_and(|l| l.names == layout.names)
                }
            }
            (TypeKind::Pointer(elem), Value::Pointer(p)) => match p.get() {
                Ok(target @ (Value::Struct(_) | Value::External(_))) => {
                    elem.matches(&target, interner)
                }
                _ => true,
            },
            (TypeKind::Func, v) => v.is_callable(),
            (TypeKind::External(info), Value::External(e)) => e.is_instance_of(info),
            _ => false,
        }
    }
}

/// Whether `value` has every method in `names`.
fn implements(value: &Value, names: &[Name], interner: &StringInterner) -> bool {
    if names.is_empty() {
        return true;
    }
    match value {
        Value::Struct(s) => s.ty.has_methods(names, false),
        Value::Pointer(p) => match p.get() {
            Ok(Value::Struct(s)) => s.ty.has_methods(names, true),
            Ok(Value::External(e)) => names.iter().all(|n| e.has_method(interner.lookup(*n))),
            _ => false,
        },
        Value::External(e) => names.iter().all(|n| e.has_method(interner.lookup(*n))),
        _ => false,
    }
}

/// Convert an integer or float to the numeric kind of a declared type.
pub fn coerce_num(value: Value, kind: NumKind) -> Value {
    match (kind, value) {
        (NumKind::Int, Value::Uint(u)) => Value::Int(u as i64),
        (NumKind::Int, Value::Float(f)) if f.fract() == 0.0 => Value::Int(f as i64),
        (NumKind::Uint, Value::Int(i)) => Value::Uint(i as u64),
        (NumKind::Uint, Value::Float(f)) if f.fract() == 0.0 && f >= 0.0 => {
            Value::Uint(f as u64)
        }
        (NumKind::Float, Value::Int(i)) => Value::Float(i as f64),
        (NumKind::Float, Value::Uint(u)) => Value::Float(u as f64),
        (NumKind::Complex, Value::Int(i)) => Value::Complex(Complex::new(i as f64, 0.0)),
        (NumKind::Complex, Value::Uint(u)) => Value::Complex(Complex::new(u as f64, 0.0)),
        (NumKind::Complex, Value::Float(f)) => Value::Complex(Complex::new(f, 0.0)),
        (_, value) => value,
    }
}

/// `string(rune)`; invalid code points become U+FFFD.
fn rune_string(code: i64) -> String {
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
        .to_string()
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            return f.write_str(name);
        }
        match &*self.kind() {
            TypeKind::Incomplete => f.write_str("<incomplete>"),
            TypeKind::Bool => f.write_str("bool"),
            TypeKind::Int => f.write_str("int"),
            TypeKind::Uint => f.write_str("uint"),
            TypeKind::Float => f.write_str("float64"),
            TypeKind::Complex => f.write_str("complex128"),
            TypeKind::String => f.write_str("string"),
            TypeKind::Interface { labels, .. } => {
                if labels.is_empty() {
                    return f.write_str("interface {}");
                }
                f.write_str("interface { ")?;
                for (i, label) in labels.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{label}()")?;
                }
                f.write_str(" }")
            }
            TypeKind::List { elem, len: None } => write!(f, "[]{elem}"),
            TypeKind::List {
                elem,
                len: Some(len),
            } => write!(f, "[{len}]{elem}"),
            TypeKind::Map { key, elem } => write!(f, "map[{key}]{elem}"),
            TypeKind::Pointer(elem) => write!(f, "*{elem}"),
            TypeKind::Func => f.write_str("func()"),
            TypeKind::Chan(elem) => write!(f, "chan {elem}"),
            TypeKind::Struct(layout) => {
                if layout.is_empty() {
                    return f.write_str("struct {}");
                }
                f.write_str("struct { ")?;
                for (i, (label, ty)) in layout.labels.iter().zip(&layout.types).enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{label} {ty}")?;
                }
                f.write_str(" }")
            }
            TypeKind::External(info) => f.write_str(info.name()),
        }
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDesc({self})")
    }
}

/// Names and descriptors of the predeclared types.
pub fn predeclared(interner: &StringInterner) -> Vec<(&'static str, Rc<TypeDesc>)> {
    let mut types = vec![
        ("bool", TypeDesc::named("bool", TypeKind::Bool)),
        ("string", TypeDesc::named("string", TypeKind::String)),
        ("complex64", TypeDesc::named("complex64", TypeKind::Complex)),
        ("complex128", TypeDesc::named("complex128", TypeKind::Complex)),
        ("float32", TypeDesc::named("float32", TypeKind::Float)),
        ("float64", TypeDesc::named("float64", TypeKind::Float)),
    ];
    for name in ["int", "int8", "int16", "int32", "int64", "rune"] {
        types.push((name, TypeDesc::named(name, TypeKind::Int)));
    }
    for name in ["uint", "uint8", "uint16", "uint32", "uint64", "uintptr", "byte"] {
        types.push((name, TypeDesc::named(name, TypeKind::Uint)));
    }
    let error = interner.intern("Error");
    types.push((
        "error",
        TypeDesc::named(
            "error",
            TypeKind::Interface {
                methods: Rc::from([error]),
                labels: Rc::from(["Error"]),
            },
        ),
    ));
    types.push((
        "any",
        TypeDesc::new(TypeKind::Interface {
            methods: Rc::from([]),
            labels: Rc::from([]),
        }),
    ));
    types
}
