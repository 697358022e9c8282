//! Builtin functions.
//!
//! Builtins live in the root environment as [`Value::Builtin`]. `panic` and
//! `recover` act on VM state and are handled by the call protocol; every
//! other builtin is a plain function of its arguments.

use std::fmt::Write as _;

use golite_ir::BinaryOp;

use crate::environment::new_cell;
use crate::errors::{
    channels_not_supported, immutable_list, invalid_argument_type, length_out_of_range,
    negative_length, wrong_arg_count, wrong_arg_count_range, EvalError, EvalResult,
};
use crate::operators::evaluate_binary;
use crate::print_handler::PrintHandler;
use crate::types::TypeKind;
use crate::value::{Complex, MapValue, Pointer, Value};

/// A builtin function.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Println,
    Panic,
    Recover,
    Len,
    Cap,
    Append,
    Copy,
    Delete,
    Close,
    Complex,
    Real,
    Imag,
    Make,
    New,
    Min,
    Max,
}

impl Builtin {
    pub const ALL: [Builtin; 17] = [
        Builtin::Print,
        Builtin::Println,
        Builtin::Panic,
        Builtin::Recover,
        Builtin::Len,
        Builtin::Cap,
        Builtin::Append,
        Builtin::Copy,
        Builtin::Delete,
        Builtin::Close,
        Builtin::Complex,
        Builtin::Real,
        Builtin::Imag,
        Builtin::Make,
        Builtin::New,
        Builtin::Min,
        Builtin::Max,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Panic => "panic",
            Builtin::Recover => "recover",
            Builtin::Len => "len",
            Builtin::Cap => "cap",
            Builtin::Append => "append",
            Builtin::Copy => "copy",
            Builtin::Delete => "delete",
            Builtin::Close => "close",
            Builtin::Complex => "complex",
            Builtin::Real => "real",
            Builtin::Imag => "imag",
            Builtin::Make => "make",
            Builtin::New => "new",
            Builtin::Min => "min",
            Builtin::Max => "max",
        }
    }

    /// Call a builtin that does not touch VM state.
    pub fn call(self, args: &[Value], print: &PrintHandler) -> EvalResult {
        match self {
            Builtin::Print => {
                print.print(&join(args));
                Ok(Value::Nil)
            }
            Builtin::Println => {
                print.println(&join(args));
                Ok(Value::Nil)
            }
            Builtin::Len | Builtin::Cap => length(self.name(), one(self.name(), args)?),
            Builtin::Append => append(args),
            Builtin::Copy => {
                let [dst, src] = exact(args, "copy")?;
                copy(dst, src)
            }
            Builtin::Delete => {
                let [map, key] = exact(args, "delete")?;
                match map {
                    Value::Map(m) => m.borrow_mut().remove(key)?,
                    Value::Nil => {}
                    other => return Err(invalid_argument_type("delete", other.type_name())),
                }
                Ok(Value::Nil)
            }
            Builtin::Close => Err(channels_not_supported()),
            Builtin::Complex => {
                let [re, im] = exact(args, "complex")?;
                match (as_float(re), as_float(im)) {
                    (Some(re), Some(im)) => Ok(Value::Complex(Complex::new(re, im))),
                    (None, _) => Err(invalid_argument_type("complex", re.type_name())),
                    (_, None) => Err(invalid_argument_type("complex", im.type_name())),
                }
            }
            Builtin::Real | Builtin::Imag => {
                let value = one(self.name(), args)?;
                let c = match value {
                    Value::Complex(c) => *c,
                    other => match as_float(other) {
                        Some(re) => Complex::new(re, 0.0),
                        None => return Err(invalid_argument_type(self.name(), other.type_name())),
                    },
                };
                Ok(Value::Float(if self == Builtin::Real { c.re } else { c.im }))
            }
            Builtin::Make => make(args),
            Builtin::New => match one("new", args)? {
                Value::Type(ty) => Ok(Value::Pointer(Pointer::Cell(new_cell(ty.zero())))),
                other => Err(invalid_argument_type("new", other.type_name())),
            },
            Builtin::Min => extreme("min", args, BinaryOp::Lt),
            Builtin::Max => extreme("max", args, BinaryOp::Gt),
            Builtin::Panic | Builtin::Recover => Err(EvalError::host(format!(
                "{} must be called by the VM",
                self.name()
            ))),
        }
    }
}

/// Space-joined representations, as printed by `print` and `println`.
pub fn join(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{arg}");
    }
    out
}

fn one<'a>(op: &'static str, args: &'a [Value]) -> EvalResult<&'a Value> {
    match args {
        [value] => Ok(value),
        _ => Err(wrong_arg_count(op, 1)),
    }
}

fn exact<'a, const N: usize>(args: &'a [Value], op: &'static str) -> EvalResult<[&'a Value; N]> {
    if args.len() != N {
        return Err(wrong_arg_count(op, N));
    }
    Ok(std::array::from_fn(|i| &args[i]))
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Uint(u) => Some(*u as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn int_value(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

fn length(op: &'static str, value: &Value) -> EvalResult {
    let len = match value {
        Value::Str(s) => s.len(),
        Value::List(list) => list.borrow().items.len(),
        Value::Map(map) => map.borrow().len(),
        Value::Nil => 0,
        other => return Err(invalid_argument_type(op, other.type_name())),
    };
    Ok(int_value(len))
}

/// `append(list, items...)` returns a new list; the original is unchanged.
fn append(args: &[Value]) -> EvalResult {
    let Some((first, rest)) = args.split_first() else {
        return Err(wrong_arg_count_range("append", 1, usize::MAX));
    };
    let (mut items, elem) = match first {
        Value::Nil => (Vec::with_capacity(rest.len()), None),
        Value::List(list) => {
            let list = list.borrow();
            if !list.mutable {
                return Err(immutable_list());
            }
            let mut items = Vec::with_capacity(list.items.len() + rest.len());
            items.extend_from_slice(&list.items);
            (items, list.elem.clone())
        }
        other => return Err(invalid_argument_type("append", other.type_name())),
    };
    items.extend(rest.iter().map(|v| match &elem {
        Some(ty) => ty.coerce(v.clone()),
        None => v.clone(),
    }));
    Ok(Value::typed_list(items, elem))
}

/// `copy(dst, src)` copies `min(len(dst), len(src))` elements.
fn copy(dst: &Value, src: &Value) -> EvalResult {
    let source: Vec<Value> = match src {
        Value::List(list) => list.borrow().items.clone(),
        Value::Str(s) => s.bytes().map(|b| Value::Uint(u64::from(b))).collect(),
        Value::Nil => Vec::new(),
        other => return Err(invalid_argument_type("copy", other.type_name())),
    };
    match dst {
        Value::List(list) => {
            let mut list = list.borrow_mut();
            if !list.mutable {
                return Err(immutable_list());
            }
            let n = list.items.len().min(source.len());
            for (i, value) in source.into_iter().take(n).enumerate() {
                let value = list.coerce(value);
                list.items[i] = value;
            }
            Ok(int_value(n))
        }
        Value::Nil => Ok(Value::Int(0)),
        other => Err(invalid_argument_type("copy", other.type_name())),
    }
}

/// `make(T, len?, cap?)` for slices and maps.
fn make(args: &[Value]) -> EvalResult {
    let Some((first, rest)) = args.split_first() else {
        return Err(wrong_arg_count_range("make", 1, 3));
    };
    let Value::Type(ty) = first else {
        return Err(invalid_argument_type("make", first.type_name()));
    };
    let kind = ty.kind().clone();
    match kind {
        TypeKind::List { elem, .. } => {
            let Some(len) = rest.first() else {
                return Err(wrong_arg_count_range("make", 2, 3));
            };
            if rest.len() > 2 {
                return Err(wrong_arg_count_range("make", 2, 3));
            }
            let len = match len {
                Value::Int(n) if *n < 0 => return Err(negative_length("make")),
                Value::Int(n) => usize::try_from(*n).unwrap_or(usize::MAX),
                Value::Uint(n) => usize::try_from(*n).unwrap_or(usize::MAX),
                other => return Err(invalid_argument_type("make", other.type_name())),
            };
            let mut items = Vec::new();
            items
                .try_reserve_exact(len)
                .map_err(|_| length_out_of_range("make"))?;
            items.extend((0..len).map(|_| elem.zero()));
            Ok(Value::typed_list(items, Some(elem)))
        }
        TypeKind::Map { key, elem } => {
            if rest.len() > 1 {
                return Err(wrong_arg_count_range("make", 1, 2));
            }
            Ok(Value::map(MapValue::new(Some(key), Some(elem))))
        }
        TypeKind::Chan(_) => Err(channels_not_supported()),
        _ => Err(invalid_argument_type("make", ty.to_string())),
    }
}

/// `min` and `max`: the argument `op` holds for against every other.
fn extreme(name: &'static str, args: &[Value], op: BinaryOp) -> EvalResult {
    let Some((first, rest)) = args.split_first() else {
        return Err(wrong_arg_count_range(name, 1, usize::MAX));
    };
    let ordered = |v: &Value| {
        matches!(
            v,
            Value::Int(_) | Value::Uint(_) | Value::Float(_) | Value::Str(_)
        )
    };
    if let Some(bad) = args.iter().find(|v| !ordered(v)) {
        return Err(invalid_argument_type(name, bad.type_name()));
    }
    let promote = args.iter().any(|v| matches!(v, Value::Float(_)));
    let mut best = first.clone();
    for candidate in rest {
        let better = evaluate_binary(candidate, &best, op)
            .map_err(|_| invalid_argument_type(name, candidate.type_name()))?;
        if matches!(better, Value::Bool(true)) {
            best = candidate.clone();
        }
    }
    Ok(match (promote, &best) {
        (true, Value::Int(_) | Value::Uint(_)) => {
            Value::Float(as_float(&best).unwrap_or_default())
        }
        _ => best,
    })
}

#[cfg(test)]
mod tests;
