//! Host interop.
//!
//! Values cross the host boundary through two traits: [`IntoValue`] turns a
//! host value into a script [`Value`], [`FromValue`] turns a script value
//! back. Host functions become [`NativeFunc`]s, host types are bridged by
//! an explicit [`HostType`] registration, and script closures are handed to
//! the host as [`ScriptFn`]s.

mod host;
mod script_fn;

use std::fmt;
use std::rc::Rc;

use crate::errors::{cannot_convert, wrong_function_args, EvalError, EvalResult};
use crate::value::Value;
use crate::vm::VmConfig;

pub use host::{External, HostType, HostTypeBuilder, HostTypeInfo};
pub use script_fn::{IntoArgs, ScriptFn};

/// A host function callable from scripts.
pub struct NativeFunc {
    name: Rc<str>,
    func: Box<dyn Fn(&[Value], &VmConfig) -> EvalResult>,
}

impl NativeFunc {
    /// Wrap a function over raw script values.
    pub fn new(
        name: impl Into<Rc<str>>,
        func: impl Fn(&[Value]) -> EvalResult + 'static,
    ) -> Self {
        NativeFunc {
            name: name.into(),
            func: Box::new(move |args, _| func(args)),
        }
    }

    /// Wrap a function that also needs the calling VM's configuration, for
    /// example to call back into script closures.
    pub fn with_config(
        name: impl Into<Rc<str>>,
        func: impl Fn(&[Value], &VmConfig) -> EvalResult + 'static,
    ) -> Self {
        NativeFunc {
            name: name.into(),
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value], config: &VmConfig) -> EvalResult {
        (self.func)(args, config)
    }
}

impl fmt::Debug for NativeFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunc({})", self.name)
    }
}

/// Conversion of a host value into a script value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion of a script value into a host value.
pub trait FromValue: Sized {
    fn from_value(value: Value, config: &VmConfig) -> EvalResult<Self>;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Nil
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl IntoValue for u64 {
    fn into_value(self) -> Value {
        Value::Uint(self)
    }
}

impl IntoValue for usize {
    fn into_value(self) -> Value {
        Value::Int(i64::try_from(self).unwrap_or(i64::MAX))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::list(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Nil, IntoValue::into_value)
    }
}

impl IntoValue for NativeFunc {
    fn into_value(self) -> Value {
        Value::Native(Rc::new(self))
    }
}

/// A pair is returned to scripts as two results.
impl<A: IntoValue, B: IntoValue> IntoValue for (A, B) {
    fn into_value(self) -> Value {
        Value::tuple(vec![self.0.into_value(), self.1.into_value()])
    }
}

impl<A: IntoValue, B: IntoValue, C: IntoValue> IntoValue for (A, B, C) {
    fn into_value(self) -> Value {
        Value::tuple(vec![
            self.0.into_value(),
            self.1.into_value(),
            self.2.into_value(),
        ])
    }
}

fn mismatch(value: &Value, want: &str) -> EvalError {
    cannot_convert(value.type_name(), want)
}

impl FromValue for Value {
    fn from_value(value: Value, _: &VmConfig) -> EvalResult<Self> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(_: Value, _: &VmConfig) -> EvalResult<Self> {
        Ok(())
    }
}

impl FromValue for bool {
    fn from_value(value: Value, _: &VmConfig) -> EvalResult<Self> {
        value.as_bool().ok_or_else(|| mismatch(&value, "bool"))
    }
}

impl FromValue for i64 {
    fn from_value(value: Value, _: &VmConfig) -> EvalResult<Self> {
        value.as_int().ok_or_else(|| mismatch(&value, "i64"))
    }
}

impl FromValue for u64 {
    fn from_value(value: Value, _: &VmConfig) -> EvalResult<Self> {
        match value {
            Value::Uint(u) => Ok(u),
            Value::Int(i) => u64::try_from(i).map_err(|_| mismatch(&value, "u64")),
            other => Err(mismatch(&other, "u64")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value, _: &VmConfig) -> EvalResult<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::Uint(u) => Ok(u as f64),
            other => Err(mismatch(&other, "f64")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value, _: &VmConfig) -> EvalResult<Self> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(mismatch(&other, "String")),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value, config: &VmConfig) -> EvalResult<Self> {
        match value {
            Value::Nil => Ok(Vec::new()),
            Value::List(list) => {
                let items = list.borrow().items.clone();
                items
                    .into_iter()
                    .map(|item| T::from_value(item, config))
                    .collect()
            }
            other => Err(mismatch(&other, "Vec")),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value, config: &VmConfig) -> EvalResult<Self> {
        match value {
            Value::Nil => Ok(None),
            other => T::from_value(other, config).map(Some),
        }
    }
}

impl FromValue for External {
    fn from_value(value: Value, _: &VmConfig) -> EvalResult<Self> {
        match value {
            Value::External(e) => Ok(e),
            other => Err(mismatch(&other, "host value")),
        }
    }
}

/// Items of a multi-value result.
fn results(value: Value, want: usize) -> EvalResult<Vec<Value>> {
    match value {
        Value::List(list) if list.borrow().items.len() == want => {
            Ok(list.borrow().items.clone())
        }
        other => Err(mismatch(&other, &format!("{want} results"))),
    }
}

impl<A: FromValue, B: FromValue> FromValue for (A, B) {
    fn from_value(value: Value, config: &VmConfig) -> EvalResult<Self> {
        let mut items = results(value, 2)?.into_iter();
        let a = A::from_value(items.next().unwrap_or_default(), config)?;
        let b = B::from_value(items.next().unwrap_or_default(), config)?;
        Ok((a, b))
    }
}

impl<A: FromValue, B: FromValue, C: FromValue> FromValue for (A, B, C) {
    fn from_value(value: Value, config: &VmConfig) -> EvalResult<Self> {
        let mut items = results(value, 3)?.into_iter();
        let a = A::from_value(items.next().unwrap_or_default(), config)?;
        let b = B::from_value(items.next().unwrap_or_default(), config)?;
        let c = C::from_value(items.next().unwrap_or_default(), config)?;
        Ok((a, b, c))
    }
}

/// A typed host closure usable as a [`NativeFunc`].
///
/// `Args` is the tuple of parameter types; arguments are converted with
/// [`FromValue`] and the result with [`IntoValue`]. Host functions that can
/// fail should use [`NativeFunc::new`] and return an [`EvalError`].
pub trait IntoNativeFunc<Args> {
    fn into_native(self, name: &str) -> NativeFunc;
}

macro_rules! impl_into_native {
    ($count:expr; $($arg:ident),*) => {
        impl<F, R, $($arg),*> IntoNativeFunc<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + 'static,
            R: IntoValue,
            $($arg: FromValue,)*
        {
            #[allow(non_snake_case, unused_variables, unused_mut)]
            fn into_native(self, name: &str) -> NativeFunc {
                let owned: Rc<str> = Rc::from(name);
                NativeFunc::with_config(name, move |args: &[Value], config: &VmConfig| {
                    if args.len() != $count {
                        return Err(wrong_function_args(&owned, $count, args.len()));
                    }
                    let mut args = args.iter().cloned();
                    $(let $arg = $arg::from_value(args.next().unwrap_or_default(), config)?;)*
                    Ok(self($($arg),*).into_value())
                })
            }
        }
    };
}

impl_into_native!(0;);
impl_into_native!(1; A);
impl_into_native!(2; A, B);
impl_into_native!(3; A, B, C);
impl_into_native!(4; A, B, C, D);

#[cfg(test)]
mod tests;
