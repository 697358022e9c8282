//! Script closures as host callables.

use std::fmt;

use super::{FromValue, IntoValue};
use crate::errors::{cannot_convert, EvalResult};
use crate::value::Value;
use crate::vm::{Vm, VmConfig};

/// A script function held by the host.
///
/// Each call runs the function to completion on a fresh VM that shares the
/// function's captured environment, so writes the function makes to
/// captured variables are visible to the script afterwards.
#[derive(Clone)]
pub struct ScriptFn {
    callee: Value,
    config: VmConfig,
}

impl ScriptFn {
    pub fn new(callee: Value, config: VmConfig) -> Self {
        ScriptFn { callee, config }
    }

    /// Call with host arguments, converting the result to `R`.
    ///
    /// Multiple results convert to a tuple.
    pub fn call<R: FromValue>(&self, args: impl IntoArgs) -> EvalResult<R> {
        let result = Vm::call_value(&self.config, self.callee.clone(), args.into_args())?;
        R::from_value(result, &self.config)
    }

    /// The underlying script value.
    pub fn value(&self) -> &Value {
        &self.callee
    }
}

impl fmt::Debug for ScriptFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScriptFn").field(&self.callee).finish()
    }
}

impl FromValue for ScriptFn {
    fn from_value(value: Value, config: &VmConfig) -> EvalResult<Self> {
        if value.is_callable() {
            Ok(ScriptFn::new(value, config.clone()))
        } else {
            Err(cannot_convert(value.type_name(), "func"))
        }
    }
}

/// Argument lists for [`ScriptFn::call`].
pub trait IntoArgs {
    fn into_args(self) -> Vec<Value>;
}

impl IntoArgs for Vec<Value> {
    fn into_args(self) -> Vec<Value> {
        self
    }
}

macro_rules! impl_into_args {
    ($($arg:ident),*) => {
        impl<$($arg: IntoValue),*> IntoArgs for ($($arg,)*) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<Value> {
                let ($($arg,)*) = self;
                vec![$($arg.into_value()),*]
            }
        }
    };
}

impl_into_args!();
impl_into_args!(A);
impl_into_args!(A, B);
impl_into_args!(A, B, C);
impl_into_args!(A, B, C, D);
