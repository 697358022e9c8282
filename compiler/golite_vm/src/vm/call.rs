//! The call protocol.

use std::rc::Rc;

use tracing::trace;

use super::{Flow, Frame, Vm};
use crate::builtins::Builtin;
use crate::errors::{
    invalid_argument_type, nil_dereference, not_callable, recursion_limit_exceeded,
    wrong_arg_count, wrong_arg_count_range, wrong_function_args, EvalResult,
};
use crate::types::coerce_num;
use crate::value::{Closure, Value};

/// A call queued by `defer`, with its arguments already evaluated.
pub(super) struct Deferred {
    pub(super) callee: Value,
    pub(super) args: Vec<Value>,
}

impl Vm {
    /// Pop a callee and its arguments, expanding a spread final argument.
    pub(super) fn pop_call(
        &mut self,
        argc: u32,
        spread: bool,
    ) -> EvalResult<(Value, Vec<Value>)> {
        let mut args = self.pop_n(argc as usize)?;
        let callee = self.pop()?;
        if spread {
            match args.pop() {
                Some(Value::List(list)) => args.extend(list.borrow().items.iter().cloned()),
                Some(Value::Str(s)) => args.extend(s.bytes().map(|b| Value::Uint(u64::from(b)))),
                Some(Value::Nil) | None => {}
                Some(other) => return Err(invalid_argument_type("...", other.type_name())),
            }
        }
        Ok((callee, args))
    }

    /// Call `callee`. Script functions get a new frame; everything else runs
    /// immediately and pushes its result, unless the call is deferred.
    pub(super) fn invoke(
        &mut self,
        callee: Value,
        mut args: Vec<Value>,
        deferred: bool,
    ) -> EvalResult<Flow> {
        let result = match callee {
            Value::Closure(closure) => {
                self.push_frame(&closure, args, deferred)?;
                return Ok(Flow::Next);
            }
            Value::BoundMethod(bound) => {
                args.insert(0, bound.recv.clone());
                return self.invoke(bound.method.clone(), args, deferred);
            }
            Value::Builtin(Builtin::Panic) => {
                return match args.len() {
                    0 => Ok(Flow::Panic(Value::string("panic"))),
                    1 => Ok(Flow::Panic(args.pop().unwrap_or_default())),
                    _ => Err(wrong_arg_count_range("panic", 0, 1)),
                };
            }
            // A directly deferred `recover()` is not called by a deferred
            // function, so it never stops a panic.
            Value::Builtin(Builtin::Recover) if deferred => Value::Nil,
            Value::Builtin(Builtin::Recover) => {
                if !args.is_empty() {
                    return Err(wrong_arg_count("recover", 0));
                }
                self.recover()
            }
            Value::Builtin(builtin) => builtin.call(&args, &self.config.print)?,
            Value::Native(native) => native.call(&args, &self.config)?,
            Value::Type(ty) => match <[Value; 1]>::try_from(args) {
                Ok([arg]) => ty.convert(arg)?,
                Err(_) => return Err(wrong_arg_count(&ty.to_string(), 1)),
            },
            Value::Nil => return Err(nil_dereference()),
            other => return Err(not_callable(other.type_name())),
        };
        if !deferred {
            self.stack.push(result);
        }
        Ok(Flow::Next)
    }

    /// Enter a script function.
    fn push_frame(
        &mut self,
        closure: &Rc<Closure>,
        args: Vec<Value>,
        deferred: bool,
    ) -> EvalResult<()> {
        let limit = self.config.max_call_depth;
        if self.frames.len() >= limit {
            return Err(recursion_limit_exceeded(limit));
        }
        let func = &closure.func;
        let arity = func.arity();
        let arity_ok = if func.variadic {
            args.len() >= arity
        } else {
            args.len() == arity
        };
        if !arity_ok {
            let name = self.config.interner.lookup(func.name);
            return Err(wrong_function_args(name, arity, args.len()));
        }

        let env = closure.env.child();
        let mut args = args.into_iter();
        for (&name, kind) in func.params.iter().zip(&func.param_kinds).take(arity) {
            let value = args.next().unwrap_or_default();
            if name == self.blank {
                continue;
            }
            let value = match kind {
                Some(kind) => coerce_num(value, *kind),
                None => value,
            };
            env.define(name, value);
        }
        if func.variadic {
            let rest = Value::list(args.collect());
            if let Some(&name) = func.params.get(arity) {
                if name != self.blank {
                    env.define(name, rest);
                }
            }
        }

        trace!(
            function = self.config.interner.lookup(func.name),
            depth = self.frames.len(),
            "enter"
        );
        let frame = Frame::new(Rc::clone(func), env, self.stack.len(), deferred);
        self.frames.push(frame);
        Ok(())
    }
}
