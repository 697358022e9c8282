//! The stack machine.
//!
//! A [`Vm`] executes compiled [`Function`]s one instruction at a time. Frames
//! live on a heap-allocated stack, so script recursion never recurses in
//! Rust; the depth is bounded by [`VmConfig::max_call_depth`] instead.
//!
//! Each frame moves through three states. `Running` frames execute their
//! code. `Return` switches a frame to `Returning`, which runs its deferred
//! calls one at a time before the frame is popped. A panic switches the top
//! frame to `Unwinding`, which also runs deferred calls but pops the frame
//! with the panic still active, unless one of those calls recovered it.
//!
//! [`Vm::step`] reports every panic as [`Outcome::Panicking`], which lets a
//! host observe panics as they happen and stop the machine in place.

mod access;
mod call;

use std::rc::Rc;

use golite_compile::{Constant, Function, NumKind, Op, TypeCtor};
use golite_ir::{Name, SharedInterner};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::environment::Env;
use crate::errors::{
    non_bool_condition, not_a_type, panic_error, result_count_mismatch, type_assertion_failed,
    undefined_variable, BacktraceFrame, EvalBacktrace, EvalError, EvalResult,
};
use crate::operators::{evaluate_binary, evaluate_unary};
use crate::print_handler::{stdout_handler, SharedPrintHandler};
use crate::types::{coerce_num, Method, StructLayout, TypeDesc, TypeKind};
use crate::value::{Closure, Complex, Pointer, Value};

use access::RangeIter;
use call::Deferred;

/// Default bound on the number of live frames.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Settings shared by every VM of one interpreter.
#[derive(Clone, Debug)]
pub struct VmConfig {
    pub interner: SharedInterner,
    pub print: SharedPrintHandler,
    pub max_call_depth: usize,
}

impl VmConfig {
    pub fn new(interner: SharedInterner) -> Self {
        VmConfig {
            interner,
            print: stdout_handler(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    #[must_use]
    pub fn with_print(mut self, print: SharedPrintHandler) -> Self {
        self.print = print;
        self
    }

    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

/// Result of one [`Vm::step`].
#[derive(Clone, Debug)]
pub enum Outcome {
    /// An instruction executed; more remain.
    Continue,
    /// A panic was raised with this value. Stepping again unwinds.
    Panicking(Value),
    /// The run ended with a runtime error or an unrecovered panic.
    Error(EvalError),
    /// The entry function returned this value.
    Finished(Value),
}

/// Answer of a [`Vm::run_with`] callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop,
}

/// How [`Vm::run_with`] ended without an error.
#[derive(Clone, Debug)]
pub enum Completion {
    Finished(Value),
    /// The callback stopped the machine; it can be stepped further.
    Stopped,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FrameState {
    Running,
    Returning,
    Unwinding,
}

/// Activation record of one call.
struct Frame {
    func: Rc<Function>,
    ip: usize,
    /// Innermost scope; changes with `PushScope`/`PopScope`.
    env: Env,
    /// Scope holding the parameters and named results.
    base_env: Env,
    /// Operand stack height when the frame was entered.
    stack_base: usize,
    defers: SmallVec<[Deferred; 2]>,
    iters: SmallVec<[RangeIter; 2]>,
    state: FrameState,
    /// Result set by `Return`; `None` means read the named results.
    pending: Option<Value>,
    /// Started by a deferred call; its result is discarded.
    deferred: bool,
    /// Panic this frame is unwinding with. Cleared by a `recover` in a
    /// function it deferred.
    panic: Option<PanicState>,
}

impl Frame {
    fn new(func: Rc<Function>, env: Env, stack_base: usize, deferred: bool) -> Self {
        Frame {
            func,
            ip: 0,
            base_env: env.clone(),
            env,
            stack_base,
            defers: SmallVec::new(),
            iters: SmallVec::new(),
            state: FrameState::Running,
            pending: None,
            deferred,
            panic: None,
        }
    }
}

/// An active panic.
struct PanicState {
    value: Value,
    /// Error reported if the panic is never recovered.
    error: EvalError,
}

/// Control flow requested by an instruction.
enum Flow {
    Next,
    Panic(Value),
}

/// A virtual machine running one entry function.
pub struct Vm {
    stack: Vec<Value>,
    frames: Vec<Frame>,
    finished: Option<EvalResult>,
    entry: Rc<Function>,
    env: Env,
    config: VmConfig,
    blank: Name,
}

impl Vm {
    /// A VM that runs `entry` directly in `env`.
    pub fn new(entry: Rc<Function>, env: Env, config: VmConfig) -> Self {
        let blank = config.interner.intern("_");
        let mut vm = Vm {
            stack: Vec::new(),
            frames: Vec::new(),
            finished: None,
            entry,
            env,
            config,
            blank,
        };
        vm.reset();
        vm
    }

    /// A VM with no entry frame, for calling a single function value.
    fn detached(config: VmConfig) -> Self {
        let blank = config.interner.intern("_");
        Vm {
            stack: Vec::new(),
            frames: Vec::new(),
            finished: None,
            entry: Rc::new(Function::default()),
            env: Env::root(),
            config,
            blank,
        }
    }

    /// Restore the machine to the start of its entry function.
    ///
    /// Variables already defined in the environment keep their values.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.finished = None;
        let entry = Frame::new(Rc::clone(&self.entry), self.env.clone(), 0, false);
        self.frames.push(entry);
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Whether the machine has finished, successfully or not.
    pub fn is_halted(&self) -> bool {
        self.finished.is_some()
    }

    /// Call `callee` with `args` to completion on a fresh machine.
    ///
    /// Closures run in their captured environment, so writes to captured
    /// variables are shared with every other user of that environment.
    pub fn call_value(config: &VmConfig, callee: Value, args: Vec<Value>) -> EvalResult {
        let mut vm = Vm::detached(config.clone());
        match vm.invoke(callee, args, false)? {
            Flow::Next => {}
            Flow::Panic(value) => return Err(panic_error(value.to_string())),
        }
        if vm.frames.is_empty() {
            return Ok(vm.stack.pop().unwrap_or_default());
        }
        vm.run()
    }

    /// Run to completion, letting panics unwind without interception.
    pub fn run(&mut self) -> EvalResult {
        loop {
            match self.step() {
                Outcome::Continue | Outcome::Panicking(_) => {}
                Outcome::Finished(value) => return Ok(value),
                Outcome::Error(error) => return Err(error),
            }
        }
    }

    /// Run to completion, consulting `callback` on every panic and error.
    ///
    /// Stopping leaves the machine where it is: after a panic, stepping
    /// again continues unwinding.
    pub fn run_with(
        &mut self,
        mut callback: impl FnMut(&Outcome) -> Decision,
    ) -> EvalResult<Completion> {
        loop {
            let outcome = self.step();
            match &outcome {
                Outcome::Continue => {}
                Outcome::Finished(value) => return Ok(Completion::Finished(value.clone())),
                Outcome::Panicking(_) => {
                    if callback(&outcome) == Decision::Stop {
                        return Ok(Completion::Stopped);
                    }
                }
                Outcome::Error(error) => {
                    if callback(&outcome) == Decision::Stop {
                        return Ok(Completion::Stopped);
                    }
                    return Err(error.clone());
                }
            }
        }
    }

    /// Execute one instruction, or one step of returning or unwinding.
    pub fn step(&mut self) -> Outcome {
        if let Some(result) = &self.finished {
            return match result {
                Ok(value) => Outcome::Finished(value.clone()),
                Err(error) => Outcome::Error(error.clone()),
            };
        }
        let Some(frame) = self.frames.last_mut() else {
            self.finished = Some(Ok(Value::Nil));
            return Outcome::Finished(Value::Nil);
        };
        match frame.state {
            FrameState::Returning => return self.continue_return(),
            FrameState::Unwinding => return self.continue_unwind(),
            FrameState::Running => {}
        }
        // Falling off the end of the code is a bare return.
        let op = frame.func.code.get(frame.ip).copied().unwrap_or(Op::Return(0));
        frame.ip += 1;
        match self.execute(op) {
            Ok(Flow::Next) => Outcome::Continue,
            Ok(Flow::Panic(value)) => self.raise(value, None),
            Err(error) => self.fail(error),
        }
    }

    fn execute(&mut self, op: Op) -> EvalResult<Flow> {
        match op {
            Op::Const(index) => {
                let value = self.constant(index)?;
                self.stack.push(value);
            }
            Op::Nil => self.stack.push(Value::Nil),
            Op::True => self.stack.push(Value::Bool(true)),
            Op::False => self.stack.push(Value::Bool(false)),
            Op::Pop => {
                self.pop()?;
            }
            Op::Dup => {
                let top = self.peek()?.clone();
                self.stack.push(top);
            }
            Op::Swap => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.stack.push(b);
                self.stack.push(a);
            }

            Op::Load(name) => {
                let value = self.frame()?.env.get(name);
                let value = value.ok_or_else(|| self.undefined(name))?;
                self.stack.push(value);
            }
            Op::Store(name) => {
                let value = self.pop()?;
                let cell = self.frame()?.env.lookup(name);
                let cell = cell.ok_or_else(|| self.undefined(name))?;
                let value = Value::assign_over(&cell.borrow(), value);
                *cell.borrow_mut() = value;
            }
            Op::Define(name) => {
                let value = self.pop()?;
                self.frame()?.env.define(name, value);
            }
            Op::AddrOf(name) => {
                let cell = self.frame()?.env.lookup(name);
                let cell = cell.ok_or_else(|| self.undefined(name))?;
                self.stack.push(Value::Pointer(Pointer::Cell(cell)));
            }
            Op::PushScope => {
                let frame = self.frame_mut()?;
                frame.env = frame.env.child();
            }
            Op::PopScope => {
                let frame = self.frame_mut()?;
                if !frame.env.ptr_eq(&frame.base_env) {
                    if let Some(parent) = frame.env.parent().cloned() {
                        frame.env = parent;
                    }
                }
            }

            Op::MakeClosure(index) => {
                let frame = self.frame()?;
                let Some(Constant::Function(func)) = frame.func.constants.get(index as usize)
                else {
                    return Err(bad_operand("MakeClosure"));
                };
                let closure = Closure {
                    func: Rc::clone(func),
                    env: frame.env.clone(),
                };
                self.stack.push(Value::Closure(Rc::new(closure)));
            }
            Op::Call { argc, spread } => {
                let (callee, args) = self.pop_call(argc, spread)?;
                return self.invoke(callee, args, false);
            }
            Op::Defer { argc, spread } => {
                let (callee, args) = self.pop_call(argc, spread)?;
                self.frame_mut()?.defers.push(Deferred { callee, args });
            }
            Op::Return(n) => {
                let values = self.pop_n(n as usize)?;
                self.begin_return(values)?;
            }
            Op::Unpack(n) => {
                let value = self.pop()?;
                let n = n as usize;
                let items = match &value {
                    Value::List(list) if list.borrow().items.len() == n => {
                        list.borrow().items.clone()
                    }
                    Value::List(list) => {
                        return Err(result_count_mismatch(n, list.borrow().items.len()))
                    }
                    _ => return Err(result_count_mismatch(n, 1)),
                };
                self.stack.extend(items);
            }

            Op::MakeType(ctor) => {
                let ty = self.make_type(ctor)?;
                self.stack.push(Value::Type(ty));
            }
            Op::DeclareType(name) => {
                let ty = TypeDesc::declared(self.config.interner.lookup(name));
                self.frame()?.env.define(name, Value::Type(ty));
            }
            Op::SetUnderlying(name) => {
                let underlying = self.pop_type()?;
                let ty = self.named_type(name)?;
                ty.set_underlying(&underlying);
            }
            Op::DefineMethod { ty, method, pointer } => {
                let func = self.pop()?;
                let ty = self.named_type(ty)?;
                ty.define_method(method, Method { func, pointer });
            }
            Op::Zero => {
                let ty = self.pop_type()?;
                self.stack.push(ty.zero());
            }
            Op::Coerce => {
                let ty = self.pop_type()?;
                let value = self.pop()?;
                self.stack.push(ty.coerce(value));
            }
            Op::Assert { ok } => {
                let ty = self.pop_type()?;
                let value = self.pop()?;
                let matched = ty.matches(&value, &self.config.interner);
                match (matched, ok) {
                    (true, false) => self.stack.push(value),
                    (true, true) => {
                        self.stack.push(value);
                        self.stack.push(Value::Bool(true));
                    }
                    (false, true) => {
                        self.stack.push(ty.zero());
                        self.stack.push(Value::Bool(false));
                    }
                    (false, false) => {
                        return Err(type_assertion_failed(value.type_name(), ty.to_string()))
                    }
                }
            }

            Op::Binary(op) => {
                let right = self.pop()?;
                let left = self.pop()?;
                self.stack.push(evaluate_binary(&left, &right, op)?);
            }
            Op::Unary(op) => {
                let operand = self.pop()?;
                self.stack.push(evaluate_unary(&operand, op)?);
            }

            Op::Jump(target) => self.jump(target)?,
            Op::JumpIfFalse(target) => {
                let cond = self.pop()?;
                if !condition(&cond)? {
                    self.jump(target)?;
                }
            }
            Op::JumpIfTrue(target) => {
                let cond = self.pop()?;
                if condition(&cond)? {
                    self.jump(target)?;
                }
            }
            Op::JumpIfFalseOrPop(target) => {
                if condition(self.peek()?)? {
                    self.pop()?;
                } else {
                    self.jump(target)?;
                }
            }
            Op::JumpIfTrueOrPop(target) => {
                if condition(self.peek()?)? {
                    self.jump(target)?;
                } else {
                    self.pop()?;
                }
            }

            Op::Composite { n, keyed } => {
                let count = n as usize * if keyed { 2 } else { 1 };
                let values = self.pop_n(count)?;
                let ty = self.pop_type()?;
                let value = self.composite(&ty, values, keyed)?;
                self.stack.push(value);
            }
            Op::Index => {
                let key = self.pop()?;
                let base = self.pop()?;
                self.stack.push(access::index(&base, &key)?);
            }
            Op::IndexOk => {
                let key = self.pop()?;
                let base = self.pop()?;
                let (value, found) = access::index_ok(&base, &key)?;
                self.stack.push(value);
                self.stack.push(Value::Bool(found));
            }
            Op::Slice { low, high } => {
                let high = if high { Some(self.pop()?) } else { None };
                let low = if low { Some(self.pop()?) } else { None };
                let base = self.pop()?;
                self.stack.push(access::slice(&base, low.as_ref(), high.as_ref())?);
            }
            Op::Select(name) => {
                let base = self.pop()?;
                let member = self.select(base, name)?;
                self.stack.push(member);
            }
            Op::IndexAddr => {
                let key = self.pop()?;
                let base = self.pop()?;
                self.stack.push(Value::Pointer(access::index_addr(&base, key)?));
            }
            Op::FieldAddr(name) => {
                let base = self.pop()?;
                let ptr = self.field_addr(base, name)?;
                self.stack.push(Value::Pointer(ptr));
            }
            Op::Deref => {
                let ptr = self.pop()?;
                self.stack.push(access::deref(&ptr)?);
            }
            Op::StorePtr => {
                let value = self.pop()?;
                let ptr = self.pop()?;
                access::store(&ptr, value)?;
            }
            Op::Escape => {
                let value = self.pop()?;
                let cell = crate::environment::new_cell(value);
                self.stack.push(Value::Pointer(Pointer::Cell(cell)));
            }

            Op::IterNew => {
                let iterable = self.pop()?;
                let iter = RangeIter::new(iterable)?;
                self.frame_mut()?.iters.push(iter);
            }
            Op::IterNext { done, key, value } => {
                let next = match self.frame_mut()?.iters.last_mut() {
                    Some(iter) => iter.next(),
                    None => return Err(bad_operand("IterNext")),
                };
                match next {
                    Some((k, v)) => {
                        if key {
                            self.stack.push(k);
                        }
                        if value {
                            self.stack.push(v);
                        }
                    }
                    None => self.jump(done)?,
                }
            }
            Op::IterEnd => {
                self.frame_mut()?.iters.pop();
            }
        }
        Ok(Flow::Next)
    }

    // Errors and panics

    /// Turn a runtime error into a panic, or end the run if it is fatal.
    fn fail(&mut self, error: EvalError) -> Outcome {
        let error = self.locate(error);
        if error.is_fatal() {
            debug!(error = %error, "fatal runtime error");
            return self.terminate(error);
        }
        debug!(error = %error, "runtime error");
        let value = Value::string(error.message.clone());
        self.raise(value, Some(error))
    }

    /// Start unwinding the top frame with `value`.
    fn raise(&mut self, value: Value, error: Option<EvalError>) -> Outcome {
        let error = match error {
            Some(error) => error,
            None => {
                let error = panic_error(value.to_string());
                self.locate(error)
            }
        };
        debug!(value = %value, "panic raised");
        let Some(frame) = self.frames.last_mut() else {
            return self.terminate(error);
        };
        frame.state = FrameState::Unwinding;
        frame.panic = Some(PanicState {
            value: value.clone(),
            error,
        });
        Outcome::Panicking(value)
    }

    /// End the run with `error`.
    fn terminate(&mut self, error: EvalError) -> Outcome {
        self.frames.clear();
        self.stack.clear();
        self.finished = Some(Err(error.clone()));
        Outcome::Error(error)
    }

    /// Attach the current position and call stack to `error`.
    fn locate(&self, error: EvalError) -> EvalError {
        let Some(frame) = self.frames.last() else {
            return error;
        };
        let span = frame.func.span_at(frame.ip.saturating_sub(1));
        let frames = self
            .frames
            .iter()
            .rev()
            .map(|f| BacktraceFrame {
                name: self.config.interner.lookup(f.func.name).to_owned(),
                span: f.func.span_at(f.ip.saturating_sub(1)),
            })
            .collect();
        error
            .with_span(span)
            .with_backtrace(EvalBacktrace::new(frames))
    }

    fn undefined(&self, name: Name) -> EvalError {
        undefined_variable(self.config.interner.lookup(name))
    }

    // Operand stack

    fn pop(&mut self) -> EvalResult {
        self.stack.pop().ok_or_else(stack_underflow)
    }

    fn peek(&self) -> EvalResult<&Value> {
        self.stack.last().ok_or_else(stack_underflow)
    }

    /// The top `n` values, deepest first.
    fn pop_n(&mut self, n: usize) -> EvalResult<Vec<Value>> {
        let at = self.stack.len().checked_sub(n).ok_or_else(stack_underflow)?;
        Ok(self.stack.split_off(at))
    }

    fn pop_type(&mut self) -> EvalResult<Rc<TypeDesc>> {
        match self.pop()? {
            Value::Type(ty) => Ok(ty),
            other => Err(not_a_type(other.type_name())),
        }
    }

    fn frame(&self) -> EvalResult<&Frame> {
        self.frames.last().ok_or_else(no_frame)
    }

    fn frame_mut(&mut self) -> EvalResult<&mut Frame> {
        self.frames.last_mut().ok_or_else(no_frame)
    }

    fn jump(&mut self, target: u32) -> EvalResult<()> {
        self.frame_mut()?.ip = target as usize;
        Ok(())
    }

    fn constant(&self, index: u32) -> EvalResult {
        let frame = self.frame()?;
        Ok(match frame.func.constants.get(index as usize) {
            Some(Constant::Int(i)) => Value::Int(*i),
            Some(Constant::Uint(u)) => Value::Uint(*u),
            Some(Constant::Float(f)) => Value::Float(*f),
            Some(Constant::Imag(f)) => Value::Complex(Complex::new(0.0, *f)),
            Some(Constant::Str(s)) => Value::Str(Rc::clone(s)),
            Some(Constant::Function(_) | Constant::Names(_)) | None => {
                return Err(bad_operand("Const"))
            }
        })
    }

    // Types

    fn named_type(&self, name: Name) -> EvalResult<Rc<TypeDesc>> {
        match self.frame()?.env.get(name) {
            Some(Value::Type(ty)) => Ok(ty),
            Some(other) => Err(not_a_type(other.type_name())),
            None => Err(self.undefined(name)),
        }
    }

    fn names(&self, index: u32) -> EvalResult<Rc<[Name]>> {
        match self.frame()?.func.constants.get(index as usize) {
            Some(Constant::Names(names)) => Ok(Rc::clone(names)),
            _ => Err(bad_operand("MakeType")),
        }
    }

    fn make_type(&mut self, ctor: TypeCtor) -> EvalResult<Rc<TypeDesc>> {
        let kind = match ctor {
            TypeCtor::Slice => TypeKind::List {
                elem: self.pop_type()?,
                len: None,
            },
            TypeCtor::Array { sized } => {
                let elem = self.pop_type()?;
                let len = if sized {
                    let len = self.pop()?;
                    match len.as_int().map(usize::try_from) {
                        Some(Ok(len)) => Some(len),
                        _ => return Err(EvalError::host(format!("invalid array length {len}"))),
                    }
                } else {
                    None
                };
                TypeKind::List { elem, len }
            }
            TypeCtor::Map => {
                let elem = self.pop_type()?;
                let key = self.pop_type()?;
                TypeKind::Map { key, elem }
            }
            TypeCtor::Pointer => TypeKind::Pointer(self.pop_type()?),
            TypeCtor::Func => TypeKind::Func,
            TypeCtor::Chan => TypeKind::Chan(self.pop_type()?),
            TypeCtor::Struct(index) => {
                let names = self.names(index)?;
                let types = self
                    .pop_n(names.len())?
                    .into_iter()
                    .map(|v| match v {
                        Value::Type(ty) => Ok(ty),
                        other => Err(not_a_type(other.type_name())),
                    })
                    .collect::<EvalResult<Vec<_>>>()?;
                let layout = StructLayout::new(names, types, &self.config.interner);
                TypeKind::Struct(Rc::new(layout))
            }
            TypeCtor::Interface(index) => {
                let methods = self.names(index)?;
                let labels = methods
                    .iter()
                    .map(|n| self.config.interner.lookup(*n))
                    .collect();
                TypeKind::Interface { methods, labels }
            }
        };
        Ok(TypeDesc::new(kind))
    }

    // Returning

    /// Handle `Return` with `values` popped from the stack.
    fn begin_return(&mut self, mut values: Vec<Value>) -> EvalResult<()> {
        let frame = self.frame_mut()?;
        let func = Rc::clone(&frame.func);
        if func.named_results.is_empty() {
            frame.pending = Some(pack(values, &func.result_kinds));
        } else {
            let named = &func.named_results;
            // `return f()` with a multi-value call.
            let expanded = match values.as_slice() {
                [Value::List(list)] if named.len() > 1 => Some(list.borrow().items.clone()),
                _ => None,
            };
            if let Some(items) = expanded {
                values = items;
            }
            if !values.is_empty() {
                if values.len() != named.len() {
                    return Err(result_count_mismatch(named.len(), values.len()));
                }
                let kinds = func.result_kinds.iter().copied().chain(std::iter::repeat(None));
                for ((name, kind), value) in named.iter().zip(kinds).zip(values) {
                    let value = coerce_opt(value, kind);
                    match frame.base_env.lookup(*name) {
                        Some(cell) => *cell.borrow_mut() = value,
                        None => frame.base_env.define(*name, value),
                    }
                }
            }
            frame.pending = None;
        }
        frame.state = FrameState::Returning;
        Ok(())
    }

    /// Run the next deferred call of a returning frame, or pop it.
    fn continue_return(&mut self) -> Outcome {
        if let Some(deferred) = self.frames.last_mut().and_then(|f| f.defers.pop()) {
            return self.run_deferred(deferred);
        }
        let Some(frame) = self.frames.pop() else {
            return Outcome::Continue;
        };
        let result = match frame.pending {
            Some(value) => value,
            None => named_results(&frame),
        };
        self.stack.truncate(frame.stack_base);
        trace!(
            function = self.config.interner.lookup(frame.func.name),
            depth = self.frames.len(),
            "return"
        );
        if frame.deferred {
            return Outcome::Continue;
        }
        if self.frames.is_empty() {
            self.finished = Some(Ok(result.clone()));
            return Outcome::Finished(result);
        }
        self.stack.push(result);
        Outcome::Continue
    }

    /// Run the next deferred call of an unwinding frame, or pop it.
    fn continue_unwind(&mut self) -> Outcome {
        let Some(frame) = self.frames.last_mut() else {
            return Outcome::Continue;
        };
        if frame.panic.is_none() {
            // A deferred call recovered: return normally.
            frame.pending = if frame.func.named_results.is_empty() {
                Some(zero_results(&frame.func))
            } else {
                None
            };
            frame.state = FrameState::Returning;
            return Outcome::Continue;
        }
        if let Some(deferred) = frame.defers.pop() {
            return self.run_deferred(deferred);
        }
        let Some(mut frame) = self.frames.pop() else {
            return Outcome::Continue;
        };
        self.stack.truncate(frame.stack_base);
        trace!(
            function = self.config.interner.lookup(frame.func.name),
            depth = self.frames.len(),
            "unwind"
        );
        let panic = frame.panic.take();
        match (self.frames.last_mut(), panic) {
            // A panic escaping a deferred call replaces the one its caller
            // was unwinding with.
            (Some(caller), Some(panic)) => {
                caller.state = FrameState::Unwinding;
                caller.panic = Some(panic);
                Outcome::Continue
            }
            (None, Some(panic)) => self.terminate(panic.error),
            (_, None) => self.terminate(panic_error("panic")),
        }
    }

    fn run_deferred(&mut self, deferred: Deferred) -> Outcome {
        match self.invoke(deferred.callee, deferred.args, true) {
            Ok(Flow::Next) => Outcome::Continue,
            Ok(Flow::Panic(value)) => self.raise(value, None),
            Err(error) => self.fail(error),
        }
    }

    /// `recover()`: only a function deferred by an unwinding frame stops
    /// the panic.
    fn recover(&mut self) -> Value {
        let n = self.frames.len();
        let eligible = n >= 2
            && self.frames[n - 1].deferred
            && self.frames[n - 2].state == FrameState::Unwinding;
        if !eligible {
            return Value::Nil;
        }
        match self.frames[n - 2].panic.take() {
            Some(panic) => {
                debug!(value = %panic.value, "panic recovered");
                panic.value
            }
            None => Value::Nil,
        }
    }
}

/// Truth value of a branch condition.
fn condition(value: &Value) -> EvalResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| non_bool_condition(value.type_name()))
}

fn coerce_opt(value: Value, kind: Option<NumKind>) -> Value {
    match kind {
        Some(kind) => coerce_num(value, kind),
        None => value,
    }
}

/// Results of a `Return` with unnamed results.
fn pack(mut values: Vec<Value>, kinds: &[Option<NumKind>]) -> Value {
    match values.len() {
        0 => Value::Nil,
        1 => {
            let value = values.pop().unwrap_or_default();
            match kinds {
                [kind] => coerce_opt(value, *kind),
                _ => value,
            }
        }
        _ => {
            let kinds = kinds.iter().copied().chain(std::iter::repeat(None));
            Value::tuple(values.into_iter().zip(kinds).map(|(v, k)| coerce_opt(v, k)).collect())
        }
    }
}

fn named_results(frame: &Frame) -> Value {
    let mut values: Vec<Value> = frame
        .func
        .named_results
        .iter()
        .map(|name| frame.base_env.get(*name).unwrap_or_default())
        .collect();
    match values.len() {
        0 => Value::Nil,
        1 => values.pop().unwrap_or_default(),
        _ => Value::tuple(values),
    }
}

/// Zero results of a function that recovered from a panic.
fn zero_results(func: &Function) -> Value {
    let zero = |kind: &Option<NumKind>| match kind {
        Some(NumKind::Int) => Value::Int(0),
        Some(NumKind::Uint) => Value::Uint(0),
        Some(NumKind::Float) => Value::Float(0.0),
        Some(NumKind::Complex) => Value::Complex(Complex::default()),
        None => Value::Nil,
    };
    let mut values: Vec<Value> = func.result_kinds.iter().map(zero).collect();
    match values.len() {
        0 => Value::Nil,
        1 => values.pop().unwrap_or_default(),
        _ => Value::tuple(values),
    }
}

#[cold]
fn stack_underflow() -> EvalError {
    EvalError::host("operand stack underflow")
}

#[cold]
fn no_frame() -> EvalError {
    EvalError::host("no active frame")
}

#[cold]
fn bad_operand(op: &str) -> EvalError {
    EvalError::host(format!("malformed {op} instruction"))
}

#[cfg(test)]
mod tests;
