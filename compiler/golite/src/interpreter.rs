//! A compiled program and the VM running it.

use golite_compile::Mode;
use golite_vm::{
    undefined_variable, Completion, Decision, Env, FromValue, IntoArgs, Outcome, Value, Vm,
    VmConfig,
};
use tracing::debug;

use crate::error::Result;

/// A program ready to run, created by
/// [`InterpreterBuilder`](crate::InterpreterBuilder).
///
/// The root environment outlives individual runs: globals, declarations
/// made by the program and variables defined by [`exec`](Self::exec) stay
/// visible to later snippets and calls.
pub struct Interpreter {
    vm: Vm,
}

impl Interpreter {
    pub(crate) fn new(vm: Vm) -> Self {
        Interpreter { vm }
    }

    /// Run the program to completion.
    ///
    /// A finished run keeps its result; call [`reset`](Self::reset) to run
    /// again.
    pub fn run(&mut self) -> Result<Value> {
        Ok(self.vm.run()?)
    }

    /// Run the program, consulting `callback` on every panic and runtime
    /// error. Returning [`Decision::Stop`] leaves the VM where it stopped;
    /// a later `run` or `step` resumes it.
    pub fn run_with(
        &mut self,
        callback: impl FnMut(&Outcome) -> Decision,
    ) -> Result<Completion> {
        Ok(self.vm.run_with(callback)?)
    }

    /// Execute a single instruction.
    pub fn step(&mut self) -> Outcome {
        self.vm.step()
    }

    /// Restore the VM to the start of the program.
    pub fn reset(&mut self) {
        self.vm.reset();
    }

    /// Run `snippet` against the live root environment and return the
    /// value of its final expression statement, or `nil`.
    pub fn exec(&self, snippet: &str) -> Result<Value> {
        let config = self.vm.config();
        let file = golite_parse::parse_source(snippet, &config.interner)?;
        let entry = golite_compile::compile(&file, &config.interner, Mode::Snippet)?;
        debug!(ops = entry.code.len(), "exec snippet");
        let mut vm = Vm::new(entry, self.vm.env().clone(), config.clone());
        Ok(vm.run()?)
    }

    /// Evaluate `expr` and convert the result to `T`.
    ///
    /// With `T = ScriptFn` a script function becomes callable from the host.
    pub fn get<T: FromValue>(&self, expr: &str) -> Result<T> {
        let value = self.exec(expr)?;
        Ok(T::from_value(value, self.vm.config())?)
    }

    /// Call the script function bound to `name`.
    pub fn call<R: FromValue>(&self, name: &str, args: impl IntoArgs) -> Result<R> {
        let config = self.vm.config();
        let callee = self
            .vm
            .env()
            .get(config.interner.intern(name))
            .ok_or_else(|| undefined_variable(name))?;
        let result = Vm::call_value(config, callee, args.into_args())?;
        Ok(R::from_value(result, config)?)
    }

    /// The root environment.
    pub fn env(&self) -> &Env {
        self.vm.env()
    }

    pub fn config(&self) -> &VmConfig {
        self.vm.config()
    }
}
