//! Interpreter configuration.

use std::path::PathBuf;

use golite_compile::Mode;
use golite_ir::SharedInterner;
use golite_vm::{
    is_reserved, prelude_env, stdout_handler, HostType, IntoNativeFunc, IntoValue,
    SharedPrintHandler, Value, Vm, VmConfig, DEFAULT_MAX_CALL_DEPTH,
};
use tracing::debug;

use crate::error::{Error, Result};
use crate::sources::{self, Source};
use crate::Interpreter;

/// Builder for an [`Interpreter`].
///
/// Sources are concatenated in the order they are added. Globals are bound
/// in the root environment before the program starts, so scripts see them
/// like predeclared names.
///
/// ```ignore
/// let mut interp = InterpreterBuilder::new()
///     .source("func main() { println(greet(\"gopher\")) }")
///     .native("greet", |name: String| format!("hello {name}"))
///     .build()?;
/// interp.run()?;
/// ```
pub struct InterpreterBuilder {
    sources: Vec<Source>,
    print: SharedPrintHandler,
    globals: Vec<(String, Value)>,
    max_call_depth: usize,
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        InterpreterBuilder {
            sources: Vec::new(),
            print: stdout_handler(),
            globals: Vec::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Add program text.
    #[must_use]
    pub fn source(mut self, text: impl Into<String>) -> Self {
        self.sources.push(Source::Text(text.into()));
        self
    }

    /// Add the contents of a file, read at [`build`](Self::build) time.
    #[must_use]
    pub fn source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::File(path.into()));
        self
    }

    /// Add every file matching `pattern`; `*` and `?` are allowed in the
    /// final path component.
    #[must_use]
    pub fn glob(mut self, pattern: impl Into<String>) -> Self {
        self.sources.push(Source::Glob(pattern.into()));
        self
    }

    /// Where `print` and `println` write.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print = handler;
        self
    }

    /// Bind a host value as a global variable.
    #[must_use]
    pub fn global(mut self, name: impl Into<String>, value: impl IntoValue) -> Self {
        self.globals.push((name.into(), value.into_value()));
        self
    }

    /// Bind a typed host function.
    #[must_use]
    pub fn native<Args>(mut self, name: impl Into<String>, f: impl IntoNativeFunc<Args>) -> Self {
        let name = name.into();
        let native = f.into_native(&name);
        self.globals.push((name, native.into_value()));
        self
    }

    /// Expose a host type under its registered name.
    #[must_use]
    pub fn host_type<T: 'static>(mut self, ty: &HostType<T>) -> Self {
        self.globals
            .push((ty.name().to_owned(), Value::Type(ty.descriptor())));
        self
    }

    /// Bound on nested calls before the run fails.
    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Read, parse and compile the sources and prepare a VM for them.
    #[tracing::instrument(level = "debug", skip_all, fields(sources = self.sources.len()))]
    pub fn build(self) -> Result<Interpreter> {
        if let Some((name, _)) = self.globals.iter().find(|(name, _)| is_reserved(name)) {
            return Err(Error::Collision(name.clone()));
        }

        let source = sources::load(&self.sources)?;
        let interner = SharedInterner::new();
        let file = golite_parse::parse_source(&source, &interner)?;
        let entry = golite_compile::compile(&file, &interner, Mode::Program)?;

        let env = prelude_env(&interner);
        for (name, value) in self.globals {
            env.define(interner.intern(&name), value);
        }
        let config = VmConfig::new(interner)
            .with_print(self.print)
            .with_max_call_depth(self.max_call_depth);
        debug!(bytes = source.len(), "interpreter ready");
        Ok(Interpreter::new(Vm::new(entry, env, config)))
    }
}
