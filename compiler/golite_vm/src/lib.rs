//! Golite VM - stack virtual machine for Golite bytecode.
//!
//! This crate runs the [`Function`](golite_compile::Function)s produced by
//! `golite_compile`.
//!
//! # Architecture
//!
//! - [`Vm`]: fetch/decode/execute loop with heap-allocated frames, defers
//!   and panic unwinding
//! - [`Env`]: lexical scopes of shared variable cells
//! - [`Value`]: the closed set of runtime values, with Go-style formatting
//! - [`TypeDesc`]: first-class runtime types
//! - [`Builtin`]: `len`, `append`, `make` and the other builtins
//! - [`interop`]: conversions across the host boundary, native functions,
//!   host types and script callbacks
//!
//! # Re-exports
//!
//! Error constructors are re-exported for hosts writing native functions;
//! the canonical path is `golite_vm::errors::*`.

mod builtins;
mod environment;
pub mod errors;
pub mod interop;
mod operators;
mod print_handler;
mod types;
mod value;
mod vm;

pub use builtins::Builtin;
pub use environment::{new_cell, Cell, Env};
pub use errors::{
    // Access errors
    index_out_of_bounds, nil_dereference, undefined_member, undefined_variable,
    // Call errors
    invalid_argument_type, not_callable, wrong_arg_count, wrong_function_args,
    // Conversion errors
    cannot_convert, type_assertion_failed,
    // Core types
    BacktraceFrame, EvalBacktrace, EvalError, EvalErrorKind, EvalResult,
};
pub use interop::{
    External, FromValue, HostType, HostTypeBuilder, IntoArgs, IntoNativeFunc, IntoValue,
    NativeFunc, ScriptFn,
};
pub use operators::{evaluate_binary, evaluate_unary, values_equal};
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, writer_handler, PrintHandler,
    SharedPrintHandler,
};
pub use types::{Method, StructLayout, TypeDesc, TypeKind};
pub use value::{
    format_float, BoundMethod, Closure, Complex, ListValue, MapKey, MapValue, Pointer,
    StructValue, Value,
};
pub use vm::{Completion, Decision, Outcome, Vm, VmConfig, DEFAULT_MAX_CALL_DEPTH};

use golite_ir::StringInterner;

/// Names of the predeclared identifiers that are not types or builtins.
const PREDECLARED_CONSTANTS: [&str; 4] = ["nil", "true", "false", "iota"];

/// Bind every builtin function and predeclared type in `env`.
pub fn install_prelude(env: &Env, interner: &StringInterner) {
    for builtin in Builtin::ALL {
        env.define(interner.intern(builtin.name()), Value::Builtin(builtin));
    }
    for (name, ty) in types::predeclared(interner) {
        env.define(interner.intern(name), Value::Type(ty));
    }
}

/// A fresh root environment holding the prelude.
pub fn prelude_env(interner: &StringInterner) -> Env {
    let env = Env::root();
    install_prelude(&env, interner);
    env
}

/// Whether `name` is predeclared: a builtin, a predeclared type or one of
/// `nil`, `true`, `false` and `iota`. Host globals may not use these names.
pub fn is_reserved(name: &str) -> bool {
    Builtin::ALL.iter().any(|b| b.name() == name)
        || PREDECLARED_CONSTANTS.contains(&name)
        || matches!(
            name,
            "bool"
                | "string"
                | "complex64"
                | "complex128"
                | "float32"
                | "float64"
                | "int"
                | "int8"
                | "int16"
                | "int32"
                | "int64"
                | "rune"
                | "uint"
                | "uint8"
                | "uint16"
                | "uint32"
                | "uint64"
                | "uintptr"
                | "byte"
                | "error"
                | "any"
        )
}
