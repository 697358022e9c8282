//! Golite - an embeddable scripting engine for a Go-like language.
//!
//! Source text is parsed by `golite_parse`, lowered to bytecode by
//! `golite_compile` and executed by the stack machine in `golite_vm`. This
//! crate ties the pipeline together behind a builder:
//!
//! ```ignore
//! use golite::{buffer_handler, InterpreterBuilder, ScriptFn};
//!
//! let out = buffer_handler();
//! let mut interp = InterpreterBuilder::new()
//!     .source("func double(n int) int { return n * 2 }")
//!     .global("limit", 10_i64)
//!     .print_handler(out.clone())
//!     .build()?;
//! interp.run()?;
//! let double: ScriptFn = interp.get("double")?;
//! assert_eq!(double.call::<i64>((21_i64,))?, 42);
//! ```
//!
//! # Debugging
//!
//! Call [`init_tracing`] and set `RUST_LOG`:
//! - `RUST_LOG=golite=debug` - build and snippet events
//! - `RUST_LOG=golite_vm=debug` - panics raised and recovered, runtime errors
//! - `RUST_LOG=golite_vm=trace` - every frame entered and left

mod builder;
mod error;
mod interpreter;
mod sources;

pub use builder::InterpreterBuilder;
pub use error::{Error, Result};
pub use interpreter::Interpreter;

pub use golite_compile::{CompileError, CompileErrorKind};
pub use golite_ir::Span;
pub use golite_parse::ParseError;
pub use golite_vm::{
    buffer_handler, silent_handler, stdout_handler, writer_handler, Completion, Decision,
    EvalError, EvalErrorKind, External, FromValue, HostType, HostTypeBuilder, IntoArgs,
    IntoNativeFunc, IntoValue, NativeFunc, Outcome, PrintHandler, ScriptFn, SharedPrintHandler,
    Value,
};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a hierarchical tracing subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let tree = tracing_tree::HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true);
            // Another subscriber may already be installed by the host.
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(tree)
                .try_init();
        }
    });
}
