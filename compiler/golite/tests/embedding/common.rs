//! Shared helpers for embedding tests.

use golite::{buffer_handler, Error, Interpreter, InterpreterBuilder, SharedPrintHandler};

/// Build `source` with a buffered print handler.
pub fn build(source: &str) -> (Interpreter, SharedPrintHandler) {
    build_with(InterpreterBuilder::new().source(source))
}

/// Finish `builder` with a buffered print handler.
pub fn build_with(builder: InterpreterBuilder) -> (Interpreter, SharedPrintHandler) {
    golite::init_tracing();
    let out = buffer_handler();
    let interp = builder
        .print_handler(out.clone())
        .build()
        .unwrap_or_else(|e| panic!("build failed: {e}"));
    (interp, out)
}

/// Run `source` and return what it printed.
pub fn output(source: &str) -> String {
    let (mut interp, out) = build(source);
    if let Err(e) = interp.run() {
        panic!("run failed: {e}\n{}", out.get_output());
    }
    out.get_output()
}

/// Build and run `source`, expecting it to fail at either step.
pub fn failure(builder: InterpreterBuilder) -> Error {
    let mut interp = match builder.print_handler(buffer_handler()).build() {
        Ok(interp) => interp,
        Err(e) => return e,
    };
    match interp.run() {
        Ok(v) => panic!("expected failure, got {v}"),
        Err(e) => e,
    }
}

pub fn source_failure(source: &str) -> Error {
    failure(InterpreterBuilder::new().source(source))
}
