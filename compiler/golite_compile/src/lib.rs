//! Bytecode compiler for Golite.
//!
//! Lowers an [`ast::File`](golite_ir::ast::File) into an entry [`Function`]
//! for the stack VM in `golite_vm`. Control flow becomes explicit jumps;
//! declarations become instructions that bind names in the environment at
//! run time.

mod compiler;
mod error;
mod function;
mod op;

pub use compiler::{Compiler, Mode};
pub use error::{CompileError, CompileErrorKind, Unsupported};
pub use function::{Constant, Function};
pub use op::{NumKind, Op, TypeCtor};

use std::rc::Rc;

use golite_ir::{ast, StringInterner};

/// Compile a parsed file into its entry function.
pub fn compile(
    file: &ast::File,
    interner: &StringInterner,
    mode: Mode,
) -> Result<Rc<Function>, CompileError> {
    Compiler::new(interner).compile_file(file, mode)
}
