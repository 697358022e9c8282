//! Errors surfaced by the embedding API.

use std::io;
use std::path::PathBuf;

use golite_compile::CompileError;
use golite_ir::Span;
use golite_parse::ParseError;
use golite_vm::EvalError;

/// Any failure while building or running an interpreter.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed source text.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A construct the engine does not support, or misplaced control flow.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// A runtime error or an unrecovered panic.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// A source file could not be read.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A host global reuses a predeclared name.
    #[error("global name collides with builtin: {0}")]
    Collision(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Where in the program text the error was raised, if known.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Parse(e) => Some(e.span),
            Error::Compile(e) => Some(e.span),
            Error::Eval(e) => e.span,
            Error::Io { .. } | Error::Collision(_) => None,
        }
    }

    /// 1-based line and column of [`span`](Self::span) within `source`.
    pub fn line_col(&self, source: &str) -> Option<(usize, usize)> {
        self.span().map(|span| span.line_col(source))
    }

    /// The runtime error, when this is one.
    pub fn as_eval(&self) -> Option<&EvalError> {
        match self {
            Error::Eval(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
