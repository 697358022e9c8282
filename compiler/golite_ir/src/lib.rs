//! Golite IR - shared front-end data structures.
//!
//! This crate contains the types every phase of the engine agrees on:
//! - Spans for source locations
//! - Names for interned identifiers and string literals
//! - Tokens for lexer output
//! - The syntax tree (`ast`) consumed by the compiler

pub mod ast;
mod interner;
mod name;
mod span;
mod token;

pub use ast::{BinaryOp, UnaryOp};
pub use interner::{InternError, SharedInterner, StringInterner};
pub use name::Name;
pub use span::Span;
pub use token::{Token, TokenKind};
