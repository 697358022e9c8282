// Test code uses unwrap/expect for clarity - panics provide good test failure messages
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end tests of the embedding API.
//!
//! Every test goes through [`golite::InterpreterBuilder`], so source text is
//! lexed, parsed, compiled and run exactly as a host application would.
//!
//! # Organization
//!
//! - `programs` - whole programs and the output they print
//! - `host` - globals, native functions and host types seen from scripts
//! - `session` - `exec`, `get`, `call`, stepping and resets
//! - `sources` - files and globs
//! - `common` - shared helpers
//!
//! ```bash
//! cargo test -p golite --test embedding
//! cargo test -p golite --test embedding host
//! ```

#[path = "embedding/common.rs"]
mod common;

#[path = "embedding/programs.rs"]
mod programs;

#[path = "embedding/host.rs"]
mod host;

#[path = "embedding/session.rs"]
mod session;

#[path = "embedding/sources.rs"]
mod sources;
