//! Stack safety for recursive descent.
//!
//! The parser and the compiler both recurse once per nesting level of the
//! source. Deeply nested expressions would overflow the native stack, so the
//! recursive entry points run through [`ensure_sufficient_stack`], which grows
//! the stack on demand.
//!
//! The VM itself does not recurse on script calls; its frames live on the heap.

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Ensure sufficient stack space is available before executing `f`.
///
/// If the remaining stack is below the red zone, a new segment is allocated
/// before calling `f`.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack; call directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
