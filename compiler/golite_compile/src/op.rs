//! Instruction set of the stack machine.
//!
//! Operands are indices into the owning [`Function`](crate::Function)'s
//! constant table, interned names, or absolute jump targets within the same
//! function's code.

use golite_ir::{BinaryOp, Name, UnaryOp};

/// One instruction.
///
/// Stack effects are written `[before] -> [after]`, top of stack last.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    /// `[] -> [constant]`
    Const(u32),
    Nil,
    True,
    False,
    /// `[v] -> []`
    Pop,
    /// `[v] -> [v v]`
    Dup,
    /// `[a b] -> [b a]`
    Swap,

    /// Push the value of a variable, walking the environment chain.
    Load(Name),
    /// Overwrite an existing variable: `[v] -> []`.
    Store(Name),
    /// Bind a fresh cell in the innermost scope: `[v] -> []`.
    Define(Name),
    /// Pointer to a variable's cell: `[] -> [ptr]`.
    AddrOf(Name),
    PushScope,
    PopScope,

    /// Close over the current environment: `[] -> [closure]`.
    MakeClosure(u32),
    /// `[callee args..] -> [result]`; with `spread` the final argument is a
    /// list expanded into the variadic tail.
    Call { argc: u32, spread: bool },
    /// Like `Call` but the call is queued until the frame returns.
    Defer { argc: u32, spread: bool },
    /// Leave the frame with `n` values from the stack (`0` is a bare return).
    Return(u32),
    /// Destructure a multi-value result: `[list] -> [v1 .. vn]`.
    Unpack(u32),

    /// Build a composite type descriptor from component types on the stack.
    MakeType(TypeCtor),
    /// Bind a named type whose underlying type is set later.
    DeclareType(Name),
    /// `[underlying] -> []`, completing a `DeclareType`.
    SetUnderlying(Name),
    /// `[closure] -> []`, attaching a method to a named type.
    DefineMethod {
        ty: Name,
        method: Name,
        pointer: bool,
    },
    /// `[type] -> [zero value]`
    Zero,
    /// Apply implicit numeric conversion for a typed declaration:
    /// `[value type] -> [value]`.
    Coerce,
    /// Type assertion: `[value type] -> [value]` or, with `ok`,
    /// `[value type] -> [value bool]`.
    Assert { ok: bool },

    Binary(BinaryOp),
    Unary(UnaryOp),

    Jump(u32),
    /// Pops the condition.
    JumpIfFalse(u32),
    /// Pops the condition.
    JumpIfTrue(u32),
    /// Jumps keeping the condition when false, otherwise pops it.
    JumpIfFalseOrPop(u32),
    /// Jumps keeping the condition when true, otherwise pops it.
    JumpIfTrueOrPop(u32),

    /// Composite literal: `[type v1 .. vn] -> [value]`, or with `keyed`
    /// `[type k1 v1 .. kn vn] -> [value]` where a `nil` key means "next".
    Composite { n: u32, keyed: bool },
    /// `[container key] -> [value]`
    Index,
    /// Comma-ok map lookup: `[map key] -> [value bool]`.
    IndexOk,
    /// `[base low? high?] -> [slice]`
    Slice { low: bool, high: bool },
    /// Field, method or host member: `[value] -> [member]`.
    Select(Name),

    /// `[container key] -> [ptr]`
    IndexAddr,
    /// `[ptr-or-value] -> [ptr]` to a struct field.
    FieldAddr(Name),
    /// `[ptr] -> [value]`
    Deref,
    /// `[ptr value] -> []`
    StorePtr,
    /// Move a value into a fresh cell: `[v] -> [ptr]`.
    Escape,

    /// `[iterable] -> []`, pushing a range iterator on the frame.
    IterNew,
    /// Advance the innermost iterator, pushing the requested key/value, or
    /// jump to `done` when exhausted.
    IterNext { done: u32, key: bool, value: bool },
    /// Discard the innermost iterator.
    IterEnd,
}

impl Op {
    /// Jump target, for any jumping instruction.
    pub fn jump_target(self) -> Option<u32> {
        match self {
            Op::Jump(t)
            | Op::JumpIfFalse(t)
            | Op::JumpIfTrue(t)
            | Op::JumpIfFalseOrPop(t)
            | Op::JumpIfTrueOrPop(t)
            | Op::IterNext { done: t, .. } => Some(t),
            _ => None,
        }
    }

    /// Rewrite the jump target of a jumping instruction.
    pub(crate) fn set_jump_target(&mut self, target: u32) {
        match self {
            Op::Jump(t)
            | Op::JumpIfFalse(t)
            | Op::JumpIfTrue(t)
            | Op::JumpIfFalseOrPop(t)
            | Op::JumpIfTrueOrPop(t)
            | Op::IterNext { done: t, .. } => *t = target,
            _ => {}
        }
    }
}

/// Type constructor applied by [`Op::MakeType`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeCtor {
    /// `[elem] -> [[]elem]`
    Slice,
    /// `[len elem] -> [[len]elem]`; without `sized`, `[elem]` and the length
    /// comes from the literal.
    Array { sized: bool },
    /// `[key elem] -> [map[key]elem]`
    Map,
    /// `[elem] -> [*elem]`
    Pointer,
    /// `[] -> [func]`
    Func,
    /// `[elem] -> [chan elem]`
    Chan,
    /// `[t1 .. tn] -> [struct]`; the operand is a `Constant::Names` with the
    /// field names.
    Struct(u32),
    /// `[] -> [interface]`; the operand lists the method names.
    Interface(u32),
}

/// Numeric kind of a parameter or result known from its declared type, used
/// for implicit conversion of untyped arguments (`f(1)` for `f(x float64)`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NumKind {
    Int,
    Uint,
    Float,
    Complex,
}

impl NumKind {
    /// Kind of a predeclared numeric type name.
    pub fn from_type_name(name: &str) -> Option<NumKind> {
        match name {
            "int" | "int8" | "int16" | "int32" | "int64" | "rune" => Some(NumKind::Int),
            "uint" | "uint8" | "uint16" | "uint32" | "uint64" | "uintptr" | "byte" => {
                Some(NumKind::Uint)
            }
            "float32" | "float64" => Some(NumKind::Float),
            "complex64" | "complex128" => Some(NumKind::Complex),
            _ => None,
        }
    }
}
