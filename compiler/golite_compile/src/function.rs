//! Compiled functions and their constant tables.

use std::fmt::{self, Write as _};
use std::rc::Rc;

use golite_ir::{Name, Span, StringInterner};

use crate::{NumKind, Op};

/// Entry in a function's constant table.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Int(i64),
    /// Integer literal too large for `i64`.
    Uint(u64),
    Float(f64),
    /// Imaginary literal `vi`.
    Imag(f64),
    Str(Rc<str>),
    /// Nested function body (function literal, declared function or method).
    Function(Rc<Function>),
    /// Field or method names for `MakeType`.
    Names(Rc<[Name]>),
}

/// An immutable compiled function body.
///
/// Shared read-only (`Rc`) by every closure created from it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Function {
    pub name: Name,
    /// Parameter names in binding order; a method's receiver comes first.
    /// Unnamed parameters are `_` and are not bound.
    pub params: Vec<Name>,
    /// Numeric kind of each parameter's declared type, when it is a
    /// predeclared numeric type.
    pub param_kinds: Vec<Option<NumKind>>,
    /// Last parameter collects the remaining arguments as a list.
    pub variadic: bool,
    /// Named results; empty when results are unnamed.
    pub named_results: Vec<Name>,
    /// Number of declared results; `None` for top-level entry code.
    pub result_count: Option<usize>,
    pub result_kinds: Vec<Option<NumKind>>,
    pub code: Vec<Op>,
    /// One span per instruction.
    pub spans: Vec<Span>,
    pub constants: Vec<Constant>,
}

impl Function {
    /// Number of non-variadic parameters.
    pub fn arity(&self) -> usize {
        self.params.len() - usize::from(self.variadic)
    }

    pub fn span_at(&self, ip: usize) -> Span {
        self.spans.get(ip).copied().unwrap_or(Span::DUMMY)
    }

    /// Human-readable listing, one instruction per line.
    pub fn disassemble(&self, interner: &StringInterner) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "func {}:", interner.lookup(self.name));
        for (ip, op) in self.code.iter().enumerate() {
            let _ = writeln!(out, "{ip:4} {}", DisplayOp { op: *op, interner });
        }
        for constant in &self.constants {
            if let Constant::Function(f) = constant {
                out.push_str(&f.disassemble(interner));
            }
        }
        out
    }
}

struct DisplayOp<'a> {
    op: Op,
    interner: &'a StringInterner,
}

impl fmt::Display for DisplayOp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |n: Name| self.interner.lookup(n);
        match self.op {
            Op::Load(n) => write!(f, "Load {}", name(n)),
            Op::Store(n) => write!(f, "Store {}", name(n)),
            Op::Define(n) => write!(f, "Define {}", name(n)),
            Op::AddrOf(n) => write!(f, "AddrOf {}", name(n)),
            Op::Select(n) => write!(f, "Select {}", name(n)),
            Op::FieldAddr(n) => write!(f, "FieldAddr {}", name(n)),
            Op::DeclareType(n) => write!(f, "DeclareType {}", name(n)),
            Op::SetUnderlying(n) => write!(f, "SetUnderlying {}", name(n)),
            Op::DefineMethod { ty, method, pointer } => {
                let star = if pointer { "*" } else { "" };
                write!(f, "DefineMethod ({star}{}).{}", name(ty), name(method))
            }
            other => write!(f, "{other:?}"),
        }
    }
}
