//! Runtime errors and their constructors.
//!
//! Every runtime failure is an [`EvalError`] carrying a structured
//! [`EvalErrorKind`]. Construct errors through the factory functions in this
//! module so that messages stay uniform across the VM and the builtins.

use std::fmt;

use golite_ir::{BinaryOp, Span, UnaryOp};

/// Result of a runtime operation.
pub type EvalResult<T = crate::Value> = Result<T, EvalError>;

/// Typed category of a runtime error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    // Arithmetic
    DivisionByZero,

    // Operators
    InvalidBinaryOp {
        op: BinaryOp,
        type_name: String,
    },
    MismatchedTypes {
        op: BinaryOp,
        left: String,
        right: String,
    },
    InvalidUnaryOp {
        op: UnaryOp,
        type_name: String,
    },

    // Access
    UndefinedVariable {
        name: String,
    },
    UndefinedMember {
        member: String,
        type_name: String,
    },
    IndexOutOfBounds {
        index: i64,
        len: usize,
    },
    SliceOutOfBounds {
        low: i64,
        high: i64,
        len: usize,
    },
    NotIndexable {
        type_name: String,
    },
    NilMapWrite,
    NilDereference,
    InvalidMapKey {
        type_name: String,
    },

    // Calls
    NotCallable {
        type_name: String,
    },
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    BuiltinArity {
        op: String,
        expected: String,
    },
    InvalidArgumentType {
        op: String,
        type_name: String,
    },
    RecursionLimit {
        limit: usize,
    },
    ResultCount {
        want: usize,
        got: usize,
    },

    // Types
    TypeAssertion {
        have: String,
        want: String,
    },
    Conversion {
        from: String,
        to: String,
    },
    ImmutableList,
    NegativeLength {
        op: &'static str,
    },
    LengthOutOfRange {
        op: &'static str,
    },
    Unsupported {
        feature: &'static str,
    },

    /// Unrecovered `panic(v)`.
    Panic {
        message: String,
    },

    /// Error raised by host code.
    Host {
        message: String,
    },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivisionByZero => write!(f, "integer divide by zero"),

            Self::InvalidBinaryOp { op, type_name } => write!(
                f,
                "invalid operation: operator {} not defined on {type_name}",
                op.as_symbol()
            ),
            Self::MismatchedTypes { op, left, right } => write!(
                f,
                "invalid operation: mismatched types {left} and {right} for {}",
                op.as_symbol()
            ),
            Self::InvalidUnaryOp { op, type_name } => write!(
                f,
                "invalid operation: operator {} not defined on {type_name}",
                op.as_symbol()
            ),

            Self::UndefinedVariable { name } => write!(f, "undefined: {name}"),
            Self::UndefinedMember { member, type_name } => {
                write!(f, "{type_name} has no field or method {member}")
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index out of range [{index}] with length {len}")
            }
            Self::SliceOutOfBounds { low, high, len } => {
                write!(f, "slice bounds out of range [{low}:{high}] with length {len}")
            }
            Self::NotIndexable { type_name } => write!(f, "cannot index {type_name}"),
            Self::NilMapWrite => write!(f, "assignment to entry in nil map"),
            Self::NilDereference => {
                write!(f, "invalid memory address or nil pointer dereference")
            }
            Self::InvalidMapKey { type_name } => write!(f, "invalid map key type {type_name}"),

            Self::NotCallable { type_name } => write!(f, "cannot call non-function {type_name}"),
            Self::ArityMismatch {
                name,
                expected,
                got,
            } => write!(
                f,
                "wrong argument count in call to {name}: have {got}, want {expected}"
            ),
            Self::BuiltinArity { op, expected } => {
                write!(f, "{op} expects {expected} argument(s)")
            }
            Self::InvalidArgumentType { op, type_name } => {
                write!(f, "invalid argument type for {op}: {type_name}")
            }
            Self::RecursionLimit { limit } => {
                write!(f, "maximum recursion depth exceeded (limit: {limit})")
            }
            Self::ResultCount { want, got } => {
                write!(f, "assignment mismatch: {want} variable(s) but {got} value(s)")
            }

            Self::TypeAssertion { have, want } => {
                write!(f, "interface conversion: interface {{}} is {have}, not {want}")
            }
            Self::Conversion { from, to } => write!(f, "cannot convert {from} to {to}"),
            Self::ImmutableList => write!(f, "cannot modify immutable list"),
            Self::NegativeLength { op } => write!(f, "{op}: negative length"),
            Self::LengthOutOfRange { op } => write!(f, "{op}: len out of range"),
            Self::Unsupported { feature } => write!(f, "{feature} not supported"),

            Self::Panic { message } => write!(f, "panic: {message}"),
            Self::Host { message } => write!(f, "{message}"),
        }
    }
}

/// One frame of a runtime backtrace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    /// Function name.
    pub name: String,
    /// Position of the active instruction.
    pub span: Span,
}

/// Snapshot of the call stack where an error was raised, innermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        EvalBacktrace { frames }
    }

    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "stack backtrace:")?;
        for (i, frame) in self.frames.iter().enumerate() {
            writeln!(f, "  {i}: {} at {}", frame.name, frame.span)?;
        }
        Ok(())
    }
}

/// Runtime error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Rendered message; equal to `kind.to_string()`.
    pub message: String,
    pub span: Option<Span>,
    pub backtrace: Option<EvalBacktrace>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        EvalError {
            kind,
            message,
            span: None,
            backtrace: None,
        }
    }

    /// Error raised by host code, with a free-form message.
    pub fn host(message: impl Into<String>) -> Self {
        EvalError::new(EvalErrorKind::Host {
            message: message.into(),
        })
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span.get_or_insert(span);
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        self.backtrace.get_or_insert(backtrace);
        self
    }

    /// Errors that terminate the run instead of unwinding as a panic.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, EvalErrorKind::RecursionLimit { .. })
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EvalError {}

// Operators

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalError::new(EvalErrorKind::DivisionByZero)
}

#[cold]
pub fn invalid_binary_op(op: BinaryOp, type_name: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::InvalidBinaryOp {
        op,
        type_name: type_name.into(),
    })
}

#[cold]
pub fn mismatched_types(
    op: BinaryOp,
    left: impl Into<String>,
    right: impl Into<String>,
) -> EvalError {
    EvalError::new(EvalErrorKind::MismatchedTypes {
        op,
        left: left.into(),
        right: right.into(),
    })
}

#[cold]
pub fn invalid_unary_op(op: UnaryOp, type_name: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::InvalidUnaryOp {
        op,
        type_name: type_name.into(),
    })
}

// Access

#[cold]
pub fn undefined_variable(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::UndefinedVariable {
        name: name.to_owned(),
    })
}

#[cold]
pub fn undefined_member(member: &str, type_name: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::UndefinedMember {
        member: member.to_owned(),
        type_name: type_name.into(),
    })
}

#[cold]
pub fn index_out_of_bounds(index: i64, len: usize) -> EvalError {
    EvalError::new(EvalErrorKind::IndexOutOfBounds { index, len })
}

#[cold]
pub fn slice_out_of_bounds(low: i64, high: i64, len: usize) -> EvalError {
    EvalError::new(EvalErrorKind::SliceOutOfBounds { low, high, len })
}

#[cold]
pub fn not_indexable(type_name: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::NotIndexable {
        type_name: type_name.into(),
    })
}

#[cold]
pub fn nil_map_write() -> EvalError {
    EvalError::new(EvalErrorKind::NilMapWrite)
}

#[cold]
pub fn nil_dereference() -> EvalError {
    EvalError::new(EvalErrorKind::NilDereference)
}

#[cold]
pub fn invalid_map_key(type_name: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::InvalidMapKey {
        type_name: type_name.into(),
    })
}

// Calls

#[cold]
pub fn not_callable(type_name: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::NotCallable {
        type_name: type_name.into(),
    })
}

#[cold]
pub fn wrong_function_args(name: &str, expected: usize, got: usize) -> EvalError {
    EvalError::new(EvalErrorKind::ArityMismatch {
        name: name.to_owned(),
        expected,
        got,
    })
}

/// `"<op> expects <N> argument(s)"`
#[cold]
pub fn wrong_arg_count(op: &str, expected: usize) -> EvalError {
    EvalError::new(EvalErrorKind::BuiltinArity {
        op: op.to_owned(),
        expected: expected.to_string(),
    })
}

/// Arity error for builtins taking a variable number of arguments.
#[cold]
pub fn wrong_arg_count_range(op: &str, min: usize, max: usize) -> EvalError {
    let expected = if max == usize::MAX {
        format!("at least {min}")
    } else {
        format!("{min} to {max}")
    };
    EvalError::new(EvalErrorKind::BuiltinArity {
        op: op.to_owned(),
        expected,
    })
}

/// `"invalid argument type for <op>: <type>"`
#[cold]
pub fn invalid_argument_type(op: &str, type_name: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::InvalidArgumentType {
        op: op.to_owned(),
        type_name: type_name.into(),
    })
}

#[cold]
pub fn recursion_limit_exceeded(limit: usize) -> EvalError {
    EvalError::new(EvalErrorKind::RecursionLimit { limit })
}

#[cold]
pub fn result_count_mismatch(want: usize, got: usize) -> EvalError {
    EvalError::new(EvalErrorKind::ResultCount { want, got })
}

// Types

#[cold]
pub fn type_assertion_failed(have: impl Into<String>, want: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::TypeAssertion {
        have: have.into(),
        want: want.into(),
    })
}

#[cold]
pub fn cannot_convert(from: impl Into<String>, to: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Conversion {
        from: from.into(),
        to: to.into(),
    })
}

#[cold]
pub fn immutable_list() -> EvalError {
    EvalError::new(EvalErrorKind::ImmutableList)
}

#[cold]
pub fn negative_length(op: &'static str) -> EvalError {
    EvalError::new(EvalErrorKind::NegativeLength { op })
}

#[cold]
pub fn length_out_of_range(op: &'static str) -> EvalError {
    EvalError::new(EvalErrorKind::LengthOutOfRange { op })
}

#[cold]
pub fn channels_not_supported() -> EvalError {
    EvalError::new(EvalErrorKind::Unsupported {
        feature: "channels are",
    })
}

#[cold]
pub fn panic_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Panic {
        message: message.into(),
    })
}

#[cold]
pub fn not_a_type(type_name: impl Into<String>) -> EvalError {
    EvalError::host(format!("{} is not a type", type_name.into()))
}

#[cold]
pub fn non_bool_condition(type_name: impl Into<String>) -> EvalError {
    EvalError::host(format!("non-boolean condition of type {}", type_name.into()))
}

#[cold]
pub fn invalid_indirect(type_name: impl Into<String>) -> EvalError {
    EvalError::host(format!("invalid indirect of {}", type_name.into()))
}

#[cold]
pub fn invalid_composite(type_name: impl Into<String>, reason: &str) -> EvalError {
    EvalError::host(format!("invalid composite literal of type {}: {reason}", type_name.into()))
}
