//! Compile errors.

use golite_ir::Span;

/// Constructs the engine parses but refuses to run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Unsupported {
    Goroutines,
    Select,
    ChannelSend,
    ChannelReceive,
    TypeSwitch,
    Fallthrough,
    Goto,
}

impl Unsupported {
    pub fn message(self) -> &'static str {
        match self {
            Unsupported::Goroutines => "goroutines are not supported",
            Unsupported::Select => "select statements are not supported",
            Unsupported::ChannelSend => "channel send is not supported",
            Unsupported::ChannelReceive => "channel receive is not supported",
            Unsupported::TypeSwitch => "type switches are not supported",
            Unsupported::Fallthrough => "fallthrough is not supported",
            Unsupported::Goto => "goto is not supported",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileErrorKind {
    #[error("{}", .0.message())]
    Unsupported(Unsupported),
    #[error("assignment count mismatch: {vars} variable(s) but {values} value(s)")]
    CountMismatch { vars: usize, values: usize },
    #[error("wrong number of return values (have {have}, want {want})")]
    ReturnCount { have: usize, want: usize },
    #[error("no new variables on left side of :=")]
    NoNewVariables,
    #[error("non-name {0} on left side of :=")]
    NonNameDefine(String),
    #[error("break is not in a loop, switch, or select")]
    BreakOutsideLoop,
    #[error("continue is not in a loop")]
    ContinueOutsideLoop,
    #[error("invalid {stmt} label {label}")]
    InvalidLabel { stmt: &'static str, label: String },
    #[error("cannot assign to {0}")]
    NotAssignable(String),
    #[error("cannot take the address of {0}")]
    NotAddressable(String),
    #[error("expression in defer must be function call")]
    DeferNotCall,
    #[error("use of .(type) outside type switch")]
    TypeGuardOutsideSwitch,
    #[error("invalid composite literal type {0}")]
    InvalidComposite(String),
}

/// Compile failure; no partial `Function` is produced.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub span: Span,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, span: Span) -> Self {
        CompileError { kind, span }
    }

    pub fn unsupported(what: Unsupported, span: Span) -> Self {
        CompileError::new(CompileErrorKind::Unsupported(what), span)
    }
}
