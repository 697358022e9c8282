//! Syntax tree for the Go-like surface grammar.
//!
//! The tree is owned and boxed (`Box<Expr>`), produced by `golite_parse`
//! and consumed once by `golite_compile`. Every node carries a [`Span`].

use crate::{Name, Span};

/// One parsed compilation unit: a source file or a snippet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct File {
    /// `package` clause, if present.
    pub package: Option<Name>,
    /// Imported package paths (as written).
    pub imports: Vec<Import>,
    /// Top-level items in source order.
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub alias: Option<Name>,
    pub path: Name,
    pub span: Span,
}

/// Top-level item.
///
/// Files contain declarations only; snippets may also contain statements.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Func(FuncDecl),
    Stmt(Stmt),
}

/// Function or method declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub name: Name,
    pub recv: Option<Receiver>,
    pub sig: FuncType,
    pub body: Block,
    pub span: Span,
}

/// Method receiver: `(p *Point)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Receiver {
    pub name: Option<Name>,
    pub type_name: Name,
    pub pointer: bool,
    pub span: Span,
}

/// Function signature.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FuncType {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    /// Last parameter is `...T`.
    pub variadic: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Option<Name>,
    pub ty: TypeExpr,
}

/// Type syntax.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeExprKind {
    /// `int`, `Point`
    Named(Name),
    /// `pkg.Type`
    Qualified(Name, Name),
    /// `[]T`
    Slice(Box<TypeExpr>),
    /// `[N]T`; `None` length is `[...]T`.
    Array(Option<Box<Expr>>, Box<TypeExpr>),
    /// `map[K]V`
    Map(Box<TypeExpr>, Box<TypeExpr>),
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `func(...) ...`
    Func(Box<FuncType>),
    /// `chan T`
    Chan(Box<TypeExpr>),
    /// `struct { ... }`
    Struct(Vec<FieldDecl>),
    /// `interface { ... }`: method names only.
    Interface(Vec<Name>),
}

/// Struct field declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: TypeExpr,
    pub embedded: bool,
}

/// Block of statements: `{ ... }`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Declaration that may appear at top level or inside a function body.
#[derive(Clone, Debug, PartialEq)]
pub enum GenDecl {
    Var(Vec<ValueSpec>),
    Const(Vec<ValueSpec>),
    Type(Vec<TypeSpec>),
}

/// `a, b T = x, y` in a `var` or `const` declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<Name>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Expr>,
    /// Position of this spec in its `const` group (value of `iota`).
    pub iota: i64,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeSpec {
    pub name: Name,
    pub ty: TypeExpr,
    /// `type A = B`
    pub alias: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Assignment operator of an assignment statement.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `:=`
    Define,
    /// `op=`
    Compound(BinaryOp),
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Decl(GenDecl),
    Expr(Expr),
    /// `ch <- v`
    Send(Expr, Expr),
    /// `x++` (`true`) / `x--` (`false`)
    IncDec(Expr, bool),
    Assign {
        lhs: Vec<Expr>,
        op: AssignOp,
        rhs: Vec<Expr>,
    },
    Go(Expr),
    Defer(Expr),
    Return(Vec<Expr>),
    Break(Option<Name>),
    Continue(Option<Name>),
    Goto(Name),
    Fallthrough,
    Block(Block),
    If {
        init: Option<Box<Stmt>>,
        cond: Expr,
        then: Block,
        els: Option<Box<Stmt>>,
    },
    Switch {
        init: Option<Box<Stmt>>,
        tag: Option<Expr>,
        clauses: Vec<CaseClause>,
    },
    /// `switch x := y.(type) { ... }`; the body is not retained.
    TypeSwitch,
    /// `select { ... }`; the body is not retained.
    Select,
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
    },
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        expr: Expr,
        body: Block,
    },
    Labeled(Name, Box<Stmt>),
    Empty,
}

/// `case a, b:` or `default:` clause.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseClause {
    /// Empty for `default`.
    pub exprs: Vec<Expr>,
    pub is_default: bool,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

/// Element of a composite literal: `value` or `key: value`.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub key: Option<Expr>,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Ident(Name),
    Int(u64),
    Float(f64),
    Imag(f64),
    Char(i64),
    Str(Name),
    /// `T{...}`; `ty` is `None` for an elided inner literal `{...}`.
    Composite {
        ty: Option<TypeExpr>,
        elems: Vec<Element>,
    },
    FuncLit {
        sig: FuncType,
        body: Block,
    },
    /// A type used in expression position: `make([]int, 3)`.
    Type(TypeExpr),
    Paren(Box<Expr>),
    Selector(Box<Expr>, Name),
    Index(Box<Expr>, Box<Expr>),
    Slice {
        base: Box<Expr>,
        low: Option<Box<Expr>>,
        high: Option<Box<Expr>>,
    },
    /// `x.(T)`; `None` is the `x.(type)` guard.
    TypeAssert(Box<Expr>, Option<TypeExpr>),
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        /// Final argument is spread: `f(xs...)`.
        spread: bool,
    },
    /// `*x`: dereference (or pointer type in type position).
    Star(Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    AndNot,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::AndNot => "&^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
        }
    }

    /// Binding power; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => 3,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::BitOr | BinaryOp::BitXor => 4,
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::BitAnd
            | BinaryOp::AndNot => 5,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }
}

/// Unary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Pos,
    /// `!x`
    Not,
    /// `^x`
    BitNot,
    /// `&x`
    Addr,
    /// `<-x`
    Recv,
}

impl UnaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
        }
    }
}
