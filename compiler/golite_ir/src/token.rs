//! Token kinds produced by the lexer.

use crate::{Name, Span};
use std::fmt;

/// A lexed token with its source location.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}

/// Token kind.
///
/// Literal payloads are decoded by the lexer: integer literals carry their
/// value, string literals their unescaped contents as an interned `Name`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Literals
    Ident(Name),
    Int(u64),
    Float(f64),
    Imag(f64),
    Char(i64),
    Str(Name),

    // Keywords
    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Select,
    Struct,
    Switch,
    Type,
    Var,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    AmpCaret,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,
    AmpCaretAssign,
    AndAnd,
    OrOr,
    Arrow,
    Inc,
    Dec,
    EqEq,
    Lt,
    Gt,
    Assign,
    Not,
    NotEq,
    LtEq,
    GtEq,
    Define,
    Ellipsis,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Semicolon,
    Colon,

    Eof,
}

impl TokenKind {
    /// Map a keyword spelling to its token kind.
    pub fn keyword(text: &str) -> Option<TokenKind> {
        let kind = match text {
            "break" => TokenKind::Break,
            "case" => TokenKind::Case,
            "chan" => TokenKind::Chan,
            "const" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            "default" => TokenKind::Default,
            "defer" => TokenKind::Defer,
            "else" => TokenKind::Else,
            "fallthrough" => TokenKind::Fallthrough,
            "for" => TokenKind::For,
            "func" => TokenKind::Func,
            "go" => TokenKind::Go,
            "goto" => TokenKind::Goto,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "interface" => TokenKind::Interface,
            "map" => TokenKind::Map,
            "package" => TokenKind::Package,
            "range" => TokenKind::Range,
            "return" => TokenKind::Return,
            "select" => TokenKind::Select,
            "struct" => TokenKind::Struct,
            "switch" => TokenKind::Switch,
            "type" => TokenKind::Type,
            "var" => TokenKind::Var,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether a newline after this token ends the statement.
    pub fn ends_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Ident(_)
                | TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Imag(_)
                | TokenKind::Char(_)
                | TokenKind::Str(_)
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Fallthrough
                | TokenKind::Return
                | TokenKind::Inc
                | TokenKind::Dec
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }

    /// Human-readable description used in parse errors.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Ident(_) => "identifier",
            TokenKind::Int(_) => "integer literal",
            TokenKind::Float(_) => "float literal",
            TokenKind::Imag(_) => "imaginary literal",
            TokenKind::Char(_) => "rune literal",
            TokenKind::Str(_) => "string literal",
            TokenKind::Break => "`break`",
            TokenKind::Case => "`case`",
            TokenKind::Chan => "`chan`",
            TokenKind::Const => "`const`",
            TokenKind::Continue => "`continue`",
            TokenKind::Default => "`default`",
            TokenKind::Defer => "`defer`",
            TokenKind::Else => "`else`",
            TokenKind::Fallthrough => "`fallthrough`",
            TokenKind::For => "`for`",
            TokenKind::Func => "`func`",
            TokenKind::Go => "`go`",
            TokenKind::Goto => "`goto`",
            TokenKind::If => "`if`",
            TokenKind::Import => "`import`",
            TokenKind::Interface => "`interface`",
            TokenKind::Map => "`map`",
            TokenKind::Package => "`package`",
            TokenKind::Range => "`range`",
            TokenKind::Return => "`return`",
            TokenKind::Select => "`select`",
            TokenKind::Struct => "`struct`",
            TokenKind::Switch => "`switch`",
            TokenKind::Type => "`type`",
            TokenKind::Var => "`var`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Amp => "`&`",
            TokenKind::Pipe => "`|`",
            TokenKind::Caret => "`^`",
            TokenKind::Shl => "`<<`",
            TokenKind::Shr => "`>>`",
            TokenKind::AmpCaret => "`&^`",
            TokenKind::PlusAssign => "`+=`",
            TokenKind::MinusAssign => "`-=`",
            TokenKind::StarAssign => "`*=`",
            TokenKind::SlashAssign => "`/=`",
            TokenKind::PercentAssign => "`%=`",
            TokenKind::AmpAssign => "`&=`",
            TokenKind::PipeAssign => "`|=`",
            TokenKind::CaretAssign => "`^=`",
            TokenKind::ShlAssign => "`<<=`",
            TokenKind::ShrAssign => "`>>=`",
            TokenKind::AmpCaretAssign => "`&^=`",
            TokenKind::AndAnd => "`&&`",
            TokenKind::OrOr => "`||`",
            TokenKind::Arrow => "`<-`",
            TokenKind::Inc => "`++`",
            TokenKind::Dec => "`--`",
            TokenKind::EqEq => "`==`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::Assign => "`=`",
            TokenKind::Not => "`!`",
            TokenKind::NotEq => "`!=`",
            TokenKind::LtEq => "`<=`",
            TokenKind::GtEq => "`>=`",
            TokenKind::Define => "`:=`",
            TokenKind::Ellipsis => "`...`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::Comma => "`,`",
            TokenKind::Dot => "`.`",
            TokenKind::Semicolon => "`;`",
            TokenKind::Colon => "`:`",
            TokenKind::Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}
