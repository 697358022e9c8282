//! Lexer for Golite using logos with string interning.
//!
//! Produces a flat token vector terminated by `Eof`. Newlines are not tokens;
//! instead a `Semicolon` is inserted after a line's final token when that
//! token can end a statement (identifiers, literals, `return`, `)` ...), the
//! same rule the Go grammar uses.

mod escape;

use golite_ir::{Span, StringInterner, Token, TokenKind};
use logos::Logos;

pub use escape::{unescape_char, unescape_string};

/// Lexing failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {span}")]
pub struct LexError {
    pub span: Span,
    pub kind: LexErrorKind,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LexErrorKind {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence `{0}`")]
    InvalidEscape(String),
    #[error("invalid number literal `{0}`")]
    InvalidNumber(String),
    #[error("invalid rune literal `{0}`")]
    InvalidRune(String),
}

/// Raw token from logos (before interning).
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
enum RawToken {
    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    #[token("\n")]
    Newline,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&^")]
    AmpCaret,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("&=")]
    AmpAssign,
    #[token("|=")]
    PipeAssign,
    #[token("^=")]
    CaretAssign,
    #[token("<<=")]
    ShlAssign,
    #[token(">>=")]
    ShrAssign,
    #[token("&^=")]
    AmpCaretAssign,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("<-")]
    Arrow,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("==")]
    EqEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Assign,
    #[token("!")]
    Not,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token(":=")]
    Define,
    #[token("...")]
    Ellipsis,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,

    #[regex(r"0[xX][0-9a-fA-F_]+")]
    HexInt,
    #[regex(r"0[bB][01_]+")]
    BinInt,
    #[regex(r"0[oO][0-7_]+")]
    OctInt,
    #[regex(r"[0-9][0-9_]*")]
    Int,

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+")]
    Float,

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?i")]
    Imag,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r"`[^`]*`")]
    RawStr,

    #[regex(r"'(\\.[^'\n]*|[^'\\\n])'")]
    Char,

    #[regex(r"[\p{L}_][\p{L}\p{N}_]*")]
    Ident,
}

/// Lex source code into tokens, inserting statement-ending semicolons.
pub fn lex(source: &str, interner: &StringInterner) -> Result<Vec<Token>, LexError> {
    let mut tokens: Vec<Token> = Vec::with_capacity(source.len() / 4);
    let mut raw_lexer = RawToken::lexer(source);

    while let Some(result) = raw_lexer.next() {
        let span = Span::from_range(raw_lexer.span());
        let slice = raw_lexer.slice();

        let raw = match result {
            Ok(raw) => raw,
            Err(()) => return Err(unexpected(slice, span)),
        };

        match raw {
            RawToken::LineComment => {}
            RawToken::BlockComment => {
                if slice.contains('\n') {
                    insert_semicolon(&mut tokens, span);
                }
            }
            RawToken::Newline => insert_semicolon(&mut tokens, span),
            _ => {
                let kind = convert_token(raw, slice, span, interner)?;
                tokens.push(Token::new(kind, span));
            }
        }
    }

    let eof = Span::from_range(source.len()..source.len());
    insert_semicolon(&mut tokens, eof);
    tokens.push(Token::new(TokenKind::Eof, eof));
    Ok(tokens)
}

fn insert_semicolon(tokens: &mut Vec<Token>, span: Span) {
    if tokens.last().is_some_and(|t| t.kind.ends_statement()) {
        tokens.push(Token::new(TokenKind::Semicolon, span));
    }
}

fn unexpected(slice: &str, span: Span) -> LexError {
    let kind = if slice.starts_with('"') || slice.starts_with('`') {
        LexErrorKind::UnterminatedString
    } else if slice.starts_with('\'') {
        LexErrorKind::InvalidRune(slice.to_owned())
    } else {
        LexErrorKind::UnexpectedChar(slice.chars().next().unwrap_or('\0'))
    };
    LexError { span, kind }
}

fn parse_radix(digits: &str, radix: u32, slice: &str, span: Span) -> Result<u64, LexError> {
    u64::from_str_radix(&digits.replace('_', ""), radix).map_err(|_| LexError {
        span,
        kind: LexErrorKind::InvalidNumber(slice.to_owned()),
    })
}

fn parse_float(text: &str, slice: &str, span: Span) -> Result<f64, LexError> {
    text.replace('_', "").parse::<f64>().map_err(|_| LexError {
        span,
        kind: LexErrorKind::InvalidNumber(slice.to_owned()),
    })
}

/// Convert a raw token to a `TokenKind`, interning identifiers and strings.
fn convert_token(
    raw: RawToken,
    slice: &str,
    span: Span,
    interner: &StringInterner,
) -> Result<TokenKind, LexError> {
    let kind = match raw {
        RawToken::Ident => {
            TokenKind::keyword(slice).unwrap_or_else(|| TokenKind::Ident(interner.intern(slice)))
        }
        RawToken::Int => {
            // Go treats a leading zero as an octal prefix.
            if slice.len() > 1 && slice.starts_with('0') {
                TokenKind::Int(parse_radix(&slice[1..], 8, slice, span)?)
            } else {
                TokenKind::Int(parse_radix(slice, 10, slice, span)?)
            }
        }
        RawToken::HexInt => TokenKind::Int(parse_radix(&slice[2..], 16, slice, span)?),
        RawToken::BinInt => TokenKind::Int(parse_radix(&slice[2..], 2, slice, span)?),
        RawToken::OctInt => TokenKind::Int(parse_radix(&slice[2..], 8, slice, span)?),
        RawToken::Float => TokenKind::Float(parse_float(slice, slice, span)?),
        RawToken::Imag => TokenKind::Imag(parse_float(&slice[..slice.len() - 1], slice, span)?),
        RawToken::Str => {
            let body = &slice[1..slice.len() - 1];
            let text = unescape_string(body).map_err(|bad| LexError {
                span,
                kind: LexErrorKind::InvalidEscape(bad),
            })?;
            TokenKind::Str(interner.intern(&text))
        }
        RawToken::RawStr => {
            let body = slice[1..slice.len() - 1].replace('\r', "");
            TokenKind::Str(interner.intern(&body))
        }
        RawToken::Char => {
            let body = &slice[1..slice.len() - 1];
            let c = unescape_char(body).ok_or_else(|| LexError {
                span,
                kind: LexErrorKind::InvalidRune(slice.to_owned()),
            })?;
            TokenKind::Char(i64::from(u32::from(c)))
        }
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        RawToken::Amp => TokenKind::Amp,
        RawToken::Pipe => TokenKind::Pipe,
        RawToken::Caret => TokenKind::Caret,
        RawToken::Shl => TokenKind::Shl,
        RawToken::Shr => TokenKind::Shr,
        RawToken::AmpCaret => TokenKind::AmpCaret,
        RawToken::PlusAssign => TokenKind::PlusAssign,
        RawToken::MinusAssign => TokenKind::MinusAssign,
        RawToken::StarAssign => TokenKind::StarAssign,
        RawToken::SlashAssign => TokenKind::SlashAssign,
        RawToken::PercentAssign => TokenKind::PercentAssign,
        RawToken::AmpAssign => TokenKind::AmpAssign,
        RawToken::PipeAssign => TokenKind::PipeAssign,
        RawToken::CaretAssign => TokenKind::CaretAssign,
        RawToken::ShlAssign => TokenKind::ShlAssign,
        RawToken::ShrAssign => TokenKind::ShrAssign,
        RawToken::AmpCaretAssign => TokenKind::AmpCaretAssign,
        RawToken::AndAnd => TokenKind::AndAnd,
        RawToken::OrOr => TokenKind::OrOr,
        RawToken::Arrow => TokenKind::Arrow,
        RawToken::Inc => TokenKind::Inc,
        RawToken::Dec => TokenKind::Dec,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::Gt => TokenKind::Gt,
        RawToken::Assign => TokenKind::Assign,
        RawToken::Not => TokenKind::Not,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::Define => TokenKind::Define,
        RawToken::Ellipsis => TokenKind::Ellipsis,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::Colon => TokenKind::Colon,
        RawToken::LineComment | RawToken::BlockComment | RawToken::Newline => {
            unreachable!("trivia is filtered before conversion")
        }
    };
    Ok(kind)
}

#[cfg(test)]
mod tests;
