//! Recursive descent parser for Golite.
//!
//! Turns the lexer's token vector into an owned [`ast::File`]. The same entry
//! point serves whole program files and embedding snippets: top-level
//! statements are accepted alongside declarations and become
//! [`ast::Item::Stmt`].
//!
//! Constructs the engine cannot run (`go`, `select`, type switches, channel
//! sends) are still parsed so the compiler can reject them with a precise
//! message.

mod cursor;
mod error;
mod grammar;

pub use cursor::Cursor;
pub use error::ParseError;

use golite_ir::{ast, StringInterner, Token};

/// Parser state.
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    interner: &'a StringInterner,
    /// Set while parsing `if`/`for`/`switch` headers, where `T {` opens the
    /// statement body rather than a composite literal.
    no_composite: bool,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], interner: &'a StringInterner) -> Self {
        Parser {
            cursor: Cursor::new(tokens),
            interner,
            no_composite: false,
        }
    }

    /// Run `f` with composite literals permitted (inside parens, brackets,
    /// call arguments and function bodies).
    fn with_composites<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.no_composite, false);
        let out = f(self);
        self.no_composite = saved;
        out
    }

    /// Run `f` with composite literals after plain type names disabled.
    fn without_composites<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.no_composite, true);
        let out = f(self);
        self.no_composite = saved;
        out
    }
}

/// Parse a token stream into a file.
pub fn parse(tokens: &[Token], interner: &StringInterner) -> Result<ast::File, ParseError> {
    Parser::new(tokens, interner).parse_file()
}

/// Lex and parse source text.
pub fn parse_source(source: &str, interner: &StringInterner) -> Result<ast::File, ParseError> {
    let tokens = golite_lexer::lex(source, interner)?;
    parse(&tokens, interner)
}

#[cfg(test)]
mod tests;
