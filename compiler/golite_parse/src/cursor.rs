//! Token cursor for navigating the token stream.

use crate::ParseError;
use golite_ir::{Name, Span, Token, TokenKind};
use tracing::trace;

/// Cursor over a lexed token vector.
///
/// Invariant: the last token is always `Eof`, so `current()` never runs off
/// the end.
pub struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

static EOF: Token = Token::new(TokenKind::Eof, Span::DUMMY);

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Cursor { tokens, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&EOF)
    }

    #[inline]
    pub fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    #[inline]
    pub fn current_span(&self) -> Span {
        self.current().span
    }

    /// Kind of the token `n` positions ahead of the current one.
    pub fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    #[inline]
    pub fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1) {
            Some(i) => self.tokens.get(i).map_or(Span::DUMMY, |t| t.span),
            None => Span::DUMMY,
        }
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.current_kind() == TokenKind::Eof
    }

    #[inline]
    pub fn check(&self, kind: TokenKind) -> bool {
        self.current_kind() == kind
    }

    #[inline]
    pub fn check_ident(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Ident(_))
    }

    /// Advance and return the consumed token.
    pub fn advance(&mut self) -> Token {
        let token = *self.current();
        if !self.is_at_end() {
            self.pos += 1;
        }
        trace!(kind = ?token.kind, "advance");
        token
    }

    /// Consume the current token if it matches `kind`.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of `kind` or fail with `expected <kind>`.
    pub fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::expected(
                kind.describe(),
                self.current_kind(),
                self.current_span(),
            ))
        }
    }

    pub fn expect_ident(&mut self) -> Result<Name, ParseError> {
        if let TokenKind::Ident(name) = self.current_kind() {
            self.advance();
            Ok(name)
        } else {
            Err(ParseError::expected(
                "identifier",
                self.current_kind(),
                self.current_span(),
            ))
        }
    }

    /// Skip a balanced `{ ... }` group starting at the current `{`.
    pub fn skip_braced(&mut self) -> Result<Span, ParseError> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.current_kind() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth -= 1,
                TokenKind::Eof => {
                    return Err(ParseError::expected(
                        "`}`",
                        TokenKind::Eof,
                        self.current_span(),
                    ))
                }
                _ => {}
            }
            self.advance();
        }
        Ok(open.span.merge(self.previous_span()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind, at: u32) -> Token {
        Token::new(kind, Span::new(at, at + 1))
    }

    #[test]
    fn test_advance_stops_at_eof() {
        let tokens = [tok(TokenKind::Comma, 0), tok(TokenKind::Eof, 1)];
        let mut cursor = Cursor::new(&tokens);
        assert_eq!(cursor.advance().kind, TokenKind::Comma);
        assert!(cursor.is_at_end());
        assert_eq!(cursor.advance().kind, TokenKind::Eof);
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_skip_braced_nested() {
        let tokens = [
            tok(TokenKind::LBrace, 0),
            tok(TokenKind::LBrace, 1),
            tok(TokenKind::RBrace, 2),
            tok(TokenKind::RBrace, 3),
            tok(TokenKind::Semicolon, 4),
            tok(TokenKind::Eof, 5),
        ];
        let mut cursor = Cursor::new(&tokens);
        let span = cursor.skip_braced();
        assert_eq!(span, Ok(Span::new(0, 4)));
        assert!(cursor.check(TokenKind::Semicolon));
    }

    #[test]
    fn test_expect_reports_found_token() {
        let tokens = [tok(TokenKind::Comma, 0), tok(TokenKind::Eof, 1)];
        let mut cursor = Cursor::new(&tokens);
        let err = cursor.expect(TokenKind::LParen);
        assert_eq!(
            err.map_err(|e| e.message),
            Err("expected `(`, found `,`".to_owned())
        );
    }
}
