//! Expression parsing: precedence climbing over unary and postfix forms.

use crate::{ParseError, Parser};
use golite_ir::ast::{Element, Expr, ExprKind, TypeExpr, TypeExprKind};
use golite_ir::{BinaryOp, Span, TokenKind, UnaryOp};
use golite_stack::ensure_sufficient_stack;
use tracing::trace;

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::OrOr => BinaryOp::Or,
        TokenKind::AndAnd => BinaryOp::And,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::Amp => BinaryOp::BitAnd,
        TokenKind::AmpCaret => BinaryOp::AndNot,
        _ => return None,
    };
    Some(op)
}

impl Parser<'_> {
    /// Parse an expression.
    ///
    /// Uses `ensure_sufficient_stack` so deeply nested input grows the stack
    /// instead of overflowing it.
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        ensure_sufficient_stack(|| self.parse_binary(1))
    }

    pub(crate) fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.cursor.eat(TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = binary_op(self.cursor.current_kind()) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.cursor.advance();
            let right = self.parse_binary(prec + 1)?;
            let span = left.span.merge(right.span);
            left = Expr::new(ExprKind::Binary(op, Box::new(left), Box::new(right)), span);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.cursor.current_span();
        let op = match self.cursor.current_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Caret => UnaryOp::BitNot,
            TokenKind::Amp => UnaryOp::Addr,
            TokenKind::Arrow if self.cursor.peek_kind(1) != TokenKind::Chan => UnaryOp::Recv,
            TokenKind::Star => {
                self.cursor.advance();
                let operand = ensure_sufficient_stack(|| self.parse_unary())?;
                let span = start.merge(operand.span);
                return Ok(Expr::new(ExprKind::Star(Box::new(operand)), span));
            }
            _ => return self.parse_primary(),
        };
        self.cursor.advance();
        let operand = ensure_sufficient_stack(|| self.parse_unary())?;
        let span = start.merge(operand.span);
        Ok(Expr::new(ExprKind::Unary(op, Box::new(operand)), span))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_operand()?;
        loop {
            expr = match self.cursor.current_kind() {
                TokenKind::Dot => self.parse_selector_or_assert(expr)?,
                TokenKind::LBracket => self.with_composites(|p| p.parse_index_or_slice(expr))?,
                TokenKind::LParen => self.with_composites(|p| p.parse_call(expr))?,
                TokenKind::LBrace if self.composite_allowed(&expr) => {
                    let ty = expr_to_type(&expr);
                    self.parse_composite(ty, expr.span)?
                }
                _ => break,
            };
        }
        Ok(expr)
    }

    /// `T {` starts a composite literal when `T` looks like a type.
    ///
    /// Plain and qualified names are excluded inside statement headers so
    /// that `if x {` opens the block.
    fn composite_allowed(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Type(_) => true,
            ExprKind::Ident(_) => !self.no_composite,
            ExprKind::Selector(base, _) => {
                !self.no_composite && matches!(base.kind, ExprKind::Ident(_))
            }
            _ => false,
        }
    }

    fn parse_operand(&mut self) -> Result<Expr, ParseError> {
        let start = self.cursor.current_span();
        let kind = match self.cursor.current_kind() {
            TokenKind::Ident(name) => {
                self.cursor.advance();
                ExprKind::Ident(name)
            }
            TokenKind::Int(v) => {
                self.cursor.advance();
                ExprKind::Int(v)
            }
            TokenKind::Float(v) => {
                self.cursor.advance();
                ExprKind::Float(v)
            }
            TokenKind::Imag(v) => {
                self.cursor.advance();
                ExprKind::Imag(v)
            }
            TokenKind::Char(v) => {
                self.cursor.advance();
                ExprKind::Char(v)
            }
            TokenKind::Str(name) => {
                self.cursor.advance();
                ExprKind::Str(name)
            }
            TokenKind::LParen => {
                self.cursor.advance();
                let inner = self.with_composites(Self::parse_expr)?;
                self.cursor.expect(TokenKind::RParen)?;
                ExprKind::Paren(Box::new(inner))
            }
            TokenKind::Func => {
                self.cursor.advance();
                let sig = self.parse_signature()?;
                if self.cursor.check(TokenKind::LBrace) {
                    let body = self.with_composites(Self::parse_block)?;
                    ExprKind::FuncLit { sig, body }
                } else {
                    ExprKind::Type(TypeExpr {
                        kind: TypeExprKind::Func(Box::new(sig)),
                        span: start.merge(self.cursor.previous_span()),
                    })
                }
            }
            TokenKind::LBracket
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Struct
            | TokenKind::Interface
            | TokenKind::Arrow => ExprKind::Type(self.parse_type()?),
            found => return Err(ParseError::expected("expression", found, start)),
        };
        Ok(Expr::new(kind, start.merge(self.cursor.previous_span())))
    }

    /// `.name`, `.(T)` or `.(type)`.
    fn parse_selector_or_assert(&mut self, base: Expr) -> Result<Expr, ParseError> {
        self.cursor.expect(TokenKind::Dot)?;
        if self.cursor.eat(TokenKind::LParen) {
            let ty = if self.cursor.eat(TokenKind::Type) {
                None
            } else {
                Some(self.parse_type()?)
            };
            self.cursor.expect(TokenKind::RParen)?;
            let span = base.span.merge(self.cursor.previous_span());
            return Ok(Expr::new(ExprKind::TypeAssert(Box::new(base), ty), span));
        }
        let name = self.cursor.expect_ident()?;
        let span = base.span.merge(self.cursor.previous_span());
        Ok(Expr::new(ExprKind::Selector(Box::new(base), name), span))
    }

    /// `[i]`, `[a:b]`, `[a:]`, `[:b]` or `[:]`.
    fn parse_index_or_slice(&mut self, base: Expr) -> Result<Expr, ParseError> {
        let start = base.span;
        self.cursor.expect(TokenKind::LBracket)?;
        let low = if self.cursor.check(TokenKind::Colon) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let kind = if self.cursor.eat(TokenKind::Colon) {
            let high = if self.cursor.check(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            if self.cursor.check(TokenKind::Colon) {
                return Err(ParseError::new(
                    self.cursor.current_span(),
                    "3-index slices are not supported",
                ));
            }
            ExprKind::Slice {
                base: Box::new(base),
                low,
                high,
            }
        } else {
            let index = low.ok_or_else(|| {
                ParseError::expected("index", TokenKind::RBracket, self.cursor.current_span())
            })?;
            ExprKind::Index(Box::new(base), index)
        };
        self.cursor.expect(TokenKind::RBracket)?;
        Ok(Expr::new(kind, start.merge(self.cursor.previous_span())))
    }

    fn parse_call(&mut self, func: Expr) -> Result<Expr, ParseError> {
        self.cursor.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        let mut spread = false;
        while !self.cursor.check(TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if self.cursor.eat(TokenKind::Ellipsis) {
                spread = true;
                self.cursor.eat(TokenKind::Comma);
                break;
            }
            if !self.cursor.eat(TokenKind::Comma) {
                break;
            }
        }
        self.cursor.expect(TokenKind::RParen)?;
        let span = func.span.merge(self.cursor.previous_span());
        trace!(args = args.len(), spread, "parsed call");
        Ok(Expr::new(
            ExprKind::Call {
                func: Box::new(func),
                args,
                spread,
            },
            span,
        ))
    }

    /// `{ elem, key: elem, ... }` following a type (or elided inside another
    /// composite literal when `ty` is `None`).
    fn parse_composite(&mut self, ty: Option<TypeExpr>, start: Span) -> Result<Expr, ParseError> {
        self.cursor.expect(TokenKind::LBrace)?;
        let elems = self.with_composites(|p| {
            let mut elems = Vec::new();
            p.skip_semicolons();
            while !p.cursor.check(TokenKind::RBrace) {
                let first = p.parse_element_value()?;
                let elem = if p.cursor.eat(TokenKind::Colon) {
                    Element {
                        key: Some(first),
                        value: p.parse_element_value()?,
                    }
                } else {
                    Element {
                        key: None,
                        value: first,
                    }
                };
                elems.push(elem);
                if !p.cursor.eat(TokenKind::Comma) {
                    break;
                }
                p.skip_semicolons();
            }
            p.skip_semicolons();
            Ok::<_, ParseError>(elems)
        })?;
        self.cursor.expect(TokenKind::RBrace)?;
        Ok(Expr::new(
            ExprKind::Composite { ty, elems },
            start.merge(self.cursor.previous_span()),
        ))
    }

    fn parse_element_value(&mut self) -> Result<Expr, ParseError> {
        if self.cursor.check(TokenKind::LBrace) {
            let start = self.cursor.current_span();
            self.parse_composite(None, start)
        } else {
            self.parse_expr()
        }
    }
}

/// Reinterpret an expression that precedes `{` as a type.
fn expr_to_type(expr: &Expr) -> Option<TypeExpr> {
    let kind = match &expr.kind {
        ExprKind::Type(ty) => return Some(ty.clone()),
        ExprKind::Ident(name) => TypeExprKind::Named(*name),
        ExprKind::Selector(base, name) => match base.kind {
            ExprKind::Ident(pkg) => TypeExprKind::Qualified(pkg, *name),
            _ => return None,
        },
        _ => return None,
    };
    Some(TypeExpr {
        kind,
        span: expr.span,
    })
}
