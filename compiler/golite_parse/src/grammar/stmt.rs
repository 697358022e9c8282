//! Statement parsing.

use crate::{ParseError, Parser};
use golite_ir::ast::{AssignOp, Block, CaseClause, Expr, ExprKind, Stmt, StmtKind};
use golite_ir::{BinaryOp, Span, TokenKind};
use golite_stack::ensure_sufficient_stack;

/// Result of a simple statement in a header position, where `range`
/// clauses are also legal.
enum Simple {
    Stmt(Stmt),
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        expr: Expr,
        span: Span,
    },
}

fn compound_op(kind: TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::PlusAssign => BinaryOp::Add,
        TokenKind::MinusAssign => BinaryOp::Sub,
        TokenKind::StarAssign => BinaryOp::Mul,
        TokenKind::SlashAssign => BinaryOp::Div,
        TokenKind::PercentAssign => BinaryOp::Rem,
        TokenKind::AmpAssign => BinaryOp::BitAnd,
        TokenKind::PipeAssign => BinaryOp::BitOr,
        TokenKind::CaretAssign => BinaryOp::BitXor,
        TokenKind::ShlAssign => BinaryOp::Shl,
        TokenKind::ShrAssign => BinaryOp::Shr,
        TokenKind::AmpCaretAssign => BinaryOp::AndNot,
        _ => return None,
    };
    Some(op)
}

impl Parser<'_> {
    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.with_composites(|p| {
            let start = p.cursor.expect(TokenKind::LBrace)?.span;
            let stmts = p.parse_stmt_list()?;
            p.cursor.expect(TokenKind::RBrace)?;
            Ok(Block {
                stmts,
                span: start.merge(p.cursor.previous_span()),
            })
        })
    }

    /// Statements up to the closing `}` or the next `case`/`default`.
    fn parse_stmt_list(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = Vec::new();
        self.skip_semicolons();
        while !matches!(
            self.cursor.current_kind(),
            TokenKind::RBrace | TokenKind::Case | TokenKind::Default | TokenKind::Eof
        ) {
            stmts.push(self.parse_stmt()?);
            self.expect_stmt_end()?;
            self.skip_semicolons();
        }
        Ok(stmts)
    }

    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        ensure_sufficient_stack(|| self.parse_stmt_inner())
    }

    fn parse_stmt_inner(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.current_span();
        let kind = match self.cursor.current_kind() {
            TokenKind::Var | TokenKind::Const | TokenKind::Type => {
                StmtKind::Decl(self.parse_gen_decl()?)
            }
            TokenKind::Go => {
                self.cursor.advance();
                StmtKind::Go(self.parse_expr()?)
            }
            TokenKind::Defer => {
                self.cursor.advance();
                StmtKind::Defer(self.parse_expr()?)
            }
            TokenKind::Return => {
                self.cursor.advance();
                if self.at_stmt_end() {
                    StmtKind::Return(Vec::new())
                } else {
                    StmtKind::Return(self.parse_expr_list()?)
                }
            }
            TokenKind::Break => {
                self.cursor.advance();
                StmtKind::Break(self.parse_optional_label())
            }
            TokenKind::Continue => {
                self.cursor.advance();
                StmtKind::Continue(self.parse_optional_label())
            }
            TokenKind::Goto => {
                self.cursor.advance();
                StmtKind::Goto(self.cursor.expect_ident()?)
            }
            TokenKind::Fallthrough => {
                self.cursor.advance();
                StmtKind::Fallthrough
            }
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::If => return self.parse_if(),
            TokenKind::Switch => return self.parse_switch(),
            TokenKind::For => return self.parse_for(),
            TokenKind::Select => {
                self.cursor.advance();
                self.cursor.skip_braced()?;
                StmtKind::Select
            }
            TokenKind::Semicolon => StmtKind::Empty,
            TokenKind::Ident(label) if self.cursor.peek_kind(1) == TokenKind::Colon => {
                self.cursor.advance();
                self.cursor.advance();
                self.skip_semicolons();
                let inner = if self.cursor.check(TokenKind::RBrace) {
                    Stmt {
                        kind: StmtKind::Empty,
                        span: self.cursor.current_span(),
                    }
                } else {
                    self.parse_stmt()?
                };
                StmtKind::Labeled(label, Box::new(inner))
            }
            _ => match self.parse_simple_stmt(false)? {
                Simple::Stmt(stmt) => return Ok(stmt),
                Simple::Range { span, .. } => {
                    return Err(ParseError::new(span, "unexpected range clause"))
                }
            },
        };
        Ok(Stmt {
            kind,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    fn at_stmt_end(&self) -> bool {
        matches!(
            self.cursor.current_kind(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        )
    }

    fn parse_optional_label(&mut self) -> Option<golite_ir::Name> {
        if let TokenKind::Ident(label) = self.cursor.current_kind() {
            self.cursor.advance();
            Some(label)
        } else {
            None
        }
    }

    /// Expression, send, inc/dec, assignment or short variable declaration.
    fn parse_simple_stmt(&mut self, allow_range: bool) -> Result<Simple, ParseError> {
        let start = self.cursor.current_span();

        if allow_range && self.cursor.eat(TokenKind::Range) {
            let expr = self.parse_expr()?;
            return Ok(Simple::Range {
                key: None,
                value: None,
                define: false,
                expr,
                span: start.merge(self.cursor.previous_span()),
            });
        }

        let mut lhs = self.parse_expr_list()?;
        let kind = match self.cursor.current_kind() {
            TokenKind::Define | TokenKind::Assign => {
                let define = self.cursor.advance().kind == TokenKind::Define;
                if allow_range && self.cursor.eat(TokenKind::Range) {
                    if lhs.len() > 2 {
                        return Err(ParseError::new(
                            start,
                            "range clause permits at most two iteration variables",
                        ));
                    }
                    let expr = self.parse_expr()?;
                    let mut vars = lhs.into_iter();
                    return Ok(Simple::Range {
                        key: vars.next(),
                        value: vars.next(),
                        define,
                        expr,
                        span: start.merge(self.cursor.previous_span()),
                    });
                }
                let rhs = self.parse_expr_list()?;
                let op = if define {
                    AssignOp::Define
                } else {
                    AssignOp::Assign
                };
                StmtKind::Assign { lhs, op, rhs }
            }
            TokenKind::Inc | TokenKind::Dec => {
                let inc = self.cursor.advance().kind == TokenKind::Inc;
                let target = self.single(&mut lhs, start)?;
                StmtKind::IncDec(target, inc)
            }
            TokenKind::Arrow => {
                self.cursor.advance();
                let channel = self.single(&mut lhs, start)?;
                StmtKind::Send(channel, self.parse_expr()?)
            }
            kind => match compound_op(kind) {
                Some(op) => {
                    self.cursor.advance();
                    let rhs = self.parse_expr_list()?;
                    StmtKind::Assign {
                        lhs,
                        op: AssignOp::Compound(op),
                        rhs,
                    }
                }
                None => StmtKind::Expr(self.single(&mut lhs, start)?),
            },
        };
        Ok(Simple::Stmt(Stmt {
            kind,
            span: start.merge(self.cursor.previous_span()),
        }))
    }

    fn single(&self, exprs: &mut Vec<Expr>, start: Span) -> Result<Expr, ParseError> {
        match (exprs.pop(), exprs.is_empty()) {
            (Some(expr), true) => Ok(expr),
            _ => Err(ParseError::expected(
                "`:=` or `=`",
                self.cursor.current_kind(),
                start.merge(self.cursor.current_span()),
            )),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.expect(TokenKind::If)?.span;
        let (init, cond) = self.without_composites(|p| {
            let first = p.parse_header_stmt()?;
            if p.cursor.eat(TokenKind::Semicolon) {
                let cond = p.parse_expr()?;
                Ok::<_, ParseError>((Some(Box::new(first)), cond))
            } else {
                Ok((None, p.header_expr(first)?))
            }
        })?;
        let then = self.parse_block()?;
        let els = if self.cursor.eat(TokenKind::Else) {
            if self.cursor.check(TokenKind::If) {
                Some(Box::new(self.parse_if()?))
            } else {
                let block = self.parse_block()?;
                let span = block.span;
                Some(Box::new(Stmt {
                    kind: StmtKind::Block(block),
                    span,
                }))
            }
        } else {
            None
        };
        Ok(Stmt {
            kind: StmtKind::If {
                init,
                cond,
                then,
                els,
            },
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// A header simple statement that cannot be a range clause.
    fn parse_header_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.parse_simple_stmt(false)? {
            Simple::Stmt(stmt) => Ok(stmt),
            Simple::Range { span, .. } => Err(ParseError::new(span, "unexpected range clause")),
        }
    }

    /// The statement in condition position must be a bare expression.
    fn header_expr(&self, stmt: Stmt) -> Result<Expr, ParseError> {
        match stmt.kind {
            StmtKind::Expr(expr) => Ok(expr),
            _ => Err(ParseError::new(
                stmt.span,
                "expected condition expression, found statement",
            )),
        }
    }

    fn parse_switch(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.expect(TokenKind::Switch)?.span;
        let (init, tag_stmt) = self.without_composites(|p| {
            if p.cursor.check(TokenKind::LBrace) {
                return Ok::<_, ParseError>((None, None));
            }
            let first = if p.cursor.check(TokenKind::Semicolon) {
                None
            } else {
                Some(p.parse_header_stmt()?)
            };
            if p.cursor.eat(TokenKind::Semicolon) {
                let tag = if p.cursor.check(TokenKind::LBrace) {
                    None
                } else {
                    Some(p.parse_header_stmt()?)
                };
                Ok((first.map(Box::new), tag))
            } else {
                Ok((None, first))
            }
        })?;

        if tag_stmt.as_ref().is_some_and(is_type_switch_guard) {
            self.cursor.skip_braced()?;
            return Ok(Stmt {
                kind: StmtKind::TypeSwitch,
                span: start.merge(self.cursor.previous_span()),
            });
        }
        let tag = tag_stmt.map(|s| self.header_expr(s)).transpose()?;

        self.cursor.expect(TokenKind::LBrace)?;
        self.skip_semicolons();
        let mut clauses = Vec::new();
        while !self.cursor.check(TokenKind::RBrace) {
            clauses.push(self.with_composites(Self::parse_case_clause)?);
        }
        self.cursor.expect(TokenKind::RBrace)?;
        Ok(Stmt {
            kind: StmtKind::Switch {
                init,
                tag,
                clauses,
            },
            span: start.merge(self.cursor.previous_span()),
        })
    }

    fn parse_case_clause(&mut self) -> Result<CaseClause, ParseError> {
        let start = self.cursor.current_span();
        let (exprs, is_default) = match self.cursor.current_kind() {
            TokenKind::Case => {
                self.cursor.advance();
                (self.parse_expr_list()?, false)
            }
            TokenKind::Default => {
                self.cursor.advance();
                (Vec::new(), true)
            }
            found => return Err(ParseError::expected("`case` or `default`", found, start)),
        };
        self.cursor.expect(TokenKind::Colon)?;
        let body = self.parse_stmt_list()?;
        Ok(CaseClause {
            exprs,
            is_default,
            body,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let start = self.cursor.expect(TokenKind::For)?.span;
        let mut init = None;
        let mut cond = None;
        let mut post = None;

        if !self.cursor.check(TokenKind::LBrace) {
            let header = self.without_composites(|p| {
                let first = if p.cursor.check(TokenKind::Semicolon) {
                    None
                } else {
                    Some(p.parse_simple_stmt(true)?)
                };
                if let Some(Simple::Range { .. }) = first {
                    return Ok::<_, ParseError>(first);
                }
                let first = first.and_then(|s| match s {
                    Simple::Stmt(stmt) => Some(stmt),
                    Simple::Range { .. } => None,
                });
                if p.cursor.eat(TokenKind::Semicolon) {
                    init = first.map(Box::new);
                    if !p.cursor.check(TokenKind::Semicolon) {
                        cond = Some(p.parse_expr()?);
                    }
                    p.cursor.expect(TokenKind::Semicolon)?;
                    if !p.cursor.check(TokenKind::LBrace) {
                        post = Some(Box::new(p.parse_header_stmt()?));
                    }
                } else if let Some(stmt) = first {
                    cond = Some(p.header_expr(stmt)?);
                }
                Ok(None)
            })?;

            if let Some(Simple::Range {
                key,
                value,
                define,
                expr,
                ..
            }) = header
            {
                let body = self.parse_block()?;
                return Ok(Stmt {
                    kind: StmtKind::Range {
                        key,
                        value,
                        define,
                        expr,
                        body,
                    },
                    span: start.merge(self.cursor.previous_span()),
                });
            }
        }

        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::For {
                init,
                cond,
                post,
                body,
            },
            span: start.merge(self.cursor.previous_span()),
        })
    }
}

/// `x := v.(type)` or `v.(type)`.
fn is_type_switch_guard(stmt: &Stmt) -> bool {
    let is_guard = |e: &Expr| matches!(e.kind, ExprKind::TypeAssert(_, None));
    match &stmt.kind {
        StmtKind::Expr(e) => is_guard(e),
        StmtKind::Assign {
            op: AssignOp::Define,
            rhs,
            ..
        } => rhs.len() == 1 && rhs.iter().all(is_guard),
        _ => false,
    }
}
