//! Grammar productions, split by syntactic category.
//!
//! - `mod.rs`: files, imports, function declarations, `var`/`const`/`type`
//! - `stmt.rs`: statements and blocks
//! - `expr.rs`: expressions and composite literals
//! - `ty.rs`: type syntax and signatures

mod expr;
mod stmt;
mod ty;

use crate::{ParseError, Parser};
use golite_ir::ast::{File, FuncDecl, GenDecl, Import, Item, Receiver, TypeSpec, ValueSpec};
use golite_ir::TokenKind;
use tracing::debug;

impl Parser<'_> {
    /// Parse a whole compilation unit.
    pub fn parse_file(&mut self) -> Result<File, ParseError> {
        let mut file = File::default();
        self.skip_semicolons();

        if self.cursor.eat(TokenKind::Package) {
            file.package = Some(self.cursor.expect_ident()?);
            self.expect_stmt_end()?;
            self.skip_semicolons();
        }

        while self.cursor.check(TokenKind::Import) {
            self.parse_import(&mut file.imports)?;
            self.expect_stmt_end()?;
            self.skip_semicolons();
        }

        while !self.cursor.is_at_end() {
            let item = if self.at_func_decl() {
                Item::Func(self.parse_func_decl()?)
            } else {
                Item::Stmt(self.parse_stmt()?)
            };
            file.items.push(item);
            self.expect_stmt_end()?;
            self.skip_semicolons();
        }

        debug!(items = file.items.len(), "parsed file");
        Ok(file)
    }

    fn skip_semicolons(&mut self) {
        while self.cursor.eat(TokenKind::Semicolon) {}
    }

    /// A statement ends with `;`, or directly before `}`, `)` or end of input.
    fn expect_stmt_end(&mut self) -> Result<(), ParseError> {
        if self.cursor.eat(TokenKind::Semicolon) {
            return Ok(());
        }
        match self.cursor.current_kind() {
            TokenKind::RBrace | TokenKind::RParen | TokenKind::Eof => Ok(()),
            found => Err(ParseError::expected(
                "`;` or newline",
                found,
                self.cursor.current_span(),
            )),
        }
    }

    fn parse_import(&mut self, imports: &mut Vec<Import>) -> Result<(), ParseError> {
        self.cursor.expect(TokenKind::Import)?;
        if self.cursor.eat(TokenKind::LParen) {
            self.skip_semicolons();
            while !self.cursor.check(TokenKind::RParen) {
                imports.push(self.parse_import_spec()?);
                self.expect_stmt_end()?;
                self.skip_semicolons();
            }
            self.cursor.expect(TokenKind::RParen)?;
        } else {
            imports.push(self.parse_import_spec()?);
        }
        Ok(())
    }

    fn parse_import_spec(&mut self) -> Result<Import, ParseError> {
        let start = self.cursor.current_span();
        let alias = match self.cursor.current_kind() {
            TokenKind::Ident(name) => {
                self.cursor.advance();
                Some(name)
            }
            TokenKind::Dot => {
                self.cursor.advance();
                None
            }
            _ => None,
        };
        match self.cursor.current_kind() {
            TokenKind::Str(path) => {
                self.cursor.advance();
                Ok(Import {
                    alias,
                    path,
                    span: start.merge(self.cursor.previous_span()),
                })
            }
            found => Err(ParseError::expected(
                "import path",
                found,
                self.cursor.current_span(),
            )),
        }
    }

    /// `func Name(` or `func (recv) Name(`, as opposed to a function literal
    /// used in statement position.
    fn at_func_decl(&self) -> bool {
        if !self.cursor.check(TokenKind::Func) {
            return false;
        }
        match self.cursor.peek_kind(1) {
            TokenKind::Ident(_) => true,
            TokenKind::LParen => {
                let mut depth = 0usize;
                let mut n = 1;
                loop {
                    match self.cursor.peek_kind(n) {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                    n += 1;
                }
                matches!(self.cursor.peek_kind(n + 1), TokenKind::Ident(_))
                    && self.cursor.peek_kind(n + 2) == TokenKind::LParen
            }
            _ => false,
        }
    }

    fn parse_func_decl(&mut self) -> Result<FuncDecl, ParseError> {
        let start = self.cursor.expect(TokenKind::Func)?.span;
        let recv = if self.cursor.check(TokenKind::LParen) {
            Some(self.parse_receiver()?)
        } else {
            None
        };
        let name = self.cursor.expect_ident()?;
        let sig = self.parse_signature()?;
        let body = self.with_composites(Self::parse_block)?;
        Ok(FuncDecl {
            name,
            recv,
            sig,
            body,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// `(p *T)`, `(p T)`, `(*T)` or `(T)`.
    fn parse_receiver(&mut self) -> Result<Receiver, ParseError> {
        let start = self.cursor.expect(TokenKind::LParen)?.span;
        let name = match (self.cursor.current_kind(), self.cursor.peek_kind(1)) {
            (TokenKind::Ident(name), TokenKind::Ident(_) | TokenKind::Star) => {
                self.cursor.advance();
                Some(name)
            }
            _ => None,
        };
        let pointer = self.cursor.eat(TokenKind::Star);
        let type_name = self.cursor.expect_ident()?;
        self.cursor.expect(TokenKind::RParen)?;
        Ok(Receiver {
            name,
            type_name,
            pointer,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// `var`, `const` or `type` declaration, single or grouped.
    fn parse_gen_decl(&mut self) -> Result<GenDecl, ParseError> {
        match self.cursor.advance().kind {
            TokenKind::Var => Ok(GenDecl::Var(
                self.parse_group(|p, _| p.parse_var_spec())?,
            )),
            TokenKind::Const => {
                let mut prev: Option<ValueSpec> = None;
                let specs = self.parse_group(|p, iota| {
                    let spec = p.parse_const_spec(iota, prev.as_ref())?;
                    prev = Some(spec.clone());
                    Ok(spec)
                })?;
                Ok(GenDecl::Const(specs))
            }
            TokenKind::Type => Ok(GenDecl::Type(
                self.parse_group(|p, _| p.parse_type_spec())?,
            )),
            found => Err(ParseError::expected(
                "declaration",
                found,
                self.cursor.previous_span(),
            )),
        }
    }

    /// One spec, or a parenthesised list of specs separated by `;`.
    ///
    /// The callback receives the spec's position within the group.
    fn parse_group<T>(
        &mut self,
        mut spec: impl FnMut(&mut Self, i64) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        if !self.cursor.eat(TokenKind::LParen) {
            return Ok(vec![spec(self, 0)?]);
        }
        let mut specs = Vec::new();
        self.skip_semicolons();
        let mut index = 0;
        while !self.cursor.check(TokenKind::RParen) {
            specs.push(spec(self, index)?);
            index += 1;
            self.expect_stmt_end()?;
            self.skip_semicolons();
        }
        self.cursor.expect(TokenKind::RParen)?;
        Ok(specs)
    }

    fn parse_ident_list(&mut self) -> Result<Vec<golite_ir::Name>, ParseError> {
        let mut names = vec![self.cursor.expect_ident()?];
        while self.cursor.eat(TokenKind::Comma) {
            names.push(self.cursor.expect_ident()?);
        }
        Ok(names)
    }

    fn parse_var_spec(&mut self) -> Result<ValueSpec, ParseError> {
        let start = self.cursor.current_span();
        let names = self.parse_ident_list()?;
        let ty = if self.cursor.check(TokenKind::Assign) {
            None
        } else {
            Some(self.parse_type()?)
        };
        let values = if self.cursor.eat(TokenKind::Assign) {
            self.parse_expr_list()?
        } else {
            Vec::new()
        };
        Ok(ValueSpec {
            names,
            ty,
            values,
            iota: 0,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// A `const` spec; a spec without values repeats the previous one's
    /// type and expressions with its own `iota`.
    fn parse_const_spec(
        &mut self,
        iota: i64,
        prev: Option<&ValueSpec>,
    ) -> Result<ValueSpec, ParseError> {
        let start = self.cursor.current_span();
        let names = self.parse_ident_list()?;
        let (ty, values) = if self.at_value_spec_end() {
            match prev {
                Some(prev) => (prev.ty.clone(), prev.values.clone()),
                None => {
                    return Err(ParseError::new(
                        start,
                        "missing init expr for const declaration",
                    ))
                }
            }
        } else {
            let ty = if self.cursor.check(TokenKind::Assign) {
                None
            } else {
                Some(self.parse_type()?)
            };
            self.cursor.expect(TokenKind::Assign)?;
            (ty, self.parse_expr_list()?)
        };
        Ok(ValueSpec {
            names,
            ty,
            values,
            iota,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    fn at_value_spec_end(&self) -> bool {
        matches!(
            self.cursor.current_kind(),
            TokenKind::Semicolon | TokenKind::RParen | TokenKind::Eof
        )
    }

    fn parse_type_spec(&mut self) -> Result<TypeSpec, ParseError> {
        let start = self.cursor.current_span();
        let name = self.cursor.expect_ident()?;
        let alias = self.cursor.eat(TokenKind::Assign);
        let ty = self.parse_type()?;
        Ok(TypeSpec {
            name,
            ty,
            alias,
            span: start.merge(self.cursor.previous_span()),
        })
    }
}
