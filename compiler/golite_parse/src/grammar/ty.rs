//! Type syntax and function signatures.

use crate::{ParseError, Parser};
use golite_ir::ast::{FieldDecl, FuncType, Param, TypeExpr, TypeExprKind};
use golite_ir::{Name, TokenKind};
use golite_stack::ensure_sufficient_stack;

/// One entry of a parameter list before grouping is resolved.
struct RawParam {
    name: Option<Name>,
    ty: Option<TypeExpr>,
    variadic: bool,
}

impl Parser<'_> {
    /// Whether the current token can begin a type.
    pub(crate) fn at_type_start(&self) -> bool {
        matches!(
            self.cursor.current_kind(),
            TokenKind::Ident(_)
                | TokenKind::Star
                | TokenKind::LBracket
                | TokenKind::LParen
                | TokenKind::Map
                | TokenKind::Chan
                | TokenKind::Arrow
                | TokenKind::Func
                | TokenKind::Struct
                | TokenKind::Interface
        )
    }

    pub(crate) fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        ensure_sufficient_stack(|| self.parse_type_inner())
    }

    fn parse_type_inner(&mut self) -> Result<TypeExpr, ParseError> {
        let start = self.cursor.current_span();
        let kind = match self.cursor.current_kind() {
            TokenKind::Ident(name) => {
                self.cursor.advance();
                if self.cursor.eat(TokenKind::Dot) {
                    TypeExprKind::Qualified(name, self.cursor.expect_ident()?)
                } else {
                    TypeExprKind::Named(name)
                }
            }
            TokenKind::Star => {
                self.cursor.advance();
                TypeExprKind::Pointer(Box::new(self.parse_type()?))
            }
            TokenKind::LParen => {
                self.cursor.advance();
                let inner = self.parse_type()?;
                self.cursor.expect(TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::LBracket => self.parse_bracket_type()?,
            TokenKind::Map => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::LBracket)?;
                let key = self.parse_type()?;
                self.cursor.expect(TokenKind::RBracket)?;
                let value = self.parse_type()?;
                TypeExprKind::Map(Box::new(key), Box::new(value))
            }
            TokenKind::Chan => {
                self.cursor.advance();
                self.cursor.eat(TokenKind::Arrow);
                TypeExprKind::Chan(Box::new(self.parse_type()?))
            }
            TokenKind::Arrow => {
                self.cursor.advance();
                self.cursor.expect(TokenKind::Chan)?;
                TypeExprKind::Chan(Box::new(self.parse_type()?))
            }
            TokenKind::Func => {
                self.cursor.advance();
                TypeExprKind::Func(Box::new(self.parse_signature()?))
            }
            TokenKind::Struct => TypeExprKind::Struct(self.parse_struct_fields()?),
            TokenKind::Interface => TypeExprKind::Interface(self.parse_interface_methods()?),
            found => return Err(ParseError::expected("type", found, start)),
        };
        Ok(TypeExpr {
            kind,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// `[]T`, `[N]T` or `[...]T`, starting at `[`.
    pub(crate) fn parse_bracket_type(&mut self) -> Result<TypeExprKind, ParseError> {
        self.cursor.expect(TokenKind::LBracket)?;
        if self.cursor.eat(TokenKind::RBracket) {
            return Ok(TypeExprKind::Slice(Box::new(self.parse_type()?)));
        }
        let len = if self.cursor.eat(TokenKind::Ellipsis) {
            None
        } else {
            Some(Box::new(self.with_composites(Self::parse_expr)?))
        };
        self.cursor.expect(TokenKind::RBracket)?;
        Ok(TypeExprKind::Array(len, Box::new(self.parse_type()?)))
    }

    fn parse_struct_fields(&mut self) -> Result<Vec<FieldDecl>, ParseError> {
        self.cursor.expect(TokenKind::Struct)?;
        self.cursor.expect(TokenKind::LBrace)?;
        self.skip_semicolons();
        let mut fields = Vec::new();
        while !self.cursor.check(TokenKind::RBrace) {
            let start = self.cursor.current_span();
            let embedded = matches!(
                (self.cursor.current_kind(), self.cursor.peek_kind(1)),
                (TokenKind::Star, _)
                    | (
                        TokenKind::Ident(_),
                        TokenKind::Semicolon
                            | TokenKind::RBrace
                            | TokenKind::Dot
                            | TokenKind::Str(_)
                    )
            );
            if embedded {
                let ty = self.parse_type()?;
                let name = embedded_field_name(&ty).ok_or_else(|| {
                    ParseError::new(start, "embedded field must be a type name")
                })?;
                fields.push(FieldDecl {
                    name,
                    ty,
                    embedded: true,
                });
            } else {
                let names = self.parse_ident_list()?;
                let ty = self.parse_type()?;
                for name in names {
                    fields.push(FieldDecl {
                        name,
                        ty: ty.clone(),
                        embedded: false,
                    });
                }
            }
            // Field tags are accepted and ignored.
            if matches!(self.cursor.current_kind(), TokenKind::Str(_)) {
                self.cursor.advance();
            }
            self.expect_stmt_end()?;
            self.skip_semicolons();
        }
        self.cursor.expect(TokenKind::RBrace)?;
        Ok(fields)
    }

    fn parse_interface_methods(&mut self) -> Result<Vec<Name>, ParseError> {
        self.cursor.expect(TokenKind::Interface)?;
        self.cursor.expect(TokenKind::LBrace)?;
        self.skip_semicolons();
        let mut methods = Vec::new();
        while !self.cursor.check(TokenKind::RBrace) {
            let name = self.cursor.expect_ident()?;
            if self.cursor.check(TokenKind::LParen) {
                self.parse_signature()?;
                methods.push(name);
            } else if self.cursor.eat(TokenKind::Dot) {
                // Embedded qualified interface.
                self.cursor.expect_ident()?;
            }
            self.expect_stmt_end()?;
            self.skip_semicolons();
        }
        self.cursor.expect(TokenKind::RBrace)?;
        Ok(methods)
    }

    /// Parameters and results: `(a, b int, xs ...string) (int, error)`.
    pub(crate) fn parse_signature(&mut self) -> Result<FuncType, ParseError> {
        let (params, variadic) = self.parse_params()?;
        let results = if self.cursor.check(TokenKind::LParen) {
            self.parse_params()?.0
        } else if self.at_type_start() {
            vec![Param {
                name: None,
                ty: self.parse_type()?,
            }]
        } else {
            Vec::new()
        };
        Ok(FuncType {
            params,
            results,
            variadic,
        })
    }

    /// A parenthesised parameter list.
    ///
    /// Either every entry is named (`a, b int`) or none is (`int, string`);
    /// which form applies is only known once the whole list is read.
    fn parse_params(&mut self) -> Result<(Vec<Param>, bool), ParseError> {
        self.cursor.expect(TokenKind::LParen)?;
        let mut raw = Vec::new();
        while !self.cursor.check(TokenKind::RParen) {
            raw.push(self.parse_raw_param()?);
            if !self.cursor.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = self.cursor.expect(TokenKind::RParen)?.span;
        let variadic = raw.last().is_some_and(|p| p.variadic);
        if raw.iter().any(|p| p.variadic) && !variadic {
            return Err(ParseError::new(
                close,
                "can only use ... with final parameter in list",
            ));
        }

        let named = raw.iter().any(|p| p.name.is_some() && p.ty.is_some());
        let mut params = Vec::with_capacity(raw.len());
        if named {
            // Names without a type take the next entry's type.
            let mut pending: Vec<Name> = Vec::new();
            for p in raw {
                let name = p
                    .name
                    .ok_or_else(|| ParseError::new(close, "mixed named and unnamed parameters"))?;
                match p.ty {
                    None => pending.push(name),
                    Some(ty) => {
                        for earlier in pending.drain(..) {
                            params.push(Param {
                                name: Some(earlier),
                                ty: ty.clone(),
                            });
                        }
                        params.push(Param {
                            name: Some(name),
                            ty,
                        });
                    }
                }
            }
            if !pending.is_empty() {
                return Err(ParseError::new(close, "mixed named and unnamed parameters"));
            }
        } else {
            for p in raw {
                let ty = match (p.ty, p.name) {
                    (Some(ty), _) => ty,
                    (None, Some(name)) => TypeExpr {
                        kind: TypeExprKind::Named(name),
                        span: close,
                    },
                    (None, None) => return Err(ParseError::new(close, "missing parameter type")),
                };
                params.push(Param { name: None, ty });
            }
        }
        Ok((params, variadic))
    }

    fn parse_raw_param(&mut self) -> Result<RawParam, ParseError> {
        if let TokenKind::Ident(name) = self.cursor.current_kind() {
            match self.cursor.peek_kind(1) {
                // Lone name or type: resolved by the caller.
                TokenKind::Comma | TokenKind::RParen => {
                    self.cursor.advance();
                    return Ok(RawParam {
                        name: Some(name),
                        ty: None,
                        variadic: false,
                    });
                }
                // Qualified type name.
                TokenKind::Dot => {}
                _ => {
                    self.cursor.advance();
                    let variadic = self.cursor.eat(TokenKind::Ellipsis);
                    let ty = self.parse_type()?;
                    return Ok(RawParam {
                        name: Some(name),
                        ty: Some(ty),
                        variadic,
                    });
                }
            }
        }
        let variadic = self.cursor.eat(TokenKind::Ellipsis);
        let ty = self.parse_type()?;
        Ok(RawParam {
            name: None,
            ty: Some(ty),
            variadic,
        })
    }
}

fn embedded_field_name(ty: &TypeExpr) -> Option<Name> {
    match &ty.kind {
        TypeExprKind::Named(name) | TypeExprKind::Qualified(_, name) => Some(*name),
        TypeExprKind::Pointer(inner) => embedded_field_name(inner),
        _ => None,
    }
}
