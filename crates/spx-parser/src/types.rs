//! Type expression and signature parsing

use super::*;

/// One entry of a parameter list before names are grouped with types
enum ParamEntry {
    Named {
        name: Node<Ident>,
        ty: Node<TypeExpr>,
        variadic: bool,
    },
    Unnamed {
        ty: Node<TypeExpr>,
        variadic: bool,
    },
}

impl Parser {
    pub(crate) fn parse_type(&mut self) -> ParseResult<Node<TypeExpr>> {
        let start = self.current_token().span;

        let ty = match self.current_token().kind {
            TokenKind::Identifier => {
                let name = self.parse_identifier()?;
                if self.check(&TokenKind::Dot) && self.peek_kind(1) == Some(&TokenKind::Identifier) {
                    self.advance();
                    let member = self.parse_identifier()?;
                    TypeExpr::Qualified { pkg: name, name: member }
                } else {
                    return Ok(Node::new(name.id, TypeExpr::Name(name.value), name.span));
                }
            }
            TokenKind::Star => {
                self.advance();
                TypeExpr::Pointer(Box::new(self.parse_type()?))
            }
            TokenKind::LBracket => {
                self.advance();
                self.consume(TokenKind::RBracket)?;
                TypeExpr::Slice(Box::new(self.parse_type()?))
            }
            TokenKind::Map => {
                self.advance();
                self.consume(TokenKind::LBracket)?;
                let key = self.parse_type()?;
                self.consume(TokenKind::RBracket)?;
                let value = self.parse_type()?;
                TypeExpr::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                }
            }
            TokenKind::Func => {
                self.advance();
                TypeExpr::Func(self.parse_signature()?.value)
            }
            TokenKind::Struct => TypeExpr::Struct(self.parse_struct_fields()?),
            TokenKind::Interface => TypeExpr::Interface(self.parse_interface_methods()?),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_type()?;
                self.consume(TokenKind::RParen)?;
                return Ok(inner);
            }
            _ => return Err(self.error_expected("type")),
        };

        let span = self.span_from(start);
        Ok(self.node(ty, span))
    }

    /// Parameters and optional results: `(a, b int) (string, error)`
    pub(crate) fn parse_signature(&mut self) -> ParseResult<Node<FuncSig>> {
        let start = self.current_token().span;
        let params = self.parse_parameters()?;
        let results = if self.check(&TokenKind::LParen) {
            self.parse_parameters()?
        } else if self.starts_type() {
            let ty = self.parse_type()?;
            let span = ty.span;
            vec![self.node(
                Param {
                    names: Vec::new(),
                    ty,
                    variadic: false,
                },
                span,
            )]
        } else {
            Vec::new()
        };
        let span = self.span_from(start);
        Ok(self.node(FuncSig { params, results }, span))
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<Node<Param>>> {
        let open = self.consume(TokenKind::LParen)?.span;

        let mut entries = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            entries.push(self.parse_param_entry()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.consume(TokenKind::RParen)?;

        self.group_params(entries, open)
    }

    fn parse_param_entry(&mut self) -> ParseResult<ParamEntry> {
        let named = self.check(&TokenKind::Identifier)
            && matches!(
                self.peek_kind(1),
                Some(TokenKind::Identifier)
                    | Some(TokenKind::Star)
                    | Some(TokenKind::LBracket)
                    | Some(TokenKind::Map)
                    | Some(TokenKind::Func)
                    | Some(TokenKind::Struct)
                    | Some(TokenKind::Interface)
                    | Some(TokenKind::Ellipsis)
            );

        let name = if named { Some(self.parse_identifier()?) } else { None };
        let variadic = if self.check(&TokenKind::Ellipsis) {
            self.advance();
            true
        } else {
            false
        };
        let ty = self.parse_type()?;

        Ok(match name {
            Some(name) => ParamEntry::Named { name, ty, variadic },
            None => ParamEntry::Unnamed { ty, variadic },
        })
    }

    /// Folds `a, b int` into one group; a list is either all named or all unnamed
    fn group_params(&mut self, entries: Vec<ParamEntry>, open: Span) -> ParseResult<Vec<Node<Param>>> {
        let any_named = entries.iter().any(|e| matches!(e, ParamEntry::Named { .. }));
        let mut params = Vec::new();

        if !any_named {
            for entry in entries {
                if let ParamEntry::Unnamed { ty, variadic } = entry {
                    let span = ty.span;
                    params.push(self.node(
                        Param {
                            names: Vec::new(),
                            ty,
                            variadic,
                        },
                        span,
                    ));
                }
            }
            return Ok(params);
        }

        let mut pending: Vec<Node<Ident>> = Vec::new();
        for entry in entries {
            match entry {
                ParamEntry::Unnamed { ty, variadic: false } => match ty.value {
                    TypeExpr::Name(ident) => pending.push(Node::new(ty.id, ident, ty.span)),
                    _ => return Err(ParseError::new("mixed named and unnamed parameters", ty.span)),
                },
                ParamEntry::Unnamed { ty, .. } => {
                    return Err(ParseError::new("mixed named and unnamed parameters", ty.span));
                }
                ParamEntry::Named { name, ty, variadic } => {
                    let start = pending.first().map(|n| n.span).unwrap_or(name.span);
                    let span = start.merge(&ty.span);
                    let mut names = std::mem::take(&mut pending);
                    names.push(name);
                    params.push(self.node(Param { names, ty, variadic }, span));
                }
            }
        }
        if let Some(dangling) = pending.first() {
            return Err(ParseError::new("mixed named and unnamed parameters", dangling.span.merge(&open)));
        }
        Ok(params)
    }

    fn parse_struct_fields(&mut self) -> ParseResult<Vec<Node<FieldDecl>>> {
        self.consume(TokenKind::Struct)?;
        self.consume(TokenKind::LBrace)?;

        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            let start = self.current_token().span;
            let embedded = self.check(&TokenKind::Star)
                || (self.check(&TokenKind::Identifier)
                    && matches!(
                        self.peek_kind(1),
                        Some(TokenKind::Semicolon) | Some(TokenKind::RBrace) | Some(TokenKind::Dot)
                    ));
            let field = if embedded {
                FieldDecl {
                    names: Vec::new(),
                    ty: self.parse_type()?,
                }
            } else {
                let mut names = vec![self.parse_identifier()?];
                while self.check(&TokenKind::Comma) {
                    self.advance();
                    names.push(self.parse_identifier()?);
                }
                FieldDecl {
                    names,
                    ty: self.parse_type()?,
                }
            };
            let span = self.span_from(start);
            fields.push(self.node(field, span));

            if self.check(&TokenKind::Semicolon) {
                self.advance();
            } else if !self.check(&TokenKind::RBrace) {
                return Err(self.error_expected("';'"));
            }
        }
        self.consume(TokenKind::RBrace)?;
        Ok(fields)
    }

    fn parse_interface_methods(&mut self) -> ParseResult<Vec<Node<MethodSpec>>> {
        self.consume(TokenKind::Interface)?;
        self.consume(TokenKind::LBrace)?;

        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            let start = self.current_token().span;
            let name = self.parse_identifier()?;
            let sig = self.parse_signature()?;
            let span = self.span_from(start);
            methods.push(self.node(MethodSpec { name, sig }, span));

            if self.check(&TokenKind::Semicolon) {
                self.advance();
            } else if !self.check(&TokenKind::RBrace) {
                return Err(self.error_expected("';'"));
            }
        }
        self.consume(TokenKind::RBrace)?;
        Ok(methods)
    }
}
