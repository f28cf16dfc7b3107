//! Declaration parsing

use super::*;

impl Parser {
    /// Parses `var ...` or `const ...`, single or parenthesized
    pub(crate) fn parse_gen_decl(&mut self) -> ParseResult<GenDecl> {
        self.advance(); // var / const

        if !self.check(&TokenKind::LParen) {
            let spec = self.parse_value_spec()?;
            return Ok(GenDecl {
                specs: vec![spec],
                grouped: false,
            });
        }

        self.advance();
        let mut specs = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            match self.parse_value_spec() {
                Ok(spec) => specs.push(spec),
                Err(err) => {
                    self.record(err);
                    self.skip_to_terminator(TokenKind::RParen);
                    continue;
                }
            }
            if self.check(&TokenKind::Semicolon) {
                self.advance();
            } else if !self.check(&TokenKind::RParen) {
                let err = self.error_expected("';'");
                self.record(err);
                self.skip_to_terminator(TokenKind::RParen);
            }
        }
        self.expect_closing(TokenKind::RParen);

        Ok(GenDecl { specs, grouped: true })
    }

    fn parse_value_spec(&mut self) -> ParseResult<Node<ValueSpec>> {
        let start = self.current_token().span;

        let mut names = vec![self.parse_identifier()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            names.push(self.parse_identifier()?);
        }

        let ty = if self.starts_type() {
            Some(self.parse_type()?)
        } else {
            None
        };

        let values = if self.check(&TokenKind::Eq) {
            self.advance();
            self.parse_expression_list()?
        } else {
            Vec::new()
        };

        if ty.is_none() && values.is_empty() {
            return Err(self.error_expected("type"));
        }

        let span = self.span_from(start);
        Ok(self.node(ValueSpec { names, ty, values }, span))
    }

    pub(crate) fn parse_type_decl(&mut self) -> ParseResult<Vec<Node<TypeSpec>>> {
        self.consume(TokenKind::Type)?;

        if !self.check(&TokenKind::LParen) {
            return Ok(vec![self.parse_type_spec()?]);
        }

        self.advance();
        let mut specs = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            specs.push(self.parse_type_spec()?);
            if self.check(&TokenKind::Semicolon) {
                self.advance();
            } else if !self.check(&TokenKind::RParen) {
                return Err(self.error_expected("';'"));
            }
        }
        self.expect_closing(TokenKind::RParen);
        Ok(specs)
    }

    fn parse_type_spec(&mut self) -> ParseResult<Node<TypeSpec>> {
        let start = self.current_token().span;
        let name = self.parse_identifier()?;
        let alias = if self.check(&TokenKind::Eq) {
            self.advance();
            true
        } else {
            false
        };
        let ty = self.parse_type()?;
        let span = self.span_from(start);
        Ok(self.node(TypeSpec { name, ty, alias }, span))
    }

    pub(crate) fn parse_func_decl(&mut self) -> ParseResult<FuncDecl> {
        self.consume(TokenKind::Func)?;
        let name = self.parse_identifier()?;
        let sig = self.parse_signature()?;
        let body = if self.check(&TokenKind::LBrace) {
            Some(self.parse_body()?)
        } else {
            None
        };
        Ok(FuncDecl { name, sig, body })
    }
}
