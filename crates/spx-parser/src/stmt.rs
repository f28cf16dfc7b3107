//! Statement parsing

use super::*;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Node<Stmt>> {
        let start = self.current_token().span;

        let stmt = match self.current_token().kind {
            TokenKind::LBrace => Stmt::Block(self.parse_block()?.value),
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::For => self.parse_for_statement()?,
            TokenKind::Return => {
                self.advance();
                let values = if self.check(&TokenKind::Semicolon)
                    || self.check(&TokenKind::RBrace)
                    || self.is_at_end()
                {
                    Vec::new()
                } else {
                    self.parse_expression_list()?
                };
                Stmt::Return(values)
            }
            TokenKind::Break => {
                self.advance();
                Stmt::Break
            }
            TokenKind::Continue => {
                self.advance();
                Stmt::Continue
            }
            TokenKind::Var => Stmt::Var(self.parse_gen_decl()?),
            TokenKind::Const => Stmt::Const(self.parse_gen_decl()?),
            // The terminator itself is consumed by the enclosing list
            TokenKind::Semicolon => return Ok(self.node(Stmt::Empty, start)),
            _ => return self.parse_simple_statement(),
        };

        let span = self.span_from(start);
        Ok(self.node(stmt, span))
    }

    /// Expression, command call, assignment, short var decl or inc/dec
    pub(crate) fn parse_simple_statement(&mut self) -> ParseResult<Node<Stmt>> {
        let start = self.current_token().span;

        // `onStart => { ... }`: the name is a command, not a lambda parameter
        if self.check(&TokenKind::Identifier) && self.peek_kind(1) == Some(&TokenKind::FatArrow) {
            let callee = self.parse_ident_expr()?;
            let call = self.parse_command_call(callee)?;
            let span = self.span_from(start);
            return Ok(self.node(Stmt::Expr(call), span));
        }

        if !self.starts_operand() {
            return Err(self.error_expected("statement"));
        }

        let first = self.parse_unary()?;
        if matches!(first.value, Expr::Ident(_) | Expr::Selector { .. }) && self.starts_command_arg() {
            let call = self.parse_command_call(first)?;
            let span = self.span_from(start);
            return Ok(self.node(Stmt::Expr(call), span));
        }

        let first = self.parse_binary_rest(first, 1)?;
        let mut lhs = vec![first];
        while self.check(&TokenKind::Comma) {
            self.advance();
            lhs.push(self.parse_expression()?);
        }

        let stmt = match self.current_token().kind {
            TokenKind::ColonEq => {
                let op_span = self.current_token().span;
                self.advance();
                let mut names = Vec::with_capacity(lhs.len());
                for expr in lhs {
                    match expr.value {
                        Expr::Ident(ident) => names.push(Node::new(expr.id, ident, expr.span)),
                        _ => return Err(ParseError::new("non-name on left side of :=", op_span)),
                    }
                }
                let values = self.parse_expression_list()?;
                Stmt::ShortVarDecl { names, values }
            }
            TokenKind::Eq
            | TokenKind::PlusEq
            | TokenKind::MinusEq
            | TokenKind::StarEq
            | TokenKind::SlashEq
            | TokenKind::PercentEq => {
                let op = self.parse_assign_operator()?;
                let rhs = self.parse_expression_list()?;
                Stmt::Assign { lhs, op, rhs }
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let increment = self.check(&TokenKind::PlusPlus);
                if lhs.len() > 1 {
                    return Err(self.error_expected("1 expression"));
                }
                self.advance();
                let target = lhs.remove(0);
                Stmt::IncDec { target, increment }
            }
            _ => {
                if lhs.len() > 1 {
                    return Err(self.error_expected("1 expression"));
                }
                Stmt::Expr(lhs.remove(0))
            }
        };

        let span = self.span_from(start);
        Ok(self.node(stmt, span))
    }

    /// Parses the arguments of a parenthesis-free call
    fn parse_command_call(&mut self, callee: Node<Expr>) -> ParseResult<Node<Expr>> {
        let start = callee.span;
        let mut args = vec![self.parse_expression()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            args.push(self.parse_expression()?);
        }
        let span = self.span_from(start);
        Ok(self.node(
            Expr::Call {
                callee: Box::new(callee),
                args,
                command: true,
            },
            span,
        ))
    }

    pub(crate) fn parse_block(&mut self) -> ParseResult<Node<Block>> {
        let start = self.current_token().span;
        self.consume(TokenKind::LBrace)?;

        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => {
                    stmts.push(stmt);
                    if self.check(&TokenKind::Semicolon) {
                        self.advance();
                    } else if !self.check(&TokenKind::RBrace) {
                        let err = self.error_expected("';'");
                        self.record(err);
                        self.skip_to_terminator(TokenKind::RBrace);
                    }
                }
                Err(err) => {
                    self.record(err);
                    self.skip_to_terminator(TokenKind::RBrace);
                }
            }
        }

        self.consume(TokenKind::RBrace)?;
        let span = self.span_from(start);
        Ok(self.node(Block { stmts }, span))
    }

    /// Function or lambda body; composite literals are allowed again inside
    pub(crate) fn parse_body(&mut self) -> ParseResult<Node<Block>> {
        let saved = self.expr_level;
        self.expr_level = 0;
        let body = self.parse_block();
        self.expr_level = saved;
        body
    }

    fn parse_if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::If)?;

        let saved = self.expr_level;
        self.expr_level = -1;
        let header = self.parse_if_header();
        self.expr_level = saved;
        let (init, condition) = header?;

        let then_block = self.parse_block()?;

        let else_stmt = if self.check(&TokenKind::Else) {
            self.advance();
            let start = self.current_token().span;
            match self.current_token().kind {
                TokenKind::If => {
                    let nested = self.parse_if_statement()?;
                    let span = self.span_from(start);
                    Some(Box::new(self.node(nested, span)))
                }
                TokenKind::LBrace => {
                    let block = self.parse_block()?;
                    let span = block.span;
                    Some(Box::new(self.node(Stmt::Block(block.value), span)))
                }
                _ => return Err(self.error_expected("if statement or block")),
            }
        } else {
            None
        };

        Ok(Stmt::If {
            init,
            condition,
            then_block,
            else_stmt,
        })
    }

    fn parse_if_header(&mut self) -> ParseResult<(Option<Box<Node<Stmt>>>, Node<Expr>)> {
        if self.check(&TokenKind::LBrace) {
            return Err(self.error("missing condition in if statement".to_string()));
        }
        let first = self.parse_simple_statement()?;
        if self.check(&TokenKind::Semicolon) && !self.current_token().is_inserted_semicolon() {
            self.advance();
            let condition = self.parse_expression()?;
            return Ok((Some(Box::new(first)), condition));
        }
        match first.value {
            Stmt::Expr(expr) => Ok((None, expr)),
            _ => Err(ParseError::new("cannot use assignment as value", first.span)),
        }
    }

    fn parse_for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::For)?;

        let saved = self.expr_level;
        self.expr_level = -1;
        let header = self.parse_for_header();
        self.expr_level = saved;
        let (init, condition, post) = header?;

        let body = self.parse_block()?;
        Ok(Stmt::For {
            init,
            condition,
            post,
            body,
        })
    }

    #[allow(clippy::type_complexity)]
    fn parse_for_header(
        &mut self,
    ) -> ParseResult<(Option<Box<Node<Stmt>>>, Option<Node<Expr>>, Option<Box<Node<Stmt>>>)> {
        if self.check(&TokenKind::LBrace) {
            return Ok((None, None, None));
        }

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_simple_statement()?)
        };

        if !self.check(&TokenKind::Semicolon) || self.current_token().is_inserted_semicolon() {
            // `for cond { }`
            return match init {
                Some(stmt) => match stmt.value {
                    Stmt::Expr(expr) => Ok((None, Some(expr), None)),
                    _ => Err(self.error_expected("for loop condition")),
                },
                None => Ok((None, None, None)),
            };
        }

        self.advance(); // first ;
        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::Semicolon)?;
        let post = if self.check(&TokenKind::LBrace) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };

        Ok((init.map(Box::new), condition, post))
    }
}
