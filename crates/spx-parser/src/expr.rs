//! Expression parsing

use super::*;

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Node<Expr>> {
        self.parse_binary(1)
    }

    pub(crate) fn parse_expression_list(&mut self) -> ParseResult<Vec<Node<Expr>>> {
        let mut exprs = vec![self.parse_expression()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            exprs.push(self.parse_expression()?);
        }
        Ok(exprs)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Node<Expr>> {
        let left = self.parse_unary()?;
        self.parse_binary_rest(left, min_precedence)
    }

    /// Continues a binary expression whose left operand is already parsed
    pub(crate) fn parse_binary_rest(&mut self, mut left: Node<Expr>, min_precedence: u8) -> ParseResult<Node<Expr>> {
        while let Some(op) = self.binary_operator() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            let span = left.span.merge(&right.span);
            left = self.node(
                Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    pub(crate) fn parse_unary(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;
        let op = match self.current_token().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Caret => UnaryOp::BitNot,
            TokenKind::Star => UnaryOp::Deref,
            TokenKind::Amp => UnaryOp::AddrOf,
            _ => return self.parse_primary_expr(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        let span = self.span_from(start);
        Ok(self.node(
            Expr::Unary {
                op,
                expr: Box::new(operand),
            },
            span,
        ))
    }

    /// Operand followed by selectors, index expressions, calls and literals
    pub(crate) fn parse_primary_expr(&mut self) -> ParseResult<Node<Expr>> {
        let mut expr = self.parse_operand()?;

        loop {
            match self.current_token().kind {
                TokenKind::Dot => {
                    self.advance();
                    if !self.check(&TokenKind::Identifier) {
                        return Err(self.error_expected("selector"));
                    }
                    let property = self.parse_identifier()?;
                    let span = expr.span.merge(&property.span);
                    expr = self.node(
                        Expr::Selector {
                            object: Box::new(expr),
                            property,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    self.expr_level += 1;
                    let index = self.parse_expression();
                    self.expr_level -= 1;
                    let index = index?;
                    self.consume(TokenKind::RBracket)?;
                    let span = self.span_from(expr.span);
                    expr = self.node(
                        Expr::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    let args = self.parse_call_arguments()?;
                    let span = self.span_from(expr.span);
                    expr = self.node(
                        Expr::Call {
                            callee: Box::new(expr),
                            args,
                            command: false,
                        },
                        span,
                    );
                }
                TokenKind::LBrace if self.composite_allowed_after(&expr) => {
                    let ty = self.expr_to_type(&expr)?;
                    let start = expr.span;
                    let elements = self.parse_composite_body()?;
                    let span = self.span_from(start);
                    expr = self.node(
                        Expr::Composite {
                            ty: Some(Box::new(ty)),
                            elements,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_operand(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;

        match self.current_token().kind {
            TokenKind::Identifier => {
                if self.peek_kind(1) == Some(&TokenKind::FatArrow) {
                    let param = self.parse_identifier()?;
                    return self.parse_lambda_rest(vec![param], start);
                }
                self.parse_ident_expr()
            }
            TokenKind::IntLiteral | TokenKind::FloatLiteral | TokenKind::StringLiteral => {
                let token = self.advance().clone();
                let kind = match token.kind {
                    TokenKind::IntLiteral => LiteralKind::Int,
                    TokenKind::FloatLiteral => LiteralKind::Float,
                    _ => LiteralKind::String,
                };
                let literal = Literal {
                    kind,
                    raw: token.raw,
                    value: token.value,
                };
                Ok(self.node(Expr::Literal(literal), token.span))
            }
            TokenKind::LParen => {
                if self.is_paren_lambda() {
                    self.advance();
                    let mut params = Vec::new();
                    while !self.check(&TokenKind::RParen) {
                        params.push(self.parse_identifier()?);
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        }
                    }
                    self.consume(TokenKind::RParen)?;
                    return self.parse_lambda_rest(params, start);
                }
                self.advance();
                self.expr_level += 1;
                let inner = self.parse_expression();
                self.expr_level -= 1;
                let inner = inner?;
                self.consume(TokenKind::RParen)?;
                let span = self.span_from(start);
                Ok(self.node(Expr::Paren(Box::new(inner)), span))
            }
            TokenKind::FatArrow => self.parse_lambda_rest(Vec::new(), start),
            TokenKind::Func => {
                self.advance();
                let sig = self.parse_signature()?;
                let body = self.parse_body()?;
                let span = self.span_from(start);
                Ok(self.node(Expr::FuncLit { sig, body }, span))
            }
            TokenKind::LBracket if self.peek_kind(1) == Some(&TokenKind::RBracket) => self.parse_typed_composite(),
            TokenKind::LBracket => {
                self.advance();
                self.expr_level += 1;
                let mut items = Vec::new();
                while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
                    match self.parse_expression() {
                        Ok(item) => items.push(item),
                        Err(err) => {
                            self.expr_level -= 1;
                            return Err(err);
                        }
                    }
                    if !self.check(&TokenKind::Comma) {
                        break;
                    }
                    self.advance();
                }
                self.expr_level -= 1;
                self.consume(TokenKind::RBracket)?;
                let span = self.span_from(start);
                Ok(self.node(Expr::SliceLit(items), span))
            }
            TokenKind::Map | TokenKind::Struct => self.parse_typed_composite(),
            TokenKind::LBrace => {
                let elements = self.parse_composite_body()?;
                let span = self.span_from(start);
                Ok(self.node(Expr::Composite { ty: None, elements }, span))
            }
            _ => Err(self.error_expected("operand")),
        }
    }

    pub(crate) fn parse_ident_expr(&mut self) -> ParseResult<Node<Expr>> {
        let ident = self.parse_identifier()?;
        Ok(Node::new(ident.id, Expr::Ident(ident.value), ident.span))
    }

    fn parse_typed_composite(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;
        let ty = self.parse_type()?;
        if !self.check(&TokenKind::LBrace) {
            return Err(self.error_expected("'{'"));
        }
        let elements = self.parse_composite_body()?;
        let span = self.span_from(start);
        Ok(self.node(
            Expr::Composite {
                ty: Some(Box::new(ty)),
                elements,
            },
            span,
        ))
    }

    fn parse_lambda_rest(&mut self, params: Vec<Node<Ident>>, start: Span) -> ParseResult<Node<Expr>> {
        self.consume(TokenKind::FatArrow)?;
        let body = if self.check(&TokenKind::LBrace) {
            LambdaBody::Block(self.parse_body()?)
        } else {
            LambdaBody::Expr(Box::new(self.parse_expression()?))
        };
        let span = self.span_from(start);
        Ok(self.node(Expr::Lambda { params, body }, span))
    }

    fn parse_call_arguments(&mut self) -> ParseResult<Vec<Node<Expr>>> {
        self.consume(TokenKind::LParen)?;
        self.expr_level += 1;
        let result = self.parse_argument_list();
        self.expr_level -= 1;
        let args = result?;
        self.consume(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_argument_list(&mut self) -> ParseResult<Vec<Node<Expr>>> {
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            args.push(self.parse_expression()?);
            if self.check(&TokenKind::Ellipsis) {
                self.advance();
            }
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(args)
    }

    pub(crate) fn parse_composite_body(&mut self) -> ParseResult<Vec<Node<Element>>> {
        self.consume(TokenKind::LBrace)?;
        self.expr_level += 1;
        let result = self.parse_elements();
        self.expr_level -= 1;
        let elements = result?;
        if self.current_token().is_inserted_semicolon() {
            return Err(self.error("missing ',' before newline in composite literal".to_string()));
        }
        self.consume(TokenKind::RBrace)?;
        Ok(elements)
    }

    fn parse_elements(&mut self) -> ParseResult<Vec<Node<Element>>> {
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let start = self.current_token().span;
            let first = self.parse_element_value()?;
            let element = if self.check(&TokenKind::Colon) {
                self.advance();
                let value = self.parse_element_value()?;
                Element {
                    key: Some(first),
                    value,
                }
            } else {
                Element { key: None, value: first }
            };
            let span = self.span_from(start);
            elements.push(self.node(element, span));
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(elements)
    }

    fn parse_element_value(&mut self) -> ParseResult<Node<Expr>> {
        if self.check(&TokenKind::LBrace) {
            let start = self.current_token().span;
            let elements = self.parse_composite_body()?;
            let span = self.span_from(start);
            return Ok(self.node(Expr::Composite { ty: None, elements }, span));
        }
        self.parse_expression()
    }

    /// `T{` starts a literal unless we are in a control clause and `T` is a bare name
    fn composite_allowed_after(&self, expr: &Node<Expr>) -> bool {
        let is_type_name = match &expr.value {
            Expr::Ident(_) => true,
            Expr::Selector { object, .. } => matches!(object.value, Expr::Ident(_)),
            _ => false,
        };
        is_type_name && self.expr_level >= 0
    }

    fn expr_to_type(&mut self, expr: &Node<Expr>) -> ParseResult<Node<TypeExpr>> {
        match &expr.value {
            Expr::Ident(ident) => Ok(Node::new(expr.id, TypeExpr::Name(ident.clone()), expr.span)),
            Expr::Selector { object, property } => match &object.value {
                Expr::Ident(pkg) => {
                    let pkg = Node::new(object.id, pkg.clone(), object.span);
                    let ty = TypeExpr::Qualified {
                        pkg,
                        name: property.clone(),
                    };
                    Ok(self.node(ty, expr.span))
                }
                _ => Err(ParseError::new("expected type", expr.span)),
            },
            _ => Err(ParseError::new("expected type", expr.span)),
        }
    }

    fn binary_operator(&self) -> Option<BinaryOp> {
        let op = match self.current_token().kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Rem,
            TokenKind::Amp => BinaryOp::And,
            TokenKind::Pipe => BinaryOp::Or,
            TokenKind::Caret => BinaryOp::Xor,
            TokenKind::Shl => BinaryOp::Shl,
            TokenKind::Shr => BinaryOp::Shr,
            TokenKind::AmpCaret => BinaryOp::AndNot,
            TokenKind::AmpAmp => BinaryOp::LogicalAnd,
            TokenKind::PipePipe => BinaryOp::LogicalOr,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::BangEq => BinaryOp::NotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            _ => return None,
        };
        Some(op)
    }
}
