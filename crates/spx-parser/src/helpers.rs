//! Parser helper methods - token manipulation, error recording, node ids

use super::*;

impl Parser {
    // =========================================================================
    // Node construction
    // =========================================================================

    pub(crate) fn node<T>(&mut self, value: T, span: Span) -> Node<T> {
        let id = NodeId::new(self.file_id, self.next_index);
        self.next_index += 1;
        Node::new(id, value, span)
    }

    pub(crate) fn span_from(&self, start: Span) -> Span {
        start.merge(&self.previous_token().span)
    }

    pub(crate) fn parse_identifier(&mut self) -> ParseResult<Node<Ident>> {
        if !self.check(&TokenKind::Identifier) {
            return Err(self.error_expected("'IDENT'"));
        }
        let token = self.advance().clone();
        Ok(self.node(Ident::new(token.value), token.span))
    }

    pub(crate) fn parse_assign_operator(&mut self) -> ParseResult<AssignOp> {
        let op = match self.current_token().kind {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            TokenKind::StarEq => AssignOp::MulAssign,
            TokenKind::SlashEq => AssignOp::DivAssign,
            TokenKind::PercentEq => AssignOp::RemAssign,
            _ => return Err(self.error_expected("assignment operator")),
        };
        self.advance();
        Ok(op)
    }

    // =========================================================================
    // Lookahead predicates
    // =========================================================================

    pub(crate) fn starts_type(&self) -> bool {
        matches!(
            self.current_token().kind,
            TokenKind::Identifier
                | TokenKind::Star
                | TokenKind::LBracket
                | TokenKind::Map
                | TokenKind::Func
                | TokenKind::Struct
                | TokenKind::Interface
                | TokenKind::LParen
        )
    }

    pub(crate) fn starts_operand(&self) -> bool {
        matches!(
            self.current_token().kind,
            TokenKind::Identifier
                | TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::StringLiteral
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Func
                | TokenKind::FatArrow
                | TokenKind::Map
                | TokenKind::Struct
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Bang
                | TokenKind::Caret
                | TokenKind::Star
                | TokenKind::Amp
        )
    }

    /// Whether the token after a statement-leading name begins command arguments
    pub(crate) fn starts_command_arg(&self) -> bool {
        match self.current_token().kind {
            TokenKind::Identifier
            | TokenKind::IntLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StringLiteral
            | TokenKind::FatArrow
            | TokenKind::Func => true,
            // `turn -90`: a sign glued to its operand but separated from the name
            TokenKind::Minus | TokenKind::Plus => {
                let sign = self.current_token().span;
                let before = self.previous_token().span;
                let after = self.tokens.get(self.current + 1).map(|t| t.span);
                before.end < sign.start && after.map_or(false, |a| a.start == sign.end)
            }
            _ => false,
        }
    }

    /// `(a, b) =>` or `() =>`
    pub(crate) fn is_paren_lambda(&self) -> bool {
        let mut i = self.current + 1;
        let kind_at = |i: usize| self.tokens.get(i).map(|t| t.kind);
        if kind_at(i) == Some(TokenKind::RParen) {
            return kind_at(i + 1) == Some(TokenKind::FatArrow);
        }
        loop {
            if kind_at(i) != Some(TokenKind::Identifier) {
                return false;
            }
            i += 1;
            match kind_at(i) {
                Some(TokenKind::Comma) => i += 1,
                Some(TokenKind::RParen) => return kind_at(i + 1) == Some(TokenKind::FatArrow),
                _ => return false,
            }
        }
    }

    // =========================================================================
    // Utility Methods (Token Manipulation)
    // =========================================================================

    pub(crate) fn current_token(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    pub(crate) fn previous_token(&self) -> &Token {
        &self.tokens[(self.current.saturating_sub(1)).min(self.tokens.len() - 1)]
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous_token()
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end() && &self.current_token().kind == kind
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.current_token().kind == TokenKind::Eof
    }

    pub(crate) fn consume(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance().clone())
        } else {
            Err(self.error_expected(&format!("'{}'", kind.text())))
        }
    }

    // =========================================================================
    // Errors and recovery
    // =========================================================================

    pub(crate) fn error(&self, message: String) -> ParseError {
        ParseError {
            message,
            span: self.current_token().span,
        }
    }

    /// `expected X, found Y` at the current token
    pub(crate) fn error_expected(&self, what: &str) -> ParseError {
        self.error(format!("expected {}, found {}", what, self.current_token().describe()))
    }

    pub(crate) fn record(&mut self, err: ParseError) {
        if self.errors.last() != Some(&err) {
            self.errors.push(err);
        }
    }

    /// Records a missing closing token without consuming anything
    pub(crate) fn expect_closing(&mut self, kind: TokenKind) {
        if self.check(&kind) {
            self.advance();
        } else {
            let err = self.error_expected(&format!("'{}'", kind.text()));
            self.record(err);
        }
    }

    /// Declarations at file level end with `;` or a line break
    pub(crate) fn expect_terminator(&mut self) {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        } else {
            let err = self.error_expected("';'");
            self.record(err);
            self.synchronize();
        }
    }

    /// Skips to the next file-level declaration boundary
    pub(crate) fn synchronize(&mut self) {
        let mut depth = 0i32;
        let mut first = true;
        while !self.is_at_end() {
            match self.current_token().kind {
                TokenKind::Semicolon if depth <= 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Var | TokenKind::Const | TokenKind::Type | TokenKind::Func | TokenKind::Import
                    if depth <= 0 && !first =>
                {
                    return;
                }
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => depth -= 1,
                _ => {}
            }
            first = false;
            self.advance();
        }
    }

    /// Skips to the end of the current list item; stops before `closer`
    pub(crate) fn skip_to_terminator(&mut self, closer: TokenKind) {
        let mut depth = 0i32;
        while !self.is_at_end() {
            let kind = self.current_token().kind;
            if depth == 0 {
                if kind == TokenKind::Semicolon {
                    self.advance();
                    return;
                }
                if kind == closer {
                    return;
                }
            }
            match kind {
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => depth = (depth - 1).max(0),
                _ => {}
            }
            self.advance();
        }
    }
}
