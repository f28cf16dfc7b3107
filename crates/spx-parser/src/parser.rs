//! Core Parser struct and file-level parsing

use super::*;

/// Recursive descent parser for spx source files.
///
/// Errors inside a declaration or statement are recorded and parsing resumes
/// at the next terminator, so one bad line never hides the rest of the file.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) current: usize,
    pub(crate) file_id: FileId,
    pub(crate) next_index: u32,
    pub(crate) errors: Vec<ParseError>,
    /// Negative inside `if`/`for` headers where `T {` opens a block, not a literal
    pub(crate) expr_level: i32,
}

impl Parser {
    /// Creates a new parser from a token stream
    pub fn new(tokens: Vec<Token>, file_id: FileId) -> Self {
        let tokens = if tokens.is_empty() {
            vec![Token {
                kind: TokenKind::Eof,
                span: Span::new(0, 0, file_id),
                value: String::new(),
                raw: String::new(),
            }]
        } else {
            tokens
        };
        Self {
            tokens,
            current: 0,
            file_id,
            next_index: 0,
            errors: Vec::new(),
            expr_level: 0,
        }
    }

    /// Errors recorded so far
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// Parses a complete source file, recording errors instead of stopping
    pub fn parse_file(&mut self, path: &str) -> File {
        let start_span = self.current_token().span;

        let package = if self.check(&TokenKind::Package) {
            self.advance();
            match self.parse_identifier() {
                Ok(name) => {
                    self.expect_terminator();
                    Some(name)
                }
                Err(err) => {
                    self.record(err);
                    self.synchronize();
                    None
                }
            }
        } else {
            None
        };

        let mut imports = Vec::new();
        while self.check(&TokenKind::Import) {
            match self.parse_import_decl(&mut imports) {
                Ok(()) => self.expect_terminator(),
                Err(err) => {
                    self.record(err);
                    self.synchronize();
                }
            }
        }

        let mut decls = Vec::new();
        while !self.is_at_end() {
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            match self.parse_top_level_decl() {
                Ok(decl) => {
                    decls.push(decl);
                    self.expect_terminator();
                }
                Err(err) => {
                    self.record(err);
                    self.synchronize();
                }
            }
        }

        let end_span = self.current_token().span;
        File {
            id: self.file_id,
            path: path.to_string(),
            package,
            imports,
            decls,
            span: start_span.merge(&end_span),
        }
    }

    /// Parses a standalone type expression (used for package export data)
    pub fn parse_type_only(&mut self) -> ParseResult<Node<TypeExpr>> {
        let ty = self.parse_type()?;
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
        if !self.is_at_end() {
            return Err(self.error_expected("end of type"));
        }
        Ok(ty)
    }

    // =========================================================================
    // Top-level declarations
    // =========================================================================

    fn parse_import_decl(&mut self, imports: &mut Vec<Node<ImportSpec>>) -> ParseResult<()> {
        self.consume(TokenKind::Import)?;
        if self.check(&TokenKind::LParen) {
            self.advance();
            while !self.check(&TokenKind::RParen) && !self.is_at_end() {
                imports.push(self.parse_import_spec()?);
                if self.check(&TokenKind::Semicolon) {
                    self.advance();
                } else if !self.check(&TokenKind::RParen) {
                    return Err(self.error_expected("';'"));
                }
            }
            self.consume(TokenKind::RParen)?;
        } else {
            imports.push(self.parse_import_spec()?);
        }
        Ok(())
    }

    fn parse_import_spec(&mut self) -> ParseResult<Node<ImportSpec>> {
        let start = self.current_token().span;
        let name = if self.check(&TokenKind::Identifier) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        if !self.check(&TokenKind::StringLiteral) {
            return Err(self.error_expected("import path"));
        }
        let token = self.advance().clone();
        let spec = ImportSpec {
            name,
            path: token.value,
            path_span: token.span,
        };
        let span = self.span_from(start);
        Ok(self.node(spec, span))
    }

    fn parse_top_level_decl(&mut self) -> ParseResult<Node<Decl>> {
        let start = self.current_token().span;

        let decl = match self.current_token().kind {
            TokenKind::Var => Decl::Var(self.parse_gen_decl()?),
            TokenKind::Const => Decl::Const(self.parse_gen_decl()?),
            TokenKind::Type => Decl::Type(self.parse_type_decl()?),
            TokenKind::Func if self.peek_kind(1) == Some(&TokenKind::Identifier) => {
                Decl::Func(self.parse_func_decl()?)
            }
            TokenKind::Import => {
                return Err(self.error("imports must appear before other declarations".to_string()));
            }
            _ => Decl::Stmt(self.parse_statement()?),
        };

        let span = self.span_from(start);
        Ok(self.node(decl, span))
    }
}
