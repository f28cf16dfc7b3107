use spx_ast::{FileId, Span};
use crate::token::{Token, TokenKind};

/// The lexer/tokenizer for spx.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current_pos: usize,
    current_char: Option<char>,
    file_id: FileId,
    /// Set when the previous token may end a statement
    insert_semicolon: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer from source code.
    pub fn new(source: &'a str) -> Self {
        Self::with_file_id(source, FileId(0))
    }

    /// Creates a new lexer with a specific file ID.
    pub fn with_file_id(source: &'a str, file_id: FileId) -> Self {
        let mut chars = source.char_indices();
        let current_char = chars.next().map(|(_, c)| c);
        Self {
            source,
            chars,
            current_pos: 0,
            current_char,
            file_id,
            insert_semicolon: false,
        }
    }

    /// Tokenizes the entire source code and returns all tokens.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Gets the next token from the source.
    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.skip_whitespace_and_comments() {
            return token;
        }

        let start = self.current_pos;

        let token = match self.current_char {
            None => {
                if self.insert_semicolon {
                    self.insert_semicolon = false;
                    return self.make_token(TokenKind::Semicolon, start, String::new());
                }
                return Token::new(TokenKind::Eof, self.span_from(start), String::new(), String::new());
            }
            Some(ch) => match ch {
                '"' => self.read_string_literal(),
                '`' => self.read_raw_string_literal(),
                '0'..='9' => self.read_number(),
                '.' if self.peek().map_or(false, |c| c.is_ascii_digit()) => self.read_number(),
                _ if ch.is_alphabetic() || ch == '_' => self.read_identifier_or_keyword(),
                '+' => self.read_two(start, &[('+', TokenKind::PlusPlus), ('=', TokenKind::PlusEq)], TokenKind::Plus),
                '-' => self.read_two(start, &[('-', TokenKind::MinusMinus), ('=', TokenKind::MinusEq)], TokenKind::Minus),
                '*' => self.read_two(start, &[('=', TokenKind::StarEq)], TokenKind::Star),
                '/' => self.read_two(start, &[('=', TokenKind::SlashEq)], TokenKind::Slash),
                '%' => self.read_two(start, &[('=', TokenKind::PercentEq)], TokenKind::Percent),
                '^' => self.read_two(start, &[], TokenKind::Caret),
                '=' => self.read_two(start, &[('=', TokenKind::EqEq), ('>', TokenKind::FatArrow)], TokenKind::Eq),
                '!' => self.read_two(start, &[('=', TokenKind::BangEq)], TokenKind::Bang),
                '<' => self.read_two(start, &[('<', TokenKind::Shl), ('=', TokenKind::LtEq)], TokenKind::Lt),
                '>' => self.read_two(start, &[('>', TokenKind::Shr), ('=', TokenKind::GtEq)], TokenKind::Gt),
                '&' => self.read_two(
                    start,
                    &[('&', TokenKind::AmpAmp), ('^', TokenKind::AmpCaret)],
                    TokenKind::Amp,
                ),
                '|' => self.read_two(start, &[('|', TokenKind::PipePipe)], TokenKind::Pipe),
                ':' => self.read_two(start, &[('=', TokenKind::ColonEq)], TokenKind::Colon),
                '.' => self.read_dot(),
                '(' => self.single(start, TokenKind::LParen),
                ')' => self.single(start, TokenKind::RParen),
                '{' => self.single(start, TokenKind::LBrace),
                '}' => self.single(start, TokenKind::RBrace),
                '[' => self.single(start, TokenKind::LBracket),
                ']' => self.single(start, TokenKind::RBracket),
                ';' => self.single(start, TokenKind::Semicolon),
                ',' => self.single(start, TokenKind::Comma),
                _ => {
                    self.advance();
                    self.make_token(TokenKind::Error, start, format!("invalid character {:?}", ch))
                }
            },
        };

        // A bad token still ends its line so recovery stays line-local
        self.insert_semicolon = token.kind.ends_statement() || token.kind == TokenKind::Error;
        token
    }

    // Helper methods

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos;
            self.current_char = Some(ch);
        } else {
            self.current_pos = self.source.len();
            self.current_char = None;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next().map(|(_, c)| c)
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.clone().nth(n).map(|(_, c)| c)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.current_pos, self.file_id)
    }

    fn make_token(&self, kind: TokenKind, start: usize, value: String) -> Token {
        let raw = self.source[start..self.current_pos].to_string();
        Token::new(kind, self.span_from(start), value, raw)
    }

    fn single(&mut self, start: usize, kind: TokenKind) -> Token {
        self.advance();
        self.make_token(kind, start, kind.text().to_string())
    }

    /// Reads a one-character operator that may be extended by one of `follows`
    fn read_two(&mut self, start: usize, follows: &[(char, TokenKind)], fallback: TokenKind) -> Token {
        self.advance();
        for (next, kind) in follows {
            if self.current_char == Some(*next) {
                self.advance();
                return self.make_token(*kind, start, kind.text().to_string());
            }
        }
        self.make_token(fallback, start, fallback.text().to_string())
    }

    fn read_dot(&mut self) -> Token {
        let start = self.current_pos;
        if self.peek() == Some('.') && self.peek_nth(1) == Some('.') {
            self.advance();
            self.advance();
            self.advance();
            return self.make_token(TokenKind::Ellipsis, start, "...".to_string());
        }
        self.single(start, TokenKind::Dot)
    }

    /// Skips blanks and comments. Returns an inserted terminator when a line
    /// break follows a token that can end a statement.
    fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
        loop {
            match self.current_char {
                Some('\n') => {
                    if self.insert_semicolon {
                        let start = self.current_pos;
                        self.advance();
                        self.insert_semicolon = false;
                        return Some(Token::new(
                            TokenKind::Semicolon,
                            self.span_from(start),
                            "\n".to_string(),
                            "\n".to_string(),
                        ));
                    }
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() => self.advance(),
                Some('/') if self.peek() == Some('/') => self.skip_single_line_comment(),
                Some('/') if self.peek() == Some('*') => {
                    let start = self.current_pos;
                    let (terminated, had_newline) = self.skip_multi_line_comment();
                    if !terminated {
                        return Some(self.make_token(
                            TokenKind::Error,
                            start,
                            "comment not terminated".to_string(),
                        ));
                    }
                    if had_newline && self.insert_semicolon {
                        self.insert_semicolon = false;
                        return Some(Token::new(
                            TokenKind::Semicolon,
                            self.span_from(start),
                            "\n".to_string(),
                            "\n".to_string(),
                        ));
                    }
                }
                _ => return None,
            }
        }
    }

    fn skip_single_line_comment(&mut self) {
        // Stop before the line break so it can still terminate the statement
        while let Some(ch) = self.current_char {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_multi_line_comment(&mut self) -> (bool, bool) {
        // Skip /*
        self.advance();
        self.advance();

        let mut had_newline = false;
        while let Some(ch) = self.current_char {
            if ch == '*' && self.peek() == Some('/') {
                self.advance();
                self.advance();
                return (true, had_newline);
            }
            if ch == '\n' {
                had_newline = true;
            }
            self.advance();
        }
        (false, had_newline)
    }

    fn read_string_literal(&mut self) -> Token {
        let start = self.current_pos;
        self.advance(); // Skip opening quote

        while let Some(ch) = self.current_char {
            match ch {
                '"' => {
                    self.advance();
                    let raw = &self.source[start..self.current_pos];
                    return match unquote(raw) {
                        Some(value) => self.make_token(TokenKind::StringLiteral, start, value),
                        None => self.make_token(TokenKind::Error, start, "invalid escape sequence".to_string()),
                    };
                }
                '\\' => {
                    self.advance();
                    if self.current_char.is_some() {
                        self.advance();
                    }
                }
                '\n' => break,
                _ => self.advance(),
            }
        }

        self.make_token(TokenKind::Error, start, "string literal not terminated".to_string())
    }

    fn read_raw_string_literal(&mut self) -> Token {
        let start = self.current_pos;
        self.advance(); // Skip opening backtick

        let mut value = String::new();
        while let Some(ch) = self.current_char {
            if ch == '`' {
                self.advance();
                return self.make_token(TokenKind::StringLiteral, start, value);
            }
            if ch != '\r' {
                value.push(ch);
            }
            self.advance();
        }

        self.make_token(TokenKind::Error, start, "raw string literal not terminated".to_string())
    }

    fn read_number(&mut self) -> Token {
        let start = self.current_pos;
        let mut is_float = false;

        if self.current_char == Some('0') && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            self.advance();
            while matches!(self.current_char, Some(c) if c.is_ascii_hexdigit() || c == '_') {
                self.advance();
            }
            return self.finish_number(start, false);
        }

        while matches!(self.current_char, Some(c) if c.is_ascii_digit() || c == '_') {
            self.advance();
        }

        if self.current_char == Some('.') && self.peek() != Some('.') {
            is_float = true;
            self.advance();
            while matches!(self.current_char, Some(c) if c.is_ascii_digit() || c == '_') {
                self.advance();
            }
        }

        if matches!(self.current_char, Some('e') | Some('E')) {
            let sign_or_digit = self.peek();
            let exponent_follows = match sign_or_digit {
                Some('+') | Some('-') => self.peek_nth(1).map_or(false, |c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent_follows {
                is_float = true;
                self.advance();
                if matches!(self.current_char, Some('+') | Some('-')) {
                    self.advance();
                }
                while matches!(self.current_char, Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        self.finish_number(start, is_float)
    }

    fn finish_number(&self, start: usize, is_float: bool) -> Token {
        let value: String = self.source[start..self.current_pos].chars().filter(|c| *c != '_').collect();
        let kind = if is_float { TokenKind::FloatLiteral } else { TokenKind::IntLiteral };
        self.make_token(kind, start, value)
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let start = self.current_pos;

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let value = self.source[start..self.current_pos].to_string();
        let kind = match value.as_str() {
            "package" => TokenKind::Package,
            "import" => TokenKind::Import,
            "var" => TokenKind::Var,
            "const" => TokenKind::Const,
            "type" => TokenKind::Type,
            "func" => TokenKind::Func,
            "struct" => TokenKind::Struct,
            "interface" => TokenKind::Interface,
            "map" => TokenKind::Map,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            _ => TokenKind::Identifier,
        };

        self.make_token(kind, start, value)
    }
}

/// Decodes a double-quoted or backquoted literal. Returns `None` for
/// malformed input.
pub fn unquote(raw: &str) -> Option<String> {
    if let Some(inner) = raw.strip_prefix('`').and_then(|r| r.strip_suffix('`')) {
        return Some(inner.replace('\r', ""));
    }
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        let escaped = chars.next()?;
        let decoded = match escaped {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'x' => read_hex_escape(&mut chars, 2)?,
            'u' => read_hex_escape(&mut chars, 4)?,
            'U' => read_hex_escape(&mut chars, 8)?,
            _ => return None,
        };
        value.push(decoded);
    }
    Some(value)
}

fn read_hex_escape(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let mut code = 0u32;
    for _ in 0..digits {
        code = code * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_command_call_tokens() {
        let tokens = Lexer::new("play \"biu\"\n").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[1].value, "biu");
        assert_eq!(tokens[1].raw, "\"biu\"");
        assert!(tokens[2].is_inserted_semicolon());
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_semicolon_inserted_only_after_terminating_tokens() {
        assert_eq!(
            kinds("x := 1 +\n2\n"),
            vec![
                TokenKind::Identifier,
                TokenKind::ColonEq,
                TokenKind::IntLiteral,
                TokenKind::Plus,
                TokenKind::IntLiteral,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_semicolon_inserted_at_eof() {
        assert_eq!(kinds("}"), vec![TokenKind::RBrace, TokenKind::Semicolon, TokenKind::Eof]);
    }

    #[test]
    fn test_line_comment_keeps_line_break() {
        assert_eq!(
            kinds("wait 1 // pause\nx"),
            vec![
                TokenKind::Identifier,
                TokenKind::IntLiteral,
                TokenKind::Semicolon,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a := b => ... &^ <= :"),
            vec![
                TokenKind::Identifier,
                TokenKind::ColonEq,
                TokenKind::Identifier,
                TokenKind::FatArrow,
                TokenKind::Ellipsis,
                TokenKind::AmpCaret,
                TokenKind::LtEq,
                TokenKind::Colon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("42 3.5 1e3 0xff 1_000").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[1].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[2].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[3].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[4].value, "1000");
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let tokens = Lexer::new("say \"hello\nx").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].value, "string literal not terminated");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"a\\tb\"").as_deref(), Some("a\tb"));
        assert_eq!(unquote("\"\\u00e9\"").as_deref(), Some("é"));
        assert_eq!(unquote("`raw\\n`").as_deref(), Some("raw\\n"));
        assert_eq!(unquote("\"bad\\q\""), None);
        assert_eq!(unquote("\"\"").as_deref(), Some(""));
    }

    #[test]
    fn test_spans_use_file_id() {
        let tokens = Lexer::with_file_id("abc", FileId(7)).tokenize();
        assert_eq!(tokens[0].span, Span::new(0, 3, FileId(7)));
    }

    #[test]
    fn test_describe_tokens() {
        let tokens = Lexer::new("f(\"x\"\n").tokenize();
        assert_eq!(tokens[1].describe(), "'('");
        assert_eq!(tokens[2].describe(), "\"x\"");
        assert_eq!(tokens[3].describe(), "newline");
    }
}
