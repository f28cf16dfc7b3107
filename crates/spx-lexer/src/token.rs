use spx_ast::Span;

/// Represents the different kinds of tokens in spx.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords
    Package,
    Import,
    Var,
    Const,
    Type,
    Func,
    Struct,
    Interface,
    Map,
    If,
    Else,
    For,
    Return,
    Break,
    Continue,

    // Literals
    Identifier,
    IntLiteral,
    FloatLiteral,
    StringLiteral,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Amp,        // &
    Pipe,       // |
    Caret,      // ^
    Shl,        // <<
    Shr,        // >>
    AmpCaret,   // &^
    AmpAmp,     // &&
    PipePipe,   // ||
    Bang,       // !
    EqEq,       // ==
    BangEq,     // !=
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    Eq,         // =
    ColonEq,    // :=
    PlusEq,     // +=
    MinusEq,    // -=
    StarEq,     // *=
    SlashEq,    // /=
    PercentEq,  // %=
    PlusPlus,   // ++
    MinusMinus, // --
    FatArrow,   // =>
    Ellipsis,   // ...

    // Delimiters
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Semicolon, // ; or an inserted line break
    Comma,     // ,
    Dot,       // .
    Colon,     // :

    // Special
    Eof,
    Error,
}

impl TokenKind {
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier | TokenKind::IntLiteral | TokenKind::FloatLiteral | TokenKind::StringLiteral
        )
    }

    /// Tokens after which a line break terminates the statement
    pub fn ends_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::StringLiteral
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }

    /// Source spelling used in syntax error messages
    pub fn text(self) -> &'static str {
        match self {
            TokenKind::Package => "package",
            TokenKind::Import => "import",
            TokenKind::Var => "var",
            TokenKind::Const => "const",
            TokenKind::Type => "type",
            TokenKind::Func => "func",
            TokenKind::Struct => "struct",
            TokenKind::Interface => "interface",
            TokenKind::Map => "map",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::Return => "return",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Identifier => "IDENT",
            TokenKind::IntLiteral => "INT",
            TokenKind::FloatLiteral => "FLOAT",
            TokenKind::StringLiteral => "STRING",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::AmpCaret => "&^",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::Bang => "!",
            TokenKind::EqEq => "==",
            TokenKind::BangEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Eq => "=",
            TokenKind::ColonEq => ":=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::PercentEq => "%=",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::FatArrow => "=>",
            TokenKind::Ellipsis => "...",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            TokenKind::Eof => "EOF",
            TokenKind::Error => "ILLEGAL",
        }
    }
}

/// Represents a token with its kind, span, and value.
///
/// `value` is the decoded content (unquoted for strings, the message for
/// error tokens); `raw` is the exact source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub value: String,
    pub raw: String,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, span: Span, value: String, raw: String) -> Self {
        Self { kind, span, value, raw }
    }

    /// True for a terminator the lexer inserted at a line break
    pub fn is_inserted_semicolon(&self) -> bool {
        self.kind == TokenKind::Semicolon && self.raw != ";"
    }

    /// Rendering used after "found" in syntax errors
    pub fn describe(&self) -> String {
        if self.is_inserted_semicolon() {
            "newline".to_string()
        } else if self.kind.is_literal() {
            self.raw.clone()
        } else {
            format!("'{}'", self.kind.text())
        }
    }
}
