//! Expression definitions for the AST

use super::*;

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Identifier
    Ident(Ident),

    /// Literal values
    Literal(Literal),

    /// Composite literal: `T{a: 1}` or untyped `{Title: "x"}`
    Composite {
        ty: Option<Box<Node<TypeExpr>>>,
        elements: Vec<Node<Element>>,
    },

    /// Slice literal: [a, b, c]
    SliceLit(Vec<Node<Expr>>),

    /// Function literal: func(x int) { ... }
    FuncLit {
        sig: Node<FuncSig>,
        body: Node<Block>,
    },

    /// Lambda: `=> { ... }`, `(a, b) => a + b`, `x => x * 2`
    Lambda {
        params: Vec<Node<Ident>>,
        body: LambdaBody,
    },

    /// Parenthesized expression
    Paren(Box<Node<Expr>>),

    /// Selector: x.sel
    Selector {
        object: Box<Node<Expr>>,
        property: Node<Ident>,
    },

    /// Index access: x[index]
    Index {
        object: Box<Node<Expr>>,
        index: Box<Node<Expr>>,
    },

    /// Function call; `command` is set for the parenthesis-free form `play "biu"`
    Call {
        callee: Box<Node<Expr>>,
        args: Vec<Node<Expr>>,
        command: bool,
    },

    /// Unary operation: op expr
    Unary {
        op: UnaryOp,
        expr: Box<Node<Expr>>,
    },

    /// Binary operation: left op right
    Binary {
        left: Box<Node<Expr>>,
        op: BinaryOp,
        right: Box<Node<Expr>>,
    },
}

impl Expr {
    pub fn as_ident(&self) -> Option<&Ident> {
        match self {
            Expr::Ident(ident) => Some(ident),
            _ => None,
        }
    }

    /// Strips any number of enclosing parentheses
    pub fn unparen(node: &Node<Expr>) -> &Node<Expr> {
        let mut current = node;
        while let Expr::Paren(inner) = &current.value {
            current = inner;
        }
        current
    }
}

/// Lambda body
#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(Box<Node<Expr>>),
    Block(Node<Block>),
}

/// Composite literal element; `key` is set for `Key: value` entries
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub key: Option<Node<Expr>>,
    pub value: Node<Expr>,
}

/// Literal kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Float,
    String,
}

/// Literal value; `raw` is the source text, `value` is the unquoted content
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub raw: String,
    pub value: String,
}

impl Literal {
    pub fn string(value: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            kind: LiteralKind::String,
            raw: raw.into(),
            value: value.into(),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LogicalAnd,
    LogicalOr,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }

    /// Go operator precedence (5 binds tightest)
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::LogicalOr => 1,
            BinaryOp::LogicalAnd => 2,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 3,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor => 4,
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::And
            | BinaryOp::AndNot => 5,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::AndNot => "&^",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
        };
        write!(f, "{}", s)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    Deref,
    AddrOf,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
            UnaryOp::Deref => "*",
            UnaryOp::AddrOf => "&",
        };
        write!(f, "{}", s)
    }
}

/// Short source-like rendering used in diagnostics (`x.play`, `f(...)`)
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(ident) => write!(f, "{}", ident),
            Expr::Literal(lit) => write!(f, "{}", lit.raw),
            Expr::Composite { ty: Some(ty), .. } => write!(f, "{}{{…}}", ty.value),
            Expr::Composite { ty: None, .. } => write!(f, "{{…}}"),
            Expr::SliceLit(_) => write!(f, "[…]"),
            Expr::FuncLit { .. } | Expr::Lambda { .. } => write!(f, "(func() literal)"),
            Expr::Paren(inner) => write!(f, "({})", inner.value),
            Expr::Selector { object, property } => write!(f, "{}.{}", object.value, property.value),
            Expr::Index { object, index } => write!(f, "{}[{}]", object.value, index.value),
            Expr::Call { callee, args, .. } => {
                if args.is_empty() {
                    write!(f, "{}()", callee.value)
                } else {
                    write!(f, "{}(…)", callee.value)
                }
            }
            Expr::Unary { op, expr } => write!(f, "{}{}", op, expr.value),
            Expr::Binary { left, op, right } => write!(f, "{} {} {}", left.value, op, right.value),
        }
    }
}
