//! Statement definitions for the AST

use super::*;

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Expression statement (including command-style calls)
    Expr(Node<Expr>),

    /// Local `var` declaration
    Var(GenDecl),

    /// Local `const` declaration
    Const(GenDecl),

    /// Short variable declaration: a, b := x, y
    ShortVarDecl {
        names: Vec<Node<Ident>>,
        values: Vec<Node<Expr>>,
    },

    /// Assignment: lhs op rhs
    Assign {
        lhs: Vec<Node<Expr>>,
        op: AssignOp,
        rhs: Vec<Node<Expr>>,
    },

    /// x++ / x--
    IncDec {
        target: Node<Expr>,
        increment: bool,
    },

    /// if [init;] cond { } [else ...]
    If {
        init: Option<Box<Node<Stmt>>>,
        condition: Node<Expr>,
        then_block: Node<Block>,
        else_stmt: Option<Box<Node<Stmt>>>,
    },

    /// for [init]; [cond]; [post] { }
    For {
        init: Option<Box<Node<Stmt>>>,
        condition: Option<Node<Expr>>,
        post: Option<Box<Node<Stmt>>>,
        body: Node<Block>,
    },

    Return(Vec<Node<Expr>>),

    Break,

    Continue,

    Block(Block),

    Empty,
}

/// Braced statement list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Node<Stmt>>,
}

/// Assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
}

impl AssignOp {
    /// Binary operator applied by a compound assignment
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::RemAssign => Some(BinaryOp::Rem),
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::RemAssign => "%=",
        };
        write!(f, "{}", s)
    }
}
