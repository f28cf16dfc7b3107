//! Declaration definitions for the AST

use super::*;

/// Top-level declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// var x T / var ( ... )
    Var(GenDecl),

    /// const x = 1 / const ( ... )
    Const(GenDecl),

    /// type T struct { ... }
    Type(Vec<Node<TypeSpec>>),

    /// func name(params) results { ... }
    Func(FuncDecl),

    /// Statement at file level; part of the class's implicit body
    Stmt(Node<Stmt>),
}

/// `var` or `const` declaration, single or parenthesized
#[derive(Debug, Clone, PartialEq)]
pub struct GenDecl {
    pub specs: Vec<Node<ValueSpec>>,
    pub grouped: bool,
}

/// One line of a var/const declaration: `a, b T = x, y`
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<Node<Ident>>,
    pub ty: Option<Node<TypeExpr>>,
    pub values: Vec<Node<Expr>>,
}

/// Type declaration: `type Name T` or alias `type Name = T`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub name: Node<Ident>,
    pub ty: Node<TypeExpr>,
    pub alias: bool,
}

/// Function declaration; inside a class file every function is a method
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: Node<Ident>,
    pub sig: Node<FuncSig>,
    pub body: Option<Node<Block>>,
}
