//! Type expression definitions for the AST

use super::*;

/// Type expression as written in source or export data
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Named type: int, Sound, Bullet
    Name(Ident),

    /// Package-qualified type: spx.Sound
    Qualified {
        pkg: Node<Ident>,
        name: Node<Ident>,
    },

    /// Pointer type: *T
    Pointer(Box<Node<TypeExpr>>),

    /// Slice type: []T
    Slice(Box<Node<TypeExpr>>),

    /// Map type: map[K]V
    Map {
        key: Box<Node<TypeExpr>>,
        value: Box<Node<TypeExpr>>,
    },

    /// Function type: func(params) results
    Func(FuncSig),

    /// Struct type: struct { fields }
    Struct(Vec<Node<FieldDecl>>),

    /// Interface type: interface { methods }
    Interface(Vec<Node<MethodSpec>>),
}

/// Function signature shared by declarations, literals and func types
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncSig {
    pub params: Vec<Node<Param>>,
    pub results: Vec<Node<Param>>,
}

impl FuncSig {
    /// Number of declared parameters after expanding grouped names
    pub fn param_count(&self) -> usize {
        self.params.iter().map(|p| p.value.names.len().max(1)).sum()
    }
}

/// Parameter group: `a, b int`, `name SoundName`, unnamed `int`, or `args ...any`
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub names: Vec<Node<Ident>>,
    pub ty: Node<TypeExpr>,
    pub variadic: bool,
}

/// Struct field group; `names` is empty for an embedded field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub names: Vec<Node<Ident>>,
    pub ty: Node<TypeExpr>,
}

impl FieldDecl {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

/// Interface method specification
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSpec {
    pub name: Node<Ident>,
    pub sig: Node<FuncSig>,
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Name(ident) => write!(f, "{}", ident),
            TypeExpr::Qualified { pkg, name } => write!(f, "{}.{}", pkg.value, name.value),
            TypeExpr::Pointer(elem) => write!(f, "*{}", elem.value),
            TypeExpr::Slice(elem) => write!(f, "[]{}", elem.value),
            TypeExpr::Map { key, value } => write!(f, "map[{}]{}", key.value, value.value),
            TypeExpr::Func(sig) => write!(f, "func{}", sig),
            TypeExpr::Struct(fields) => {
                if fields.is_empty() {
                    write!(f, "struct{{}}")
                } else {
                    write!(f, "struct{{...}}")
                }
            }
            TypeExpr::Interface(methods) => {
                if methods.is_empty() {
                    write!(f, "interface{{}}")
                } else {
                    write!(f, "interface{{...}}")
                }
            }
        }
    }
}

impl fmt::Display for FuncSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.value)?;
        }
        write!(f, ")")?;
        match self.results.len() {
            0 => Ok(()),
            1 if self.results[0].value.names.is_empty() => write!(f, " {}", self.results[0].value),
            _ => {
                write!(f, " (")?;
                for (i, result) in self.results.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", result.value)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", name.value)?;
        }
        if !self.names.is_empty() {
            write!(f, " ")?;
        }
        if self.variadic {
            write!(f, "...")?;
        }
        write!(f, "{}", self.ty.value)
    }
}
