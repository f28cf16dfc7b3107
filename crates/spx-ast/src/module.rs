//! Source file definitions

use super::*;

/// Import specification: `import "fmt"` or `import m "math"`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    pub name: Option<Node<Ident>>,
    pub path: String,
    pub path_span: Span,
}

/// One parsed source file
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub id: FileId,
    pub path: String,
    pub package: Option<Node<Ident>>,
    pub imports: Vec<Node<ImportSpec>>,
    pub decls: Vec<Node<Decl>>,
    pub span: Span,
}

impl File {
    /// Declared package name, `main` when the clause is omitted
    pub fn package_name(&self) -> &str {
        self.package
            .as_ref()
            .map(|p| p.value.name.as_str())
            .unwrap_or("main")
    }

    /// Base name without directories or the `.spx` extension
    pub fn stem(&self) -> &str {
        let base = self.path.rsplit('/').next().unwrap_or(&self.path);
        base.strip_suffix(".spx").unwrap_or(base)
    }

    /// The first top-level `var` declaration in source order
    pub fn first_var_block(&self) -> Option<&Node<Decl>> {
        self.decls.iter().find(|d| matches!(d.value, Decl::Var(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_file(path: &str) -> File {
        File {
            id: FileId(0),
            path: path.to_string(),
            package: None,
            imports: Vec::new(),
            decls: Vec::new(),
            span: Span::default(),
        }
    }

    #[test]
    fn test_stem_strips_dirs_and_extension() {
        assert_eq!(empty_file("project/Bullet.spx").stem(), "Bullet");
        assert_eq!(empty_file("main.spx").stem(), "main");
    }

    #[test]
    fn test_package_defaults_to_main() {
        assert_eq!(empty_file("main.spx").package_name(), "main");
    }
}
