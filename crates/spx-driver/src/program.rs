//! The compiled program and its side tables

use rustc_hash::{FxHashMap, FxHashSet};
use spx_ast::*;
use spx_typeck::{CheckedPackage, ObjectId};

use crate::diagnostic::DiagnosticSet;
use crate::resource::ResourceReference;

/// One workspace source file, parsed
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: String,
    pub text: String,
    pub ast: File,
    pub lines: LineIndex,
    /// Part of the checked program: right package and no syntax errors
    pub included: bool,
}

impl SourceFile {
    pub fn range_of(&self, span: Span) -> Range {
        self.lines.range_of(span)
    }

    /// Zero-width range at the start of `span`
    pub fn point_range(&self, span: Span) -> Range {
        let pos = self.lines.position_of(span.start);
        Range::new(pos, pos)
    }
}

/// Node spans and ownership, indexed by node id
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    spans: FxHashMap<NodeId, Span>,
    /// Identifier occurrences per file, in source order
    idents: FxHashMap<FileId, Vec<(NodeId, Span)>>,
    /// Value spec to the `var`/`const` declaration holding it
    spec_decls: FxHashMap<NodeId, NodeId>,
}

impl NodeTable {
    pub fn build(files: &[SourceFile]) -> Self {
        let mut table = NodeTable::default();
        for file in files.iter().filter(|f| f.included) {
            walk_file(&mut table, &file.ast);
        }
        for idents in table.idents.values_mut() {
            idents.sort_by_key(|(id, span)| (span.start, span.end, *id));
        }
        table
    }

    pub fn span(&self, node: NodeId) -> Option<Span> {
        self.spans.get(&node).copied()
    }

    /// Identifiers of `file` whose span contains `offset`, innermost last
    pub fn idents_at(&self, file: FileId, offset: usize) -> impl Iterator<Item = (NodeId, Span)> + '_ {
        self.idents
            .get(&file)
            .into_iter()
            .flatten()
            .filter(move |(_, span)| span.contains(offset))
            .copied()
    }

    pub fn enclosing_decl(&self, spec: NodeId) -> Option<NodeId> {
        self.spec_decls.get(&spec).copied()
    }

    fn ident(&mut self, id: NodeId, span: Span) {
        self.spans.insert(id, span);
        self.idents.entry(span.file_id).or_default().push((id, span));
    }

    fn gen_decl(&mut self, owner: NodeId, gen: &GenDecl) {
        for spec in &gen.specs {
            self.spans.insert(spec.id, spec.span);
            self.spec_decls.insert(spec.id, owner);
        }
    }
}

impl<'ast> Visitor<'ast> for NodeTable {
    fn visit_decl(&mut self, decl: &'ast Node<Decl>) -> bool {
        self.spans.insert(decl.id, decl.span);
        if let Decl::Var(gen) | Decl::Const(gen) = &decl.value {
            self.gen_decl(decl.id, gen);
        }
        true
    }

    fn visit_stmt(&mut self, stmt: &'ast Node<Stmt>) -> bool {
        self.spans.insert(stmt.id, stmt.span);
        if let Stmt::Var(gen) | Stmt::Const(gen) = &stmt.value {
            self.gen_decl(stmt.id, gen);
        }
        true
    }

    fn visit_expr(&mut self, expr: &'ast Node<Expr>) -> bool {
        if let Expr::Ident(_) = expr.value {
            self.ident(expr.id, expr.span);
        } else {
            self.spans.insert(expr.id, expr.span);
        }
        true
    }

    fn visit_type(&mut self, ty: &'ast Node<TypeExpr>) -> bool {
        if let TypeExpr::Name(_) = ty.value {
            self.ident(ty.id, ty.span);
        } else {
            self.spans.insert(ty.id, ty.span);
        }
        true
    }

    fn visit_ident(&mut self, ident: &'ast Node<Ident>) {
        self.ident(ident.id, ident.span);
    }
}

/// Everything known about one workspace after a compile. Immutable once built.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) files: Vec<SourceFile>,
    pub(crate) entry: Option<FileId>,
    pub(crate) first_var_block: Option<NodeId>,
    pub(crate) nodes: NodeTable,
    pub(crate) package: Option<CheckedPackage>,
    pub(crate) resource_root: String,
    pub(crate) references: Vec<ResourceReference>,
    pub(crate) sound_bindings: FxHashSet<ObjectId>,
    pub(crate) sprite_bindings: FxHashSet<ObjectId>,
    pub(crate) diagnostics: DiagnosticSet,
}

impl Program {
    /// All listed source files, including excluded ones
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Files that took part in type checking
    pub fn included_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter().filter(|f| f.included)
    }

    pub fn file(&self, path: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn file_by_id(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize).filter(|f| f.id == id)
    }

    pub fn entry_file(&self) -> Option<&SourceFile> {
        self.entry.and_then(|id| self.file_by_id(id))
    }

    /// The entry file's first top-level `var` declaration
    pub fn first_var_block(&self) -> Option<NodeId> {
        self.first_var_block
    }

    /// Symbol tables; `None` when no entry file was found
    pub fn package(&self) -> Option<&CheckedPackage> {
        self.package.as_ref()
    }

    pub fn resource_root(&self) -> &str {
        &self.resource_root
    }

    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    /// Whether `obj` was auto-bound to a sound or sprite
    pub fn is_auto_bound(&self, obj: ObjectId) -> bool {
        self.sound_bindings.contains(&obj) || self.sprite_bindings.contains(&obj)
    }

    pub fn sound_bindings(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.sound_bindings.iter().copied()
    }

    pub fn sprite_bindings(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.sprite_bindings.iter().copied()
    }

    pub fn diagnostic_set(&self) -> &DiagnosticSet {
        &self.diagnostics
    }

    /// Range of `span` in its file
    pub fn range_of(&self, span: Span) -> Option<Range> {
        self.file_by_id(span.file_id).map(|f| f.range_of(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spx_parser::parse_file;

    fn source(path: &str, text: &str) -> SourceFile {
        let (ast, errors) = parse_file(FileId(0), path, text);
        assert!(errors.is_empty(), "{:?}", errors);
        SourceFile {
            id: FileId(0),
            path: path.to_string(),
            text: text.to_string(),
            ast,
            lines: LineIndex::new(text),
            included: true,
        }
    }

    #[test]
    fn test_spec_decls_and_spans() {
        let file = source("main.spx", "var (\n\ta int\n\tb string\n)\nonStart => {\n\tvar c int\n\tc = a\n}\n");
        let table = NodeTable::build(std::slice::from_ref(&file));

        let Decl::Var(gen) = &file.ast.decls[0].value else {
            panic!("expected var block");
        };
        for spec in &gen.specs {
            assert_eq!(table.enclosing_decl(spec.id), Some(file.ast.decls[0].id));
        }
        let a = &gen.specs[0].value.names[0];
        assert_eq!(table.span(a.id), Some(a.span));
    }

    #[test]
    fn test_idents_at_offset() {
        let text = "var score int\nscore = score + 1\n";
        let file = source("main.spx", text);
        let table = NodeTable::build(std::slice::from_ref(&file));
        let offset = text.rfind("score").unwrap() + 2;
        let hits: Vec<Span> = table.idents_at(FileId(0), offset).map(|(_, span)| span).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(&text[hits[0].start..hits[0].end], "score");
    }
}
