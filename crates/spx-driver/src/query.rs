//! Read-only queries against a compiled [`Program`]

use serde::Serialize;
use spx_ast::{FileId, NodeId, Position, Range, Span};
use spx_typeck::{CheckedPackage, ObjectId, ScopeId, Type, TypeId};
use std::collections::BTreeMap;

use crate::diagnostic::Diagnostic;
use crate::program::{Program, SourceFile};
use crate::resource::{ResourceId, ResourceReference};

/// A range within one workspace file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub path: String,
    pub range: Range,
}

impl Program {
    /// The innermost identifier at `position` that denotes an object
    pub fn identifier_and_object_at(&self, path: &str, position: Position) -> Option<(NodeId, ObjectId)> {
        let pkg = self.package.as_ref()?;
        let (file, offset) = self.offset_in(path, position)?;
        self.nodes
            .idents_at(file.id, offset)
            .filter_map(|(node, span)| pkg.info.object_of(node).map(|obj| (node, span, obj)))
            .min_by_key(|(_, span, _)| span.len())
            .map(|(node, _, obj)| (node, obj))
    }

    /// Where `obj` is declared, if that is in one of the checked files
    pub fn definition_site_of(&self, obj: ObjectId) -> Option<Location> {
        let pkg = self.package.as_ref()?;
        let object = pkg.objects.get(obj);
        if let Some(location) = object.decl.and_then(|node| self.location_of(node)) {
            return Some(location);
        }
        let span = object.span?;
        self.location_of_span(span)
    }

    /// Every identifier that declares or uses `obj`, declarations first
    pub fn references_to(&self, obj: ObjectId) -> Vec<Location> {
        let Some(pkg) = self.package.as_ref() else {
            return Vec::new();
        };
        pkg.info
            .references_to(obj)
            .into_iter()
            .filter_map(|node| self.location_of(node))
            .collect()
    }

    /// The innermost scope containing `position`, or the file scope
    pub fn innermost_scope_at(&self, path: &str, position: Position) -> Option<ScopeId> {
        let pkg = self.package.as_ref()?;
        let (file, offset) = self.offset_in(path, position)?;
        pkg.scopes
            .innermost_at(file.id, offset)
            .or_else(|| pkg.file_scopes.get(&file.id).copied())
    }

    /// The smallest resource reference whose range contains `position`
    pub fn resource_reference_at(&self, path: &str, position: Position) -> Option<&ResourceReference> {
        let (file, offset) = self.offset_in(path, position)?;
        self.references
            .iter()
            .filter(|r| r.span.file_id == file.id && r.span.contains(offset))
            .min_by_key(|r| r.span.len())
    }

    /// All resource references, in source order
    pub fn resource_references(&self) -> &[ResourceReference] {
        &self.references
    }

    pub fn references_to_resource(&self, id: &ResourceId) -> Vec<&ResourceReference> {
        self.references.iter().filter(|r| &r.id == id).collect()
    }

    pub fn diagnostics(&self) -> &BTreeMap<String, Vec<Diagnostic>> {
        self.diagnostics.by_file()
    }

    pub fn diagnostics_for(&self, path: &str) -> &[Diagnostic] {
        self.diagnostics.for_file(path)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Name of the type owning the member that `ident` denotes, so members
    /// sharing a name on different types can be told apart. The runtime's
    /// sprite implementation type is reported as `Sprite`.
    pub fn selector_type_name_for(&self, ident: NodeId) -> Option<String> {
        let pkg = self.package.as_ref()?;
        let obj = pkg.info.object_of(ident)?;
        if let Some(name) = owner_type_name(pkg, obj) {
            return Some(name);
        }
        // Unqualified use of a class member
        let class_ty = *pkg.info.class_members.get(&ident)?;
        pkg.class_of_type(class_ty).map(|class| class.name.clone())
    }

    fn offset_in(&self, path: &str, position: Position) -> Option<(&SourceFile, usize)> {
        let file = self.file(path)?;
        let offset = file.lines.offset_of(position)?;
        Some((file, offset))
    }

    fn location_of(&self, node: NodeId) -> Option<Location> {
        if node.file == FileId::EXTERNAL {
            return None;
        }
        self.location_of_span(self.nodes.span(node)?)
    }

    fn location_of_span(&self, span: Span) -> Option<Location> {
        let file = self.file_by_id(span.file_id)?;
        Some(Location {
            path: file.path.clone(),
            range: file.range_of(span),
        })
    }
}

/// Named type declaring the field or method `obj`
fn owner_type_name(pkg: &CheckedPackage, obj: ObjectId) -> Option<String> {
    let object = pkg.objects.get(obj);
    let owner = if object.is_func() {
        let recv = pkg.types.signature(object.ty)?.recv?;
        pkg.types.deref(recv)
    } else if object.is_field() {
        field_owner(pkg, obj)?
    } else {
        return None;
    };

    if pkg.is_runtime_type(owner, "SpriteImpl") {
        return Some("Sprite".to_string());
    }
    if let Some(class) = pkg.class_of_type(owner) {
        return Some(class.name.clone());
    }
    pkg.type_name(owner).map(str::to_string)
}

fn field_owner(pkg: &CheckedPackage, field: ObjectId) -> Option<TypeId> {
    (0..pkg.types.len() as u32)
        .map(TypeId)
        .filter(|ty| matches!(pkg.types.get(*ty), Type::Named(_)))
        .find(|ty| match pkg.types.get(pkg.types.underlying(*ty)) {
            Type::Struct(fields) => fields.contains(&field),
            _ => false,
        })
}

#[cfg(test)]
mod tests {
    use crate::compile::compile;
    use crate::config::EngineConfig;
    use crate::program::Program;
    use crate::workspace::MapFs;
    use spx_ast::Position;
    use spx_typeck::PkgDataImporter;

    fn build(files: &[(&str, &str)]) -> Program {
        let fs = MapFs::with_files(files.iter().copied());
        compile(&fs, &PkgDataImporter::new(), &EngineConfig::default()).unwrap()
    }

    /// Position of the `nth` occurrence of `needle`, plus `delta` characters
    fn pos_of(text: &str, needle: &str, nth: usize, delta: u32) -> Position {
        let offset = text.match_indices(needle).nth(nth).unwrap().0;
        let line = text[..offset].matches('\n').count() as u32;
        let col = (offset - text[..offset].rfind('\n').map_or(0, |i| i + 1)) as u32;
        Position::new(line, col + delta)
    }

    const MAIN: &str = "var (\n\tscore int\n)\n\nfunc bump(n int) {\n\tscore = score + n\n}\n\nonStart => {\n\tbump 2\n}\n";

    #[test]
    fn test_identifier_definition_and_references() {
        let program = build(&[("main.spx", MAIN)]);
        let (_, obj) = program
            .identifier_and_object_at("main.spx", pos_of(MAIN, "score", 2, 1))
            .unwrap();

        let def = program.definition_site_of(obj).unwrap();
        assert_eq!(def.path, "main.spx");
        assert_eq!(def.range.start, Position::new(1, 1));

        let refs = program.references_to(obj);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0], def);
    }

    #[test]
    fn test_whitespace_has_no_identifier() {
        let program = build(&[("main.spx", MAIN)]);
        assert!(program
            .identifier_and_object_at("main.spx", Position::new(3, 0))
            .is_none());
        assert!(program
            .identifier_and_object_at("missing.spx", Position::new(0, 0))
            .is_none());
    }

    #[test]
    fn test_innermost_scope_narrows_inside_body() {
        let program = build(&[("main.spx", MAIN)]);
        let top_scope = program.innermost_scope_at("main.spx", Position::new(0, 0)).unwrap();
        let body_scope = program
            .innermost_scope_at("main.spx", pos_of(MAIN, "score = ", 0, 0))
            .unwrap();
        assert_ne!(top_scope, body_scope);

        let pkg = program.package().unwrap();
        let n = pkg.scopes.lookup(body_scope, "n");
        assert!(n.is_some());
        assert!(pkg.scopes.lookup(top_scope, "n").is_none());
    }

    #[test]
    fn test_selector_type_name_for_runtime_and_class_members() {
        let hero = "onStart => {\n\tturn 90\n}\n";
        let program = build(&[("main.spx", MAIN), ("Hero.spx", hero)]);

        let (ident, _) = program
            .identifier_and_object_at("Hero.spx", pos_of(hero, "turn", 0, 0))
            .unwrap();
        assert_eq!(program.selector_type_name_for(ident).as_deref(), Some("Sprite"));

        let (ident, _) = program
            .identifier_and_object_at("main.spx", pos_of(MAIN, "bump", 1, 0))
            .unwrap();
        assert_eq!(program.selector_type_name_for(ident).as_deref(), Some("main"));
    }
}
