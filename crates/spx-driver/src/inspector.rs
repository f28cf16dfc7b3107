//! Resource reference inspection
//!
//! Runs over a checked package in three passes:
//!
//! 1. the resource root, taken from the `run` calls in the entry file
//! 2. declarations: sound and sprite variables in the entry file's first
//!    `var` block are auto-bound to the resource of the same name
//! 3. usages: every expression whose type (or parameter type, for call
//!    arguments) names a resource is resolved against the catalog
//!
//! Lookup failures become diagnostics on the referring range. Costume and
//! animation names are only checked once their sprite is known.

use rustc_hash::{FxHashMap, FxHashSet};
use spx_ast::*;
use spx_typeck::{CheckedPackage, Mode, ObjectId, Type, TypeAndValue, TypeId};
use tracing::{debug, trace};

use crate::catalog::{CatalogError, ResourceCatalog};
use crate::diagnostic::{Diagnostic, DiagnosticSet};
use crate::program::{NodeTable, SourceFile};
use crate::resource::{RefKind, ResourceId, ResourceKind, ResourceReference, SpriteResource};
use crate::workspace::Workspace;

/// Runtime types that carry a resource name or handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceType {
    BackdropName,
    SpriteName,
    /// The sprite interface, or a sprite class declared in the package
    Sprite,
    SpriteImpl,
    CostumeName,
    AnimationName,
    SoundName,
    Sound,
    WidgetName,
}

impl ResourceType {
    fn from_runtime_name(name: &str) -> Option<Self> {
        let ty = match name {
            "BackdropName" => ResourceType::BackdropName,
            "SpriteName" => ResourceType::SpriteName,
            "Sprite" => ResourceType::Sprite,
            "SpriteImpl" => ResourceType::SpriteImpl,
            "SpriteCostumeName" => ResourceType::CostumeName,
            "SpriteAnimationName" => ResourceType::AnimationName,
            "SoundName" => ResourceType::SoundName,
            "Sound" => ResourceType::Sound,
            "WidgetName" => ResourceType::WidgetName,
            _ => return None,
        };
        Some(ty)
    }
}

/// A successful catalog lookup
enum Found {
    Sprite(SpriteResource),
    Other,
}

impl Found {
    fn into_sprite(self) -> Option<SpriteResource> {
        match self {
            Found::Sprite(sprite) => Some(sprite),
            Found::Other => None,
        }
    }
}

/// What one inspection produced besides diagnostics
#[derive(Debug, Default)]
pub(crate) struct Inspection {
    pub resource_root: String,
    pub references: Vec<ResourceReference>,
    pub sound_bindings: FxHashSet<ObjectId>,
    pub sprite_bindings: FxHashSet<ObjectId>,
}

struct ExprIndex<'ast> {
    exprs: FxHashMap<NodeId, &'ast Node<Expr>>,
}

impl<'ast> Visitor<'ast> for ExprIndex<'ast> {
    fn visit_expr(&mut self, expr: &'ast Node<Expr>) -> bool {
        self.exprs.insert(expr.id, expr);
        true
    }
}

pub(crate) struct Inspector<'a> {
    pkg: &'a CheckedPackage,
    files: &'a [SourceFile],
    nodes: &'a NodeTable,
    exprs: FxHashMap<NodeId, &'a Node<Expr>>,
    entry: FileId,
    first_var_block: Option<Span>,
    workspace: &'a dyn Workspace,
    root: String,
    diagnostics: &'a mut DiagnosticSet,
    references: Vec<ResourceReference>,
    recorded: FxHashSet<(NodeId, RefKind)>,
    sound_bindings: FxHashSet<ObjectId>,
    sprite_bindings: FxHashSet<ObjectId>,
}

impl<'a> Inspector<'a> {
    pub fn new(
        pkg: &'a CheckedPackage,
        files: &'a [SourceFile],
        nodes: &'a NodeTable,
        entry: FileId,
        workspace: &'a dyn Workspace,
        default_root: &str,
        diagnostics: &'a mut DiagnosticSet,
    ) -> Self {
        let mut index = ExprIndex {
            exprs: FxHashMap::default(),
        };
        for file in files.iter().filter(|f| f.included) {
            walk_file(&mut index, &file.ast);
        }
        let first_var_block = files
            .get(entry.0 as usize)
            .and_then(|f| f.ast.first_var_block())
            .map(|decl| decl.span);

        Self {
            pkg,
            files,
            nodes,
            exprs: index.exprs,
            entry,
            first_var_block,
            workspace,
            root: default_root.to_string(),
            diagnostics,
            references: Vec::new(),
            recorded: FxHashSet::default(),
            sound_bindings: FxHashSet::default(),
            sprite_bindings: FxHashSet::default(),
        }
    }

    pub fn run(mut self) -> Inspection {
        self.inspect_resource_root();
        debug!(root = %self.root, "resource root");
        self.inspect_declarations();
        self.inspect_typed_exprs();
        self.inspect_bound_uses();
        self.inspect_implicits();
        self.inspect_sprite_selections();

        let mut references = self.references;
        references.sort_by_key(|r| (r.span.file_id, r.span.start, r.span.end, r.node));
        Inspection {
            resource_root: self.root,
            references,
            sound_bindings: self.sound_bindings,
            sprite_bindings: self.sprite_bindings,
        }
    }

    // =========================================================================
    // Passes
    // =========================================================================

    /// Every `run` call in the entry file, in source order; the last valid
    /// root wins
    fn inspect_resource_root(&mut self) {
        let entry = self.entry;
        let mut runs: Vec<(Span, &'a Node<Expr>)> = self
            .exprs
            .values()
            .copied()
            .filter(|e| e.span.file_id == entry)
            .filter_map(|e| match &e.value {
                Expr::Call { callee, args, .. } => match &callee.value {
                    Expr::Ident(ident) if ident.name == "run" => args.first().map(|arg| (e.span, arg)),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        runs.sort_by_key(|(span, _)| (span.start, span.end));

        for (_, arg) in runs {
            let Some(tv) = self.pkg.info.types.get(&arg.id) else {
                continue;
            };
            let is_string = matches!(
                self.pkg.types.get(tv.ty),
                Type::Basic(kind) if kind.is_string()
            );
            match self.string_name(arg) {
                Some((root, _)) if is_string => {
                    if !root.is_empty() {
                        self.root = root;
                    }
                }
                _ => self.error(arg.span, "first argument of run must be a string literal or constant"),
            }
        }
    }

    fn inspect_declarations(&mut self) {
        let pkg = self.pkg;
        let mut defs: Vec<(NodeId, ObjectId)> = pkg.info.defs.iter().map(|(n, o)| (*n, *o)).collect();
        defs.sort();

        for (node, obj_id) in defs {
            let obj = pkg.objects.get(obj_id);
            if !obj.is_var() || !matches!(pkg.types.get(obj.ty), Type::Named(_)) {
                continue;
            }
            let kind = match self.classify(obj.ty) {
                Some(ResourceType::Sound) => ResourceKind::Sound,
                Some(ResourceType::Sprite) => {
                    if let Some(class) = pkg.class_of_type(obj.ty) {
                        if class.name != obj.name {
                            if let Some(span) = self.nodes.span(node) {
                                self.error(
                                    span,
                                    "sprite resource name must match type name for explicit auto-binding to work",
                                );
                            }
                            continue;
                        }
                    }
                    ResourceKind::Sprite
                }
                _ => continue,
            };
            let Some(span) = self.nodes.span(node) else {
                continue;
            };

            if node.file != self.entry {
                let entry_name = self.entry_name();
                self.warning(
                    span,
                    format!("auto-binding of resources can only happen in {}", entry_name),
                );
                continue;
            }
            if !self.first_var_block.map_or(false, |block| block.contains(span.start)) {
                self.warning(span, "resources must be defined in the first var block for auto-binding");
                continue;
            }

            let id = if kind == ResourceKind::Sound {
                self.sound_bindings.insert(obj_id);
                ResourceId::Sound(obj.name.clone())
            } else {
                self.sprite_bindings.insert(obj_id);
                ResourceId::Sprite(obj.name.clone())
            };
            trace!(name = %obj.name, kind = %kind, "auto-binding");
            self.add_reference(id.clone(), node, span, RefKind::AutoBinding);
            self.lookup(&id, span, None);
        }
    }

    /// Every typed expression, by its own type or, for call arguments, by
    /// the parameter type it is passed as
    fn inspect_typed_exprs(&mut self) {
        let pkg = self.pkg;
        let mut typed: Vec<(&'a Node<Expr>, &'a TypeAndValue)> = pkg
            .info
            .types
            .iter()
            .filter(|(_, tv)| tv.mode != Mode::TypeExpr)
            .filter_map(|(node, tv)| self.exprs.get(node).map(|e| (*e, tv)))
            .collect();
        typed.sort_by_key(|(e, _)| (e.span.file_id, e.span.start, e.span.end, e.id));

        for (expr, tv) in typed {
            match &expr.value {
                Expr::Call { callee, args, .. } => self.inspect_call(expr, callee, args),
                _ => self.inspect_value(expr, tv.ty),
            }
        }
    }

    fn inspect_call(&mut self, call: &Node<Expr>, callee: &Node<Expr>, args: &[Node<Expr>]) {
        let pkg = self.pkg;
        let Some(sig) = pkg.info.types.get(&callee.id).and_then(|tv| pkg.types.signature(tv.ty)) else {
            return;
        };

        let mut sprite = None;
        let on_sprite = sig.recv.map_or(false, |recv| {
            matches!(
                self.classify_runtime(recv),
                Some(ResourceType::Sprite | ResourceType::SpriteImpl)
            )
        });
        if on_sprite {
            sprite = self.inspect_sprite_call(call, callee);
        }

        for (i, arg) in args.iter().enumerate() {
            let Some(param) = pkg.types.param_at(sig, i) else {
                continue;
            };
            match self.classify(param) {
                Some(ResourceType::BackdropName) => {
                    self.inspect_name(arg, ResourceKind::Backdrop, None);
                }
                Some(ty @ (ResourceType::SpriteName | ResourceType::Sprite)) => {
                    self.inspect_sprite_value(arg, ty);
                }
                Some(ResourceType::CostumeName) => {
                    if let Some(sprite) = &sprite {
                        self.inspect_name(arg, ResourceKind::Costume, Some(sprite));
                    }
                }
                Some(ResourceType::AnimationName) => {
                    if let Some(sprite) = &sprite {
                        self.inspect_name(arg, ResourceKind::Animation, Some(sprite));
                    }
                }
                Some(ty @ (ResourceType::SoundName | ResourceType::Sound)) => {
                    self.inspect_sound_value(arg, ty);
                }
                Some(ResourceType::WidgetName) => {
                    self.inspect_name(arg, ResourceKind::Widget, None);
                }
                Some(ResourceType::SpriteImpl) | None => {}
            }
        }
    }

    fn inspect_value(&mut self, expr: &Node<Expr>, ty: TypeId) {
        match self.classify(ty) {
            Some(ResourceType::BackdropName) => {
                self.inspect_name(expr, ResourceKind::Backdrop, None);
            }
            Some(ty @ (ResourceType::SpriteName | ResourceType::Sprite)) => {
                self.inspect_sprite_value(expr, ty);
            }
            Some(ty @ (ResourceType::SoundName | ResourceType::Sound)) => {
                self.inspect_sound_value(expr, ty);
            }
            Some(ResourceType::WidgetName) => {
                self.inspect_name(expr, ResourceKind::Widget, None);
            }
            _ => {}
        }
    }

    /// Identifiers that refer to an auto-bound variable
    fn inspect_bound_uses(&mut self) {
        let pkg = self.pkg;
        let mut uses: Vec<(NodeId, ObjectId)> = pkg.info.uses.iter().map(|(n, o)| (*n, *o)).collect();
        uses.sort();

        for (node, obj_id) in uses {
            let name = &pkg.objects.get(obj_id).name;
            let id = if self.sound_bindings.contains(&obj_id) {
                ResourceId::Sound(name.clone())
            } else if self.sprite_bindings.contains(&obj_id) {
                ResourceId::Sprite(name.clone())
            } else {
                continue;
            };
            let Some(span) = self.nodes.span(node) else {
                continue;
            };
            self.add_reference(id.clone(), node, span, RefKind::AutoBindingReference);
            self.lookup(&id, span, None);
        }
    }

    /// Objects the checker declared without an identifier of their own.
    /// Unnamed imports are the only source in spx; a sprite-typed implicit
    /// over an expression resolves like any other sprite value.
    fn inspect_implicits(&mut self) {
        let pkg = self.pkg;
        let mut implicits: Vec<(NodeId, ObjectId)> = pkg.info.implicits.iter().map(|(n, o)| (*n, *o)).collect();
        implicits.sort();

        for (node, obj_id) in implicits {
            let ty = pkg.objects.get(obj_id).ty;
            if !matches!(
                self.classify(ty),
                Some(ResourceType::Sprite | ResourceType::SpriteImpl)
            ) {
                continue;
            }
            if let Some(expr) = self.exprs.get(&node).copied() {
                self.inspect_sprite_value(expr, ResourceType::Sprite);
            }
        }
    }

    /// `x.f` on a sprite: `x` names the sprite, and `f` may denote one of its
    /// costumes or animations
    fn inspect_sprite_selections(&mut self) {
        let pkg = self.pkg;
        let mut selections: Vec<_> = pkg.info.selections.iter().collect();
        selections.sort_by_key(|(node, _)| **node);

        for (node, sel) in selections {
            let Some(recv) = self.classify(sel.recv) else {
                continue;
            };
            if !matches!(recv, ResourceType::Sprite | ResourceType::SpriteImpl) {
                continue;
            }
            let Some(expr) = self.exprs.get(node).copied() else {
                continue;
            };
            let Expr::Selector { object, .. } = &expr.value else {
                continue;
            };
            let Some(sprite) = self.inspect_sprite_value(object, recv) else {
                continue;
            };
            match self.classify(sel.ty) {
                Some(ResourceType::CostumeName) => {
                    self.inspect_name(expr, ResourceKind::Costume, Some(&sprite));
                }
                Some(ResourceType::AnimationName) => {
                    self.inspect_name(expr, ResourceKind::Animation, Some(&sprite));
                }
                _ => {}
            }
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// The sprite a method call runs on. An unqualified call inside a sprite
    /// file runs on that file's sprite.
    fn inspect_sprite_call(&mut self, call: &Node<Expr>, callee: &Node<Expr>) -> Option<SpriteResource> {
        let (name, span) = match &callee.value {
            Expr::Ident(_) => {
                let file = self.files.get(call.span.file_id.0 as usize)?;
                (file.ast.stem().to_string(), call.span)
            }
            Expr::Selector { object, .. } => match &object.value {
                Expr::Ident(_) => {
                    let obj = self.pkg.info.object_of(object.id)?;
                    if !self.sprite_bindings.contains(&obj) {
                        return None;
                    }
                    let name = self.pkg.objects.get(obj).name.clone();
                    self.add_reference(
                        ResourceId::Sprite(name.clone()),
                        object.id,
                        object.span,
                        RefKind::AutoBindingReference,
                    );
                    (name, object.span)
                }
                _ => {
                    self.warning(call.span, "cannot determine sprite name");
                    return None;
                }
            },
            _ => return None,
        };
        if !self.validate_name(&name, ResourceKind::Sprite, span) {
            return None;
        }
        self.lookup(&ResourceId::Sprite(name), span, None)?.into_sprite()
    }

    fn inspect_sprite_value(&mut self, expr: &Node<Expr>, ty: ResourceType) -> Option<SpriteResource> {
        match ty {
            ResourceType::SpriteName => self.inspect_name(expr, ResourceKind::Sprite, None)?.into_sprite(),
            ResourceType::Sprite => {
                let name = self.bound_name(expr, &self.sprite_bindings)?;
                let id = ResourceId::Sprite(name);
                self.add_reference(id.clone(), expr.id, expr.span, RefKind::AutoBindingReference);
                self.lookup(&id, expr.span, None)?.into_sprite()
            }
            _ => None,
        }
    }

    fn inspect_sound_value(&mut self, expr: &Node<Expr>, ty: ResourceType) {
        match ty {
            ResourceType::SoundName => {
                self.inspect_name(expr, ResourceKind::Sound, None);
            }
            ResourceType::Sound => {
                let Some(name) = self.bound_name(expr, &self.sound_bindings) else {
                    return;
                };
                let id = ResourceId::Sound(name);
                self.add_reference(id.clone(), expr.id, expr.span, RefKind::AutoBindingReference);
                self.lookup(&id, expr.span, None);
            }
            _ => {}
        }
    }

    /// Resolves a resource named by a string literal or string constant.
    /// Costumes and animations need their sprite.
    fn inspect_name(
        &mut self,
        expr: &Node<Expr>,
        kind: ResourceKind,
        sprite: Option<&SpriteResource>,
    ) -> Option<Found> {
        let (name, ref_kind) = self.string_name(expr)?;
        if !self.validate_name(&name, kind, expr.span) {
            return None;
        }
        let id = match kind {
            ResourceKind::Backdrop => ResourceId::Backdrop(name),
            ResourceKind::Sound => ResourceId::Sound(name),
            ResourceKind::Sprite => ResourceId::Sprite(name),
            ResourceKind::Widget => ResourceId::Widget(name),
            ResourceKind::Costume => ResourceId::Costume {
                sprite: sprite?.name.clone(),
                costume: name,
            },
            ResourceKind::Animation => ResourceId::Animation {
                sprite: sprite?.name.clone(),
                animation: name,
            },
        };
        self.add_reference(id.clone(), expr.id, expr.span, ref_kind);
        self.lookup(&id, expr.span, sprite)
    }

    fn lookup(&mut self, id: &ResourceId, span: Span, sprite: Option<&SpriteResource>) -> Option<Found> {
        let catalog = ResourceCatalog::new(self.workspace, self.root.clone());
        let result = match id {
            ResourceId::Backdrop(name) => catalog.backdrop(name).map(|_| Found::Other),
            ResourceId::Sound(name) => catalog.sound(name).map(|_| Found::Other),
            ResourceId::Widget(name) => catalog.widget(name).map(|_| Found::Other),
            ResourceId::Sprite(name) => catalog.sprite(name).map(Found::Sprite),
            ResourceId::Costume { sprite: owner, costume } => {
                if sprite.map_or(false, |s| s.costume(costume).is_some()) {
                    return Some(Found::Other);
                }
                self.error(
                    span,
                    format!("costume resource {:?} not found in sprite {:?}", costume, owner),
                );
                return None;
            }
            ResourceId::Animation { sprite: owner, animation } => {
                if sprite.map_or(false, |s| s.animation(animation).is_some()) {
                    return Some(Found::Other);
                }
                self.error(
                    span,
                    format!("animation resource {:?} not found in sprite {:?}", animation, owner),
                );
                return None;
            }
        };
        match result {
            Ok(found) => Some(found),
            Err(err) => {
                self.lookup_failed(id, span, &err);
                None
            }
        }
    }

    fn lookup_failed(&mut self, id: &ResourceId, span: Span, err: &CatalogError) {
        let message = if err.is_not_found() {
            format!("{} resource {:?} not found", id.kind(), id.name())
        } else {
            format!("failed to get {} resource {:?}: {}", id.kind(), id.name(), err)
        };
        self.error(span, message);
    }

    fn validate_name(&mut self, name: &str, kind: ResourceKind, span: Span) -> bool {
        if name.is_empty() {
            self.error(span, format!("{} resource name cannot be empty", kind));
            return false;
        }
        true
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Name carried by a string literal, or by an identifier denoting a
    /// string constant
    fn string_name(&self, expr: &Node<Expr>) -> Option<(String, RefKind)> {
        match &expr.value {
            Expr::Literal(lit) if lit.kind == LiteralKind::String => {
                Some((lit.value.clone(), RefKind::StringLiteral))
            }
            Expr::Ident(_) => {
                let tv = self.pkg.info.types.get(&expr.id)?;
                let name = tv.const_value()?.as_str()?;
                Some((name.to_string(), RefKind::ConstantReference))
            }
            _ => None,
        }
    }

    /// Name of the auto-bound variable `expr` refers to, if it is one
    fn bound_name(&self, expr: &Node<Expr>, bindings: &FxHashSet<ObjectId>) -> Option<String> {
        let Expr::Ident(_) = &expr.value else {
            return None;
        };
        let obj = self.pkg.info.object_of(expr.id)?;
        bindings
            .contains(&obj)
            .then(|| self.pkg.objects.get(obj).name.clone())
    }

    /// Resource type of `ty`, treating sprite classes as sprites
    fn classify(&self, ty: TypeId) -> Option<ResourceType> {
        if self.is_sprite_class(ty) {
            return Some(ResourceType::Sprite);
        }
        self.classify_runtime(ty)
    }

    fn classify_runtime(&self, ty: TypeId) -> Option<ResourceType> {
        let pkg = self.pkg;
        let obj = pkg.objects.get(pkg.types.named_obj(pkg.types.deref(ty))?);
        if !obj.in_package(&pkg.runtime.path) {
            return None;
        }
        ResourceType::from_runtime_name(&obj.name)
    }

    fn is_sprite_class(&self, ty: TypeId) -> bool {
        self.pkg.class_of_type(ty).map_or(false, |class| !class.is_game)
    }

    fn entry_name(&self) -> String {
        self.files
            .get(self.entry.0 as usize)
            .map(|f| f.path.rsplit('/').next().unwrap_or(&f.path).to_string())
            .unwrap_or_default()
    }

    fn add_reference(&mut self, id: ResourceId, node: NodeId, span: Span, kind: RefKind) {
        if self.recorded.insert((node, kind)) {
            self.references.push(ResourceReference { id, node, span, kind });
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.report(span, |range| Diagnostic::error(range, span, message));
    }

    fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.report(span, |range| Diagnostic::warning(range, span, message));
    }

    fn report(&mut self, span: Span, make: impl FnOnce(Range) -> Diagnostic) {
        let Some(file) = self.files.get(span.file_id.0 as usize) else {
            return;
        };
        let diagnostic = make(file.range_of(span));
        self.diagnostics.add(&file.path, diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use crate::compile::compile;
    use crate::config::EngineConfig;
    use crate::diagnostic::Severity;
    use crate::program::Program;
    use crate::workspace::MapFs;
    use spx_ast::Position;
    use spx_typeck::PkgDataImporter;

    fn build(files: &[(&str, &str)]) -> Program {
        let fs = MapFs::with_files(files.iter().copied());
        compile(&fs, &PkgDataImporter::new(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_last_run_call_sets_root() {
        let program = build(&[("main.spx", "run \"first\"\nrun \"second\"\n")]);
        assert_eq!(program.resource_root(), "second");
        assert!(program.diagnostics_for("main.spx").is_empty());
    }

    #[test]
    fn test_run_with_string_variable_is_an_error() {
        let program = build(&[("main.spx", "var (\n\tfolder string\n)\n\nrun folder\n")]);
        let diags = program.diagnostics_for("main.spx");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].message, "first argument of run must be a string literal or constant");
        assert_eq!(diags[0].range.start, Position::new(4, 4));
        assert_eq!(diags[0].range.end, Position::new(4, 10));
        assert_eq!(program.resource_root(), "assets");
    }

    #[test]
    fn test_run_with_constant_root() {
        let program = build(&[("main.spx", "const dir = \"media\"\n\nrun dir\n")]);
        assert_eq!(program.resource_root(), "media");
        assert!(program.diagnostics_for("main.spx").is_empty());
    }

    #[test]
    fn test_unnamed_import_is_implicit_and_not_a_resource() {
        let program = build(&[("main.spx", "import \"fmt\"\n\nfmt.println \"hi\"\n")]);
        let pkg = program.package().unwrap();
        assert_eq!(pkg.info.implicits.len(), 1);
        assert!(program.resource_references().is_empty());
        assert!(program.diagnostics_for("main.spx").is_empty());
    }
}
