//! Main type checker struct, universe and imported packages

use rustc_hash::FxHashMap;
use spx_ast::{File, FileId, NodeId, Span};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{CheckError, ImportError, TypeError};
use crate::importer::{Classfile, ExportPackage, Importer, BUILTIN_PKG_PATH, SPX_PKG_PATH};
use crate::info::{Mode, TypeInfo};
use crate::objects::{BuiltinKind, Object, ObjectId, ObjectKind, ObjectTable, PkgRef};
use crate::scope::{ScopeId, ScopeKind, ScopeTable};
use crate::types::{BasicKind, Type, TypeId, TypeTable};

/// The class a source file compiles to
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub file: FileId,
    pub name: String,
    pub obj: ObjectId,
    pub ty: TypeId,
    /// The entry file's class, embedding the game base type
    pub is_game: bool,
}

/// Everything a check produces. Symbol tables are partial when the source
/// has errors but remain usable.
#[derive(Debug, Clone)]
pub struct CheckedPackage {
    pub types: TypeTable,
    pub objects: ObjectTable,
    pub scopes: ScopeTable,
    pub info: TypeInfo,
    pub runtime: PkgRef,
    pub classfile: Classfile,
    pub classes: Vec<ClassInfo>,
    pub universe: ScopeId,
    pub package_scope: ScopeId,
    pub runtime_scope: ScopeId,
    pub file_scopes: FxHashMap<FileId, ScopeId>,
}

impl CheckedPackage {
    pub fn class_of_file(&self, file: FileId) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.file == file)
    }

    pub fn class_of_type(&self, ty: TypeId) -> Option<&ClassInfo> {
        let ty = self.types.deref(ty);
        self.classes.iter().find(|c| c.ty == ty)
    }

    /// Named type exported by the runtime package
    pub fn runtime_type(&self, name: &str) -> Option<TypeId> {
        let obj = self.scopes.get(self.runtime_scope).lookup(name)?;
        let obj = self.objects.get(obj);
        matches!(obj.kind, ObjectKind::TypeName).then_some(obj.ty)
    }

    /// Whether `ty` (through one pointer) is the runtime type `name`
    pub fn is_runtime_type(&self, ty: TypeId, name: &str) -> bool {
        self.runtime_type(name) == Some(self.types.deref(ty))
    }

    /// Name of `ty` if it is a named type, without package qualifier
    pub fn type_name(&self, ty: TypeId) -> Option<&str> {
        let obj = self.types.named_obj(self.types.deref(ty))?;
        Some(&self.objects.get(obj).name)
    }

    pub fn type_string(&self, ty: TypeId) -> String {
        self.types.display(ty, &self.objects)
    }
}

/// Per-function checking context
#[derive(Debug, Clone)]
pub(crate) struct FuncCtx {
    pub file: FileId,
    pub class: Option<usize>,
    /// Innermost open scope
    pub scope: ScopeId,
    /// Outermost scope of the enclosing method body; locals end here
    pub func_scope: ScopeId,
    /// Result types of the enclosing function, if known
    pub results: Option<Vec<TypeId>>,
}

/// Whole-package type checker
pub struct TypeChecker<'a> {
    pub(crate) types: TypeTable,
    pub(crate) objects: ObjectTable,
    pub(crate) scopes: ScopeTable,
    pub(crate) info: TypeInfo,
    importer: &'a dyn Importer,
    on_error: &'a mut dyn FnMut(TypeError),
    pub(crate) universe: ScopeId,
    pub(crate) package_scope: ScopeId,
    pub(crate) runtime_scope: ScopeId,
    pub(crate) runtime: PkgRef,
    pub(crate) classfile: Classfile,
    pub(crate) file_scopes: FxHashMap<FileId, ScopeId>,
    /// Imported packages by path: reference and package scope
    pub(crate) packages: FxHashMap<String, (PkgRef, ScopeId)>,
    pub(crate) classes: Vec<ClassInfo>,
    pub(crate) game_class: Option<usize>,
    pub(crate) ctx: FuncCtx,
}

impl<'a> TypeChecker<'a> {
    /// Prepares the universe and the runtime package. Fails if the runtime
    /// cannot be imported or carries no classfile descriptor.
    pub fn new(importer: &'a dyn Importer, on_error: &'a mut dyn FnMut(TypeError)) -> Result<Self, CheckError> {
        let mut scopes = ScopeTable::new();
        let universe = scopes.push(ScopeKind::Universe, None, None);
        let package_scope = scopes.push(ScopeKind::Package, Some(universe), None);

        let runtime_data = importer.import(SPX_PKG_PATH)?;
        let classfile = runtime_data
            .classfile
            .clone()
            .ok_or_else(|| CheckError::MissingClassfile(SPX_PKG_PATH.to_string()))?;

        let mut checker = Self {
            types: TypeTable::new(),
            objects: ObjectTable::new(),
            scopes,
            info: TypeInfo::new(),
            importer,
            on_error,
            universe,
            package_scope,
            runtime_scope: universe,
            runtime: PkgRef::new(SPX_PKG_PATH, runtime_data.name.clone()),
            classfile,
            file_scopes: FxHashMap::default(),
            packages: FxHashMap::default(),
            classes: Vec::new(),
            game_class: None,
            ctx: FuncCtx {
                file: FileId::EXTERNAL,
                class: None,
                scope: package_scope,
                func_scope: package_scope,
                results: None,
            },
        };

        checker.build_universe()?;
        let (_, runtime_scope) = checker.install_package(&runtime_data);
        checker.runtime_scope = runtime_scope;
        Ok(checker)
    }

    /// Checks the package formed by `files`; `entry` is the game class file
    pub fn check(mut self, files: &[&File], entry: FileId) -> CheckedPackage {
        debug!(files = files.len(), "type checking package");
        self.collect_package(files, entry);
        self.check_bodies(files);
        self.finish()
    }

    fn finish(self) -> CheckedPackage {
        CheckedPackage {
            types: self.types,
            objects: self.objects,
            scopes: self.scopes,
            info: self.info,
            runtime: self.runtime,
            classfile: self.classfile,
            classes: self.classes,
            universe: self.universe,
            package_scope: self.package_scope,
            runtime_scope: self.runtime_scope,
            file_scopes: self.file_scopes,
        }
    }

    // =========================================================================
    // Errors
    // =========================================================================

    pub(crate) fn error(&mut self, span: Span, message: impl Into<String>) {
        let err = TypeError::new(message, span);
        if span.file_id == FileId::EXTERNAL {
            // Export data is trusted; a failure here is a bug in the data
            warn!(%err, "type error in export data");
            return;
        }
        (self.on_error)(err);
    }

    // =========================================================================
    // Universe and packages
    // =========================================================================

    fn build_universe(&mut self) -> Result<(), CheckError> {
        for kind in [
            BasicKind::Bool,
            BasicKind::Int,
            BasicKind::Int64,
            BasicKind::Float64,
            BasicKind::String,
        ] {
            let ty = TypeTable::basic(kind);
            self.declare_universe(kind.name(), ObjectKind::TypeName, ty);
        }
        self.declare_universe("nil", ObjectKind::Nil, TypeTable::basic(BasicKind::UntypedNil));
        self.declare_universe("len", ObjectKind::Builtin(BuiltinKind::Len), TypeTable::INVALID);
        self.declare_universe("println", ObjectKind::Builtin(BuiltinKind::Println), TypeTable::INVALID);

        let builtin = self.importer.import(BUILTIN_PKG_PATH)?;
        let universe = self.universe;
        self.populate_scope(&builtin, universe, None);
        Ok(())
    }

    fn declare_universe(&mut self, name: &str, kind: ObjectKind, ty: TypeId) {
        let obj = self.objects.alloc(Object {
            name: name.to_string(),
            kind,
            ty,
            pkg: None,
            decl: None,
            span: None,
        });
        let universe = self.universe;
        let _ = self.scopes.insert(universe, name, obj);
    }

    /// Makes an imported package available, loading it on first use
    pub(crate) fn load_package(&mut self, path: &str) -> Result<(PkgRef, ScopeId), ImportError> {
        if let Some(loaded) = self.packages.get(path) {
            return Ok(loaded.clone());
        }
        let data = self.importer.import(path)?;
        Ok(self.install_package(&data))
    }

    fn install_package(&mut self, data: &Arc<ExportPackage>) -> (PkgRef, ScopeId) {
        if let Some(loaded) = self.packages.get(&data.path) {
            return loaded.clone();
        }
        let pkg = PkgRef::new(data.path.clone(), data.name.clone());
        let scope = self.scopes.push(ScopeKind::Package, Some(self.universe), None);
        self.packages.insert(data.path.clone(), (pkg.clone(), scope));
        self.populate_scope(data, scope, Some(pkg.clone()));
        (pkg, scope)
    }

    /// Declares the objects of `data` into `scope`
    fn populate_scope(&mut self, data: &ExportPackage, scope: ScopeId, pkg: Option<PkgRef>) {
        let new_object = |name: &str, kind: ObjectKind, ty: TypeId| Object {
            name: name.to_string(),
            kind,
            ty,
            pkg: pkg.clone(),
            decl: None,
            span: None,
        };

        // Type names first so declarations may refer to each other
        let mut named = Vec::with_capacity(data.types.len());
        for export in &data.types {
            let obj = self.objects.alloc(new_object(&export.name, ObjectKind::TypeName, TypeTable::INVALID));
            if !export.alias {
                let ty = self.types.new_named(obj);
                self.objects.get_mut(obj).ty = ty;
            }
            let _ = self.scopes.insert(scope, &export.name, obj);
            named.push(obj);
        }

        for (export, obj) in data.types.iter().zip(&named) {
            let resolved = self.resolve_type(&export.ty, scope);
            if export.alias {
                self.objects.get_mut(*obj).ty = resolved;
                continue;
            }
            let ty = self.objects.get(*obj).ty;
            self.types.set_underlying(ty, resolved);
            self.bind_interface_methods(ty);
        }

        for (export, obj) in data.types.iter().zip(&named) {
            let recv = self.objects.get(*obj).ty;
            for method in &export.methods {
                let sig = self.resolve_signature(&method.sig, scope, Some(recv));
                let sig_ty = self.types.alloc(Type::Func(sig));
                let func = self.objects.alloc(new_object(&method.name, ObjectKind::Func, sig_ty));
                self.add_method(recv, func);
            }
        }

        for export in &data.consts {
            let ty = match &export.ty {
                Some(ty) => self.resolve_type(ty, scope),
                None => TypeTable::basic(export.value.untyped_kind()),
            };
            let obj = self.objects.alloc(new_object(&export.name, ObjectKind::Const(export.value.clone()), ty));
            let _ = self.scopes.insert(scope, &export.name, obj);
        }

        for export in &data.vars {
            let ty = self.resolve_type(&export.ty, scope);
            let obj = self.objects.alloc(new_object(&export.name, ObjectKind::Var, ty));
            let _ = self.scopes.insert(scope, &export.name, obj);
        }

        for export in &data.funcs {
            let sig = self.resolve_signature(&export.sig, scope, None);
            let sig_ty = self.types.alloc(Type::Func(sig));
            let func = self.objects.alloc(new_object(&export.name, ObjectKind::Func, sig_ty));
            let existing = self.scopes.get(scope).lookup(&export.name);
            let bound = self.objects.merge_overload(existing, func);
            self.scopes.replace(scope, &export.name, bound);
        }
    }

    /// Adds a method to a named type, collecting repeated names into an overload set
    pub(crate) fn add_method(&mut self, named: TypeId, func: ObjectId) -> bool {
        let name = self.objects.get(func).name.clone();
        let existing = self
            .types
            .methods(named)
            .iter()
            .position(|m| self.objects.get(*m).name == name);
        match existing {
            None => {
                self.types.add_method(named, func);
                true
            }
            Some(index) => {
                let current = self.types.methods(named)[index];
                let merged = self.objects.merge_overload(Some(current), func);
                self.types.replace_method(named, index, merged);
                false
            }
        }
    }

    /// Interface methods of a named interface get the interface as receiver
    pub(crate) fn bind_interface_methods(&mut self, named: TypeId) {
        let underlying = self.types.underlying(named);
        let Type::Interface(methods) = self.types.get(underlying).clone() else {
            return;
        };
        for method in methods {
            let ty = self.objects.get(method).ty;
            if let Type::Func(sig) = self.types.get(ty).clone() {
                let bound = self.types.alloc(Type::Func(crate::types::Signature {
                    recv: Some(named),
                    ..sig
                }));
                self.objects.get_mut(method).ty = bound;
            }
        }
    }

    // =========================================================================
    // Name lookup
    // =========================================================================

    /// Resolves `name` from `scope` outward. The runtime package is
    /// dot-imported into checked source, between package and universe.
    pub(crate) fn lookup_name(&self, scope: ScopeId, name: &str) -> Option<ObjectId> {
        let mut current = Some(scope);
        let mut in_source = false;
        while let Some(id) = current {
            if id == self.package_scope {
                in_source = true;
            }
            if id == self.universe && in_source {
                if let Some(obj) = self.scopes.get(self.runtime_scope).lookup(name) {
                    return Some(obj);
                }
            }
            if let Some(obj) = self.scopes.get(id).lookup(name) {
                return Some(obj);
            }
            current = self.scopes.get(id).parent;
        }
        None
    }

    pub(crate) fn open_scope(&mut self, kind: ScopeKind, span: Span, node: NodeId) -> ScopeId {
        let scope = self.scopes.push(kind, Some(self.ctx.scope), Some(span));
        self.info.scopes.insert(node, scope);
        self.ctx.scope = scope;
        scope
    }

    pub(crate) fn close_scope(&mut self) {
        if let Some(parent) = self.scopes.get(self.ctx.scope).parent {
            self.ctx.scope = parent;
        }
    }

    /// Declares `obj` in the current scope, reporting a redeclaration
    pub(crate) fn declare(&mut self, scope: ScopeId, name: &str, obj: ObjectId, span: Span) {
        if name == "_" {
            return;
        }
        if self.scopes.insert(scope, name, obj).is_err() {
            self.error(span, format!("{} redeclared in this block", name));
        }
    }

    pub(crate) fn local_object(&self, name: &str, kind: ObjectKind, ty: TypeId, ident: NodeId, span: Span) -> Object {
        Object {
            name: name.to_string(),
            kind,
            ty,
            pkg: Some(PkgRef::local()),
            decl: Some(ident),
            span: Some(span),
        }
    }

    pub(crate) fn record(&mut self, node: NodeId, mode: Mode, ty: TypeId) {
        self.info.record_type(node, mode, ty);
    }

    /// Class currently being checked
    pub(crate) fn current_class(&self) -> Option<&ClassInfo> {
        self.ctx.class.and_then(|i| self.classes.get(i))
    }

    pub(crate) fn type_string(&self, ty: TypeId) -> String {
        self.types.display(ty, &self.objects)
    }
}
