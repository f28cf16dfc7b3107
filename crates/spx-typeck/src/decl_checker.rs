//! Package-level declarations: imports, classes, types, constants, fields, methods

use rustc_hash::FxHashMap;
use spx_ast::{Decl, File, FileId, FuncSig, GenDecl, Node, Param, TypeExpr, TypeSpec};

use crate::checker::{ClassInfo, FuncCtx, TypeChecker};
use crate::info::Mode;
use crate::objects::{Object, ObjectId, ObjectKind, PkgRef};
use crate::scope::{ScopeId, ScopeKind};
use crate::types::{Signature, Type, TypeId, TypeTable};

impl<'a> TypeChecker<'a> {
    // =========================================================================
    // Type expressions
    // =========================================================================

    /// Resolves a type expression in `scope`. Uses in checked source are recorded.
    pub(crate) fn resolve_type(&mut self, ty: &Node<TypeExpr>, scope: ScopeId) -> TypeId {
        let in_source = ty.id.file != FileId::EXTERNAL;
        let resolved = match &ty.value {
            TypeExpr::Name(ident) => match self.lookup_name(scope, &ident.name) {
                None => {
                    self.error(ty.span, format!("undefined: {}", ident.name));
                    TypeTable::INVALID
                }
                Some(obj) => {
                    if in_source {
                        self.info.uses.insert(ty.id, obj);
                    }
                    self.type_of_type_name(obj, &ident.name, ty.span)
                }
            },
            TypeExpr::Qualified { pkg, name } => {
                let Some(pkg_obj) = self.lookup_name(scope, &pkg.value.name) else {
                    self.error(pkg.span, format!("undefined: {}", pkg.value.name));
                    return TypeTable::INVALID;
                };
                if in_source {
                    self.info.uses.insert(pkg.id, pkg_obj);
                }
                let ObjectKind::PkgName(path) = self.objects.get(pkg_obj).kind.clone() else {
                    self.error(pkg.span, format!("{} is not a package", pkg.value.name));
                    return TypeTable::INVALID;
                };
                let member = self
                    .packages
                    .get(&path)
                    .and_then(|(_, pkg_scope)| self.scopes.get(*pkg_scope).lookup(&name.value.name));
                match member {
                    None => {
                        self.error(ty.span, format!("undefined: {}.{}", pkg.value.name, name.value.name));
                        TypeTable::INVALID
                    }
                    Some(obj) => {
                        if in_source {
                            self.info.uses.insert(name.id, obj);
                        }
                        let full = format!("{}.{}", pkg.value.name, name.value.name);
                        self.type_of_type_name(obj, &full, ty.span)
                    }
                }
            }
            TypeExpr::Pointer(elem) => {
                let elem = self.resolve_type(elem, scope);
                self.types.alloc(Type::Pointer(elem))
            }
            TypeExpr::Slice(elem) => {
                let elem = self.resolve_type(elem, scope);
                self.types.alloc(Type::Slice(elem))
            }
            TypeExpr::Map { key, value } => {
                let key = self.resolve_type(key, scope);
                let value = self.resolve_type(value, scope);
                self.types.alloc(Type::Map(key, value))
            }
            TypeExpr::Func(sig) => {
                let sig = self.resolve_signature(sig, scope, None);
                self.types.alloc(Type::Func(sig))
            }
            TypeExpr::Struct(decls) => {
                let mut fields = Vec::new();
                for decl in decls {
                    let field_ty = self.resolve_type(&decl.value.ty, scope);
                    if decl.value.is_embedded() {
                        let name = embedded_name(&decl.value.ty).unwrap_or("_").to_string();
                        fields.push(self.objects.alloc(Object {
                            name,
                            kind: ObjectKind::Field { embedded: true },
                            ty: field_ty,
                            pkg: None,
                            decl: None,
                            span: in_source.then_some(decl.span),
                        }));
                        continue;
                    }
                    for name in &decl.value.names {
                        let field = self.objects.alloc(Object {
                            name: name.value.name.clone(),
                            kind: ObjectKind::Field { embedded: false },
                            ty: field_ty,
                            pkg: None,
                            decl: in_source.then_some(name.id),
                            span: in_source.then_some(name.span),
                        });
                        if in_source {
                            self.info.defs.insert(name.id, field);
                        }
                        fields.push(field);
                    }
                }
                self.types.alloc(Type::Struct(fields))
            }
            TypeExpr::Interface(specs) => {
                let mut methods = Vec::new();
                for spec in specs {
                    let sig = self.resolve_signature(&spec.value.sig.value, scope, None);
                    let sig_ty = self.types.alloc(Type::Func(sig));
                    let method = self.objects.alloc(Object {
                        name: spec.value.name.value.name.clone(),
                        kind: ObjectKind::Func,
                        ty: sig_ty,
                        pkg: None,
                        decl: in_source.then_some(spec.value.name.id),
                        span: in_source.then_some(spec.value.name.span),
                    });
                    if in_source {
                        self.info.defs.insert(spec.value.name.id, method);
                    }
                    methods.push(method);
                }
                self.types.alloc(Type::Interface(methods))
            }
        };
        if in_source && resolved != TypeTable::INVALID {
            self.record(ty.id, Mode::TypeExpr, resolved);
        }
        resolved
    }

    fn type_of_type_name(&mut self, obj: ObjectId, name: &str, span: spx_ast::Span) -> TypeId {
        match self.objects.get(obj).kind {
            ObjectKind::TypeName => self.objects.get(obj).ty,
            _ => {
                self.error(span, format!("{} is not a type", name));
                TypeTable::INVALID
            }
        }
    }

    pub(crate) fn resolve_signature(&mut self, sig: &FuncSig, scope: ScopeId, recv: Option<TypeId>) -> Signature {
        let variadic = sig.params.last().map_or(false, |p| p.value.variadic);
        Signature {
            recv,
            params: self.resolve_params(&sig.params, scope),
            results: self.resolve_params(&sig.results, scope),
            variadic,
        }
    }

    fn resolve_params(&mut self, params: &[Node<Param>], scope: ScopeId) -> Vec<TypeId> {
        let mut out = Vec::new();
        for param in params {
            let mut ty = self.resolve_type(&param.value.ty, scope);
            if param.value.variadic {
                ty = self.types.alloc(Type::Slice(ty));
            }
            for _ in 0..param.value.names.len().max(1) {
                out.push(ty);
            }
        }
        out
    }

    // =========================================================================
    // Package collection
    // =========================================================================

    pub(crate) fn collect_package(&mut self, files: &[&File], entry: FileId) {
        for file in files {
            let scope = self.scopes.push(ScopeKind::File, Some(self.package_scope), Some(file.span));
            self.file_scopes.insert(file.id, scope);
            for import in &file.imports {
                self.check_import(import, scope);
            }
        }

        self.declare_classes(files, entry);

        let type_specs = self.declare_type_names(files);
        for (file, spec, obj) in &type_specs {
            let scope = self.file_scope(*file);
            let resolved = self.resolve_type(&spec.value.ty, scope);
            if spec.value.alias {
                self.objects.get_mut(*obj).ty = resolved;
            } else {
                let named = self.objects.get(*obj).ty;
                self.types.set_underlying(named, resolved);
                self.bind_interface_methods(named);
            }
        }

        for file in files {
            self.enter_file(file.id);
            for decl in &file.decls {
                if let Decl::Const(gen) = &decl.value {
                    let package_scope = self.package_scope;
                    self.check_const_decl(gen, package_scope);
                }
            }
        }

        for index in 0..self.classes.len() {
            if let Some(file) = files.iter().find(|f| f.id == self.classes[index].file) {
                self.declare_fields(index, file);
            }
        }
        for index in 0..self.classes.len() {
            if let Some(file) = files.iter().find(|f| f.id == self.classes[index].file) {
                self.declare_methods(index, file);
            }
        }
    }

    fn check_import(&mut self, import: &Node<spx_ast::ImportSpec>, scope: ScopeId) {
        let spec = &import.value;
        let (pkg, _) = match self.load_package(&spec.path) {
            Ok(loaded) => loaded,
            Err(err) => {
                self.error(spec.path_span, format!("could not import {} ({})", spec.path, err));
                return;
            }
        };
        let (name, ident) = match &spec.name {
            Some(ident) => (ident.value.name.clone(), Some(ident)),
            None => (pkg.name.clone(), None),
        };
        let obj = self.objects.alloc(Object {
            name: name.clone(),
            kind: ObjectKind::PkgName(pkg.path.clone()),
            ty: TypeTable::INVALID,
            pkg: Some(PkgRef::local()),
            decl: ident.map(|i| i.id),
            span: Some(ident.map_or(spec.path_span, |i| i.span)),
        });
        match ident {
            Some(ident) => {
                self.info.defs.insert(ident.id, obj);
            }
            None => {
                self.info.implicits.insert(import.id, obj);
            }
        }
        let span = ident.map_or(spec.path_span, |i| i.span);
        self.declare(scope, &name, obj, span);
    }

    /// One class per file: the entry file embeds the game type, others the sprite type
    fn declare_classes(&mut self, files: &[&File], entry: FileId) {
        for file in files {
            let is_game = file.id == entry;
            let name = file.stem().to_string();
            let obj = self.objects.alloc(Object {
                name: name.clone(),
                kind: ObjectKind::TypeName,
                ty: TypeTable::INVALID,
                pkg: Some(PkgRef::local()),
                decl: None,
                span: None,
            });
            let ty = self.types.new_named(obj);
            self.objects.get_mut(obj).ty = ty;
            if !is_game {
                let package_scope = self.package_scope;
                let _ = self.scopes.insert(package_scope, &name, obj);
            }
            if is_game {
                self.game_class = Some(self.classes.len());
            }
            self.classes.push(ClassInfo {
                file: file.id,
                name,
                obj,
                ty,
                is_game,
            });
        }
    }

    fn declare_type_names<'f>(&mut self, files: &[&'f File]) -> Vec<(FileId, &'f Node<TypeSpec>, ObjectId)> {
        let mut specs = Vec::new();
        for file in files {
            for decl in &file.decls {
                let Decl::Type(type_specs) = &decl.value else {
                    continue;
                };
                for spec in type_specs {
                    let name = &spec.value.name;
                    let obj = self.objects.alloc(self.local_object(
                        &name.value.name,
                        ObjectKind::TypeName,
                        TypeTable::INVALID,
                        name.id,
                        name.span,
                    ));
                    if !spec.value.alias {
                        let ty = self.types.new_named(obj);
                        self.objects.get_mut(obj).ty = ty;
                    }
                    self.info.defs.insert(name.id, obj);
                    let package_scope = self.package_scope;
                    self.declare(package_scope, &name.value.name, obj, name.span);
                    specs.push((file.id, spec, obj));
                }
            }
        }
        specs
    }

    /// Builds the class struct: the embedded base type, then top-level vars
    fn declare_fields(&mut self, index: usize, file: &File) {
        let class = self.classes[index].clone();
        let scope = self.file_scope(file.id);
        let base_name = if class.is_game {
            self.classfile.game.clone()
        } else {
            self.classfile.sprite.clone()
        };
        let base_ty = self
            .scopes
            .get(self.runtime_scope)
            .lookup(&base_name)
            .map(|obj| self.objects.get(obj).ty)
            .unwrap_or(TypeTable::INVALID);
        let base = self.objects.alloc(Object {
            name: base_name,
            kind: ObjectKind::Field { embedded: true },
            ty: base_ty,
            pkg: Some(PkgRef::local()),
            decl: None,
            span: None,
        });

        let mut fields = vec![base];
        let mut seen: FxHashMap<String, ObjectId> = FxHashMap::default();
        for decl in &file.decls {
            let Decl::Var(gen) = &decl.value else {
                continue;
            };
            for spec in &gen.specs {
                let ty = match &spec.value.ty {
                    Some(ty) => self.resolve_type(ty, scope),
                    None => TypeTable::INVALID,
                };
                for name in &spec.value.names {
                    let field = self.objects.alloc(self.local_object(
                        &name.value.name,
                        ObjectKind::Field { embedded: false },
                        ty,
                        name.id,
                        name.span,
                    ));
                    self.info.defs.insert(name.id, field);
                    if name.value.is_blank() {
                        continue;
                    }
                    if seen.insert(name.value.name.clone(), field).is_some() {
                        self.error(name.span, format!("{} redeclared in this block", name.value.name));
                        continue;
                    }
                    fields.push(field);
                }
            }
        }

        let struct_ty = self.types.alloc(Type::Struct(fields));
        self.types.set_underlying(class.ty, struct_ty);
    }

    fn declare_methods(&mut self, index: usize, file: &File) {
        let class = self.classes[index].clone();
        let scope = self.file_scope(file.id);
        for decl in &file.decls {
            let Decl::Func(func) = &decl.value else {
                continue;
            };
            let sig = self.resolve_signature(&func.sig.value, scope, Some(class.ty));
            let sig_ty = self.types.alloc(Type::Func(sig));
            let name = &func.name;
            let obj = self.objects.alloc(self.local_object(
                &name.value.name,
                ObjectKind::Func,
                sig_ty,
                name.id,
                name.span,
            ));
            self.info.defs.insert(name.id, obj);

            let taken = self.field_named(class.ty, &name.value.name)
                || self
                    .types
                    .methods(class.ty)
                    .iter()
                    .any(|m| self.objects.get(*m).name == name.value.name);
            if taken {
                self.error(name.span, format!("{} redeclared in this block", name.value.name));
                continue;
            }
            self.add_method(class.ty, obj);
        }
    }

    fn field_named(&self, class: TypeId, name: &str) -> bool {
        match self.types.get(self.types.underlying(class)) {
            Type::Struct(fields) => fields.iter().any(|f| self.objects.get(*f).name == name),
            _ => false,
        }
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    pub(crate) fn file_scope(&self, file: FileId) -> ScopeId {
        self.file_scopes.get(&file).copied().unwrap_or(self.package_scope)
    }

    /// Resets the context to file level of `file`
    fn enter_file(&mut self, file: FileId) {
        let scope = self.file_scope(file);
        self.ctx = FuncCtx {
            file,
            class: self.classes.iter().position(|c| c.file == file),
            scope,
            func_scope: scope,
            results: None,
        };
    }

    /// Checks field initializers, method bodies and top-level statements
    pub(crate) fn check_bodies(&mut self, files: &[&File]) {
        let mut body_scopes = FxHashMap::default();
        for file in files {
            self.enter_file(file.id);
            let body = self.scopes.push(ScopeKind::Function, Some(self.ctx.scope), Some(file.span));
            body_scopes.insert(file.id, body);
            self.ctx.scope = body;
            self.ctx.func_scope = body;
            self.ctx.results = Some(Vec::new());
            for decl in &file.decls {
                if let Decl::Var(gen) = &decl.value {
                    self.check_field_values(gen);
                }
            }
        }

        for file in files {
            for decl in &file.decls {
                if let Decl::Func(func) = &decl.value {
                    let (Some(body), Some(obj)) = (&func.body, self.info.defs.get(&func.name.id).copied()) else {
                        continue;
                    };
                    self.enter_file(file.id);
                    let sig_ty = self.objects.get(obj).ty;
                    let parent = self.ctx.scope;
                    self.check_func_body(sig_ty, &func.sig.value, body, parent, true);
                }
            }

            self.enter_file(file.id);
            if let Some(body) = body_scopes.get(&file.id) {
                self.ctx.scope = *body;
                self.ctx.func_scope = *body;
                self.ctx.results = Some(Vec::new());
            }
            for decl in &file.decls {
                if let Decl::Stmt(stmt) = &decl.value {
                    self.check_stmt(stmt);
                }
            }
        }
    }

    /// Field initializers; untyped fields take the type of their value
    fn check_field_values(&mut self, gen: &GenDecl) {
        for spec in &gen.specs {
            let spec = &spec.value;
            if spec.values.is_empty() {
                continue;
            }
            if spec.values.len() != spec.names.len() {
                let span = spec.values[0].span;
                self.error(
                    span,
                    format!(
                        "assignment mismatch: {} variable{} but {} value{}",
                        spec.names.len(),
                        plural(spec.names.len()),
                        spec.values.len(),
                        plural(spec.values.len())
                    ),
                );
                for value in &spec.values {
                    self.check_expr(value, None);
                }
                continue;
            }
            for (name, value) in spec.names.iter().zip(&spec.values) {
                let Some(field) = self.info.defs.get(&name.id).copied() else {
                    continue;
                };
                let declared = self.objects.get(field).ty;
                if spec.ty.is_some() {
                    let op = self.check_expr(value, Some(declared));
                    self.assign(value, &op, declared, "variable declaration");
                } else {
                    let op = self.check_expr(value, None);
                    let ty = self.default_type_of(value, &op, "variable declaration");
                    self.objects.get_mut(field).ty = ty;
                }
            }
        }
    }
}

/// Field name of an embedded type: `T`, `pkg.T`, `*T`
fn embedded_name(ty: &Node<TypeExpr>) -> Option<&str> {
    match &ty.value {
        TypeExpr::Name(ident) => Some(&ident.name),
        TypeExpr::Qualified { name, .. } => Some(&name.value.name),
        TypeExpr::Pointer(inner) => embedded_name(inner),
        _ => None,
    }
}

pub(crate) fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
