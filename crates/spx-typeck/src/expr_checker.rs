//! Expression checking

use spx_ast::{BinaryOp, Element, Expr, Ident, LambdaBody, Literal, LiteralKind, Node, NodeId, Span, UnaryOp};

use crate::checker::TypeChecker;
use crate::info::{Mode, Selection, SelectionKind};
use crate::lookup::Member;
use crate::objects::{ConstValue, ObjectId, ObjectKind};
use crate::scope::ScopeKind;
use crate::types::{BasicKind, Signature, Type, TypeId, TypeTable};

/// Result of checking an expression
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Operand {
    pub mode: Mode,
    pub ty: TypeId,
}

impl Operand {
    pub fn new(mode: Mode, ty: TypeId) -> Self {
        Self { mode, ty }
    }

    pub fn invalid() -> Self {
        Self::new(Mode::Invalid, TypeTable::INVALID)
    }

    pub fn is_invalid(&self) -> bool {
        self.mode == Mode::Invalid
    }

    pub fn const_value(&self) -> Option<&ConstValue> {
        match &self.mode {
            Mode::Constant(value) => Some(value),
            _ => None,
        }
    }
}

/// What an unqualified identifier resolved to
enum Resolved {
    Object(ObjectId),
    /// Member of a class reached through the implicit receiver
    Member { class: TypeId, member: Member },
}

impl<'a> TypeChecker<'a> {
    /// Checks `expr`, using `expected` to type untyped composites and lambdas
    pub(crate) fn check_expr(&mut self, expr: &Node<Expr>, expected: Option<TypeId>) -> Operand {
        let op = self.check_expr_inner(expr, expected, false);
        self.record_operand(expr.id, &op);
        op
    }

    pub(crate) fn record_operand(&mut self, node: NodeId, op: &Operand) {
        // Calls without results are recorded too, with an invalid type
        if !op.is_invalid() && (op.ty != TypeTable::INVALID || op.mode == Mode::NoValue) {
            self.record(node, op.mode.clone(), op.ty);
        }
    }

    pub(crate) fn check_expr_inner(&mut self, expr: &Node<Expr>, expected: Option<TypeId>, as_callee: bool) -> Operand {
        match &expr.value {
            Expr::Ident(ident) => self.check_ident(expr.id, expr.span, ident, as_callee),
            Expr::Literal(lit) => self.check_literal(expr.span, lit),
            Expr::Composite { ty, elements } => {
                let target = match ty {
                    Some(ty) => {
                        let scope = self.ctx.scope;
                        Some(self.resolve_type(ty, scope))
                    }
                    None => expected,
                };
                self.check_composite(expr, target, elements)
            }
            Expr::SliceLit(elems) => self.check_slice_lit(elems, expected),
            Expr::FuncLit { sig, body } => {
                let scope = self.ctx.scope;
                let signature = self.resolve_signature(&sig.value, scope, None);
                let sig_ty = self.types.alloc(Type::Func(signature));
                self.check_func_body(sig_ty, &sig.value, body, scope, false);
                Operand::new(Mode::Value, sig_ty)
            }
            Expr::Lambda { params, body } => self.check_lambda(expr, params, body, expected),
            Expr::Paren(inner) => {
                let op = self.check_expr_inner(inner, expected, as_callee);
                self.record_operand(inner.id, &op);
                op
            }
            Expr::Selector { object, property } => self.check_selector(expr, object, property, as_callee),
            Expr::Index { object, index } => self.check_index(expr, object, index),
            Expr::Call { callee, args, .. } => self.check_call(expr, callee, args),
            Expr::Unary { op, expr: inner } => self.check_unary(expr, *op, inner),
            Expr::Binary { left, op, right } => self.check_binary(expr, left, *op, right),
        }
    }

    // =========================================================================
    // Identifiers and selectors
    // =========================================================================

    fn resolve_ident(&self, name: &str) -> Option<Resolved> {
        if let Some((_, obj)) = self.scopes.lookup_until(self.ctx.scope, Some(self.ctx.func_scope), name) {
            return Some(Resolved::Object(obj));
        }
        if let Some(class) = self.current_class() {
            if let Some(member) = self.member(class.ty, name) {
                return Some(Resolved::Member { class: class.ty, member });
            }
            // Sprites see the game's members
            if !class.is_game {
                if let Some(game) = self.game_class.and_then(|i| self.classes.get(i)) {
                    if let Some(member) = self.member(game.ty, name) {
                        return Some(Resolved::Member { class: game.ty, member });
                    }
                }
            }
        }
        let file_scope = self.file_scope(self.ctx.file);
        self.lookup_name(file_scope, name).map(Resolved::Object)
    }

    pub(crate) fn check_ident(&mut self, id: NodeId, span: Span, ident: &Ident, as_callee: bool) -> Operand {
        if ident.is_blank() {
            self.error(span, "cannot use _ as value");
            return Operand::invalid();
        }
        match self.resolve_ident(&ident.name) {
            None => {
                self.error(span, format!("undefined: {}", ident.name));
                Operand::invalid()
            }
            Some(Resolved::Member { class, member }) => {
                self.info.uses.insert(id, member.obj);
                self.info.class_members.insert(id, class);
                self.member_operand(&member, as_callee)
            }
            Some(Resolved::Object(obj)) => {
                self.info.uses.insert(id, obj);
                self.object_operand(obj, span, &ident.name, as_callee)
            }
        }
    }

    fn member_operand(&self, member: &Member, as_callee: bool) -> Operand {
        match member.kind {
            SelectionKind::FieldVal => Operand::new(Mode::Variable, member.ty),
            SelectionKind::MethodVal => match self.is_auto_property(member.obj).filter(|_| !as_callee) {
                Some(result) => Operand::new(Mode::Value, result),
                None => Operand::new(Mode::Value, member.ty),
            },
        }
    }

    fn object_operand(&mut self, obj: ObjectId, span: Span, name: &str, as_callee: bool) -> Operand {
        let object = self.objects.get(obj);
        let ty = object.ty;
        match object.kind.clone() {
            ObjectKind::Var | ObjectKind::Field { .. } => Operand::new(Mode::Variable, ty),
            ObjectKind::Const(value) => Operand::new(Mode::Constant(value), ty),
            ObjectKind::TypeName => Operand::new(Mode::TypeExpr, ty),
            ObjectKind::Func | ObjectKind::Overloads(_) => Operand::new(Mode::Value, ty),
            ObjectKind::Nil => Operand::new(Mode::Value, TypeTable::basic(BasicKind::UntypedNil)),
            ObjectKind::Builtin(_) => {
                if as_callee {
                    Operand::new(Mode::Builtin, TypeTable::INVALID)
                } else {
                    self.error(span, format!("{} (built-in function) must be called", name));
                    Operand::invalid()
                }
            }
            ObjectKind::PkgName(_) => {
                self.error(span, format!("use of package {} without selector", name));
                Operand::invalid()
            }
        }
    }

    fn check_selector(
        &mut self,
        expr: &Node<Expr>,
        object: &Node<Expr>,
        property: &Node<Ident>,
        as_callee: bool,
    ) -> Operand {
        let name = &property.value.name;

        // Qualified identifier: pkg.Name
        if let Expr::Ident(pkg_ident) = &object.value {
            if let Some(Resolved::Object(pkg_obj)) = self.resolve_ident(&pkg_ident.name) {
                if let ObjectKind::PkgName(path) = self.objects.get(pkg_obj).kind.clone() {
                    self.info.uses.insert(object.id, pkg_obj);
                    return self.check_qualified(&path, &pkg_ident.name, property, as_callee);
                }
            }
        }

        let x = self.check_expr(object, None);
        if x.is_invalid() {
            return Operand::invalid();
        }
        let Some(member) = self.member(x.ty, name) else {
            self.error(
                property.span,
                format!(
                    "{}.{} undefined (type {} has no field or method {})",
                    object.value,
                    name,
                    self.type_string(x.ty),
                    name
                ),
            );
            return Operand::invalid();
        };
        self.info.uses.insert(property.id, member.obj);
        let op = self.member_operand(&member, as_callee);
        self.info.selections.insert(
            expr.id,
            Selection {
                kind: member.kind,
                recv: x.ty,
                obj: member.obj,
                ty: op.ty,
            },
        );
        op
    }

    /// Member of an imported package. Lowercase names fall back to their
    /// exported spelling (`fmt.println` is `fmt.Println`).
    fn check_qualified(&mut self, path: &str, pkg_name: &str, property: &Node<Ident>, as_callee: bool) -> Operand {
        let name = &property.value.name;
        let found = self.packages.get(path).and_then(|(_, scope)| {
            let scope = self.scopes.get(*scope);
            scope.lookup(name).or_else(|| scope.lookup(&capitalize(name)))
        });
        match found {
            None => {
                self.error(property.span, format!("undefined: {}.{}", pkg_name, name));
                Operand::invalid()
            }
            Some(obj) => {
                self.info.uses.insert(property.id, obj);
                let full = format!("{}.{}", pkg_name, name);
                self.object_operand(obj, property.span, &full, as_callee)
            }
        }
    }

    // =========================================================================
    // Literals
    // =========================================================================

    fn check_literal(&mut self, span: Span, lit: &Literal) -> Operand {
        let value = match lit.kind {
            LiteralKind::String => Some(ConstValue::String(lit.value.clone())),
            LiteralKind::Int => parse_int(&lit.raw)
                .map(ConstValue::Int)
                .or_else(|| parse_float(&lit.raw).map(ConstValue::Float)),
            LiteralKind::Float => parse_float(&lit.raw).map(ConstValue::Float),
        };
        match value {
            Some(value) => {
                let ty = TypeTable::basic(value.untyped_kind());
                Operand::new(Mode::Constant(value), ty)
            }
            None => {
                self.error(span, format!("invalid number literal {}", lit.raw));
                Operand::invalid()
            }
        }
    }

    fn check_composite(&mut self, expr: &Node<Expr>, target: Option<TypeId>, elements: &[Node<Element>]) -> Operand {
        let Some(target) = target else {
            // No type to go by: a map of arbitrary values keyed by field name
            for elem in elements {
                if let Some(key) = &elem.value.key {
                    if key.value.as_ident().is_none() {
                        self.check_expr(key, None);
                    }
                }
                let op = self.check_expr(&elem.value.value, None);
                self.default_type_of(&elem.value.value, &op, "map literal");
            }
            let any = self.any_type();
            let map = self.types.alloc(Type::Map(TypeTable::basic(BasicKind::String), any));
            return Operand::new(Mode::Value, map);
        };

        let base = self.types.deref(target);
        match self.types.get(self.types.underlying(base)).clone() {
            Type::Struct(fields) => self.check_struct_elements(expr, base, &fields, elements),
            Type::Map(key_ty, value_ty) => {
                for elem in elements {
                    match &elem.value.key {
                        Some(key) => {
                            let op = self.check_expr(key, Some(key_ty));
                            self.assign(key, &op, key_ty, "map literal");
                        }
                        None => self.error(elem.span, "missing key in map literal"),
                    }
                    let op = self.check_expr(&elem.value.value, Some(value_ty));
                    self.assign(&elem.value.value, &op, value_ty, "map literal");
                }
            }
            Type::Slice(elem_ty) => {
                for elem in elements {
                    let op = self.check_expr(&elem.value.value, Some(elem_ty));
                    self.assign(&elem.value.value, &op, elem_ty, "slice literal");
                }
            }
            _ if base == TypeTable::INVALID => {
                for elem in elements {
                    self.check_expr(&elem.value.value, None);
                }
            }
            _ => {
                self.error(
                    expr.span,
                    format!("invalid composite literal type {}", self.type_string(target)),
                );
                return Operand::invalid();
            }
        }
        Operand::new(Mode::Value, target)
    }

    fn check_struct_elements(
        &mut self,
        expr: &Node<Expr>,
        struct_ty: TypeId,
        fields: &[ObjectId],
        elements: &[Node<Element>],
    ) {
        let type_name = self.type_string(struct_ty);
        let keyed = elements.iter().any(|e| e.value.key.is_some());
        if keyed {
            for elem in elements {
                let field = elem.value.key.as_ref().and_then(|key| {
                    let name = key.value.as_ident()?;
                    let found = fields.iter().copied().find(|f| self.objects.get(*f).name == name.name);
                    Some((key, name.name.clone(), found))
                });
                match field {
                    Some((key, _, Some(field))) => {
                        self.info.uses.insert(key.id, field);
                        let field_ty = self.objects.get(field).ty;
                        let op = self.check_expr(&elem.value.value, Some(field_ty));
                        self.assign(&elem.value.value, &op, field_ty, "struct literal");
                    }
                    Some((key, name, None)) => {
                        self.error(key.span, format!("unknown field {} in struct literal of type {}", name, type_name));
                        self.check_expr(&elem.value.value, None);
                    }
                    None => {
                        self.error(elem.span, "mixture of field:value and value elements in struct literal");
                        self.check_expr(&elem.value.value, None);
                    }
                }
            }
            return;
        }

        for (i, elem) in elements.iter().enumerate() {
            match fields.get(i) {
                Some(field) => {
                    let field_ty = self.objects.get(*field).ty;
                    let op = self.check_expr(&elem.value.value, Some(field_ty));
                    self.assign(&elem.value.value, &op, field_ty, "struct literal");
                }
                None => {
                    self.error(elem.span, format!("too many values in struct literal of type {}", type_name));
                    return;
                }
            }
        }
        if !elements.is_empty() && elements.len() < fields.len() {
            self.error(expr.span, format!("too few values in struct literal of type {}", type_name));
        }
    }

    fn check_slice_lit(&mut self, elems: &[Node<Expr>], expected: Option<TypeId>) -> Operand {
        let expected_elem = expected.and_then(|t| match self.types.get(self.types.underlying(t)) {
            Type::Slice(elem) => Some(*elem),
            _ => None,
        });
        if let (Some(slice_ty), Some(elem_ty)) = (expected, expected_elem) {
            for elem in elems {
                let op = self.check_expr(elem, Some(elem_ty));
                self.assign(elem, &op, elem_ty, "slice literal");
            }
            return Operand::new(Mode::Value, slice_ty);
        }

        let mut elem_ty = None;
        for elem in elems {
            let op = self.check_expr(elem, None);
            match elem_ty {
                None => elem_ty = Some(self.default_type_of(elem, &op, "slice literal")),
                Some(ty) => {
                    self.assign(elem, &op, ty, "slice literal");
                }
            }
        }
        let elem_ty = match elem_ty {
            Some(ty) => ty,
            None => self.any_type(),
        };
        Operand::new(Mode::Value, self.types.alloc(Type::Slice(elem_ty)))
    }

    fn check_lambda(
        &mut self,
        expr: &Node<Expr>,
        params: &[Node<Ident>],
        body: &LambdaBody,
        expected: Option<TypeId>,
    ) -> Operand {
        let sig = expected.and_then(|t| self.types.signature(t).cloned());
        if let (Some(sig), Some(target)) = (&sig, expected) {
            if sig.params.len() != params.len() {
                self.error(
                    expr.span,
                    format!(
                        "cannot use lambda with {} parameter{} as {} value",
                        params.len(),
                        crate::decl_checker::plural(params.len()),
                        self.type_string(target)
                    ),
                );
            }
        }

        let saved = self.ctx.clone();
        self.open_scope(ScopeKind::Function, expr.span, expr.id);
        let mut param_types = Vec::with_capacity(params.len());
        for (i, param) in params.iter().enumerate() {
            let ty = sig
                .as_ref()
                .and_then(|s| s.params.get(i).copied())
                .unwrap_or(TypeTable::INVALID);
            param_types.push(ty);
            let obj = self.objects.alloc(self.local_object(
                &param.value.name,
                ObjectKind::Var,
                ty,
                param.id,
                param.span,
            ));
            self.info.defs.insert(param.id, obj);
            let scope = self.ctx.scope;
            self.declare(scope, &param.value.name, obj, param.span);
        }

        let results = sig.as_ref().map(|s| s.results.clone());
        match body {
            LambdaBody::Expr(value) => {
                let result_ty = results.as_ref().and_then(|r| r.first().copied());
                let op = self.check_expr(value, result_ty);
                match result_ty {
                    Some(ty) => {
                        self.assign(value, &op, ty, "lambda result");
                    }
                    None => {
                        self.default_type_of(value, &op, "lambda result");
                    }
                }
            }
            LambdaBody::Block(block) => {
                self.ctx.results = results;
                for stmt in &block.value.stmts {
                    self.check_stmt(stmt);
                }
            }
        }
        self.ctx = saved;

        let ty = match expected.filter(|_| sig.is_some()) {
            Some(ty) => ty,
            None => self.types.alloc(Type::Func(Signature {
                recv: None,
                params: param_types,
                results: Vec::new(),
                variadic: false,
            })),
        };
        Operand::new(Mode::Value, ty)
    }

    fn check_index(&mut self, expr: &Node<Expr>, object: &Node<Expr>, index: &Node<Expr>) -> Operand {
        let x = self.check_expr(object, None);
        if x.is_invalid() {
            self.check_expr(index, None);
            return Operand::invalid();
        }
        match self.types.get(self.types.underlying(x.ty)).clone() {
            Type::Slice(elem) => {
                let int = TypeTable::basic(BasicKind::Int);
                let op = self.check_expr(index, Some(int));
                self.assign(index, &op, int, "index");
                Operand::new(Mode::Variable, elem)
            }
            Type::Map(key, value) => {
                let op = self.check_expr(index, Some(key));
                self.assign(index, &op, key, "map index");
                Operand::new(Mode::Variable, value)
            }
            _ => {
                self.check_expr(index, None);
                let desc = self.describe(object, &x);
                self.error(expr.span, format!("invalid operation: cannot index {} ({})", object.value, desc));
                Operand::invalid()
            }
        }
    }

    // =========================================================================
    // Operators
    // =========================================================================

    fn check_unary(&mut self, expr: &Node<Expr>, op: UnaryOp, inner: &Node<Expr>) -> Operand {
        let x = self.check_expr(inner, None);
        if x.is_invalid() {
            return x;
        }
        let kind = self.types.basic_kind(x.ty);
        let allowed = match op {
            UnaryOp::Plus | UnaryOp::Minus => kind.map_or(false, BasicKind::is_numeric),
            UnaryOp::Not => kind.map_or(false, BasicKind::is_boolean),
            UnaryOp::BitNot => kind.map_or(false, BasicKind::is_integer),
            UnaryOp::AddrOf => {
                let target = Expr::unparen(inner);
                if x.mode != Mode::Variable && !matches!(target.value, Expr::Composite { .. }) {
                    self.error(expr.span, format!("invalid operation: cannot take address of {}", inner.value));
                    return Operand::invalid();
                }
                return Operand::new(Mode::Value, self.types.alloc(Type::Pointer(x.ty)));
            }
            UnaryOp::Deref => {
                return match self.types.get(self.types.underlying(x.ty)).clone() {
                    Type::Pointer(elem) => Operand::new(Mode::Variable, elem),
                    _ => {
                        let desc = self.describe(inner, &x);
                        self.error(expr.span, format!("invalid operation: cannot indirect {} ({})", inner.value, desc));
                        Operand::invalid()
                    }
                };
            }
        };
        if !allowed {
            let desc = self.describe(inner, &x);
            self.error(
                expr.span,
                format!("invalid operation: operator {} not defined on {} ({})", op, inner.value, desc),
            );
            return Operand::invalid();
        }
        match x.const_value().and_then(|v| fold_unary(op, v)) {
            Some(value) => Operand::new(Mode::Constant(value), x.ty),
            None => Operand::new(Mode::Value, x.ty),
        }
    }

    fn check_binary(&mut self, expr: &Node<Expr>, left: &Node<Expr>, op: BinaryOp, right: &Node<Expr>) -> Operand {
        let l = self.check_expr(left, None);
        let r = self.check_expr(right, None);
        if l.is_invalid() || r.is_invalid() {
            return Operand::invalid();
        }

        if op.is_shift() {
            let int = TypeTable::basic(BasicKind::Int);
            self.assign(right, &r, int, "shift count");
            if !self.types.basic_kind(l.ty).map_or(false, BasicKind::is_integer) {
                let desc = self.describe(left, &l);
                self.error(
                    expr.span,
                    format!("invalid operation: shifted operand {} ({}) must be integer", left.value, desc),
                );
                return Operand::invalid();
            }
            let value = l.const_value().zip(r.const_value()).and_then(|(a, b)| fold_binary(op, a, b));
            return match value {
                Some(value) => Operand::new(Mode::Constant(value), l.ty),
                None => Operand::new(Mode::Value, l.ty),
            };
        }

        let Some(ty) = self.unify(left, &l, right, &r, op) else {
            self.error(
                expr.span,
                format!(
                    "invalid operation: {} (mismatched types {} and {})",
                    expr.value,
                    self.type_string(l.ty),
                    self.type_string(r.ty)
                ),
            );
            return Operand::invalid();
        };

        let kind = self.types.basic_kind(ty);
        let allowed = match op {
            BinaryOp::Eq | BinaryOp::NotEq => true,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                kind.map_or(false, |k| k.is_numeric() || k.is_string())
            }
            BinaryOp::Add => kind.map_or(false, |k| k.is_numeric() || k.is_string()),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => kind.map_or(false, BasicKind::is_numeric),
            BinaryOp::Rem | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor | BinaryOp::AndNot => {
                kind.map_or(false, BasicKind::is_integer)
            }
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => kind.map_or(false, BasicKind::is_boolean),
            BinaryOp::Shl | BinaryOp::Shr => true,
        };
        if !allowed {
            let desc = self.describe(left, &l);
            self.error(
                expr.span,
                format!("invalid operation: operator {} not defined on {} ({})", op, left.value, desc),
            );
            return Operand::invalid();
        }

        let folded = l.const_value().zip(r.const_value()).map(|(a, b)| (a.clone(), b.clone()));
        if let Some((a, b)) = folded {
            if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b.as_f64() == Some(0.0) {
                self.error(right.span, "invalid operation: division by zero");
                return Operand::invalid();
            }
            if let Some(value) = fold_binary(op, &a, &b) {
                let ty = if op.is_comparison() {
                    TypeTable::basic(BasicKind::UntypedBool)
                } else {
                    ty
                };
                return Operand::new(Mode::Constant(value), ty);
            }
        }
        if op.is_comparison() {
            return Operand::new(Mode::Value, TypeTable::basic(BasicKind::UntypedBool));
        }
        Operand::new(Mode::Value, ty)
    }

    /// Brings both operands to a common type, converting untyped sides
    fn unify(&mut self, left: &Node<Expr>, l: &Operand, right: &Node<Expr>, r: &Operand, op: BinaryOp) -> Option<TypeId> {
        let l_untyped = self.types.is_untyped(l.ty);
        let r_untyped = self.types.is_untyped(r.ty);
        match (l_untyped, r_untyped) {
            (true, true) => {
                let a = self.types.basic_kind(l.ty)?;
                let b = self.types.basic_kind(r.ty)?;
                if a == b {
                    Some(l.ty)
                } else if a.is_numeric() && b.is_numeric() {
                    Some(TypeTable::basic(BasicKind::UntypedFloat))
                } else {
                    None
                }
            }
            (true, false) => {
                let kind = self.types.basic_kind(l.ty)?;
                if !self.representable(kind, r.ty) {
                    return None;
                }
                self.update_untyped(left, r.ty);
                Some(r.ty)
            }
            (false, true) => {
                let kind = self.types.basic_kind(r.ty)?;
                if !self.representable(kind, l.ty) {
                    return None;
                }
                self.update_untyped(right, l.ty);
                Some(l.ty)
            }
            (false, false) => {
                if crate::lookup::identical(&self.types, l.ty, r.ty) {
                    return Some(l.ty);
                }
                let equality = matches!(op, BinaryOp::Eq | BinaryOp::NotEq);
                if equality && (self.assignable(l.ty, r.ty) || self.assignable(r.ty, l.ty)) {
                    return Some(l.ty);
                }
                None
            }
        }
    }

    /// Rewrites the recorded type of an untyped expression once its final type is known
    pub(crate) fn update_untyped(&mut self, expr: &Node<Expr>, target: TypeId) {
        let Some(tv) = self.info.types.get_mut(&expr.id) else {
            return;
        };
        if !self.types.is_untyped(tv.ty) {
            return;
        }
        tv.ty = target;
        match &expr.value {
            Expr::Paren(inner) => self.update_untyped(inner, target),
            Expr::Unary { expr: inner, .. } => self.update_untyped(inner, target),
            Expr::Binary { left, op, right } if !op.is_comparison() => {
                self.update_untyped(left, target);
                if !op.is_shift() {
                    self.update_untyped(right, target);
                }
            }
            _ => {}
        }
    }

    // =========================================================================
    // Assignability
    // =========================================================================

    /// Checks that `op` (the value of `expr`) may be assigned to `target`.
    /// Untyped values take on the target type.
    pub(crate) fn assign(&mut self, expr: &Node<Expr>, op: &Operand, target: TypeId, context: &str) -> bool {
        match op.mode {
            Mode::Invalid => return false,
            Mode::NoValue => {
                self.error(expr.span, format!("{} (no value) used as value", expr.value));
                return false;
            }
            Mode::TypeExpr => {
                self.error(expr.span, format!("{} (type) is not an expression", expr.value));
                return false;
            }
            _ => {}
        }
        if target == TypeTable::INVALID {
            return true;
        }
        if !self.assignable(op.ty, target) {
            let desc = self.describe(expr, op);
            self.error(
                expr.span,
                format!(
                    "cannot use {} ({}) as {} value in {}",
                    expr.value,
                    desc,
                    self.type_string(target),
                    context
                ),
            );
            return false;
        }
        if self.types.is_untyped(op.ty) {
            let nil = op.ty == TypeTable::basic(BasicKind::UntypedNil);
            let final_ty = if self.types.is_interface(target) && !nil {
                self.default_type(op.ty)
            } else {
                target
            };
            self.update_untyped(expr, final_ty);
        }
        true
    }

    /// Type a value takes when nothing constrains it
    pub(crate) fn default_type_of(&mut self, expr: &Node<Expr>, op: &Operand, context: &str) -> TypeId {
        match op.mode {
            Mode::Invalid => return TypeTable::INVALID,
            Mode::NoValue => {
                self.error(expr.span, format!("{} (no value) used as value", expr.value));
                return TypeTable::INVALID;
            }
            Mode::TypeExpr => {
                self.error(expr.span, format!("{} (type) is not an expression", expr.value));
                return TypeTable::INVALID;
            }
            _ => {}
        }
        if op.ty == TypeTable::basic(BasicKind::UntypedNil) {
            self.error(expr.span, format!("use of untyped nil in {}", context));
            return TypeTable::INVALID;
        }
        if !self.types.is_untyped(op.ty) {
            return op.ty;
        }
        let ty = self.default_type(op.ty);
        self.update_untyped(expr, ty);
        ty
    }

    fn default_type(&self, ty: TypeId) -> TypeId {
        match self.types.get(ty) {
            Type::Basic(kind) => TypeTable::basic(kind.default_kind()),
            _ => ty,
        }
    }

    /// Operand description used in diagnostics: `variable of type int`
    pub(crate) fn describe(&self, expr: &Node<Expr>, op: &Operand) -> String {
        let ty = self.type_string(op.ty);
        match &op.mode {
            Mode::Constant(value) if self.types.is_untyped(op.ty) => {
                if matches!(Expr::unparen(expr).value, Expr::Literal(_)) {
                    format!("{} constant", ty)
                } else {
                    format!("{} constant {}", ty, value)
                }
            }
            Mode::Constant(value) => format!("constant {} of type {}", value, ty),
            Mode::Variable => format!("variable of type {}", ty),
            _ if op.ty == TypeTable::basic(BasicKind::UntypedNil) => "untyped nil".to_string(),
            _ => format!("value of type {}", ty),
        }
    }

    pub(crate) fn any_type(&self) -> TypeId {
        self.scopes
            .get(self.universe)
            .lookup("any")
            .map(|obj| self.objects.get(obj).ty)
            .unwrap_or(TypeTable::INVALID)
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    let digits = raw.replace('_', "");
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    digits.parse().ok()
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.replace('_', "").parse().ok()
}

fn fold_unary(op: UnaryOp, value: &ConstValue) -> Option<ConstValue> {
    match (op, value) {
        (UnaryOp::Plus, v) => Some(v.clone()),
        (UnaryOp::Minus, ConstValue::Int(n)) => n.checked_neg().map(ConstValue::Int),
        (UnaryOp::Minus, ConstValue::Float(f)) => Some(ConstValue::Float(-f)),
        (UnaryOp::Not, ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
        (UnaryOp::BitNot, ConstValue::Int(n)) => Some(ConstValue::Int(!n)),
        _ => None,
    }
}

fn fold_binary(op: BinaryOp, a: &ConstValue, b: &ConstValue) -> Option<ConstValue> {
    use ConstValue::*;
    match (a, b) {
        (Int(x), Int(y)) => {
            let (x, y) = (*x, *y);
            let value = match op {
                BinaryOp::Add => Int(x.checked_add(y)?),
                BinaryOp::Sub => Int(x.checked_sub(y)?),
                BinaryOp::Mul => Int(x.checked_mul(y)?),
                BinaryOp::Div => Int(x.checked_div(y)?),
                BinaryOp::Rem => Int(x.checked_rem(y)?),
                BinaryOp::And => Int(x & y),
                BinaryOp::Or => Int(x | y),
                BinaryOp::Xor => Int(x ^ y),
                BinaryOp::AndNot => Int(x & !y),
                BinaryOp::Shl => Int(x.checked_shl(u32::try_from(y).ok()?)?),
                BinaryOp::Shr => Int(x.checked_shr(u32::try_from(y).ok()?)?),
                _ => return compare(op, x.cmp(&y)),
            };
            Some(value)
        }
        (String(x), String(y)) => match op {
            BinaryOp::Add => Some(String(format!("{}{}", x, y))),
            _ => compare(op, x.cmp(y)),
        },
        (Bool(x), Bool(y)) => match op {
            BinaryOp::LogicalAnd => Some(Bool(*x && *y)),
            BinaryOp::LogicalOr => Some(Bool(*x || *y)),
            BinaryOp::Eq => Some(Bool(x == y)),
            BinaryOp::NotEq => Some(Bool(x != y)),
            _ => None,
        },
        _ => {
            let (x, y) = (a.as_f64()?, b.as_f64()?);
            match op {
                BinaryOp::Add => Some(Float(x + y)),
                BinaryOp::Sub => Some(Float(x - y)),
                BinaryOp::Mul => Some(Float(x * y)),
                BinaryOp::Div => Some(Float(x / y)),
                _ => compare(op, x.partial_cmp(&y)?),
            }
        }
    }
}

fn compare(op: BinaryOp, ord: std::cmp::Ordering) -> Option<ConstValue> {
    use std::cmp::Ordering::*;
    let result = match op {
        BinaryOp::Eq => ord == Equal,
        BinaryOp::NotEq => ord != Equal,
        BinaryOp::Lt => ord == Less,
        BinaryOp::LtEq => ord != Greater,
        BinaryOp::Gt => ord == Greater,
        BinaryOp::GtEq => ord != Less,
        _ => return None,
    };
    Some(ConstValue::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("println"), "Println");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_parse_number_literals() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_float("0.5"), Some(0.5));
    }

    #[test]
    fn test_fold_constants() {
        assert_eq!(
            fold_binary(BinaryOp::Add, &ConstValue::Int(2), &ConstValue::Int(3)),
            Some(ConstValue::Int(5))
        );
        assert_eq!(
            fold_binary(BinaryOp::Mul, &ConstValue::Int(2), &ConstValue::Float(1.5)),
            Some(ConstValue::Float(3.0))
        );
        assert_eq!(
            fold_binary(
                BinaryOp::Add,
                &ConstValue::String("a".into()),
                &ConstValue::String("b".into())
            ),
            Some(ConstValue::String("ab".into()))
        );
        assert_eq!(
            fold_binary(BinaryOp::Lt, &ConstValue::Int(1), &ConstValue::Int(2)),
            Some(ConstValue::Bool(true))
        );
        assert_eq!(fold_unary(UnaryOp::Minus, &ConstValue::Int(90)), Some(ConstValue::Int(-90)));
    }
}
