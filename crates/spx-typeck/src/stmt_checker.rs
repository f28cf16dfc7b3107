//! Statement and function body checking

use spx_ast::{AssignOp, Block, Expr, FuncSig, GenDecl, Ident, Node, Stmt};

use crate::checker::TypeChecker;
use crate::decl_checker::plural;
use crate::expr_checker::Operand;
use crate::info::Mode;
use crate::objects::ObjectKind;
use crate::scope::{ScopeId, ScopeKind};
use crate::types::{BasicKind, Type, TypeId, TypeTable};

impl<'a> TypeChecker<'a> {
    pub(crate) fn check_stmt(&mut self, stmt: &Node<Stmt>) {
        match &stmt.value {
            Stmt::Expr(expr) => self.check_expr_stmt(expr),
            Stmt::Var(gen) => self.check_var_decl(gen),
            Stmt::Const(gen) => {
                let scope = self.ctx.scope;
                self.check_const_decl(gen, scope);
            }
            Stmt::ShortVarDecl { names, values } => self.check_short_var_decl(stmt, names, values),
            Stmt::Assign { lhs, op, rhs } => self.check_assign(lhs, *op, rhs),
            Stmt::IncDec { target, increment } => {
                let op = self.check_expr(target, None);
                if op.is_invalid() {
                    return;
                }
                if !self.types.basic_kind(op.ty).map_or(false, BasicKind::is_numeric) {
                    let suffix = if *increment { "++" } else { "--" };
                    self.error(
                        stmt.span,
                        format!(
                            "invalid operation: {}{} (non-numeric type {})",
                            target.value,
                            suffix,
                            self.type_string(op.ty)
                        ),
                    );
                } else if op.mode != Mode::Variable {
                    self.error(target.span, format!("cannot assign to {}", target.value));
                }
            }
            Stmt::If {
                init,
                condition,
                then_block,
                else_stmt,
            } => {
                self.open_scope(ScopeKind::Block, stmt.span, stmt.id);
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                self.check_condition(condition, "if statement");
                self.check_block(then_block);
                if let Some(else_stmt) = else_stmt {
                    self.check_stmt(else_stmt);
                }
                self.close_scope();
            }
            Stmt::For {
                init,
                condition,
                post,
                body,
            } => {
                self.open_scope(ScopeKind::Block, stmt.span, stmt.id);
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(condition) = condition {
                    self.check_condition(condition, "for statement");
                }
                if let Some(post) = post {
                    self.check_stmt(post);
                }
                self.check_block(body);
                self.close_scope();
            }
            Stmt::Return(values) => self.check_return(stmt, values),
            Stmt::Block(block) => {
                self.open_scope(ScopeKind::Block, stmt.span, stmt.id);
                for inner in &block.stmts {
                    self.check_stmt(inner);
                }
                self.close_scope();
            }
            Stmt::Break | Stmt::Continue | Stmt::Empty => {}
        }
    }

    pub(crate) fn check_block(&mut self, block: &Node<Block>) {
        self.open_scope(ScopeKind::Block, block.span, block.id);
        for stmt in &block.value.stmts {
            self.check_stmt(stmt);
        }
        self.close_scope();
    }

    /// A bare name or selector naming a function is a call without arguments
    fn check_expr_stmt(&mut self, expr: &Node<Expr>) {
        match &Expr::unparen(expr).value {
            Expr::Call { .. } => {
                self.check_expr(expr, None);
            }
            Expr::Ident(_) | Expr::Selector { .. } => {
                let callee = self.check_callee(expr);
                if callee.op.is_invalid() {
                    return;
                }
                let callable = matches!(callee.op.mode, Mode::Value) && self.types.signature(callee.op.ty).is_some();
                if callable {
                    self.finish_call(expr.span, expr, callee, &[]);
                } else {
                    self.error(expr.span, format!("{} is not used", expr.value));
                }
            }
            _ => {
                let op = self.check_expr(expr, None);
                if !op.is_invalid() && op.mode != Mode::NoValue {
                    self.error(expr.span, format!("{} is not used", expr.value));
                }
            }
        }
    }

    fn check_condition(&mut self, cond: &Node<Expr>, context: &str) {
        let op = self.check_expr(cond, None);
        if op.is_invalid() {
            return;
        }
        if op.mode == Mode::NoValue || !self.types.basic_kind(op.ty).map_or(false, BasicKind::is_boolean) {
            self.error(cond.span, format!("non-boolean condition in {}", context));
            return;
        }
        self.default_type_of(cond, &op, context);
    }

    fn check_var_decl(&mut self, gen: &GenDecl) {
        for spec in &gen.specs {
            let spec = &spec.value;
            let scope = self.ctx.scope;
            let declared = spec.ty.as_ref().map(|ty| self.resolve_type(ty, scope));

            let mut types = vec![declared.unwrap_or(TypeTable::INVALID); spec.names.len()];
            if !spec.values.is_empty() && spec.values.len() != spec.names.len() {
                self.mismatch(&spec.values[0], spec.names.len(), spec.values.len());
                for value in &spec.values {
                    self.check_expr(value, declared);
                }
            } else {
                for (i, value) in spec.values.iter().enumerate() {
                    let op = self.check_expr(value, declared);
                    types[i] = match declared {
                        Some(ty) => {
                            self.assign(value, &op, ty, "variable declaration");
                            ty
                        }
                        None => self.default_type_of(value, &op, "variable declaration"),
                    };
                }
            }

            for (name, ty) in spec.names.iter().zip(types) {
                self.declare_local(name, ObjectKind::Var, ty);
            }
        }
    }

    /// Constant declarations; `scope` is the package scope at top level
    pub(crate) fn check_const_decl(&mut self, gen: &GenDecl, scope: ScopeId) {
        for spec in &gen.specs {
            let spec = &spec.value;
            if spec.values.is_empty() {
                if let Some(first) = spec.names.first() {
                    self.error(first.span, "missing init expr for const declaration");
                }
                continue;
            }
            let lookup_scope = self.ctx.scope;
            let declared = spec.ty.as_ref().map(|ty| self.resolve_type(ty, lookup_scope));
            if spec.values.len() != spec.names.len() {
                self.mismatch(&spec.values[0], spec.names.len(), spec.values.len());
            }
            for (name, value) in spec.names.iter().zip(&spec.values) {
                let op = self.check_expr(value, declared);
                let constant = match &op.mode {
                    Mode::Constant(v) => Some(v.clone()),
                    Mode::Invalid => None,
                    _ => {
                        let desc = self.describe(value, &op);
                        self.error(value.span, format!("{} ({}) is not constant", value.value, desc));
                        None
                    }
                };
                let Some(constant) = constant else {
                    continue;
                };
                let ty = match declared {
                    Some(ty) => {
                        self.assign(value, &op, ty, "constant declaration");
                        ty
                    }
                    None => op.ty,
                };
                let obj = self.objects.alloc(self.local_object(
                    &name.value.name,
                    ObjectKind::Const(constant),
                    ty,
                    name.id,
                    name.span,
                ));
                self.info.defs.insert(name.id, obj);
                self.declare(scope, &name.value.name, obj, name.span);
            }
        }
    }

    fn check_short_var_decl(&mut self, stmt: &Node<Stmt>, names: &[Node<Ident>], values: &[Node<Expr>]) {
        let ops: Vec<Operand> = values.iter().map(|v| self.check_expr(v, None)).collect();

        // `a, b := f()` with a multi-value call
        let tuple = match (values, ops.as_slice()) {
            ([_], [op]) if names.len() > 1 => match self.types.get(op.ty) {
                Type::Tuple(items) if items.len() == names.len() => Some(items.clone()),
                _ => None,
            },
            _ => None,
        };
        if tuple.is_none() && names.len() != values.len() {
            if let Some(first) = values.first() {
                self.mismatch(first, names.len(), values.len());
            }
        }

        let scope = self.ctx.scope;
        let mut any_new = false;
        for (i, name) in names.iter().enumerate() {
            let value = values.get(i).zip(ops.get(i));
            if name.value.is_blank() {
                if let Some((value, op)) = value {
                    self.default_type_of(value, op, "assignment");
                }
                continue;
            }
            let existing = self.scopes.get(scope).lookup(&name.value.name);
            if let Some(existing) = existing {
                self.info.uses.insert(name.id, existing);
                let target = self.objects.get(existing).ty;
                if let Some((value, op)) = value {
                    self.assign(value, op, target, "assignment");
                }
                continue;
            }
            any_new = true;
            let ty = match (&tuple, value) {
                (Some(items), _) => items[i],
                (None, Some((value, op))) if names.len() == values.len() => {
                    self.default_type_of(value, op, "assignment")
                }
                _ => TypeTable::INVALID,
            };
            self.declare_local(name, ObjectKind::Var, ty);
        }
        if !any_new {
            self.error(stmt.span, "no new variables on left side of :=");
        }
    }

    fn check_assign(&mut self, lhs: &[Node<Expr>], op: AssignOp, rhs: &[Node<Expr>]) {
        if let Some(binary) = op.binary_op() {
            let (Some(target), Some(value)) = (lhs.first(), rhs.first()) else {
                return;
            };
            let l = self.check_expr(target, None);
            let r = self.check_expr(value, Some(l.ty));
            if l.is_invalid() || r.is_invalid() {
                return;
            }
            if !self.check_assignable_target(target, &l) {
                return;
            }
            if !self.assign(value, &r, l.ty, "assignment") {
                return;
            }
            let kind = self.types.basic_kind(l.ty);
            let allowed = match op {
                AssignOp::AddAssign => kind.map_or(false, |k| k.is_numeric() || k.is_string()),
                AssignOp::RemAssign => kind.map_or(false, BasicKind::is_integer),
                _ => kind.map_or(false, BasicKind::is_numeric),
            };
            if !allowed {
                let desc = self.describe(target, &l);
                self.error(
                    target.span,
                    format!("invalid operation: operator {} not defined on {} ({})", binary, target.value, desc),
                );
            }
            return;
        }

        if lhs.len() != rhs.len() {
            if let Some(first) = rhs.first() {
                self.mismatch(first, lhs.len(), rhs.len());
            }
            for value in rhs {
                self.check_expr(value, None);
            }
            return;
        }
        for (target, value) in lhs.iter().zip(rhs) {
            if matches!(&target.value, Expr::Ident(ident) if ident.is_blank()) {
                let op = self.check_expr(value, None);
                self.default_type_of(value, &op, "assignment");
                continue;
            }
            let l = self.check_expr(target, None);
            let expected = (!l.is_invalid()).then_some(l.ty);
            let r = self.check_expr(value, expected);
            if l.is_invalid() || !self.check_assignable_target(target, &l) {
                continue;
            }
            self.assign(value, &r, l.ty, "assignment");
        }
    }

    fn check_assignable_target(&mut self, target: &Node<Expr>, op: &Operand) -> bool {
        if op.mode == Mode::Variable {
            return true;
        }
        self.error(
            target.span,
            format!("cannot assign to {} (neither addressable nor a map index expression)", target.value),
        );
        false
    }

    fn check_return(&mut self, stmt: &Node<Stmt>, values: &[Node<Expr>]) {
        let Some(results) = self.ctx.results.clone() else {
            for value in values {
                let op = self.check_expr(value, None);
                self.default_type_of(value, &op, "return statement");
            }
            return;
        };
        if values.len() < results.len() {
            for value in values {
                self.check_expr(value, None);
            }
            self.error(stmt.span, "not enough return values");
            return;
        }
        if values.len() > results.len() {
            for value in values {
                self.check_expr(value, None);
            }
            self.error(values[results.len()].span, "too many return values");
            return;
        }
        for (value, ty) in values.iter().zip(results) {
            let op = self.check_expr(value, Some(ty));
            self.assign(value, &op, ty, "return statement");
        }
    }

    fn mismatch(&mut self, at: &Node<Expr>, vars: usize, values: usize) {
        self.error(
            at.span,
            format!(
                "assignment mismatch: {} variable{} but {} value{}",
                vars,
                plural(vars),
                values,
                plural(values)
            ),
        );
    }

    fn declare_local(&mut self, name: &Node<Ident>, kind: ObjectKind, ty: TypeId) {
        let obj = self
            .objects
            .alloc(self.local_object(&name.value.name, kind, ty, name.id, name.span));
        self.info.defs.insert(name.id, obj);
        let scope = self.ctx.scope;
        self.declare(scope, &name.value.name, obj, name.span);
    }

    // =========================================================================
    // Function bodies
    // =========================================================================

    /// Checks a body in a fresh function scope under `parent`. Method bodies
    /// also bound local name lookup.
    pub(crate) fn check_func_body(
        &mut self,
        sig_ty: TypeId,
        sig: &FuncSig,
        body: &Node<Block>,
        parent: ScopeId,
        method: bool,
    ) {
        let saved = self.ctx.clone();
        self.ctx.scope = parent;
        let scope = self.open_scope(ScopeKind::Function, body.span, body.id);
        if method {
            self.ctx.func_scope = scope;
        }
        let signature = self.types.signature(sig_ty).cloned();
        self.ctx.results = signature.as_ref().map(|s| s.results.clone());

        if let Some(signature) = &signature {
            let mut index = 0;
            for param in &sig.params {
                let ty = signature.params.get(index).copied().unwrap_or(TypeTable::INVALID);
                for name in &param.value.names {
                    self.declare_local(name, ObjectKind::Var, ty);
                }
                index += param.value.names.len().max(1);
            }
            let mut index = 0;
            for result in &sig.results {
                let ty = signature.results.get(index).copied().unwrap_or(TypeTable::INVALID);
                for name in &result.value.names {
                    self.declare_local(name, ObjectKind::Var, ty);
                }
                index += result.value.names.len().max(1);
            }
        }

        for stmt in &body.value.stmts {
            self.check_stmt(stmt);
        }
        self.ctx = saved;
    }
}
