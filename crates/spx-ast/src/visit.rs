//! Depth-first AST traversal in source order

use super::*;

/// Traversal hooks. Returning `false` from a `visit_*` hook skips the children.
///
/// Identifier nodes that are not expressions (declared names, selector
/// properties, parameters, fields) are reported through `visit_ident`.
pub trait Visitor<'ast> {
    fn visit_decl(&mut self, _decl: &'ast Node<Decl>) -> bool {
        true
    }

    fn visit_stmt(&mut self, _stmt: &'ast Node<Stmt>) -> bool {
        true
    }

    fn visit_expr(&mut self, _expr: &'ast Node<Expr>) -> bool {
        true
    }

    fn visit_type(&mut self, _ty: &'ast Node<TypeExpr>) -> bool {
        true
    }

    fn visit_ident(&mut self, _ident: &'ast Node<Ident>) {}

    fn leave_expr(&mut self, _expr: &'ast Node<Expr>) {}
}

pub fn walk_file<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, file: &'ast File) {
    if let Some(package) = &file.package {
        v.visit_ident(package);
    }
    for import in &file.imports {
        if let Some(name) = &import.value.name {
            v.visit_ident(name);
        }
    }
    for decl in &file.decls {
        walk_decl(v, decl);
    }
}

pub fn walk_decl<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, decl: &'ast Node<Decl>) {
    if !v.visit_decl(decl) {
        return;
    }
    match &decl.value {
        Decl::Var(gen) | Decl::Const(gen) => walk_gen_decl(v, gen),
        Decl::Type(specs) => {
            for spec in specs {
                v.visit_ident(&spec.value.name);
                walk_type(v, &spec.value.ty);
            }
        }
        Decl::Func(func) => {
            v.visit_ident(&func.name);
            walk_sig(v, &func.sig.value);
            if let Some(body) = &func.body {
                walk_block(v, &body.value);
            }
        }
        Decl::Stmt(stmt) => walk_stmt(v, stmt),
    }
}

fn walk_gen_decl<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, gen: &'ast GenDecl) {
    for spec in &gen.specs {
        for name in &spec.value.names {
            v.visit_ident(name);
        }
        if let Some(ty) = &spec.value.ty {
            walk_type(v, ty);
        }
        for value in &spec.value.values {
            walk_expr(v, value);
        }
    }
}

pub fn walk_block<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, block: &'ast Block) {
    for stmt in &block.stmts {
        walk_stmt(v, stmt);
    }
}

pub fn walk_stmt<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, stmt: &'ast Node<Stmt>) {
    if !v.visit_stmt(stmt) {
        return;
    }
    match &stmt.value {
        Stmt::Expr(expr) => walk_expr(v, expr),
        Stmt::Var(gen) | Stmt::Const(gen) => walk_gen_decl(v, gen),
        Stmt::ShortVarDecl { names, values } => {
            for name in names {
                v.visit_ident(name);
            }
            for value in values {
                walk_expr(v, value);
            }
        }
        Stmt::Assign { lhs, rhs, .. } => {
            for expr in lhs.iter().chain(rhs) {
                walk_expr(v, expr);
            }
        }
        Stmt::IncDec { target, .. } => walk_expr(v, target),
        Stmt::If {
            init,
            condition,
            then_block,
            else_stmt,
        } => {
            if let Some(init) = init {
                walk_stmt(v, init);
            }
            walk_expr(v, condition);
            walk_block(v, &then_block.value);
            if let Some(else_stmt) = else_stmt {
                walk_stmt(v, else_stmt);
            }
        }
        Stmt::For {
            init,
            condition,
            post,
            body,
        } => {
            if let Some(init) = init {
                walk_stmt(v, init);
            }
            if let Some(condition) = condition {
                walk_expr(v, condition);
            }
            if let Some(post) = post {
                walk_stmt(v, post);
            }
            walk_block(v, &body.value);
        }
        Stmt::Return(values) => {
            for value in values {
                walk_expr(v, value);
            }
        }
        Stmt::Block(block) => walk_block(v, block),
        Stmt::Break | Stmt::Continue | Stmt::Empty => {}
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, expr: &'ast Node<Expr>) {
    if !v.visit_expr(expr) {
        return;
    }
    match &expr.value {
        Expr::Ident(_) | Expr::Literal(_) => {}
        Expr::Composite { ty, elements } => {
            if let Some(ty) = ty {
                walk_type(v, ty);
            }
            for element in elements {
                if let Some(key) = &element.value.key {
                    walk_expr(v, key);
                }
                walk_expr(v, &element.value.value);
            }
        }
        Expr::SliceLit(items) => {
            for item in items {
                walk_expr(v, item);
            }
        }
        Expr::FuncLit { sig, body } => {
            walk_sig(v, &sig.value);
            walk_block(v, &body.value);
        }
        Expr::Lambda { params, body } => {
            for param in params {
                v.visit_ident(param);
            }
            match body {
                LambdaBody::Expr(body) => walk_expr(v, body),
                LambdaBody::Block(block) => walk_block(v, &block.value),
            }
        }
        Expr::Paren(inner) => walk_expr(v, inner),
        Expr::Selector { object, property } => {
            walk_expr(v, object);
            v.visit_ident(property);
        }
        Expr::Index { object, index } => {
            walk_expr(v, object);
            walk_expr(v, index);
        }
        Expr::Call { callee, args, .. } => {
            walk_expr(v, callee);
            for arg in args {
                walk_expr(v, arg);
            }
        }
        Expr::Unary { expr: inner, .. } => walk_expr(v, inner),
        Expr::Binary { left, right, .. } => {
            walk_expr(v, left);
            walk_expr(v, right);
        }
    }
    v.leave_expr(expr);
}

pub fn walk_type<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, ty: &'ast Node<TypeExpr>) {
    if !v.visit_type(ty) {
        return;
    }
    match &ty.value {
        TypeExpr::Name(_) => {}
        TypeExpr::Qualified { pkg, name } => {
            v.visit_ident(pkg);
            v.visit_ident(name);
        }
        TypeExpr::Pointer(elem) | TypeExpr::Slice(elem) => walk_type(v, elem),
        TypeExpr::Map { key, value } => {
            walk_type(v, key);
            walk_type(v, value);
        }
        TypeExpr::Func(sig) => walk_sig(v, sig),
        TypeExpr::Struct(fields) => {
            for field in fields {
                for name in &field.value.names {
                    v.visit_ident(name);
                }
                walk_type(v, &field.value.ty);
            }
        }
        TypeExpr::Interface(methods) => {
            for method in methods {
                v.visit_ident(&method.value.name);
                walk_sig(v, &method.value.sig.value);
            }
        }
    }
}

fn walk_sig<'ast, V: Visitor<'ast> + ?Sized>(v: &mut V, sig: &'ast FuncSig) {
    for param in sig.params.iter().chain(&sig.results) {
        for name in &param.value.names {
            v.visit_ident(name);
        }
        walk_type(v, &param.value.ty);
    }
}
