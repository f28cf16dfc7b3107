//! Calls: overload resolution, conversions and builtins

use spx_ast::{Expr, Node, NodeId, Span};

use crate::checker::TypeChecker;
use crate::expr_checker::Operand;
use crate::info::Mode;
use crate::objects::{BuiltinKind, ObjectId, ObjectKind};
use crate::types::{BasicKind, Signature, Type, TypeId, TypeTable};

/// A checked callee
pub(crate) struct Callee {
    pub op: Operand,
    /// Node whose `uses` entry names the called object
    pub name_node: Option<NodeId>,
    /// Selector expression, when the callee is `x.m`
    pub selector: Option<NodeId>,
}

impl<'a> TypeChecker<'a> {
    /// Checks the callee position of a call; methods are not auto-properties here
    pub(crate) fn check_callee(&mut self, callee: &Node<Expr>) -> Callee {
        let target = Expr::unparen(callee);
        let (name_node, selector) = match &target.value {
            Expr::Ident(_) => (Some(target.id), None),
            Expr::Selector { property, .. } => (Some(property.id), Some(target.id)),
            _ => (None, None),
        };
        let op = self.check_expr_inner(callee, None, true);
        self.record_operand(callee.id, &op);
        Callee {
            op,
            name_node,
            selector,
        }
    }

    pub(crate) fn check_call(&mut self, expr: &Node<Expr>, callee: &Node<Expr>, args: &[Node<Expr>]) -> Operand {
        let target = self.check_callee(callee);
        self.finish_call(expr.span, callee, target, args)
    }

    /// Resolves a call once its callee is known
    pub(crate) fn finish_call(&mut self, span: Span, callee: &Node<Expr>, target: Callee, args: &[Node<Expr>]) -> Operand {
        match target.op.mode {
            Mode::Invalid => {
                self.check_args_unconstrained(args);
                Operand::invalid()
            }
            Mode::TypeExpr => self.check_conversion(span, target.op.ty, args),
            Mode::Builtin => {
                let kind = target
                    .name_node
                    .and_then(|n| self.info.uses.get(&n).copied())
                    .and_then(|obj| match self.objects.get(obj).kind {
                        ObjectKind::Builtin(kind) => Some(kind),
                        _ => None,
                    });
                match kind {
                    Some(kind) => self.check_builtin(span, kind, args),
                    None => {
                        self.check_args_unconstrained(args);
                        Operand::invalid()
                    }
                }
            }
            _ => self.check_func_call(span, callee, target, args),
        }
    }

    fn check_args_unconstrained(&mut self, args: &[Node<Expr>]) {
        for arg in args {
            self.check_expr(arg, None);
        }
    }

    fn check_func_call(&mut self, span: Span, callee: &Node<Expr>, target: Callee, args: &[Node<Expr>]) -> Operand {
        let obj = target.name_node.and_then(|n| self.info.uses.get(&n).copied());
        let candidates: Vec<(Option<ObjectId>, Signature)> = match obj {
            Some(obj) if self.objects.get(obj).is_func() => self
                .objects
                .candidates(obj)
                .into_iter()
                .filter_map(|c| self.types.signature(self.objects.get(c).ty).map(|s| (Some(c), s.clone())))
                .collect(),
            _ => self
                .types
                .signature(target.op.ty)
                .map(|s| vec![(None, s.clone())])
                .unwrap_or_default(),
        };
        if candidates.is_empty() {
            let desc = self.describe(callee, &target.op);
            self.error(callee.span, format!("cannot call non-function {} ({})", callee.value, desc));
            self.check_args_unconstrained(args);
            return Operand::invalid();
        }

        // Arguments whose type depends on the parameter wait for the choice
        let pre: Vec<Option<Operand>> = args
            .iter()
            .map(|arg| {
                if is_deferred(arg) {
                    None
                } else {
                    Some(self.check_expr(arg, None))
                }
            })
            .collect();

        let chosen = candidates
            .iter()
            .position(|(_, sig)| self.accepts(sig, args, &pre))
            .or_else(|| {
                candidates
                    .iter()
                    .position(|(_, sig)| arity_ok(sig, args.len()))
            })
            .unwrap_or(0);
        let (chosen_obj, sig) = candidates[chosen].clone();

        if let Some(chosen_obj) = chosen_obj {
            let chosen_ty = self.objects.get(chosen_obj).ty;
            if let Some(name_node) = target.name_node {
                self.info.uses.insert(name_node, chosen_obj);
            }
            if let Some(selection) = target.selector.and_then(|s| self.info.selections.get_mut(&s)) {
                selection.obj = chosen_obj;
                selection.ty = chosen_ty;
            }
            self.record(callee.id, Mode::Value, chosen_ty);
        }

        let name = callee.value.to_string();
        let context = format!("argument to {}", name);
        let mut reported_extra = false;
        for (i, (arg, pre)) in args.iter().zip(pre).enumerate() {
            let param = self.types.param_at(&sig, i);
            let op = match pre {
                Some(op) => op,
                None => self.check_expr(arg, param),
            };
            match param {
                Some(param) => {
                    self.assign(arg, &op, param, &context);
                }
                None if !reported_extra => {
                    self.error(arg.span, format!("too many arguments in call to {}", name));
                    reported_extra = true;
                }
                None => {}
            }
        }
        let required = if sig.variadic {
            sig.params.len().saturating_sub(1)
        } else {
            sig.params.len()
        };
        if args.len() < required {
            self.error(span, format!("not enough arguments in call to {}", name));
        }

        self.call_result(&sig)
    }

    /// Whether `sig` takes `args`; deferred arguments only need a compatible shape
    fn accepts(&self, sig: &Signature, args: &[Node<Expr>], pre: &[Option<Operand>]) -> bool {
        if !arity_ok(sig, args.len()) {
            return false;
        }
        args.iter().zip(pre).enumerate().all(|(i, (arg, pre))| {
            let Some(param) = self.types.param_at(sig, i) else {
                return false;
            };
            match pre {
                Some(op) if op.is_invalid() => true,
                Some(op) if op.mode == Mode::NoValue || op.mode == Mode::TypeExpr => false,
                Some(op) => self.assignable(op.ty, param),
                None => self.shape_fits(arg, param),
            }
        })
    }

    fn shape_fits(&self, arg: &Node<Expr>, param: TypeId) -> bool {
        let under = self.types.get(self.types.underlying(self.types.deref(param)));
        match &Expr::unparen(arg).value {
            Expr::Lambda { params, .. } => match under {
                Type::Func(sig) => sig.params.len() == params.len(),
                _ => false,
            },
            Expr::Composite { .. } => matches!(under, Type::Struct(_) | Type::Map(..) | Type::Slice(_)),
            Expr::SliceLit(_) => matches!(under, Type::Slice(_)),
            _ => true,
        }
    }

    fn call_result(&mut self, sig: &Signature) -> Operand {
        match sig.results.len() {
            0 => Operand::new(Mode::NoValue, TypeTable::INVALID),
            1 => Operand::new(Mode::Value, sig.results[0]),
            _ => Operand::new(Mode::Value, self.types.alloc(Type::Tuple(sig.results.clone()))),
        }
    }

    fn check_conversion(&mut self, span: Span, target: TypeId, args: &[Node<Expr>]) -> Operand {
        let type_name = self.type_string(target);
        let arg = match args {
            [arg] => arg,
            [] => {
                self.error(span, format!("missing argument in conversion to {}", type_name));
                return Operand::invalid();
            }
            [_, extra, ..] => {
                self.error(extra.span, format!("too many arguments in conversion to {}", type_name));
                self.check_args_unconstrained(args);
                return Operand::invalid();
            }
        };
        let op = self.check_expr(arg, Some(target));
        if op.is_invalid() {
            return Operand::new(Mode::Value, target);
        }
        if !self.convertible(&op, target) {
            let desc = self.describe(arg, &op);
            self.error(arg.span, format!("cannot convert {} ({}) to type {}", arg.value, desc, type_name));
            return Operand::new(Mode::Value, target);
        }
        if self.types.is_untyped(op.ty) {
            self.update_untyped(arg, target);
        }
        match op.mode {
            Mode::Constant(value) if self.types.basic_kind(target).is_some() => {
                Operand::new(Mode::Constant(value), target)
            }
            _ => Operand::new(Mode::Value, target),
        }
    }

    fn convertible(&self, op: &Operand, target: TypeId) -> bool {
        if self.assignable(op.ty, target) {
            return true;
        }
        match (self.types.basic_kind(op.ty), self.types.basic_kind(target)) {
            (Some(from), Some(to)) => {
                (from.is_numeric() && to.is_numeric()) || (from.is_string() && to.is_string())
            }
            _ => crate::lookup::identical(
                &self.types,
                self.types.underlying(op.ty),
                self.types.underlying(target),
            ),
        }
    }

    fn check_builtin(&mut self, span: Span, kind: BuiltinKind, args: &[Node<Expr>]) -> Operand {
        match kind {
            BuiltinKind::Len => {
                let [arg] = args else {
                    let message = if args.is_empty() {
                        "not enough arguments for len"
                    } else {
                        "too many arguments for len"
                    };
                    self.error(span, message);
                    self.check_args_unconstrained(args);
                    return Operand::invalid();
                };
                let op = self.check_expr(arg, None);
                if op.is_invalid() {
                    return Operand::new(Mode::Value, TypeTable::basic(BasicKind::Int));
                }
                let ty = self.default_type_of(arg, &op, "argument to len");
                let ok = match self.types.get(self.types.underlying(ty)) {
                    Type::Slice(_) | Type::Map(..) => true,
                    Type::Basic(kind) => kind.is_string(),
                    _ => false,
                };
                if !ok {
                    let desc = self.describe(arg, &op);
                    self.error(
                        arg.span,
                        format!("invalid argument: {} ({}) for built-in len", arg.value, desc),
                    );
                }
                Operand::new(Mode::Value, TypeTable::basic(BasicKind::Int))
            }
            BuiltinKind::Println => {
                for arg in args {
                    let op = self.check_expr(arg, None);
                    self.default_type_of(arg, &op, "argument to println");
                }
                Operand::new(Mode::NoValue, TypeTable::INVALID)
            }
        }
    }
}

fn arity_ok(sig: &Signature, count: usize) -> bool {
    if sig.variadic {
        count + 1 >= sig.params.len()
    } else {
        count == sig.params.len()
    }
}

/// Arguments typed from the parameter they are passed to
fn is_deferred(arg: &Node<Expr>) -> bool {
    matches!(
        Expr::unparen(arg).value,
        Expr::Lambda { .. } | Expr::Composite { ty: None, .. } | Expr::SliceLit(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(params: usize, variadic: bool) -> Signature {
        Signature {
            recv: None,
            params: vec![TypeTable::basic(BasicKind::Int); params],
            results: Vec::new(),
            variadic,
        }
    }

    #[test]
    fn test_arity() {
        assert!(arity_ok(&sig(2, false), 2));
        assert!(!arity_ok(&sig(2, false), 1));
        assert!(arity_ok(&sig(2, true), 1));
        assert!(arity_ok(&sig(2, true), 4));
        assert!(!arity_ok(&sig(2, true), 0));
    }
}
