//! Member lookup and type relations

use rustc_hash::FxHashSet;

use crate::checker::TypeChecker;
use crate::info::SelectionKind;
use crate::objects::{ObjectId, ObjectKind, ObjectTable};
use crate::types::{BasicKind, Type, TypeId, TypeTable};

/// A field or method found on a type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Member {
    pub obj: ObjectId,
    pub kind: SelectionKind,
    pub ty: TypeId,
}

/// Finds field or method `name` on `ty`, searching embedded fields breadth first.
/// The shallowest match wins.
pub fn lookup_member(types: &TypeTable, objects: &ObjectTable, ty: TypeId, name: &str) -> Option<Member> {
    let mut level = vec![types.deref(ty)];
    let mut seen = FxHashSet::default();
    while !level.is_empty() {
        let mut next = Vec::new();
        for current in level {
            if !seen.insert(current) {
                continue;
            }
            let method = types
                .methods(current)
                .iter()
                .copied()
                .find(|m| objects.get(*m).name == name);
            if let Some(obj) = method {
                return Some(Member {
                    obj,
                    kind: SelectionKind::MethodVal,
                    ty: objects.get(obj).ty,
                });
            }
            match types.get(types.underlying(current)) {
                Type::Struct(fields) => {
                    for field in fields {
                        let field_obj = objects.get(*field);
                        if field_obj.name == name {
                            return Some(Member {
                                obj: *field,
                                kind: SelectionKind::FieldVal,
                                ty: field_obj.ty,
                            });
                        }
                        if field_obj.is_embedded() {
                            next.push(types.deref(field_obj.ty));
                        }
                    }
                }
                Type::Interface(methods) => {
                    if let Some(obj) = methods.iter().copied().find(|m| objects.get(*m).name == name) {
                        return Some(Member {
                            obj,
                            kind: SelectionKind::MethodVal,
                            ty: objects.get(obj).ty,
                        });
                    }
                }
                _ => {}
            }
        }
        level = next;
    }
    None
}

/// Structural identity; named, struct and interface types are identical only to themselves
pub fn identical(types: &TypeTable, a: TypeId, b: TypeId) -> bool {
    if a == b {
        return true;
    }
    match (types.get(a), types.get(b)) {
        (Type::Pointer(x), Type::Pointer(y)) | (Type::Slice(x), Type::Slice(y)) => identical(types, *x, *y),
        (Type::Map(k1, v1), Type::Map(k2, v2)) => identical(types, *k1, *k2) && identical(types, *v1, *v2),
        (Type::Func(s1), Type::Func(s2)) => {
            s1.variadic == s2.variadic
                && all_identical(types, &s1.params, &s2.params)
                && all_identical(types, &s1.results, &s2.results)
        }
        (Type::Tuple(x), Type::Tuple(y)) => all_identical(types, x, y),
        _ => false,
    }
}

fn all_identical(types: &TypeTable, a: &[TypeId], b: &[TypeId]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| identical(types, *x, *y))
}

impl<'a> TypeChecker<'a> {
    pub(crate) fn member(&self, ty: TypeId, name: &str) -> Option<Member> {
        lookup_member(&self.types, &self.objects, ty, name)
    }

    /// Whether a value of type `from` may be assigned to `to`
    pub(crate) fn assignable(&self, from: TypeId, to: TypeId) -> bool {
        if from == TypeTable::INVALID || to == TypeTable::INVALID || identical(&self.types, from, to) {
            return true;
        }
        if let Type::Basic(kind) = self.types.get(from) {
            if kind.is_untyped() {
                return self.representable(*kind, to);
            }
        }
        if self.types.is_interface(to) {
            return self.implements(from, to);
        }
        // Identical structure where at least one side is unnamed
        let named = |t: TypeId| matches!(self.types.get(t), Type::Named(_));
        (!named(from) || !named(to))
            && identical(&self.types, self.types.underlying(from), self.types.underlying(to))
    }

    /// Whether an untyped constant of `kind` converts to `to`
    pub(crate) fn representable(&self, kind: BasicKind, to: TypeId) -> bool {
        let under = self.types.underlying(to);
        if let Type::Basic(target) = self.types.get(under) {
            return match kind {
                BasicKind::UntypedBool => target.is_boolean(),
                BasicKind::UntypedInt => target.is_numeric(),
                BasicKind::UntypedFloat => matches!(target, BasicKind::Float64 | BasicKind::UntypedFloat),
                BasicKind::UntypedString => target.is_string(),
                _ => false,
            };
        }
        match self.types.get(under) {
            Type::Interface(_) => {
                kind == BasicKind::UntypedNil || self.implements(TypeTable::basic(kind.default_kind()), to)
            }
            Type::Pointer(_) | Type::Slice(_) | Type::Map(..) | Type::Func(_) => kind == BasicKind::UntypedNil,
            _ => false,
        }
    }

    /// Whether `ty` has every method of interface `iface`
    pub(crate) fn implements(&self, ty: TypeId, iface: TypeId) -> bool {
        if ty == TypeTable::INVALID {
            return true;
        }
        let Type::Interface(methods) = self.types.get(self.types.underlying(iface)) else {
            return false;
        };
        methods.iter().all(|required| {
            let required = self.objects.get(*required);
            let Some(found) = self.member(ty, &required.name) else {
                return false;
            };
            if found.kind != SelectionKind::MethodVal {
                return false;
            }
            self.objects
                .candidates(found.obj)
                .iter()
                .any(|c| self.same_signature(self.objects.get(*c).ty, required.ty))
        })
    }

    /// Signature identity ignoring receivers
    fn same_signature(&self, a: TypeId, b: TypeId) -> bool {
        match (self.types.signature(a), self.types.signature(b)) {
            (Some(s1), Some(s2)) => {
                s1.variadic == s2.variadic
                    && all_identical(&self.types, &s1.params, &s2.params)
                    && all_identical(&self.types, &s1.results, &s2.results)
            }
            _ => false,
        }
    }

    /// Whether `obj` is a method set entry usable as a zero-argument property
    pub(crate) fn is_auto_property(&self, obj: ObjectId) -> Option<TypeId> {
        let obj = self.objects.get(obj);
        if !matches!(obj.kind, ObjectKind::Func) {
            return None;
        }
        let sig = self.types.signature(obj.ty)?;
        (sig.recv.is_some() && sig.params.is_empty() && sig.results.len() == 1).then(|| sig.results[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Object, PkgRef};
    use crate::types::Signature;

    fn object(objects: &mut ObjectTable, name: &str, kind: ObjectKind, ty: TypeId) -> ObjectId {
        objects.alloc(Object {
            name: name.to_string(),
            kind,
            ty,
            pkg: Some(PkgRef::local()),
            decl: None,
            span: None,
        })
    }

    #[test]
    fn test_lookup_through_embedded_field() {
        let mut types = TypeTable::new();
        let mut objects = ObjectTable::new();

        let base_obj = object(&mut objects, "Base", ObjectKind::TypeName, TypeTable::INVALID);
        let base = types.new_named(base_obj);
        let empty = types.alloc(Type::Struct(Vec::new()));
        types.set_underlying(base, empty);
        let sig = types.alloc(Type::Func(Signature {
            recv: Some(base),
            params: Vec::new(),
            results: vec![TypeTable::basic(BasicKind::Float64)],
            variadic: false,
        }));
        let xpos = object(&mut objects, "xpos", ObjectKind::Func, sig);
        types.add_method(base, xpos);

        let class_obj = object(&mut objects, "Bullet", ObjectKind::TypeName, TypeTable::INVALID);
        let class = types.new_named(class_obj);
        let embedded = object(&mut objects, "Base", ObjectKind::Field { embedded: true }, base);
        let speed = object(
            &mut objects,
            "speed",
            ObjectKind::Field { embedded: false },
            TypeTable::basic(BasicKind::Int),
        );
        let fields = types.alloc(Type::Struct(vec![embedded, speed]));
        types.set_underlying(class, fields);

        let found = lookup_member(&types, &objects, class, "xpos").unwrap();
        assert_eq!(found.obj, xpos);
        assert_eq!(found.kind, SelectionKind::MethodVal);

        let found = lookup_member(&types, &objects, class, "speed").unwrap();
        assert_eq!(found.kind, SelectionKind::FieldVal);
        assert_eq!(found.ty, TypeTable::basic(BasicKind::Int));

        assert!(lookup_member(&types, &objects, class, "missing").is_none());
    }

    #[test]
    fn test_identical_func_types() {
        let mut types = TypeTable::new();
        let int = TypeTable::basic(BasicKind::Int);
        let f1 = types.alloc(Type::Func(Signature {
            recv: None,
            params: vec![int],
            results: Vec::new(),
            variadic: false,
        }));
        let f2 = types.alloc(Type::Func(Signature {
            recv: None,
            params: vec![int],
            results: Vec::new(),
            variadic: false,
        }));
        let f3 = types.alloc(Type::Func(Signature {
            recv: None,
            params: vec![TypeTable::basic(BasicKind::String)],
            results: Vec::new(),
            variadic: false,
        }));
        assert!(identical(&types, f1, f2));
        assert!(!identical(&types, f1, f3));
    }
}
