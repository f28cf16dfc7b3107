//! Named language entities: variables, constants, types, functions, packages

use spx_ast::{NodeId, Span};
use std::fmt;

use crate::types::{BasicKind, TypeId, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// Value of a compile-time constant
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ConstValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Kind of an untyped constant holding this value
    pub fn untyped_kind(&self) -> BasicKind {
        match self {
            ConstValue::Bool(_) => BasicKind::UntypedBool,
            ConstValue::Int(_) => BasicKind::UntypedInt,
            ConstValue::Float(_) => BasicKind::UntypedFloat,
            ConstValue::String(_) => BasicKind::UntypedString,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstValue::Int(v) => Some(*v as f64),
            ConstValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(v) => write!(f, "{}", v),
            ConstValue::Int(v) => write!(f, "{}", v),
            ConstValue::Float(v) => write!(f, "{}", v),
            ConstValue::String(v) => write!(f, "{:?}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Len,
    Println,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Var,
    Field { embedded: bool },
    Const(ConstValue),
    TypeName,
    Func,
    /// Functions or methods sharing one name; call resolution picks a member
    Overloads(Vec<ObjectId>),
    PkgName(String),
    Builtin(BuiltinKind),
    Nil,
}

/// Package an object belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgRef {
    pub path: String,
    pub name: String,
}

impl PkgRef {
    pub const LOCAL_PATH: &'static str = "main";

    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    pub fn local() -> Self {
        Self::new(Self::LOCAL_PATH, Self::LOCAL_PATH)
    }

    /// Whether this is the package being checked
    pub fn is_local(&self) -> bool {
        self.path == Self::LOCAL_PATH
    }
}

#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    pub ty: TypeId,
    /// `None` for universe objects
    pub pkg: Option<PkgRef>,
    /// Identifier node that declares the object, if it is in checked source
    pub decl: Option<NodeId>,
    pub span: Option<Span>,
}

impl Object {
    pub fn is_embedded(&self) -> bool {
        matches!(self.kind, ObjectKind::Field { embedded: true })
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind, ObjectKind::Field { .. })
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind, ObjectKind::Var | ObjectKind::Field { .. })
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, ObjectKind::Func | ObjectKind::Overloads(_))
    }

    pub fn const_value(&self) -> Option<&ConstValue> {
        match &self.kind {
            ObjectKind::Const(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the object comes from the given package path
    pub fn in_package(&self, path: &str) -> bool {
        self.pkg.as_ref().map_or(false, |p| p.path == path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    objects: Vec<Object>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    pub fn get(&self, id: ObjectId) -> &Object {
        &self.objects[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ObjectId) -> &mut Object {
        &mut self.objects[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, obj)| (ObjectId(i as u32), obj))
    }

    /// Members of an overload set, or the object itself
    pub fn candidates(&self, id: ObjectId) -> Vec<ObjectId> {
        match &self.get(id).kind {
            ObjectKind::Overloads(members) => members.clone(),
            _ => vec![id],
        }
    }

    /// Adds `func` under its name, turning a repeated name into an overload set.
    /// Returns the object the name now refers to.
    pub fn merge_overload(&mut self, existing: Option<ObjectId>, func: ObjectId) -> ObjectId {
        let Some(existing) = existing else {
            return func;
        };
        let merged = match &mut self.get_mut(existing).kind {
            ObjectKind::Overloads(members) => {
                members.push(func);
                return existing;
            }
            ObjectKind::Func => vec![existing, func],
            _ => return existing,
        };
        let first = self.get(existing).clone();
        self.alloc(Object {
            name: first.name,
            kind: ObjectKind::Overloads(merged),
            ty: first.ty,
            pkg: first.pkg,
            decl: None,
            span: None,
        })
    }

    /// `main.X`, `spx.Sprite.setCostume` style qualified name for messages
    pub fn qualified_name(&self, id: ObjectId, types: &TypeTable) -> String {
        let obj = self.get(id);
        let recv = types.signature(obj.ty).and_then(|sig| sig.recv);
        match recv.and_then(|r| types.named_obj(types.deref(r))) {
            Some(owner) => format!("{}.{}", self.get(owner).name, obj.name),
            None => obj.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn func(table: &mut ObjectTable, name: &str) -> ObjectId {
        table.alloc(Object {
            name: name.to_string(),
            kind: ObjectKind::Func,
            ty: TypeTable::INVALID,
            pkg: Some(PkgRef::local()),
            decl: None,
            span: None,
        })
    }

    #[test]
    fn test_merge_overload_builds_set() {
        let mut table = ObjectTable::new();
        let a = func(&mut table, "play");
        let b = func(&mut table, "play");
        let c = func(&mut table, "play");

        let first = table.merge_overload(None, a);
        assert_eq!(first, a);
        let set = table.merge_overload(Some(first), b);
        assert_ne!(set, a);
        let same = table.merge_overload(Some(set), c);
        assert_eq!(same, set);
        assert_eq!(table.candidates(set), vec![a, b, c]);
        assert_eq!(table.candidates(a), vec![a]);
    }

    #[test]
    fn test_const_value_display() {
        assert_eq!(ConstValue::String("biu".into()).to_string(), "\"biu\"");
        assert_eq!(ConstValue::Int(3).to_string(), "3");
        assert_eq!(ConstValue::Int(3).as_f64(), Some(3.0));
    }
}
