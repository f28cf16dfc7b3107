//! Type representation
//!
//! Types live in a [`TypeTable`] arena and are referred to by [`TypeId`].
//! Basic types occupy fixed slots so they can be named without a table.

use crate::objects::{ObjectId, ObjectTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Invalid,
    Bool,
    Int,
    Int64,
    Float64,
    String,
    UntypedBool,
    UntypedInt,
    UntypedFloat,
    UntypedString,
    UntypedNil,
}

const BASIC_KINDS: [BasicKind; 11] = [
    BasicKind::Invalid,
    BasicKind::Bool,
    BasicKind::Int,
    BasicKind::Int64,
    BasicKind::Float64,
    BasicKind::String,
    BasicKind::UntypedBool,
    BasicKind::UntypedInt,
    BasicKind::UntypedFloat,
    BasicKind::UntypedString,
    BasicKind::UntypedNil,
];

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Invalid => "invalid type",
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Int64 => "int64",
            BasicKind::Float64 => "float64",
            BasicKind::String => "string",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedFloat
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(self, BasicKind::Int | BasicKind::Int64 | BasicKind::UntypedInt)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, BasicKind::Float64 | BasicKind::UntypedFloat)
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    /// The type an untyped constant takes when nothing else is expected
    pub fn default_kind(self) -> BasicKind {
        match self {
            BasicKind::UntypedBool => BasicKind::Bool,
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedFloat => BasicKind::Float64,
            BasicKind::UntypedString => BasicKind::String,
            other => other,
        }
    }
}

/// Function or method signature
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub recv: Option<TypeId>,
    pub params: Vec<TypeId>,
    pub results: Vec<TypeId>,
    /// The last parameter is a slice collecting trailing arguments
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    pub obj: ObjectId,
    pub underlying: TypeId,
    pub methods: Vec<ObjectId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Basic(BasicKind),
    Named(NamedType),
    Pointer(TypeId),
    Slice(TypeId),
    Map(TypeId, TypeId),
    Func(Signature),
    /// Field objects in declaration order
    Struct(Vec<ObjectId>),
    /// Method objects
    Interface(Vec<ObjectId>),
    Tuple(Vec<TypeId>),
}

/// Arena of all types created during one check
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<Type>,
}

impl TypeTable {
    pub const INVALID: TypeId = TypeId(0);

    pub fn new() -> Self {
        Self {
            types: BASIC_KINDS.iter().map(|k| Type::Basic(*k)).collect(),
        }
    }

    pub fn basic(kind: BasicKind) -> TypeId {
        let index = BASIC_KINDS.iter().position(|k| *k == kind).unwrap_or(0);
        TypeId(index as u32)
    }

    pub fn alloc(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        self.types.get(id.0 as usize).unwrap_or(&Type::Basic(BasicKind::Invalid))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_invalid(&self, id: TypeId) -> bool {
        id == Self::INVALID
    }

    /// Follows named types down to their structure
    pub fn underlying(&self, id: TypeId) -> TypeId {
        let mut current = id;
        // Named chains are short; the bound guards against cycles in broken code
        for _ in 0..16 {
            match self.get(current) {
                Type::Named(named) if named.underlying != current => current = named.underlying,
                _ => return current,
            }
        }
        current
    }

    /// Strips one level of pointer indirection
    pub fn deref(&self, id: TypeId) -> TypeId {
        match self.get(id) {
            Type::Pointer(elem) => *elem,
            _ => id,
        }
    }

    pub fn named_obj(&self, id: TypeId) -> Option<ObjectId> {
        match self.get(id) {
            Type::Named(named) => Some(named.obj),
            _ => None,
        }
    }

    pub fn basic_kind(&self, id: TypeId) -> Option<BasicKind> {
        match self.get(self.underlying(id)) {
            Type::Basic(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_untyped(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Basic(kind) if kind.is_untyped())
    }

    pub fn signature(&self, id: TypeId) -> Option<&Signature> {
        match self.get(self.underlying(id)) {
            Type::Func(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn is_interface(&self, id: TypeId) -> bool {
        matches!(self.get(self.underlying(id)), Type::Interface(_))
    }

    /// Parameter type for argument `index`, expanding a variadic tail
    pub fn param_at(&self, sig: &Signature, index: usize) -> Option<TypeId> {
        if sig.variadic && !sig.params.is_empty() && index + 1 >= sig.params.len() {
            let last = sig.params[sig.params.len() - 1];
            return match self.get(last) {
                Type::Slice(elem) => Some(*elem),
                _ => Some(last),
            };
        }
        sig.params.get(index).copied()
    }

    pub fn new_named(&mut self, obj: ObjectId) -> TypeId {
        self.alloc(Type::Named(NamedType {
            obj,
            underlying: Self::INVALID,
            methods: Vec::new(),
        }))
    }

    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        // Declaring `type T T` must not make the type its own structure
        let resolved = self.underlying(underlying);
        if let Some(Type::Named(n)) = self.types.get_mut(named.0 as usize) {
            n.underlying = if resolved == named { Self::INVALID } else { resolved };
        }
    }

    pub fn add_method(&mut self, named: TypeId, method: ObjectId) {
        if let Some(Type::Named(n)) = self.types.get_mut(named.0 as usize) {
            n.methods.push(method);
        }
    }

    pub fn replace_method(&mut self, named: TypeId, index: usize, method: ObjectId) {
        if let Some(Type::Named(n)) = self.types.get_mut(named.0 as usize) {
            if let Some(slot) = n.methods.get_mut(index) {
                *slot = method;
            }
        }
    }

    pub fn methods(&self, id: TypeId) -> &[ObjectId] {
        match self.get(id) {
            Type::Named(named) => &named.methods,
            _ => &[],
        }
    }

    /// Renders a type the way diagnostics spell it
    pub fn display(&self, id: TypeId, objects: &ObjectTable) -> String {
        let mut out = String::new();
        self.write_type(&mut out, id, objects, 0);
        out
    }

    fn write_type(&self, out: &mut String, id: TypeId, objects: &ObjectTable, depth: usize) {
        if depth > 8 {
            out.push_str("...");
            return;
        }
        match self.get(id) {
            Type::Basic(kind) => out.push_str(kind.name()),
            Type::Named(named) => {
                let obj = objects.get(named.obj);
                if let Some(pkg) = obj.pkg.as_ref().filter(|p| !p.is_local()) {
                    out.push_str(&pkg.name);
                    out.push('.');
                }
                out.push_str(&obj.name);
            }
            Type::Pointer(elem) => {
                out.push('*');
                self.write_type(out, *elem, objects, depth + 1);
            }
            Type::Slice(elem) => {
                out.push_str("[]");
                self.write_type(out, *elem, objects, depth + 1);
            }
            Type::Map(key, value) => {
                out.push_str("map[");
                self.write_type(out, *key, objects, depth + 1);
                out.push(']');
                self.write_type(out, *value, objects, depth + 1);
            }
            Type::Func(sig) => {
                out.push_str("func");
                self.write_signature(out, sig, objects, depth);
            }
            Type::Struct(fields) => {
                out.push_str("struct{");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    let field = objects.get(*field);
                    if !field.is_embedded() {
                        out.push_str(&field.name);
                        out.push(' ');
                    }
                    self.write_type(out, field.ty, objects, depth + 1);
                }
                out.push('}');
            }
            Type::Interface(methods) => {
                if methods.is_empty() {
                    out.push_str("interface{}");
                    return;
                }
                out.push_str("interface{");
                for (i, method) in methods.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    let method = objects.get(*method);
                    out.push_str(&method.name);
                    if let Type::Func(sig) = self.get(method.ty) {
                        self.write_signature(out, sig, objects, depth + 1);
                    }
                }
                out.push('}');
            }
            Type::Tuple(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(out, *item, objects, depth + 1);
                }
                out.push(')');
            }
        }
    }

    fn write_signature(&self, out: &mut String, sig: &Signature, objects: &ObjectTable, depth: usize) {
        out.push('(');
        for (i, param) in sig.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if sig.variadic && i + 1 == sig.params.len() {
                out.push_str("...");
                let elem = match self.get(*param) {
                    Type::Slice(elem) => *elem,
                    _ => *param,
                };
                self.write_type(out, elem, objects, depth + 1);
            } else {
                self.write_type(out, *param, objects, depth + 1);
            }
        }
        out.push(')');
        match sig.results.len() {
            0 => {}
            1 => {
                out.push(' ');
                self.write_type(out, sig.results[0], objects, depth + 1);
            }
            _ => {
                out.push_str(" (");
                for (i, result) in sig.results.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_type(out, *result, objects, depth + 1);
                }
                out.push(')');
            }
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_slots_are_stable() {
        let table = TypeTable::new();
        assert_eq!(TypeTable::basic(BasicKind::Invalid), TypeTable::INVALID);
        let string = TypeTable::basic(BasicKind::String);
        assert_eq!(table.get(string), &Type::Basic(BasicKind::String));
        assert_eq!(table.basic_kind(string), Some(BasicKind::String));
    }

    #[test]
    fn test_untyped_defaults() {
        assert_eq!(BasicKind::UntypedInt.default_kind(), BasicKind::Int);
        assert_eq!(BasicKind::UntypedString.default_kind(), BasicKind::String);
        assert!(BasicKind::UntypedFloat.is_numeric());
        assert!(!BasicKind::String.is_untyped());
    }

    #[test]
    fn test_variadic_param_at() {
        let mut table = TypeTable::new();
        let int = TypeTable::basic(BasicKind::Int);
        let string = TypeTable::basic(BasicKind::String);
        let tail = table.alloc(Type::Slice(int));
        let sig = Signature {
            recv: None,
            params: vec![string, tail],
            results: vec![],
            variadic: true,
        };
        assert_eq!(table.param_at(&sig, 0), Some(string));
        assert_eq!(table.param_at(&sig, 1), Some(int));
        assert_eq!(table.param_at(&sig, 5), Some(int));
    }

    #[test]
    fn test_display_composite_types() {
        let mut table = TypeTable::new();
        let objects = ObjectTable::new();
        let int = TypeTable::basic(BasicKind::Int);
        let string = TypeTable::basic(BasicKind::String);
        let slice = table.alloc(Type::Slice(int));
        let map = table.alloc(Type::Map(string, slice));
        let func = table.alloc(Type::Func(Signature {
            recv: None,
            params: vec![string, slice],
            results: vec![int],
            variadic: true,
        }));
        assert_eq!(table.display(map, &objects), "map[string][]int");
        assert_eq!(table.display(func, &objects), "func(string, ...int) int");
    }
}
