//! Results of type checking, keyed by AST node id

use rustc_hash::FxHashMap;
use spx_ast::NodeId;

use crate::objects::{ConstValue, ObjectId};
use crate::scope::ScopeId;
use crate::types::TypeId;

/// How an expression may be used
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Invalid,
    /// Call of a function without results
    NoValue,
    Value,
    /// Addressable value (variables, fields, index into a slice)
    Variable,
    Constant(ConstValue),
    TypeExpr,
    Builtin,
    PkgName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAndValue {
    pub mode: Mode,
    pub ty: TypeId,
}

impl TypeAndValue {
    pub fn const_value(&self) -> Option<&ConstValue> {
        match &self.mode {
            Mode::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self.mode, Mode::Value | Mode::Variable | Mode::Constant(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    FieldVal,
    MethodVal,
}

/// `x.f` resolved to a field or method
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub kind: SelectionKind,
    /// Type of `x`
    pub recv: TypeId,
    pub obj: ObjectId,
    /// Type of the whole selector expression
    pub ty: TypeId,
}

/// Symbol tables produced by a check. Partial when the source has errors.
#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    /// Type and mode of every checked expression
    pub types: FxHashMap<NodeId, TypeAndValue>,
    /// Identifiers that declare an object
    pub defs: FxHashMap<NodeId, ObjectId>,
    /// Identifiers that refer to an object; a call's callee maps to the chosen overload
    pub uses: FxHashMap<NodeId, ObjectId>,
    /// Objects declared without an identifier of their own (unnamed imports)
    pub implicits: FxHashMap<NodeId, ObjectId>,
    /// Identifiers resolved through the implicit class receiver, mapped to that class type
    pub class_members: FxHashMap<NodeId, TypeId>,
    /// Selector expressions denoting fields or methods
    pub selections: FxHashMap<NodeId, Selection>,
    /// Nodes that open a scope (files, function bodies, blocks, lambdas)
    pub scopes: FxHashMap<NodeId, ScopeId>,
}

impl TypeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Object defined or used at `node`
    pub fn object_of(&self, node: NodeId) -> Option<ObjectId> {
        self.defs
            .get(&node)
            .or_else(|| self.uses.get(&node))
            .copied()
    }

    pub fn type_of(&self, node: NodeId) -> Option<TypeId> {
        self.types.get(&node).map(|tv| tv.ty)
    }

    pub fn record_type(&mut self, node: NodeId, mode: Mode, ty: TypeId) {
        self.types.insert(node, TypeAndValue { mode, ty });
    }

    /// Identifiers referring to `obj`, definitions first
    pub fn references_to(&self, obj: ObjectId) -> Vec<NodeId> {
        let mut defs: Vec<NodeId> = self
            .defs
            .iter()
            .filter(|(_, o)| **o == obj)
            .map(|(node, _)| *node)
            .collect();
        let mut uses: Vec<NodeId> = self
            .uses
            .iter()
            .filter(|(_, o)| **o == obj)
            .map(|(node, _)| *node)
            .collect();
        defs.sort();
        uses.sort();
        defs.extend(uses);
        defs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spx_ast::FileId;

    #[test]
    fn test_object_of_prefers_defs() {
        let mut info = TypeInfo::new();
        let node = NodeId::new(FileId(0), 3);
        info.uses.insert(node, ObjectId(2));
        assert_eq!(info.object_of(node), Some(ObjectId(2)));
        info.defs.insert(node, ObjectId(1));
        assert_eq!(info.object_of(node), Some(ObjectId(1)));
    }

    #[test]
    fn test_references_to_sorted() {
        let mut info = TypeInfo::new();
        let def = NodeId::new(FileId(1), 0);
        let use_a = NodeId::new(FileId(0), 9);
        let use_b = NodeId::new(FileId(0), 4);
        info.defs.insert(def, ObjectId(5));
        info.uses.insert(use_a, ObjectId(5));
        info.uses.insert(use_b, ObjectId(5));
        info.uses.insert(NodeId::new(FileId(0), 1), ObjectId(6));
        assert_eq!(info.references_to(ObjectId(5)), vec![def, use_b, use_a]);
    }
}
