//! Lexical scopes

use rustc_hash::FxHashMap;
use spx_ast::{FileId, Span};

use crate::objects::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Universe,
    Package,
    File,
    Function,
    Block,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// Source extent; universe and package scopes have none
    pub span: Option<Span>,
    names: FxHashMap<String, ObjectId>,
    order: Vec<ObjectId>,
}

impl Scope {
    pub fn lookup(&self, name: &str) -> Option<ObjectId> {
        self.names.get(name).copied()
    }

    /// Objects in insertion order
    pub fn objects(&self) -> &[ObjectId] {
        &self.order
    }

    pub fn names(&self) -> impl Iterator<Item = (&str, ObjectId)> {
        self.names.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
    scopes: Vec<Scope>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ScopeKind, parent: Option<ScopeId>, span: Option<Span>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            parent,
            span,
            names: FxHashMap::default(),
            order: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Declares `name`; returns the previous object if the name is taken
    pub fn insert(&mut self, scope: ScopeId, name: &str, obj: ObjectId) -> Result<(), ObjectId> {
        let scope = &mut self.scopes[scope.0 as usize];
        if let Some(existing) = scope.names.get(name) {
            return Err(*existing);
        }
        scope.names.insert(name.to_string(), obj);
        scope.order.push(obj);
        Ok(())
    }

    /// Replaces the binding for `name` (used when an overload set grows)
    pub fn replace(&mut self, scope: ScopeId, name: &str, obj: ObjectId) {
        let scope = &mut self.scopes[scope.0 as usize];
        if scope.names.insert(name.to_string(), obj).is_none() {
            scope.order.push(obj);
        }
    }

    /// Looks `name` up in `scope` and its parents, stopping after `stop` if given
    pub fn lookup_until(&self, scope: ScopeId, stop: Option<ScopeId>, name: &str) -> Option<(ScopeId, ObjectId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(obj) = self.get(id).lookup(name) {
                return Some((id, obj));
            }
            if Some(id) == stop {
                return None;
            }
            current = self.get(id).parent;
        }
        None
    }

    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, ObjectId)> {
        self.lookup_until(scope, None, name)
    }

    /// Most specific scope of `file` whose extent contains `offset`
    pub fn innermost_at(&self, file: FileId, offset: usize) -> Option<ScopeId> {
        self.scopes
            .iter()
            .enumerate()
            .filter_map(|(i, scope)| scope.span.map(|span| (i, span)))
            .filter(|(_, span)| span.file_id == file && span.contains(offset))
            .min_by_key(|(i, span)| (span.len(), std::cmp::Reverse(*i)))
            .map(|(i, _)| ScopeId(i as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(i, scope)| (ScopeId(i as u32), scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parents() {
        let mut table = ScopeTable::new();
        let outer = table.push(ScopeKind::Package, None, None);
        let inner = table.push(ScopeKind::Block, Some(outer), None);
        table.insert(outer, "x", ObjectId(1)).unwrap();
        table.insert(inner, "y", ObjectId(2)).unwrap();

        assert_eq!(table.lookup(inner, "x"), Some((outer, ObjectId(1))));
        assert_eq!(table.lookup(inner, "y"), Some((inner, ObjectId(2))));
        assert_eq!(table.lookup(outer, "y"), None);
        assert_eq!(table.lookup_until(inner, Some(inner), "x"), None);
    }

    #[test]
    fn test_insert_reports_redeclaration() {
        let mut table = ScopeTable::new();
        let scope = table.push(ScopeKind::Block, None, None);
        table.insert(scope, "a", ObjectId(7)).unwrap();
        assert_eq!(table.insert(scope, "a", ObjectId(8)), Err(ObjectId(7)));
        assert_eq!(table.get(scope).objects(), &[ObjectId(7)]);
    }

    #[test]
    fn test_innermost_at_prefers_smallest() {
        let file = FileId(0);
        let mut table = ScopeTable::new();
        let outer = table.push(ScopeKind::File, None, Some(Span::new(0, 100, file)));
        let inner = table.push(ScopeKind::Block, Some(outer), Some(Span::new(10, 20, file)));
        let _other = table.push(ScopeKind::File, None, Some(Span::new(0, 100, FileId(1))));

        assert_eq!(table.innermost_at(file, 15), Some(inner));
        assert_eq!(table.innermost_at(file, 50), Some(outer));
        assert_eq!(table.innermost_at(FileId(2), 5), None);
    }
}
