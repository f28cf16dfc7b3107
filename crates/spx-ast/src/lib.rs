//! # spx AST
//!
//! Abstract Syntax Tree definitions for spx source files.
//! Every node carries a stable [`NodeId`] assigned by the parser, so later
//! stages can keep side tables keyed by id instead of holding node references.

use std::fmt;

// =============================================================================
// Core Types (kept in lib.rs - used by all modules)
// =============================================================================

/// Index of a source file within one compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FileId(pub u32);

impl FileId {
    /// File id used for nodes synthesized from package export data
    pub const EXTERNAL: FileId = FileId(u32::MAX);
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable node identity: the owning file plus a per-file counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub file: FileId,
    pub index: u32,
}

impl NodeId {
    pub fn new(file: FileId, index: u32) -> Self {
        Self { file, index }
    }
}

/// Source location information (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub file_id: FileId,
}

impl Span {
    pub fn new(start: usize, end: usize, file_id: FileId) -> Self {
        Self { start, end, file_id }
    }

    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            file_id: self.file_id,
        }
    }

    /// Inclusive of both ends, so a cursor right after an identifier still hits it
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// AST node wrapper that includes identity and span information
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub id: NodeId,
    pub span: Span,
    pub value: T,
}

impl<T> Node<T> {
    pub fn new(id: NodeId, value: T, span: Span) -> Self {
        Self { id, span, value }
    }
}

/// Identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// =============================================================================
// Module Declarations
// =============================================================================

pub mod types;
pub mod expr;
pub mod stmt;
pub mod decl;
pub mod module;
pub mod position;
pub mod visit;

// =============================================================================
// Re-exports
// =============================================================================

pub use types::*;
pub use expr::*;
pub use stmt::*;
pub use decl::*;
pub use module::*;
pub use position::{LineIndex, Position, Range};
pub use visit::{walk_block, walk_decl, walk_expr, walk_file, walk_stmt, walk_type, Visitor};

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let a = Span::new(4, 9, FileId(1));
        let b = Span::new(12, 20, FileId(1));
        let merged = a.merge(&b);
        assert_eq!(merged.start, 4);
        assert_eq!(merged.end, 20);
        assert_eq!(merged.file_id, FileId(1));
    }

    #[test]
    fn test_span_contains_is_inclusive() {
        let span = Span::new(3, 6, FileId(0));
        assert!(span.contains(3));
        assert!(span.contains(6));
        assert!(!span.contains(7));
        assert!(!span.contains(2));
    }

    #[test]
    fn test_node_ids_order_by_file_then_index() {
        let a = NodeId::new(FileId(0), 10);
        let b = NodeId::new(FileId(1), 2);
        assert!(a < b);
        assert!(NodeId::new(FileId(1), 1) < b);
    }

    #[test]
    fn test_blank_ident() {
        assert!(Ident::new("_").is_blank());
        assert!(!Ident::new("x").is_blank());
    }
}
