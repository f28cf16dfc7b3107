//! spx Language Server Core
//!
//! Turns a workspace of spx sources into a [`Program`]: parse, type check,
//! then inspect resource references against the project's resource catalog.
//! [`CompileCache`] keeps the last program until a source file changes, and
//! the query methods on [`Program`] answer editor requests against it.

pub mod workspace;
pub mod config;
pub mod diagnostic;
pub mod resource;
pub mod catalog;
pub mod program;
pub mod compile;
pub mod cache;
pub mod query;
mod inspector;

pub use cache::CompileCache;
pub use catalog::{CatalogError, ResourceCatalog};
pub use compile::{compile, CompileError};
pub use config::{ConfigError, EngineConfig};
pub use diagnostic::{Diagnostic, DiagnosticSet, Severity};
pub use program::{Program, SourceFile};
pub use query::Location;
pub use resource::{parse_resource_uri, RefKind, ResourceId, ResourceKind, ResourceReference};
pub use workspace::{DirEntry, DiskFs, MapFs, Workspace};
