//! Type checking errors

use spx_ast::Span;
use std::fmt;
use thiserror::Error;

/// A type error in checked source. Delivered through the error callback;
/// checking always continues after one.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    pub message: String,
    pub span: Span,
}

impl TypeError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type error at {}..{}: {}", self.span.start, self.span.end, self.message)
    }
}

impl std::error::Error for TypeError {}

/// Failure to load a package's export data. Memoized: never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    #[error("package {0:?} not found")]
    NotFound(String),
    #[error("invalid export data for {path:?}: {message}")]
    Corrupt { path: String, message: String },
    #[error("invalid type {text:?} in export data for {path:?}: {message}")]
    BadType { path: String, text: String, message: String },
}

/// Errors that stop a check before it starts
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    #[error("failed to import runtime package: {0}")]
    Import(#[from] ImportError),
    #[error("package {0:?} has no classfile descriptor")]
    MissingClassfile(String),
}
